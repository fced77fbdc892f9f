pub mod cache;
pub mod driver;
pub mod reconcile;

pub use cache::{CacheError, CacheStore};
pub use driver::{run_search, SearchOptions, SearchReport, TrailingBatch};
pub use reconcile::refresh_partition;
