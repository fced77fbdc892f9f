pub mod backend;
pub mod client;
pub mod error;
pub mod poller;
pub mod transport;

pub use backend::Backend;
pub use client::{ClientSettings, PvrClient, WantedSource};
pub use error::PvrError;
pub use transport::{RestClient, RetryPolicy};
