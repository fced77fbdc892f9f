pub mod command;
pub mod media;

pub use command::CommandState;
pub use media::{MediaItem, WantedKind};
