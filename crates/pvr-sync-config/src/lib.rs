pub mod config;
pub mod paths;

pub use config::{Config, ConfigError, PvrConfig};
pub use paths::PathManager;
