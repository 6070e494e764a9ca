pub mod config;
pub mod error;
pub mod properties;

pub use config::{AmizoneConfig, ConfigSources, QueryConfig, RealtimeConfig, SupabaseCredentials};
pub use error::{AmizoneError, Result};
