use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmizoneError {
    /// A config source exists but could not be read or extracted.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AmizoneError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            AmizoneError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<figment::Error> for AmizoneError {
    fn from(e: figment::Error) -> Self {
        AmizoneError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AmizoneError>;
