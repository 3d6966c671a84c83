//! Runtime settings, resolved once at startup and passed explicitly into
//! the store and pipeline constructors.

use crate::error::{Result, VigilError};

/// The single required environment value is the persistence connection
/// string. Binaries call `dotenvy::dotenv()` before resolving this.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| VigilError::Config("DATABASE_URL is not set".into()))?;
        if database_url.trim().is_empty() {
            return Err(VigilError::Config("DATABASE_URL is empty".into()));
        }
        Ok(Self { database_url })
    }
}
