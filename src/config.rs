//! Service configuration
//!
//! Every setting can be passed as a flag or through the environment.

use crate::storage::{StorageError, default_data_dir};
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Upstream Google Cloud Translation v2 endpoint
pub const GOOGLE_TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Settings for the proxy service
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "LETZVIEW_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Password required to write the catalog
    #[arg(long, env = "ADMIN_PASSWORD", default_value = "admin", hide_env_values = true)]
    pub admin_password: String,

    /// API key for the translation upstream; translation is disabled without it
    #[arg(long, env = "GOOGLE_TRANSLATE_API_KEY", hide_env_values = true)]
    pub google_translate_api_key: Option<String>,

    /// Translation upstream URL
    #[arg(long, default_value = GOOGLE_TRANSLATE_URL, hide = true)]
    pub translate_upstream: String,

    /// Directory for stored data [default: platform data directory]
    #[arg(long, env = "LETZVIEW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Resolves the data directory, falling back to the platform default
    pub fn data_dir(&self) -> Result<PathBuf, StorageError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// The translation API key, treating an empty value as unset
    pub fn translate_api_key(&self) -> Option<&str> {
        self.google_translate_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
