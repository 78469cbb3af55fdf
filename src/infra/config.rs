//! Centralized configuration (environment variables + defaults).

use crate::app::marketplace::DEFAULT_BUCKET;
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    /// The managed backend at `url`, authenticated with its public key.
    Supabase { url: String, anon_key: String },
    /// In-process store; data is lost on exit.
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    pub bucket: String,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let backend = match var("STORE_BACKEND").as_deref().unwrap_or("supabase") {
            "supabase" => StoreBackend::Supabase {
                url: var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                anon_key: var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    reason: format!("expected 'supabase' or 'memory', got '{}'", other),
                })
            }
        };

        Ok(Config {
            bind_addr,
            backend,
            bucket: var("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        })
    }

    /// Origin that public image URLs are served from.
    pub fn public_base(&self) -> String {
        match &self.backend {
            StoreBackend::Supabase { url, .. } => url.trim_end_matches('/').to_string(),
            StoreBackend::Memory => format!("http://{}", self.bind_addr),
        }
    }
}
