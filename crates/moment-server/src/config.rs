use std::path::PathBuf;

use anyhow::{Context, Result};

/// Deploy-time configuration, read once at startup. The store identifiers
/// are fixed per deployment, never negotiated per request.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Tabular store identifier: the SQLite database file.
    pub db_path: PathBuf,
    /// Table name within the tabular store.
    pub table_name: String,
    /// Blob store folder identifier.
    pub blob_dir: PathBuf,
    /// Base for the public thumbnail URLs handed back to clients.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("MOMENT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("MOMENT_PORT")
            .unwrap_or_else(|_| "3212".into())
            .parse()
            .context("MOMENT_PORT must be a port number")?;
        let db_path: PathBuf = std::env::var("MOMENT_DB_PATH")
            .unwrap_or_else(|_| "moments.db".into())
            .into();
        let table_name = std::env::var("MOMENT_TABLE").unwrap_or_else(|_| "Moments".into());
        let blob_dir: PathBuf = std::env::var("MOMENT_BLOB_DIR")
            .unwrap_or_else(|_| "./image-storage".into())
            .into();
        let public_base_url = std::env::var("MOMENT_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();
        let max_upload_bytes: usize = std::env::var("MOMENT_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(25 * 1024 * 1024); // base64 payloads are ~4/3 the image size

        Ok(Self {
            host,
            port,
            db_path,
            table_name,
            blob_dir,
            public_base_url,
            max_upload_bytes,
        })
    }
}
