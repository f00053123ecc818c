use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// A stored binary object together with its metadata.
#[derive(Debug, Clone)]
pub struct Blob {
    pub name: String,
    pub mime: String,
    pub shared: bool,
    pub bytes: Vec<u8>,
}

/// Binary-object collaborator: write bytes into a folder, flip a per-object
/// public-sharing flag, read them back by opaque id.
pub trait BlobStore: Send + Sync {
    /// Store the bytes and return the new object's opaque id.
    fn store(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<String>;

    /// Mark an object viewable by anyone holding its id.
    fn set_public(&self, id: &str) -> Result<()>;

    fn fetch(&self, id: &str) -> Result<Option<Blob>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobMeta {
    name: String,
    mime: String,
    shared: bool,
}

/// Filesystem-backed blob store. Bytes live at `{dir}/{id}`, metadata in a
/// `{dir}/{id}.json` sidecar so the sharing flag survives restarts.
pub struct DiskBlobStore {
    dir: PathBuf,
}

impl DiskBlobStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_meta(&self, id: &str) -> Result<Option<BlobMeta>> {
        match fs::read(self.meta_path(id)) {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_meta(&self, id: &str, meta: &BlobMeta) -> Result<()> {
        fs::write(self.meta_path(id), serde_json::to_vec(meta)?)?;
        Ok(())
    }
}

impl BlobStore for DiskBlobStore {
    fn store(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        fs::write(self.data_path(&id), bytes)?;
        self.write_meta(
            &id,
            &BlobMeta {
                name: name.to_string(),
                mime: mime.to_string(),
                shared: false,
            },
        )?;
        Ok(id)
    }

    fn set_public(&self, id: &str) -> Result<()> {
        let mut meta = self
            .read_meta(id)?
            .ok_or_else(|| anyhow::anyhow!("no such blob: {id}"))?;
        meta.shared = true;
        self.write_meta(id, &meta)
    }

    fn fetch(&self, id: &str) -> Result<Option<Blob>> {
        let Some(meta) = self.read_meta(id)? else {
            return Ok(None);
        };
        let bytes = fs::read(self.data_path(id))?;
        Ok(Some(Blob {
            name: meta.name,
            mime: meta.mime,
            shared: meta.shared,
            bytes,
        }))
    }
}
