//! Durable storage for serialized collection artifacts.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Result, RetrievalError};

/// Durable read/write of named blobs.
///
/// The engine persists each collection as two blobs (the index and the
/// chunk records) through this seam, so the storage backend — local disk,
/// object storage — stays an injected collaborator.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read a blob; `None` if it does not exist.
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write a blob, replacing any previous content.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn remove(&self, name: &str) -> Result<()>;
}

/// An [`ArtifactStore`] backed by a directory on the local filesystem.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RetrievalError::Store {
                operation: "read".into(),
                message: format!("{name}: {e}"),
            }),
        }
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| RetrievalError::Store {
            operation: "write".into(),
            message: format!("creating {}: {e}", self.root.display()),
        })?;
        tokio::fs::write(self.path_for(name), bytes).await.map_err(|e| RetrievalError::Store {
            operation: "write".into(),
            message: format!("{name}: {e}"),
        })
    }

    async fn remove(&self, name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RetrievalError::Store {
                operation: "remove".into(),
                message: format!("{name}: {e}"),
            }),
        }
    }
}
