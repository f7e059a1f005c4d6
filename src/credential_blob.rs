//! Single-object storage for the serialized bearer credential.
//!
//! The blob is always replaced wholesale; there is no partial update.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

#[async_trait]
pub trait CredentialBlob: Send + Sync {
    /// Current contents, or `None` if nothing has been persisted yet.
    async fn load(&self) -> Result<Option<String>>;

    /// Overwrite the blob with `contents`.
    async fn store(&self, contents: &str) -> Result<()>;
}

/// Blob kept as a JSON file on local disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write never leaves a truncated credential behind.
#[derive(Debug, Clone)]
pub struct FileCredentialBlob {
    path: PathBuf,
}

impl FileCredentialBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialBlob for FileCredentialBlob {
    async fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, contents: &str) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents.as_bytes()).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = contents.len(), "credential blob written");
        Ok(())
    }
}

/// In-process blob. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialBlob {
    inner: Arc<RwLock<Option<String>>>,
}

impl MemoryCredentialBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(contents.into()))),
        }
    }
}

#[async_trait]
impl CredentialBlob for MemoryCredentialBlob {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.inner.read().await.clone())
    }

    async fn store(&self, contents: &str) -> Result<()> {
        *self.inner.write().await = Some(contents.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("comfort-monitor-{}", Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let blob = FileCredentialBlob::new(temp_path("token.json"));
        assert!(blob.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_creates_parent_dirs_and_overwrites() {
        let path = temp_path("token.json");
        let blob = FileCredentialBlob::new(&path);

        blob.store(r#"{"access_token":"first"}"#).await.unwrap();
        blob.store(r#"{"access_token":"second"}"#).await.unwrap();

        let got = blob.load().await.unwrap().unwrap();
        assert_eq!(got, r#"{"access_token":"second"}"#);

        // Only the target file remains; temp files were renamed away.
        let dir = path.parent().unwrap();
        let mut entries = fs::read_dir(dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(e) = entries.next_entry().await.unwrap() {
            names.push(e.file_name());
        }
        assert_eq!(names.len(), 1);

        let _ = fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn memory_blob_clone_shares_state() {
        let blob = MemoryCredentialBlob::new();
        let clone = blob.clone();
        blob.store("abc").await.unwrap();
        assert_eq!(clone.load().await.unwrap().as_deref(), Some("abc"));
    }
}
