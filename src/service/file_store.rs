use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::error::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: String,
    pub url: String,
    pub checksum: String,
    pub size: i64,
}

/// Where uploaded bytes end up. Handlers only see paths and URLs.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug {
    async fn save(
        &self,
        folder: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, ServiceError>;

    async fn delete(&self, path: &str) -> Result<(), ServiceError>;
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        LocalFileStore {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        folder: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, ServiceError> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let file_name = format!("{}{}", Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let relative = format!("{}/{}", folder, file_name);
        Ok(StoredFile {
            url: format!("{}/{}", self.base_url, relative),
            path: relative,
            checksum: checksum(bytes),
            size: bytes.len() as i64,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn local_store_writes_and_removes_files() {
        let root = std::env::temp_dir().join(format!("makazi-media-{}", Uuid::new_v4()));
        let store = LocalFileStore::new(&root, "/media/");

        let stored = store.save("properties/abc", ".png", b"not really a png").await.unwrap();
        assert!(stored.path.starts_with("properties/abc/"));
        assert!(stored.path.ends_with(".png"));
        assert_eq!(stored.url, format!("/media/{}", stored.path));
        assert_eq!(stored.size, 16);
        assert!(root.join(&stored.path).exists());

        store.delete(&stored.path).await.unwrap();
        assert!(!root.join(&stored.path).exists());
        store.delete(&stored.path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
