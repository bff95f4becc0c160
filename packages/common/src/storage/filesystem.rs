use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BlobStore, BoxReader};

const READ_CHUNK: usize = 64 * 1024;

/// Blob store rooted at a local directory.
///
/// Layout: `{root}/{2 hex chars}/{62 hex chars}`. Writes go to `{root}/.partial`
/// first and are renamed into place once the hash is known, so a reader never
/// sees a half-written blob.
pub struct FilesystemBlobStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join(".partial")).await?;
        Ok(Self { root, max_size })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.shard()).join(hash.leaf())
    }

    fn partial_path(&self) -> PathBuf {
        self.root
            .join(".partial")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Move a fully written partial file to its content-addressed location.
    async fn commit(&self, partial: &Path, hash: ContentHash) -> Result<ContentHash, StorageError> {
        let target = self.blob_path(&hash);

        if fs::try_exists(&target).await? {
            let _ = fs::remove_file(partial).await;
            return Ok(hash);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(partial, &target).await {
            let _ = fs::remove_file(partial).await;
            return Err(e.into());
        }

        debug!(hash = %hash, "Stored blob");
        Ok(hash)
    }

    async fn copy_hashed(
        &self,
        reader: &mut BoxReader,
        partial: &Path,
    ) -> Result<ContentHash, StorageError> {
        let mut file = fs::File::create(partial).await?;
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > self.max_size {
                return Err(StorageError::SizeLimitExceeded {
                    actual: written,
                    limit: self.max_size,
                });
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }

        file.flush().await?;
        Ok(ContentHash::from_bytes(hasher.finalize().into()))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, mut reader: BoxReader) -> Result<ContentHash, StorageError> {
        let partial = self.partial_path();
        match self.copy_hashed(&mut reader, &partial).await {
            Ok(hash) => self.commit(&partial, hash).await,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => {
                debug!(hash = %hash, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
