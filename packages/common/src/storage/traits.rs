use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use super::hash::ContentHash;

pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store everything readable from `reader` and return its hash.
    async fn put_stream(&self, reader: BoxReader) -> Result<ContentHash, StorageError>;

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    /// Remove a blob. Returns `false` if it was already gone.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
