//! Content-addressed storage for uploaded files.
//!
//! Files are keyed by the SHA-256 of their bytes, so identical uploads share a
//! single blob. Callers keep their own references (e.g. image rows) and decide
//! when a blob is no longer needed.

mod error;
mod hash;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use hash::ContentHash;
pub use traits::{BlobStore, BoxReader};
