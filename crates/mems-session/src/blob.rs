// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Blob storage for uploaded media
//!
//! Uploaded bytes live behind [`BlobStore`]. [`MemoryBlobStore`] keeps them
//! in an `Arc<RwLock<HashMap>>` and is the only backend shipped; persistent
//! backends plug in through the trait.

use crate::error::{SessionError, SessionResult};
use crate::ids::BlobRef;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Async blob storage keyed by [`BlobRef`]
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// Store bytes under a fresh reference
    async fn put(&self, data: Bytes) -> SessionResult<BlobRef>;

    /// Fetch bytes; `NotFound` when missing
    async fn get(&self, blob: BlobRef) -> SessionResult<Bytes>;

    /// Size in bytes as stored, not as reported by the uploader
    async fn size(&self, blob: BlobRef) -> SessionResult<u64>;

    /// Remove a blob; removing a missing blob is not an error
    async fn delete(&self, blob: BlobRef) -> SessionResult<()>;

    /// Whether a blob exists
    async fn exists(&self, blob: BlobRef) -> SessionResult<bool>;
}

/// In-memory blob store
///
/// Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    store: Arc<RwLock<HashMap<BlobRef, Bytes>>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether no blobs are stored
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

impl Debug for MemoryBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlobStore").finish()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes) -> SessionResult<BlobRef> {
        let blob = BlobRef::new();
        self.store.write().await.insert(blob, data);
        Ok(blob)
    }

    async fn get(&self, blob: BlobRef) -> SessionResult<Bytes> {
        self.store
            .read()
            .await
            .get(&blob)
            .cloned()
            .ok_or_else(|| SessionError::not_found(format!("blob {blob}")))
    }

    async fn size(&self, blob: BlobRef) -> SessionResult<u64> {
        self.store
            .read()
            .await
            .get(&blob)
            .map(|data| data.len() as u64)
            .ok_or_else(|| SessionError::not_found(format!("blob {blob}")))
    }

    async fn delete(&self, blob: BlobRef) -> SessionResult<()> {
        self.store.write().await.remove(&blob);
        Ok(())
    }

    async fn exists(&self, blob: BlobRef) -> SessionResult<bool> {
        Ok(self.store.read().await.contains_key(&blob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryBlobStore::new();
        let blob = store.put(Bytes::from_static(b"jpeg bytes")).await.unwrap();

        assert_eq!(store.get(blob).await.unwrap(), Bytes::from_static(b"jpeg bytes"));
        assert_eq!(store.size(blob).await.unwrap(), 10);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryBlobStore::new();
        assert!(store.get(BlobRef::new()).await.unwrap_err().is_not_found());
        assert!(store.size(BlobRef::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        let blob = store.put(Bytes::from_static(b"x")).await.unwrap();
        store.delete(blob).await.unwrap();
        store.delete(blob).await.unwrap();
        assert!(!store.exists(blob).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryBlobStore::new();
        let other = store.clone();
        let blob = store.put(Bytes::from_static(b"shared")).await.unwrap();
        assert!(other.exists(blob).await.unwrap());
    }
}
