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

//! Upload flow: slot, bytes, commit
//!
//! A client first asks for an upload slot, sends the bytes against it and
//! then commits the resulting blob with its metadata. Commit re-validates
//! everything against the stored blob and deletes a rejected blob. Only the
//! user and mem a blob was uploaded for can commit it, and only once.
//!
//! Slots and uncommitted blobs expire after
//! [`UploadPolicy::slot_ttl_secs`](crate::policy::UploadPolicy::slot_ttl_secs);
//! expired entries are pruned whenever a new slot is issued.

use crate::error::{SessionError, SessionResult};
use crate::ids::{BlobRef, MediaId, MemId, UploadTargetId, UserId};
use crate::model::{MediaRecord, Role, UploadMetadata, UploadTarget};
use crate::policy::MediaQuota;
use crate::reactions::ReactionCounts;
use crate::service::{PendingUpload, SessionService, State};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use tracing::{debug, info, instrument, warn};

impl PendingUpload {
    fn new(mem_id: MemId, user_id: UserId) -> Self {
        PendingUpload {
            mem_id,
            user_id,
            issued_at: Utc::now(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl_secs: u64) -> bool {
        u64::try_from((now - self.issued_at).num_seconds()).is_ok_and(|age| age >= ttl_secs)
    }
}

impl State {
    /// Membership, ended and quota checks shared by slot issue and commit
    fn check_can_upload(&self, mem_id: MemId, user: UserId, quota: &MediaQuota) -> SessionResult<()> {
        let mem = self.mem(mem_id)?;
        self.participant(mem_id, user)?;
        if mem.is_ended() {
            return Err(SessionError::MemEnded);
        }
        let limit = quota.limit(self.participant_count(mem_id));
        if self.media_count(mem_id) >= limit {
            return Err(SessionError::QuotaExceeded(limit));
        }
        Ok(())
    }

    /// Drop expired slots and uncommitted blobs, returning the blobs to delete
    fn prune_expired_uploads(&mut self, now: DateTime<Utc>, ttl_secs: u64) -> Vec<BlobRef> {
        self.pending.retain(|_, p| !p.is_expired(now, ttl_secs));
        let expired: Vec<BlobRef> = self
            .pending_blobs
            .iter()
            .filter(|(_, p)| p.is_expired(now, ttl_secs))
            .map(|(blob, _)| *blob)
            .collect();
        for blob in &expired {
            self.pending_blobs.remove(blob);
        }
        expired
    }

    /// Take ownership of an uncommitted blob for `user` in `mem_id`
    ///
    /// Unknown, committed and foreign blobs are left untouched.
    fn claim_blob(&mut self, blob: BlobRef, user: UserId, mem_id: MemId) -> SessionResult<PendingUpload> {
        match self.pending_blobs.remove(&blob) {
            Some(pending) if pending.user_id == user && pending.mem_id == mem_id => Ok(pending),
            Some(pending) => {
                self.pending_blobs.insert(blob, pending);
                Err(SessionError::UnknownUploadTarget)
            }
            None => Err(SessionError::UnknownUploadTarget),
        }
    }
}

impl SessionService {
    /// Issue a single-use upload slot
    ///
    /// Fails early on membership, ended mems, disallowed types and a full
    /// quota; commit checks all of these again.
    #[instrument(skip(self))]
    pub async fn request_upload_slot(
        &self,
        user: UserId,
        mem_id: MemId,
        content_type: &str,
    ) -> SessionResult<UploadTarget> {
        let uploads = &self.config.uploads;
        if uploads.classify(content_type).is_none() {
            return Err(SessionError::UnsupportedType(content_type.to_string()));
        }

        let (issued, expired) = {
            let mut state = self.state.write().await;
            let expired = state.prune_expired_uploads(Utc::now(), uploads.slot_ttl_secs);
            let issued = state.check_can_upload(mem_id, user, &uploads.quota).map(|()| {
                let target = UploadTarget {
                    id: UploadTargetId::new(),
                    mem_id,
                    content_type: content_type.to_string(),
                };
                state.pending.insert(target.id, PendingUpload::new(mem_id, user));
                target
            });
            (issued, expired)
        };

        for blob in expired {
            debug!(%blob, "deleting expired upload");
            if let Err(e) = self.blobs.delete(blob).await {
                warn!(%blob, error = %e, "failed to delete expired upload");
            }
        }
        issued
    }

    /// Store bytes against an upload slot; the slot is consumed
    ///
    /// The returned blob can be committed once, by the slot's user.
    pub async fn upload_bytes(&self, target: &UploadTarget, data: Bytes) -> SessionResult<BlobRef> {
        let pending = self
            .state
            .write()
            .await
            .pending
            .remove(&target.id)
            .ok_or(SessionError::UnknownUploadTarget)?;
        if pending.mem_id != target.mem_id || pending.is_expired(Utc::now(), self.config.uploads.slot_ttl_secs) {
            return Err(SessionError::UnknownUploadTarget);
        }

        debug!(user = %pending.user_id, bytes = data.len(), "storing upload");
        let blob = self.blobs.put(data).await?;
        self.state
            .write()
            .await
            .pending_blobs
            .insert(blob, PendingUpload::new(pending.mem_id, pending.user_id));
        Ok(blob)
    }

    /// Register an uploaded blob as media of a mem
    ///
    /// The size recorded is the stored blob's, not `meta.file_size`. A blob
    /// that was not uploaded by `user` for `mem_id`, or was already
    /// committed, is refused without touching it.
    #[instrument(skip(self, meta), fields(file = %meta.file_name))]
    pub async fn commit_upload(
        &self,
        user: UserId,
        mem_id: MemId,
        blob: BlobRef,
        meta: UploadMetadata,
    ) -> SessionResult<MediaRecord> {
        let pending = self.state.write().await.claim_blob(blob, user, mem_id)?;

        let result = if pending.is_expired(Utc::now(), self.config.uploads.slot_ttl_secs) {
            Err(SessionError::UnknownUploadTarget)
        } else {
            match self.blobs.size(blob).await {
                Ok(size) => self.register(user, mem_id, blob, size, meta).await,
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(record) => {
                info!(mem = %mem_id, media = %record.id, size = record.file_size, "upload committed");
                Ok(record)
            }
            Err(e) => {
                warn!(mem = %mem_id, error = %e, "upload rejected, deleting blob");
                self.blobs.delete(blob).await?;
                Err(e)
            }
        }
    }

    async fn register(
        &self,
        user: UserId,
        mem_id: MemId,
        blob: BlobRef,
        size: u64,
        meta: UploadMetadata,
    ) -> SessionResult<MediaRecord> {
        let uploads = &self.config.uploads;
        if !uploads.size_ok(size) {
            return Err(SessionError::InvalidFileSize {
                size,
                max: uploads.max_file_bytes,
            });
        }
        let format = uploads
            .classify(&meta.content_type)
            .ok_or_else(|| SessionError::UnsupportedType(meta.content_type.clone()))?;
        if meta.file_size != size {
            warn!(reported = meta.file_size, stored = size, "reported size differs from stored blob");
        }

        let mut state = self.state.write().await;
        state.check_can_upload(mem_id, user, &uploads.quota)?;
        let record = MediaRecord {
            id: MediaId::new(),
            mem_id,
            blob,
            uploaded_by: user,
            file_name: meta.file_name,
            content_type: meta.content_type,
            file_size: size,
            format,
            uploaded_at: Utc::now(),
            reaction_counts: ReactionCounts::default(),
            score: 0,
            seq: state.next_seq(),
        };
        state.media.insert(record.id, record.clone());
        Ok(record)
    }

    /// Media of a mem, newest first
    pub async fn list_media(&self, user: UserId, mem_id: MemId) -> SessionResult<Vec<MediaRecord>> {
        let mut media = self.media_of(user, mem_id).await?;
        media.sort_by_key(|m| Reverse((m.uploaded_at, m.seq)));
        Ok(media)
    }

    /// Media of a mem, highest score first; ties newest first
    pub async fn list_media_by_score(&self, user: UserId, mem_id: MemId) -> SessionResult<Vec<MediaRecord>> {
        let mut media = self.media_of(user, mem_id).await?;
        media.sort_by_key(|m| Reverse((m.score, m.uploaded_at, m.seq)));
        Ok(media)
    }

    async fn media_of(&self, user: UserId, mem_id: MemId) -> SessionResult<Vec<MediaRecord>> {
        let state = self.state.read().await;
        state.mem(mem_id)?;
        state.participant(mem_id, user)?;
        Ok(state.media.values().filter(|m| m.mem_id == mem_id).cloned().collect())
    }

    /// Stored bytes of a media item
    pub async fn media_bytes(&self, user: UserId, media_id: MediaId) -> SessionResult<Bytes> {
        let blob = {
            let state = self.state.read().await;
            let media = state.media_item(media_id)?;
            state.participant(media.mem_id, user)?;
            media.blob
        };
        self.blobs.get(blob).await
    }

    /// Delete a media item with its reactions, comments and blob
    ///
    /// Allowed for the uploader and the mem's creator.
    #[instrument(skip(self))]
    pub async fn delete_media(&self, user: UserId, media_id: MediaId) -> SessionResult<()> {
        let blob = {
            let mut state = self.state.write().await;
            let media = state.media_item(media_id)?;
            let (mem_id, uploader) = (media.mem_id, media.uploaded_by);
            let role = state.participant(mem_id, user)?.role;
            if uploader != user && role != Role::Creator {
                return Err(SessionError::not_authorized("only the uploader or the creator can delete media"));
            }

            state.reactions.retain(|r| r.media_id != media_id);
            state.comments.retain(|c| c.media_id != media_id);
            match state.media.remove(&media_id) {
                Some(media) => media.blob,
                None => return Err(SessionError::not_found(format!("media {media_id}"))),
            }
        };
        self.blobs.delete(blob).await?;
        info!(media = %media_id, "media deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::model::NewMem;
    use crate::policy::{UploadPolicy, DEFAULT_UPLOAD_SLOT_TTL_SECS};
    use crate::service::SessionConfig;
    use chrono::TimeDelta;
    use std::sync::Arc;

    struct Fixture {
        service: SessionService,
        blobs: MemoryBlobStore,
        creator: UserId,
        mem: MemId,
    }

    async fn fixture(uploads: UploadPolicy) -> Fixture {
        let blobs = MemoryBlobStore::new();
        let service = SessionService::with_blob_store(
            SessionConfig {
                uploads,
                ..Default::default()
            },
            Arc::new(blobs.clone()),
        );
        let creator = UserId::new();
        let created = service
            .create_mem(
                creator,
                NewMem {
                    name: "Picnic".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        Fixture {
            service,
            blobs,
            creator,
            mem: created.mem_id,
        }
    }

    fn stale() -> DateTime<Utc> {
        Utc::now() - TimeDelta::seconds(DEFAULT_UPLOAD_SLOT_TTL_SECS as i64 + 1)
    }

    fn meta(content_type: &str, size: u64) -> UploadMetadata {
        UploadMetadata {
            file_name: "photo.jpg".into(),
            content_type: content_type.into(),
            file_size: size,
        }
    }

    async fn upload(f: &Fixture, user: UserId, data: &'static [u8]) -> SessionResult<MediaRecord> {
        let target = f.service.request_upload_slot(user, f.mem, "image/jpeg").await?;
        let blob = f.service.upload_bytes(&target, Bytes::from_static(data)).await?;
        f.service.commit_upload(user, f.mem, blob, meta("image/jpeg", data.len() as u64)).await
    }

    #[tokio::test]
    async fn test_upload_records_stored_size() {
        let f = fixture(UploadPolicy::default()).await;
        let target = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        let blob = f.service.upload_bytes(&target, Bytes::from_static(b"12345")).await.unwrap();
        let record = f
            .service
            .commit_upload(f.creator, f.mem, blob, meta("image/png", 999))
            .await
            .unwrap();
        assert_eq!(record.file_size, 5);
        assert_eq!(record.format, mems_media::MediaKind::Image);
        assert_eq!(f.service.media_bytes(f.creator, record.id).await.unwrap(), Bytes::from_static(b"12345"));
    }

    #[tokio::test]
    async fn test_upload_slot_is_single_use() {
        let f = fixture(UploadPolicy::default()).await;
        let target = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        f.service.upload_bytes(&target, Bytes::from_static(b"a")).await.unwrap();
        let err = f.service.upload_bytes(&target, Bytes::from_static(b"b")).await.unwrap_err();
        assert_eq!(err, SessionError::UnknownUploadTarget);
    }

    #[tokio::test]
    async fn test_oversized_blob_rejected_and_deleted() {
        let f = fixture(UploadPolicy {
            max_file_bytes: 4,
            ..Default::default()
        })
        .await;
        let err = upload(&f, f.creator, b"too large").await.unwrap_err();
        assert_eq!(err, SessionError::InvalidFileSize { size: 9, max: 4 });
        assert!(f.blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_commit_rejects_unsupported_type() {
        let f = fixture(UploadPolicy::default()).await;
        let target = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        let blob = f.service.upload_bytes(&target, Bytes::from_static(b"%PDF")).await.unwrap();
        let err = f
            .service
            .commit_upload(f.creator, f.mem, blob, meta("application/pdf", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedType(_)));
        assert!(f.blobs.is_empty().await);
        assert!(matches!(
            f.service.request_upload_slot(f.creator, f.mem, "text/plain").await,
            Err(SessionError::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn test_quota() {
        let f = fixture(UploadPolicy {
            quota: MediaQuota::PerMem { max: 2 },
            ..Default::default()
        })
        .await;
        upload(&f, f.creator, b"one").await.unwrap();
        upload(&f, f.creator, b"two").await.unwrap();
        let err = upload(&f, f.creator, b"three").await.unwrap_err();
        assert_eq!(err, SessionError::QuotaExceeded(2));
        assert_eq!(f.blobs.len().await, 2);
    }

    #[tokio::test]
    async fn test_outsider_cannot_upload() {
        let f = fixture(UploadPolicy::default()).await;
        let err = upload(&f, UserId::new(), b"data").await.unwrap_err();
        assert_eq!(err, SessionError::NotParticipant);
    }

    #[tokio::test]
    async fn test_ended_mem_rejects_commit() {
        let f = fixture(UploadPolicy::default()).await;
        let target = f.service.request_upload_slot(f.creator, f.mem, "image/jpeg").await.unwrap();
        let blob = f.service.upload_bytes(&target, Bytes::from_static(b"late")).await.unwrap();
        f.service.end_mem(f.creator, f.mem).await.unwrap();

        let err = f
            .service
            .commit_upload(f.creator, f.mem, blob, meta("image/jpeg", 4))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::MemEnded);
        assert!(f.blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_recommit_over_quota_keeps_committed_bytes() {
        let f = fixture(UploadPolicy {
            quota: MediaQuota::PerMem { max: 1 },
            ..Default::default()
        })
        .await;
        let record = upload(&f, f.creator, b"keep me").await.unwrap();

        let err = f
            .service
            .commit_upload(f.creator, f.mem, record.blob, meta("image/jpeg", 7))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownUploadTarget);
        assert_eq!(
            f.service.media_bytes(f.creator, record.id).await.unwrap(),
            Bytes::from_static(b"keep me")
        );
    }

    #[tokio::test]
    async fn test_recommit_does_not_duplicate_record() {
        let f = fixture(UploadPolicy::default()).await;
        let record = upload(&f, f.creator, b"once").await.unwrap();

        let err = f
            .service
            .commit_upload(f.creator, f.mem, record.blob, meta("image/jpeg", 4))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownUploadTarget);
        assert_eq!(f.service.list_media(f.creator, f.mem).await.unwrap().len(), 1);
        assert_eq!(f.blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_commit_refuses_foreign_blob() {
        let f = fixture(UploadPolicy::default()).await;
        let code = f.service.mem_by_id(f.creator, f.mem).await.unwrap().join_code;
        let bob = UserId::new();
        f.service.join_mem(bob, code.as_str()).await.unwrap();
        let target = f.service.request_upload_slot(f.creator, f.mem, "image/jpeg").await.unwrap();
        let blob = f.service.upload_bytes(&target, Bytes::from_static(b"mine")).await.unwrap();

        for user in [bob, UserId::new()] {
            let err = f
                .service
                .commit_upload(user, f.mem, blob, meta("image/jpeg", 4))
                .await
                .unwrap_err();
            assert_eq!(err, SessionError::UnknownUploadTarget);
        }
        assert_eq!(f.blobs.len().await, 1);

        let record = f
            .service
            .commit_upload(f.creator, f.mem, blob, meta("image/jpeg", 4))
            .await
            .unwrap();
        assert_eq!(record.uploaded_by, f.creator);
    }

    #[tokio::test]
    async fn test_commit_unknown_blob_deletes_nothing() {
        let f = fixture(UploadPolicy::default()).await;
        let record = upload(&f, f.creator, b"live").await.unwrap();
        let err = f
            .service
            .commit_upload(f.creator, f.mem, BlobRef::new(), meta("image/jpeg", 4))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownUploadTarget);
        assert!(f.service.media_bytes(f.creator, record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_slot_rejected() {
        let f = fixture(UploadPolicy::default()).await;
        let target = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        if let Some(pending) = f.service.state.write().await.pending.get_mut(&target.id) {
            pending.issued_at = stale();
        }

        let err = f
            .service
            .upload_bytes(&target, Bytes::from_static(b"late"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownUploadTarget);
        assert!(f.blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_uploads_pruned_on_issue() {
        let f = fixture(UploadPolicy::default()).await;
        let abandoned = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        let sent = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        let blob = f.service.upload_bytes(&sent, Bytes::from_static(b"never committed")).await.unwrap();
        {
            let mut guard = f.service.state.write().await;
            let state = &mut *guard;
            for pending in state.pending.values_mut().chain(state.pending_blobs.values_mut()) {
                pending.issued_at = stale();
            }
        }

        let fresh = f.service.request_upload_slot(f.creator, f.mem, "image/png").await.unwrap();
        {
            let state = f.service.state.read().await;
            assert!(!state.pending.contains_key(&abandoned.id));
            assert!(state.pending.contains_key(&fresh.id));
            assert!(state.pending_blobs.is_empty());
        }
        assert!(f.blobs.is_empty().await);
        assert_eq!(
            f.service
                .commit_upload(f.creator, f.mem, blob, meta("image/png", 15))
                .await
                .unwrap_err(),
            SessionError::UnknownUploadTarget
        );
    }

    #[tokio::test]
    async fn test_delete_media_permissions() {
        let f = fixture(UploadPolicy::default()).await;
        let code = f.service.mem_by_id(f.creator, f.mem).await.unwrap().join_code;
        let bob = UserId::new();
        let carol = UserId::new();
        f.service.join_mem(bob, code.as_str()).await.unwrap();
        f.service.join_mem(carol, code.as_str()).await.unwrap();

        let bobs = upload(&f, bob, b"bob").await.unwrap();
        let err = f.service.delete_media(carol, bobs.id).await.unwrap_err();
        assert!(err.is_permission());

        f.service.delete_media(f.creator, bobs.id).await.unwrap();
        assert!(f.service.list_media(bob, f.mem).await.unwrap().is_empty());
        assert!(f.blobs.is_empty().await);
        assert!(f.service.delete_media(bob, bobs.id).await.unwrap_err().is_not_found());
    }
}
