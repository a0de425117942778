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

//! Session service: mems, membership and notes
//!
//! All state lives behind one `Arc<RwLock<State>>`; every operation takes the
//! lock once, so checks and the writes they guard are atomic. Blob store
//! calls happen outside the lock.
//!
//! Authentication is delegated: each operation receives the caller's
//! already-authenticated [`UserId`].

use crate::blob::{BlobStore, MemoryBlobStore};
use crate::error::{SessionError, SessionResult};
use crate::ids::{BlobRef, MediaId, MemId, NoteId, UploadTargetId, UserId};
use crate::join_code::{unique_code, JoinCode, JoinCodeSource, RandomJoinCodes};
use crate::model::{
    Comment, CreatedMem, JoinedMem, MediaRecord, Mem, MemSummary, NewMem, Note, Participant, Reaction, Role, TopMem,
};
use crate::policy::UploadPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Number of mems returned by [`SessionService::top_mems`] without a limit
pub const DEFAULT_TOP_MEMS: usize = 10;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Public base URL used to build join links
    pub site_url: String,

    /// Upload limits
    pub uploads: UploadPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            site_url: "http://localhost:3000".to_string(),
            uploads: UploadPolicy::default(),
        }
    }
}

/// An issued slot, or a stored blob not yet committed
#[derive(Debug, Clone)]
pub(crate) struct PendingUpload {
    pub(crate) mem_id: MemId,
    pub(crate) user_id: UserId,
    pub(crate) issued_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    seq: u64,
    pub(crate) mems: HashMap<MemId, Mem>,
    pub(crate) participants: HashMap<(MemId, UserId), Participant>,
    pub(crate) notes: Vec<Note>,
    pub(crate) media: HashMap<MediaId, MediaRecord>,
    pub(crate) reactions: BTreeSet<Reaction>,
    pub(crate) comments: Vec<Comment>,
    pub(crate) pending: HashMap<UploadTargetId, PendingUpload>,
    pub(crate) pending_blobs: HashMap<BlobRef, PendingUpload>,
}

impl State {
    /// Insertion order tiebreaker for records sharing a timestamp
    pub(crate) fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub(crate) fn mem(&self, mem_id: MemId) -> SessionResult<&Mem> {
        self.mems
            .get(&mem_id)
            .ok_or_else(|| SessionError::not_found(format!("mem {mem_id}")))
    }

    pub(crate) fn participant(&self, mem_id: MemId, user: UserId) -> SessionResult<&Participant> {
        self.participants
            .get(&(mem_id, user))
            .ok_or(SessionError::NotParticipant)
    }

    pub(crate) fn media_item(&self, media_id: MediaId) -> SessionResult<&MediaRecord> {
        self.media
            .get(&media_id)
            .ok_or_else(|| SessionError::not_found(format!("media {media_id}")))
    }

    pub(crate) fn media_count(&self, mem_id: MemId) -> usize {
        self.media.values().filter(|m| m.mem_id == mem_id).count()
    }

    pub(crate) fn participant_count(&self, mem_id: MemId) -> usize {
        self.participants.keys().filter(|(m, _)| *m == mem_id).count()
    }

    fn code_taken(&self, code: &JoinCode) -> bool {
        self.mems.values().any(|m| &m.join_code == code)
    }

    fn mem_by_code(&self, code: &JoinCode) -> Option<&Mem> {
        self.mems.values().find(|m| &m.join_code == code)
    }
}

/// In-process mems backend
///
/// Cheap to clone; clones share state and blob storage.
#[derive(Debug, Clone)]
pub struct SessionService {
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) state: Arc<RwLock<State>>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    codes: Arc<dyn JoinCodeSource>,
}

impl SessionService {
    /// Service with in-memory blob storage and random join codes
    pub fn new(config: SessionConfig) -> Self {
        Self::with_blob_store(config, Arc::new(MemoryBlobStore::new()))
    }

    /// Service storing uploads in `blobs`
    pub fn with_blob_store(config: SessionConfig, blobs: Arc<dyn BlobStore>) -> Self {
        SessionService {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(State::default())),
            blobs,
            codes: Arc::new(RandomJoinCodes),
        }
    }

    /// Replace the join code generator
    pub fn with_join_codes(mut self, codes: Arc<dyn JoinCodeSource>) -> Self {
        self.codes = codes;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a mem; the caller becomes its creator
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_mem(&self, user: UserId, new: NewMem) -> SessionResult<CreatedMem> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(SessionError::invalid_input("mem name is empty"));
        }

        let mut state = self.state.write().await;
        let join_code = unique_code(self.codes.as_ref(), |c| state.code_taken(c))?;
        let now = Utc::now();
        let mem = Mem {
            id: MemId::new(),
            name: name.to_string(),
            description: new.description.trim().to_string(),
            place: new.place.trim().to_string(),
            is_public: new.is_public,
            creator_id: user,
            join_code: join_code.clone(),
            created_at: now,
            ended_at: None,
            seq: state.next_seq(),
        };
        let participant = Participant {
            mem_id: mem.id,
            user_id: user,
            role: Role::Creator,
            joined_at: now,
            seq: state.next_seq(),
        };

        let created = CreatedMem {
            mem_id: mem.id,
            name: mem.name.clone(),
            join_url: join_code.join_url(&self.config.site_url),
            join_code,
        };
        state.participants.insert((mem.id, user), participant);
        state.mems.insert(mem.id, mem);

        info!(mem = %created.mem_id, code = %created.join_code, "mem created");
        Ok(created)
    }

    /// Join with a code; joining twice is a no-op
    #[instrument(skip(self))]
    pub async fn join_mem(&self, user: UserId, code: &str) -> SessionResult<JoinedMem> {
        let code = JoinCode::parse(code)?;
        let mut state = self.state.write().await;
        let (mem_id, name) = match state.mem_by_code(&code) {
            Some(mem) => (mem.id, mem.name.clone()),
            None => return Err(SessionError::InvalidJoinCode(code.to_string())),
        };

        if !state.participants.contains_key(&(mem_id, user)) {
            let participant = Participant {
                mem_id,
                user_id: user,
                role: Role::Participant,
                joined_at: Utc::now(),
                seq: state.next_seq(),
            };
            state.participants.insert((mem_id, user), participant);
            info!(mem = %mem_id, "participant joined");
        } else {
            debug!(mem = %mem_id, "already a participant");
        }

        Ok(JoinedMem { mem_id, name })
    }

    /// Public summary of the mem behind a join code
    pub async fn mem_by_join_code(&self, code: &str) -> Option<MemSummary> {
        let code = JoinCode::parse(code).ok()?;
        let state = self.state.read().await;
        state.mem_by_code(&code).map(|mem| MemSummary {
            id: mem.id,
            name: mem.name.clone(),
            description: mem.description.clone(),
            place: mem.place.clone(),
        })
    }

    /// Full mem record
    ///
    /// Lookup by id is open to any caller; membership is not required.
    pub async fn mem_by_id(&self, _user: UserId, mem_id: MemId) -> Option<Mem> {
        self.state.read().await.mems.get(&mem_id).cloned()
    }

    /// Whether `user` participates in `mem_id`
    pub async fn is_member(&self, mem_id: MemId, user: UserId) -> bool {
        self.state.read().await.participants.contains_key(&(mem_id, user))
    }

    /// Members of a mem in join order
    pub async fn participants(&self, user: UserId, mem_id: MemId) -> SessionResult<Vec<Participant>> {
        let state = self.state.read().await;
        state.mem(mem_id)?;
        state.participant(mem_id, user)?;
        let mut members: Vec<Participant> = state
            .participants
            .values()
            .filter(|p| p.mem_id == mem_id)
            .cloned()
            .collect();
        members.sort_by_key(|p| p.seq);
        Ok(members)
    }

    /// End a mem; creator only. New uploads are rejected afterwards.
    #[instrument(skip(self))]
    pub async fn end_mem(&self, user: UserId, mem_id: MemId) -> SessionResult<Mem> {
        let mut state = self.state.write().await;
        if state.participant(mem_id, user)?.role != Role::Creator {
            return Err(SessionError::not_authorized("only the creator can end a mem"));
        }
        let mem = state
            .mems
            .get_mut(&mem_id)
            .ok_or_else(|| SessionError::not_found(format!("mem {mem_id}")))?;
        if mem.ended_at.is_none() {
            mem.ended_at = Some(Utc::now());
            info!(mem = %mem_id, "mem ended");
        }
        Ok(mem.clone())
    }

    /// Add a note to a mem
    pub async fn add_note(&self, user: UserId, mem_id: MemId, content: &str) -> SessionResult<Note> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::invalid_input("note is empty"));
        }
        let mut state = self.state.write().await;
        state.mem(mem_id)?;
        state.participant(mem_id, user)?;
        let note = Note {
            id: NoteId::new(),
            mem_id,
            user_id: user,
            content: content.to_string(),
            created_at: Utc::now(),
            seq: state.next_seq(),
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    /// Notes of a mem, newest first
    pub async fn list_notes(&self, user: UserId, mem_id: MemId) -> SessionResult<Vec<Note>> {
        let state = self.state.read().await;
        state.participant(mem_id, user)?;
        let mut notes: Vec<Note> = state.notes.iter().filter(|n| n.mem_id == mem_id).cloned().collect();
        notes.sort_by_key(|n| Reverse((n.created_at, n.seq)));
        Ok(notes)
    }

    /// The caller's mems, most recently created or joined first
    pub async fn top_mems(&self, user: UserId, limit: Option<usize>) -> Vec<TopMem> {
        let state = self.state.read().await;
        let mut mems: Vec<(TopMem, u64)> = state
            .participants
            .values()
            .filter(|p| p.user_id == user)
            .filter_map(|p| {
                let mem = state.mems.get(&p.mem_id)?;
                let top = TopMem {
                    id: mem.id,
                    name: mem.name.clone(),
                    description: mem.description.clone(),
                    place: mem.place.clone(),
                    join_code: mem.join_code.clone(),
                    created_at: mem.created_at,
                    joined_at: p.joined_at,
                    is_creator: p.role == Role::Creator,
                    media_count: state.media_count(mem.id),
                    participant_count: state.participant_count(mem.id),
                };
                Some((top, p.seq.max(mem.seq)))
            })
            .collect();

        mems.sort_by_key(|(top, seq)| Reverse((top.last_activity(), *seq)));
        mems.into_iter()
            .take(limit.unwrap_or(DEFAULT_TOP_MEMS))
            .map(|(top, _)| top)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Scripted(Mutex<Vec<&'static str>>);

    impl JoinCodeSource for Scripted {
        fn generate(&self) -> JoinCode {
            let mut codes = self.0.lock().unwrap();
            let next = if codes.len() > 1 { codes.remove(0) } else { codes[0] };
            JoinCode::parse(next).unwrap()
        }
    }

    fn new_mem(name: &str) -> NewMem {
        NewMem {
            name: name.to_string(),
            description: "Saturday at the lake".to_string(),
            place: "Lake Tahoe".to_string(),
            is_public: false,
        }
    }

    #[tokio::test]
    async fn test_create_mem() {
        let service = SessionService::new(SessionConfig {
            site_url: "https://mems.example".into(),
            ..Default::default()
        });
        let alice = UserId::new();

        let created = service.create_mem(alice, new_mem("  Beach day ")).await.unwrap();

        assert_eq!(created.name, "Beach day");
        assert_eq!(created.join_url, format!("https://mems.example/join/{}", created.join_code));
        assert!(service.is_member(created.mem_id, alice).await);
        let members = service.participants(alice, created.mem_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Creator);
    }

    #[tokio::test]
    async fn test_mem_by_id_needs_no_membership() {
        let service = SessionService::new(SessionConfig::default());
        let created = service.create_mem(UserId::new(), new_mem("Picnic")).await.unwrap();
        let stranger = UserId::new();

        let mem = service.mem_by_id(stranger, created.mem_id).await.unwrap();
        assert_eq!(mem.join_code, created.join_code);
        assert!(!service.is_member(created.mem_id, stranger).await);
        assert!(service.mem_by_id(stranger, MemId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let service = SessionService::new(SessionConfig::default());
        let err = service.create_mem(UserId::new(), new_mem("   ")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_join_code_collision_retries() {
        let codes = Arc::new(Scripted(Mutex::new(vec!["AAAAAA", "AAAAAA", "BBBBBB"])));
        let service = SessionService::new(SessionConfig::default()).with_join_codes(codes);
        let first = service.create_mem(UserId::new(), new_mem("one")).await.unwrap();
        let second = service.create_mem(UserId::new(), new_mem("two")).await.unwrap();
        assert_eq!(first.join_code.as_str(), "AAAAAA");
        assert_eq!(second.join_code.as_str(), "BBBBBB");
    }

    #[tokio::test]
    async fn test_join_code_exhausted() {
        let codes = Arc::new(Scripted(Mutex::new(vec!["CCCCCC"])));
        let service = SessionService::new(SessionConfig::default()).with_join_codes(codes);
        service.create_mem(UserId::new(), new_mem("one")).await.unwrap();
        let err = service.create_mem(UserId::new(), new_mem("two")).await.unwrap_err();
        assert!(matches!(err, SessionError::JoinCodeExhausted(10)));
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let service = SessionService::new(SessionConfig::default());
        let alice = UserId::new();
        let bob = UserId::new();
        let created = service.create_mem(alice, new_mem("Wedding")).await.unwrap();

        let code = created.join_code.as_str().to_lowercase();
        let joined = service.join_mem(bob, &code).await.unwrap();
        service.join_mem(bob, &code).await.unwrap();
        service.join_mem(alice, &code).await.unwrap();

        assert_eq!(joined.mem_id, created.mem_id);
        let members = service.participants(bob, created.mem_id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].role, Role::Creator);
        assert_eq!(members[1].role, Role::Participant);
    }

    #[tokio::test]
    async fn test_invalid_join_code() {
        let service = SessionService::new(SessionConfig::default());
        let err = service.join_mem(UserId::new(), "ZZZZZZ").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidJoinCode(_)));
        assert!(service.mem_by_join_code("ZZZZZZ").await.is_none());
        assert!(service.mem_by_join_code("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_mem_by_join_code_summary() {
        let service = SessionService::new(SessionConfig::default());
        let created = service.create_mem(UserId::new(), new_mem("Reunion")).await.unwrap();
        let summary = service.mem_by_join_code(created.join_code.as_str()).await.unwrap();
        assert_eq!(summary.id, created.mem_id);
        assert_eq!(summary.place, "Lake Tahoe");
    }

    #[tokio::test]
    async fn test_end_mem_creator_only() {
        let service = SessionService::new(SessionConfig::default());
        let alice = UserId::new();
        let bob = UserId::new();
        let created = service.create_mem(alice, new_mem("Gig")).await.unwrap();
        service.join_mem(bob, created.join_code.as_str()).await.unwrap();

        assert!(service.end_mem(bob, created.mem_id).await.unwrap_err().is_permission());
        let ended = service.end_mem(alice, created.mem_id).await.unwrap();
        assert!(ended.is_ended());
        let again = service.end_mem(alice, created.mem_id).await.unwrap();
        assert_eq!(again.ended_at, ended.ended_at);
    }

    #[tokio::test]
    async fn test_notes_newest_first_and_members_only() {
        let service = SessionService::new(SessionConfig::default());
        let alice = UserId::new();
        let created = service.create_mem(alice, new_mem("Trip")).await.unwrap();

        service.add_note(alice, created.mem_id, "first").await.unwrap();
        service.add_note(alice, created.mem_id, " second ").await.unwrap();
        let notes = service.list_notes(alice, created.mem_id).await.unwrap();
        assert_eq!(notes.iter().map(|n| n.content.as_str()).collect::<Vec<_>>(), vec!["second", "first"]);

        let outsider = UserId::new();
        assert_eq!(
            service.add_note(outsider, created.mem_id, "hi").await.unwrap_err(),
            SessionError::NotParticipant
        );
        assert!(service.add_note(alice, created.mem_id, "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_top_mems_most_recent_first() {
        let service = SessionService::new(SessionConfig::default());
        let alice = UserId::new();
        let bob = UserId::new();
        let older = service.create_mem(alice, new_mem("older")).await.unwrap();
        let other = service.create_mem(bob, new_mem("bob's")).await.unwrap();
        let newer = service.create_mem(alice, new_mem("newer")).await.unwrap();
        service.join_mem(alice, other.join_code.as_str()).await.unwrap();

        let top = service.top_mems(alice, None).await;
        let names: Vec<&str> = top.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["bob's", "newer", "older"]);
        assert!(!top[0].is_creator);
        assert_eq!(top[0].participant_count, 2);
        assert_eq!(top[1].id, newer.mem_id);
        assert_eq!(top[2].id, older.mem_id);

        assert_eq!(service.top_mems(alice, Some(1)).await.len(), 1);
        assert!(service.top_mems(UserId::new(), None).await.is_empty());
    }
}
