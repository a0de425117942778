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

//! Reactions and comments on media

use crate::error::{SessionError, SessionResult};
use crate::ids::{CommentId, MediaId, UserId};
use crate::model::{Comment, Reaction, ReactionToggle};
use crate::reactions::{EmojiKey, ReactionCounts};
use crate::service::SessionService;
use chrono::Utc;
use tracing::debug;

impl SessionService {
    /// Add the caller's reaction, or remove it if already present
    ///
    /// `key` may be a storage key such as `heart` or the emoji itself. The
    /// media item's counts and score are updated in the same step.
    pub async fn toggle_reaction(&self, user: UserId, media_id: MediaId, key: &str) -> SessionResult<ReactionToggle> {
        let key = EmojiKey::parse(key)?;
        let mut state = self.state.write().await;
        let mem_id = state.media_item(media_id)?.mem_id;
        state.participant(mem_id, user)?;

        let reaction = Reaction {
            media_id,
            user_id: user,
            key,
        };
        let added = state.reactions.insert(reaction);
        if !added {
            state.reactions.remove(&reaction);
        }

        let media = state
            .media
            .get_mut(&media_id)
            .ok_or_else(|| SessionError::not_found(format!("media {media_id}")))?;
        if added {
            media.reaction_counts.increment(key);
        } else {
            media.reaction_counts.decrement(key);
        }
        media.score = media.reaction_counts.score();
        debug!(media = %media_id, %key, added, score = media.score, "reaction toggled");

        Ok(ReactionToggle {
            added,
            counts: media.reaction_counts.clone(),
            score: media.score,
        })
    }

    /// Current counts for a media item
    pub async fn reaction_counts(&self, user: UserId, media_id: MediaId) -> SessionResult<ReactionCounts> {
        let state = self.state.read().await;
        let media = state.media_item(media_id)?;
        state.participant(media.mem_id, user)?;
        Ok(media.reaction_counts.clone())
    }

    /// Keys the caller has reacted with
    pub async fn my_reactions(&self, user: UserId, media_id: MediaId) -> SessionResult<Vec<EmojiKey>> {
        let state = self.state.read().await;
        let media = state.media_item(media_id)?;
        state.participant(media.mem_id, user)?;
        Ok(state
            .reactions
            .iter()
            .filter(|r| r.media_id == media_id && r.user_id == user)
            .map(|r| r.key)
            .collect())
    }

    /// Comment on a media item
    pub async fn add_comment(&self, user: UserId, media_id: MediaId, content: &str) -> SessionResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::invalid_input("comment is empty"));
        }
        let mut state = self.state.write().await;
        let mem_id = state.media_item(media_id)?.mem_id;
        state.participant(mem_id, user)?;
        let comment = Comment {
            id: CommentId::new(),
            media_id,
            user_id: user,
            content: content.to_string(),
            created_at: Utc::now(),
            seq: state.next_seq(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    /// Comments on a media item, oldest first
    pub async fn list_comments(&self, user: UserId, media_id: MediaId) -> SessionResult<Vec<Comment>> {
        let state = self.state.read().await;
        let media = state.media_item(media_id)?;
        state.participant(media.mem_id, user)?;
        let mut comments: Vec<Comment> = state.comments.iter().filter(|c| c.media_id == media_id).cloned().collect();
        comments.sort_by_key(|c| (c.created_at, c.seq));
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MemId;
    use crate::model::{NewMem, UploadMetadata};
    use crate::service::SessionConfig;
    use bytes::Bytes;

    async fn with_media() -> (SessionService, UserId, MemId, MediaId) {
        let service = SessionService::new(SessionConfig::default());
        let alice = UserId::new();
        let mem = service
            .create_mem(
                alice,
                NewMem {
                    name: "Party".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .mem_id;
        let target = service.request_upload_slot(alice, mem, "image/webp").await.unwrap();
        let blob = service.upload_bytes(&target, Bytes::from_static(b"webp")).await.unwrap();
        let media = service
            .commit_upload(
                alice,
                mem,
                blob,
                UploadMetadata {
                    file_name: "a.webp".into(),
                    content_type: "image/webp".into(),
                    file_size: 4,
                },
            )
            .await
            .unwrap();
        (service, alice, mem, media.id)
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let (service, alice, _, media) = with_media().await;

        let first = service.toggle_reaction(alice, media, "fire").await.unwrap();
        assert!(first.added);
        assert_eq!(first.score, 4);
        assert_eq!(service.my_reactions(alice, media).await.unwrap(), vec![EmojiKey::Fire]);

        let second = service.toggle_reaction(alice, media, "\u{1f525}").await.unwrap();
        assert!(!second.added);
        assert_eq!(second.score, 0);
        assert_eq!(second.counts, ReactionCounts::default());
        assert!(service.my_reactions(alice, media).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_score_accumulates_across_users() {
        let (service, alice, mem, media) = with_media().await;
        let code = service.mem_by_id(alice, mem).await.unwrap().join_code;
        let bob = UserId::new();
        service.join_mem(bob, code.as_str()).await.unwrap();

        service.toggle_reaction(alice, media, "heart").await.unwrap();
        service.toggle_reaction(bob, media, "heart").await.unwrap();
        let last = service.toggle_reaction(bob, media, "thumbs_up").await.unwrap();

        assert_eq!(last.counts.get(EmojiKey::Heart), 2);
        assert_eq!(last.score, 3 + 3 + 1);
        let listed = service.list_media_by_score(alice, mem).await.unwrap();
        assert_eq!(listed[0].score, 7);
    }

    #[tokio::test]
    async fn test_reaction_rejections() {
        let (service, alice, _, media) = with_media().await;
        assert!(matches!(
            service.toggle_reaction(alice, media, "poop").await,
            Err(SessionError::InvalidEmoji(_))
        ));
        assert_eq!(
            service.toggle_reaction(UserId::new(), media, "heart").await.unwrap_err(),
            SessionError::NotParticipant
        );
        assert!(service
            .toggle_reaction(alice, MediaId::new(), "heart")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_comments_oldest_first() {
        let (service, alice, _, media) = with_media().await;
        service.add_comment(alice, media, "so good").await.unwrap();
        service.add_comment(alice, media, "again").await.unwrap();
        assert!(service.add_comment(alice, media, " \n").await.is_err());

        let comments = service.list_comments(alice, media).await.unwrap();
        let text: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(text, vec!["so good", "again"]);
    }

    #[tokio::test]
    async fn test_delete_media_removes_engagement() {
        let (service, alice, _, media) = with_media().await;
        service.toggle_reaction(alice, media, "party").await.unwrap();
        service.add_comment(alice, media, "bye").await.unwrap();
        service.delete_media(alice, media).await.unwrap();

        let state = service.state.read().await;
        assert!(state.reactions.is_empty());
        assert!(state.comments.is_empty());
    }
}
