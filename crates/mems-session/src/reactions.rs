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

//! Emoji reactions and engagement scoring
//!
//! Reactions are stored by key rather than glyph. Each key carries a weight;
//! a media item's score is the weighted sum of its reaction counts.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Known reaction keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiKey {
    /// ❤️
    Heart,
    /// 👍
    ThumbsUp,
    /// 🎉
    Party,
    /// 😂
    Laughing,
    /// 🔥
    Fire,
    /// 😍
    HeartEyes,
}

impl EmojiKey {
    /// Every key, in display order
    pub const ALL: [EmojiKey; 6] = [
        EmojiKey::Heart,
        EmojiKey::ThumbsUp,
        EmojiKey::Party,
        EmojiKey::Laughing,
        EmojiKey::Fire,
        EmojiKey::HeartEyes,
    ];

    /// Storage key
    pub fn as_str(self) -> &'static str {
        match self {
            EmojiKey::Heart => "heart",
            EmojiKey::ThumbsUp => "thumbs_up",
            EmojiKey::Party => "party",
            EmojiKey::Laughing => "laughing",
            EmojiKey::Fire => "fire",
            EmojiKey::HeartEyes => "heart_eyes",
        }
    }

    /// Rendered emoji
    pub fn glyph(self) -> &'static str {
        match self {
            EmojiKey::Heart => "\u{2764}\u{fe0f}",
            EmojiKey::ThumbsUp => "\u{1f44d}",
            EmojiKey::Party => "\u{1f389}",
            EmojiKey::Laughing => "\u{1f602}",
            EmojiKey::Fire => "\u{1f525}",
            EmojiKey::HeartEyes => "\u{1f60d}",
        }
    }

    /// Ranking weight
    pub fn weight(self) -> u64 {
        match self {
            EmojiKey::ThumbsUp => 1,
            EmojiKey::Heart | EmojiKey::Party => 3,
            EmojiKey::Laughing | EmojiKey::Fire | EmojiKey::HeartEyes => 4,
        }
    }

    /// Key for a rendered emoji
    pub fn from_glyph(glyph: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.glyph() == glyph)
    }

    /// Accepts either a storage key or a glyph
    pub fn parse(input: &str) -> SessionResult<Self> {
        input
            .parse::<EmojiKey>()
            .or_else(|_| Self::from_glyph(input).ok_or_else(|| SessionError::InvalidEmoji(input.to_string())))
    }
}

impl FromStr for EmojiKey {
    type Err = SessionError;

    fn from_str(s: &str) -> SessionResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SessionError::InvalidEmoji(s.to_string()))
    }
}

impl fmt::Display for EmojiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-key reaction counts for one media item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionCounts(BTreeMap<EmojiKey, u32>);

impl ReactionCounts {
    /// Count for one key
    pub fn get(&self, key: EmojiKey) -> u32 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    /// Add one reaction
    pub fn increment(&mut self, key: EmojiKey) {
        *self.0.entry(key).or_insert(0) += 1;
    }

    /// Remove one reaction; zero counts are dropped
    pub fn decrement(&mut self, key: EmojiKey) {
        if let Some(count) = self.0.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.0.remove(&key);
            }
        }
    }

    /// Weighted engagement score
    pub fn score(&self) -> u64 {
        self.0.iter().map(|(key, count)| key.weight() * u64::from(*count)).sum()
    }

    /// Total number of reactions
    pub fn total(&self) -> u64 {
        self.0.values().map(|c| u64::from(*c)).sum()
    }

    /// Non-zero counts
    pub fn iter(&self) -> impl Iterator<Item = (EmojiKey, u32)> + '_ {
        self.0.iter().map(|(k, c)| (*k, *c))
    }

    /// Rebuild counts from individual reactions
    pub fn tally(keys: impl IntoIterator<Item = EmojiKey>) -> Self {
        let mut counts = ReactionCounts::default();
        for key in keys {
            counts.increment(key);
        }
        counts
    }
}
