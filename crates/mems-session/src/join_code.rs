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

//! Join codes
//!
//! Six characters drawn from an alphabet without the easily confused
//! `I`, `O`, `0` and `1`.

use crate::error::{SessionError, SessionResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters a join code may contain
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a join code
pub const JOIN_CODE_LEN: usize = 6;

/// Generation attempts before giving up on a unique code
pub const MAX_JOIN_CODE_ATTEMPTS: usize = 10;

/// A validated join code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    /// Parse user input; surrounding whitespace and case are ignored
    pub fn parse(input: &str) -> SessionResult<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == JOIN_CODE_LEN && code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b));
        if valid {
            Ok(JoinCode(code))
        } else {
            Err(SessionError::InvalidJoinCode(input.trim().to_string()))
        }
    }

    /// Code as text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shareable link that walks a visitor through sign-in and joining
    pub fn join_url(&self, site_url: &str) -> String {
        format!("{}/join/{}", site_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JoinCode {
    type Error = SessionError;

    fn try_from(value: String) -> SessionResult<Self> {
        JoinCode::parse(&value)
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> String {
        code.0
    }
}

/// Source of candidate join codes
pub trait JoinCodeSource: Send + Sync + fmt::Debug {
    /// Produce one candidate; uniqueness is checked by the caller
    fn generate(&self) -> JoinCode;
}

/// Uniformly random join codes from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJoinCodes;

impl JoinCodeSource for RandomJoinCodes {
    fn generate(&self) -> JoinCode {
        let mut rng = rand::thread_rng();
        let code = (0..JOIN_CODE_LEN)
            .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
            .collect();
        JoinCode(code)
    }
}

/// First candidate from `source` not rejected by `taken`
pub fn unique_code(source: &dyn JoinCodeSource, taken: impl Fn(&JoinCode) -> bool) -> SessionResult<JoinCode> {
    for _ in 0..MAX_JOIN_CODE_ATTEMPTS {
        let candidate = source.generate();
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(SessionError::JoinCodeExhausted(MAX_JOIN_CODE_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Fixed(&'static str, AtomicUsize);

    impl JoinCodeSource for Fixed {
        fn generate(&self) -> JoinCode {
            self.1.fetch_add(1, Ordering::SeqCst);
            JoinCode(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(JoinCode::parse(" abc234 ").unwrap().as_str(), "ABC234");
        assert!(JoinCode::parse("ABC23").is_err());
        assert!(JoinCode::parse("ABCDE0").is_err());
        assert!(JoinCode::parse("ABCDEI").is_err());
    }

    #[test]
    fn test_join_url() {
        let code = JoinCode::parse("QX7P2M").unwrap();
        assert_eq!(code.join_url("https://mems.app/"), "https://mems.app/join/QX7P2M");
        assert_eq!(code.join_url("http://localhost:3000"), "http://localhost:3000/join/QX7P2M");
    }

    #[test]
    fn test_unique_code_gives_up() {
        let source = Fixed("AAAAAA", AtomicUsize::new(0));
        let err = unique_code(&source, |_| true).unwrap_err();
        assert_eq!(err, SessionError::JoinCodeExhausted(MAX_JOIN_CODE_ATTEMPTS));
        assert_eq!(source.1.load(Ordering::SeqCst), MAX_JOIN_CODE_ATTEMPTS);
    }

    #[test]
    fn test_unique_code_skips_taken() {
        let source = RandomJoinCodes;
        let first = source.generate();
        let code = unique_code(&source, |c| c == &first).unwrap();
        assert_ne!(code, first);
    }

    proptest! {
        #[test]
        fn proptest_random_codes_parse(_seed in 0u8..64) {
            let code = RandomJoinCodes.generate();
            prop_assert_eq!(JoinCode::parse(code.as_str()).unwrap(), code);
        }
    }
}
