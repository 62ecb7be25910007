//! 위치 토큰 -- 재개 가능한 읽기 위치 (cursor/bookmark)
//!
//! 토큰의 형식은 소스마다 다르며 호스트는 내용을 해석하지 않습니다.
//! 호스트는 받은 토큰을 그대로 저장했다가 재시작 후 그대로 되돌려줍니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PositionError;

/// 영속 저장되는 토큰의 최대 길이 (바이트)
pub const MAX_POSITION_TOKEN_LEN: usize = 1024;

/// 불변 위치 토큰
///
/// 두 토큰은 읽기 위치가 같을 때에만 같습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PositionToken(String);

impl PositionToken {
    /// 토큰을 생성합니다. 비어 있거나 너무 길면 실패합니다.
    pub fn new(value: impl Into<String>) -> Result<Self, PositionError> {
        let value = value.into();
        if value.is_empty() {
            return Err(PositionError::Empty);
        }
        if value.len() > MAX_POSITION_TOKEN_LEN {
            return Err(PositionError::TooLong {
                len: value.len(),
                max: MAX_POSITION_TOKEN_LEN,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PositionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PositionToken {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PositionToken {
    type Error = PositionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PositionToken> for String {
    fn from(token: PositionToken) -> Self {
        token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_opaque_and_verbatim() {
        let token = PositionToken::new("file=/var/log/a;offset=42").unwrap();
        assert_eq!(token.as_str(), "file=/var/log/a;offset=42");
        assert_eq!(token.to_string(), "file=/var/log/a;offset=42");
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(PositionToken::new("").unwrap_err(), PositionError::Empty);
    }

    #[test]
    fn oversized_token_is_rejected() {
        let long = "x".repeat(MAX_POSITION_TOKEN_LEN + 1);
        assert!(matches!(
            PositionToken::new(long).unwrap_err(),
            PositionError::TooLong { .. }
        ));
        assert!(PositionToken::new("x".repeat(MAX_POSITION_TOKEN_LEN)).is_ok());
    }

    #[test]
    fn equality_follows_content() {
        let a: PositionToken = "7".parse().unwrap();
        let b = PositionToken::new(String::from("7")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, PositionToken::new("8").unwrap());
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let token = PositionToken::new("42").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"42\"");
        let back: PositionToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        assert!(serde_json::from_str::<PositionToken>("\"\"").is_err());
    }
}
