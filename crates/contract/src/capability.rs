//! Capability 계약 -- 플러그인이 구현하는 연산 집합
//!
//! 플러그인 종류마다 trait 하나가 대응하며, 호스트는 상속 계층이 아니라
//! [`CapabilityKind`]로 분기합니다.
//!
//! | 종류 | trait |
//! |---|---|
//! | Source | [`Source`] |
//! | PositionTrackedSource | [`TrackedSource`] = [`Source`] + [`PositionTracking`] |
//! | Reader | [`Reader`] |
//! | Filter | [`Filter`] |
//! | Parser | [`Parser`] |
//! | Rewriter | [`Rewriter`] |
//! | Destination | [`Destination`] |
//!
//! 모든 연산은 `Result`를 반환합니다. 실패를 센티널로 바꾸는 일은
//! [`containment`](crate::containment) 계층이 담당하므로 플러그인은 `?`로
//! 에러를 전파하면 됩니다.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ironhook_core::message::Message;
use ironhook_core::options::OptionLookup;
use ironhook_core::position::PositionToken;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, RegistryError};

// ─── CapabilityKind ──────────────────────────────────────────────────

/// capability 종류 (닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    Source,
    TrackedSource,
    Reader,
    Filter,
    Parser,
    Rewriter,
    Destination,
}

impl CapabilityKind {
    /// 모든 종류
    pub const ALL: [CapabilityKind; 7] = [
        Self::Source,
        Self::TrackedSource,
        Self::Reader,
        Self::Filter,
        Self::Parser,
        Self::Rewriter,
        Self::Destination,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::TrackedSource => "tracked-source",
            Self::Reader => "reader",
            Self::Filter => "filter",
            Self::Parser => "parser",
            Self::Rewriter => "rewriter",
            Self::Destination => "destination",
        }
    }

    /// 열고 닫을 자원이 있는 종류인지 여부
    pub fn has_resource(self) -> bool {
        matches!(
            self,
            Self::Source | Self::TrackedSource | Self::Reader | Self::Destination
        )
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| RegistryError::UnknownKind(s.to_owned()))
    }
}

// ─── ReadResult ──────────────────────────────────────────────────────

/// `read_message` 결과 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadResult {
    /// 메시지를 읽었음 (코드 0)
    Success,
    /// 읽을 것이 없음 (코드 1)
    NothingToRead,
    /// 연결되지 않음 (코드 2)
    NotConnected,
}

impl ReadResult {
    /// 정수 코드
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NothingToRead => 1,
            Self::NotConnected => 2,
        }
    }

    /// 정수 코드를 해석합니다. 알 수 없는 코드는 `NothingToRead`입니다.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            2 => Self::NotConnected,
            _ => Self::NothingToRead,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NothingToRead => "nothing_to_read",
            Self::NotConnected => "not_connected",
        }
    }
}

impl fmt::Display for ReadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Lifecycle ───────────────────────────────────────────────────────

/// 모든 capability가 공유하는 초기화/정리 단계
pub trait Lifecycle: Send {
    /// 옵션을 읽고 인스턴스를 준비합니다.
    ///
    /// 실패하면 인스턴스는 `Uninitialized`에 머뭅니다.
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError>;

    /// 인스턴스를 정리합니다. init 실패 후에도 호출되며 멱등이어야 합니다.
    fn deinit(&mut self) {}
}

// ─── Source ──────────────────────────────────────────────────────────

/// ack/nack 수신자
///
/// 메시지를 만든 스레드와 다른 스레드에서, 다음 `read_message`와 순서
/// 보장 없이 호출될 수 있습니다.
pub trait Acknowledge: Send + Sync {
    /// 메시지가 최종 처리됨
    fn ack(&self, _msg: &Message) -> Result<(), PluginError> {
        Ok(())
    }

    /// 메시지 처리가 실패하여 아직 전달되지 않은 것으로 간주
    fn nack(&self, _msg: &Message) -> Result<(), PluginError> {
        Ok(())
    }
}

/// ack/nack을 무시하는 기본 수신자
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreAcks;

impl Acknowledge for IgnoreAcks {}

/// 이벤트 기반 소스
pub trait Source: Lifecycle {
    fn open(&mut self) -> Result<(), PluginError>;

    fn close(&mut self) -> Result<(), PluginError>;

    /// 메시지 하나를 읽어 `msg`에 채웁니다.
    fn read_message(&mut self, msg: &Message) -> Result<ReadResult, PluginError>;

    /// 지금 읽을 수 있는지 여부. 부작용 없이 빠르게 반환해야 합니다.
    fn is_readable(&self) -> bool;

    /// 통계 인스턴스 이름. `None`이면 기본값을 사용합니다.
    fn stats_instance(&self) -> Option<String> {
        None
    }

    /// 영속 저장소 키. `None`이면 기본값을 사용합니다.
    fn persist_name(&self) -> Option<String> {
        None
    }

    /// ack/nack 수신자
    fn acknowledger(&self) -> Arc<dyn Acknowledge> {
        Arc::new(IgnoreAcks)
    }
}

/// cursor 기반 위치 추적
pub trait PositionTracking {
    /// 마지막으로 읽은 레코드 다음 위치
    fn cursor(&self) -> Result<PositionToken, PluginError>;

    /// 저장된 위치로 이동합니다. `open` 전에 호출됩니다.
    ///
    /// 실패하면 위치는 플러그인이 정한 기본 위치에 남아야 합니다.
    fn seek_to_cursor(&mut self, cursor: &PositionToken) -> Result<(), PluginError>;
}

/// 위치 추적 소스
pub trait TrackedSource: Source + PositionTracking {}

impl<T: Source + PositionTracking> TrackedSource for T {}

// ─── Reader ──────────────────────────────────────────────────────────

/// 폴링 기반 리더
///
/// ack가 없으므로 `fetch`가 `true`를 반환하면 전달이 확정됩니다.
pub trait Reader: Lifecycle {
    fn open(&mut self) -> Result<(), PluginError>;

    fn close(&mut self) -> Result<(), PluginError>;

    fn is_opened(&self) -> bool;

    /// 메시지 하나를 가져옵니다. 가져올 것이 없으면 `Ok(false)`입니다.
    fn fetch(&mut self, msg: &Message) -> Result<bool, PluginError>;

    fn is_readable(&self) -> bool;

    fn bookmark(&self) -> Result<PositionToken, PluginError>;

    /// 형식이 잘못된 bookmark는 위치를 바꾸지 않고 실패해야 합니다.
    fn seek_to_bookmark(&mut self, bookmark: &PositionToken) -> Result<(), PluginError>;

    /// 리더의 영속 이름
    fn name_by_uniq_options(&self) -> String;
}

// ─── Filter / Parser / Rewriter ──────────────────────────────────────

/// 필터
pub trait Filter: Lifecycle {
    /// 메시지를 평가합니다.
    ///
    /// 필터는 참조를 직접 해제해도 됩니다. 해제하지 않았다면 프록시가
    /// 반환 직후 해제합니다.
    fn eval(&mut self, msg: &mut Message) -> Result<bool, PluginError>;
}

/// 파서
pub trait Parser: Lifecycle {
    /// `input`을 해석해 `msg`의 필드를 채웁니다.
    fn process(&mut self, msg: &Message, input: &str) -> Result<bool, PluginError>;
}

/// 리라이터
///
/// 공유 참조만 받으므로 메시지를 해제할 수 없습니다.
pub trait Rewriter: Lifecycle {
    fn process(&mut self, msg: &Message) -> Result<bool, PluginError>;
}

// ─── Destination ─────────────────────────────────────────────────────

/// 목적지
pub trait Destination: Lifecycle {
    /// 자원을 엽니다. 이미 열려 있으면 먼저 닫아야 합니다.
    fn open(&mut self) -> Result<(), PluginError>;

    /// 자원을 닫습니다. 이미 닫혀 있으면 아무것도 하지 않습니다.
    fn close(&mut self) -> Result<(), PluginError>;

    fn is_opened(&self) -> bool;

    fn send(&mut self, payload: &str) -> Result<(), PluginError>;

    fn name_by_uniq_options(&self) -> String;
}

// ─── PluginObject ────────────────────────────────────────────────────

/// capability 종류가 태그된 플러그인 객체
pub enum PluginObject {
    Source(Box<dyn Source>),
    TrackedSource(Box<dyn TrackedSource>),
    Reader(Box<dyn Reader>),
    Filter(Box<dyn Filter>),
    Parser(Box<dyn Parser>),
    Rewriter(Box<dyn Rewriter>),
    Destination(Box<dyn Destination>),
}

impl PluginObject {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Source(_) => CapabilityKind::Source,
            Self::TrackedSource(_) => CapabilityKind::TrackedSource,
            Self::Reader(_) => CapabilityKind::Reader,
            Self::Filter(_) => CapabilityKind::Filter,
            Self::Parser(_) => CapabilityKind::Parser,
            Self::Rewriter(_) => CapabilityKind::Rewriter,
            Self::Destination(_) => CapabilityKind::Destination,
        }
    }
}

impl fmt::Debug for PluginObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginObject({})", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_result_codes() {
        assert_eq!(ReadResult::from_code(0), ReadResult::Success);
        assert_eq!(ReadResult::from_code(1), ReadResult::NothingToRead);
        assert_eq!(ReadResult::from_code(2), ReadResult::NotConnected);
        for code in [0, 1, 2] {
            assert_eq!(ReadResult::from_code(code).code(), code);
        }
    }

    #[test]
    fn unknown_read_codes_collapse_to_nothing_to_read() {
        for code in [-1, 3, 42, i32::MAX, i32::MIN] {
            assert_eq!(ReadResult::from_code(code), ReadResult::NothingToRead);
        }
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in CapabilityKind::ALL {
            assert_eq!(kind.as_str().parse::<CapabilityKind>().unwrap(), kind);
        }
        assert!("sink".parse::<CapabilityKind>().is_err());
    }

    #[test]
    fn kind_names_match_config_kinds() {
        let names: Vec<_> = CapabilityKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ironhook_core::config::PLUGIN_KINDS.to_vec());
    }

    #[test]
    fn resource_kinds() {
        assert!(CapabilityKind::Reader.has_resource());
        assert!(CapabilityKind::Destination.has_resource());
        assert!(!CapabilityKind::Filter.has_resource());
        assert!(!CapabilityKind::Rewriter.has_resource());
    }
}
