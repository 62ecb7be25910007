//! key=value 파서
//!
//! `a=1,b=2`를 필드 `{a: "1", b: "2"}`로 해석합니다.
//!
//! | 옵션 | 기본값 | 설명 |
//! |---|---|---|
//! | `pair-separator` | `,` | 쌍 구분자 |
//! | `value-separator` | `=` | 키/값 구분자 |
//! | `on-malformed` | `fail` | 구분자 없는 세그먼트 처리: `fail` / `skip` / `empty` |
//!
//! 규칙:
//! - 빈 세그먼트(연속/후행 구분자)는 무시합니다.
//! - 키와 값은 앞뒤 공백을 제거합니다. 빈 키는 형식 오류입니다.
//! - 값은 첫 번째 값 구분자 뒤의 전부입니다 (`a=b=c` → `a: "b=c"`).
//! - `fail` 정책에서는 입력 전체를 검증한 뒤에만 필드를 씁니다.

use std::fmt;
use std::str::FromStr;

use ironhook_contract::{Lifecycle, Parser, PluginError};
use ironhook_core::message::Message;
use ironhook_core::options::OptionLookup;

pub const CLASS: &str = "KeyValueParser";

/// 형식 오류 세그먼트 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// 입력 전체 실패
    #[default]
    Fail,
    /// 해당 세그먼트 무시
    Skip,
    /// 세그먼트 전체를 키로, 값은 빈 문자열
    Empty,
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Skip => write!(f, "skip"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            "empty" => Ok(Self::Empty),
            other => Err(format!("expected fail, skip or empty, got '{other}'")),
        }
    }
}

/// 구분자와 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvSyntax {
    pub pair_separator: String,
    pub value_separator: String,
    pub on_malformed: MalformedPolicy,
}

impl Default for KvSyntax {
    fn default() -> Self {
        Self {
            pair_separator: ",".to_owned(),
            value_separator: "=".to_owned(),
            on_malformed: MalformedPolicy::Fail,
        }
    }
}

impl KvSyntax {
    fn from_options(options: &OptionLookup) -> Result<Self, PluginError> {
        let defaults = Self::default();
        Ok(Self {
            pair_separator: options.get_or("pair-separator", &defaults.pair_separator),
            value_separator: options.get_or("value-separator", &defaults.value_separator),
            on_malformed: options
                .parse::<MalformedPolicy>("on-malformed")?
                .unwrap_or_default(),
        })
    }

    /// 입력을 (키, 값) 목록으로 나눕니다.
    ///
    /// `Fail` 정책에서 형식 오류가 있으면 해당 세그먼트의 바이트 오프셋과
    /// 함께 [`PluginError::Parse`]를 반환합니다.
    pub fn split<'a>(&self, input: &'a str) -> Result<Vec<(&'a str, &'a str)>, PluginError> {
        let mut pairs = Vec::new();
        let mut offset = 0;
        for segment in input.split(self.pair_separator.as_str()) {
            let start = offset;
            offset += segment.len() + self.pair_separator.len();
            if segment.trim().is_empty() {
                continue;
            }
            match segment.split_once(self.value_separator.as_str()) {
                Some((key, value)) if !key.trim().is_empty() => {
                    pairs.push((key.trim(), value.trim()));
                }
                split => match self.on_malformed {
                    MalformedPolicy::Fail => {
                        let reason = match split {
                            Some(_) => format!("segment '{segment}' has an empty key"),
                            None => format!(
                                "segment '{segment}' has no '{}' separator",
                                self.value_separator
                            ),
                        };
                        return Err(PluginError::Parse {
                            offset: start,
                            reason,
                        });
                    }
                    MalformedPolicy::Skip => {}
                    MalformedPolicy::Empty => {
                        if split.is_none() {
                            pairs.push((segment.trim(), ""));
                        }
                    }
                },
            }
        }
        Ok(pairs)
    }
}

#[derive(Debug, Default)]
pub struct KeyValueParser {
    syntax: KvSyntax,
}

impl KeyValueParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntax(syntax: KvSyntax) -> Self {
        Self { syntax }
    }

    pub fn syntax(&self) -> &KvSyntax {
        &self.syntax
    }
}

impl Lifecycle for KeyValueParser {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        let syntax = KvSyntax::from_options(options)?;
        if syntax.pair_separator == syntax.value_separator {
            return Err(PluginError::Config {
                key: "value-separator".to_owned(),
                reason: "must differ from pair-separator".to_owned(),
            });
        }
        tracing::debug!(class = CLASS, policy = %syntax.on_malformed, "init");
        self.syntax = syntax;
        Ok(())
    }
}

impl Parser for KeyValueParser {
    fn process(&mut self, msg: &Message, input: &str) -> Result<bool, PluginError> {
        for (key, value) in self.syntax.split(input)? {
            msg.set_value(key, value)?;
        }
        Ok(true)
    }
}
