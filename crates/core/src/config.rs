//! 설정 관리 -- ironhook.toml 파싱 및 플러그인 항목 정의
//!
//! [`HostConfig`]는 로깅 설정, 계약 계층의 기본값, 그리고 플러그인 항목
//! 목록을 담는 최상위 구조체입니다. 각 `[[plugins]]` 항목은 하나의
//! 플러그인 인스턴스와 그 옵션 테이블에 대응합니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`IRONHOOK_GENERAL_LOG_LEVEL=debug` 형식)
//! 2. 설정 파일 (`ironhook.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironhook_core::error::CoreError> {
//! use ironhook_core::config::HostConfig;
//!
//! let config = HostConfig::load("ironhook.toml").await?;
//!
//! let config = HostConfig::parse(r#"
//! [[plugins]]
//! id = "out"
//! class = "SimpleFile"
//! kind = "destination"
//! options = { file = "/tmp/out.log" }
//! "#)?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, CoreError};

/// 플러그인 항목에 허용되는 capability 이름
pub const PLUGIN_KINDS: [&str; 7] = [
    "source",
    "tracked-source",
    "reader",
    "filter",
    "parser",
    "rewriter",
    "destination",
];

/// 리더 한 번의 폴링에서 가져오는 최대 메시지 수 기본값
pub const DEFAULT_FETCH_LIMIT: usize = 10;

const MAX_FETCH_LIMIT: usize = 10_000;

/// ironhook 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 계약 계층 설정
    #[serde(default)]
    pub contract: ContractConfig,
    /// 플러그인 항목
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

impl HostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CoreError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CoreError> {
        toml::from_str(toml_str).map_err(|e| {
            CoreError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONHOOK_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "IRONHOOK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IRONHOOK_GENERAL_LOG_FORMAT");
        override_usize(
            &mut self.contract.fetch_limit,
            "IRONHOOK_CONTRACT_FETCH_LIMIT",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CoreError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.contract.fetch_limit == 0 || self.contract.fetch_limit > MAX_FETCH_LIMIT {
            return Err(invalid(
                "contract.fetch_limit",
                format!("must be between 1 and {MAX_FETCH_LIMIT}"),
            ));
        }

        let mut seen = HashSet::new();
        for (idx, entry) in self.plugins.iter().enumerate() {
            entry.validate(idx)?;
            if !seen.insert(entry.id.as_str()) {
                return Err(invalid(
                    &format!("plugins[{idx}].id"),
                    format!("duplicate plugin id '{}'", entry.id),
                ));
            }
        }

        Ok(())
    }

    /// id로 플러그인 항목을 찾습니다.
    pub fn plugin(&self, id: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.id == id)
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 계약 계층 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// 리더 폴링 1회당 최대 fetch 수 (`InstanceSet::poll_reader`의 한도)
    pub fetch_limit: usize,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

/// 플러그인 항목 -- 설정 한 건당 인스턴스 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// 인스턴스 고유 id
    pub id: String,
    /// 파이프라인 그룹 (persist name 기본값에 사용)
    #[serde(default = "default_group")]
    pub group: String,
    /// 등록된 플러그인 클래스 이름
    pub class: String,
    /// capability 종류 ([`PLUGIN_KINDS`] 중 하나)
    pub kind: String,
    /// 플러그인 옵션
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl PluginEntry {
    fn validate(&self, idx: usize) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(invalid(
                &format!("plugins[{idx}].id"),
                "must not be empty".to_owned(),
            ));
        }
        if self.class.trim().is_empty() {
            return Err(invalid(
                &format!("plugins[{idx}].class"),
                "must not be empty".to_owned(),
            ));
        }
        if !PLUGIN_KINDS.contains(&self.kind.as_str()) {
            return Err(invalid(
                &format!("plugins[{idx}].kind"),
                format!("must be one of: {}", PLUGIN_KINDS.join(", ")),
            ));
        }
        Ok(())
    }
}

fn default_group() -> String {
    "default".to_owned()
}

fn invalid(field: &str, reason: String) -> CoreError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[general]
log_level = "debug"
log_format = "pretty"

[contract]
fetch_limit = 25

[[plugins]]
id = "counter"
class = "CounterSource"
kind = "tracked-source"
options = { min-interval-ms = "0" }

[[plugins]]
id = "out"
group = "main"
class = "SimpleFile"
kind = "destination"

[plugins.options]
file = "/tmp/ironhook.log"
"#;

    #[test]
    fn default_config_has_sane_values() {
        let config = HostConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.contract.fetch_limit, DEFAULT_FETCH_LIMIT);
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        HostConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = HostConfig::parse("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.contract.fetch_limit, 10);
    }

    #[test]
    fn parse_full_toml() {
        let config = HostConfig::parse(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.contract.fetch_limit, 25);
        assert_eq!(config.plugins.len(), 2);

        let counter = config.plugin("counter").unwrap();
        assert_eq!(counter.group, "default");
        assert_eq!(counter.kind, "tracked-source");
        assert_eq!(counter.options.get("min-interval-ms").unwrap(), "0");

        let out = config.plugin("out").unwrap();
        assert_eq!(out.group, "main");
        assert_eq!(out.options.get("file").unwrap(), "/tmp/ironhook.log");
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = HostConfig::parse("[general\nlog_level=").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = HostConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = HostConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_fetch_limit() {
        let mut config = HostConfig::default();
        config.contract.fetch_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("contract.fetch_limit"));
    }

    #[test]
    fn validate_rejects_unknown_kind() {
        let mut config = HostConfig::parse(SAMPLE).unwrap();
        config.plugins[0].kind = "sink".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("plugins[0].kind"));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut config = HostConfig::parse(SAMPLE).unwrap();
        config.plugins[1].id = "counter".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate plugin id"));
    }

    #[test]
    fn validate_rejects_empty_class() {
        let mut config = HostConfig::parse(SAMPLE).unwrap();
        config.plugins[0].class = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 고유한 키를 사용하므로 다른 테스트와 충돌하지 않습니다.
        unsafe { std::env::set_var("TEST_IRONHOOK_STR", "overridden") };
        override_string(&mut val, "TEST_IRONHOOK_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_IRONHOOK_STR") };
    }

    #[test]
    fn env_override_usize_invalid_keeps_original() {
        let mut val = 10usize;
        // SAFETY: 고유한 키를 사용하므로 다른 테스트와 충돌하지 않습니다.
        unsafe { std::env::set_var("TEST_IRONHOOK_USIZE_BAD", "ten") };
        override_usize(&mut val, "TEST_IRONHOOK_USIZE_BAD");
        assert_eq!(val, 10);
        unsafe { std::env::remove_var("TEST_IRONHOOK_USIZE_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 1000usize;
        override_usize(&mut val, "TEST_IRONHOOK_NONEXISTENT_12345");
        assert_eq!(val, 1000);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = HostConfig::parse(SAMPLE).unwrap();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = HostConfig::parse(&toml_str).unwrap();
        assert_eq!(config.plugins, parsed.plugins);
        assert_eq!(config.contract.fetch_limit, parsed.contract.fetch_limit);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = HostConfig::from_file("/nonexistent/path/ironhook.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
