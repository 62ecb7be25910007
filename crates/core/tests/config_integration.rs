//! ironhook.toml 통합 설정 테스트
//!
//! - ironhook.toml.example 파싱 테스트
//! - 파일 로딩 + 환경변수 우선순위 테스트
//! - 설정 항목 → 옵션 테이블 등록 테스트

use std::io::Write;
use std::sync::Arc;

use ironhook_core::config::{DEFAULT_FETCH_LIMIT, HostConfig};
use ironhook_core::error::{ConfigError, CoreError};
use ironhook_core::options::{OptionTable, lookup_for};
use serial_test::serial;

const EXAMPLE: &str = include_str!("../../../ironhook.toml.example");

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

// =============================================================================
// ironhook.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let config = HostConfig::parse(EXAMPLE).expect("example config should parse");
    config.validate().expect("example config should validate");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.contract.fetch_limit, DEFAULT_FETCH_LIMIT);
    assert_eq!(config.plugins.len(), 7);
}

#[test]
fn example_config_covers_every_kind() {
    let config = HostConfig::parse(EXAMPLE).expect("should parse");
    let mut kinds: Vec<_> = config.plugins.iter().map(|p| p.kind.as_str()).collect();
    kinds.sort_unstable();
    let mut expected = ironhook_core::config::PLUGIN_KINDS.to_vec();
    expected.sort_unstable();
    assert_eq!(kinds, expected);
}

#[test]
fn example_entries_register_into_option_table() {
    let config = HostConfig::parse(EXAMPLE).expect("should parse");
    let table = Arc::new(OptionTable::new());

    let out = config.plugin("out").expect("out entry");
    let handle = table.register_entry(out);
    let lookup = lookup_for(&table, handle);
    assert_eq!(
        lookup.get("file").as_deref(),
        Some("/var/log/ironhook/out.log")
    );

    let counter = config.plugin("counter").expect("counter entry");
    let lookup = lookup_for(&table, table.register_entry(counter));
    assert_eq!(lookup.parse::<u64>("min_interval_ms").unwrap(), Some(1000));
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
async fn from_file_reads_valid_config() {
    let file = write_config(EXAMPLE);
    let config = HostConfig::from_file(file.path()).await.expect("load");
    assert_eq!(config.plugins[0].class, "DummySource");
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let file = write_config("[contract]\nfetch_limit = 0\n");
    let err = HostConfig::from_file(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn from_file_reports_parse_failure() {
    let file = write_config("[[plugins]\nid = ");
    let err = HostConfig::from_file(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[tokio::test]
#[serial]
async fn load_applies_env_overrides() {
    let file = write_config(EXAMPLE);
    // SAFETY: #[serial]로 환경변수를 조작하는 테스트를 직렬화합니다.
    unsafe {
        std::env::set_var("IRONHOOK_GENERAL_LOG_LEVEL", "debug");
        std::env::set_var("IRONHOOK_CONTRACT_FETCH_LIMIT", "64");
    }
    let result = HostConfig::load(file.path()).await;
    unsafe {
        std::env::remove_var("IRONHOOK_GENERAL_LOG_LEVEL");
        std::env::remove_var("IRONHOOK_CONTRACT_FETCH_LIMIT");
    }

    let config = result.expect("load");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.contract.fetch_limit, 64);
}

#[tokio::test]
#[serial]
async fn load_validates_after_env_overrides() {
    let file = write_config(EXAMPLE);
    // SAFETY: #[serial]로 환경변수를 조작하는 테스트를 직렬화합니다.
    unsafe { std::env::set_var("IRONHOOK_GENERAL_LOG_FORMAT", "xml") };
    let result = HostConfig::load(file.path()).await;
    unsafe { std::env::remove_var("IRONHOOK_GENERAL_LOG_FORMAT") };

    let err = result.unwrap_err();
    assert!(err.to_string().contains("general.log_format"));
}

#[tokio::test]
#[serial]
async fn load_ignores_unparsable_numeric_override() {
    let file = write_config(EXAMPLE);
    // SAFETY: #[serial]로 환경변수를 조작하는 테스트를 직렬화합니다.
    unsafe { std::env::set_var("IRONHOOK_CONTRACT_FETCH_LIMIT", "lots") };
    let result = HostConfig::load(file.path()).await;
    unsafe { std::env::remove_var("IRONHOOK_CONTRACT_FETCH_LIMIT") };

    assert_eq!(result.expect("load").contract.fetch_limit, 10);
}
