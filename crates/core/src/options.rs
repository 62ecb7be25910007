//! 옵션 조회 -- 핸들 단위 설정 키/값 접근
//!
//! 플러그인은 [`OptionLookup`]을 통해서만 설정을 읽습니다. 조회는 호출
//! 시점에 [`OptionSource`]로 위임되며 값을 캐시하지 않습니다.
//!
//! 키 정규화 규칙:
//! - `-`는 `_`로 치환됩니다 (`min-interval-ms` ≡ `min_interval_ms`).
//! - 빈 문자열 값은 설정되지 않은 것으로 간주합니다.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::PluginEntry;
use crate::error::{ConfigError, HandleError};
use crate::handle::{Handle, HandleTable};

/// 옵션 키를 정규화합니다.
pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

/// 호스트가 구현하는 옵션 저장소
///
/// 순수 함수처럼 동작해야 합니다: 같은 핸들과 키에 대해 부작용 없이
/// 현재 값을 반환합니다.
pub trait OptionSource: Send + Sync {
    /// `handle`에 바인딩된 옵션 `key`를 조회합니다.
    ///
    /// `key`는 이미 정규화된 상태로 전달됩니다.
    fn lookup(&self, handle: Handle, key: &str) -> Option<String>;
}

// ─── OptionLookup ────────────────────────────────────────────────────

/// 하나의 핸들에 바인딩된 읽기 전용 옵션 뷰
#[derive(Clone)]
pub struct OptionLookup {
    handle: Handle,
    source: Arc<dyn OptionSource>,
}

impl OptionLookup {
    /// 새 조회 뷰를 생성합니다.
    pub fn new(handle: Handle, source: Arc<dyn OptionSource>) -> Self {
        Self { handle, source }
    }

    /// 바인딩된 핸들
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// 옵션 값을 조회합니다. 없거나 빈 값이면 `None`입니다.
    pub fn get(&self, key: &str) -> Option<String> {
        if self.handle.is_null() {
            return None;
        }
        self.source
            .lookup(self.handle, &normalize_key(key))
            .filter(|v| !v.is_empty())
    }

    /// 옵션 값을 조회하고, 없으면 `default`를 반환합니다.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    /// 필수 옵션을 조회합니다.
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingOption {
            key: key.to_owned(),
        })
    }

    /// 옵션을 파싱합니다. 설정되지 않았으면 `Ok(None)`입니다.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    field: key.to_owned(),
                    reason: format!("'{raw}': {e}"),
                }),
        }
    }
}

impl fmt::Debug for OptionLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionLookup")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

// ─── OptionTable ─────────────────────────────────────────────────────

/// 기본 제공 옵션 저장소
///
/// 핸들마다 옵션 맵을 하나씩 보관합니다. 값은 언제든 변경할 수 있고,
/// 이미 발급된 [`OptionLookup`]은 다음 조회에서 변경된 값을 봅니다.
#[derive(Debug, Default)]
pub struct OptionTable {
    entries: RwLock<HandleTable<HashMap<String, String>>>,
}

impl OptionTable {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 옵션 집합을 등록하고 새 핸들을 반환합니다.
    pub fn register<I, K, V>(&self, options: I) -> Handle
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = options
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
            .collect();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(map)
    }

    /// 설정 파일의 플러그인 항목을 등록합니다.
    pub fn register_entry(&self, entry: &PluginEntry) -> Handle {
        self.register(entry.options.iter().map(|(k, v)| (k, v.clone())))
    }

    /// 옵션 값을 설정합니다.
    pub fn set(&self, handle: Handle, key: &str, value: impl Into<String>) -> Result<(), HandleError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let map = resolve_mut(&mut entries, handle)?;
        map.insert(normalize_key(key), value.into());
        Ok(())
    }

    /// 옵션 값을 제거합니다.
    pub fn unset(&self, handle: Handle, key: &str) -> Result<Option<String>, HandleError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let map = resolve_mut(&mut entries, handle)?;
        Ok(map.remove(&normalize_key(key)))
    }

    /// 핸들과 옵션 집합을 해제하고 핸들을 0으로 만듭니다.
    pub fn release(&self, handle: &mut Handle) -> Result<(), HandleError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(*handle)?;
        handle.release();
        Ok(())
    }

    /// 등록된 핸들 수
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OptionSource for OptionTable {
    fn lookup(&self, handle: Handle, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(handle)?.get(key).cloned()
    }
}

fn resolve_mut(
    entries: &mut HandleTable<HashMap<String, String>>,
    handle: Handle,
) -> Result<&mut HashMap<String, String>, HandleError> {
    if handle.is_null() {
        return Err(HandleError::Null);
    }
    entries.get_mut(handle).ok_or(HandleError::Stale {
        handle: handle.raw(),
    })
}

/// 테이블과 핸들로 조회 뷰를 만듭니다.
pub fn lookup_for(table: &Arc<OptionTable>, handle: Handle) -> OptionLookup {
    OptionLookup::new(handle, Arc::clone(table) as Arc<dyn OptionSource>)
}
