//! 플러그인 레지스트리 -- 클래스 이름으로 인스턴스 생성
//!
//! [`PluginRegistry`]는 클래스 이름과 [`PluginFactory`]를 연결합니다.
//! 설정 파일의 `[[plugins]]` 항목마다 [`PluginRegistry::instantiate`]가
//! 팩토리를 찾아 [`CapabilityInstance`]를 만듭니다.
//!
//! # 사용 예시
//! ```ignore
//! let mut registry = PluginRegistry::new();
//! ironhook_plugins::register_builtin(&mut registry)?;
//!
//! let options = Arc::new(OptionTable::new());
//! let mut set = registry.instantiate_all(&config, &options)?;
//! set.init_all()?;
//! set.open_all()?;
//! // ...
//! set.deinit_all();
//! ```

use std::fmt;
use std::sync::Arc;

use ironhook_core::config::{DEFAULT_FETCH_LIMIT, HostConfig, PluginEntry};
use ironhook_core::diagnostics::{DiagnosticSink, TracingSink};
use ironhook_core::error::CoreError;
use ironhook_core::options::{OptionLookup, OptionTable, lookup_for};
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityKind, PluginObject};
use crate::error::RegistryError;
use crate::instance::CapabilityInstance;
use crate::proxy::FetchBatch;

// ─── PluginInfo / PluginFactory ──────────────────────────────────────

/// 플러그인 클래스 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// 클래스 이름 (설정의 `class`, 예: `"SimpleFile"`)
    pub class: String,
    /// 버전 (semver, 예: `"0.1.0"`)
    pub version: String,
    /// 설명
    pub description: String,
    /// 제공하는 capability
    pub kind: CapabilityKind,
}

type Constructor = dyn Fn() -> PluginObject + Send + Sync;

/// 메타데이터와 생성자
pub struct PluginFactory {
    info: PluginInfo,
    constructor: Box<Constructor>,
}

impl PluginFactory {
    pub fn new(
        info: PluginInfo,
        constructor: impl Fn() -> PluginObject + Send + Sync + 'static,
    ) -> Self {
        Self {
            info,
            constructor: Box::new(constructor),
        }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// 새 플러그인 객체를 만듭니다.
    pub fn create(&self) -> PluginObject {
        (self.constructor)()
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginFactory")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

// ─── PluginRegistry ──────────────────────────────────────────────────

/// 플러그인 팩토리 레지스트리
///
/// 등록 순서가 보존됩니다. 생성된 인스턴스는 모두 레지스트리의 진단
/// 싱크를 공유합니다.
pub struct PluginRegistry {
    factories: Vec<PluginFactory>,
    sink: Arc<dyn DiagnosticSink>,
}

impl PluginRegistry {
    /// [`TracingSink`]로 진단을 보고하는 빈 레지스트리
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            factories: Vec::new(),
            sink,
        }
    }

    /// 팩토리를 등록합니다.
    ///
    /// 같은 클래스 이름이 이미 있거나 버전이 semver가 아니면 에러입니다.
    pub fn register(&mut self, factory: PluginFactory) -> Result<(), RegistryError> {
        let info = factory.info();
        if let Err(e) = semver::Version::parse(&info.version) {
            return Err(RegistryError::InvalidVersion {
                class: info.class.clone(),
                version: info.version.clone(),
                reason: e.to_string(),
            });
        }
        if self.contains(&info.class) {
            return Err(RegistryError::AlreadyRegistered {
                class: info.class.clone(),
            });
        }
        tracing::debug!(
            class = %info.class,
            version = %info.version,
            kind = %info.kind,
            "plugin class registered"
        );
        self.factories.push(factory);
        Ok(())
    }

    /// 팩토리를 해제하고 소유권을 반환합니다.
    pub fn unregister(&mut self, class: &str) -> Result<PluginFactory, RegistryError> {
        match self.factories.iter().position(|f| f.info.class == class) {
            Some(idx) => Ok(self.factories.remove(idx)),
            None => Err(RegistryError::NotFound {
                class: class.to_owned(),
            }),
        }
    }

    pub fn get(&self, class: &str) -> Option<&PluginFactory> {
        self.factories.iter().find(|f| f.info.class == class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.get(class).is_some()
    }

    pub fn count(&self) -> usize {
        self.factories.len()
    }

    /// 등록된 모든 클래스 정보 (등록 순서)
    pub fn list(&self) -> Vec<&PluginInfo> {
        self.factories.iter().map(|f| &f.info).collect()
    }

    /// 설정 항목 하나로 인스턴스를 만듭니다.
    ///
    /// 항목의 `kind`와 클래스가 제공하는 capability가 달라도 에러입니다.
    pub fn instantiate(&self, entry: &PluginEntry) -> Result<CapabilityInstance, RegistryError> {
        let expected: CapabilityKind = entry.kind.parse()?;
        let factory = self.get(&entry.class).ok_or_else(|| RegistryError::NotFound {
            class: entry.class.clone(),
        })?;
        if factory.info.kind != expected {
            return Err(mismatch(&entry.class, expected, factory.info.kind));
        }
        let object = factory.create();
        if object.kind() != expected {
            return Err(mismatch(&entry.class, expected, object.kind()));
        }
        Ok(CapabilityInstance::new(
            entry.id.as_str(),
            &entry.group,
            object,
            Arc::clone(&self.sink),
        ))
    }

    /// 설정의 모든 플러그인 항목으로 인스턴스를 만듭니다.
    ///
    /// 항목마다 옵션을 `options`에 새 핸들로 등록합니다. 하나라도 실패하면
    /// 에러를 반환하고, 그때까지 만든 집합이 drop되면서 핸들이 해제됩니다.
    /// 리더 폴링 한도는 `config.contract.fetch_limit`을 따릅니다.
    pub fn instantiate_all(
        &self,
        config: &HostConfig,
        options: &Arc<OptionTable>,
    ) -> Result<InstanceSet, RegistryError> {
        let mut set = InstanceSet {
            instances: Vec::new(),
            fetch_limit: config.contract.fetch_limit,
            option_table: Some(Arc::clone(options)),
        };
        for entry in &config.plugins {
            let instance = self.instantiate(entry)?;
            let handle = options.register_entry(entry);
            set.instances.push(ConfiguredInstance {
                instance,
                options: lookup_for(options, handle),
            });
        }
        tracing::info!(
            count = set.len(),
            fetch_limit = set.fetch_limit,
            "plugin instances created"
        );
        Ok(set)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}

fn mismatch(class: &str, expected: CapabilityKind, actual: CapabilityKind) -> RegistryError {
    RegistryError::KindMismatch {
        class: class.to_owned(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

// ─── InstanceSet ─────────────────────────────────────────────────────

/// 인스턴스와 그 옵션 조회 뷰
#[derive(Debug)]
pub struct ConfiguredInstance {
    pub instance: CapabilityInstance,
    pub options: OptionLookup,
}

impl ConfiguredInstance {
    /// 자신의 옵션으로 초기화합니다.
    pub fn init(&mut self) -> bool {
        self.instance.init(&self.options)
    }
}

/// 설정 순서대로 보관된 인스턴스 집합
///
/// 옵션 핸들은 [`deinit_all`](Self::deinit_all) 또는 drop 시점에 한 번만
/// 해제됩니다.
#[derive(Debug)]
pub struct InstanceSet {
    instances: Vec<ConfiguredInstance>,
    fetch_limit: usize,
    option_table: Option<Arc<OptionTable>>,
}

impl Default for InstanceSet {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            option_table: None,
        }
    }
}

impl InstanceSet {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ConfiguredInstance> {
        self.instances.iter().find(|c| c.instance.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ConfiguredInstance> {
        self.instances.iter_mut().find(|c| c.instance.id() == id)
    }

    /// 리더 한 번의 폴링에서 가져올 최대 메시지 수
    pub fn fetch_limit(&self) -> usize {
        self.fetch_limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfiguredInstance> {
        self.instances.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ConfiguredInstance> {
        self.instances.iter_mut()
    }

    /// 모든 인스턴스를 초기화합니다.
    ///
    /// 실패한 인스턴스가 있어도 나머지를 계속 초기화하고, 실패한 id를 모아
    /// 에러로 반환합니다.
    pub fn init_all(&mut self) -> Result<(), CoreError> {
        let mut failed = Vec::new();
        for c in &mut self.instances {
            if !c.init() {
                failed.push(c.instance.id().to_owned());
            }
        }
        collect_failures("init", &failed)
    }

    /// 초기화된 모든 인스턴스를 엽니다.
    pub fn open_all(&mut self) -> Result<(), CoreError> {
        let mut failed = Vec::new();
        for c in &mut self.instances {
            if !c.instance.open() {
                failed.push(c.instance.id().to_owned());
            }
        }
        collect_failures("open", &failed)
    }

    pub fn close_all(&mut self) {
        for c in &mut self.instances {
            c.instance.close();
        }
    }

    /// 리더 하나를 폴링합니다.
    ///
    /// 열려 있지 않으면 먼저 열고, 읽을 수 있으면 `fetch_limit`개까지
    /// 가져옵니다. 없는 id나 리더가 아닌 인스턴스는 빈 결과입니다.
    pub fn poll_reader(&mut self, id: &str) -> FetchBatch {
        let limit = self.fetch_limit;
        let Some(c) = self.get_mut(id) else {
            tracing::warn!(instance = id, "poll for unknown instance");
            return FetchBatch::default();
        };
        if !c.instance.check_source() {
            return FetchBatch::default();
        }
        c.instance.fetch_batch(limit)
    }

    /// 모든 인스턴스를 정리하고 옵션 핸들을 해제합니다.
    ///
    /// 각 플러그인의 deinit은 한 번만 호출됩니다.
    pub fn deinit_all(&mut self) {
        for c in &mut self.instances {
            c.instance.deinit();
        }
        self.release_options();
    }

    fn release_options(&mut self) {
        let Some(table) = self.option_table.take() else {
            return;
        };
        for c in &self.instances {
            let mut handle = c.options.handle();
            if let Err(e) = table.release(&mut handle) {
                tracing::warn!(error = %e, "failed to release option handle");
            }
        }
    }
}

impl Drop for InstanceSet {
    fn drop(&mut self) {
        self.deinit_all();
    }
}

fn collect_failures(operation: &str, failed: &[String]) -> Result<(), CoreError> {
    if failed.is_empty() {
        return Ok(());
    }
    Err(CoreError::Plugin(format!(
        "{operation} failed for: {}",
        failed.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ironhook_core::diagnostics::MemorySink;
    use ironhook_core::message::Message;

    use super::*;
    use crate::capability::{Filter, Lifecycle};
    use crate::error::PluginError;
    use crate::instance::LifecycleState;

    /// `name` 옵션이 필요한 필터
    struct Named;

    impl Lifecycle for Named {
        fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
            options.require("name")?;
            Ok(())
        }
    }

    impl Filter for Named {
        fn eval(&mut self, _msg: &mut Message) -> Result<bool, PluginError> {
            Ok(true)
        }
    }

    fn info(class: &str, version: &str) -> PluginInfo {
        PluginInfo {
            class: class.to_owned(),
            version: version.to_owned(),
            description: format!("test plugin {class}"),
            kind: CapabilityKind::Filter,
        }
    }

    fn factory(class: &str) -> PluginFactory {
        PluginFactory::new(info(class, "0.1.0"), || PluginObject::Filter(Box::new(Named)))
    }

    fn entry(id: &str, class: &str, kind: &str, name: Option<&str>) -> PluginEntry {
        let mut options = BTreeMap::new();
        if let Some(name) = name {
            options.insert("name".to_owned(), name.to_owned());
        }
        PluginEntry {
            id: id.to_owned(),
            group: "default".to_owned(),
            class: class.to_owned(),
            kind: kind.to_owned(),
            options,
        }
    }

    fn registry() -> (Arc<MemorySink>, PluginRegistry) {
        let sink = Arc::new(MemorySink::new());
        let mut registry = PluginRegistry::with_sink(sink.clone());
        registry.register(factory("Named")).unwrap();
        (sink, registry)
    }

    #[test]
    fn register_and_lookup() {
        let (_, registry) = registry();
        assert_eq!(registry.count(), 1);
        assert!(registry.contains("Named"));
        assert_eq!(registry.list()[0].class, "Named");
        assert!(registry.get("Other").is_none());
    }

    #[test]
    fn duplicate_class_rejected() {
        let (_, mut registry) = registry();
        let err = registry.register(factory("Named")).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
    }

    #[test]
    fn invalid_version_rejected() {
        let mut registry = PluginRegistry::new();
        let bad = PluginFactory::new(info("Bad", "one"), || PluginObject::Filter(Box::new(Named)));
        let err = registry.register(bad).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { .. }));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn unregister_returns_factory() {
        let (_, mut registry) = registry();
        let removed = registry.unregister("Named").unwrap();
        assert_eq!(removed.info().class, "Named");
        assert!(registry.unregister("Named").is_err());
    }

    #[test]
    fn instantiate_checks_kind() {
        let (_, registry) = registry();
        let err = registry
            .instantiate(&entry("x", "Named", "destination", None))
            .unwrap_err();
        assert!(matches!(err, RegistryError::KindMismatch { .. }));

        let err = registry
            .instantiate(&entry("x", "Named", "sink", None))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownKind(_)));

        let err = registry
            .instantiate(&entry("x", "Missing", "filter", None))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn instantiate_all_registers_options_and_inits() {
        let (sink, registry) = registry();
        let mut config = HostConfig::default();
        config.plugins = vec![
            entry("a", "Named", "filter", Some("alpha")),
            entry("b", "Named", "filter", None),
        ];
        let options = Arc::new(OptionTable::new());
        let mut set = registry.instantiate_all(&config, &options).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(options.len(), 2);

        let err = set.init_all().unwrap_err();
        assert_eq!(err.to_string(), "plugin error: init failed for: b");
        assert_eq!(
            set.get("a").unwrap().instance.state(),
            LifecycleState::Initialized
        );
        assert_eq!(
            set.get("b").unwrap().instance.state(),
            LifecycleState::Uninitialized
        );
        assert_eq!(sink.count_for("init"), 1);

        set.deinit_all();
        assert!(
            set.iter()
                .all(|c| c.instance.state() == LifecycleState::Deinitialized)
        );
        assert!(options.is_empty());

        set.deinit_all();
        assert!(options.is_empty());
    }

    #[test]
    fn dropped_set_releases_handles() {
        let (_, registry) = registry();
        let mut config = HostConfig::default();
        config.plugins = vec![
            entry("a", "Named", "filter", Some("alpha")),
            entry("b", "Named", "filter", Some("beta")),
        ];
        let options = Arc::new(OptionTable::new());
        for _ in 0..3 {
            let mut set = registry.instantiate_all(&config, &options).unwrap();
            set.init_all().unwrap();
            assert_eq!(options.len(), 2);
            drop(set);
            assert!(options.is_empty());
        }
    }

    #[test]
    fn fetch_limit_comes_from_config() {
        let (sink, registry) = registry();
        let mut config = HostConfig::default();
        config.contract.fetch_limit = 3;
        config.plugins = vec![entry("a", "Named", "filter", Some("alpha"))];
        let options = Arc::new(OptionTable::new());
        let mut set = registry.instantiate_all(&config, &options).unwrap();
        assert_eq!(set.fetch_limit(), 3);
        assert_eq!(InstanceSet::default().fetch_limit(), DEFAULT_FETCH_LIMIT);

        set.init_all().unwrap();
        assert!(set.poll_reader("a").is_empty());
        assert_eq!(sink.count_for("check_source"), 1);
        assert!(set.poll_reader("missing").is_empty());
    }

    #[test]
    fn instantiate_all_failure_releases_handles() {
        let (_, registry) = registry();
        let mut config = HostConfig::default();
        config.plugins = vec![
            entry("a", "Named", "filter", Some("alpha")),
            entry("b", "Missing", "filter", None),
        ];
        let options = Arc::new(OptionTable::new());
        assert!(registry.instantiate_all(&config, &options).is_err());
        assert!(options.is_empty());
    }
}
