//! ironhook 기본 제공 플러그인
//!
//! capability마다 참조 구현을 하나씩 제공합니다.
//!
//! | 클래스 | capability | 타입 |
//! |---|---|---|
//! | `DummySource` | source | [`DummySource`] |
//! | `CounterSource` | tracked-source | [`CounterSource`] |
//! | `CounterReader` | reader | [`CounterReader`] |
//! | `RandomFilter` | filter | [`RandomFilter`] |
//! | `KeyValueParser` | parser | [`KeyValueParser`] |
//! | `TaggingRewriter` | rewriter | [`TaggingRewriter`] |
//! | `SimpleFile` | destination | [`SimpleFileDestination`] |
//!
//! [`register_builtin`]으로 레지스트리에 한 번에 등록합니다.

pub mod clock;
pub mod counter_reader;
pub mod counter_source;
pub mod dummy_source;
pub mod file_destination;
pub mod kv_parser;
pub mod random_filter;
pub mod tagging_rewriter;

pub use clock::{Clock, ManualClock, ReadThrottle, SystemClock};
pub use counter_reader::CounterReader;
pub use counter_source::{AckLedger, CounterSource};
pub use dummy_source::DummySource;
pub use file_destination::SimpleFileDestination;
pub use kv_parser::{KeyValueParser, KvSyntax, MalformedPolicy};
pub use random_filter::RandomFilter;
pub use tagging_rewriter::TaggingRewriter;

use ironhook_contract::{
    CapabilityKind, PluginFactory, PluginInfo, PluginObject, PluginRegistry, RegistryError,
};

fn info(class: &str, kind: CapabilityKind, description: &str) -> PluginInfo {
    PluginInfo {
        class: class.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        description: description.to_owned(),
        kind,
    }
}

/// 기본 제공 플러그인 클래스를 모두 등록합니다.
pub fn register_builtin(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    let factories = [
        PluginFactory::new(
            info(dummy_source::CLASS, CapabilityKind::Source, "fixed-text source"),
            || PluginObject::Source(Box::new(DummySource::new())),
        ),
        PluginFactory::new(
            info(
                counter_source::CLASS,
                CapabilityKind::TrackedSource,
                "position-tracked counter source with nack redelivery",
            ),
            || PluginObject::TrackedSource(Box::new(CounterSource::new())),
        ),
        PluginFactory::new(
            info(
                counter_reader::CLASS,
                CapabilityKind::Reader,
                "rate-limited counter reader with numeric bookmarks",
            ),
            || PluginObject::Reader(Box::new(CounterReader::new())),
        ),
        PluginFactory::new(
            info(random_filter::CLASS, CapabilityKind::Filter, "seeded random sampling filter"),
            || PluginObject::Filter(Box::new(RandomFilter::new())),
        ),
        PluginFactory::new(
            info(kv_parser::CLASS, CapabilityKind::Parser, "key=value pair parser"),
            || PluginObject::Parser(Box::new(KeyValueParser::new())),
        ),
        PluginFactory::new(
            info(
                tagging_rewriter::CLASS,
                CapabilityKind::Rewriter,
                "sets one field and one tag",
            ),
            || PluginObject::Rewriter(Box::new(TaggingRewriter::new())),
        ),
        PluginFactory::new(
            info(
                file_destination::CLASS,
                CapabilityKind::Destination,
                "appends lines to a file",
            ),
            || PluginObject::Destination(Box::new(SimpleFileDestination::new())),
        ),
    ];
    for factory in factories {
        registry.register(factory)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_one_class_per_kind() {
        let mut registry = PluginRegistry::new();
        register_builtin(&mut registry).unwrap();
        assert_eq!(registry.count(), CapabilityKind::ALL.len());
        for kind in CapabilityKind::ALL {
            assert_eq!(
                registry.list().iter().filter(|i| i.kind == kind).count(),
                1,
                "{kind}"
            );
        }
    }

    #[test]
    fn double_registration_fails() {
        let mut registry = PluginRegistry::new();
        register_builtin(&mut registry).unwrap();
        assert!(register_builtin(&mut registry).is_err());
    }

    #[test]
    fn factories_match_declared_kind() {
        let mut registry = PluginRegistry::new();
        register_builtin(&mut registry).unwrap();
        for info in registry.list() {
            let factory = registry.get(&info.class).unwrap();
            assert_eq!(factory.create().kind(), info.kind);
        }
    }
}
