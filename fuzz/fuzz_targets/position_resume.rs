#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use ironhook_contract::{CapabilityInstance, PluginObject, ReadResult, ResumeOutcome};
use ironhook_core::diagnostics::MemorySink;
use ironhook_core::message::Message;
use ironhook_core::options::{OptionTable, lookup_for};
use ironhook_core::position::PositionToken;
use ironhook_plugins::{CounterReader, CounterSource};

fuzz_target!(|data: &str| {
    let Ok(token) = PositionToken::new(data) else {
        return;
    };
    let table = Arc::new(OptionTable::new());
    let options = lookup_for(&table, table.register([("min-interval-ms", "0")]));
    let sink = Arc::new(MemorySink::new());

    // cursor: 복원하든 대체하든 이후 읽기는 성공해야 한다
    let mut source = CapabilityInstance::new(
        "source",
        "fuzz",
        PluginObject::TrackedSource(Box::new(CounterSource::new())),
        sink.clone(),
    );
    assert!(source.init(&options));
    let outcome = source.resume(Some(&token));
    assert!(matches!(outcome, ResumeOutcome::Restored | ResumeOutcome::FellBack));
    assert!(source.open());
    let read = source.read_message(&Message::new());
    assert!(matches!(read, ReadResult::Success | ReadResult::NothingToRead));

    // bookmark: 거부되면 위치가 바뀌지 않는다
    let mut reader = CapabilityInstance::new(
        "reader",
        "fuzz",
        PluginObject::Reader(Box::new(CounterReader::new())),
        sink,
    );
    assert!(reader.init(&options));
    let before = reader.position();
    if reader.resume(Some(&token)) == ResumeOutcome::FellBack {
        assert_eq!(reader.position(), before);
    }
});
