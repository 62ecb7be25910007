#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ironhook_plugins::{KvSyntax, MalformedPolicy};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    pair_separator: String,
    value_separator: String,
    policy: FuzzPolicy,
    input: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzPolicy {
    Fail,
    Skip,
    Empty,
}

impl From<FuzzPolicy> for MalformedPolicy {
    fn from(policy: FuzzPolicy) -> Self {
        match policy {
            FuzzPolicy::Fail => MalformedPolicy::Fail,
            FuzzPolicy::Skip => MalformedPolicy::Skip,
            FuzzPolicy::Empty => MalformedPolicy::Empty,
        }
    }
}

fuzz_target!(|data: FuzzInput| {
    // 빈 구분자나 같은 구분자는 init에서 거부된다
    if data.pair_separator.is_empty()
        || data.value_separator.is_empty()
        || data.pair_separator == data.value_separator
    {
        return;
    }
    let syntax = KvSyntax {
        pair_separator: data.pair_separator,
        value_separator: data.value_separator,
        on_malformed: data.policy.into(),
    };

    // 패닉 없이 Ok 또는 Err, 반환된 키는 비어 있지 않아야 한다
    if let Ok(pairs) = syntax.split(&data.input) {
        for (key, _) in pairs {
            assert!(!key.is_empty());
        }
    }
});
