//! 격리 경계 벤치마크
//!
//! 정상 경로, 에러 경로, 패닉 경로에서 `Containment::guard`의 비용과
//! 필터 프록시 한 번의 평가 비용을 측정합니다.

use std::sync::Arc;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use ironhook_contract::{
    CapabilityInstance, CapabilityKind, Containment, Filter, Lifecycle, PluginError, PluginObject,
};
use ironhook_core::diagnostics::{Diagnostic, DiagnosticSink};
use ironhook_core::message::Message;
use ironhook_core::options::{OptionLookup, OptionTable, lookup_for};

/// 진단을 버리는 싱크
struct Discard;

impl DiagnosticSink for Discard {
    fn report(&self, diagnostic: &Diagnostic) {
        black_box(diagnostic);
    }
}

struct Even;

impl Lifecycle for Even {
    fn init(&mut self, _options: &OptionLookup) -> Result<(), PluginError> {
        Ok(())
    }
}

impl Filter for Even {
    fn eval(&mut self, msg: &mut Message) -> Result<bool, PluginError> {
        let n: u64 = msg
            .get_value("n")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        Ok(n % 2 == 0)
    }
}

fn bench_guard(c: &mut Criterion) {
    let guard = Containment::new("bench", CapabilityKind::Filter, Arc::new(Discard));
    let mut group = c.benchmark_group("containment_guard");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ok", |b| {
        b.iter(|| guard.guard("eval", false, || Ok(black_box(true))))
    });

    group.bench_function("error", |b| {
        b.iter(|| {
            guard.guard("eval", false, || {
                Err(PluginError::Fault(black_box("bad").to_owned()))
            })
        })
    });

    // 기본 패닉 훅의 stderr 출력 제외
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    group.bench_function("panic", |b| {
        b.iter(|| guard.guard("eval", false, || panic!("bench panic")))
    });
    std::panic::set_hook(previous);

    group.finish();
}

fn bench_filter_instance(c: &mut Criterion) {
    let table = Arc::new(OptionTable::new());
    let handle = table.register(std::iter::empty::<(&str, &str)>());
    let options = lookup_for(&table, handle);

    let mut instance = CapabilityInstance::new(
        "even",
        "bench",
        PluginObject::Filter(Box::new(Even)),
        Arc::new(Discard),
    );
    instance.init(&options);
    instance.open();

    let mut group = c.benchmark_group("filter_instance");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("eval_1000", |b| {
        b.iter(|| {
            let mut matched = 0usize;
            for i in 0..1000u64 {
                let msg = Message::new();
                let _ = msg.set_value("n", i.to_string());
                if instance.eval(msg) {
                    matched += 1;
                }
            }
            black_box(matched)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_guard, bench_filter_instance);
criterion_main!(benches);
