use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nuoca_protocol::{RawValues, Value, Values};
use nuoca_runtime::normalize;

fn raw_map(fields: usize) -> RawValues {
    let mut raw = RawValues::new();
    for i in 0..fields {
        raw.insert(format!("metric_{i}"), Value::Float(i as f64 * 0.5));
    }
    raw.insert("TimeStamp".into(), Value::String("1700000000000".into()));
    raw
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let mut static_values = Values::new();
    static_values.insert("env".into(), Value::String("prod".into()));
    static_values.insert("host".into(), Value::String("db-1".into()));

    for &fields in &[8usize, 64, 512] {
        let raw = raw_map(fields);
        group.bench_function(format!("fields_{fields}"), |b| {
            b.iter(|| {
                normalize(
                    black_box("NuoMonitor"),
                    black_box(raw.clone()),
                    1_700_000_000_000,
                    10,
                    &static_values,
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
