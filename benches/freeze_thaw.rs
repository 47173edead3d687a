use coldstore::{freeze, freeze_value, thaw, thaw_value, Options, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
struct Event {
    id: u64,
    name: String,
    tags: Vec<String>,
    payload: Vec<u8>,
    ok: bool,
}

fn sample_event() -> Event {
    Event {
        id: 0xdead_beef_0000_1234,
        name: "span.finish".to_string(),
        tags: vec![
            "env:prod".to_string(),
            "service:checkout".to_string(),
            "region:us-east-1".to_string(),
        ],
        payload: vec![7u8; 512],
        ok: true,
    }
}

fn sample_value() -> Value {
    Value::Map(vec![
        (Value::Keyword(coldstore::value::Name::new("id")), Value::Int(0xdead_beef)),
        (
            Value::Keyword(coldstore::value::Name::new("tags")),
            Value::Vector(
                ["env:prod", "service:checkout", "region:us-east-1"]
                    .iter()
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
        ),
        (
            Value::Keyword(coldstore::value::Name::new("payload")),
            Value::Bytes(vec![7u8; 512]),
        ),
    ])
}

fn typed_round_trip(c: &mut Criterion) {
    let event = sample_event();
    let opts = Options::default();
    let bytes = freeze(&event, &opts).unwrap();

    c.bench_function("freeze typed struct", |b| {
        b.iter(|| black_box(freeze(&event, &opts).unwrap()));
    });

    c.bench_function("thaw typed struct", |b| {
        b.iter(|| black_box(thaw::<Event>(&bytes, &opts).unwrap()));
    });
}

fn dynamic_round_trip(c: &mut Criterion) {
    let value = sample_value();
    let opts = Options::default();
    let bytes = freeze_value(&value, &opts).unwrap();

    c.bench_function("freeze_value dynamic map", |b| {
        b.iter(|| black_box(freeze_value(&value, &opts).unwrap()));
    });

    c.bench_function("thaw_value dynamic map", |b| {
        b.iter(|| black_box(thaw_value(&bytes, &opts).unwrap()));
    });
}

fn compressed_round_trip(c: &mut Criterion) {
    // Large enough to clear `Compression::Auto`'s threshold, so this
    // actually exercises the lz4 path rather than falling back to none.
    let mut event = sample_event();
    event.payload = vec![7u8; 64_000];
    let opts = Options::default();
    let bytes = freeze(&event, &opts).unwrap();

    c.bench_function("freeze with auto compression", |b| {
        b.iter(|| black_box(freeze(&event, &opts).unwrap()));
    });

    c.bench_function("thaw with auto compression", |b| {
        b.iter(|| black_box(thaw::<Event>(&bytes, &opts).unwrap()));
    });
}

criterion_group!(benches, typed_round_trip, dynamic_round_trip, compressed_round_trip);
criterion_main!(benches);
