//! FILENAME: core/widget-engine/benches/widget_calculations.rs
//! Widget calculation benchmarks.
//!
//! Run with: cargo bench -p widget-engine --bench widget_calculations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use engine::Record;
use serde_json::json;
use widget_engine::{calculate_widget, WidgetCache, WidgetDefinition};

const REGIONS: [&str; 5] = ["EU", "US", "APAC", "LATAM", "MEA"];
const CHANNELS: [&str; 3] = ["web", "store", "partner"];

fn generate_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new()
                .with("region", REGIONS[i % REGIONS.len()])
                .with("channel", CHANNELS[i % CHANNELS.len()])
                .with("customer", format!("c{}", i % 997))
                .with("amount", (i % 250) as f64 * 1.5)
                // One record per 15 minutes, starting 2024-01-01.
                .with("created", 1_704_067_200_000i64 + i as i64 * 900_000)
        })
        .collect()
}

fn chart_definition() -> WidgetDefinition {
    WidgetDefinition::from_value(json!({
        "filters": [{"field": "amount", "operator": "gt", "value": 10}],
        "buckets": [
            {"field": "created", "type": "dateHistogram", "interval": "day"},
            {"field": "region", "type": "terms", "order": {"by": 0}}
        ],
        "metrics": [
            {"field": "amount", "agg": "sum"},
            {"field": "customer", "agg": "cardinality"}
        ]
    }))
    .unwrap()
}

fn kpi_definition() -> WidgetDefinition {
    WidgetDefinition::from_value(json!({
        "kpi": {
            "metric": {"field": "amount", "agg": "avg"},
            "timestampField": "created",
            "window": {"type": "recent", "period": "7d"}
        },
        "format": {"format": "currency"}
    }))
    .unwrap()
}

fn bench_chart(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart");
    let definition = chart_definition();

    for size in [1_000usize, 10_000, 100_000] {
        let records = generate_records(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| calculate_widget(black_box(records), black_box(&definition)))
        });
    }

    group.finish();
}

fn bench_kpi(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi");
    let definition = kpi_definition();

    for size in [1_000usize, 100_000] {
        let records = generate_records(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| calculate_widget(black_box(records), black_box(&definition)))
        });
    }

    group.finish();
}

fn bench_cache_hit(c: &mut Criterion) {
    let records = generate_records(10_000);
    let definition = chart_definition();
    let mut cache = WidgetCache::new(4);
    cache.get_or_calculate(&records, &definition);

    c.bench_function("cache_hit_10000", |b| {
        b.iter(|| cache.get_or_calculate(black_box(&records), black_box(&definition)))
    });
}

criterion_group!(benches, bench_chart, bench_kpi, bench_cache_hit);
criterion_main!(benches);
