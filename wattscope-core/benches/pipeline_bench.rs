//! Criterion benchmarks for the processing pipeline and the quality report.
//!
//! 1. Hourly resampling of ten-minute readings
//! 2. Full pipeline (parse, resample, calendar features)
//! 3. Quality report on the raw table

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wattscope_core::aggregate::{aggregate, AggregationSchema, Frequency};
use wattscope_core::quality::{check_with_rng, SampleSizes};
use wattscope_core::{Column, ProcessingPipeline, Table};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_raw_table(rows: usize) -> Table {
    let start = NaiveDate::from_ymd_opt(2017, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let stamps = (0..rows).map(|i| Some(start + Duration::minutes(10 * i as i64)));
    let mut columns = vec![Column::timestamps("Datetime", stamps)];
    for name in [
        "Temperature",
        "Humidity",
        "WindSpeed",
        "GeneralDiffuseFlows",
        "DiffuseFlows",
        "PowerConsumption_Zone1",
        "PowerConsumption_Zone2",
        "PowerConsumption_Zone3",
    ] {
        columns.push(Column::floats(
            name,
            (0..rows).map(|i| Some((i as f64 * 0.01).sin() * 100.0 + 200.0)),
        ));
    }
    Table::new(columns).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_hourly");
    let schema = AggregationSchema::power_consumption();
    for rows in [1_008usize, 52_416] {
        let table = make_raw_table(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, t| {
            b.iter(|| aggregate(black_box(t), Frequency::hourly(), "Datetime", &schema).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let table = make_raw_table(52_416);
    let pipeline = ProcessingPipeline::default();
    c.bench_function("pipeline_full_year", |b| {
        b.iter(|| pipeline.process(black_box(&table)).unwrap())
    });
}

fn bench_report(c: &mut Criterion) {
    let table = make_raw_table(52_416);
    c.bench_function("quality_report_full_year", |b| {
        b.iter(|| {
            check_with_rng(
                black_box(&table),
                SampleSizes::default(),
                &mut StdRng::seed_from_u64(1),
            )
        })
    });
}

criterion_group!(benches, bench_aggregate, bench_pipeline, bench_report);
criterion_main!(benches);
