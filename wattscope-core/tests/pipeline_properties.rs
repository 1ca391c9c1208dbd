//! End-to-end behaviour of the processing pipeline and the quality report
//! on Tetouan-shaped data.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use wattscope_core::aggregate::{aggregate, AggFn, AggregateError, AggregationSchema, Frequency};
use wattscope_core::data::{load_table, FileFormat, FileSource, DatasetSource};
use wattscope_core::features::{CalendarFeatures, SEASON_COLUMN, UTILITY_COLUMN};
use wattscope_core::quality::{check, check_with_rng, SampleSizes, NO_OUTLIERS_MESSAGE};
use wattscope_core::{Column, DType, ProcessingPipeline, Table, Value};

// ── Helpers ──────────────────────────────────────────────────────────

const WEATHER: [&str; 5] = [
    "Temperature",
    "Humidity",
    "WindSpeed",
    "GeneralDiffuseFlows",
    "DiffuseFlows",
];

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// `rows` ten-minute readings with every column of the Tetouan export.
fn tetouan_table(rows: usize) -> Table {
    let stamps = (0..rows).map(|i| Some(start() + Duration::minutes(10 * i as i64)));
    let mut columns = vec![Column::timestamps("Datetime", stamps)];
    for (k, name) in WEATHER.iter().enumerate() {
        columns.push(Column::floats(
            *name,
            (0..rows).map(|i| Some(k as f64 + (i % 7) as f64 * 0.5)),
        ));
    }
    for zone in 1..=3 {
        columns.push(Column::floats(
            format!("PowerConsumption_Zone{zone}"),
            (0..rows).map(|i| Some(30_000.0 + (i % 12) as f64 * 100.0 * zone as f64)),
        ));
    }
    Table::new(columns).unwrap()
}

fn tetouan_csv(rows: usize) -> String {
    let mut csv = String::from(
        "Datetime,Temperature,Humidity,WindSpeed,GeneralDiffuseFlows,DiffuseFlows,\
         PowerConsumption_Zone1,PowerConsumption_Zone2,PowerConsumption_Zone3\n",
    );
    for i in 0..rows {
        let ts = start() + Duration::minutes(10 * i as i64);
        csv.push_str(&format!(
            "{},6.559,73.8,0.083,0.051,0.119,{},{},{}\n",
            ts.format("%-m/%-d/%Y %-H:%M"),
            34055.6 + i as f64,
            16128.87,
            20240.96
        ));
    }
    csv
}

// ── Aggregation ──────────────────────────────────────────────────────

#[test]
fn missing_day_is_filled_at_daily_frequency() {
    let day = |d| {
        NaiveDate::from_ymd_opt(2017, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    };
    let stamps: Vec<_> = (0..24)
        .map(|h| day(1) + Duration::hours(h))
        .chain((0..24).map(|h| day(3) + Duration::hours(h)))
        .map(Some)
        .collect();
    let n = stamps.len();
    let table = Table::new(vec![
        Column::timestamps("Datetime", stamps),
        Column::floats("load", (0..n).map(|_| Some(1.0))),
    ])
    .unwrap();
    let schema = AggregationSchema::from_legacy(
        &[("load".to_string(), vec![AggFn::Sum])],
        &["TotalLoad".to_string()],
    )
    .unwrap();

    let out = aggregate(&table, Frequency::daily(), "Datetime", &schema).unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(out.row(0)["TotalLoad"], Value::Float(24.0));
    assert_eq!(out.row(1)["TotalLoad"], Value::Null);
    assert_eq!(out.row(2)["Datetime"], Value::Timestamp(day(3)));
}

#[test]
fn eleven_functions_with_ten_names_is_rejected() {
    let functions: Vec<(String, Vec<AggFn>)> = WEATHER
        .iter()
        .map(|c| (c.to_string(), vec![AggFn::Mean]))
        .chain((1..=3).map(|z| (format!("PowerConsumption_Zone{z}"), vec![AggFn::Sum, AggFn::Mean])))
        .collect();
    let names: Vec<String> = (0..10).map(|i| format!("col{i}")).collect();
    assert_eq!(
        AggregationSchema::from_legacy(&functions, &names).unwrap_err(),
        AggregateError::NamingMismatch {
            functions: 11,
            names: 10
        }
    );
}

#[test]
fn default_pipeline_on_tetouan_data() {
    // two days of ten-minute readings
    let raw = tetouan_table(288);
    let out = ProcessingPipeline::default().process(&raw).unwrap();

    assert_eq!(out.shape(), (48, 16));
    assert_eq!(out.column("TotalPowerConsumption_Zone1").unwrap().dtype(), DType::Float);
    // 2017-01-01 was a Sunday
    assert_eq!(out.row(0)[UTILITY_COLUMN], Value::Int(2));
    assert_eq!(out.row(47)[SEASON_COLUMN], Value::Int(4));
}

// ── Features ─────────────────────────────────────────────────────────

#[test]
fn deriving_twice_is_idempotent() {
    let hourly = aggregate(
        &tetouan_table(144),
        Frequency::hourly(),
        "Datetime",
        &AggregationSchema::power_consumption(),
    )
    .unwrap();
    let features = CalendarFeatures::default();
    let once = features.derive_all(&hourly).unwrap();
    let twice = features.derive_all(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn season_boundary_at_march_first() {
    let table = Table::new(vec![Column::timestamps(
        "Datetime",
        [
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap().and_hms_opt(23, 59, 0),
            NaiveDate::from_ymd_opt(2023, 3, 1).unwrap().and_hms_opt(0, 0, 0),
        ],
    )])
    .unwrap();
    let out = CalendarFeatures::default().add_season(&table).unwrap();
    assert_eq!(out.row(0)[SEASON_COLUMN], Value::Int(4));
    assert_eq!(out.row(1)[SEASON_COLUMN], Value::Int(1));
}

// ── Quality report ───────────────────────────────────────────────────

#[test]
fn outlier_sentinel_and_detection() {
    let flat = Table::new(vec![Column::floats("x", (0..20).map(|i| Some(f64::from(i))))]).unwrap();
    let report = check(&flat, &[3, 3, 3]).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outliers"], NO_OUTLIERS_MESSAGE);

    let spiky = Table::new(vec![Column::ints("x", [1, 2, 3, 4, 100].map(Some))]).unwrap();
    let report = check(&spiky, &[3, 3, 3]).unwrap();
    let x = report.outliers.get("x").unwrap();
    assert_eq!(x.count, 1);
    assert!(x.limits[1] > 4.0 && x.limits[1] < 100.0);
}

#[test]
fn shape_and_missing_totals_agree() {
    let table = Table::new(vec![
        Column::floats("a", [Some(1.0), None, Some(f64::NAN), Some(4.0)]),
        Column::strs("b", [None, Some("x"), Some("y"), None]),
        Column::ints("c", [Some(1), Some(2), Some(3), Some(4)]),
    ])
    .unwrap();
    let report = check(&table, &[1, 1, 1]).unwrap();
    assert_eq!(report.shape, (4, 3));
    assert_eq!(
        report.missing_values.by_column.values().sum::<usize>(),
        report.missing_values.total
    );
    assert_eq!(report.missing_values.total, 4);
}

#[test]
fn exactly_two_identical_rows() {
    let table = Table::new(vec![
        Column::ints("a", [Some(1), Some(2), Some(1), Some(3)]),
        Column::strs("b", [Some("p"), Some("q"), Some("p"), Some("r")]),
    ])
    .unwrap();
    let report = check_with_rng(&table, SampleSizes::default(), &mut StdRng::seed_from_u64(11));
    assert_eq!(report.duplicates.total, 2);
    let examples = report.duplicates.examples.unwrap();
    assert!(examples.iter().all(|r| r["a"] == Value::Int(1)));
}

// ── Files ────────────────────────────────────────────────────────────

#[test]
fn csv_export_runs_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("powerconsumption.csv");
    fs::write(&path, tetouan_csv(36)).unwrap();

    let source = FileSource::new(&path).unwrap();
    let raw = source.load().unwrap();
    assert_eq!(raw.column("Datetime").unwrap().dtype(), DType::Str);

    let report = check(&raw, &[3, 3, 3]).unwrap();
    assert_eq!(report.dtypes["Datetime"], "object");
    assert_eq!(report.shape, (36, 9));

    let processed = ProcessingPipeline::default().process(&raw).unwrap();
    assert_eq!(processed.height(), 6);
    let reloaded = load_table(&path, FileFormat::Csv).unwrap();
    assert_eq!(reloaded, raw);
}
