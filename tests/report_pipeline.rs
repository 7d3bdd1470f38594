use anyhow::Result;
use serde_json::Value;
use std::{fs, path::Path};
use tempfile::tempdir;
use worldpop::{
    chart::VegaLiteDir,
    dataset::{load_dataset, CachedSource, CsvFileSource, LoadOptions},
    report::{fields, run_report, Section},
    ReportConfig, ReportError,
};

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/world_population_sample.csv"
);

fn read_chart(dir: &Path, name: &str) -> Result<Value> {
    let text = fs::read_to_string(dir.join(format!("{name}.vl.json")))?;
    Ok(serde_json::from_str(&text)?)
}

#[test]
fn full_report_writes_charts_and_tables() -> Result<()> {
    let out = tempdir()?;
    let cfg = ReportConfig {
        data_path: FIXTURE.into(),
        output_dir: out.path().to_path_buf(),
        ..ReportConfig::default()
    };

    let source = CachedSource::new(CsvFileSource::new(&cfg.data_path, LoadOptions::from(&cfg)));
    let dataset = source.snapshot()?;
    assert_eq!(dataset.len(), 15);

    let mut sink = VegaLiteDir::new(&cfg.output_dir)?;
    let outcome = run_report(&dataset, &cfg, &mut sink);
    assert!(outcome.is_complete(), "{:?}", outcome.failed);
    assert_eq!(outcome.rendered, Section::ALL.to_vec());
    assert_eq!(sink.written().len(), 6);
    assert_eq!(outcome.tables.len(), 6);
    for table in &outcome.tables {
        assert!(table.exists(), "{}", table.display());
    }

    // population share: ten countries plus Others, conserving the total
    let share = read_chart(out.path(), "world-population-by-country")?;
    let rows = share["data"]["values"].as_array().expect("inline rows");
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[10][fields::COUNTRY], "Others");
    assert_eq!(rows[10][fields::POPULATION_2020], 241_649_871u64);
    let total: u64 = rows
        .iter()
        .map(|r| r[fields::POPULATION_2020].as_u64().unwrap_or(0))
        .sum();
    assert_eq!(total, dataset.total_population());
    let pct: f64 = rows
        .iter()
        .map(|r| r[fields::POPULATION_PERCENT].as_f64().unwrap_or(0.0))
        .sum();
    assert!((pct - 100.0).abs() < 1e-6);

    // density: Monaco leads, Singapore second
    let density = read_chart(out.path(), "highest-population-density")?;
    let names: Vec<&str> = density["data"]["values"]
        .as_array()
        .expect("inline rows")
        .iter()
        .filter_map(|r| r[fields::COUNTRY].as_str())
        .collect();
    assert_eq!(names.len(), 10);
    assert_eq!(&names[..2], &["Monaco", "Singapore"]);

    // net change: India first, Japan's decline never makes the list
    let net = read_chart(out.path(), "largest-one-year-net-change-in-population")?;
    let net_rows = net["data"]["values"].as_array().expect("inline rows");
    assert_eq!(net_rows[0][fields::COUNTRY], "India");
    assert!(net_rows.iter().all(|r| r[fields::COUNTRY] != "Japan"));

    // forecast: contiguous years, baseline equals the actual total
    let forecast = read_chart(out.path(), "world-population-from-2020-to-2030")?;
    let points = forecast["data"]["values"].as_array().expect("inline rows");
    let years: Vec<i64> = points
        .iter()
        .filter_map(|p| p[fields::YEAR].as_i64())
        .collect();
    assert_eq!(years, (2020..=2030).collect::<Vec<_>>());
    assert_eq!(
        points[0][fields::POPULATION].as_f64(),
        Some(dataset.total_population() as f64)
    );
    Ok(())
}

#[test]
fn cached_snapshot_is_shared_and_stable() -> Result<()> {
    let source = CachedSource::new(CsvFileSource::new(FIXTURE, LoadOptions::default()));
    let a = source.snapshot()?;
    let b = source.snapshot()?;
    assert!(std::sync::Arc::ptr_eq(&a, &b));

    let fresh = load_dataset(FIXTURE, &LoadOptions::default())?;
    assert_eq!(*a, fresh);
    Ok(())
}

#[test]
fn missing_region_column_is_fatal() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("no_region.csv");
    let original = fs::read_to_string(FIXTURE)?;
    let stripped = original.replacen(",Regions\n", ",Continent\n", 1);
    fs::write(&path, stripped)?;

    let err = load_dataset(&path, &LoadOptions::default()).unwrap_err();
    match err.downcast_ref::<ReportError>() {
        Some(ReportError::MissingColumn { column, .. }) => assert_eq!(*column, "region"),
        other => panic!("unexpected error {other:?}: {err:#}"),
    }
    Ok(())
}
