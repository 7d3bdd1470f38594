use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use worldpop::{
    chart::VegaLiteDir,
    dataset::{CachedSource, CsvFileSource, LoadOptions},
    report::run_report,
    ReportConfig,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "World population report: population share, regions, net change, density, urbanization and a ten-year forecast"
)]
struct Args {
    /// Population CSV
    #[arg(short, long)]
    data: Option<PathBuf>,
    /// YAML configuration file
    #[arg(short, long, env = "WORLDPOP_CONFIG")]
    config: Option<PathBuf>,
    /// Directory for chart documents and exported tables
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long)]
    horizon: Option<u32>,
    #[arg(long)]
    baseline_year: Option<i32>,
    /// Skip the parquet export of the prepared tables
    #[arg(long)]
    no_export: bool,
}

impl Args {
    fn into_config(self) -> Result<ReportConfig> {
        let mut cfg = match &self.config {
            Some(path) => ReportConfig::from_yaml_file(path)?,
            None => ReportConfig::default(),
        };
        if let Some(d) = self.data {
            cfg.data_path = d;
        }
        if let Some(o) = self.output {
            cfg.output_dir = o;
        }
        if let Some(n) = self.top_n {
            cfg.top_n = n;
        }
        if let Some(h) = self.horizon {
            cfg.forecast.horizon = h;
        }
        if let Some(y) = self.baseline_year {
            cfg.baseline_year = y;
        }
        if self.no_export {
            cfg.export_tables = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,worldpop=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) resolve configuration ────────────────────────────────────
    let cfg = Args::parse().into_config().context("resolving configuration")?;
    info!(
        data = %cfg.data_path.display(),
        output = %cfg.output_dir.display(),
        top_n = cfg.top_n,
        horizon = cfg.forecast.horizon,
        "configured"
    );

    // ─── 3) load the snapshot ────────────────────────────────────────
    let source = CachedSource::new(CsvFileSource::new(
        cfg.data_path.clone(),
        LoadOptions::from(&cfg),
    ));
    let dataset = source.snapshot()?;
    info!(records = dataset.len(), total = dataset.total_population(), "dataset ready");

    // ─── 4) render every section ─────────────────────────────────────
    let mut sink = VegaLiteDir::new(&cfg.output_dir)?;
    let outcome = run_report(&dataset, &cfg, &mut sink);

    for path in sink.written() {
        println!("{}", path.display());
    }
    for path in &outcome.tables {
        println!("{}", path.display());
    }

    if !outcome.is_complete() {
        let names: Vec<&str> = outcome.failed.iter().map(|(s, _)| s.as_str()).collect();
        bail!("{} section(s) failed: {}", names.len(), names.join(", "));
    }

    info!("all done");
    Ok(())
}
