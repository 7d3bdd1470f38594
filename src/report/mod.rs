// src/report/mod.rs
use anyhow::Result;
use arrow::record_batch::RecordBatch;
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info, warn};

pub mod tables;

use crate::aggregate::{
    region_totals, top_density, top_n_share, top_net_change, urban_by_region,
};
use crate::chart::{
    format::{group_thousands, group_thousands_f64},
    formats, Channel, ChartSink, ChartSpec, Encoding, Mark, Tooltip,
};
use crate::config::{ForecastMode, ReportConfig};
use crate::dataset::Dataset;
use crate::forecast::{forecast, ForecastOptions};

/// Column names of the prepared tables, shared by charts and exports.
pub mod fields {
    pub const COUNTRY: &str = "Country or Dependency";
    pub const POPULATION_2020: &str = "Population(2020)";
    pub const POPULATION_PERCENT: &str = "Population %";
    pub const REGIONS: &str = "Regions";
    pub const NET_CHANGE: &str = "Net Change";
    pub const DENSITY: &str = "Density(p/km^2)";
    pub const URBAN: &str = "Urban";
    pub const URBAN_PERCENT: &str = "Urban %";
    pub const YEAR: &str = "Year";
    pub const POPULATION: &str = "Population";
    pub const KIND: &str = "Kind";
}

const PIE_PALETTE: [&str; 11] = [
    "#1f77b4", "#f8d37a", "#57ad9e", "#ea4339", "#6641b9", "#8c564b", "#f3afad", "#93c7fa",
    "#bcbd22", "#d6dae4", "#a93226",
];
const REGION_PALETTE: [&str; 6] = [
    "#93c7fa", "#2b66c2", "#f3aead", "#ea4339", "#9aeca7", "#fbea64",
];
const WIDTH: u32 = 600;
const HEIGHT: u32 = 400;

/// The six charts of the report, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    PopulationShare,
    RegionTotals,
    NetChange,
    Density,
    Urban,
    Forecast,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::PopulationShare,
        Section::RegionTotals,
        Section::NetChange,
        Section::Density,
        Section::Urban,
        Section::Forecast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PopulationShare => "population_share",
            Section::RegionTotals => "region_totals",
            Section::NetChange => "net_change",
            Section::Density => "density",
            Section::Urban => "urban",
            Section::Forecast => "forecast",
        }
    }
}

/// A chart together with the table behind it.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub section: Section,
    pub chart: ChartSpec,
    pub table: RecordBatch,
}

/// Build the chart and table for one section.
pub fn prepare(section: Section, dataset: &Dataset, cfg: &ReportConfig) -> Result<Prepared> {
    let records = dataset.records();
    let n = cfg.top_n;

    let (chart, table) = match section {
        Section::PopulationShare => {
            let entries = top_n_share(records, n)?;
            let total = dataset.total_population();
            let chart = ChartSpec::new("World population by country", Mark::Arc)
                .rows(&entries)?
                .size(WIDTH, HEIGHT)
                .caption(format!("Total population: {}.", group_thousands(i128::from(total))))
                .description(format!(
                    "Share of the world population held by the {n} most populous countries, \
                     with every other country folded into \"Others\"."
                ))
                .encoding(Encoding {
                    theta: Some(Channel::quantitative(fields::POPULATION_2020)),
                    color: Some(
                        Channel::nominal(fields::COUNTRY)
                            .scale(json!({ "range": PIE_PALETTE })),
                    ),
                    tooltip: vec![
                        Tooltip::text(fields::COUNTRY),
                        Tooltip::number(
                            fields::POPULATION_2020,
                            formats::THOUSANDS,
                            Some("Population"),
                        ),
                        Tooltip::number(
                            fields::POPULATION_PERCENT,
                            formats::TWO_DECIMALS,
                            Some("Percentage (%)"),
                        ),
                    ],
                    ..Encoding::default()
                });
            (chart, tables::share_table(&entries)?)
        }

        Section::RegionTotals => {
            let totals = region_totals(records)?;
            let chart = ChartSpec::new("Population by region", Mark::Bar)
                .rows(&totals)?
                .size(WIDTH, HEIGHT)
                .description("Total population of each region, largest first, in billions.")
                .encoding(Encoding {
                    x: Some(
                        Channel::quantitative(fields::POPULATION_2020).axis(json!({
                            "tickCount": 5,
                            "labelExpr": "datum.value / 1E9 + \"B\""
                        })),
                    ),
                    y: Some(Channel::nominal(fields::REGIONS).sort("-x")),
                    color: Some(Channel::nominal(fields::REGIONS).no_legend()),
                    tooltip: vec![
                        Tooltip::text(fields::REGIONS),
                        Tooltip::number(
                            fields::POPULATION_2020,
                            formats::THOUSANDS,
                            Some("Population"),
                        ),
                    ],
                    ..Encoding::default()
                });
            (chart, tables::region_table(&totals)?)
        }

        Section::NetChange => {
            let entries = top_net_change(records, n);
            let chart = ChartSpec::new("Largest one-year net change in population", Mark::Bar)
                .rows(&entries)?
                .description(format!(
                    "The {n} countries whose population grew the most in one year: births \
                     minus deaths plus net migration."
                ))
                .encoding(Encoding {
                    x: Some(Channel::nominal(fields::COUNTRY).sort("-y")),
                    y: Some(Channel::quantitative(fields::NET_CHANGE)),
                    tooltip: vec![
                        Tooltip::text(fields::COUNTRY),
                        Tooltip::number(fields::NET_CHANGE, formats::THOUSANDS, None),
                    ],
                    ..Encoding::default()
                });
            (chart, tables::net_change_table(&entries)?)
        }

        Section::Density => {
            let entries = top_density(records, n);
            let chart = ChartSpec::new("Highest population density", Mark::Bar)
                .rows(&entries)?
                .size(WIDTH, HEIGHT)
                .description(format!(
                    "The {n} most densely populated countries, in people per square kilometre."
                ))
                .encoding(Encoding {
                    x: Some(
                        Channel::quantitative(fields::DENSITY)
                            .axis(json!({ "format": formats::GROUPED_INTEGER })),
                    ),
                    y: Some(Channel::nominal(fields::COUNTRY).sort("-x")),
                    color: Some(
                        Channel::quantitative(fields::DENSITY).scale(json!({ "scheme": "reds" })),
                    ),
                    tooltip: vec![
                        Tooltip::text(fields::COUNTRY),
                        Tooltip::number(fields::DENSITY, formats::GROUPED_INTEGER, None),
                    ],
                    ..Encoding::default()
                });
            (chart, tables::density_table(&entries)?)
        }

        Section::Urban => {
            let summary = urban_by_region(records)?;
            let mut chart = ChartSpec::new("Urban population by region", Mark::Arc)
                .rows(&summary.regions)?
                .size(WIDTH, HEIGHT)
                .description(
                    "Each region's share of the people living in urban areas, counting only \
                     countries that report an urban percentage.",
                )
                .encoding(Encoding {
                    theta: Some(Channel::quantitative(fields::URBAN)),
                    color: Some(
                        Channel::nominal(fields::REGIONS)
                            .scale(json!({ "range": REGION_PALETTE })),
                    ),
                    tooltip: vec![
                        Tooltip::text(fields::REGIONS),
                        Tooltip::number(
                            fields::URBAN,
                            formats::GROUPED_INTEGER,
                            Some("Urban Population"),
                        ),
                        Tooltip::number(
                            fields::URBAN_PERCENT,
                            formats::GROUPED_TWO_DECIMALS,
                            Some("Percentage (%)"),
                        ),
                    ],
                    ..Encoding::default()
                });
            chart = match summary.urban_share_of_world {
                Some(share) => chart
                    .caption(format!(
                        "Total urban population: {}.",
                        group_thousands_f64(summary.world_urban_population)
                    ))
                    .caption(format!("Share of the population living in urban areas: {share:.2}%.")),
                None => {
                    warn!("no record reports an urban percentage");
                    chart.caption("No country reports an urban percentage.")
                }
            };
            (chart, tables::urban_table(&summary.regions)?)
        }

        Section::Forecast => {
            let opts = ForecastOptions::from(cfg);
            let fc = forecast(records, &opts)?;
            let last_year = fc.points.last().map_or(opts.baseline_year, |p| p.year);
            let basis = match opts.mode {
                ForecastMode::Compounded => "step-scaled prediction, scaled again by the step",
                ForecastMode::Linear => "step-scaled prediction",
            };
            let chart = ChartSpec::new(
                &format!("World population from {} to {}", opts.baseline_year, last_year),
                Mark::Bar,
            )
            .rows(&fc.points)?
            .size(WIDTH, HEIGHT)
            .caption(format!(
                "Linear model over {} countries on yearly change and net change ({basis}).",
                fc.samples
            ))
            .description(format!(
                "Actual population in {} followed by the predicted world population for each \
                 year up to {}.",
                opts.baseline_year, last_year
            ))
            .encoding(Encoding {
                x: Some(Channel::ordinal(fields::YEAR).title("Year")),
                y: Some(Channel::quantitative(fields::POPULATION).title("World Population")),
                color: Some(Channel::nominal(fields::KIND).scale(json!({
                    "domain": ["actual", "predicted"],
                    "range": ["steelblue", "orange"]
                }))),
                tooltip: vec![
                    Tooltip::text(fields::YEAR),
                    Tooltip::number(fields::POPULATION, formats::GROUPED_INTEGER, None),
                ],
                ..Encoding::default()
            });
            (chart, tables::forecast_table(&fc.points)?)
        }
    };

    Ok(Prepared {
        section,
        chart,
        table,
    })
}

#[derive(Debug, Default)]
pub struct ReportOutcome {
    pub rendered: Vec<Section>,
    pub failed: Vec<(Section, String)>,
    pub tables: Vec<PathBuf>,
}

impl ReportOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build and render every section. A failing section is recorded and skipped;
/// the rest still render.
#[tracing::instrument(level = "info", skip_all, fields(records = dataset.len()))]
pub fn run_report(
    dataset: &Dataset,
    cfg: &ReportConfig,
    sink: &mut dyn ChartSink,
) -> ReportOutcome {
    let mut outcome = ReportOutcome::default();

    for section in Section::ALL {
        let result = prepare(section, dataset, cfg).and_then(|prepared| {
            sink.render(&prepared.chart)?;
            if cfg.export_tables {
                let path = cfg
                    .output_dir
                    .join(format!("{}.parquet", prepared.chart.name));
                let bytes = tables::write_parquet(&prepared.table, &path)?;
                info!(section = section.as_str(), path = %path.display(), bytes, "exported table");
                outcome.tables.push(path);
            }
            Ok(())
        });

        match result {
            Ok(()) => outcome.rendered.push(section),
            Err(e) => {
                error!(section = section.as_str(), "section failed: {:#}", e);
                outcome.failed.push((section, format!("{:#}", e)));
            }
        }
    }

    info!(
        rendered = outcome.rendered.len(),
        failed = outcome.failed.len(),
        "report finished"
    );
    outcome
}
