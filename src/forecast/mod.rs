// src/forecast/mod.rs
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod ols;

pub use ols::LinearModel;

use crate::config::{last_forecast_year, ForecastMode, ReportConfig, MAX_HORIZON};
use crate::dataset::CountryRecord;
use crate::error::{ReportError, ReportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Actual,
    Predicted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Population")]
    pub population: f64,
    #[serde(rename = "Kind")]
    pub kind: PointKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    pub baseline_year: i32,
    pub horizon: u32,
    pub mode: ForecastMode,
    pub exclude_missing_urban: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ForecastOptions {
    fn from(cfg: &ReportConfig) -> Self {
        Self {
            baseline_year: cfg.baseline_year,
            horizon: cfg.forecast.horizon,
            mode: cfg.forecast.mode,
            exclude_missing_urban: cfg.forecast.exclude_missing_urban,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// `horizon + 1` points, baseline year first.
    pub points: Vec<ForecastPoint>,
    pub model: LinearModel,
    pub mean_yearly_change: f64,
    pub mean_net_change: f64,
    /// Rows the model was fitted on.
    pub samples: usize,
}

/// Fit population against (yearly change %, net change) and extrapolate.
///
/// The model is fitted on the records carrying both features. Each mean is taken
/// over every record carrying that feature. Step `i` feeds
/// `(mean_yearly_change * i, mean_net_change * i)` through the model. In
/// [`ForecastMode::Compounded`] the prediction is multiplied by `i` once more
/// before being added to the baseline, which grows quadratically in `i`;
/// [`ForecastMode::Linear`] adds the prediction as is.
#[tracing::instrument(level = "info", skip(records), fields(records = records.len()))]
pub fn forecast(records: &[CountryRecord], opts: &ForecastOptions) -> ReportResult<Forecast> {
    if opts.horizon > MAX_HORIZON
        || last_forecast_year(opts.baseline_year, opts.horizon).is_none()
    {
        return Err(ReportError::InvalidConfig(format!(
            "forecast horizon {} from {} is out of range",
            opts.horizon, opts.baseline_year
        )));
    }

    let usable: Vec<&CountryRecord> = records
        .iter()
        .filter(|r| !opts.exclude_missing_urban || r.urban_percent.is_some())
        .collect();

    let mut xs: Vec<[f64; 2]> = Vec::with_capacity(records.len());
    let mut ys: Vec<f64> = Vec::with_capacity(records.len());
    for r in &usable {
        if let (Some(yc), Some(nc)) = (r.yearly_change_percent, r.net_change) {
            xs.push([yc, nc as f64]);
            ys.push(r.population as f64);
        }
    }

    if xs.len() < 2 {
        return Err(ReportError::InsufficientData {
            found: xs.len(),
            required: 2,
        });
    }

    let model = LinearModel::fit(&xs, &ys)?;
    let mean_yearly_change = mean(usable.iter().filter_map(|r| r.yearly_change_percent));
    let mean_net_change = mean(usable.iter().filter_map(|r| r.net_change.map(|v| v as f64)));
    debug!(?model, mean_yearly_change, mean_net_change, "fitted forecast model");

    let baseline: f64 = records.iter().map(|r| r.population as f64).sum();

    let mut points = Vec::with_capacity(opts.horizon as usize + 1);
    points.push(ForecastPoint {
        year: opts.baseline_year,
        population: baseline,
        kind: PointKind::Actual,
    });
    // baseline_year + horizon fits in an i32, checked above
    for step in 1..=opts.horizon {
        let i = f64::from(step);
        let raw = model.predict([mean_yearly_change * i, mean_net_change * i]);
        let increase = match opts.mode {
            ForecastMode::Compounded => raw * i,
            ForecastMode::Linear => raw,
        };
        points.push(ForecastPoint {
            year: opts.baseline_year + step as i32,
            population: baseline + increase,
            kind: PointKind::Predicted,
        });
    }

    info!(
        samples = xs.len(),
        mode = ?opts.mode,
        last = points.last().map(|p| p.population).unwrap_or(baseline),
        "built forecast"
    );

    Ok(Forecast {
        points,
        model,
        mean_yearly_change,
        mean_net_change,
        samples: xs.len(),
    })
}

/// Mean of a non-empty iterator; callers guarantee at least one value.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count.max(1) as f64
}
