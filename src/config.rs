use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::ReportError;

/// Upper bound on `forecast.horizon`.
pub const MAX_HORIZON: u32 = 1000;

/// How the forecast turns a model prediction into a population increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMode {
    /// Prediction at the step-scaled means, multiplied by the step again.
    #[default]
    Compounded,
    /// Prediction at the step-scaled means, used as is.
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: u32,
    pub mode: ForecastMode,
    /// Fit only on rows that also carry an urban percentage.
    pub exclude_missing_urban: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            mode: ForecastMode::Compounded,
            exclude_missing_urban: false,
        }
    }
}

/// Explicit header names, tried before the built-in aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOverrides {
    pub name: Option<String>,
    pub region: Option<String>,
    pub population: Option<String>,
    pub net_change: Option<String>,
    pub density: Option<String>,
    pub urban_percent: Option<String>,
    pub yearly_change_percent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub baseline_year: i32,
    pub top_n: usize,
    pub delimiter: char,
    pub export_tables: bool,
    pub columns: ColumnOverrides,
    pub forecast: ForecastConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("world_population.csv"),
            output_dir: PathBuf::from("report"),
            baseline_year: 2020,
            top_n: 10,
            delimiter: ',',
            export_tables: true,
            columns: ColumnOverrides::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Read a YAML config; missing keys fall back to defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: ReportConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.top_n == 0 {
            return Err(ReportError::InvalidConfig("top_n must be at least 1".into()));
        }
        if self.forecast.horizon == 0 || self.forecast.horizon > MAX_HORIZON {
            return Err(ReportError::InvalidConfig(format!(
                "forecast.horizon must be between 1 and {MAX_HORIZON}, got {}",
                self.forecast.horizon
            )));
        }
        if last_forecast_year(self.baseline_year, self.forecast.horizon).is_none() {
            return Err(ReportError::InvalidConfig(format!(
                "baseline_year {} plus horizon {} is out of range",
                self.baseline_year, self.forecast.horizon
            )));
        }
        if !self.delimiter.is_ascii() {
            return Err(ReportError::InvalidConfig(format!(
                "delimiter {:?} is not a single-byte character",
                self.delimiter
            )));
        }
        Ok(())
    }

    /// Delimiter as the byte the csv reader expects. Validated to be ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        let mut buf = [0u8; 4];
        self.delimiter.encode_utf8(&mut buf);
        buf[0]
    }
}

/// `baseline_year + horizon`, if it fits in an `i32`.
pub fn last_forecast_year(baseline_year: i32, horizon: u32) -> Option<i32> {
    i32::try_from(horizon)
        .ok()
        .and_then(|h| baseline_year.checked_add(h))
}
