// src/dataset/mod.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs::File, io::BufReader, io::Read, path::Path};
use tracing::{debug, info};

pub mod columns;
pub mod raw_table;
pub mod source;
pub mod utils;

pub use columns::{ColumnMap, Field};
pub use raw_table::{read_raw_table, RawRow, RawTable};
pub use source::{CachedSource, CsvFileSource, DataSource, Fingerprint};

use crate::aggregate::checked_total;
use crate::config::{ColumnOverrides, ReportConfig};
use crate::error::{ReportError, ReportResult};
use utils::{
    clean_str, is_missing, parse_grouped_decimal, parse_grouped_int, parse_grouped_uint,
    parse_percent,
};

/// One country or dependency, with every numeric column already typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: String,
    pub region: String,
    pub population: u64,
    pub net_change: Option<i64>,
    /// People per km².
    pub density: Option<f64>,
    /// In [0, 100]; `None` where the source says `N.A.`.
    pub urban_percent: Option<f64>,
    pub yearly_change_percent: Option<f64>,
}

/// Immutable snapshot of the loaded table. Names are unique and the total
/// population fits in a `u64`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<CountryRecord>,
}

impl Dataset {
    /// Build from already-typed records, enforcing unique names and a
    /// representable total.
    pub fn from_records(records: Vec<CountryRecord>) -> ReportResult<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            if !seen.insert(r.name.as_str()) {
                return Err(ReportError::DuplicateName {
                    line: i as u64 + 1,
                    name: r.name.clone(),
                });
            }
        }
        checked_total(records.iter().map(|r| r.population), "world population")?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of `population` over every record. Checked when the dataset was built.
    pub fn total_population(&self) -> u64 {
        self.records.iter().map(|r| r.population).sum()
    }
}

/// How to read the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub columns: ColumnOverrides,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            columns: ColumnOverrides::default(),
        }
    }
}

impl From<&ReportConfig> for LoadOptions {
    fn from(cfg: &ReportConfig) -> Self {
        Self {
            delimiter: cfg.delimiter_byte(),
            columns: cfg.columns.clone(),
        }
    }
}

/// Open `path` and normalize it into a [`Dataset`].
#[tracing::instrument(level = "info", skip(path, options), fields(path = %path.as_ref().display()))]
pub fn load_dataset<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Dataset> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open population table: {:?}", path.as_ref()))?;
    let dataset = read_dataset(BufReader::new(file), options)
        .with_context(|| format!("Failed to load {:?}", path.as_ref()))?;
    info!(records = dataset.len(), "loaded dataset");
    Ok(dataset)
}

/// Parse and normalize a table from any reader.
pub fn read_dataset<R: Read>(reader: R, options: &LoadOptions) -> Result<Dataset> {
    let raw = read_raw_table(reader, options.delimiter)?;
    let map = ColumnMap::resolve(&raw.headers, &options.columns)?;

    let mut seen: HashSet<String> = HashSet::with_capacity(raw.rows.len());
    let mut records = Vec::with_capacity(raw.rows.len());
    for row in &raw.rows {
        let record = normalize_row(&map, row)?;
        if !seen.insert(record.name.clone()) {
            return Err(ReportError::DuplicateName {
                line: row.line,
                name: record.name,
            }
            .into());
        }
        records.push(record);
    }

    let total = checked_total(records.iter().map(|r| r.population), "world population")?;
    debug!(rows = records.len(), total, "normalized rows");
    Ok(Dataset { records })
}

fn invalid(map: &ColumnMap, row: &RawRow, field: Field, expected: &'static str) -> ReportError {
    ReportError::InvalidCell {
        line: row.line,
        column: map.header(field).to_string(),
        value: map.cell(&row.fields, field).to_string(),
        expected,
    }
}

fn required_text(map: &ColumnMap, row: &RawRow, field: Field) -> ReportResult<String> {
    let raw = map.cell(&row.fields, field);
    if is_missing(raw) {
        return Err(invalid(map, row, field, "non-empty text"));
    }
    Ok(clean_str(raw).to_string())
}

/// `N.A.` or blank → `Ok(None)`; anything unparseable or rejected by `parse` is fatal.
fn optional<T>(
    map: &ColumnMap,
    row: &RawRow,
    field: Field,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> ReportResult<Option<T>> {
    let raw = map.cell(&row.fields, field);
    if is_missing(raw) {
        return Ok(None);
    }
    parse(raw)
        .map(Some)
        .ok_or_else(|| invalid(map, row, field, expected))
}

fn normalize_row(map: &ColumnMap, row: &RawRow) -> ReportResult<CountryRecord> {
    let name = required_text(map, row, Field::Name)?;
    let region = required_text(map, row, Field::Region)?;
    let population = parse_grouped_uint(map.cell(&row.fields, Field::Population))
        .ok_or_else(|| invalid(map, row, Field::Population, "non-negative integer"))?;
    let net_change = optional(map, row, Field::NetChange, "integer", parse_grouped_int)?;
    let density = optional(map, row, Field::Density, "non-negative number", |s| {
        parse_grouped_decimal(s).filter(|v| *v >= 0.0)
    })?;
    let urban_percent = optional(
        map,
        row,
        Field::UrbanPercent,
        "percentage between 0 and 100",
        |s| parse_percent(s).filter(|v| (0.0..=100.0).contains(v)),
    )?;
    let yearly_change_percent = optional(
        map,
        row,
        Field::YearlyChangePercent,
        "percentage",
        parse_percent,
    )?;

    Ok(CountryRecord {
        name,
        region,
        population,
        net_change,
        density,
        urban_percent,
        yearly_change_percent,
    })
}
