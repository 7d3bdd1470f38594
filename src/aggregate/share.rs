use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{checked_total, percent_of};
use crate::dataset::CountryRecord;
use crate::error::ReportResult;

pub const OTHERS_LABEL: &str = "Others";

/// A slice of the world-population pie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEntry {
    #[serde(rename = "Country or Dependency")]
    pub label: String,
    #[serde(rename = "Population(2020)")]
    pub population: u64,
    #[serde(rename = "Population %")]
    pub percent: f64,
}

/// The `n` most populous records plus one `Others` entry holding the rest.
///
/// The `Others` entry is always emitted for non-empty input, with population 0
/// when there are no more than `n` records. Percentages are taken against the
/// total of all records.
#[tracing::instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn top_n_share(records: &[CountryRecord], n: usize) -> ReportResult<Vec<ShareEntry>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let total = checked_total(records.iter().map(|r| r.population), "world population")?;

    let mut sorted: Vec<&CountryRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.population.cmp(&a.population));

    let split = n.min(sorted.len());
    let (head, tail) = sorted.split_at(split);
    let others = checked_total(tail.iter().map(|r| r.population), "world population")?;

    let mut out = Vec::with_capacity(split + 1);
    for r in head {
        out.push(ShareEntry {
            label: r.name.clone(),
            population: r.population,
            percent: percent_of(r.population as f64, total as f64, "world population")?,
        });
    }
    out.push(ShareEntry {
        label: OTHERS_LABEL.to_string(),
        population: others,
        percent: percent_of(others as f64, total as f64, "world population")?,
    });

    debug!(entries = out.len(), others, "built population share");
    Ok(out)
}
