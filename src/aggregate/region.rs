use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::CountryRecord;
use crate::error::{ReportError, ReportResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTotal {
    #[serde(rename = "Regions")]
    pub region: String,
    #[serde(rename = "Population(2020)")]
    pub population: u64,
}

/// Population summed per region, largest first. Equal sums stay in region-name order.
#[tracing::instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn region_totals(records: &[CountryRecord]) -> ReportResult<Vec<RegionTotal>> {
    let mut by_region: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        let sum = by_region.entry(r.region.as_str()).or_default();
        *sum = sum
            .checked_add(r.population)
            .ok_or(ReportError::PopulationOverflow {
                what: "region population",
            })?;
    }

    let mut out: Vec<RegionTotal> = by_region
        .into_iter()
        .map(|(region, population)| RegionTotal {
            region: region.to_string(),
            population,
        })
        .collect();
    out.sort_by(|a, b| b.population.cmp(&a.population));
    Ok(out)
}
