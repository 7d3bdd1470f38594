use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::dataset::CountryRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetChangeEntry {
    #[serde(rename = "Country or Dependency")]
    pub name: String,
    #[serde(rename = "Net Change")]
    pub net_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityEntry {
    #[serde(rename = "Country or Dependency")]
    pub name: String,
    #[serde(rename = "Density(p/km^2)")]
    pub density: f64,
}

/// Stable descending top-`n` over the records that carry a key.
fn top_by<K, F, C>(records: &[CountryRecord], n: usize, key: F, cmp: C) -> Vec<(&CountryRecord, K)>
where
    K: Copy,
    F: Fn(&CountryRecord) -> Option<K>,
    C: Fn(&K, &K) -> Ordering,
{
    let mut keyed: Vec<(&CountryRecord, K)> =
        records.iter().filter_map(|r| key(r).map(|k| (r, k))).collect();
    keyed.sort_by(|a, b| cmp(&b.1, &a.1));
    keyed.truncate(n);
    keyed
}

/// Countries with the largest one-year net change. Records without one are skipped.
#[tracing::instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn top_net_change(records: &[CountryRecord], n: usize) -> Vec<NetChangeEntry> {
    top_by(records, n, |r| r.net_change, i64::cmp)
        .into_iter()
        .map(|(r, net_change)| NetChangeEntry {
            name: r.name.clone(),
            net_change,
        })
        .collect()
}

/// Countries with the highest people per km². Records without a density are skipped.
#[tracing::instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn top_density(records: &[CountryRecord], n: usize) -> Vec<DensityEntry> {
    top_by(records, n, |r| r.density, f64::total_cmp)
        .into_iter()
        .map(|(r, density)| DensityEntry {
            name: r.name.clone(),
            density,
        })
        .collect()
}
