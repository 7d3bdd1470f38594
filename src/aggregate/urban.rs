use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::percent_of;
use crate::dataset::CountryRecord;
use crate::error::{ReportError, ReportResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionUrban {
    #[serde(rename = "Regions")]
    pub region: String,
    /// Absolute number of people living in urban areas.
    #[serde(rename = "Urban")]
    pub urban_population: f64,
    /// Share of the world urban population.
    #[serde(rename = "Urban %")]
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrbanSummary {
    /// In region-name order.
    pub regions: Vec<RegionUrban>,
    pub world_urban_population: f64,
    /// Population of the records that report an urban percentage.
    pub world_population: u64,
    /// `None` only when no record reports an urban percentage.
    pub urban_share_of_world: Option<f64>,
}

/// Urban population per region over the records that report `urban_percent`.
#[tracing::instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn urban_by_region(records: &[CountryRecord]) -> ReportResult<UrbanSummary> {
    let mut by_region: BTreeMap<&str, f64> = BTreeMap::new();
    let mut world_urban = 0.0;
    let mut world_population: u64 = 0;
    let mut reporting = 0usize;

    for r in records {
        let Some(pct) = r.urban_percent else {
            continue;
        };
        let urban = r.population as f64 * pct / 100.0;
        *by_region.entry(r.region.as_str()).or_default() += urban;
        world_urban += urban;
        world_population = world_population.checked_add(r.population).ok_or(
            ReportError::PopulationOverflow {
                what: "urban-reporting population",
            },
        )?;
        reporting += 1;
    }

    if reporting == 0 {
        return Ok(UrbanSummary {
            regions: Vec::new(),
            world_urban_population: 0.0,
            world_population: 0,
            urban_share_of_world: None,
        });
    }

    let regions = by_region
        .into_iter()
        .map(|(region, urban_population)| {
            Ok(RegionUrban {
                region: region.to_string(),
                urban_population,
                percent: percent_of(urban_population, world_urban, "world urban population")?,
            })
        })
        .collect::<ReportResult<Vec<_>>>()?;

    let share = percent_of(world_urban, world_population as f64, "world population")?;
    debug!(
        reporting,
        skipped = records.len() - reporting,
        world_urban,
        "built urban summary"
    );

    Ok(UrbanSummary {
        regions,
        world_urban_population: world_urban,
        world_population,
        urban_share_of_world: Some(share),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::rec;

    fn urban(name: &str, region: &str, population: u64, pct: Option<f64>) -> CountryRecord {
        CountryRecord {
            urban_percent: pct,
            ..rec(name, region, population)
        }
    }

    #[test]
    fn single_record_owns_the_whole_share() -> ReportResult<()> {
        let out = urban_by_region(&[urban("A", "R1", 1000, Some(50.0))])?;
        assert_eq!(out.world_urban_population, 500.0);
        assert_eq!(out.regions.len(), 1);
        assert_eq!(out.regions[0].urban_population, 500.0);
        assert_eq!(out.regions[0].percent, 100.0);
        assert_eq!(out.world_population, 1000);
        assert_eq!(out.urban_share_of_world, Some(50.0));
        Ok(())
    }

    #[test]
    fn missing_urban_is_excluded_from_both_totals() -> ReportResult<()> {
        let records = vec![
            urban("A", "Asia", 1000, Some(60.0)),
            urban("B", "Europe", 500, Some(80.0)),
            urban("C", "Europe", 9_999, None),
            urban("D", "Africa", 2000, Some(25.0)),
        ];
        let out = urban_by_region(&records)?;

        assert_eq!(out.world_population, 3500);
        assert_eq!(out.world_urban_population, 600.0 + 400.0 + 500.0);
        let names: Vec<&str> = out.regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, vec!["Africa", "Asia", "Europe"]);

        let pct: f64 = out.regions.iter().map(|r| r.percent).sum();
        assert!((pct - 100.0).abs() < 1e-6);
        let share = out.urban_share_of_world.unwrap();
        assert!((share - 1500.0 / 3500.0 * 100.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn nothing_reporting_is_empty() -> ReportResult<()> {
        let out = urban_by_region(&[urban("A", "R", 10, None)])?;
        assert!(out.regions.is_empty());
        assert_eq!(out.urban_share_of_world, None);
        assert!(urban_by_region(&[])?.regions.is_empty());
        Ok(())
    }

    #[test]
    fn reporting_population_past_u64_is_an_error() {
        let half = u64::MAX / 2 + 1;
        let records = vec![
            urban("A", "R1", half, Some(10.0)),
            urban("B", "R2", half, Some(10.0)),
        ];
        assert!(matches!(
            urban_by_region(&records),
            Err(ReportError::PopulationOverflow { .. })
        ));
    }

    #[test]
    fn zero_urban_total_is_undefined() {
        let records = vec![urban("A", "R", 100, Some(0.0))];
        assert!(matches!(
            urban_by_region(&records),
            Err(ReportError::UndefinedPercentage { .. })
        ));
    }
}
