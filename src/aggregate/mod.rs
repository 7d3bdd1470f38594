//! Derived views over the country records. Every function here is pure and
//! independent of the others, so one failing view never blocks the rest.

pub mod ranking;
pub mod region;
pub mod share;
pub mod urban;

pub use ranking::{top_density, top_net_change, DensityEntry, NetChangeEntry};
pub use region::{region_totals, RegionTotal};
pub use share::{top_n_share, ShareEntry, OTHERS_LABEL};
pub use urban::{urban_by_region, RegionUrban, UrbanSummary};

use crate::error::{ReportError, ReportResult};

/// `part / total * 100`, refusing a zero or non-finite denominator.
pub(crate) fn percent_of(part: f64, total: f64, what: &'static str) -> ReportResult<f64> {
    if total == 0.0 || !total.is_finite() {
        return Err(ReportError::UndefinedPercentage { what });
    }
    Ok(part / total * 100.0)
}

/// Sum of populations, or `PopulationOverflow` when it leaves `u64`.
pub(crate) fn checked_total<I>(populations: I, what: &'static str) -> ReportResult<u64>
where
    I: IntoIterator<Item = u64>,
{
    populations
        .into_iter()
        .try_fold(0u64, |acc, p| acc.checked_add(p))
        .ok_or(ReportError::PopulationOverflow { what })
}
