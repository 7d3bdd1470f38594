pub mod aggregate;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod forecast;
pub mod report;

pub use config::ReportConfig;
pub use dataset::{CountryRecord, Dataset};
pub use error::{ReportError, ReportResult};

/// Installs a test-writer subscriber once per test binary.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,worldpop=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
