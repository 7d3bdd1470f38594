use thiserror::Error;

/// Domain failures raised while loading, aggregating or forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("required column `{column}` not found (tried: {tried})")]
    MissingColumn { column: &'static str, tried: String },
    #[error("line {line}, column `{column}`: cannot read {value:?} as {expected}")]
    InvalidCell {
        line: u64,
        column: String,
        value: String,
        expected: &'static str,
    },
    #[error("line {line}: duplicate country or dependency `{name}`")]
    DuplicateName { line: u64, name: String },
    #[error("percentage of {what} is undefined: the total is zero")]
    UndefinedPercentage { what: &'static str },
    #[error("sum of {what} does not fit in a 64-bit count")]
    PopulationOverflow { what: &'static str },
    #[error("forecast needs at least {required} records with yearly change and net change, found {found}")]
    InsufficientData { found: usize, required: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type for `Result<T, ReportError>`.
pub type ReportResult<T> = Result<T, ReportError>;
