use thiserror::Error;

/// Errors surfaced by the ranking engine and pipeline.
///
/// Empty input and solver non-convergence are not errors: the former yields
/// an empty table, the latter is reported through `FitReport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("at least one of votes or reactions data must be used")]
    NoDataSource,
    #[error("ranking method `{0}` is not implemented")]
    MethodNotImplemented(String),
    #[error("unknown ranking method `{0}` (expected \"elo\" or \"ml\")")]
    UnknownMethod(String),
    #[error("category `{0}` does not exist in data")]
    UnknownCategory(String),
    #[error("bootstrap requires at least one sample")]
    NoBootstrapSamples,
    #[error("invalid match score {0} (expected 0 = B wins, 1 = draw, 2 = A wins)")]
    InvalidScore(u8),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
