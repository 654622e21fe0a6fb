use thiserror::Error;

/// Errors raised while loading or assembling the model.
/// Input-format problems fail fast; data sparsity (isolated depots,
/// unreachable pairs) is only logged by the affected components.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("line {line}: expected 6 fields in edge record, found {found}")]
    InvalidEdgeRecord { line: usize, found: usize },

    #[error("line {line}: invalid timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("line {line}: invalid number '{value}' for {field}")]
    InvalidNumber {
        line: usize,
        value: String,
        field: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
