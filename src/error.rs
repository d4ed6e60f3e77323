use thiserror::Error;

/// Errors raised by the simulation core.
///
/// All of them are input problems detected before integration starts; the
/// integrator itself has no failure states.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("gene must have exactly {expected} components, got {actual}")]
    InvalidGeneLength { expected: usize, actual: usize },

    #[error("unsupported concentration mode {0} (expected 0, 1 or 2)")]
    UnsupportedConcentrationMode(i64),

    #[error("invalid simulation constants: {0}")]
    InvalidConstants(String),

    #[error("invalid analysis settings: {0}")]
    InvalidAnalysis(String),

    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
