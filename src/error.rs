use thiserror::Error;

/// Every failure the library can report.
///
/// All of these are fatal to the operation that raised them; the only
/// internal retry is the bounded parent re-draw in roulette selection.
#[derive(Debug, Error)]
pub enum NnError {
    /// Missing collaborators, bad hyperparameters or layers that do not chain.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A matrix operation was given operands of incompatible shape.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("division by zero: {0}")]
    DivideByZero(String),

    /// A phase was invoked before the state it depends on exists
    /// (e.g. killing an unevaluated generation).
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("fitness evaluator returned {fitness} for individual {index}; fitness must be non-negative")]
    NegativeFitness { index: usize, fitness: f64 },

    #[error("parent selection exhausted: {0}")]
    SelectionExhausted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NnError>;
