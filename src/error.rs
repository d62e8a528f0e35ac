use crate::detrend::Stage;
use crate::gp::GridId;

/// Error returned from [crate::Detrender] and the light-curve helpers
#[derive(Debug, thiserror::Error)]
pub enum DetrendError {
    #[error("malformed input data: {0}")]
    DataFormat(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transit model is not set, call add_transits() first")]
    NoTransitModel,

    #[error("hyperparameters are not optimized yet, call optimize() first")]
    NotOptimized,

    #[error("{operation} requires stage {required:?} or later, current stage is {actual:?}")]
    InvalidStage {
        operation: &'static str,
        required: Stage,
        actual: Stage,
    },

    #[error(transparent)]
    Gp(#[from] GpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "plot")]
    #[error("plotting failed: {0}")]
    Plot(String),
}

/// Error returned from [crate::GpEngine] implementations and [crate::BoundGp]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GpError {
    #[error("covariance is not computed, call compute() first")]
    NotComputed,

    #[error("covariance is computed for the {bound:?} grid, but {requested:?} grid is requested")]
    StaleGrid {
        bound: Option<GridId>,
        requested: GridId,
    },

    #[error("array length {actual} doesn't match the computed grid length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("parameter vector has length {actual}, {expected} is expected")]
    WrongParameterCount { expected: usize, actual: usize },

    #[error("parameter vector contains non-finite value {0}")]
    NonFiniteParameter(f64),

    #[error("covariance matrix is not positive definite")]
    NotPositiveDefinite,
}
