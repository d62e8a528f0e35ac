//! Gaussian Process engine used to model correlated noise
//!
//! [GpEngine] is the capability the detrending pipeline needs from a GP implementation,
//! [DenseGp] is the default one. [BoundGp] tags an engine with the grid its covariance was
//! computed for, so likelihood and prediction calls against a stale grid fail loudly.

mod bound;
pub use bound::{BoundGp, GridId};

mod dense;
pub use dense::DenseGp;

mod kernel;
pub use kernel::{Kernel, KernelKind};

use crate::error::GpError;

use ndarray::{Array1, ArrayView1};
use rand::Rng;

/// Predictive mean and variance of a GP
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub mean: Array1<f64>,
    pub variance: Array1<f64>,
}

/// Gaussian Process with mutable hyperparameters
///
/// [GpEngine::compute] binds the process to an observation grid with per-point errors and must be
/// called before [GpEngine::log_likelihood] and [GpEngine::predict]. Changing the hyperparameters
/// keeps the bound grid.
pub trait GpEngine {
    /// Current hyperparameter vector
    fn parameter_vector(&self) -> Array1<f64>;

    fn set_parameter_vector(&mut self, p: ArrayView1<f64>) -> Result<(), GpError>;

    /// Bind to observation times `t` with errors `yerr`, discarding the previous grid
    fn compute(&mut self, t: ArrayView1<f64>, yerr: ArrayView1<f64>) -> Result<(), GpError>;

    /// Natural logarithm of the marginal likelihood of `y` observed on the bound grid
    fn log_likelihood(&mut self, y: ArrayView1<f64>) -> Result<f64, GpError>;

    /// Predictive distribution at `t` conditioned on `y` observed on the bound grid
    fn predict(&mut self, y: ArrayView1<f64>, t: ArrayView1<f64>) -> Result<Prediction, GpError>;

    /// One realisation of the GP prior at `t`
    fn sample<R: Rng + ?Sized>(
        &self,
        t: ArrayView1<f64>,
        rng: &mut R,
    ) -> Result<Array1<f64>, GpError>;
}
