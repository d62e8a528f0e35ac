//! GP hyperparameter optimization
//!
//! Hyperparameters maximize the marginal likelihood of the transit-corrected flux on the binned
//! grid. Minimizers see the negative log likelihood as a black-box objective.

mod cobyla;
pub use cobyla::CobylaMinimizer;

mod minimizer;
pub use minimizer::{MinimizeResult, MinimizerAlgorithm, MinimizerTrait};

use crate::error::{DetrendError, GpError};
use crate::gp::{BoundGp, GpEngine, GridId};

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Objective value substituted for failed likelihood evaluations
pub const FAILED_EVALUATION_PENALTY: f64 = 1e25;

/// Fitted GP hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Hyperparameter vector in the engine's parametrization
    pub x: Array1<f64>,
    pub success: bool,
    /// Negative log likelihood at `x`
    pub fun: f64,
    pub n_evaluations: usize,
}

/// Fit hyperparameters of `gp` to `flux_binned`, starting from its current parameter vector
///
/// `gp` must be computed for the binned grid. Likelihood evaluations failing inside the
/// minimizer, e.g. because of a non positive-definite covariance, are replaced by
/// [FAILED_EVALUATION_PENALTY]. On return the engine holds the best parameters found, whether the
/// minimizer converged or not.
pub fn optimize_hyperparameters<G, M>(
    gp: &mut BoundGp<G>,
    minimizer: &M,
    flux_binned: ArrayView1<f64>,
) -> Result<OptimizationResult, DetrendError>
where
    G: GpEngine,
    M: MinimizerTrait,
{
    let x0 = gp.parameter_vector();

    // Errors which don't depend on the parameters would turn every evaluation into a penalty
    match gp.neg_log_likelihood(GridId::Binned, x0.view(), flux_binned) {
        Err(
            err @ (GpError::StaleGrid { .. }
            | GpError::NotComputed
            | GpError::LengthMismatch { .. }
            | GpError::WrongParameterCount { .. }),
        ) => return Err(err.into()),
        _ => {}
    }

    let result = {
        let gp = RefCell::new(&mut *gp);
        let objective = |p: &[f64]| -> f64 {
            match gp
                .borrow_mut()
                .neg_log_likelihood(GridId::Binned, ArrayView1::from(p), flux_binned)
            {
                Ok(value) if value.is_finite() => value,
                _ => FAILED_EVALUATION_PENALTY,
            }
        };
        minimizer.minimize(objective, &x0.to_vec())
    };

    let x = Array1::from(result.x);
    gp.set_parameter_vector(x.view())?;

    log::debug!(
        "hyperparameter optimization finished after {} evaluations: x = {}, -ln L = {}",
        result.n_evaluations,
        x,
        result.fun,
    );
    if !result.success {
        log::warn!(
            "hyperparameter optimization did not converge after {} evaluations, -ln L = {}",
            result.n_evaluations,
            result.fun,
        );
    }

    Ok(OptimizationResult {
        x,
        success: result.success,
        fun: result.fun,
        n_evaluations: result.n_evaluations,
    })
}
