use crate::optimize::minimizer::{MinimizeResult, MinimizerTrait};

use cobyla::{Func, RhoBeg, StopTols, minimize};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// COBYLA (Constrained Optimization BY Linear Approximations) minimizer wrapper
///
/// COBYLA is a derivative-free algorithm building linear approximations of the objective, which
/// suits GP likelihoods whose gradients are not available. The search is confined to a box of
/// half-width `search_radius` around the starting point. The algorithm is described in M.J.D.
/// Powell's 1994 paper "A direct search optimization method that models the objective and
/// constraint functions by linear interpolation".
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "Cobyla")]
pub struct CobylaMinimizer {
    pub max_evaluations: usize,
    pub rhobeg: f64,
    pub ftol_rel: f64,
    #[serde(default = "CobylaMinimizer::default_search_radius")]
    pub search_radius: f64,
}

impl CobylaMinimizer {
    /// Create a new [CobylaMinimizer].
    ///
    /// # Arguments
    /// - `max_evaluations`: maximum number of objective evaluations
    /// - `rhobeg`: initial change to parameters
    /// - `ftol_rel`: relative tolerance on objective value for convergence
    /// - `search_radius`: half-width of the search box around the starting point, per parameter
    pub fn new(max_evaluations: usize, rhobeg: f64, ftol_rel: f64, search_radius: f64) -> Self {
        assert!(max_evaluations > 0, "max_evaluations must be positive");
        assert!(
            rhobeg.is_finite() && rhobeg > 0.0,
            "rhobeg must be finite and positive"
        );
        assert!(
            ftol_rel.is_finite() && ftol_rel >= 0.0,
            "ftol_rel must be finite and non-negative"
        );
        assert!(
            search_radius.is_finite() && search_radius > 0.0,
            "search_radius must be finite and positive"
        );
        Self {
            max_evaluations,
            rhobeg,
            ftol_rel,
            search_radius,
        }
    }

    #[inline]
    pub fn default_max_evaluations() -> usize {
        1000
    }

    #[inline]
    pub fn default_rhobeg() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_ftol_rel() -> f64 {
        1e-6
    }

    /// Twenty e-folds in log-parametrized hyperparameters
    #[inline]
    pub fn default_search_radius() -> f64 {
        20.0
    }
}

impl Default for CobylaMinimizer {
    fn default() -> Self {
        Self::new(
            Self::default_max_evaluations(),
            Self::default_rhobeg(),
            Self::default_ftol_rel(),
            Self::default_search_radius(),
        )
    }
}

impl MinimizerTrait for CobylaMinimizer {
    fn minimize<F>(&self, f: F, x0: &[f64]) -> MinimizeResult
    where
        F: Fn(&[f64]) -> f64,
    {
        let n_evaluations = Cell::new(0usize);
        let objective = |x: &[f64], _user_data: &mut ()| -> f64 {
            n_evaluations.set(n_evaluations.get() + 1);
            f(x)
        };

        // COBYLA doesn't terminate on unbounded problems
        let bounds: Vec<(f64, f64)> = x0
            .iter()
            .map(|&x| (x - self.search_radius, x + self.search_radius))
            .collect();
        let constraints: Vec<&dyn Func<()>> = vec![];
        let stop_tol = StopTols {
            ftol_rel: self.ftol_rel,
            ..StopTols::default()
        };

        let (success, x, fun) = match minimize(
            objective,
            x0,
            &bounds,
            &constraints,
            (),
            self.max_evaluations,
            RhoBeg::All(self.rhobeg),
            Some(stop_tol),
        ) {
            Ok((status, x, fun)) => {
                let success = matches!(
                    status,
                    cobyla::SuccessStatus::Success
                        | cobyla::SuccessStatus::FtolReached
                        | cobyla::SuccessStatus::XtolReached
                );
                (success, x, fun)
            }
            Err((_status, x, fun)) => (false, x, fun),
        };

        MinimizeResult {
            x,
            fun,
            success,
            n_evaluations: n_evaluations.get(),
        }
    }
}
