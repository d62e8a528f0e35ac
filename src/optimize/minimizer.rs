use crate::optimize::cobyla::CobylaMinimizer;

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Outcome of an unconstrained minimization
#[derive(Clone, Debug, PartialEq)]
pub struct MinimizeResult {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub fun: f64,
    /// Whether the minimizer reports convergence
    pub success: bool,
    pub n_evaluations: usize,
}

/// Derivative-free minimizer of a scalar objective
#[enum_dispatch]
pub trait MinimizerTrait: Clone + Debug {
    /// Minimize `f` starting from `x0`
    ///
    /// Failing to converge is not an error, it is reported by [MinimizeResult::success].
    fn minimize<F>(&self, f: F, x0: &[f64]) -> MinimizeResult
    where
        F: Fn(&[f64]) -> f64;
}

/// Minimizer selection, serializable as a part of the detrending configuration
#[enum_dispatch(MinimizerTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum MinimizerAlgorithm {
    Cobyla(CobylaMinimizer),
}

impl MinimizerAlgorithm {
    pub fn cobyla() -> Self {
        Self::Cobyla(CobylaMinimizer::default())
    }
}

impl Default for MinimizerAlgorithm {
    fn default() -> Self {
        Self::cobyla()
    }
}
