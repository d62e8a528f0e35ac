use crate::error::{DetrendError, GpError};

use ndarray::{Array1, ArrayView1};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stationary kernel family
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Exponential, `exp(-r)`
    #[default]
    Exp,
    /// Matérn ν = 3/2, `(1 + √3 r) exp(-√3 r)`
    Matern32,
    /// Matérn ν = 5/2, `(1 + √5 r + 5r²/3) exp(-√5 r)`
    Matern52,
}

impl KernelKind {
    /// Correlation at the scaled distance `r ≥ 0`
    pub fn correlation(self, r: f64) -> f64 {
        match self {
            Self::Exp => (-r).exp(),
            Self::Matern32 => {
                let x = 3.0_f64.sqrt() * r;
                (1.0 + x) * (-x).exp()
            }
            Self::Matern52 => {
                let x = 5.0_f64.sqrt() * r;
                (1.0 + x + x * x / 3.0) * (-x).exp()
            }
        }
    }
}

impl FromStr for KernelKind {
    type Err = DetrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exp" => Ok(Self::Exp),
            "matern32" => Ok(Self::Matern32),
            "matern52" => Ok(Self::Matern52),
            _ => Err(DetrendError::Configuration(format!(
                "unknown kernel {s:?}, Exp, Matern32 or Matern52 expected"
            ))),
        }
    }
}

/// Scaled stationary kernel `k(τ) = amplitude · correlation(sqrt(τ² / metric))`
///
/// Hyperparameters are stored and exposed to optimizers in log space: `[ln amplitude, ln metric]`,
/// so a parameter vector set on the kernel is returned unchanged.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Kernel {
    pub kind: KernelKind,
    pub ln_amplitude: f64,
    /// Logarithm of the squared length scale, days²
    pub ln_metric: f64,
}

impl Kernel {
    pub const NPARAMS: usize = 2;

    pub fn new(kind: KernelKind) -> Self {
        Self::with_hyperparameters(kind, Self::default_amplitude(), Self::default_metric())
    }

    pub fn with_hyperparameters(kind: KernelKind, amplitude: f64, metric: f64) -> Self {
        Self {
            kind,
            ln_amplitude: amplitude.ln(),
            ln_metric: metric.ln(),
        }
    }

    #[inline]
    pub fn default_amplitude() -> f64 {
        0.1
    }

    #[inline]
    pub fn default_metric() -> f64 {
        10.0
    }

    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.ln_amplitude.exp()
    }

    #[inline]
    pub fn metric(&self) -> f64 {
        self.ln_metric.exp()
    }

    #[inline]
    pub fn value(&self, dt: f64) -> f64 {
        let r = (dt * dt / self.metric()).sqrt();
        self.amplitude() * self.kind.correlation(r)
    }

    pub fn parameter_vector(&self) -> Array1<f64> {
        Array1::from(vec![self.ln_amplitude, self.ln_metric])
    }

    pub fn set_parameter_vector(&mut self, p: ArrayView1<f64>) -> Result<(), GpError> {
        if p.len() != Self::NPARAMS {
            return Err(GpError::WrongParameterCount {
                expected: Self::NPARAMS,
                actual: p.len(),
            });
        }
        if let Some(&x) = p.iter().find(|x| !x.is_finite()) {
            return Err(GpError::NonFiniteParameter(x));
        }
        self.ln_amplitude = p[0];
        self.ln_metric = p[1];
        Ok(())
    }
}

impl From<KernelKind> for Kernel {
    fn from(kind: KernelKind) -> Self {
        Self::new(kind)
    }
}
