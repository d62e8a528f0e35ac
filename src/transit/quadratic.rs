use crate::transit::TransitEvaluator;
use crate::transit::model::{LimbDarkening, PlanetParameters};

use conv::prelude::*;
use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;

/// Transit of a circular orbit in front of a quadratically limb-darkened star
///
/// The occulted flux is integrated numerically over `n_annuli` concentric annuli of the stellar
/// disk covered by the planet, with intensity `I(μ) = 1 - u1 (1 - μ) - u2 (1 - μ)²`.
#[derive(Clone, Debug)]
pub struct QuadraticTransit {
    n_annuli: usize,
    t: Array1<f64>,
}

impl QuadraticTransit {
    pub fn new(n_annuli: usize) -> Self {
        assert!(n_annuli > 0, "n_annuli must be positive");
        Self {
            n_annuli,
            t: Array1::zeros(0),
        }
    }

    #[inline]
    pub fn default_n_annuli() -> usize {
        256
    }

    /// Sky-projected star-planet separation in stellar radii, `None` when the planet is behind
    /// the star
    fn separation(t: f64, planet: &PlanetParameters, cos_i: f64) -> Option<f64> {
        let phase = 2.0 * PI * (t - planet.epoch) / planet.period;
        let (sin_phase, cos_phase) = phase.sin_cos();
        if cos_phase <= 0.0 {
            return None;
        }
        Some(planet.scaled_semi_major_axis * f64::hypot(sin_phase, cos_i * cos_phase))
    }

    fn intensity(r: f64, ldc: &LimbDarkening) -> f64 {
        let one_minus_mu = 1.0 - (1.0 - r * r).max(0.0).sqrt();
        1.0 - ldc.u1 * one_minus_mu - ldc.u2 * one_minus_mu.powi(2)
    }

    /// Half of the angle subtended by the part of the circle of radius `r` lying inside the
    /// planet disk
    fn half_angle_inside(r: f64, z: f64, p: f64) -> f64 {
        if z < f64::EPSILON {
            return if r < p { PI } else { 0.0 };
        }
        ((r * r + z * z - p * p) / (2.0 * r * z))
            .clamp(-1.0, 1.0)
            .acos()
    }

    /// Unnormalised stellar flux blocked by a planet of radius `p` at separation `z`
    fn occulted_flux(&self, z: f64, p: f64, ldc: &LimbDarkening) -> f64 {
        if p <= 0.0 || z >= 1.0 + p {
            return 0.0;
        }
        let r_in = (z - p).max(0.0);
        let r_out = (z + p).min(1.0);
        if r_out <= r_in {
            return 0.0;
        }
        let n: f64 = self.n_annuli.approx().unwrap_or(f64::NAN);
        let dr = (r_out - r_in) / n;
        let sum: f64 = (0..self.n_annuli)
            .map(|k| {
                let k: f64 = k.approx().unwrap_or(f64::NAN);
                let r = r_in + (k + 0.5) * dr;
                Self::intensity(r, ldc) * 2.0 * r * Self::half_angle_inside(r, z, p)
            })
            .sum();
        sum * dr
    }
}

impl Default for QuadraticTransit {
    fn default() -> Self {
        Self::new(Self::default_n_annuli())
    }
}

impl TransitEvaluator for QuadraticTransit {
    fn set_grid(&mut self, t: ArrayView1<f64>) {
        self.t = t.to_owned();
    }

    fn evaluate(&self, planet: &PlanetParameters, ldc: &LimbDarkening) -> Array1<f64> {
        // Total flux of the limb-darkened disk
        let norm = PI * (1.0 - ldc.u1 / 3.0 - ldc.u2 / 6.0);
        let cos_i = planet.inclination.to_radians().cos();
        self.t
            .mapv(|t| match Self::separation(t, planet, cos_i) {
                Some(z) => 1.0 - self.occulted_flux(z, planet.radius_ratio, ldc) / norm,
                None => 1.0,
            })
    }
}
