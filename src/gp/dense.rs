use crate::error::GpError;
use crate::gp::kernel::{Kernel, KernelKind};
use crate::gp::{GpEngine, Prediction};

use conv::prelude::*;
use itertools::process_results;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

/// Diagonal jitter added to the prior covariance before sampling, in units of the amplitude
const SAMPLE_JITTER: f64 = 1e-10;

type Factor = Cholesky<f64, Dyn>;

/// GP with a constant mean and a dense covariance matrix factorized by Cholesky decomposition
///
/// The covariance of observations is `K_ij = k(t_i - t_j) + δ_ij σ_i²`. Cost is `O(n³)` per
/// factorization, which is repeated lazily after every hyperparameter update.
#[derive(Clone, Debug)]
pub struct DenseGp {
    kernel: Kernel,
    mean: f64,
    grid: Option<Grid>,
}

#[derive(Clone, Debug)]
struct Grid {
    t: Array1<f64>,
    yerr: Array1<f64>,
    factor: Option<Factor>,
}

impl DenseGp {
    pub fn new(kernel: impl Into<Kernel>) -> Self {
        Self::with_mean(kernel, Self::default_mean())
    }

    pub fn with_mean(kernel: impl Into<Kernel>, mean: f64) -> Self {
        Self {
            kernel: kernel.into(),
            mean,
            grid: None,
        }
    }

    /// Light curves are normalized, so the process fluctuates around unity
    #[inline]
    pub fn default_mean() -> f64 {
        1.0
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Length of the bound grid, if any
    pub fn grid_len(&self) -> Option<usize> {
        self.grid.as_ref().map(|grid| grid.t.len())
    }

    fn covariance(
        kernel: &Kernel,
        t: ArrayView1<f64>,
        diag: impl Fn(usize) -> f64,
    ) -> DMatrix<f64> {
        let n = t.len();
        DMatrix::from_fn(n, n, |i, j| {
            let k = kernel.value(t[i] - t[j]);
            if i == j { k + diag(i) } else { k }
        })
    }

    /// Bound grid and the factorized covariance, factorizing if hyperparameters changed
    fn factorized(&mut self) -> Result<(ArrayView1<'_, f64>, &Factor), GpError> {
        let kernel = self.kernel;
        let grid = self.grid.as_mut().ok_or(GpError::NotComputed)?;
        let factor = match grid.factor.take() {
            Some(factor) => factor,
            None => {
                let yerr = &grid.yerr;
                factorize(Self::covariance(&kernel, grid.t.view(), |i| yerr[i].powi(2)))?
            }
        };
        let factor = grid.factor.insert(factor);
        Ok((grid.t.view(), factor))
    }

    fn residuals(&self, y: ArrayView1<f64>, expected: usize) -> Result<DVector<f64>, GpError> {
        if y.len() != expected {
            return Err(GpError::LengthMismatch {
                expected,
                actual: y.len(),
            });
        }
        Ok(DVector::from_iterator(
            expected,
            y.iter().map(|&y| y - self.mean),
        ))
    }
}

/// Cholesky factor `L` of a symmetric positive-definite matrix, `A = L Lᵀ`
fn factorize(a: DMatrix<f64>) -> Result<Factor, GpError> {
    let factor = a.cholesky().ok_or(GpError::NotPositiveDefinite)?;
    if factor
        .l_dirty()
        .diagonal()
        .iter()
        .all(|&d| d.is_finite() && d > 0.0)
    {
        Ok(factor)
    } else {
        Err(GpError::NotPositiveDefinite)
    }
}

/// Solve `L x = b`, the upper triangle of the factor storage is ignored
fn solve_lower(factor: &Factor, b: &DVector<f64>) -> Result<DVector<f64>, GpError> {
    factor
        .l_dirty()
        .solve_lower_triangular(b)
        .ok_or(GpError::NotPositiveDefinite)
}

/// `ln det A`
fn log_det(factor: &Factor) -> f64 {
    2.0 * factor
        .l_dirty()
        .diagonal()
        .iter()
        .map(|d| d.ln())
        .sum::<f64>()
}

impl From<KernelKind> for DenseGp {
    fn from(kind: KernelKind) -> Self {
        Self::new(kind)
    }
}

impl GpEngine for DenseGp {
    fn parameter_vector(&self) -> Array1<f64> {
        self.kernel.parameter_vector()
    }

    fn set_parameter_vector(&mut self, p: ArrayView1<f64>) -> Result<(), GpError> {
        self.kernel.set_parameter_vector(p)?;
        if let Some(grid) = self.grid.as_mut() {
            grid.factor = None;
        }
        Ok(())
    }

    fn compute(&mut self, t: ArrayView1<f64>, yerr: ArrayView1<f64>) -> Result<(), GpError> {
        if t.len() != yerr.len() {
            return Err(GpError::LengthMismatch {
                expected: t.len(),
                actual: yerr.len(),
            });
        }
        self.grid = Some(Grid {
            t: t.to_owned(),
            yerr: yerr.to_owned(),
            factor: None,
        });
        self.factorized()?;
        Ok(())
    }

    fn log_likelihood(&mut self, y: ArrayView1<f64>) -> Result<f64, GpError> {
        let n = self.grid_len().ok_or(GpError::NotComputed)?;
        let r = self.residuals(y, n)?;
        let (_, factor) = self.factorized()?;
        let z = solve_lower(factor, &r)?;
        let n: f64 = n.approx().unwrap_or(f64::NAN);
        Ok(-0.5 * (z.norm_squared() + log_det(factor) + n * (2.0 * PI).ln()))
    }

    fn predict(&mut self, y: ArrayView1<f64>, t: ArrayView1<f64>) -> Result<Prediction, GpError> {
        let n = self.grid_len().ok_or(GpError::NotComputed)?;
        let r = self.residuals(y, n)?;
        let kernel = self.kernel;
        let process_mean = self.mean;
        let (t_obs, factor) = self.factorized()?;
        let alpha = factor.solve(&r);
        let prior_variance = kernel.value(0.0);

        let (mean, variance): (Vec<_>, Vec<_>) = process_results(
            t.iter().map(|&t_pred| -> Result<(f64, f64), GpError> {
                let k = DVector::from_iterator(n, t_obs.iter().map(|&t| kernel.value(t_pred - t)));
                let mu = process_mean + k.dot(&alpha);
                let v = solve_lower(factor, &k)?;
                Ok((mu, prior_variance - v.norm_squared()))
            }),
            |iter| iter.unzip(),
        )?;
        Ok(Prediction {
            mean: mean.into(),
            variance: variance.into(),
        })
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        t: ArrayView1<f64>,
        rng: &mut R,
    ) -> Result<Array1<f64>, GpError> {
        let jitter = SAMPLE_JITTER * self.kernel.amplitude();
        let factor = factorize(Self::covariance(&self.kernel, t, |_| jitter))?;
        let z: DVector<f64> =
            DVector::from_iterator(t.len(), (0..t.len()).map(|_| rng.sample(StandardNormal)));
        Ok((factor.l() * z).iter().map(|x| x + self.mean).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::gp::KernelKind;

    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::prelude::*;

    #[test]
    fn two_point_log_likelihood() {
        let kernel = Kernel::new(KernelKind::Exp);
        let mut gp = DenseGp::new(kernel);
        let t = array![0.0, 2.0];
        let yerr = array![0.1, 0.2];
        let y = array![1.05, 0.9];
        gp.compute(t.view(), yerr.view()).unwrap();

        let a = kernel.value(0.0) + 0.01;
        let d = kernel.value(0.0) + 0.04;
        let b = kernel.value(2.0);
        let det = a * d - b * b;
        let (r0, r1) = (0.05, -0.1);
        let chi2 = (d * r0 * r0 - 2.0 * b * r0 * r1 + a * r1 * r1) / det;
        let desired = -0.5 * (chi2 + det.ln() + 2.0 * (2.0 * PI).ln());

        assert_relative_eq!(gp.log_likelihood(y.view()).unwrap(), desired, max_relative = 1e-12);
    }

    #[test]
    fn hyperparameters_change_likelihood_on_the_same_grid() {
        let t = Array1::linspace(0.0, 10.0, 50);
        let y = t.mapv(|t: f64| 1.0 + 0.05 * t.sin());
        let yerr = Array1::from_elem(50, 0.01);
        let mut gp = DenseGp::new(KernelKind::Matern32);
        gp.compute(t.view(), yerr.view()).unwrap();
        let before = gp.log_likelihood(y.view()).unwrap();
        gp.set_parameter_vector(array![(0.01_f64).ln(), 2.0_f64.ln()].view())
            .unwrap();
        let after = gp.log_likelihood(y.view()).unwrap();
        assert_eq!(gp.grid_len(), Some(50));
        assert_ne!(before, after);
        assert!(after.is_finite());
    }

    #[test]
    fn prediction_interpolates_precise_data() {
        let t = Array1::linspace(0.0, 5.0, 30);
        let y = t.mapv(|t: f64| 1.0 + 0.02 * (0.7 * t).cos());
        let yerr = Array1::from_elem(30, 1e-5);
        let mut gp = DenseGp::new(KernelKind::Matern52);
        gp.compute(t.view(), yerr.view()).unwrap();
        let prediction = gp.predict(y.view(), t.view()).unwrap();
        for (&mu, &obs) in prediction.mean.iter().zip(y.iter()) {
            assert_relative_eq!(mu, obs, epsilon = 1e-4);
        }
        assert!(prediction.variance.iter().all(|&v| v < 1e-6));
    }

    #[test]
    fn prediction_far_from_data_reverts_to_prior() {
        let t = array![0.0, 1.0, 2.0];
        let y = array![1.1, 1.2, 1.1];
        let yerr = array![0.01, 0.01, 0.01];
        let mut gp = DenseGp::new(KernelKind::Exp);
        gp.compute(t.view(), yerr.view()).unwrap();
        let prediction = gp.predict(y.view(), array![1e4].view()).unwrap();
        assert_relative_eq!(prediction.mean[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(prediction.variance[0], 0.1, epsilon = 1e-10);
    }

    #[test]
    fn factorization_reconstructs_matrix() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 2.0, 0.4, 2.0, 5.0, 1.0, 0.4, 1.0, 3.0]);
        let factor = factorize(a.clone()).unwrap();
        let l = factor.l();
        assert_relative_eq!(&l * l.transpose(), a, max_relative = 1e-12);
        // Cofactor expansion along the first row
        let det: f64 = 4.0 * (5.0 * 3.0 - 1.0) - 2.0 * (2.0 * 3.0 - 0.4) + 0.4 * (2.0 - 0.4 * 5.0);
        assert_relative_eq!(log_det(&factor), det.ln(), max_relative = 1e-12);
    }

    #[test]
    fn not_positive_definite() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert_eq!(factorize(a).unwrap_err(), GpError::NotPositiveDefinite);
    }

    #[test]
    fn calls_before_compute() {
        let mut gp = DenseGp::new(KernelKind::Exp);
        let y = array![1.0, 1.0];
        assert_eq!(gp.log_likelihood(y.view()), Err(GpError::NotComputed));
        assert_eq!(
            gp.predict(y.view(), y.view()).unwrap_err(),
            GpError::NotComputed
        );
    }

    #[test]
    fn length_mismatch() {
        let mut gp = DenseGp::new(KernelKind::Exp);
        let t = array![0.0, 1.0, 2.0];
        assert_eq!(
            gp.compute(t.view(), array![0.1, 0.1].view()),
            Err(GpError::LengthMismatch {
                expected: 3,
                actual: 2
            })
        );
        gp.compute(t.view(), array![0.1, 0.1, 0.1].view()).unwrap();
        assert_eq!(
            gp.log_likelihood(array![1.0, 1.0].view()),
            Err(GpError::LengthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn recompute_discards_previous_grid() {
        let mut gp = DenseGp::new(KernelKind::Exp);
        let t_long = Array1::linspace(0.0, 1.0, 10);
        gp.compute(t_long.view(), Array1::from_elem(10, 0.1).view())
            .unwrap();
        let t_short = Array1::linspace(0.0, 1.0, 4);
        gp.compute(t_short.view(), Array1::from_elem(4, 0.1).view())
            .unwrap();
        assert_eq!(gp.grid_len(), Some(4));
        assert!(gp.log_likelihood(Array1::ones(10).view()).is_err());
        assert!(gp.log_likelihood(Array1::ones(4).view()).is_ok());
    }

    #[test]
    fn seeded_samples_are_reproducible() {
        let gp = DenseGp::new(KernelKind::Matern32);
        let t = Array1::linspace(0.0, 20.0, 200);
        let a = gp.sample(t.view(), &mut StdRng::seed_from_u64(0)).unwrap();
        let b = gp.sample(t.view(), &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(a.len(), 200);
        assert_eq!(a, b);
        assert!(a.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn sample_variance_matches_amplitude() {
        // Independent points: lag is much longer than the length scale
        let mut gp = DenseGp::new(KernelKind::Exp);
        gp.set_parameter_vector(array![(4e-4_f64).ln(), (1e-4_f64).ln()].view())
            .unwrap();
        let t = Array1::linspace(0.0, 1000.0, 1000);
        let s = gp.sample(t.view(), &mut StdRng::seed_from_u64(42)).unwrap();
        let var = s.mapv(|x| (x - 1.0).powi(2)).mean().unwrap();
        assert_relative_eq!(var, 4e-4, max_relative = 0.15);
    }
}
