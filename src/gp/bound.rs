use crate::data::LightCurve;
use crate::error::GpError;
use crate::gp::{GpEngine, Prediction};

use ndarray::{Array1, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Light-curve grid a GP covariance is computed for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridId {
    /// Decimated light curve used for hyperparameter optimization
    Binned,
    /// Full-resolution light curve used for the final prediction
    Full,
}

/// [GpEngine] tagged with the grid its covariance is computed for
///
/// Every likelihood or prediction call names the grid it expects and fails with
/// [GpError::StaleGrid] if the covariance was computed for another one.
#[derive(Clone, Debug)]
pub struct BoundGp<G> {
    engine: G,
    bound: Option<GridId>,
}

impl<G> BoundGp<G>
where
    G: GpEngine,
{
    pub fn new(engine: G) -> Self {
        Self {
            engine,
            bound: None,
        }
    }

    pub fn engine(&self) -> &G {
        &self.engine
    }

    pub fn into_engine(self) -> G {
        self.engine
    }

    pub fn bound_grid(&self) -> Option<GridId> {
        self.bound
    }

    /// Compute the covariance for the light curve `lc` identified as `grid`
    pub fn compute(&mut self, grid: GridId, lc: &LightCurve) -> Result<(), GpError> {
        self.bound = None;
        self.engine.compute(lc.time(), lc.flux_err())?;
        self.bound = Some(grid);
        Ok(())
    }

    fn ensure_bound(&self, requested: GridId) -> Result<(), GpError> {
        if self.bound == Some(requested) {
            Ok(())
        } else {
            Err(GpError::StaleGrid {
                bound: self.bound,
                requested,
            })
        }
    }

    pub fn parameter_vector(&self) -> Array1<f64> {
        self.engine.parameter_vector()
    }

    pub fn set_parameter_vector(&mut self, p: ArrayView1<f64>) -> Result<(), GpError> {
        self.engine.set_parameter_vector(p)
    }

    /// Set hyperparameters `p` and return the negative log likelihood of `y` on `grid`
    ///
    /// The engine keeps `p` afterwards.
    pub fn neg_log_likelihood(
        &mut self,
        grid: GridId,
        p: ArrayView1<f64>,
        y: ArrayView1<f64>,
    ) -> Result<f64, GpError> {
        self.ensure_bound(grid)?;
        self.engine.set_parameter_vector(p)?;
        Ok(-self.engine.log_likelihood(y)?)
    }

    /// Predict at `t` conditioned on `y` observed on `grid`
    pub fn predict(
        &mut self,
        grid: GridId,
        y: ArrayView1<f64>,
        t: ArrayView1<f64>,
    ) -> Result<Prediction, GpError> {
        self.ensure_bound(grid)?;
        self.engine.predict(y, t)
    }

    /// One realisation of the GP prior at `t`, doesn't depend on the bound grid
    pub fn sample<R: Rng + ?Sized>(
        &self,
        t: ArrayView1<f64>,
        rng: &mut R,
    ) -> Result<Array1<f64>, GpError> {
        self.engine.sample(t, rng)
    }
}
