//! Planetary transit signal: parameters, flux evaluation and in-transit windows
//!
//! The photometric model itself is behind [TransitEvaluator], [QuadraticTransit] is the default
//! implementation. [transit_flux] combines any number of planets multiplicatively.

mod model;
pub use model::{LimbDarkening, PlanetParameters, TransitModel};

mod quadratic;
pub use quadratic::QuadraticTransit;

pub mod window;
pub use window::{Durations, transit_mask};

use crate::error::DetrendError;

use ndarray::{Array1, ArrayView1};

/// Photometric model of a single transiting planet
///
/// Implementations may cache grid-dependent data, so [TransitEvaluator::set_grid] must be called
/// before [TransitEvaluator::evaluate] for every grid the model is evaluated on.
pub trait TransitEvaluator {
    /// Bind the evaluator to the time grid
    fn set_grid(&mut self, t: ArrayView1<f64>);

    /// Relative flux of the star for a single planet on the bound grid
    fn evaluate(&self, planet: &PlanetParameters, ldc: &LimbDarkening) -> Array1<f64>;
}

/// Combined flux of all planets of `model` on grid `t`
///
/// The evaluator is re-bound to `t`. Per-planet curves are multiplied, which is exact for
/// non-overlapping transits.
pub fn transit_flux<E>(
    evaluator: &mut E,
    t: ArrayView1<f64>,
    model: &TransitModel,
) -> Result<Array1<f64>, DetrendError>
where
    E: TransitEvaluator + ?Sized,
{
    if t.is_empty() {
        return Err(DetrendError::Configuration(
            "transit flux requires a non-empty time grid".into(),
        ));
    }
    evaluator.set_grid(t);
    let ldc = model.limb_darkening();
    let flux = model
        .planets()
        .fold(Array1::<f64>::ones(t.len()), |flux, planet| {
            flux * evaluator.evaluate(&planet, &ldc)
        });
    Ok(flux)
}
