//! In-transit windows derived from planet ephemerides

use crate::error::DetrendError;
use crate::transit::model::TransitModel;

use ndarray::{Array1, ArrayView1, Zip};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Nominal transit half-durations in days
///
/// The window marked as in-transit is `±2 × duration` around every mid-transit time.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum Durations {
    /// The same duration for every planet
    Single(f64),
    /// One duration per planet
    PerPlanet(Vec<f64>),
}

impl Durations {
    #[inline]
    pub fn default_duration() -> f64 {
        6.0 / 24.0
    }

    /// Durations for `planet_count` planets
    ///
    /// A per-planet list of a different length is replaced by its maximum value repeated for
    /// every planet. An empty list has no maximum and is an error.
    pub fn per_planet(&self, planet_count: usize) -> Result<Vec<f64>, DetrendError> {
        match self {
            Self::Single(d) => Ok(vec![*d; planet_count]),
            Self::PerPlanet(v) if v.len() == planet_count => Ok(v.clone()),
            Self::PerPlanet(v) => {
                let max = v.iter().copied().reduce(f64::max).ok_or_else(|| {
                    DetrendError::Configuration(format!(
                        "no transit durations are given for {planet_count} planets"
                    ))
                })?;
                log::warn!(
                    "{} durations are given for {planet_count} planets, using the maximum {max} \
                     for all of them",
                    v.len(),
                );
                Ok(vec![max; planet_count])
            }
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self::Single(Self::default_duration())
    }
}

impl From<f64> for Durations {
    fn from(d: f64) -> Self {
        Self::Single(d)
    }
}

impl From<Vec<f64>> for Durations {
    fn from(v: Vec<f64>) -> Self {
        Self::PerPlanet(v)
    }
}

/// Orbital phase in `(-0.5, 0.5]`, zero at mid-transit
pub fn phase(t: f64, epoch: f64, period: f64) -> f64 {
    let phase = (t - epoch).rem_euclid(period) / period;
    if phase > 0.5 { phase - 1.0 } else { phase }
}

/// In-transit mask of a single planet: `|phase| <= 2 duration / P`
pub fn planet_mask(t: ArrayView1<f64>, epoch: f64, period: f64, duration: f64) -> Array1<bool> {
    let half_width = 2.0 * duration / period;
    t.mapv(|t| phase(t, epoch, period).abs() <= half_width)
}

/// Observations within the transit window of any planet of `model`
pub fn transit_mask(
    t: ArrayView1<f64>,
    model: &TransitModel,
    durations: &Durations,
) -> Result<Array1<bool>, DetrendError> {
    let durations = durations.per_planet(model.planet_count())?;
    Ok(model.ephemerides().zip(durations).fold(
        Array1::from_elem(t.len(), false),
        |mut mask, ((epoch, period), duration)| {
            Zip::from(&mut mask)
                .and(&planet_mask(t, epoch, period, duration))
                .for_each(|m, &planet| *m |= planet);
            mask
        },
    ))
}
