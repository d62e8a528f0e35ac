use crate::error::DetrendError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of parameters describing a single planet
pub const PARAMETERS_PER_PLANET: usize = 5;

/// Orbital and size parameters of a single planet on a circular orbit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PlanetParameters {
    /// Mid-transit time `T0`, days
    pub epoch: f64,
    /// Orbital period `P`, days
    pub period: f64,
    /// Semi-major axis in units of the stellar radius, `a/R*`
    pub scaled_semi_major_axis: f64,
    /// Orbital inclination, degrees
    pub inclination: f64,
    /// Planet to star radius ratio, `Rp/R*`
    pub radius_ratio: f64,
}

impl PlanetParameters {
    fn from_chunk(chunk: &[f64]) -> Self {
        Self {
            epoch: chunk[0],
            period: chunk[1],
            scaled_semi_major_axis: chunk[2],
            inclination: chunk[3],
            radius_ratio: chunk[4],
        }
    }
}

/// Quadratic limb-darkening coefficients `(u1, u2)`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LimbDarkening {
    pub u1: f64,
    pub u2: f64,
}

impl From<[f64; 2]> for LimbDarkening {
    fn from([u1, u2]: [f64; 2]) -> Self {
        Self { u1, u2 }
    }
}

impl From<(f64, f64)> for LimbDarkening {
    fn from((u1, u2): (f64, f64)) -> Self {
        Self { u1, u2 }
    }
}

/// Combined transit signal of one or more planets sharing limb-darkening coefficients
///
/// Parameters are stored flat, five per planet: `T0, P, a/R*, i, Rp/R*`. The model is replaced
/// as a whole and never updated partially.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(try_from = "TransitModelParameters", into = "TransitModelParameters")]
pub struct TransitModel {
    planet_parameters: Vec<f64>,
    limb_darkening: LimbDarkening,
}

impl TransitModel {
    /// Create [TransitModel] from a flat parameter slice
    ///
    /// Returns [DetrendError::Configuration] unless the slice length is a positive multiple of
    /// five.
    pub fn new(
        planet_parameters: &[f64],
        limb_darkening: impl Into<LimbDarkening>,
    ) -> Result<Self, DetrendError> {
        if planet_parameters.is_empty() || planet_parameters.len() % PARAMETERS_PER_PLANET != 0 {
            return Err(DetrendError::Configuration(format!(
                "planet parameters must be a non-empty sequence of {PARAMETERS_PER_PLANET} values \
                 per planet, got {} values",
                planet_parameters.len()
            )));
        }
        Ok(Self {
            planet_parameters: planet_parameters.to_vec(),
            limb_darkening: limb_darkening.into(),
        })
    }

    pub fn from_planets(
        planets: &[PlanetParameters],
        limb_darkening: impl Into<LimbDarkening>,
    ) -> Result<Self, DetrendError> {
        let flat: Vec<_> = planets
            .iter()
            .flat_map(|p| {
                [
                    p.epoch,
                    p.period,
                    p.scaled_semi_major_axis,
                    p.inclination,
                    p.radius_ratio,
                ]
            })
            .collect();
        Self::new(&flat, limb_darkening)
    }

    #[inline]
    pub fn planet_count(&self) -> usize {
        self.planet_parameters.len() / PARAMETERS_PER_PLANET
    }

    pub fn planet_parameters(&self) -> &[f64] {
        &self.planet_parameters
    }

    pub fn limb_darkening(&self) -> LimbDarkening {
        self.limb_darkening
    }

    pub fn planets(&self) -> impl Iterator<Item = PlanetParameters> + '_ {
        self.planet_parameters
            .chunks_exact(PARAMETERS_PER_PLANET)
            .map(PlanetParameters::from_chunk)
    }

    /// `(T0, P)` pairs, one per planet
    pub fn ephemerides(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.planets().map(|p| (p.epoch, p.period))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "TransitModel")]
struct TransitModelParameters {
    planet_parameters: Vec<f64>,
    limb_darkening: LimbDarkening,
}

impl From<TransitModel> for TransitModelParameters {
    fn from(m: TransitModel) -> Self {
        Self {
            planet_parameters: m.planet_parameters,
            limb_darkening: m.limb_darkening,
        }
    }
}

impl TryFrom<TransitModelParameters> for TransitModel {
    type Error = DetrendError;

    fn try_from(p: TransitModelParameters) -> Result<Self, Self::Error> {
        Self::new(&p.planet_parameters, p.limb_darkening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_planets() {
        let model = TransitModel::new(
            &[5.0, 10.0, 15.0, 89.5, 0.1, 2.0, 3.0, 8.0, 88.0, 0.05],
            [0.3, 0.2],
        )
        .unwrap();
        assert_eq!(model.planet_count(), 2);
        let planets: Vec<_> = model.planets().collect();
        assert_eq!(planets[1].period, 3.0);
        assert_eq!(planets[1].radius_ratio, 0.05);
        assert_eq!(
            model.ephemerides().collect::<Vec<_>>(),
            vec![(5.0, 10.0), (2.0, 3.0)]
        );
        assert_eq!(model.limb_darkening(), LimbDarkening { u1: 0.3, u2: 0.2 });
    }

    #[test]
    fn from_planets_is_the_same() {
        let flat = [5.0, 10.0, 15.0, 89.5, 0.1];
        let model = TransitModel::new(&flat, (0.3, 0.2)).unwrap();
        let planets: Vec<_> = model.planets().collect();
        assert_eq!(TransitModel::from_planets(&planets, (0.3, 0.2)).unwrap(), model);
    }

    #[test]
    fn wrong_length() {
        for n in [0, 4, 6, 11] {
            let err = TransitModel::new(&vec![1.0; n], [0.3, 0.2]).unwrap_err();
            assert!(matches!(err, DetrendError::Configuration(_)), "n = {n}");
        }
    }

    #[test]
    fn serde_json_rejects_wrong_length() {
        let model = TransitModel::new(&[5.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2]).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: TransitModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);

        let bad = r#"{"planet_parameters":[1.0,2.0],"limb_darkening":{"u1":0.3,"u2":0.2}}"#;
        assert!(serde_json::from_str::<TransitModel>(bad).is_err());
    }
}
