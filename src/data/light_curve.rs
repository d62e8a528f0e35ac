use crate::error::DetrendError;

use ndarray::{Array1, ArrayView1, Zip};

/// Observed light curve: time, flux and flux error of the same length
///
/// Time is expected to be non-decreasing, but it is not checked. A decimated copy produced by
/// [LightCurve::decimate] owns its data, so the two objects are independent after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct LightCurve {
    time: Array1<f64>,
    flux: Array1<f64>,
    flux_err: Array1<f64>,
}

impl LightCurve {
    /// Construct [LightCurve] from time, flux and flux error arrays
    ///
    /// Returns [DetrendError::DataFormat] if the arrays have different lengths.
    pub fn new(
        time: impl Into<Array1<f64>>,
        flux: impl Into<Array1<f64>>,
        flux_err: impl Into<Array1<f64>>,
    ) -> Result<Self, DetrendError> {
        let time = time.into();
        let flux = flux.into();
        let flux_err = flux_err.into();
        if time.len() != flux.len() || time.len() != flux_err.len() {
            return Err(DetrendError::DataFormat(format!(
                "time, flux and flux error must have the same length, got {}, {} and {}",
                time.len(),
                flux.len(),
                flux_err.len()
            )));
        }
        Ok(Self {
            time,
            flux,
            flux_err,
        })
    }

    /// Construct [LightCurve] assigning the same `flux_err` to every observation
    pub fn with_fixed_error(
        time: impl Into<Array1<f64>>,
        flux: impl Into<Array1<f64>>,
        flux_err: f64,
    ) -> Result<Self, DetrendError> {
        let time = time.into();
        let flux_err = Array1::from_elem(time.len(), flux_err);
        Self::new(time, flux, flux_err)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    pub fn flux(&self) -> ArrayView1<'_, f64> {
        self.flux.view()
    }

    pub fn flux_err(&self) -> ArrayView1<'_, f64> {
        self.flux_err.view()
    }

    /// Take every `stride`-th observation starting from the first one
    ///
    /// The result has `ceil(len / stride)` observations, `stride = 1` gives an identical copy.
    pub fn decimate(&self, stride: usize) -> Result<Self, DetrendError> {
        if stride == 0 {
            return Err(DetrendError::Configuration(
                "decimation stride must be positive".into(),
            ));
        }
        let every = |a: &Array1<f64>| a.iter().step_by(stride).copied().collect::<Array1<_>>();
        Ok(Self {
            time: every(&self.time),
            flux: every(&self.flux),
            flux_err: every(&self.flux_err),
        })
    }

    /// Flux divided by the transit flux curve evaluated on the same grid
    ///
    /// Zeros in `transit_flux` are not guarded against.
    pub fn without_transits(
        &self,
        transit_flux: ArrayView1<f64>,
    ) -> Result<Array1<f64>, DetrendError> {
        if transit_flux.len() != self.len() {
            return Err(DetrendError::Configuration(format!(
                "transit flux has length {}, light curve has length {}",
                transit_flux.len(),
                self.len()
            )));
        }
        Ok(Zip::from(&self.flux)
            .and(transit_flux)
            .map_collect(|&f, &tr| f / tr))
    }
}

/// Population standard deviation (`ddof = 0`), zero for an empty array
pub fn std_dev(a: ArrayView1<f64>) -> f64 {
    if a.is_empty() { 0.0 } else { a.std(0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    fn sample_lc(n: usize) -> LightCurve {
        let time = Array1::linspace(0.0, 10.0, n);
        let flux = time.mapv(|t: f64| 1.0 + 0.01 * t.sin());
        LightCurve::with_fixed_error(time, flux, 1e-3).unwrap()
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = LightCurve::new(array![0.0, 1.0], array![1.0], array![0.1, 0.1]).unwrap_err();
        assert!(matches!(err, DetrendError::DataFormat(_)));
    }

    #[test]
    fn fixed_error_is_broadcast() {
        let lc = sample_lc(17);
        assert_eq!(lc.flux_err().len(), 17);
        assert!(lc.flux_err().iter().all(|&e| e == 1e-3));
    }

    #[test]
    fn decimation_length_and_first_sample() {
        for n in [1, 2, 9, 10, 11, 100, 101] {
            let lc = sample_lc(n);
            for stride in 1..=12 {
                let binned = lc.decimate(stride).unwrap();
                assert_eq!(binned.len(), n.div_ceil(stride), "n = {n}, stride = {stride}");
                assert_eq!(binned.time()[0], lc.time()[0]);
                assert_eq!(binned.flux()[0], lc.flux()[0]);
                assert_eq!(binned.flux_err()[0], lc.flux_err()[0]);
            }
        }
    }

    #[test]
    fn decimation_with_unity_stride_is_copy() {
        let lc = sample_lc(31);
        assert_eq!(lc.decimate(1).unwrap(), lc);
    }

    #[test]
    fn decimation_takes_every_nth() {
        let lc = LightCurve::new(
            array![0.0, 1.0, 2.0, 3.0, 4.0],
            array![10.0, 11.0, 12.0, 13.0, 14.0],
            array![0.1, 0.2, 0.3, 0.4, 0.5],
        )
        .unwrap();
        let binned = lc.decimate(2).unwrap();
        assert_eq!(binned.time(), array![0.0, 2.0, 4.0]);
        assert_eq!(binned.flux(), array![10.0, 12.0, 14.0]);
        assert_eq!(binned.flux_err(), array![0.1, 0.3, 0.5]);
    }

    #[test]
    fn zero_stride_is_configuration_error() {
        let err = sample_lc(5).decimate(0).unwrap_err();
        assert!(matches!(err, DetrendError::Configuration(_)));
    }

    #[test]
    fn without_transits_round_trip() {
        let lc = sample_lc(50);
        let transit = lc.time().mapv(|t| if (4.0..5.0).contains(&t) { 0.99 } else { 1.0 });
        let corrected = lc.without_transits(transit.view()).unwrap();
        let restored = &corrected * &transit;
        for (&a, &b) in restored.iter().zip(lc.flux().iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-14);
        }
    }

    #[test]
    fn without_transits_length_mismatch() {
        let lc = sample_lc(5);
        let err = lc.without_transits(array![1.0, 1.0].view()).unwrap_err();
        assert!(matches!(err, DetrendError::Configuration(_)));
    }

    #[test]
    fn population_std() {
        // np.std([1, 2, 3, 4])
        assert_relative_eq!(std_dev(array![1.0, 2.0, 3.0, 4.0].view()), 1.118033988749895);
        assert_eq!(std_dev(Array1::<f64>::zeros(0).view()), 0.0);
    }
}
