//! GP detrending pipeline
//!
//! [Detrender] owns a light curve together with its decimated copy, an optional transit model
//! evaluated on both grids, and a GP engine. Its progress is described by [Stage]: every
//! operation requires a minimum stage and fails with [DetrendError::InvalidStage] otherwise.
//!
//! ```text
//! Created -> DataLoaded -> TransitModelSet (optional) -> GpConfigured -> Optimized -> Detrended
//! ```
//!
//! Replacing an upstream product (data, transit model, GP) discards everything downstream of it.

use crate::data::{LightCurve, derived_path, load_light_curve, read_light_curve, write_table};
use crate::error::DetrendError;
use crate::gp::{BoundGp, DenseGp, GpEngine, GridId, KernelKind, Prediction};
use crate::optimize::{MinimizerAlgorithm, OptimizationResult, optimize_hyperparameters};
use crate::transit::{
    Durations, LimbDarkening, QuadraticTransit, TransitEvaluator, TransitModel, transit_flux,
    transit_mask,
};

use ndarray::{Array1, ArrayView1, Zip};
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Column names of the detrended table
pub const DETRENDED_HEADER: &str = "Time  Detrended_flux  flux_error  flux  GP_model  planets_model";

/// Progress of a [Detrender]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Created,
    DataLoaded,
    TransitModelSet,
    GpConfigured,
    Optimized,
    Detrended,
}

/// [Detrender] settings
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DetrendConfig {
    /// Decimation stride of the grid used for hyperparameter optimization
    pub bin: usize,
    /// Flux error assigned to every observation, the error column is read if `None`
    pub fixed_error: Option<f64>,
    pub minimizer: MinimizerAlgorithm,
}

impl DetrendConfig {
    #[inline]
    pub fn default_bin() -> usize {
        10
    }

    #[inline]
    pub fn default_fixed_error() -> Option<f64> {
        None
    }

    #[inline]
    pub fn default_minimizer() -> MinimizerAlgorithm {
        MinimizerAlgorithm::default()
    }

    pub fn set_bin(&mut self, bin: usize) -> &mut Self {
        self.bin = bin;
        self
    }

    pub fn set_fixed_error(&mut self, fixed_error: Option<f64>) -> &mut Self {
        self.fixed_error = fixed_error;
        self
    }

    pub fn set_minimizer(&mut self, minimizer: MinimizerAlgorithm) -> &mut Self {
        self.minimizer = minimizer;
        self
    }
}

impl Default for DetrendConfig {
    fn default() -> Self {
        Self {
            bin: Self::default_bin(),
            fixed_error: Self::default_fixed_error(),
            minimizer: Self::default_minimizer(),
        }
    }
}

/// Full-resolution GP prediction and the light curve corrected by it
#[derive(Clone, Debug, PartialEq)]
pub struct DetrendedResult {
    pub predicted_noise: Array1<f64>,
    pub predicted_variance: Array1<f64>,
    /// `flux / predicted_noise`
    pub detrended_flux: Array1<f64>,
}

/// In-transit observations
#[derive(Clone, Debug, PartialEq)]
pub struct TransitCut {
    pub time: Array1<f64>,
    /// Detrended flux if `detrended`, raw flux otherwise
    pub flux: Array1<f64>,
    pub flux_err: Array1<f64>,
    pub detrended: bool,
}

impl TransitCut {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// `_detrended_cut.dat` or `_cut.dat`
    pub fn file_suffix(&self) -> &'static str {
        if self.detrended {
            "_detrended_cut.dat"
        } else {
            "_cut.dat"
        }
    }

    /// Write `time flux flux_err` rows without a header
    pub fn write<W: std::io::Write>(&self, writer: W) -> Result<(), DetrendError> {
        write_table(
            writer,
            None,
            &[self.time.view(), self.flux.view(), self.flux_err.view()],
        )
    }
}

#[derive(Clone, Debug)]
struct Grids {
    full: LightCurve,
    binned: LightCurve,
    /// Transit flux on the full grid, ones without a transit model
    transit_full: Array1<f64>,
    transit_binned: Array1<f64>,
}

impl Grids {
    fn new(full: LightCurve, bin: usize) -> Result<Self, DetrendError> {
        let binned = full.decimate(bin)?;
        Ok(Self {
            transit_full: Array1::ones(full.len()),
            transit_binned: Array1::ones(binned.len()),
            full,
            binned,
        })
    }

    fn flux_without_transits(&self, grid: GridId) -> Result<Array1<f64>, DetrendError> {
        match grid {
            GridId::Full => self.full.without_transits(self.transit_full.view()),
            GridId::Binned => self.binned.without_transits(self.transit_binned.view()),
        }
    }

    fn light_curve(&self, grid: GridId) -> &LightCurve {
        match grid {
            GridId::Full => &self.full,
            GridId::Binned => &self.binned,
        }
    }
}

/// Transit-aware GP detrending of a single light curve
///
/// `G` is the GP engine and `E` is the transit evaluator, [DenseGp] and [QuadraticTransit] by
/// default.
///
/// ```no_run
/// use light_curve_detrend::{DetrendConfig, Detrender, KernelKind};
///
/// let mut config = DetrendConfig::default();
/// config.set_fixed_error(Some(1e-3));
/// let mut detrender = Detrender::from_path("lc.dat", config)?;
/// detrender.add_transits(&[5.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2])?;
/// detrender.configure_gp(KernelKind::Matern32)?;
/// detrender.optimize()?;
/// let output = detrender.detrend_and_save()?;
/// println!("detrended light curve is saved to {}", output.display());
/// # Ok::<(), light_curve_detrend::DetrendError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Detrender<G = DenseGp, E = QuadraticTransit> {
    config: DetrendConfig,
    source: Option<PathBuf>,
    evaluator: E,
    grids: Option<Grids>,
    transit_model: Option<TransitModel>,
    gp: Option<BoundGp<G>>,
    fit: Option<OptimizationResult>,
    detrended: Option<DetrendedResult>,
}

impl Detrender {
    pub fn new(config: DetrendConfig) -> Self {
        Self::with_evaluator(config, QuadraticTransit::default())
    }

    /// Create and load the light curve from a text file, see [Detrender::load]
    pub fn from_path(path: impl AsRef<Path>, config: DetrendConfig) -> Result<Self, DetrendError> {
        let mut detrender = Self::new(config);
        detrender.load(path)?;
        Ok(detrender)
    }
}

impl<G, E> Detrender<G, E>
where
    G: GpEngine,
    E: TransitEvaluator,
{
    pub fn with_evaluator(config: DetrendConfig, evaluator: E) -> Self {
        Self {
            config,
            source: None,
            evaluator,
            grids: None,
            transit_model: None,
            gp: None,
            fit: None,
            detrended: None,
        }
    }

    pub fn config(&self) -> &DetrendConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        if self.detrended.is_some() {
            Stage::Detrended
        } else if self.fit.is_some() {
            Stage::Optimized
        } else if self.gp.is_some() {
            Stage::GpConfigured
        } else if self.transit_model.is_some() {
            Stage::TransitModelSet
        } else if self.grids.is_some() {
            Stage::DataLoaded
        } else {
            Stage::Created
        }
    }

    fn stage_error(&self, operation: &'static str, required: Stage) -> DetrendError {
        DetrendError::InvalidStage {
            operation,
            required,
            actual: self.stage(),
        }
    }

    fn grids(&self, operation: &'static str) -> Result<&Grids, DetrendError> {
        self.grids
            .as_ref()
            .ok_or_else(|| self.stage_error(operation, Stage::DataLoaded))
    }

    /// Load a whitespace-separated light curve file, see [crate::read_light_curve]
    ///
    /// Output file names are derived from `path`. Any previous state is discarded.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), DetrendError> {
        let path = path.as_ref();
        let lc = load_light_curve(path, self.config.fixed_error)?;
        self.set_light_curve(lc)?;
        self.source = Some(path.to_owned());
        Ok(())
    }

    /// Load a light curve from a reader, no output file names can be derived afterwards
    pub fn read<R: Read>(&mut self, reader: R) -> Result<(), DetrendError> {
        let lc = read_light_curve(reader, self.config.fixed_error)?;
        self.set_light_curve(lc)
    }

    /// Replace the light curve and decimate it, discarding any previous state
    pub fn set_light_curve(&mut self, lc: LightCurve) -> Result<(), DetrendError> {
        let grids = Grids::new(lc, self.config.bin)?;
        log::debug!(
            "light curve of {} observations decimated to {} with stride {}",
            grids.full.len(),
            grids.binned.len(),
            self.config.bin
        );
        self.grids = Some(grids);
        self.source = None;
        self.transit_model = None;
        self.gp = None;
        self.fit = None;
        self.detrended = None;
        Ok(())
    }

    pub fn light_curve(&self) -> Option<&LightCurve> {
        self.grids.as_ref().map(|grids| &grids.full)
    }

    pub fn binned_light_curve(&self) -> Option<&LightCurve> {
        self.grids.as_ref().map(|grids| &grids.binned)
    }

    /// Transit flux on the full grid, ones if no transit model is set
    pub fn transit_flux(&self) -> Option<ArrayView1<'_, f64>> {
        self.grids.as_ref().map(|grids| grids.transit_full.view())
    }

    pub fn transit_model(&self) -> Option<&TransitModel> {
        self.transit_model.as_ref()
    }

    pub fn gp(&self) -> Option<&BoundGp<G>> {
        self.gp.as_ref()
    }

    pub fn optimization_result(&self) -> Option<&OptimizationResult> {
        self.fit.as_ref()
    }

    pub fn detrended(&self) -> Option<&DetrendedResult> {
        self.detrended.as_ref()
    }

    /// Set transits from a flat `[T0, P, a/R*, i, Rp/R*] × n_planets` vector, see [TransitModel]
    pub fn add_transits(
        &mut self,
        planet_parameters: &[f64],
        limb_darkening: impl Into<LimbDarkening>,
    ) -> Result<(), DetrendError> {
        let model = TransitModel::new(planet_parameters, limb_darkening)?;
        self.set_transit_model(model)
    }

    /// Evaluate `model` on both grids, it replaces the previous model
    ///
    /// Hyperparameter fit and detrended result are discarded, the GP keeps its hyperparameters.
    pub fn set_transit_model(&mut self, model: TransitModel) -> Result<(), DetrendError> {
        let grids = self
            .grids
            .as_mut()
            .ok_or(DetrendError::InvalidStage {
                operation: "add_transits",
                required: Stage::DataLoaded,
                actual: Stage::Created,
            })?;
        let full = transit_flux(&mut self.evaluator, grids.full.time(), &model)?;
        let binned = transit_flux(&mut self.evaluator, grids.binned.time(), &model)?;
        grids.transit_full = full;
        grids.transit_binned = binned;
        log::debug!("transit model of {} planet(s) set", model.planet_count());
        self.transit_model = Some(model);
        self.fit = None;
        self.detrended = None;
        Ok(())
    }

    /// Build the GP engine for `kind` and compute its covariance on the binned grid
    pub fn configure_gp(&mut self, kind: KernelKind) -> Result<(), DetrendError>
    where
        G: From<KernelKind>,
    {
        self.configure_gp_with(G::from(kind))
    }

    /// Use `engine` and compute its covariance on the binned grid
    ///
    /// Previous engine, hyperparameter fit and detrended result are discarded.
    pub fn configure_gp_with(&mut self, engine: G) -> Result<(), DetrendError> {
        let grids = self.grids("configure_gp")?;
        let mut gp = BoundGp::new(engine);
        gp.compute(GridId::Binned, &grids.binned)?;
        self.gp = Some(gp);
        self.fit = None;
        self.detrended = None;
        Ok(())
    }

    /// Split borrows of the GP bound to `grid` and the grids, recomputing covariance if needed
    fn gp_on(
        &mut self,
        operation: &'static str,
        grid: GridId,
    ) -> Result<(&mut BoundGp<G>, &Grids), DetrendError> {
        let actual = self.stage();
        let (Some(gp), Some(grids)) = (self.gp.as_mut(), self.grids.as_ref()) else {
            return Err(DetrendError::InvalidStage {
                operation,
                required: Stage::GpConfigured,
                actual,
            });
        };
        if gp.bound_grid() != Some(grid) {
            gp.compute(grid, grids.light_curve(grid))?;
        }
        Ok((gp, grids))
    }

    /// One realisation of the GP prior on the binned grid
    pub fn draw_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Array1<f64>, DetrendError> {
        let (Some(gp), Some(grids)) = (self.gp.as_ref(), self.grids.as_ref()) else {
            return Err(self.stage_error("draw_sample", Stage::GpConfigured));
        };
        Ok(gp.sample(grids.binned.time(), rng)?)
    }

    /// GP prediction on the binned grid conditioned on the binned transit-free flux
    pub fn predict_binned(&mut self) -> Result<Prediction, DetrendError> {
        let (gp, grids) = self.gp_on("predict_binned", GridId::Binned)?;
        let flux = grids.flux_without_transits(GridId::Binned)?;
        Ok(gp.predict(GridId::Binned, flux.view(), grids.binned.time())?)
    }

    /// Fit GP hyperparameters to the binned transit-free flux
    ///
    /// Non-convergence is not an error, check [OptimizationResult::success].
    pub fn optimize(&mut self) -> Result<&OptimizationResult, DetrendError> {
        let minimizer = self.config.minimizer.clone();
        let (gp, grids) = self.gp_on("optimize", GridId::Binned)?;
        let flux = grids.flux_without_transits(GridId::Binned)?;
        let result = optimize_hyperparameters(gp, &minimizer, flux.view())?;
        self.detrended = None;
        Ok(self.fit.insert(result))
    }

    /// Predict correlated noise on the full grid with the fitted hyperparameters and divide it out
    pub fn detrend(&mut self) -> Result<&DetrendedResult, DetrendError> {
        let x = self
            .fit
            .as_ref()
            .map(|fit| fit.x.clone())
            .ok_or(DetrendError::NotOptimized)?;
        let actual = self.stage();
        let (Some(gp), Some(grids)) = (self.gp.as_mut(), self.grids.as_ref()) else {
            return Err(DetrendError::InvalidStage {
                operation: "detrend",
                required: Stage::Optimized,
                actual,
            });
        };
        gp.set_parameter_vector(x.view())?;
        gp.compute(GridId::Full, &grids.full)?;
        let flux = grids.flux_without_transits(GridId::Full)?;
        let Prediction { mean, variance } =
            gp.predict(GridId::Full, flux.view(), grids.full.time())?;
        let detrended_flux = Zip::from(grids.full.flux())
            .and(&mean)
            .map_collect(|&f, &noise| f / noise);
        Ok(self.detrended.insert(DetrendedResult {
            predicted_noise: mean,
            predicted_variance: variance,
            detrended_flux,
        }))
    }

    /// Write the detrended table with the [DETRENDED_HEADER] header
    pub fn write_detrended<W: std::io::Write>(&self, writer: W) -> Result<(), DetrendError> {
        let (Some(result), Some(grids)) = (self.detrended.as_ref(), self.grids.as_ref()) else {
            return Err(self.stage_error("save_detrended", Stage::Detrended));
        };
        write_table(
            writer,
            Some(DETRENDED_HEADER),
            &[
                grids.full.time(),
                result.detrended_flux.view(),
                grids.full.flux_err(),
                grids.full.flux(),
                result.predicted_noise.view(),
                grids.transit_full.view(),
            ],
        )
    }

    pub fn save_detrended(&self, path: impl AsRef<Path>) -> Result<(), DetrendError> {
        if self.detrended.is_none() {
            return Err(self.stage_error("save_detrended", Stage::Detrended));
        }
        let path = path.as_ref();
        log::info!("Saving {}", path.display());
        let file = std::fs::File::create(path)?;
        self.write_detrended(file)
    }

    fn output_path(&self, suffix: &str) -> Result<PathBuf, DetrendError> {
        self.source
            .as_deref()
            .map(|source| derived_path(source, suffix))
            .ok_or_else(|| {
                DetrendError::Configuration(
                    "light curve was not loaded from a file, output path cannot be derived".into(),
                )
            })
    }

    /// [Detrender::detrend] and save the result next to the input file as `<stem>_detrended.dat`
    pub fn detrend_and_save(&mut self) -> Result<PathBuf, DetrendError> {
        let path = self.output_path("_detrended.dat")?;
        self.detrend()?;
        self.save_detrended(&path)?;
        Ok(path)
    }

    /// Observations within the transit windows of any planet
    ///
    /// Detrended flux is used if available. See [transit_mask] for the window definition.
    pub fn cut_transits(&self, durations: &Durations) -> Result<TransitCut, DetrendError> {
        let (Some(model), Some(grids)) = (self.transit_model.as_ref(), self.grids.as_ref()) else {
            return Err(DetrendError::NoTransitModel);
        };
        let mask = transit_mask(grids.full.time(), model, durations)?;
        let select = |a: ArrayView1<f64>| -> Array1<f64> {
            a.iter()
                .zip(&mask)
                .filter_map(|(&x, &inside)| inside.then_some(x))
                .collect()
        };
        let (flux, detrended) = match &self.detrended {
            Some(result) => (select(result.detrended_flux.view()), true),
            None => (select(grids.full.flux()), false),
        };
        Ok(TransitCut {
            time: select(grids.full.time()),
            flux,
            flux_err: select(grids.full.flux_err()),
            detrended,
        })
    }

    /// [Detrender::cut_transits] and save next to the input file as `<stem>_cut.dat` or
    /// `<stem>_detrended_cut.dat`
    pub fn cut_transits_and_save(&self, durations: &Durations) -> Result<PathBuf, DetrendError> {
        let cut = self.cut_transits(durations)?;
        let path = self.output_path(cut.file_suffix())?;
        log::info!("Saving {}", path.display());
        cut.write(std::fs::File::create(&path)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::optimize::CobylaMinimizer;

    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn sine_light_curve(n: usize) -> LightCurve {
        let t = Array1::linspace(0.0, 20.0, n);
        let flux = t.mapv(|t: f64| 1.0 + 2e-3 * (0.7 * t).sin());
        LightCurve::with_fixed_error(t, flux, 1e-3).unwrap()
    }

    fn loaded(n: usize) -> Detrender {
        let mut config = DetrendConfig::default();
        config.set_bin(5);
        let mut detrender = Detrender::new(config);
        detrender.set_light_curve(sine_light_curve(n)).unwrap();
        detrender
    }

    #[test]
    fn stages() {
        let mut detrender = Detrender::new(DetrendConfig::default());
        assert_eq!(detrender.stage(), Stage::Created);

        detrender.set_light_curve(sine_light_curve(100)).unwrap();
        assert_eq!(detrender.stage(), Stage::DataLoaded);
        assert_eq!(detrender.binned_light_curve().unwrap().len(), 10);

        detrender
            .add_transits(&[5.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2])
            .unwrap();
        assert_eq!(detrender.stage(), Stage::TransitModelSet);

        detrender.configure_gp(KernelKind::Exp).unwrap();
        assert_eq!(detrender.stage(), Stage::GpConfigured);
        assert_eq!(detrender.gp().unwrap().bound_grid(), Some(GridId::Binned));

        detrender.optimize().unwrap();
        assert_eq!(detrender.stage(), Stage::Optimized);

        detrender.detrend().unwrap();
        assert_eq!(detrender.stage(), Stage::Detrended);
        assert_eq!(detrender.gp().unwrap().bound_grid(), Some(GridId::Full));

        // A new transit model invalidates the fit
        detrender
            .add_transits(&[6.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2])
            .unwrap();
        assert_eq!(detrender.stage(), Stage::GpConfigured);
        assert!(detrender.detrended().is_none());
        assert!(detrender.optimization_result().is_none());
    }

    #[test]
    fn operations_require_stage() {
        let mut detrender = Detrender::new(DetrendConfig::default());
        assert!(matches!(
            detrender.configure_gp(KernelKind::Exp),
            Err(DetrendError::InvalidStage {
                required: Stage::DataLoaded,
                actual: Stage::Created,
                ..
            })
        ));
        assert!(matches!(
            detrender.add_transits(&[5.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2]),
            Err(DetrendError::InvalidStage { .. })
        ));

        let mut detrender = loaded(100);
        assert!(matches!(
            detrender.optimize(),
            Err(DetrendError::InvalidStage {
                operation: "optimize",
                required: Stage::GpConfigured,
                actual: Stage::DataLoaded,
            })
        ));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(detrender.draw_sample(&mut rng).is_err());
        assert!(matches!(
            detrender.detrend(),
            Err(DetrendError::NotOptimized)
        ));
        assert!(matches!(
            detrender.save_detrended("never-written.dat"),
            Err(DetrendError::InvalidStage { .. })
        ));
    }

    #[test]
    fn detrend_requires_optimization() {
        let mut detrender = loaded(100);
        detrender.configure_gp(KernelKind::Matern32).unwrap();
        assert!(matches!(
            detrender.detrend(),
            Err(DetrendError::NotOptimized)
        ));
    }

    #[test]
    fn invalid_transit_parameters() {
        let mut detrender = loaded(100);
        assert!(matches!(
            detrender.add_transits(&[5.0, 10.0, 15.0, 89.5], [0.3, 0.2]),
            Err(DetrendError::Configuration(_))
        ));
        assert_eq!(detrender.stage(), Stage::DataLoaded);
    }

    #[test]
    fn zero_bin_is_rejected() {
        let mut config = DetrendConfig::default();
        config.set_bin(0);
        let mut detrender = Detrender::new(config);
        assert!(matches!(
            detrender.set_light_curve(sine_light_curve(10)),
            Err(DetrendError::Configuration(_))
        ));
    }

    #[test]
    fn detrended_flux_is_flux_over_prediction() {
        let mut detrender = loaded(200);
        detrender.configure_gp(KernelKind::Matern32).unwrap();
        assert!(detrender.optimize().unwrap().x.iter().all(|x| x.is_finite()));
        let result = detrender.detrend().unwrap().clone();
        let lc = detrender.light_curve().unwrap();
        assert_eq!(result.detrended_flux.len(), lc.len());
        for ((&f, &noise), &detrended) in lc
            .flux()
            .iter()
            .zip(&result.predicted_noise)
            .zip(&result.detrended_flux)
        {
            assert_relative_eq!(detrended, f / noise);
        }
        assert!(result.predicted_variance.iter().all(|&v| v >= 0.0));
        // Smooth signal is absorbed by the GP
        assert!(crate::std_dev(result.detrended_flux.view()) < crate::std_dev(lc.flux()));
    }

    #[test]
    fn optimize_after_detrend_uses_binned_grid() {
        let mut detrender = loaded(100);
        detrender.configure_gp(KernelKind::Exp).unwrap();
        let first = detrender.optimize().unwrap().clone();
        detrender.detrend().unwrap();
        let second = detrender.optimize().unwrap().clone();
        assert_eq!(detrender.gp().unwrap().bound_grid(), Some(GridId::Binned));
        assert_relative_eq!(first.fun, second.fun, max_relative = 1e-3);
    }

    #[test]
    fn predict_binned_follows_data() {
        let mut detrender = loaded(200);
        detrender.configure_gp(KernelKind::Matern52).unwrap();
        detrender.optimize().unwrap();
        let prediction = detrender.predict_binned().unwrap();
        let binned = detrender.binned_light_curve().unwrap();
        assert_eq!(prediction.mean.len(), binned.len());
        for (&mean, &flux) in prediction.mean.iter().zip(binned.flux()) {
            assert!((mean - flux).abs() < 5e-3);
        }
    }

    #[test]
    fn seeded_draw_sample() {
        let mut detrender = loaded(100);
        detrender.configure_gp(KernelKind::Exp).unwrap();
        let a = detrender
            .draw_sample(&mut StdRng::seed_from_u64(42))
            .unwrap();
        let b = detrender
            .draw_sample(&mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn cut_transits_without_model() {
        let detrender = loaded(100);
        assert!(matches!(
            detrender.cut_transits(&Durations::default()),
            Err(DetrendError::NoTransitModel)
        ));
    }

    #[test]
    fn cut_transits_selects_windows() {
        let mut detrender = loaded(2001);
        detrender
            .add_transits(&[5.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2])
            .unwrap();
        let cut = detrender.cut_transits(&Durations::Single(0.2025)).unwrap();
        assert!(!cut.detrended);
        assert_eq!(cut.file_suffix(), "_cut.dat");
        assert!(!cut.is_empty());
        // Windows are |t - T0 - kP| <= 2 d = 0.405 around t = 5 and t = 15, time step is 0.01
        assert!(
            cut.time
                .iter()
                .all(|&t| (t - 5.0).abs() <= 0.405 || (t - 15.0).abs() <= 0.405)
        );
        assert_eq!(cut.len(), 2 * 81);
        assert_eq!(cut.flux.len(), cut.len());
        assert!(cut.flux_err.iter().all(|&e| e == 1e-3));
    }

    #[test]
    fn default_optimizer_finishes_on_small_light_curve() {
        let mut detrender = loaded(100);
        detrender.configure_gp(KernelKind::Matern32).unwrap();
        let fit = detrender.optimize().unwrap();
        assert!(fit.n_evaluations <= 1000);
        assert!(fit.fun.is_finite());
        assert_eq!(detrender.stage(), Stage::Optimized);
    }

    #[test]
    fn non_converged_fit_is_still_usable() {
        let mut config = DetrendConfig::default();
        config
            .set_bin(5)
            .set_minimizer(CobylaMinimizer::new(3, 0.5, 1e-6, 20.0).into());
        let mut detrender = Detrender::new(config);
        detrender.set_light_curve(sine_light_curve(100)).unwrap();
        detrender.configure_gp(KernelKind::Exp).unwrap();

        let fit = detrender.optimize().unwrap().clone();
        assert!(!fit.success);
        assert!(fit.n_evaluations <= 3);
        assert_eq!(detrender.stage(), Stage::Optimized);
        assert_eq!(detrender.gp().unwrap().parameter_vector(), fit.x);

        let result = detrender.detrend().unwrap();
        assert_eq!(result.detrended_flux.len(), 100);
        assert!(result.detrended_flux.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn cut_transits_rejects_empty_duration_list() {
        let mut detrender = loaded(100);
        detrender
            .add_transits(&[5.0, 10.0, 15.0, 89.5, 0.1], [0.3, 0.2])
            .unwrap();
        assert!(matches!(
            detrender.cut_transits(&Durations::PerPlanet(vec![])),
            Err(DetrendError::Configuration(_))
        ));
    }

    #[test]
    fn config_serialization() {
        let mut config = DetrendConfig::default();
        config.set_bin(3).set_fixed_error(Some(1e-3));
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: DetrendConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);

        let partial: DetrendConfig = serde_json::from_str(r#"{"bin": 20}"#).unwrap();
        assert_eq!(partial.bin, 20);
        assert_eq!(partial.fixed_error, None);
        assert_eq!(partial.minimizer, MinimizerAlgorithm::default());
    }
}
