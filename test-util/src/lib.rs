use lazy_static::lazy_static;
use light_curve_detrend::{
    DenseGp, GpEngine, Kernel, KernelKind, LightCurve, QuadraticTransit, TransitModel,
    transit_flux, write_table,
};
use ndarray::Array1;
use rand::prelude::*;
use rand_distr::StandardNormal;
use std::path::Path;

/// Setup of a synthetic light curve with a transiting planet and correlated noise
#[derive(Clone, Debug)]
pub struct SyntheticSetup {
    pub n: usize,
    pub t_min: f64,
    pub t_max: f64,
    /// `[T0, P, a/R*, i, Rp/R*] × n_planets`
    pub planet_parameters: Vec<f64>,
    pub limb_darkening: [f64; 2],
    /// Kernel of the multiplicative correlated noise, a GP with unit mean
    pub noise_kernel: Kernel,
    /// Standard deviation of the white noise, also used as the flux error
    pub white_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticSetup {
    fn default() -> Self {
        Self {
            n: 1000,
            t_min: 0.0,
            t_max: 20.0,
            planet_parameters: vec![5.0, 10.0, 15.0, 89.5, 0.1],
            limb_darkening: [0.3, 0.2],
            noise_kernel: Kernel::with_hyperparameters(KernelKind::Matern32, 1e-5, 1.0),
            white_noise: 1e-3,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyntheticLightCurve {
    pub light_curve: LightCurve,
    pub transit_model: TransitModel,
    pub transit_flux: Array1<f64>,
    /// Correlated noise multiplier
    pub trend: Array1<f64>,
}

pub fn synthetic_light_curve(setup: &SyntheticSetup) -> SyntheticLightCurve {
    let mut rng = StdRng::seed_from_u64(setup.seed);
    let t = Array1::linspace(setup.t_min, setup.t_max, setup.n);

    let transit_model =
        TransitModel::new(&setup.planet_parameters, setup.limb_darkening).unwrap();
    let transit_flux =
        transit_flux(&mut QuadraticTransit::default(), t.view(), &transit_model).unwrap();
    let trend = DenseGp::new(setup.noise_kernel)
        .sample(t.view(), &mut rng)
        .unwrap();
    let flux = (&transit_flux * &trend).mapv(|f| {
        let eps: f64 = rng.sample(StandardNormal);
        f + setup.white_noise * eps
    });

    SyntheticLightCurve {
        light_curve: LightCurve::with_fixed_error(t, flux, setup.white_noise).unwrap(),
        transit_model,
        transit_flux,
        trend,
    }
}

/// Write `time flux` or `time flux flux_err` columns
pub fn write_light_curve(path: impl AsRef<Path>, lc: &LightCurve, with_errors: bool) {
    let file = std::fs::File::create(path).unwrap();
    let mut columns = vec![lc.time(), lc.flux()];
    if with_errors {
        columns.push(lc.flux_err());
    }
    write_table(file, Some("synthetic light curve"), &columns).unwrap();
}

lazy_static! {
    /// 1000 observations over 20 days with a single planet (T0 = 5, P = 10, a/R* = 15,
    /// i = 89.5°, Rp/R* = 0.1, u = (0.3, 0.2)) and Matérn-3/2 correlated noise
    pub static ref SYNTHETIC_TRANSIT_LIGHT_CURVE: SyntheticLightCurve =
        synthetic_light_curve(&SyntheticSetup::default());
}
