#![doc = include_str!("../README.md")]

mod data;
pub use data::{LightCurve, derived_path, load_light_curve, read_light_curve, std_dev, write_table};

mod detrend;
pub use detrend::{DETRENDED_HEADER, DetrendConfig, DetrendedResult, Detrender, Stage, TransitCut};

mod error;
pub use error::{DetrendError, GpError};

pub mod gp;
pub use gp::{BoundGp, DenseGp, GpEngine, GridId, Kernel, KernelKind, Prediction};

pub mod optimize;
pub use optimize::{
    CobylaMinimizer, MinimizerAlgorithm, MinimizerTrait, OptimizationResult,
    optimize_hyperparameters,
};

#[cfg(feature = "plot")]
pub mod plot;
#[cfg(feature = "plot")]
pub use plot::PlotOptions;

pub mod transit;
pub use transit::{
    Durations, LimbDarkening, PlanetParameters, QuadraticTransit, TransitEvaluator, TransitModel,
    transit_flux, transit_mask,
};

pub use ndarray;
