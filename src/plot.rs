//! Diagnostic figures
//!
//! Figures are rendered to SVG if the output file has `.svg` extension and to a bitmap image
//! otherwise, the bitmap format is derived from the extension as well.

use crate::data::{LightCurve, std_dev};
use crate::detrend::{DetrendedResult, Detrender};
use crate::error::DetrendError;
use crate::gp::GpEngine;
use crate::transit::TransitEvaluator;

use ndarray::{Array1, ArrayView1};
use plotters::coord::Shift;
use plotters::prelude::*;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

const RAW_COLOR: RGBColor = RGBColor(0xbc, 0xbc, 0xbc);
const MODEL_COLOR: RGBColor = RGBColor(0xb3, 0x00, 0x00);
const DETRENDED_COLOR: RGBColor = RGBColor(0x00, 0x5a, 0xb3);
const FLAT_MODEL_COLOR: RGBColor = RGBColor(0xff, 0x7f, 0x00);

/// Detrended data are shifted down by this number of raw flux standard deviations
pub const DETRENDED_OFFSET_STD: f64 = 6.0;

/// Figure size and time range
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PlotOptions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Time range, the whole light curve if `None`
    pub xlim: Option<(f64, f64)>,
}

impl PlotOptions {
    #[inline]
    pub fn default_width() -> u32 {
        1500
    }

    #[inline]
    pub fn default_height() -> u32 {
        500
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> &mut Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn set_xlim(&mut self, xlim: Option<(f64, f64)>) -> &mut Self {
        self.xlim = xlim;
        self
    }
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            xlim: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Style {
    Points,
    Line,
}

struct Series {
    y: Array1<f64>,
    style: Style,
    color: RGBColor,
    label: &'static str,
}

struct Figure<'a> {
    x: ArrayView1<'a, f64>,
    series: Vec<Series>,
    y_label: &'static str,
    xlim: Option<(f64, f64)>,
}

fn plot_error(e: impl Display) -> DetrendError {
    DetrendError::Plot(e.to_string())
}

/// Range of finite values padded by 5% on each side
fn padded_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &x| {
            (min.min(x), max.max(x))
        });
    if min > max {
        return 0.0..1.0;
    }
    let pad = if max > min {
        0.05 * (max - min)
    } else {
        0.5 * min.abs().max(1.0)
    };
    (min - pad)..(max + pad)
}

impl Figure<'_> {
    fn save(&self, path: &Path, options: &PlotOptions) -> Result<(), DetrendError> {
        let size = (options.width, options.height);
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            self.draw(SVGBackend::new(path, size).into_drawing_area())
        } else {
            self.draw(BitMapBackend::new(path, size).into_drawing_area())
        }
    }

    fn draw<DB: DrawingBackend>(&self, root: DrawingArea<DB, Shift>) -> Result<(), DetrendError> {
        root.fill(&WHITE).map_err(plot_error)?;

        let x_range = match self.xlim {
            Some((min, max)) => min..max,
            None => padded_range(self.x.iter()),
        };
        let y_range = padded_range(self.series.iter().flat_map(|series| series.y.iter()));

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_error)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Time [days]")
            .y_desc(self.y_label)
            .draw()
            .map_err(plot_error)?;

        for series in &self.series {
            let color = series.color;
            let points = self.x.iter().copied().zip(series.y.iter().copied());
            let annotation = match series.style {
                Style::Points => chart.draw_series(
                    points.map(|xy| Circle::new(xy, 2, color.mix(0.5).filled())),
                ),
                Style::Line => chart.draw_series(LineSeries::new(points, color.stroke_width(2))),
            }
            .map_err(plot_error)?;
            annotation
                .label(series.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_error)?;
        root.present().map_err(plot_error)
    }
}

/// Plot a GP sample drawn on grid `t`
pub fn plot_sample(
    path: impl AsRef<Path>,
    t: ArrayView1<f64>,
    sample: ArrayView1<f64>,
    options: &PlotOptions,
) -> Result<(), DetrendError> {
    if t.len() != sample.len() {
        return Err(DetrendError::Configuration(format!(
            "sample has length {}, time grid has length {}",
            sample.len(),
            t.len()
        )));
    }
    Figure {
        x: t,
        series: vec![Series {
            y: sample.to_owned(),
            style: Style::Line,
            color: MODEL_COLOR,
            label: "GP sample",
        }],
        y_label: "Normalised flux",
        xlim: options.xlim,
    }
    .save(path.as_ref(), options)
}

/// Plot raw light curve and, if `detrended` is given, GP model and detrended light curve
///
/// The model curve is the GP prediction multiplied by `transit_flux`. Detrended data and
/// `transit_flux` are shifted down by [DETRENDED_OFFSET_STD] standard deviations of raw flux.
pub fn plot_light_curve(
    path: impl AsRef<Path>,
    lc: &LightCurve,
    transit_flux: ArrayView1<f64>,
    detrended: Option<&DetrendedResult>,
    options: &PlotOptions,
) -> Result<(), DetrendError> {
    if transit_flux.len() != lc.len() {
        return Err(DetrendError::Configuration(format!(
            "transit flux has length {}, light curve has length {}",
            transit_flux.len(),
            lc.len()
        )));
    }
    let mut series = vec![Series {
        y: lc.flux().to_owned(),
        style: Style::Points,
        color: RAW_COLOR,
        label: "LC data",
    }];
    let mut y_label = "Normalised flux";
    if let Some(result) = detrended {
        let offset = DETRENDED_OFFSET_STD * std_dev(lc.flux());
        series.push(Series {
            y: &result.predicted_noise * &transit_flux,
            style: Style::Line,
            color: MODEL_COLOR,
            label: "Model",
        });
        series.push(Series {
            y: &result.detrended_flux - offset,
            style: Style::Points,
            color: DETRENDED_COLOR,
            label: "LC detrended",
        });
        series.push(Series {
            y: &transit_flux - offset,
            style: Style::Line,
            color: FLAT_MODEL_COLOR,
            label: "Flat LC model",
        });
        y_label = "Normalised flux + offset";
    }
    Figure {
        x: lc.time(),
        series,
        y_label,
        xlim: options.xlim,
    }
    .save(path.as_ref(), options)
}

impl<G, E> Detrender<G, E>
where
    G: GpEngine,
    E: TransitEvaluator,
{
    /// Draw a GP prior sample on the binned grid and plot it
    pub fn plot_sample<R: Rng + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        rng: &mut R,
        options: &PlotOptions,
    ) -> Result<(), DetrendError> {
        let sample = self.draw_sample(rng)?;
        let lc = self.binned_light_curve().ok_or(DetrendError::InvalidStage {
            operation: "plot_sample",
            required: crate::Stage::GpConfigured,
            actual: self.stage(),
        })?;
        plot_sample(path, lc.time(), sample.view(), options)
    }

    /// Plot the light curve with the detrending products available so far
    pub fn plot(&self, path: impl AsRef<Path>, options: &PlotOptions) -> Result<(), DetrendError> {
        let (Some(lc), Some(transit_flux)) = (self.light_curve(), self.transit_flux()) else {
            return Err(DetrendError::InvalidStage {
                operation: "plot",
                required: crate::Stage::DataLoaded,
                actual: self.stage(),
            });
        };
        plot_light_curve(path, lc, transit_flux, self.detrended(), options)
    }
}
