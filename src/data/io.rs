use crate::data::light_curve::LightCurve;
use crate::error::DetrendError;

use itertools::{Itertools, process_results};
use ndarray::ArrayView1;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Read a whitespace-separated light curve
///
/// Blank lines and lines starting with `#` are skipped. Every row must have the same number of
/// columns: `time flux flux_err`, or `time flux` when `fixed_error` is given. If `fixed_error` is
/// given, a third column is allowed and ignored, `fixed_error` is assigned to every observation.
pub fn read_light_curve<R: Read>(
    reader: R,
    fixed_error: Option<f64>,
) -> Result<LightCurve, DetrendError> {
    let rows = BufReader::new(reader)
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(line) => {
                let line = line.trim().to_owned();
                (!line.is_empty() && !line.starts_with('#')).then_some(Ok((i + 1, line)))
            }
            Err(e) => Some(Err(DetrendError::from(e))),
        })
        .map(|row| -> Result<(usize, Vec<f64>), DetrendError> {
            let (line_number, line) = row?;
            let values = line
                .split_whitespace()
                .map(|s| {
                    s.parse::<f64>().map_err(|_| {
                        DetrendError::DataFormat(format!(
                            "line {line_number}: cannot parse {s:?} as a number"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((line_number, values))
        });
    let rows: Vec<(usize, Vec<f64>)> = process_results(rows, |iter| iter.collect())?;

    let ncols = match rows.first() {
        Some((_, values)) => values.len(),
        None => return Err(DetrendError::DataFormat("input has no data rows".into())),
    };
    match (ncols, fixed_error) {
        (3, _) | (2, Some(_)) => {}
        (2, None) => {
            return Err(DetrendError::DataFormat(
                "input has two columns, flux error column or fixed error is required".into(),
            ));
        }
        (n, _) => {
            return Err(DetrendError::DataFormat(format!(
                "input must have two or three columns, {n} found"
            )));
        }
    }
    if let Some((line_number, values)) = rows.iter().find(|(_, values)| values.len() != ncols) {
        return Err(DetrendError::DataFormat(format!(
            "line {line_number}: {} columns found, {ncols} expected",
            values.len()
        )));
    }

    let (time, flux, flux_err): (Vec<_>, Vec<_>, Vec<_>) = rows
        .into_iter()
        .map(|(_, values)| {
            let err = fixed_error.unwrap_or_else(|| values[2]);
            (values[0], values[1], err)
        })
        .multiunzip();
    LightCurve::new(time, flux, flux_err)
}

/// Load a light curve from a whitespace-separated text file, see [read_light_curve]
pub fn load_light_curve(
    path: impl AsRef<Path>,
    fixed_error: Option<f64>,
) -> Result<LightCurve, DetrendError> {
    let file = File::open(path)?;
    read_light_curve(file, fixed_error)
}

/// Write equal-length columns as a whitespace-separated table
///
/// `header`, if any, is written as the first line prefixed by `# `.
pub fn write_table<W: Write>(
    writer: W,
    header: Option<&str>,
    columns: &[ArrayView1<f64>],
) -> Result<(), DetrendError> {
    let nrows = columns.first().map_or(0, |c| c.len());
    if let Some(c) = columns.iter().find(|c| c.len() != nrows) {
        return Err(DetrendError::Configuration(format!(
            "table columns must have the same length, got {} and {nrows}",
            c.len()
        )));
    }
    let mut writer = BufWriter::new(writer);
    if let Some(header) = header {
        writeln!(writer, "# {header}")?;
    }
    for i in 0..nrows {
        let row = columns.iter().map(|c| format!("{:.18e}", c[i])).join(" ");
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Path of a product file derived from the input light curve path
///
/// `data/lc.dat` with suffix `_detrended.dat` becomes `data/lc_detrended.dat`.
pub fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{suffix}"))
}
