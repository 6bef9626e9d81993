//! Interface between Rust and Python.
//!
//! The real work happens in the other modules, they do not use `pyo3`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use log::{debug, info};
use ndarray::{arr2, Array2};
use numpy::{PyArray2, PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::correction::{correct_block, CorrectionSettings, ScaleRange};
use crate::error::SixsError;
use crate::sixs::{AtmosphereContext, ConditionsOptions};
use crate::transform::{Calibration, InputKind, InputMask};

impl From<SixsError> for PyErr {
    fn from(e: SixsError) -> Self {
        match e {
            SixsError::Io(_) | SixsError::MieFile(_) => PyIOError::new_err(e.to_string()),
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

fn options(mie_dir: Option<PathBuf>, radius: f64) -> ConditionsOptions {
    ConditionsOptions {
        mie_dir: mie_dir.unwrap_or_else(|| PathBuf::from(".")),
        radius,
    }
}

/// Correction coefficients integrated over the spectral band.
#[pyclass]
struct Coefficients {
    #[pyo3(get)]
    iwave: i32,
    #[pyo3(get)]
    asol: f64,
    #[pyo3(get)]
    xmus: f64,
    #[pyo3(get)]
    tgasm: f64,
    #[pyo3(get)]
    sutott: f64,
    #[pyo3(get)]
    sdtott: f64,
    #[pyo3(get)]
    sast: f64,
    #[pyo3(get)]
    srotot: f64,
    #[pyo3(get)]
    seb: f64,
    #[pyo3(get)]
    sb: f64,
    #[pyo3(get)]
    radiance_factor: f64,
    #[pyo3(get)]
    wlmoy: f64,
    #[pyo3(get)]
    fr: f64,
    ainr: Array2<f64>,
    report: String,
}

#[pymethods]
impl Coefficients {
    /// Intrinsic atmospheric reflectances, shape (2, 3)
    #[getter]
    fn ainr<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.ainr.to_pyarray(py)
    }

    fn __str__(&self) -> String {
        self.report.clone()
    }
}

/// Run 6S for the conditions text and return the band-integrated
/// coefficients.
///
/// `mie_dir` resolves relative `.mie` file names, `radius` is the target
/// radius in km for the environment function.
#[pyfunction]
#[pyo3(signature = (conditions, mie_dir=None, radius=0.5))]
fn compute_coefficients(
    conditions: &str,
    mie_dir: Option<PathBuf>,
    radius: f64,
) -> PyResult<Coefficients> {
    let ctx = AtmosphereContext::from_conditions(conditions, options(mie_dir, radius))?;
    let band = ctx.compute_band();
    let ti = band.transform;
    Ok(Coefficients {
        iwave: ti.iwave,
        asol: ti.asol,
        xmus: ti.xmus,
        tgasm: ti.tgasm,
        sutott: ti.sutott,
        sdtott: ti.sdtott,
        sast: ti.sast,
        srotot: ti.srotot,
        seb: ti.seb,
        sb: ti.sb,
        radiance_factor: band.radiance_factor,
        wlmoy: ctx.spectral.wlmoy,
        fr: band.environment.fr,
        ainr: arr2(&ti.ainr),
        report: ctx.to_string(),
    })
}

fn calibration(name: Option<&str>) -> PyResult<Calibration> {
    match name {
        None => Ok(Calibration::Generic),
        Some("before2000") => Ok(Calibration::EtmBefore2000),
        Some("after2000") => Ok(Calibration::EtmAfter2000),
        Some(other) => Err(PyValueError::new_err(format!(
            "unknown ETM+ calibration '{other}', expected 'before2000' or 'after2000'"
        ))),
    }
}

/// Atmospheric correction of a raster block.
///
/// `values` has shape (`rows`, `cols`) and is scaled from `input_range` to
/// [0, 1] before the correction. The surface reflectances are scaled to
/// `output_range`, and rounded when `integer_output` is set. NaN marks
/// missing values.
///
/// `heights` (target elevation in m) and `visibilities` (km), when given,
/// have the same shape as `values`.
///
/// The values are radiances unless `reflectance` is set. `etm_calibration`
/// is `None`, `"before2000"` or `"after2000"` for Landsat 7 ETM+ digital
/// numbers.
///
/// The number of worker threads is controlled by `num_threads`. It must be a
/// positive integer, or `None` to automatically choose the number of threads.
#[pyfunction]
#[pyo3(signature = (conditions, values, heights=None, visibilities=None, reflectance=false, etm_calibration=None, input_range=(0, 255), output_range=(0, 255), integer_output=false, mie_dir=None, radius=0.5, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn correct<'py>(
    py: Python<'py>,
    conditions: &str,
    values: PyReadonlyArray2<'_, f32>,
    heights: Option<PyReadonlyArray2<'_, f32>>,
    visibilities: Option<PyReadonlyArray2<'_, f32>>,
    reflectance: bool,
    etm_calibration: Option<&str>,
    input_range: (i32, i32),
    output_range: (i32, i32),
    integer_output: bool,
    mie_dir: Option<PathBuf>,
    radius: f64,
    num_threads: Option<usize>,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let settings = CorrectionSettings {
        mask: InputMask {
            kind: if reflectance {
                InputKind::Reflectance
            } else {
                InputKind::Radiance
            },
            calibration: calibration(etm_calibration)?,
        },
        input: ScaleRange::new(input_range.0, input_range.1),
        output: ScaleRange::new(output_range.0, output_range.1),
        integer_output,
    };
    let ctx = AtmosphereContext::from_conditions(conditions, options(mie_dir, radius))?;
    debug!("conditions parsed");

    let values = values.as_array();
    let heights = heights.as_ref().map(|h| h.as_array());
    let visibilities = visibilities.as_ref().map(|v| v.as_array());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    // Number of finished (height, visibility) pairs, and whether to stop
    let num_completed = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let finished = AtomicBool::new(false);
    let mut output = None;

    let (rows, cols) = values.dim();
    info!("Correcting a block of {rows}x{cols} pixels");

    pool.in_place_scope(|s| -> Result<(), PyErr> {
        s.spawn(|_| {
            output = Some(correct_block(
                &ctx,
                &settings,
                values,
                heights,
                visibilities,
                &cancelled,
                &num_completed,
            ));
            finished.store(true, Ordering::Release);
        });

        // The work is done in the thread pool, back here in the main thread
        // report progress and check for early cancellation
        while !finished.load(Ordering::Acquire) {
            if let Err(e) = py.check_signals() {
                cancelled.store(true, Ordering::Relaxed);
                return Err(e);
            }

            let num_completed = num_completed.load(Ordering::Relaxed);
            info!("Computed 6S for {num_completed} elevation and visibility pairs");

            py.allow_threads(|| {
                for _ in 0..50 {
                    if finished.load(Ordering::Acquire) {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
            });
        }

        Ok(())
    })?;

    let output = output.ok_or(SixsError::Cancelled)??;
    Ok(output.to_pyarray(py))
}

/// A Python module implemented in Rust.
#[pymodule]
fn sixs_atcorr(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(compute_coefficients, m)?)?;
    m.add_function(wrap_pyfunction!(correct, m)?)?;
    m.add_class::<Coefficients>()?;
    Ok(())
}
