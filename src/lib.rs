//! Atmospheric correction with the 6S radiative transfer code
//!
//! [`AtmosphereContext`] parses the conditions of an acquisition (geometry,
//! atmosphere, aerosols, altitudes and spectral band) and computes the
//! coefficients that turn an apparent radiance or reflectance into a surface
//! reflectance. [`correction`] applies them to whole rasters, with per-pixel
//! target elevation and visibility.
//!
//! NOTE: the Python interface lives in the `python` module, only built with
//! the `python` feature. It is the only place that uses `pyo3`.

pub mod correction;
pub mod error;
pub mod sixs;
pub mod transform;

#[cfg(feature = "python")]
mod python;

pub use correction::{correct_block, CorrectionSettings, PixelCorrector, ScaleRange};
pub use error::SixsError;
pub use sixs::{AtmosphereContext, BandIntegration, ConditionsOptions};
pub use transform::{transform, Calibration, InputKind, InputMask, TransformInput};
