//! Per-pixel atmospheric correction.
//!
//! A target elevation map and a visibility map make the correction vary from
//! pixel to pixel. The coefficients are recomputed for each distinct pair of
//! (rounded) elevation and visibility and kept in a [`TransformCache`].

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::error::SixsError;
use crate::sixs::AtmosphereContext;
use crate::transform::{transform, InputMask, TransformInput};

/// Elevations are rounded to this many meters.
const BIN_ALT: f64 = 10.;

/// Visibilities are rounded to this many meters.
const BIN_VIS: f64 = 100.;

/// Below this visibility (km) the computation is no longer reliable.
const MIN_VISIBILITY: f32 = 5.;

/// Integer range the values of a raster are scaled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleRange {
    /// Value for 0
    pub min: i32,
    /// Value for 1
    pub max: i32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

impl ScaleRange {
    /// A range from two bounds. Equal bounds fall back to the default range,
    /// and reversed bounds are swapped.
    pub fn new(min: i32, max: i32) -> Self {
        if min == max {
            warn!("scale range length should be > 0, using the default [0,255]");
            return Self::default();
        }
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    fn to_unit(self, value: f32) -> f32 {
        ((f64::from(value) - f64::from(self.min)) / (f64::from(self.max) - f64::from(self.min)))
            as f32
    }

    fn from_unit(self, value: f32) -> f32 {
        (f64::from(value) * (f64::from(self.max) - f64::from(self.min)) + f64::from(self.min))
            as f32
    }
}

/// How the raster values are read and written.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorrectionSettings {
    /// Interpretation of the input values
    pub mask: InputMask,
    /// Range of the input values
    pub input: ScaleRange,
    /// Range of the output values
    pub output: ScaleRange,
    /// Whether the output is rounded to integers
    pub integer_output: bool,
}

/// Elevation (m) and visibility (m) after rounding. `None` means the value
/// of the conditions is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Target elevation in m
    pub height: Option<i32>,
    /// Visibility in m
    pub visibility: Option<i32>,
}

impl CacheKey {
    /// Key for a target elevation in m and a visibility in km.
    pub fn new(height_m: Option<f32>, visibility_km: Option<f32>) -> Self {
        Self {
            height: height_m.map(|h| round_height(f64::from(h))),
            visibility: visibility_km.map(|v| round_visibility(f64::from(v))),
        }
    }
}

/// Round an elevation to [`BIN_ALT`], in m.
fn round_height(x: f64) -> i32 {
    ((x / BIN_ALT + 0.5).floor() * BIN_ALT) as i32
}

/// Round a visibility in km to [`BIN_VIS`], in m.
fn round_visibility(x: f64) -> i32 {
    ((x * 1000. / BIN_VIS + 0.5).floor() * BIN_VIS) as i32
}

/// Transform coefficients already computed, by elevation and visibility.
#[derive(Debug, Clone, Default)]
pub struct TransformCache {
    entries: HashMap<CacheKey, TransformInput>,
}

impl TransformCache {
    /// Coefficients for `key`, if already computed.
    pub fn get(&self, key: &CacheKey) -> Option<&TransformInput> {
        self.entries.get(key)
    }

    /// Remember the coefficients for `key`.
    pub fn insert(&mut self, key: CacheKey, ti: TransformInput) {
        self.entries.insert(key, ti);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recompute the context for a key and integrate over the band.
fn compute_for(ctx: &mut AtmosphereContext, key: CacheKey) -> TransformInput {
    let height = key.height.map(|h| f64::from(h) / 1000.);
    let visibility = key.visibility.map(|v| f64::from(v) / 1000.);
    match (height, visibility) {
        (Some(h), Some(v)) => ctx.pre_compute_hv(h, v),
        (Some(h), None) => ctx.pre_compute_h(h),
        (None, Some(v)) => ctx.pre_compute_v(v),
        (None, None) => {}
    }
    ctx.compute()
}

/// Check a visibility (km), replacing a negative one by 0.
fn checked_visibility(v: f32, warned: &mut bool) -> f32 {
    let v = if v < 0. {
        warn!("negative visibility, using 0");
        0.
    } else {
        v
    };
    if v < MIN_VISIBILITY && !*warned {
        warn!("the visibility must be better than 5.0 km, below that the results might not be valid");
        *warned = true;
    }
    v
}

/// Map a value scaled to [0, 1] through the transform and back to the output
/// range.
fn correct_value(
    ti: &TransformInput,
    settings: &CorrectionSettings,
    value: f32,
) -> Result<f32, SixsError> {
    let corrected = transform(ti, settings.mask, settings.input.to_unit(value));
    if corrected.is_nan() {
        return Err(SixsError::NumericalInstability);
    }
    let out = settings.output.from_unit(corrected);
    if settings.integer_output {
        if out > settings.output.max as f32 {
            warn!("the output will overflow, reflectance > 100%");
        }
        Ok(out.round())
    } else {
        Ok(out)
    }
}

/// Sequential correction of pixels, one at a time.
#[derive(Debug)]
pub struct PixelCorrector {
    ctx: AtmosphereContext,
    settings: CorrectionSettings,
    base: TransformInput,
    cache: TransformCache,
    last: Option<(CacheKey, TransformInput)>,
    warned_visibility: bool,
}

impl PixelCorrector {
    /// Corrector for the conditions of `ctx`.
    pub fn new(ctx: AtmosphereContext, settings: CorrectionSettings) -> Self {
        let base = ctx.compute();
        Self {
            ctx,
            settings,
            base,
            cache: TransformCache::default(),
            last: None,
            warned_visibility: false,
        }
    }

    /// The cache of computed coefficients.
    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    fn transform_input(&mut self, key: CacheKey) -> TransformInput {
        if key.height.is_none() && key.visibility.is_none() {
            return self.base;
        }
        if let Some((last, ti)) = self.last {
            if last == key {
                return ti;
            }
        }
        let ti = match self.cache.get(&key) {
            Some(ti) => *ti,
            None => {
                let ti = compute_for(&mut self.ctx, key);
                self.cache.insert(key, ti);
                ti
            }
        };
        self.last = Some((key, ti));
        ti
    }

    /// Correct one pixel value, with an optional target elevation in m and
    /// visibility in km. NaN inputs give NaN.
    pub fn correct(
        &mut self,
        value: f32,
        height_m: Option<f32>,
        visibility_km: Option<f32>,
    ) -> Result<f32, SixsError> {
        if value.is_nan()
            || height_m.is_some_and(f32::is_nan)
            || visibility_km.is_some_and(f32::is_nan)
        {
            return Ok(f32::NAN);
        }
        let visibility_km =
            visibility_km.map(|v| checked_visibility(v, &mut self.warned_visibility));
        let ti = self.transform_input(CacheKey::new(height_m, visibility_km));
        correct_value(&ti, &self.settings, value)
    }
}

/// Correct a block of values in parallel.
///
/// `heights` (m) and `visibilities` (km), when given, have the same shape as
/// `values`. Each distinct pair of rounded elevation and visibility is
/// computed once on a per-worker copy of `ctx`. `completed` counts the
/// finished pairs and `cancelled` stops early.
pub fn correct_block(
    ctx: &AtmosphereContext,
    settings: &CorrectionSettings,
    values: ArrayView2<'_, f32>,
    heights: Option<ArrayView2<'_, f32>>,
    visibilities: Option<ArrayView2<'_, f32>>,
    cancelled: &AtomicBool,
    completed: &AtomicUsize,
) -> Result<Array2<f32>, SixsError> {
    let shape = values.dim();
    if heights.is_some_and(|h| h.dim() != shape) || visibilities.is_some_and(|v| v.dim() != shape)
    {
        return Err(SixsError::InconsistentInputs);
    }

    let mut warned = false;
    let keys: Array2<Option<CacheKey>> = Array2::from_shape_fn(shape, |ij| {
        let h = heights.map(|h| h[ij]);
        let v = visibilities.map(|v| v[ij]);
        if values[ij].is_nan() || h.is_some_and(f32::is_nan) || v.is_some_and(f32::is_nan) {
            return None;
        }
        let v = v.map(|v| checked_visibility(v, &mut warned));
        Some(CacheKey::new(h, v))
    });

    let distinct: Vec<CacheKey> = keys
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!(
        "correcting {} pixels for {} distinct elevation and visibility pairs",
        values.len(),
        distinct.len()
    );

    let computed: HashMap<CacheKey, TransformInput> = distinct
        .into_par_iter()
        .map_init(
            || ctx.clone(),
            |ctx, key| -> Result<_, SixsError> {
                if cancelled.load(Ordering::Relaxed) {
                    return Err(SixsError::Cancelled);
                }
                let ti = compute_for(ctx, key);
                completed.fetch_add(1, Ordering::Relaxed);
                Ok((key, ti))
            },
        )
        .collect::<Result<_, _>>()?;
    debug!("computed {} sets of coefficients", computed.len());

    let ncols = shape.1;
    let out: Vec<f32> = (0..values.len())
        .into_par_iter()
        .map(|k| {
            let ij = (k / ncols, k % ncols);
            match keys[ij] {
                None => Ok(f32::NAN),
                Some(key) => {
                    let ti = computed.get(&key).ok_or(SixsError::InconsistentInputs)?;
                    correct_value(ti, settings, values[ij])
                }
            }
        })
        .collect::<Result<_, _>>()?;

    Array2::from_shape_vec(shape, out).map_err(|_| SixsError::InconsistentInputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sixs::ConditionsOptions;
    use approx::assert_relative_eq;
    use ndarray::array;

    const CONDITIONS: &str = "0\n30 0 0 0 6 15\n6\n1\n23\n0\n-1000\n-2\n0.62 0.67\n";

    fn context() -> AtmosphereContext {
        AtmosphereContext::from_conditions(CONDITIONS, ConditionsOptions::default()).unwrap()
    }

    #[test]
    fn scale_ranges() {
        assert_eq!(ScaleRange::new(0, 0), ScaleRange::default());
        assert_eq!(ScaleRange::new(100, 10), ScaleRange { min: 10, max: 100 });
        let r = ScaleRange::new(10, 110);
        assert_relative_eq!(r.to_unit(60.), 0.5);
        assert_relative_eq!(r.from_unit(0.25), 35.);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_height(1234.), 1230);
        assert_eq!(round_height(1235.), 1240);
        assert_eq!(round_height(-14.), -10);
        assert_eq!(round_visibility(23.04), 23000);
        assert_eq!(round_visibility(23.05), 23100);
    }

    #[test]
    fn pixels_share_cached_coefficients() {
        let mut corrector = PixelCorrector::new(context(), CorrectionSettings::default());
        let a = corrector.correct(80., Some(1002.), None).unwrap();
        let b = corrector.correct(80., Some(998.), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(corrector.cache().len(), 1);
        corrector.correct(80., Some(500.), Some(10.)).unwrap();
        assert_eq!(corrector.cache().len(), 2);
        assert!(corrector.correct(f32::NAN, None, None).unwrap().is_nan());
        assert!(corrector.correct(80., Some(f32::NAN), None).unwrap().is_nan());
    }

    #[test]
    fn higher_targets_see_less_path_radiance() {
        let mut corrector = PixelCorrector::new(
            context(),
            CorrectionSettings {
                mask: InputMask {
                    kind: crate::transform::InputKind::Reflectance,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let low = corrector.correct(40., Some(0.), None).unwrap();
        let high = corrector.correct(40., Some(3000.), None).unwrap();
        assert!(high > low);
    }

    #[test]
    fn block_matches_sequential() {
        let ctx = context();
        let settings = CorrectionSettings::default();
        let values = array![[10., 50.], [f32::NAN, 120.]];
        let heights = array![[0., 100.], [200., 1000.]];
        let cancelled = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);
        let out = correct_block(
            &ctx,
            &settings,
            values.view(),
            Some(heights.view()),
            None,
            &cancelled,
            &completed,
        )
        .unwrap();
        assert_eq!(completed.load(Ordering::Relaxed), 3);
        assert!(out[[1, 0]].is_nan());

        let mut corrector = PixelCorrector::new(ctx, settings);
        for ((i, j), &v) in values.indexed_iter() {
            let expected = corrector.correct(v, Some(heights[[i, j]]), None).unwrap();
            if v.is_nan() {
                continue;
            }
            assert_relative_eq!(out[[i, j]], expected, max_relative = 1e-6);
        }
    }

    #[test]
    fn block_shapes_and_cancellation() {
        let ctx = context();
        let values = Array2::<f32>::zeros((2, 2));
        let heights = Array2::<f32>::zeros((2, 3));
        let cancelled = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);
        assert!(matches!(
            correct_block(
                &ctx,
                &CorrectionSettings::default(),
                values.view(),
                Some(heights.view()),
                None,
                &cancelled,
                &completed,
            ),
            Err(SixsError::InconsistentInputs)
        ));

        cancelled.store(true, Ordering::Relaxed);
        let heights = Array2::<f32>::zeros((2, 2));
        assert!(matches!(
            correct_block(
                &ctx,
                &CorrectionSettings::default(),
                values.view(),
                Some(heights.view()),
                None,
                &cancelled,
                &completed,
            ),
            Err(SixsError::Cancelled)
        ));
    }
}
