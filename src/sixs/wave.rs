//! Spectral conditions: the band, its filter function, and the solar
//! spectrum.
//!
//! Filter functions are sampled on a fixed grid from 0.25 to 4.0 µm with a
//! 0.0025 µm step.

use std::sync::OnceLock;

use log::{debug, info};

use super::conditions::ConditionsReader;
use super::sensors::sensor_band;
use crate::error::SixsError;

/// Spacing of the spectral grid (µm).
pub(crate) const STEP: f64 = 0.0025;

/// Number of points in the spectral grid.
pub(crate) const NWL: usize = 1501;

/// Shortest wavelength of the grid (µm).
const WL_MIN: f64 = 0.25;

/// Longest wavelength of the grid (µm).
const WL_MAX: f64 = 4.0;

/// Solar constant the spectrum is normalized to (W/m²).
const SOLAR_CONSTANT: f64 = 1372.;

/// Wavelength of a grid index.
#[inline]
pub(crate) fn grid_wavelength(l: usize) -> f64 {
    WL_MIN + l as f64 * STEP
}

/// Grid index nearest to a wavelength.
fn grid_index(wl: f64) -> usize {
    ((wl - WL_MIN) / STEP + 0.5) as usize
}

/// Extraterrestrial solar spectral irradiance (W/m²/µm) at the nodes of a
/// piecewise-linear curve, before normalization.
///
/// NOTE: a 34-node reconstruction standing in for the 6S solar table at
/// 0.0025 µm. Only the solar constant is preserved exactly, the spectral
/// shape is coarse.
const SOLAR_NODES: [(f64, f64); 34] = [
    (0.25, 60.),
    (0.30, 514.),
    (0.35, 1093.),
    (0.40, 1479.),
    (0.45, 2006.),
    (0.50, 1942.),
    (0.55, 1862.),
    (0.60, 1766.),
    (0.65, 1602.),
    (0.70, 1438.),
    (0.75, 1274.),
    (0.80, 1136.),
    (0.85, 1010.),
    (0.90, 900.),
    (0.95, 822.),
    (1.00, 740.),
    (1.10, 600.),
    (1.20, 485.),
    (1.30, 398.),
    (1.40, 341.),
    (1.50, 294.),
    (1.60, 253.),
    (1.70, 216.),
    (1.80, 180.),
    (1.90, 150.),
    (2.00, 122.),
    (2.20, 90.),
    (2.40, 65.),
    (2.60, 48.),
    (2.80, 37.),
    (3.00, 29.),
    (3.50, 14.6),
    (3.75, 11.2),
    (4.00, 8.9),
];

fn solar_curve(wl: f64) -> f64 {
    let i = SOLAR_NODES
        .windows(2)
        .position(|w| wl <= w[1].0)
        .unwrap_or(SOLAR_NODES.len() - 2);
    let ((x0, y0), (x1, y1)) = (SOLAR_NODES[i], SOLAR_NODES[i + 1]);
    y0 + (y1 - y0) * (wl - x0) / (x1 - x0)
}

/// The solar spectrum on the spectral grid, scaled so that its trapezoidal
/// integral over the grid is the solar constant.
fn solar_spectrum() -> &'static [f64; NWL] {
    static SPECTRUM: OnceLock<[f64; NWL]> = OnceLock::new();
    SPECTRUM.get_or_init(|| {
        let mut si: [f64; NWL] = std::array::from_fn(|l| solar_curve(grid_wavelength(l)));
        let total: f64 = si.iter().sum::<f64>() - 0.5 * (si[0] + si[NWL - 1]);
        let scale = SOLAR_CONSTANT / (total * STEP);
        si.iter_mut().for_each(|s| *s *= scale);
        si
    })
}

/// Solar spectral irradiance (W/m²/µm) at the grid point nearest `wl`, from
/// the reconstructed curve.
pub(crate) fn solirr(wl: f64) -> f64 {
    solar_spectrum()[grid_index(wl).min(NWL - 1)]
}

/// Spectral conditions of the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralConditions {
    /// Spectral conditions selector: -2 (band with step output), -1
    /// (monochromatic), 0 (band), 1 (user filter), or a canned sensor band
    pub iwave: i32,
    /// Lower band limit (µm)
    pub wlinf: f64,
    /// Upper band limit (µm)
    pub wlsup: f64,
    /// First grid index of the band
    pub(crate) iinf: usize,
    /// Last grid index of the band
    pub(crate) isup: usize,
    /// Filter function on the spectral grid
    pub(crate) s: Vec<f64>,
    /// Equivalent wavelength (µm)
    pub wlmoy: f64,
}

fn check_range(wl: f64) -> Result<f64, SixsError> {
    if (WL_MIN..=WL_MAX).contains(&wl) {
        Ok(wl)
    } else {
        Err(SixsError::WavelengthOutOfRange(wl))
    }
}

impl SpectralConditions {
    /// A single wavelength (µm).
    pub fn monochromatic(wl: f64) -> Result<Self, SixsError> {
        let wl = check_range(wl)?;
        let l = grid_index(wl);
        let mut s = vec![0.; NWL];
        s[l] = 1.;
        Ok(Self {
            iwave: -1,
            wlinf: wl,
            wlsup: wl,
            iinf: l,
            isup: l,
            s,
            wlmoy: wl,
        })
    }

    /// A flat band between `wlinf` and `wlsup` (µm).
    pub fn band(wlinf: f64, wlsup: f64) -> Result<Self, SixsError> {
        Self::filtered(0, wlinf, wlsup, |_| 1.)
    }

    /// A band with a user filter function sampled every 0.0025 µm from
    /// `wlinf` to `wlsup`.
    pub fn filter(wlinf: f64, wlsup: f64, values: &[f64]) -> Result<Self, SixsError> {
        let iinf = grid_index(check_range(wlinf)?);
        let isup = grid_index(check_range(wlsup)?);
        if values.len() != isup.saturating_sub(iinf) + 1 {
            return Err(SixsError::InconsistentInputs);
        }
        Self::filtered(1, wlinf, wlsup, |l| values[l - iinf])
    }

    /// One of the canned sensor bands.
    pub fn sensor(iwave: i32) -> Result<Self, SixsError> {
        let band = sensor_band(iwave).ok_or(SixsError::UnknownSpectralCondition(iwave))?;
        Self::filtered(iwave, band.wlinf, band.wlsup, |_| 1.)
    }

    fn filtered(
        iwave: i32,
        wlinf: f64,
        wlsup: f64,
        response: impl Fn(usize) -> f64,
    ) -> Result<Self, SixsError> {
        let iinf = grid_index(check_range(wlinf)?);
        let isup = grid_index(check_range(wlsup)?);
        if isup < iinf {
            return Err(SixsError::WavelengthOutOfRange(wlsup));
        }
        let mut s = vec![0.; NWL];
        for (l, v) in s.iter_mut().enumerate().take(isup + 1).skip(iinf) {
            *v = response(l);
        }
        let mut cond = Self {
            iwave,
            wlinf,
            wlsup,
            iinf,
            isup,
            s,
            wlmoy: 0.,
        };
        cond.wlmoy = cond.equivwl();
        Ok(cond)
    }

    /// Whether each step of the band integration is logged.
    pub(crate) fn step_output(&self) -> bool {
        self.iwave == -2
    }

    /// Filter weight of grid index `l`, with the band edges weighted by one
    /// half (or 1/step for a single wavelength).
    pub(crate) fn weight(&self, l: usize) -> f64 {
        if self.iwave == -1 {
            return 1. / STEP;
        }
        let sbor = self.s[l];
        if l == self.iinf || l == self.isup {
            sbor * 0.5
        } else {
            sbor
        }
    }

    /// Mean wavelength of the band weighted by the filter function and the
    /// solar spectrum.
    fn equivwl(&self) -> f64 {
        let (seb, wlmoy) = (self.iinf..=self.isup).fold((0., 0.), |(seb, wlmoy), l| {
            let wl = grid_wavelength(l);
            let coef = self.weight(l) * STEP * solirr(wl);
            (seb + coef, wlmoy + wl * coef)
        });
        if seb > 0. {
            wlmoy / seb
        } else {
            0.5 * (self.wlinf + self.wlsup)
        }
    }

    /// Parse the spectral conditions block.
    pub(crate) fn parse(reader: &mut ConditionsReader<'_>) -> Result<Self, SixsError> {
        let iwave = reader.int("spectral conditions")?;
        reader.end_line();

        let cond = match iwave {
            -1 => {
                let wl = reader.real("wavelength")?;
                reader.end_line();
                Self::monochromatic(wl)?
            }
            -2 | 0 | 1 => {
                let [wlinf, wlsup] = reader.reals("band limits")?;
                reader.end_line();
                if iwave == 1 {
                    let n = grid_index(check_range(wlsup)?)
                        .saturating_sub(grid_index(check_range(wlinf)?))
                        + 1;
                    let mut values = Vec::with_capacity(n);
                    for _ in 0..n {
                        values.push(reader.real("filter function value")?);
                    }
                    reader.end_line();
                    Self::filter(wlinf, wlsup, &values)?
                } else {
                    Self {
                        iwave,
                        ..Self::band(wlinf, wlsup)?
                    }
                }
            }
            _ => Self::sensor(iwave)?,
        };

        match sensor_band(iwave) {
            Some(band) => info!(
                "{}: {:.4} to {:.4} µm, equivalent wavelength {:.4} µm",
                band.name, cond.wlinf, cond.wlsup, cond.wlmoy
            ),
            None => debug!(
                "spectral band {:.4} to {:.4} µm, equivalent wavelength {:.4} µm",
                cond.wlinf, cond.wlsup, cond.wlmoy
            ),
        }
        Ok(cond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solar_spectrum_integrates_to_solar_constant() {
        let si = solar_spectrum();
        let total = (si.iter().sum::<f64>() - 0.5 * (si[0] + si[NWL - 1])) * STEP;
        assert_relative_eq!(total, SOLAR_CONSTANT, max_relative = 1e-12);
        // The peak is in the blue-green
        assert!(solirr(0.45) > solirr(0.65) && solirr(0.45) > solirr(0.35));
    }

    #[test]
    fn flat_band() {
        let b = SpectralConditions::band(0.62, 0.67).unwrap();
        assert_eq!(b.iinf, 148);
        assert_eq!(b.isup, 168);
        assert_eq!(b.weight(148), 0.5);
        assert_eq!(b.weight(150), 1.);
        // The solar spectrum falls off with wavelength
        assert!(b.wlmoy > 0.62 && b.wlmoy < 0.645);
    }

    #[test]
    fn monochromatic() {
        let m = SpectralConditions::monochromatic(0.55).unwrap();
        assert_eq!(m.iinf, m.isup);
        assert_eq!(m.wlmoy, 0.55);
        assert_relative_eq!(m.weight(m.iinf) * STEP, 1.);
    }

    #[test]
    fn user_filter() {
        let mut r = ConditionsReader::new("1\n0.5 0.51\n0 0.5 1\n1 0.5\n");
        let f = SpectralConditions::parse(&mut r).unwrap();
        assert_eq!(f.isup - f.iinf, 4);
        assert_eq!(f.s[f.iinf + 2], 1.);
        assert_relative_eq!(f.wlmoy, 0.506, epsilon = 1e-3);
    }

    #[test]
    fn canned_band_and_errors() {
        let mut r = ConditionsReader::new("63\n");
        let b = SpectralConditions::parse(&mut r).unwrap();
        assert_eq!((b.wlinf, b.wlsup), (0.615, 0.7025));

        assert!(matches!(
            SpectralConditions::sensor(250),
            Err(SixsError::UnknownSpectralCondition(250))
        ));
        assert!(matches!(
            SpectralConditions::band(0.2, 0.5),
            Err(SixsError::WavelengthOutOfRange(_))
        ));
        let mut r = ConditionsReader::new("-2\n0.4 0.5\n");
        assert!(SpectralConditions::parse(&mut r).unwrap().step_output());
    }
}
