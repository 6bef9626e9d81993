//! Optical properties of the atmosphere at the reference wavelengths.

use std::f64::consts::PI;

use log::debug;

use super::aerosol::{AerosolModel, AerosolTables, I550};
use super::altitude::Altitude;
use super::atmosphere::Profile;
use super::gauss::{gauss, Quadrature, NQUAD};
use super::geometry::Geometry;
use super::reflectance::{atmref, scatra};
use super::sos::{Betal, Column, DELTA, NBETAL};
use super::wave::SpectralConditions;
use super::WLDIS;

/// Molecular optical depth at wavelength `wl` (µm) for the pressure and
/// temperature profile.
///
/// The refractive index of air is from Edlén (1966) without water vapour.
pub(crate) fn odrayl(profile: &Profile, wl: f64) -> f64 {
    let ak = 1. / wl;
    let awl = wl.powi(4);
    let a1 = 130. - ak * ak;
    let a2 = 38.9 - ak * ak;
    let an = (8342.13 + 2406030. / a1 + 15997. / a2) * 1.0e-08 + 1.;
    let an2 = an * an;
    let a = (24. * PI.powi(3)) * (an2 - 1.).powi(2) * (6. + 3. * DELTA)
        / (6. - 7. * DELTA)
        / (an2 + 2.).powi(2);

    let (z, p, t) = (&profile.z, &profile.p, &profile.t);
    (0..z.len() - 1)
        .map(|k| {
            let dppt = (288.15 / 1013.25) * (p[k] / t[k] + p[k + 1] / t[k + 1]) / 2.;
            let sr = a * dppt / awl / 0.0254743;
            (z[k + 1] - z[k]) * sr
        })
        .sum()
}

/// Legendre decomposition of a truncated phase function.
#[derive(Debug, Clone)]
pub(crate) struct Truncation {
    /// Fraction of the phase function removed by the truncation
    pub(crate) coeff: f64,
    /// Normalized Legendre coefficients of the truncated phase function
    pub(crate) betal: Betal,
}

impl Truncation {
    /// No aerosol: an isotropic phase function that nothing scatters with.
    pub(crate) fn none() -> Self {
        let mut betal = [0.; NBETAL + 1];
        betal[0] = 1.;
        Self { coeff: 0., betal }
    }

    /// Decompose the phase function `pha`, given at the 83 phase quadrature
    /// nodes, into Legendre polynomials up to degree 80.
    ///
    /// The forward peak beyond a scattering angle cosine of 0.94 is replaced
    /// by a log-linear extrapolation (in the angle) of the values between 0.8
    /// and 0.94, and the truncation coefficient is the fraction of the phase
    /// function lost that way.
    pub(crate) fn new(pha: &[f64]) -> Self {
        let (cosang, weight) = gauss(-1., 1., NQUAD - 3);
        let mut rmu = [0.; NQUAD];
        let mut ga = [0.; NQUAD];
        rmu[0] = -1.;
        rmu[1..41].copy_from_slice(&cosang[..40]);
        ga[1..41].copy_from_slice(&weight[..40]);
        rmu[42..82].copy_from_slice(&cosang[40..]);
        ga[42..82].copy_from_slice(&weight[40..]);
        rmu[82] = 1.;

        // Node just before the last one below the threshold
        let below = |x: f64| {
            rmu.iter()
                .position(|&r| r > x)
                .map_or(NQUAD - 2, |i| i.saturating_sub(2))
        };
        let k = below(0.8);
        let kk = below(0.94);

        let mut ptemp = [0.; NQUAD];
        ptemp.copy_from_slice(&pha[..NQUAD]);
        let x1 = pha[kk].log10();
        let x2 = rmu[kk].acos();
        let aa = (x1 - pha[k].log10()) / (x2 - rmu[k].acos());
        for (p, r) in ptemp.iter_mut().zip(&rmu).skip(kk + 1) {
            *p = 10f64.powf(x1 + aa * (r.min(1.).acos() - x2));
        }

        let mut betal = [0.; NBETAL + 1];
        for (i, &rm) in rmu.iter().enumerate() {
            let x = ptemp[i] * ga[i];
            let (mut pm1, mut p0) = (0., 1.);
            for (k, b) in betal.iter_mut().enumerate() {
                *b += x * p0;
                let kf = k as f64;
                let p1 = ((2. * kf + 1.) * rm * p0 - kf * pm1) / (kf + 1.);
                pm1 = p0;
                p0 = p1;
            }
        }
        for (i, b) in betal.iter_mut().enumerate() {
            *b *= (2. * i as f64 + 1.) * 0.5;
        }
        let z1 = betal[0];
        betal.iter_mut().for_each(|b| *b /= z1);
        if betal[NBETAL] < 0. {
            betal[NBETAL] = 0.;
        }

        Self {
            coeff: 1. - z1,
            betal,
        }
    }
}

/// Rows of the reflectance table.
pub(crate) const RAYLEIGH: usize = 0;
/// Row of the mixed atmosphere in the reflectance table, and of the total
/// atmosphere in the transmittance tables.
pub(crate) const MIXED: usize = 1;
pub(crate) const AEROSOL: usize = 2;

/// Optical properties of the atmosphere at the reference wavelengths.
///
/// Rows are molecules, mixture, and aerosols, in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DiscreteTables {
    /// Molecular optical depth
    pub(crate) trayl: [f64; 10],
    /// Molecular optical depth below the sensor
    pub(crate) traypl: [f64; 10],
    /// Intrinsic atmospheric reflectance
    pub(crate) roatm: [[f64; 10]; 3],
    /// Downward direct transmittance
    pub(crate) dtdir: [[f64; 10]; 3],
    /// Downward diffuse transmittance
    pub(crate) dtdif: [[f64; 10]; 3],
    /// Upward direct transmittance
    pub(crate) utdir: [[f64; 10]; 3],
    /// Upward diffuse transmittance
    pub(crate) utdif: [[f64; 10]; 3],
    /// Spherical albedo
    pub(crate) sphal: [[f64; 10]; 3],
}

/// Whether the reference wavelength `i` is needed to interpolate within the
/// band `[wlinf, wlsup]`.
fn brackets(i: usize, wlinf: f64, wlsup: f64) -> bool {
    if (i < 2 && wlsup < WLDIS[0]) || (wlinf > WLDIS[9] && i >= 8) {
        return true;
    }
    let below = i < 9 && WLDIS[i] < wlinf && WLDIS[i + 1] < wlinf;
    let above = i > 0 && WLDIS[i] > wlsup && WLDIS[i - 1] > wlsup;
    !(below || above)
}

/// Aerosol optical depth at reference wavelength `i` for an optical depth
/// `taer55` at 550 nm.
fn aerosol_depth(tables: &AerosolTables, iaer: i32, taer55: f64, i: usize) -> f64 {
    if iaer == 0 {
        0.
    } else {
        taer55 * tables.ext[i] / tables.ext[I550]
    }
}

/// Compute the optical properties of the atmosphere at the reference
/// wavelengths that bracket the band.
pub(crate) fn discom(
    geom: &Geometry,
    profile: &Profile,
    aero: &AerosolModel,
    taer55: f64,
    alt: &Altitude,
    spectral: &SpectralConditions,
) -> DiscreteTables {
    let quad = Quadrature::new();
    let tables = &aero.tables;
    let mut disc = DiscreteTables::default();

    for (i, &wl) in WLDIS.iter().enumerate() {
        if !brackets(i, spectral.wlinf, spectral.wlsup) {
            continue;
        }

        let tray = odrayl(profile, wl);
        let trayp = match alt.idatmp {
            0 => 0.,
            4 => tray,
            _ => tray * alt.ftray,
        };
        disc.trayl[i] = tray;
        disc.traypl[i] = trayp;

        let taer = aerosol_depth(tables, aero.iaer, taer55, i);
        let taerp = aerosol_depth(tables, aero.iaer, alt.taer55p, i);
        let piza = tables.ome[i];

        let trunc = if aero.iaer != 0 {
            Truncation::new(&tables.phasel.row(i).to_vec())
        } else {
            Truncation::none()
        };
        let coeff = trunc.coeff;

        let col = Column {
            tamoy: taer * (1. - piza * coeff),
            trmoy: tray,
            pizmoy: if aero.iaer != 0 {
                piza * (1. - coeff) / (1. - piza * coeff)
            } else {
                0.
            },
            tamoyp: taerp * (1. - piza * coeff),
            trmoyp: trayp,
        };

        let refl = atmref(&col, &trunc.betal, &quad, geom, aero.iaer, alt.palt);
        let scat = scatra(
            col.tamoy,
            col.tamoyp,
            tray,
            trayp,
            col.pizmoy,
            &trunc.betal,
            &quad,
            geom,
            alt.palt,
        );
        debug!(
            "{wl:.3} µm: tray {tray:.5} taer {taer:.5} rorayl {:.5} romix {:.5}",
            refl.rorayl, refl.romix
        );

        disc.roatm[RAYLEIGH][i] = refl.rorayl;
        disc.roatm[MIXED][i] = refl.romix;
        disc.roatm[AEROSOL][i] = refl.roaero;
        for (row, t) in [(RAYLEIGH, scat.rayleigh), (MIXED, scat.total), (AEROSOL, scat.aerosol)] {
            disc.dtdir[row][i] = t.ddir;
            disc.dtdif[row][i] = t.ddif;
            disc.utdir[row][i] = t.udir;
            disc.utdif[row][i] = t.udif;
            disc.sphal[row][i] = t.sphalb;
        }
    }
    disc
}

/// Reference wavelengths `(linf, lsup)` bracketing `wl`, and the log of
/// their ratio.
pub(crate) fn bracket(wl: f64) -> (usize, usize, f64) {
    let mut linf = (0..9)
        .filter(|&i| wl >= WLDIS[i] && wl <= WLDIS[i + 1])
        .last()
        .unwrap_or(0);
    if wl > WLDIS[9] {
        linf = 8;
    }
    let lsup = linf + 1;
    (linf, lsup, (WLDIS[lsup] / WLDIS[linf]).ln())
}

/// Power-law interpolation between two reference wavelengths.
pub(crate) fn power_law(wl: f64, linf: usize, coef: f64, yinf: f64, ysup: f64) -> f64 {
    let alpha = (ysup / yinf).ln() / coef;
    let beta = yinf / WLDIS[linf].powf(alpha);
    beta * wl.powf(alpha)
}

/// Truncated aerosol optical depths and single scattering albedo at one
/// wavelength.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EquivalentOptics {
    /// Aerosol optical depth of the whole atmosphere
    pub tamoy: f64,
    /// Aerosol optical depth below the sensor
    pub tamoyp: f64,
    /// Single scattering albedo
    pub pizmoy: f64,
    /// Single scattering albedo below the sensor, not truncated
    pub pizmoyp: f64,
}

/// Aerosol optical properties at wavelength `wl`, interpolated from the
/// reference wavelengths and corrected for the truncation of the phase
/// function.
pub(crate) fn specinterp(
    wl: f64,
    tables: &AerosolTables,
    taer55: f64,
    taer55p: f64,
) -> EquivalentOptics {
    let (linf, lsup, coef) = bracket(wl);
    let (ext, ome) = (&tables.ext, &tables.ome);

    let tsca = taer55
        * power_law(wl, linf, coef, ext[linf] * ome[linf], ext[lsup] * ome[lsup])
        / ext[I550];
    let ext_wl = power_law(wl, linf, coef, ext[linf], ext[lsup]);
    let tamoy = taer55 * ext_wl / ext[I550];
    let tamoyp = taer55p * ext_wl / ext[I550];
    let pizmoy = tsca / tamoy;

    let phasel = &tables.phasel;
    let pha: Vec<f64> = (0..NQUAD)
        .map(|k| power_law(wl, linf, coef, phasel[[linf, k]], phasel[[lsup, k]]))
        .collect();
    let coeff = Truncation::new(&pha).coeff;

    EquivalentOptics {
        tamoy: tamoy * (1. - pizmoy * coeff),
        tamoyp: tamoyp * (1. - pizmoy * coeff),
        pizmoy: pizmoy * (1. - coeff) / (1. - pizmoy * coeff),
        // Kept without the truncation correction
        pizmoyp: pizmoy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sixs::atmosphere::Atmosphere;
    use crate::sixs::gauss::phase_quadrature;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn rayleigh_depth() {
        let atms = Atmosphere::standard(6).unwrap();
        let t: Vec<f64> = WLDIS.iter().map(|&wl| odrayl(&atms.profile, wl)).collect();
        assert!(t.windows(2).all(|w| w[0] > w[1]));
        assert_abs_diff_eq!(odrayl(&atms.profile, 0.55), 0.097, epsilon = 0.003);
        // Close to the λ⁻⁴ law
        let ratio = odrayl(&atms.profile, 0.4) / odrayl(&atms.profile, 0.8);
        assert!(ratio > 16. && ratio < 18.);
    }

    #[test]
    fn isotropic_phase_is_not_truncated() {
        let t = Truncation::new(&[1.; NQUAD]);
        assert_abs_diff_eq!(t.coeff, 0., epsilon = 1e-10);
        assert_relative_eq!(t.betal[0], 1.);
        assert!(t.betal[1..].iter().all(|b| b.abs() < 1e-10));
    }

    #[test]
    fn forward_peak_is_truncated() {
        let g: f64 = 0.7;
        let pha: Vec<f64> = phase_quadrature()
            .cgaus
            .iter()
            .map(|c| (1. - g * g) / (1. + g * g - 2. * g * c).powf(1.5))
            .collect();
        let t = Truncation::new(&pha);
        assert!(t.coeff > 0. && t.coeff < 0.3);
        // The first moment of the truncated function is below the asymmetry
        assert!(t.betal[1] / 3. < g);
        assert!(t.betal[NBETAL] >= 0.);
    }

    #[test]
    fn bracketing() {
        assert_eq!(bracket(0.3).0, 0);
        assert_eq!(bracket(0.6), (3, 4, (0.633f64 / 0.55).ln()));
        assert_eq!(bracket(3.9).0, 8);
        // A red band needs 0.55, 0.633 and 0.694 µm
        let needed: Vec<usize> = (0..10).filter(|&i| brackets(i, 0.62, 0.67)).collect();
        assert_eq!(needed, vec![3, 4, 5]);
        assert!(brackets(0, 0.3, 0.35) && brackets(1, 0.3, 0.35));
        assert!(brackets(9, 3.8, 3.9) && brackets(8, 3.8, 3.9));
    }

    #[test]
    fn power_law_hits_nodes() {
        let (linf, lsup, coef) = bracket(0.6);
        assert_relative_eq!(power_law(WLDIS[linf], linf, coef, 2., 1.), 2., epsilon = 1e-12);
        assert_relative_eq!(power_law(WLDIS[lsup], linf, coef, 2., 1.), 1., epsilon = 1e-12);
    }

    #[test]
    fn equivalent_optics() {
        let aero = AerosolModel::continental(0.5);
        let e = specinterp(0.55, &aero.tables, 0.23, 0.);
        assert!(e.tamoy < 0.23 && e.tamoy > 0.1);
        assert!(e.pizmoy > 0.8 && e.pizmoy < 1.);
        assert_eq!(e.tamoyp, 0.);

        // Below the sensor the albedo is the tabulated one
        let ome = aero.tables.ome[I550];
        assert_relative_eq!(e.pizmoyp, ome, max_relative = 1e-12);
        assert!(e.pizmoy < e.pizmoyp);
        let coeff = (ome - e.pizmoy) / (ome * (1. - e.pizmoy));
        assert!(coeff > 0. && coeff < 0.3);
        assert_relative_eq!(e.tamoy, 0.23 * (1. - ome * coeff), max_relative = 1e-9);
    }
}
