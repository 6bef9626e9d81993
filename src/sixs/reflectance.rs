//! Atmospheric reflectances, transmittances, and spherical albedos at one
//! wavelength.

use super::gauss::{sdi, Quadrature, MU};
use super::geometry::Geometry;
use super::sos::{iso, os, Betal, Column, DELTA};

/// Molecular reflectance from the semi-empirical fit of Deuzé et al. (1989)
/// to the vector successive-orders code, for a Rayleigh optical depth
/// `xtau`.
pub(crate) fn chand(xtau: f64, geom: &Geometry) -> f64 {
    const AS0: [f64; 10] = [
        0.33243832,
        -6.777104e-02,
        0.16285370,
        1.577425e-03,
        -0.30924818,
        -1.240906e-02,
        -0.10324388,
        3.241678e-02,
        0.11493334,
        -3.503695e-02,
    ];
    const AS1: [f64; 2] = [0.19666292, -5.439061e-02];
    const AS2: [f64; 2] = [0.14545937, -2.910845e-02];

    let (xmus, xmuv) = (geom.xmus, geom.xmuv);
    let phios = (180. - geom.phi).to_radians();
    let xcosf2 = phios.cos();
    let xcosf3 = (2. * phios).cos();

    let xfd = DELTA / (2. - DELTA);
    let xfd = (1. - xfd) / (1. + 2. * xfd);

    let sins = (1. - xmus * xmus).sqrt();
    let sinv = (1. - xmuv * xmuv).sqrt();
    let xph1 = 1. + (3. * xmus * xmus - 1.) * (3. * xmuv * xmuv - 1.) * xfd / 8.;
    let xph2 = -xmus * xmuv * sins * sinv * xfd * 0.75;
    let xph3 = (1. - xmus * xmus) * (1. - xmuv * xmuv) * xfd * 0.1875;

    // Single scattering
    let xitm = (1. - (-xtau * (1. / xmus + 1. / xmuv)).exp()) * xmus / (4. * (xmus + xmuv));
    // Multiple scattering correction
    let xitm2 = (1. - (-xtau / xmus).exp()) * (1. - (-xtau / xmuv).exp());

    let ln = xtau.ln();
    let sum = xmus + xmuv;
    let prod = xmus * xmuv;
    let sq = xmus * xmus + xmuv * xmuv;
    let pl = [
        1.,
        ln,
        sum,
        ln * sum,
        prod,
        ln * prod,
        sq,
        ln * sq,
        prod * prod,
        ln * prod * prod,
    ];
    let fs0: f64 = pl.iter().zip(AS0).map(|(p, a)| p * a).sum();
    let fs1 = AS1[0] + ln * AS1[1];
    let fs2 = AS2[0] + ln * AS2[1];

    let xitot1 = xph1 * xitm + xph1 * xitm2 * fs0 * xmus;
    let xitot2 = xph2 * xitm + xph2 * xitm2 * fs1 * xmus;
    let xitot3 = xph3 * xitm + xph3 * xitm2 * fs2 * xmus;

    (xitot1 + 2. * xitot2 * xcosf2 + 2. * xitot3 * xcosf3) / xmus
}

/// Intrinsic atmospheric reflectances.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Reflectances {
    /// Molecules only
    pub(crate) rorayl: f64,
    /// Molecules and aerosols
    pub(crate) romix: f64,
    /// Aerosols only
    pub(crate) roaero: f64,
}

/// Reflectances of the atmosphere for the sun and view directions of `geom`
/// and a sensor at `palt` km.
pub(crate) fn atmref(
    col: &Column,
    betal: &Betal,
    quad: &Quadrature,
    geom: &Geometry,
    iaer: i32,
    palt: f64,
) -> Reflectances {
    let view = sdi(-(MU as i32));
    let q = quad.oriented(geom.xmuv, -geom.xmus);
    let reflectance = |col: &Column| os(col, betal, &q, palt, geom.phirad)[view][0] / geom.xmus;

    let rorayl = if palt < 900. && palt > 0. {
        reflectance(&Column {
            tamoy: 0.,
            tamoyp: 0.,
            ..*col
        })
    } else if palt <= 0. {
        0.
    } else {
        chand(col.trmoy, geom)
    };

    if iaer == 0 {
        return Reflectances {
            rorayl,
            romix: rorayl,
            roaero: 0.,
        };
    }

    if palt > 0. {
        Reflectances {
            rorayl,
            romix: reflectance(col),
            roaero: reflectance(&Column {
                trmoy: 0.,
                trmoyp: 0.,
                ..*col
            }),
        }
    } else {
        Reflectances {
            rorayl,
            ..Default::default()
        }
    }
}

/// Exponential integral E1 for `0 < xtau < 1`.
fn fintexp1(xtau: f64) -> f64 {
    const A: [f64; 6] = [
        -0.57721566,
        0.99999193,
        -0.24991055,
        0.05519968,
        -0.00976004,
        0.00107857,
    ];
    let series = A
        .iter()
        .rev()
        .fold(0., |acc, a| acc * xtau + a);
    series - xtau.ln()
}

/// Exponential integral E3.
fn fintexp3(xtau: f64) -> f64 {
    ((-xtau).exp() * (1. - xtau) + xtau * xtau * fintexp1(xtau)) / 2.
}

/// Spherical albedo of a molecular layer of optical depth `xtau`.
pub(crate) fn csalbr(xtau: f64) -> f64 {
    (3. * xtau - fintexp3(xtau) * (4. + 2. * xtau) + 2. * (-xtau).exp()) / (4. + 3. * xtau)
}

/// Direct and diffuse transmittances of one atmosphere, and its spherical
/// albedo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transmittances {
    /// Downward direct
    pub(crate) ddir: f64,
    /// Downward diffuse
    pub(crate) ddif: f64,
    /// Upward direct
    pub(crate) udir: f64,
    /// Upward diffuse
    pub(crate) udif: f64,
    /// Spherical albedo
    pub(crate) sphalb: f64,
}

impl Default for Transmittances {
    fn default() -> Self {
        Self {
            ddir: 1.,
            ddif: 0.,
            udir: 1.,
            udif: 0.,
            sphalb: 0.,
        }
    }
}

/// Transmittances of the molecular, mixed, and aerosol atmospheres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Scattering {
    pub(crate) rayleigh: Transmittances,
    pub(crate) total: Transmittances,
    pub(crate) aerosol: Transmittances,
}

/// Two-stream diffuse transmittance of a molecular layer along cosine `xmu`.
fn rayleigh_diffuse(tray: f64, xmu: f64) -> f64 {
    let direct = (-tray / xmu).exp();
    ((2. / 3. + xmu) + (2. / 3. - xmu) * direct) / (4. / 3. + tray) - direct
}

/// Compute the direct and diffuse transmittances for the downward and
/// upward paths, and the spherical albedo.
///
/// `taer`, `tray` are the aerosol and molecular optical depths of the whole
/// atmosphere, `taerp`, `trayp` the ones below the sensor, and `piza` the
/// aerosol single scattering albedo.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scatra(
    taer: f64,
    taerp: f64,
    tray: f64,
    trayp: f64,
    piza: f64,
    betal: &Betal,
    quad: &Quadrature,
    geom: &Geometry,
    palt: f64,
) -> Scattering {
    let (xmus, xmuv) = (geom.xmus, geom.xmuv);
    let up = quad.oriented(xmuv, xmus);
    let down = quad.oriented(xmus, xmus);
    let mut out = Scattering::default();

    // Molecules only. A sensor on the ground keeps the clear-path defaults
    // in both directions.
    let rayleigh = &mut out.rayleigh;
    if palt > 0. {
        rayleigh.ddif = rayleigh_diffuse(tray, xmus);
        rayleigh.ddir = (-tray / xmus).exp();
        rayleigh.sphalb = csalbr(tray);
        rayleigh.udir = (-tray / xmuv).exp();
        rayleigh.udif = if palt > 900. {
            rayleigh_diffuse(tray, xmuv)
        } else {
            let col = Column {
                tamoy: 0.,
                trmoy: tray,
                pizmoy: piza,
                tamoyp: 0.,
                trmoyp: trayp,
            };
            // Diffuse part below the sensor, direct part over the column
            let xf = iso(&col, betal, &up, palt);
            xf[0] - (-trayp / xmuv).exp()
        };
    }

    // Aerosols, then the mixture
    let with_aerosol = |ta: f64, tap: f64, tr: f64, trp: f64| {
        let col = Column {
            tamoy: ta,
            trmoy: tr,
            pizmoy: piza,
            tamoyp: tap,
            trmoyp: trp,
        };
        let mut t = Transmittances::default();
        if palt > 0. {
            let xf = iso(&col, betal, &up, palt);
            t.udir = (-(tap + trp) / xmuv).exp();
            t.udif = xf[0] - t.udir;
        }
        let xf = iso(&col, betal, &down, 999.);
        t.ddir = (-(ta + tr) / xmus).exp();
        t.ddif = xf[2] - t.ddir;
        t.sphalb = xf[1] * 2.;
        t
    };
    if taer > 0. {
        out.aerosol = with_aerosol(taer, taerp, 0., 0.);
    }
    out.total = with_aerosol(taer, taerp, tray, trayp);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn isotropic() -> Betal {
        let mut betal = [0.; 81];
        betal[0] = 1.;
        betal
    }

    #[test]
    fn molecular_reflectance() {
        let geom = Geometry::new(30., 0., 25.84, 28.65, 6, 15);
        let r1 = chand(0.05, &geom);
        let r2 = chand(0.2, &geom);
        assert!(r1 > 0. && r2 > 3. * r1);
        assert!(r2 < 0.15);
    }

    #[test]
    fn chand_agrees_with_scalar_solver() {
        let geom = Geometry::new(30., 0., 25.84, 28.65, 6, 15);
        let quad = Quadrature::new();
        let col = Column {
            tamoy: 0.,
            trmoy: 0.1,
            pizmoy: 1.,
            tamoyp: 0.,
            trmoyp: 0.1,
        };
        // A sensor just below the top of the atmosphere goes through the
        // scalar solver, which keeps only the azimuth-independent term:
        // compare with the fit averaged over four azimuths 90° apart
        let scalar = atmref(&col, &isotropic(), &quad, &geom, 0, 899.);
        let fitted = atmref(&col, &isotropic(), &quad, &geom, 0, 1000.);
        let averaged = (0..4)
            .map(|k| {
                let turned = Geometry::new(30., 0., 25.84, 28.65 + 90. * k as f64, 6, 15);
                atmref(&col, &isotropic(), &quad, &turned, 0, 1000.).rorayl
            })
            .sum::<f64>()
            / 4.;
        assert_relative_eq!(scalar.rorayl, averaged, max_relative = 0.05);
        assert!(fitted.rorayl > scalar.rorayl);
        assert_eq!(fitted.romix, fitted.rorayl);
        assert_eq!(fitted.roaero, 0.);
    }

    #[test]
    fn spherical_albedo() {
        assert_abs_diff_eq!(csalbr(0.1), 0.0840, epsilon = 5e-4);
        assert!(csalbr(0.05) < csalbr(0.1));
        // E1 near the origin
        assert_relative_eq!(fintexp1(0.01), 4.0379, max_relative = 1e-4);
    }

    #[test]
    fn molecular_transmittances() {
        let geom = Geometry::new(30., 0., 0., 0., 6, 15);
        let quad = Quadrature::new();
        let s = scatra(0., 0., 0.1, 0.1, 0., &isotropic(), &quad, &geom, 1000.);
        let r = s.rayleigh;
        assert_relative_eq!(r.ddir, (-0.1 / geom.xmus).exp());
        assert!(r.ddif > 0. && r.ddir + r.ddif < 1.);
        assert_eq!(s.aerosol, Transmittances::default());
        // The mixture without aerosols is the molecular atmosphere
        assert_abs_diff_eq!(s.total.ddir + s.total.ddif, r.ddir + r.ddif, epsilon = 0.01);
        assert_abs_diff_eq!(s.total.sphalb, r.sphalb, epsilon = 0.005);
    }

    #[test]
    fn ground_sensor_has_no_upward_path() {
        let geom = Geometry::new(30., 0., 0., 0., 6, 15);
        let quad = Quadrature::new();
        let s = scatra(0.2, 0., 0.1, 0., 0.9, &isotropic(), &quad, &geom, 0.);
        for t in [s.rayleigh, s.total, s.aerosol] {
            assert_eq!((t.udir, t.udif), (1., 0.));
        }
        // Nothing is computed for the molecules, downward either
        assert_eq!(s.rayleigh, Transmittances::default());
        assert!(s.total.ddir < s.rayleigh.ddir);
        assert!(s.aerosol.sphalb > 0.);
    }

    #[test]
    fn aircraft_molecular_direct_path_spans_the_column() {
        let geom = Geometry::new(30., 0., 20., 90., 6, 15);
        let quad = Quadrature::new();
        let (tray, trayp) = (0.1, 0.06);
        let s = scatra(0., 0., tray, trayp, 0.9, &isotropic(), &quad, &geom, 3.);
        let r = s.rayleigh;
        assert_eq!(r.udir, (-tray / geom.xmuv).exp());
        assert_eq!(r.ddir, (-tray / geom.xmus).exp());
        assert_eq!(r.sphalb, csalbr(tray));

        // The diffuse part is still taken below the sensor
        let col = Column {
            tamoy: 0.,
            trmoy: tray,
            pizmoy: 0.9,
            tamoyp: 0.,
            trmoyp: trayp,
        };
        let xf = iso(&col, &isotropic(), &quad.oriented(geom.xmuv, geom.xmus), 3.);
        assert_eq!(r.udif, xf[0] - (-trayp / geom.xmuv).exp());
        // The mixture uses the depths below the sensor for both parts
        assert_relative_eq!(s.total.udir, (-trayp / geom.xmuv).exp(), max_relative = 1e-12);
    }
}
