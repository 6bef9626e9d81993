//! Environment functions for a non-uniform ground.
//!
//! The functions give the fraction of the diffuse upward radiance that comes
//! from within a radius `r` of the target. They are fits made for a nadir
//! view, tabulated against the sensor altitude, then corrected for the view
//! zenith angle.

/// Sensor altitudes of the tables (km).
const ALT: [f64; 16] = [
    0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 60.0,
];

const CFR1: [f64; 16] = [
    0.730, 0.710, 0.656, 0.606, 0.560, 0.516, 0.473, 0.433, 0.395, 0.323, 0.258, 0.209, 0.171,
    0.142, 0.122, 0.070,
];

const CFR2: [f64; 16] = [
    2.8, 1.51, 0.845, 0.634, 0.524, 0.465, 0.429, 0.405, 0.390, 0.386, 0.409, 0.445, 0.488, 0.545,
    0.608, 0.868,
];

const CFA1: [f64; 16] = [
    0.239, 0.396, 0.588, 0.626, 0.612, 0.505, 0.454, 0.448, 0.444, 0.445, 0.444, 0.448, 0.448,
    0.448, 0.448, 0.448,
];

const CFA2: [f64; 16] = [
    1.40, 1.20, 1.02, 0.86, 0.74, 0.56, 0.46, 0.42, 0.38, 0.34, 0.3, 0.28, 0.27, 0.27, 0.27, 0.27,
];

const CFA3: [f64; 16] = [
    9.17, 6.26, 5.48, 5.16, 4.74, 3.65, 3.24, 3.15, 3.07, 2.97, 2.88, 2.83, 2.83, 2.83, 2.83, 2.83,
];

// View angle correction
const A0: f64 = 1.3347;
const B0: f64 = 0.57757;
const A1: f64 = -1.479;
const B1: f64 = -1.5275;

/// Environment functions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    /// Molecular environment function
    pub fra: f64,
    /// Aerosol environment function
    pub fae: f64,
    /// Mean environment function, weighted by the diffuse transmittances
    pub fr: f64,
}

/// Nadir environment functions `(fra0, fae0)` for a sensor at `palt` km and
/// a radius `r` km.
fn nadir(r: f64, palt: f64) -> (f64, f64) {
    if palt >= 60. {
        let fra0 = 1. - 0.930 * (-r * 0.080).exp() - 0.070 * (-r * 1.100).exp();
        let fae0 = 1. - 0.448 * (-r * 0.27).exp() - 0.552 * (-r * 2.83).exp();
        return (fra0, fae0);
    }

    let i = ALT.iter().position(|&a| palt < a).unwrap_or(ALT.len() - 1);
    let coef = |table: &[f64; 16]| {
        if i == 0 {
            table[0]
        } else {
            let (zmin, zmax) = (ALT[i - 1], ALT[i]);
            table[i - 1] + (table[i] - table[i - 1]) * (palt - zmin) / (zmax - zmin)
        }
    };
    let (cfr1, cfr2) = (coef(&CFR1), coef(&CFR2));
    let (cfa1, cfa2, cfa3) = (coef(&CFA1), coef(&CFA2), coef(&CFA3));

    let fra0 = 1. - cfr1 * (-r * cfr2).exp() - (1. - cfr1) * (-r * 0.08).exp();
    let fae0 = 1. - cfa1 * (-r * cfa2).exp() - (1. - cfa1) * (-r * cfa3).exp();
    (fra0, fae0)
}

/// Environment functions for the diffuse upward transmittances `difr`
/// (molecules) and `difa` (aerosols), a radius `r` km around the target, a
/// sensor at `palt` km and a view zenith cosine `xmuv`.
pub(crate) fn enviro(difr: f64, difa: f64, r: f64, palt: f64, xmuv: f64) -> Environment {
    let (fra0, fae0) = nadir(r, palt);

    let xlnv = xmuv.ln();
    let xlnv2 = xlnv * xlnv;
    let fra = fra0 * (xlnv * (1. - fra0) + 1.);
    let fae = fae0
        * ((1. + A0 * xlnv + B0 * xlnv2)
            + fae0 * (A1 * xlnv + B1 * xlnv2)
            + fae0 * fae0 * ((-A1 - A0) * xlnv + (-B1 - B0) * xlnv2));

    let fr = if difa + difr > 1e-3 {
        (fae * difa + fra * difr) / (difa + difr)
    } else {
        1.
    };
    Environment { fra, fae, fr }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn nadir_satellite() {
        let e = enviro(0.1, 0.1, 1., 1000., 1.);
        assert_relative_eq!(e.fra, 1. - 0.930 * (-0.08f64).exp() - 0.070 * (-1.1f64).exp());
        assert_relative_eq!(e.fae, 1. - 0.448 * (-0.27f64).exp() - 0.552 * (-2.83f64).exp());
        assert_relative_eq!(e.fr, 0.5 * (e.fra + e.fae));
    }

    #[test]
    fn grows_with_radius() {
        let small = enviro(0.1, 0.2, 0.5, 1000., 0.9);
        let large = enviro(0.1, 0.2, 5., 1000., 0.9);
        assert!(large.fra > small.fra);
        assert!(large.fae > small.fae);
        assert!(small.fr > 0. && large.fr < 1.);
    }

    #[test]
    fn table_nodes() {
        // On a node the coefficients are the tabulated ones
        let (fra0, fae0) = nadir(1., 2.);
        assert_relative_eq!(
            fra0,
            1. - 0.656 * (-0.845f64).exp() - 0.344 * (-0.08f64).exp(),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            fae0,
            1. - 0.588 * (-1.02f64).exp() - 0.412 * (-5.48f64).exp(),
            max_relative = 1e-12
        );
        // Below the first level, the first coefficients are used
        assert_eq!(nadir(1., 0.2), nadir(1., 0.));
    }

    #[test]
    fn no_diffuse_light() {
        assert_abs_diff_eq!(enviro(0., 0., 0.5, 1000., 0.8).fr, 1.);
    }
}
