//! Gauss-Legendre quadratures.
//!
//! The successive-orders solver uses a zenith quadrature indexed from `-MU` to
//! `MU` (see [`sdi`]) where the slots `-MU`, 0, and `MU` are reserved for the
//! exact view and sun directions, and an azimuth quadrature over `[0, 2π]`.

use std::f64::consts::PI;
use std::sync::OnceLock;

/// Number of zenith quadrature points on each side of the horizon (plus one).
pub(crate) const MU: usize = 25;

/// Number of azimuth quadrature points.
pub(crate) const NP: usize = 49;

/// Number of nodes in the phase function quadrature.
pub(crate) const NQUAD: usize = 83;

/// Length of an array indexed from `-MU` to `MU`.
pub(crate) const NMU: usize = 2 * MU + 1;

/// Convert a signed zenith index in `-MU..=MU` to an array index.
#[inline]
pub(crate) fn sdi(j: i32) -> usize {
    (j + MU as i32) as usize
}

/// Compute the `n` nodes and weights of the Gauss-Legendre quadrature over
/// `[x1, x2]`.
///
/// Nodes are returned in increasing order and are symmetric about the middle
/// of the interval.
pub(crate) fn gauss(x1: f64, x2: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    const EPS: f64 = 3.0e-14;

    let mut x = vec![0.; n];
    let mut w = vec![0.; n];
    let m = (n + 1) / 2;
    let xm = 0.5 * (x2 + x1);
    let xl = 0.5 * (x2 - x1);

    for i in 1..=m {
        let mut z = (PI * (i as f64 - 0.25) / (n as f64 + 0.5)).cos();
        let mut pp;
        loop {
            let mut p1 = 1.0;
            let mut p2 = 0.0;
            for j in 1..=n {
                let p3 = p2;
                p2 = p1;
                p1 = ((2.0 * j as f64 - 1.0) * z * p2 - (j as f64 - 1.0) * p3) / j as f64;
            }
            pp = n as f64 * (z * p1 - p2) / (z * z - 1.0);
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() <= EPS {
                break;
            }
        }
        if z.abs() < EPS {
            z = 0.;
        }
        x[i - 1] = xm - xl * z;
        x[n - i] = xm + xl * z;
        w[i - 1] = 2.0 * xl / ((1.0 - z * z) * pp * pp);
        w[n - i] = w[i - 1];
    }

    (x, w)
}

/// Zenith and azimuth quadrature used by the successive-orders solver.
#[derive(Debug, Clone)]
pub(crate) struct Quadrature {
    /// Zenith cosines, indexed with [`sdi`]
    pub(crate) rm: [f64; NMU],
    /// Zenith weights, indexed with [`sdi`]
    pub(crate) gb: [f64; NMU],
    /// Azimuth angles in radians
    pub(crate) rp: [f64; NP],
    /// Azimuth weights
    pub(crate) gp: [f64; NP],
}

impl Quadrature {
    pub(crate) fn new() -> Self {
        let mu2 = 2 * (MU - 1);
        let (anglem, weightm) = gauss(-1., 1., mu2);

        let mut rm = [0.; NMU];
        let mut gb = [0.; NMU];
        for j in 1..MU {
            rm[sdi(-(j as i32))] = anglem[j - 1];
            gb[sdi(-(j as i32))] = weightm[j - 1];
            rm[sdi(j as i32)] = anglem[mu2 - j];
            gb[sdi(j as i32)] = weightm[mu2 - j];
        }

        let (rp_v, gp_v) = gauss(0., 2. * PI, NP);
        let mut rp = [0.; NP];
        let mut gp = [0.; NP];
        rp.copy_from_slice(&rp_v);
        gp.copy_from_slice(&gp_v);

        Self { rm, gb, rp, gp }
    }

    /// Copy of the quadrature with the reserved slots set to the given
    /// directions: `rm[-MU] = -view`, `rm[MU] = view`, `rm[0] = center`.
    pub(crate) fn oriented(&self, view: f64, center: f64) -> Self {
        let mut q = self.clone();
        q.rm[sdi(-(MU as i32))] = -view;
        q.rm[sdi(MU as i32)] = view;
        q.rm[sdi(0)] = center;
        q
    }
}

/// The 83-node quadrature over scattering-angle cosine used to tabulate phase
/// functions: 80 Gauss points plus nodes at -1, 0, and 1 with zero weight.
#[derive(Debug)]
pub(crate) struct PhaseQuadrature {
    /// Cosines of the scattering angles, increasing from -1 to 1
    pub(crate) cgaus: [f64; NQUAD],
    /// Weights (zero at -1, 0, and 1)
    pub(crate) pdgs: [f64; NQUAD],
}

impl PhaseQuadrature {
    fn new() -> Self {
        let (cosang, weight) = gauss(-1., 1., NQUAD - 3);
        let mut cgaus = [0.; NQUAD];
        let mut pdgs = [0.; NQUAD];

        cgaus[0] = -1.;
        cgaus[1..41].copy_from_slice(&cosang[..40]);
        pdgs[1..41].copy_from_slice(&weight[..40]);
        cgaus[41] = 0.;
        cgaus[42..82].copy_from_slice(&cosang[40..]);
        pdgs[42..82].copy_from_slice(&weight[40..]);
        cgaus[82] = 1.;

        Self { cgaus, pdgs }
    }
}

/// Phase function quadrature, built on first use.
pub(crate) fn phase_quadrature() -> &'static PhaseQuadrature {
    static QUAD: OnceLock<PhaseQuadrature> = OnceLock::new();
    QUAD.get_or_init(PhaseQuadrature::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn nodes_symmetric_and_weights_sum_to_interval() {
        for n in [2, 8, 24, 48, 80] {
            let (x, w) = gauss(-1., 1., n);
            for i in 0..n {
                assert_abs_diff_eq!(x[i], -x[n - 1 - i], epsilon = 1e-13);
                assert_abs_diff_eq!(w[i], w[n - 1 - i], epsilon = 1e-13);
            }
            assert_relative_eq!(w.iter().sum::<f64>(), 2.0, epsilon = 1e-12);
            assert!(x.windows(2).all(|p| p[0] < p[1]));
        }
    }

    #[test]
    fn integrates_polynomials_exactly() {
        // An n-point rule is exact up to degree 2n-1
        let (x, w) = gauss(0., 2., 5);
        let integral: f64 = x.iter().zip(&w).map(|(x, w)| w * x.powi(9)).sum();
        assert_relative_eq!(integral, 2f64.powi(10) / 10., epsilon = 1e-10);
    }

    #[test]
    fn reserved_slots_are_empty() {
        let q = Quadrature::new();
        for j in [-(MU as i32), 0, MU as i32] {
            assert_eq!(q.rm[sdi(j)], 0.);
            assert_eq!(q.gb[sdi(j)], 0.);
        }
        // Negative side holds negative cosines, mirrored on the positive side
        for j in 1..MU as i32 {
            assert!(q.rm[sdi(-j)] < 0.);
            assert_abs_diff_eq!(q.rm[sdi(-j)], -q.rm[sdi(j)], epsilon = 1e-13);
        }
        assert_relative_eq!(q.gp.iter().sum::<f64>(), 2. * PI, epsilon = 1e-12);
    }

    #[test]
    fn phase_nodes() {
        let q = phase_quadrature();
        assert_eq!(q.cgaus[0], -1.);
        assert_eq!(q.cgaus[41], 0.);
        assert_eq!(q.cgaus[82], 1.);
        assert!(q.cgaus.windows(2).all(|p| p[0] < p[1]));
        assert_relative_eq!(q.pdgs.iter().sum::<f64>(), 2.0, epsilon = 1e-12);
    }
}
