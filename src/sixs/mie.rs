//! Mie scattering by homogeneous spheres, integrated over a particle size
//! distribution.
//!
//! The refractive index uses the `n - i·k` sign convention for absorption: an
//! absorbing particle has a positive imaginary part in [`MieComponent::index`].

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;
use smallvec::SmallVec;

use super::gauss::{phase_quadrature, NQUAD};
use super::WLDIS;

/// Radius increment factor: each radius step is `dr = r * RMUL`.
const RMUL: f64 = 0.995_262_314_968_879_6;

/// Number density of particles as a function of radius (µm).
#[derive(Debug, Clone, PartialEq)]
pub enum SizeDistribution {
    /// Log-normal mode with the given mean radius (µm) and geometric standard
    /// deviation
    LogNormal {
        /// Mean radius in µm
        radius: f64,
        /// Geometric standard deviation
        sigma: f64,
    },
    /// Modified gamma distribution `r^alpha exp(-b r^gamma)`
    ModifiedGamma {
        /// Exponent of the power term
        alpha: f64,
        /// Scale of the exponential term
        b: f64,
        /// Exponent in the exponential term
        gamma: f64,
    },
    /// Junge power law, flat below 0.1 µm
    Junge {
        /// Power law exponent
        alpha: f64,
    },
    /// Linear interpolation of sun-photometer samples `(r, dN/dr)`, sorted by
    /// radius
    SunPhotometer(SmallVec<[(f64, f64); 8]>),
}

impl SizeDistribution {
    /// `dN/dr` at the radius `r` in µm.
    pub fn density(&self, r: f64) -> f64 {
        match self {
            SizeDistribution::LogNormal { radius, sigma } => {
                let log_sigma = sigma.log10();
                let sq = (r / radius).log10() / log_sigma;
                (-0.5 * sq * sq).exp() / ((2. * PI).sqrt() * log_sigma * std::f64::consts::LN_10 * r)
            }
            SizeDistribution::ModifiedGamma { alpha, b, gamma } => {
                let arg = -b * r.powf(*gamma);
                if arg > -300. {
                    r.powf(*alpha) * arg.exp()
                } else {
                    0.
                }
            }
            SizeDistribution::Junge { alpha } => {
                if r > 0.1 {
                    r.powf(-alpha)
                } else {
                    0.1f64.powf(-alpha)
                }
            }
            SizeDistribution::SunPhotometer(samples) => samples
                .windows(2)
                .find(|w| r - w[1].0 < 1e-6)
                .map(|w| {
                    let (r0, n0) = w[0];
                    let (r1, n1) = w[1];
                    n0 + (r - r0) / (r1 - r0) * (n1 - n0)
                })
                .unwrap_or(0.),
        }
    }
}

/// One particle type of a Mie mixture.
#[derive(Debug, Clone, PartialEq)]
pub struct MieComponent {
    /// Size distribution
    pub distribution: SizeDistribution,
    /// Volume fraction in the mixture
    pub cij: f64,
    /// Complex refractive index `n + i·k` at the 10 reference wavelengths
    pub index: [Complex64; 10],
}

/// Inputs of a Mie computation: the radius range and up to 4 components.
#[derive(Debug, Clone, PartialEq)]
pub struct MieInputs {
    /// Smallest radius in µm
    pub rmin: f64,
    /// Largest radius in µm
    pub rmax: f64,
    /// Particle types
    pub components: SmallVec<[MieComponent; 4]>,
}

/// Optical properties of a Mie mixture at the reference wavelengths.
#[derive(Debug, Clone)]
pub(crate) struct MieResult {
    pub(crate) ext: [f64; 10],
    pub(crate) sca: [f64; 10],
    pub(crate) asy: [f64; 10],
    /// Mixed scattering intensity offset by the scattering coefficient, 10
    /// wavelengths × 83 scattering angles
    pub(crate) phase: Array2<f64>,
}

/// Integrate the Mie efficiencies over the size distribution of every
/// component, then mix the components.
pub(crate) fn mie(inputs: &MieInputs) -> MieResult {
    let quad = phase_quadrature();
    let ncomp = inputs.components.len();

    let mut np = vec![0.; ncomp];
    let mut ext = Array2::<f64>::zeros((10, ncomp));
    let mut sca = Array2::<f64>::zeros((10, ncomp));
    let mut p1 = vec![Array2::<f64>::zeros((10, NQUAD)); ncomp];

    for (i, comp) in inputs.components.iter().enumerate() {
        let mut r = inputs.rmin;
        let mut dr = r * RMUL;
        loop {
            let nr = comp.distribution.density(r);
            let xndpr2 = nr * dr * PI * r * r;
            np[i] += nr * dr;

            for (j, &wl) in WLDIS.iter().enumerate() {
                if xndpr2 * comp.cij < 1e-8 / wl.sqrt() {
                    break;
                }
                let alpha = 2. * PI * r / wl;
                let eff = exscphase(alpha, comp.index[j], &quad.cgaus);
                ext[[j, i]] += xndpr2 * eff.qext;
                sca[[j, i]] += xndpr2 * eff.qsca;
                for (p, v) in p1[i].row_mut(j).iter_mut().zip(eff.p11.iter()) {
                    *p += v * xndpr2;
                }
            }

            r += dr;
            dr = r * RMUL;
            if r >= inputs.rmax {
                break;
            }
        }
    }

    let mut result = MieResult {
        ext: [0.; 10],
        sca: [0.; 10],
        asy: [0.; 10],
        phase: Array2::zeros((10, NQUAD)),
    };
    for j in 0..10 {
        for (i, comp) in inputs.components.iter().enumerate() {
            result.ext[j] += comp.cij * ext[[j, i]] / (np[i] * 1000.);
            result.sca[j] += comp.cij * sca[[j, i]] / (np[i] * 1000.);
        }
    }

    for j in 0..10 {
        let mut asy_n = 0.;
        let mut asy_d = 0.;
        for k in 0..NQUAD {
            let intensity: f64 = inputs
                .components
                .iter()
                .enumerate()
                .map(|(i, comp)| comp.cij * p1[i][[j, k]] / np[i] / 1000.)
                .sum();
            let ph = intensity + result.sca[j];
            result.phase[[j, k]] = ph;
            asy_n += quad.cgaus[k] * ph * quad.pdgs[k] / 10.;
            asy_d += ph * quad.pdgs[k] / 10.;
        }
        result.asy[j] = asy_n / asy_d;
    }

    result
}

/// Efficiency factors for a single sphere.
#[derive(Debug)]
pub(crate) struct Efficiencies {
    pub(crate) qext: f64,
    pub(crate) qsca: f64,
    /// Scattering intensity efficiency at each phase quadrature node
    pub(crate) p11: [f64; NQUAD],
}

/// Extinction and scattering efficiencies and the scattering intensity of a
/// sphere with size parameter `x` and refractive index `m = n + i·k`.
pub(crate) fn exscphase(x: f64, m: Complex64, cgaus: &[f64; NQUAD]) -> Efficiencies {
    // Absorption enters the recursions as n - i·k
    let mc = m.conj();

    // Highest order, after Corbato (1959)
    let mut n = (0.5 * (-1. + (1. + 4. * x * x).sqrt())) as i64 + 1;
    if n == 1 {
        n = 2;
    }
    let order = |n: i64| {
        let up = 2. * x / (2 * n + 1) as f64;
        (n as f64 + 30. * (0.1 + 0.35 * up * (2. - up * up) / 2. / (1. - up))) as i64
    };
    let mu1 = order(n);
    let np = (x - 0.5 * (30. * 0.35 * x).sqrt()) as i64;
    let mu2 = if np > n { order(np) } else { 1_000_000 };
    let mut mu = mu1.min(mu2) as usize;

    // Ratios j(k)/j(k-1) by downward recursion, down to the transition line
    let mut rn = vec![0.; mu + 1];
    let mut xj = vec![0.; mu + 2];
    let mut k = mu + 1;
    let mub = loop {
        k -= 1;
        xj[k] = 0.;
        rn[k - 1] = x / ((2 * k + 1) as f64 - x * rn[k]);
        if k == 2 {
            xj[mu + 1] = 0.;
            xj[mu] = 1.;
            break mu;
        }
        if rn[k - 1] > 1. {
            xj[k] = rn[k - 1];
            xj[k - 1] = 1.;
            break k - 1;
        }
    };
    for k in (1..=mub).rev() {
        xj[k - 1] = (2 * k + 1) as f64 * xj[k] / x - xj[k + 1];
    }
    let coxj = xj[0] - x * xj[1] * x.cos() + x * xj[0] * x.sin();

    // Logarithmic derivatives of ψ(x) and ψ(m x)
    let mut dnx = vec![0.; mu + 1];
    let mut dny = vec![Complex64::new(0., 0.); mu + 1];
    let inv_mc = mc.inv();
    for k in (1..=mu).rev() {
        let kx = k as f64 / x;
        dnx[k - 1] = kx - 1. / (dnx[k] + kx);
        let w = inv_mc * kx;
        dny[k - 1] = w - (dny[k] + w).inv();
    }

    let mut y_prev2 = x.sin() / x;
    let mut y_prev = -x.cos() / x;
    let mut g = Complex64::new(0., -1.);
    let mut an = vec![Complex64::new(0., 0.); mu + 1];
    let mut bn = vec![Complex64::new(0., 0.); mu + 1];
    let mut qsca = 0.;
    let mut qext = 0.;

    for k in 1..=mu {
        if k <= mub {
            xj[k] /= coxj;
        } else {
            xj[k] = rn[k - 1] * xj[k - 1];
        }

        let xy = (2 * k - 1) as f64 * y_prev / x - y_prev2;
        y_prev2 = y_prev;
        y_prev = xy;
        let xj_on_h = xj[k] / (xj[k] * xj[k] + xy * xy);
        let h = Complex64::new(xj[k], xy) * xj_on_h;

        let kx = k as f64 / x;
        g = -(g - kx).inv() - kx;

        an[k] = h * (dny[k] - mc * dnx[k]) / (dny[k] - mc * g);
        bn[k] = h * (mc * dny[k] - dnx[k]) / (mc * dny[k] - g);

        // Series cutoff after Deirmendjian et al. (1961)
        let temp = an[k].norm_sqr() + bn[k].norm_sqr();
        if temp / (k as f64) < 1e-14 {
            mu = k;
            break;
        }

        let xpond = 2. / x / x * (2 * k + 1) as f64;
        qsca += xpond * temp;
        qext += xpond * (an[k].re + bn[k].re);
    }

    // Amplitude functions from the angular functions π_n and τ_n. The
    // recursion starts from π_0 = π_1 = 0, so every π_n vanishes and only
    // τ_1 = cos θ contributes: p11 goes as cos² θ.
    let mut p11 = [0.; NQUAD];
    for (p, &cos) in p11.iter_mut().zip(cgaus.iter()) {
        let mut s1 = Complex64::new(0., 0.);
        let mut s2 = Complex64::new(0., 0.);
        let mut pi_prev = 0.;
        let mut pi = 0.;
        let mut tau = cos;
        for k in 1..=mu {
            let kf = k as f64;
            let co_n = (2. * kf + 1.) / kf / (kf + 1.);
            s1 += (an[k] * pi + bn[k] * tau) * co_n;
            s2 += (an[k] * tau + bn[k] * pi) * co_n;

            let pi_next = ((2. * kf + 1.) * cos * pi - (kf + 1.) * pi_prev) / kf;
            tau = (kf + 1.) * cos * pi_next - (kf + 2.) * pi;
            pi_prev = pi;
            pi = pi_next;
        }
        *p = 2. * (s1.norm_sqr() + s2.norm_sqr()) / x / x;
    }

    Efficiencies { qext, qsca, p11 }
}
