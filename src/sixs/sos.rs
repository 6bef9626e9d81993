//! Successive orders of scattering.
//!
//! The atmosphere is split into up to [`NT`] sub-layers of equal optical
//! thickness. The diffuse field is expanded in Fourier series of the azimuth
//! and, for each term, the scattering orders are summed until they converge or
//! until a geometric series can stand in for the remaining ones.

use log::warn;

use super::gauss::{sdi, Quadrature, MU, NMU, NP};

/// Number of sub-layers of the atmosphere.
pub(crate) const NT: usize = 26;

/// Capacity of the layer arrays.
const NLAYER: usize = 31;

/// Highest order of the Legendre expansion of the phase function.
pub(crate) const NBETAL: usize = 80;

/// Depolarization factor of air.
pub(crate) const DELTA: f64 = 0.0279;

/// Rayleigh scale height (km).
const HR: f64 = 8.;

/// Optical depth below which a constituent is ignored in the layering.
const ACCU2: f64 = 1e-3;

const ACCU: f64 = 1e-20;

/// Maximum number of scattering orders.
const MAX_ORDER: usize = 20;

const MAX_BISECTION: usize = 100;
const MAX_REFINE: usize = 50;

/// Legendre coefficients of the truncated aerosol phase function.
pub(crate) type Betal = [f64; NBETAL + 1];

type Field = [[f64; NMU]; NLAYER];

/// Altitude (km) at which the optical depth counted from the top of the
/// atmosphere reaches the next layer boundary.
///
/// `ta`, `ha` are the aerosol optical depth and scale height, `tr`, `hr` the
/// Rayleigh ones; `yy` and `dd` are the optical depth and Rayleigh fraction
/// of the previous boundary. The bisection searches between `ppp1` and `ppp2`
/// km and the step is halved until the Rayleigh fraction of the new layer
/// stays within 75 % of the previous one.
#[allow(clippy::too_many_arguments)]
pub(crate) fn discre(
    ta: f64,
    ha: f64,
    tr: f64,
    hr: f64,
    it: usize,
    nt: usize,
    yy: f64,
    dd: f64,
    ppp2: f64,
    ppp1: f64,
) -> f64 {
    if ha >= 7. {
        warn!("Check aerosol measurements or plane altitude");
        return 0.;
    }

    let mut dt = if it == 0 {
        1e-17
    } else {
        2. * (ta + tr - yy) / (nt - it + 1) as f64
    };

    let mut zx = 0.;
    for _ in 0..MAX_REFINE {
        dt /= 2.;
        let ti = yy + dt;
        let (mut y1, mut y3) = (ppp2, ppp1);
        let mut y2 = 0.5 * (y1 + y3);
        for _ in 0..MAX_BISECTION {
            y2 = 0.5 * (y1 + y3);
            let xx = -y2 / ha;
            let x2 = if xx < -18. {
                tr * (-y2 / hr).exp()
            } else {
                ta * xx.exp() + tr * (-y2 / hr).exp()
            };
            if (ti - x2).abs() < 1e-5 {
                break;
            }
            if ti - x2 < 0. {
                y3 = y2;
            } else {
                y1 = y2;
            }
        }
        zx = y2;

        let delta =
            1. / (1. + ta * hr / tr / ha * ((zx - ppp1) * (1. / hr - 1. / ha)).exp());
        let ecart = if dd != 0. {
            ((dd - delta) / dd).abs()
        } else {
            0.
        };
        if ecart <= 0.75 || it == 0 {
            break;
        }
    }
    zx
}

/// Generalized Legendre functions of order `is` at the quadrature cosines,
/// and the phase matrix kernel built from them.
struct Kernel {
    /// Second-degree function, used by the Rayleigh phase function
    xpl: [f64; NMU],
    /// `bp[j][k]`: aerosol phase kernel between directions `j >= 0` and `k`
    bp: [[f64; NMU]; MU + 1],
}

fn tiny(x: f64) -> f64 {
    if x.abs() < 1e-30 {
        0.
    } else {
        x
    }
}

impl Kernel {
    fn new(is: usize, rm: &[f64; NMU], betal: &Betal) -> Self {
        // psl[l + 1] holds degree l, for l in -1..=80
        let mut psl = [[0.; NMU]; NBETAL + 2];
        let mu = MU as i32;

        match is {
            0 => {
                for j in 0..=mu {
                    let r = rm[sdi(j)];
                    psl[1][sdi(-j)] = 1.;
                    psl[1][sdi(j)] = 1.;
                    psl[2][sdi(j)] = r;
                    psl[2][sdi(-j)] = -r;
                    let xdb = tiny((3. * r * r - 1.) * 0.5);
                    psl[3][sdi(-j)] = xdb;
                    psl[3][sdi(j)] = xdb;
                }
                psl[2][sdi(0)] = rm[sdi(0)];
            }
            1 => {
                let rac3 = 3f64.sqrt();
                for j in 0..=mu {
                    let r = rm[sdi(j)];
                    let x = 1. - r * r;
                    psl[1][sdi(j)] = 0.;
                    psl[1][sdi(-j)] = 0.;
                    psl[2][sdi(-j)] = (x * 0.5).sqrt();
                    psl[2][sdi(j)] = (x * 0.5).sqrt();
                    psl[3][sdi(j)] = r * psl[2][sdi(j)] * rac3;
                    psl[3][sdi(-j)] = -psl[3][sdi(j)];
                }
                psl[3][sdi(0)] = -psl[3][sdi(0)];
            }
            _ => {
                let a: f64 = (1..=is)
                    .map(|i| ((i + is) as f64 / i as f64).sqrt() * 0.5)
                    .product();
                for j in 0..=mu {
                    let r = rm[sdi(j)];
                    psl[is][sdi(j)] = 0.;
                    let xdb = tiny(a * (1. - r * r).powf(is as f64 * 0.5));
                    psl[is + 1][sdi(-j)] = xdb;
                    psl[is + 1][sdi(j)] = xdb;
                }
            }
        }

        let k = if is > 2 { is } else { 2 };
        let mut ig = if is == 1 { 1. } else { -1. };
        for l in k..NBETAL {
            let lf = l as f64;
            let isf = is as f64;
            let a = (2. * lf + 1.) / ((lf + isf + 1.) * (lf - isf + 1.)).sqrt();
            let b = ((lf + isf) * (lf - isf)).sqrt() / (2. * lf + 1.);
            for j in 0..=mu {
                let xdb = tiny(a * (rm[sdi(j)] * psl[l + 1][sdi(j)] - b * psl[l][sdi(j)]));
                psl[l + 2][sdi(j)] = xdb;
                if j != 0 {
                    psl[l + 2][sdi(-j)] = ig * xdb;
                }
            }
            ig = -ig;
        }

        let xpl = psl[3];
        let mut bp = [[0.; NMU]; MU + 1];
        for (j, row) in bp.iter_mut().enumerate() {
            let pj = sdi(j as i32);
            for (k, v) in row.iter_mut().enumerate() {
                let sbp: f64 = (is..=NBETAL)
                    .map(|l| psl[l + 1][pj] * psl[l + 1][k] * betal[l])
                    .sum();
                *v = tiny(sbp);
            }
        }

        Self { xpl, bp }
    }
}

/// The two flavours of the solver differ in a few tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Solver {
    /// Bidirectional radiance
    Radiance,
    /// Isotropic source, for transmittances and spherical albedo
    Transmittance,
}

impl Solver {
    /// A value the convergence tests leave out.
    fn negligible(self, x: f64) -> bool {
        match self {
            Solver::Radiance => x <= ACCU,
            Solver::Transmittance => x == 0.,
        }
    }

    /// Smallest distance to an existing boundary that still inserts a new
    /// one at the sensor level.
    fn merge_tolerance(self) -> f64 {
        match self {
            Solver::Radiance => 0.0005,
            Solver::Transmittance => 0.005,
        }
    }

    /// Exponent below which the aerosol contribution is dropped.
    fn aerosol_cutoff(self) -> f64 {
        match self {
            Solver::Radiance => -20.,
            Solver::Transmittance => -18.,
        }
    }
}

/// Vertical discretization of the atmosphere.
#[derive(Debug)]
struct Layers {
    /// Optical depth at each boundary, counted from the top
    h: [f64; NLAYER],
    /// Aerosol single scattering albedo weighted by the aerosol fraction
    xdel: [f64; NLAYER],
    /// Rayleigh fraction
    ydel: [f64; NLAYER],
    /// Half the direct solar transmittance down to each boundary, for the
    /// primary scattering source of the radiance solver
    ch: [f64; NLAYER],
    /// Index of the bottom boundary
    snt: usize,
    /// Index of the boundary at the sensor level
    iplane: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mixture {
    Rayleigh,
    Aerosol,
    Mixed,
}

/// Optical depths of the whole atmosphere and of the part below the sensor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Column {
    pub(crate) tamoy: f64,
    pub(crate) trmoy: f64,
    pub(crate) pizmoy: f64,
    pub(crate) tamoyp: f64,
    pub(crate) trmoyp: f64,
}

impl Column {
    fn is_empty(&self) -> bool {
        self.tamoy <= 0. && self.trmoy <= 0.
    }
}

impl Layers {
    fn new(solver: Solver, col: &Column, palt: f64, xmus: f64) -> Self {
        let Column {
            tamoy,
            trmoy,
            pizmoy,
            tamoyp,
            trmoyp,
        } = *col;
        let trp = trmoy - trmoyp;
        let tap = tamoy - tamoyp;

        let mut ha = 2.;
        let mut snt = NT;
        let mut ntp = snt;
        let plane = palt <= 900. && palt > 0.;
        if plane {
            if tap > 1e-3 {
                ha = -palt / (tap / tamoy).ln();
            }
            ntp = snt - 1;
        }

        let mixture = if tamoy <= ACCU2 && trmoy > tamoy {
            Mixture::Rayleigh
        } else if trmoy <= ACCU2 && tamoy > trmoy {
            Mixture::Aerosol
        } else {
            Mixture::Mixed
        };

        let mut l = Self {
            h: [0.; NLAYER],
            xdel: [0.; NLAYER],
            ydel: [0.; NLAYER],
            ch: [0.; NLAYER],
            snt,
            iplane: 0,
        };
        let half_direct = |h: f64| (-h / xmus).exp() / 2.;

        // Rayleigh and aerosol fractions at altitude z
        let mix_at = |z: f64| {
            let xx = -z / ha;
            let ca = if xx <= solver.aerosol_cutoff() {
                0.
            } else {
                tamoy * xx.exp()
            };
            let cr = trmoy * (-z / HR).exp();
            let ratio = (cr / HR) / (cr / HR + ca / ha);
            (cr + ca, (1. - ratio) * pizmoy, ratio)
        };

        match mixture {
            Mixture::Rayleigh => {
                for j in 0..=ntp {
                    l.h[j] = j as f64 * trmoy / ntp as f64;
                    l.ch[j] = half_direct(l.h[j]);
                    l.ydel[j] = 1.;
                    l.xdel[j] = 0.;
                }
            }
            Mixture::Aerosol => {
                for j in 0..=ntp {
                    l.h[j] = j as f64 * tamoy / ntp as f64;
                    l.ch[j] = half_direct(l.h[j]);
                    l.ydel[j] = 0.;
                    l.xdel[j] = pizmoy;
                }
            }
            Mixture::Mixed => {
                for it in 0..=ntp {
                    let zx = if it == 0 {
                        discre(tamoy, ha, trmoy, HR, it, ntp, 0., 0., 300., 0.)
                    } else {
                        discre(
                            tamoy,
                            ha,
                            trmoy,
                            HR,
                            it,
                            ntp,
                            l.h[it - 1],
                            l.ydel[it - 1],
                            300.,
                            0.,
                        )
                    };
                    let (h, xdel, ydel) = mix_at(zx);
                    l.h[it] = h;
                    l.ch[it] = half_direct(h);
                    l.xdel[it] = xdel;
                    l.ydel[it] = ydel;
                }
            }
        }

        if plane {
            let taup = tap + trp;
            let mut iplane = l.h[..=ntp].iter().rposition(|&h| taup >= h).unwrap_or(0);
            let xt1 = (l.h[iplane] - taup).abs();
            let xt2 = (l.h[iplane + 1] - taup).abs();
            let tol = solver.merge_tolerance();
            if xt1 > tol && xt2 > tol {
                // Shift everything from iplane down one slot, iplane then
                // takes the sensor level
                for i in (iplane + 1..=snt).rev() {
                    l.xdel[i] = l.xdel[i - 1];
                    l.ydel[i] = l.ydel[i - 1];
                    l.h[i] = l.h[i - 1];
                    l.ch[i] = l.ch[i - 1];
                }
            } else {
                // Reuse a boundary: the radiance solver takes the farther
                // one, the transmittance solver the nearer one
                snt = ntp;
                let next = match solver {
                    Solver::Radiance => xt2 > xt1,
                    Solver::Transmittance => xt2 < xt1,
                };
                if next {
                    iplane += 1;
                }
            }

            l.h[iplane] = taup;
            match mixture {
                Mixture::Mixed => {
                    let (h, xdel, ydel) = mix_at(palt);
                    if solver == Solver::Radiance {
                        l.h[iplane] = h;
                        l.ch[iplane] = half_direct(h);
                    }
                    l.xdel[iplane] = xdel;
                    l.ydel[iplane] = ydel;
                }
                Mixture::Rayleigh => {
                    l.ydel[iplane] = 1.;
                    l.xdel[iplane] = 0.;
                }
                Mixture::Aerosol => {
                    l.ydel[iplane] = 0.;
                    l.xdel[iplane] = pizmoy;
                }
            }
            l.snt = snt;
            l.iplane = iplane;
        }
        l
    }

    /// Integrate the source `i2` along the vertical for every quadrature
    /// direction, writing the intensities at each boundary into `i1`.
    /// Magnitudes at or below `floor` are flushed to zero.
    fn integrate(&self, rm: &[f64; NMU], i2: &Field, i1: &mut Field, floor: f64) {
        let h = &self.h;
        let snt = self.snt;
        let step = |zi1: f64, c: f64, a: f64, b: f64, r: f64, xx: f64| {
            let z = c * zi1 + ((1. - c) * (b + a * r) + a * xx) / 2.;
            if z.abs() <= floor {
                0.
            } else {
                z
            }
        };

        // Upward
        for k in 1..=MU as i32 {
            let kk = sdi(k);
            let r = rm[kk];
            i1[snt][kk] = 0.;
            let mut zi1 = 0.;
            for i in (0..snt).rev() {
                let f = h[i + 1] - h[i];
                let a = (i2[i + 1][kk] - i2[i][kk]) / f;
                let b = i2[i][kk] - a * h[i];
                let c = (-f / r).exp();
                let xx = h[i] - h[i + 1] * c;
                zi1 = step(zi1, c, a, b, r, xx);
                i1[i][kk] = zi1;
            }
        }

        // Downward
        for k in -(MU as i32)..=-1 {
            let kk = sdi(k);
            let r = rm[kk];
            i1[0][kk] = 0.;
            let mut zi1 = 0.;
            for i in 1..=snt {
                let f = h[i] - h[i - 1];
                let c = (f / r).exp();
                let a = (i2[i][kk] - i2[i - 1][kk]) / f;
                let b = i2[i][kk] - a * h[i];
                let xx = h[i] - h[i - 1] * c;
                zi1 = step(zi1, c, a, b, r, xx);
                i1[i][kk] = zi1;
            }
        }
    }

    /// Intensities leaving the atmosphere: downward at the bottom and upward
    /// at the top.
    fn boundary(&self, i1: &Field) -> [f64; NMU] {
        let mut out = [0.; NMU];
        for k in -(MU as i32)..=MU as i32 {
            if k < 0 {
                out[sdi(k)] = i1[self.snt][sdi(k)];
            } else if k > 0 {
                out[sdi(k)] = i1[0][sdi(k)];
            }
        }
        out
    }
}

/// Rayleigh phase function coefficients `(beta0, beta2)`.
fn rayleigh_phase() -> (f64, f64) {
    let aaaa = DELTA / (2. - DELTA);
    let ron = (1. - aaaa) / (1. + 2. * aaaa);
    (1., 0.5 * ron)
}

/// Ratio used by the geometric series test on three successive orders.
fn series_ratio(a1: f64, d1: f64, g1: f64) -> f64 {
    let q = 1. - g1 / d1;
    (g1 / d1 - d1 / a1) / (q * q)
}

/// Sum of the scattering orders, after the primary scattering is in `i1`.
/// Returns the summed boundary intensities and the summed upward intensity
/// in the view direction at the sensor level.
#[allow(clippy::too_many_arguments)]
fn sum_orders(
    solver: Solver,
    layers: &Layers,
    quad: &Quadrature,
    kernel: &Kernel,
    rayleigh: Option<(f64, f64)>,
    i1: &mut Field,
    i2: &mut Field,
) -> ([f64; NMU], f64) {
    let snt = layers.snt;
    let iplane = layers.iplane;
    let mu = MU as i32;
    let (zero_source, zero_field) = match solver {
        Solver::Radiance => (1e-30, 1e-20),
        Solver::Transmittance => (f64::NEG_INFINITY, 0.),
    };

    let mut i3 = layers.boundary(i1);
    let mut inm1 = i3;
    let mut inm2 = i3;
    let mut at_plane = i1[iplane][sdi(mu)];
    let mut at_plane1 = 0.;
    let mut at_plane2 = at_plane;

    let mut ig = 1;
    loop {
        ig += 1;

        for k in 1..=mu {
            for i in 0..=snt {
                let (x, y) = (layers.xdel[i], layers.ydel[i]);
                let (mut ii1, mut ii2) = (0., 0.);
                for j in 1..=mu {
                    let mut bpjk = kernel.bp[j as usize][sdi(k)] * x;
                    let mut bpjmk = kernel.bp[j as usize][sdi(-k)] * x;
                    if let Some((beta0, beta2)) = rayleigh {
                        let xj = kernel.xpl[sdi(j)];
                        bpjk += y * (beta0 + beta2 * xj * kernel.xpl[sdi(k)]);
                        bpjmk += y * (beta0 + beta2 * xj * kernel.xpl[sdi(-k)]);
                    }
                    let gb = quad.gb[sdi(j)];
                    let (up, down) = (i1[i][sdi(j)], i1[i][sdi(-j)]);
                    ii2 += gb * (up * bpjk + down * bpjmk);
                    ii1 += gb * (up * bpjmk + down * bpjk);
                }
                i2[i][sdi(k)] = if ii2 < zero_source { 0. } else { ii2 };
                i2[i][sdi(-k)] = if ii1 < zero_source { 0. } else { ii1 };
            }
        }

        layers.integrate(&quad.rm, i2, i1, zero_field);

        let order = layers.boundary(i1);
        let at_plane0 = i1[iplane][sdi(mu)];

        if ig > 2 {
            let mut z: f64 = 0.;
            if at_plane2 >= ACCU && at_plane1 >= ACCU && at_plane >= ACCU {
                z = z.max(
                    (series_ratio(at_plane2, at_plane1, at_plane0) * (at_plane0 / at_plane)).abs(),
                );
            }
            for l in (-mu..=mu).filter(|&l| l != 0) {
                let (a1, d1, g1) = (inm2[sdi(l)], inm1[sdi(l)], order[sdi(l)]);
                if solver.negligible(a1) || solver.negligible(d1) || solver.negligible(i3[sdi(l)])
                {
                    continue;
                }
                z = z.max((series_ratio(a1, d1, g1) * (g1 / i3[sdi(l)])).abs());
            }

            if z < 1e-4 {
                // The remaining orders form a geometric series
                for l in (-mu..=mu).filter(|&l| l != 0) {
                    let (d1, g1) = (inm1[sdi(l)], order[sdi(l)]);
                    if solver.negligible(d1) || (g1 - d1).abs() <= ACCU {
                        continue;
                    }
                    i3[sdi(l)] += g1 / (1. - g1 / d1);
                }
                let (d1, mut g1) = (at_plane1, at_plane0);
                if d1 >= ACCU {
                    if (g1 - d1).abs() >= ACCU {
                        g1 /= 1. - g1 / d1;
                    }
                    at_plane += g1;
                }
                break;
            }

            inm2 = inm1;
            at_plane2 = at_plane1;
        }

        inm1 = order;
        at_plane1 = at_plane0;
        for (s, o) in i3.iter_mut().zip(&order) {
            *s += o;
        }
        at_plane += at_plane0;

        let z = i3
            .iter()
            .zip(&order)
            .filter(|(s, _)| match solver {
                Solver::Radiance => s.abs() >= ACCU,
                Solver::Transmittance => **s != 0.,
            })
            .map(|(s, o)| (o / s).abs())
            .fold(0., f64::max);
        if z < 1e-5 || ig > MAX_ORDER {
            break;
        }
    }

    (i3, at_plane)
}

/// Diffuse radiance field `xl[m][l]` for zenith index `m` (see [`sdi`]) and
/// azimuth node `l`, for a sun at `-rm[0]` and a view direction `rm[MU]`.
///
/// `xl[-MU][0]` is the upward radiance at the sensor level in the view
/// direction, for a relative azimuth `phirad`.
pub(crate) fn os(
    col: &Column,
    betal: &Betal,
    quad: &Quadrature,
    palt: f64,
    phirad: f64,
) -> [[f64; NP]; NMU] {
    let mut xl = [[0.; NP]; NMU];
    if col.is_empty() {
        return xl;
    }
    let solver = Solver::Radiance;
    let mu = MU as i32;
    let rm = &quad.rm;
    let xmus = -rm[sdi(0)];
    let layers = Layers::new(solver, col, palt, xmus);
    let snt = layers.snt;

    let (mut beta0, beta2) = rayleigh_phase();
    let mut i1: Field = [[0.; NMU]; NLAYER];
    let mut i2: Field = [[0.; NMU]; NLAYER];
    let mut i4 = [0.; NMU];

    let iborm = if (xmus - 1.).abs() < 1e-6 { 0 } else { NBETAL };

    for is in 0..=iborm {
        let kernel = Kernel::new(is, rm, betal);
        if is > 0 {
            beta0 = 0.;
        }

        // Primary scattering source
        for j in -mu..=mu {
            let sa2 = kernel.bp[0][sdi(j)];
            let sa1 = if is <= 2 {
                beta0 + beta2 * kernel.xpl[sdi(j)] * kernel.xpl[sdi(0)]
            } else {
                0.
            };
            for k in 0..=snt {
                i2[k][sdi(j)] = layers.ch[k] * (sa2 * layers.xdel[k] + sa1 * layers.ydel[k]);
            }
        }
        layers.integrate(rm, &i2, &mut i1, 0.);

        let rayleigh = (is <= 2).then_some((beta0, beta2));
        let (i3, roavion) = sum_orders(solver, &layers, quad, &kernel, rayleigh, &mut i1, &mut i2);

        let delta0s = if is == 0 { 1. } else { 2. };
        for (s, v) in i4.iter_mut().zip(&i3) {
            *s += delta0s * v;
        }

        let isf = is as f64;
        for (l, &phi) in quad.rp.iter().enumerate() {
            for m in -(mu - 1)..=(mu - 1) {
                let angle = if m > 0 { phi + std::f64::consts::PI } else { phi };
                xl[sdi(m)][l] += delta0s * i3[sdi(m)] * (isf * angle).cos();
            }
        }
        if is == 0 {
            for k in 1..mu {
                xl[sdi(0)][0] += rm[sdi(k)] * quad.gb[sdi(k)] * i3[sdi(-k)];
            }
        }
        let view = (isf * (phirad + std::f64::consts::PI)).cos();
        xl[sdi(mu)][0] += delta0s * i3[sdi(mu)] * view;
        xl[sdi(-mu)][0] += delta0s * roavion * view;

        // Only the terms with a vanishing sum enter the stop test, so the
        // series stops after the first term as soon as every sum is
        // significant. A NaN ratio never stops it.
        let mut z = 0.;
        for l in (-mu..=mu).filter(|&l| l != 0 && i4[sdi(l)].abs() <= ACCU) {
            let x = (i3[sdi(l)] / i4[sdi(l)]).abs();
            z = if z > x { z } else { x };
        }
        if z <= 0.001 {
            break;
        }
    }
    xl
}

/// Transmittance quantities for an isotropic source: `xf[0]` is the total
/// upward transmittance to the sensor level in the view direction `rm[MU]`,
/// `xf[1]` half the spherical albedo, `xf[2]` the total transmittance of the
/// whole atmosphere in the direction `rm[MU]`.
pub(crate) fn iso(col: &Column, betal: &Betal, quad: &Quadrature, palt: f64) -> [f64; 3] {
    if col.is_empty() {
        return [1., 0., 1.];
    }
    let solver = Solver::Transmittance;
    let mu = MU as i32;
    let rm = &quad.rm;
    let layers = Layers::new(solver, col, palt, -rm[sdi(0)]);
    let snt = layers.snt;

    let kernel = Kernel::new(0, rm, betal);
    let mut i1: Field = [[0.; NMU]; NLAYER];
    let mut i2: Field = [[0.; NMU]; NLAYER];

    // Direct transmission from the bottom
    let tau = col.tamoy + col.trmoy;
    for k in 1..=mu {
        i1[snt][sdi(k)] = 1.;
        for i in 0..snt {
            i1[i][sdi(k)] = (-(tau - layers.h[i]) / rm[sdi(k)]).exp();
        }
    }

    let (i3, tavion) = sum_orders(
        solver,
        &layers,
        quad,
        &kernel,
        Some(rayleigh_phase()),
        &mut i1,
        &mut i2,
    );

    let flux: f64 = (1..=mu)
        .map(|k| rm[sdi(k)] * quad.gb[sdi(k)] * i3[sdi(-k)])
        .sum();
    [tavion, flux, i3[sdi(mu)]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn isotropic() -> Betal {
        let mut betal = [0.; NBETAL + 1];
        betal[0] = 1.;
        betal
    }

    fn rayleigh(tau: f64) -> Column {
        Column {
            tamoy: 0.,
            trmoy: tau,
            pizmoy: 1.,
            tamoyp: 0.,
            trmoyp: 0.,
        }
    }

    #[test]
    fn discre_rejects_large_scale_height() {
        assert_eq!(discre(0.2, 7.5, 0.1, 8., 1, 26, 0.01, 0.5, 300., 0.), 0.);
    }

    #[test]
    fn layers_follow_optical_depth() {
        let l = Layers::new(Solver::Radiance, &rayleigh(0.1), 1000., 0.8);
        assert_eq!(l.snt, NT);
        assert_eq!(l.iplane, 0);
        assert_relative_eq!(l.h[NT], 0.1, epsilon = 1e-12);
        assert_relative_eq!(l.h[13], 0.05, epsilon = 1e-12);

        let mixed = Column {
            tamoy: 0.3,
            trmoy: 0.1,
            pizmoy: 0.9,
            tamoyp: 0.,
            trmoyp: 0.,
        };
        let l = Layers::new(Solver::Radiance, &mixed, 1000., 0.8);
        assert!(l.h[0] < 1e-4);
        assert!(l.h[..=NT].windows(2).all(|w| w[0] < w[1]));
        assert!(l.h[NT] <= 0.4 + 1e-4 && l.h[NT] > 0.35);
        // Aerosols are concentrated near the ground
        assert!(l.ydel[1] > l.ydel[NT]);
    }

    #[test]
    fn plane_level_is_a_boundary() {
        let col = Column {
            tamoy: 0.3,
            trmoy: 0.1,
            pizmoy: 0.9,
            tamoyp: 0.2,
            trmoyp: 0.03,
        };
        let l = Layers::new(Solver::Transmittance, &col, 3., 0.8);
        assert_eq!(l.snt, NT);
        assert_eq!(l.iplane, 10);
        // The sensor level takes the slot of the boundary right above it,
        // which moves one slot down
        assert_relative_eq!(l.h[10], 0.17, epsilon = 1e-12);
        assert_abs_diff_eq!(l.h[11], 0.16, epsilon = 1e-3);
        assert_abs_diff_eq!(l.h[9], 0.144, epsilon = 1e-3);

        let l = Layers::new(Solver::Radiance, &col, 3., 0.8);
        assert_eq!(l.iplane, 10);
        assert_abs_diff_eq!(l.h[10], 0.1687, epsilon = 1e-3);
        assert_relative_eq!(l.ch[10], (-l.h[10] / 0.8).exp() / 2., epsilon = 1e-12);
    }

    #[test]
    fn plane_level_close_to_a_boundary() {
        // Boundaries every 0.004, the sensor level 0.0002 below the 15th
        let col = Column {
            trmoyp: 0.1 - 0.0602,
            ..rayleigh(0.1)
        };
        let xmus: f64 = 0.8;

        let l = Layers::new(Solver::Radiance, &col, 3., xmus);
        assert_eq!(l.snt, NT - 1);
        assert_eq!(l.iplane, 16);
        assert_relative_eq!(l.h[16], 0.0602, epsilon = 1e-12);
        // The direct term keeps the value of the boundary that was moved
        assert_relative_eq!(l.ch[16], (-0.064 / xmus).exp() / 2., epsilon = 1e-12);

        let l = Layers::new(Solver::Transmittance, &col, 3., xmus);
        assert_eq!(l.snt, NT - 1);
        assert_eq!(l.iplane, 15);
        assert_relative_eq!(l.h[15], 0.0602, epsilon = 1e-12);
    }

    #[test]
    fn radiance_has_no_azimuth_dependence() {
        let quad = Quadrature::new().oriented(0.9, -0.8);
        let mut betal = isotropic();
        betal[1] = 1.8;
        betal[2] = 1.2;
        betal[3] = 0.5;
        let col = Column {
            tamoy: 0.2,
            trmoy: 0.1,
            pizmoy: 0.9,
            tamoyp: 0.,
            trmoyp: 0.,
        };
        let view = sdi(-(MU as i32));
        let forward = os(&col, &betal, &quad, 1000., 0.)[view][0];
        let backward = os(&col, &betal, &quad, 1000., std::f64::consts::PI)[view][0];
        assert!(forward > 0.);
        assert_eq!(forward, backward);
    }

    #[test]
    fn isotropic_kernel() {
        let quad = Quadrature::new().oriented(0.9, -0.8);
        let k = Kernel::new(0, &quad.rm, &isotropic());
        for j in 0..=MU {
            for v in k.bp[j] {
                assert_relative_eq!(v, 1., epsilon = 1e-12);
            }
        }
        let r = quad.rm[sdi(3)];
        assert_relative_eq!(k.xpl[sdi(3)], (3. * r * r - 1.) / 2., epsilon = 1e-12);
        // Higher Fourier terms vanish for an isotropic phase function
        let k = Kernel::new(3, &quad.rm, &isotropic());
        assert!(k.bp.iter().flatten().all(|v| *v == 0.));
    }

    #[test]
    fn conservative_rayleigh_transmittance() {
        let tau = 0.1;
        let xmu: f64 = 0.9;
        let quad = Quadrature::new().oriented(xmu, xmu);
        let xf = iso(&rayleigh(tau), &isotropic(), &quad, 1000.);
        let direct = (-tau / xmu).exp();
        assert!(xf[0] > direct && xf[0] < 1.);
        // Two-stream estimate
        let two_stream = ((2. / 3. + xmu) + (2. / 3. - xmu) * direct) / (4. / 3. + tau);
        assert_abs_diff_eq!(xf[0], two_stream, epsilon = 0.01);
        assert_relative_eq!(xf[0], xf[2], epsilon = 1e-9);
        assert!(2. * xf[1] > 0.07 && 2. * xf[1] < 0.1);
    }

    #[test]
    fn empty_atmosphere() {
        let quad = Quadrature::new().oriented(0.9, -0.8);
        let xl = os(&rayleigh(0.), &isotropic(), &quad, 1000., 0.);
        assert_eq!(xl[sdi(-(MU as i32))][0], 0.);
        assert_eq!(iso(&rayleigh(0.), &isotropic(), &quad, 1000.), [1., 0., 1.]);
    }

    #[test]
    fn rayleigh_path_radiance() {
        let quad = Quadrature::new().oriented(0.9, -0.8);
        let thin = os(&rayleigh(0.05), &isotropic(), &quad, 1000., 0.5)[sdi(-(MU as i32))][0];
        let thick = os(&rayleigh(0.2), &isotropic(), &quad, 1000., 0.5)[sdi(-(MU as i32))][0];
        assert!(thin > 0.);
        assert!(thick > 2. * thin);
    }
}
