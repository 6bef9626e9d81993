//! Interpolation of the reference-wavelength tables to any wavelength.
//!
//! Every quantity is interpolated on its own with a power law in wavelength,
//! `y = β·wl^α`, between the two reference wavelengths that bracket it.
//! Intrinsic reflectances switch to a linear interpolation when the lower
//! value is small, and any quantity that is not strictly positive at both
//! ends is interpolated linearly.

use super::aerosol::{AerosolTables, I550};
use super::discrete::{bracket, DiscreteTables, AEROSOL, MIXED, RAYLEIGH};
use super::sos::DELTA;
use super::WLDIS;

/// Below this, intrinsic reflectances are interpolated linearly.
const SMALL_REFLECTANCE: f64 = 0.001;

/// Atmospheric optical properties at one wavelength.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Optics {
    /// Aerosol phase function at the scattering angle
    pub phaa: f64,
    /// Molecular phase function at the scattering angle
    pub phar: f64,
    /// Intrinsic reflectance of molecules
    pub rorayl: f64,
    /// Intrinsic reflectance of molecules and aerosols
    pub romix: f64,
    /// Intrinsic reflectance of aerosols
    pub roaero: f64,
    /// Molecular optical depth
    pub tray: f64,
    /// Molecular optical depth below the sensor
    pub trayp: f64,
    /// Aerosol optical depth
    pub taer: f64,
    /// Aerosol optical depth below the sensor
    pub taerp: f64,
    /// Aerosol scattering optical depth
    pub tsca: f64,
    /// Total downward transmittance, molecules
    pub dtotr: f64,
    /// Total downward transmittance, aerosols
    pub dtota: f64,
    /// Total downward transmittance
    pub dtott: f64,
    /// Total upward transmittance, molecules
    pub utotr: f64,
    /// Total upward transmittance, aerosols
    pub utota: f64,
    /// Total upward transmittance
    pub utott: f64,
    /// Spherical albedo, molecules
    pub asray: f64,
    /// Spherical albedo, aerosols
    pub asaer: f64,
    /// Spherical albedo
    pub astot: f64,
}

impl Optics {
    fn fields(&self) -> [f64; 19] {
        [
            self.phaa, self.phar, self.rorayl, self.romix, self.roaero, self.tray, self.trayp,
            self.taer, self.taerp, self.tsca, self.dtotr, self.dtota, self.dtott, self.utotr,
            self.utota, self.utott, self.asray, self.asaer, self.astot,
        ]
    }

    fn fields_mut(&mut self) -> [&mut f64; 19] {
        [
            &mut self.phaa,
            &mut self.phar,
            &mut self.rorayl,
            &mut self.romix,
            &mut self.roaero,
            &mut self.tray,
            &mut self.trayp,
            &mut self.taer,
            &mut self.taerp,
            &mut self.tsca,
            &mut self.dtotr,
            &mut self.dtota,
            &mut self.dtott,
            &mut self.utotr,
            &mut self.utota,
            &mut self.utott,
            &mut self.asray,
            &mut self.asaer,
            &mut self.astot,
        ]
    }

    /// Add `other` weighted by `coef`.
    pub(crate) fn accumulate(&mut self, other: &Self, coef: f64) {
        for (sum, v) in self.fields_mut().into_iter().zip(other.fields()) {
            *sum += v * coef;
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        for v in self.fields_mut() {
            *v *= factor;
        }
    }
}

/// Interpolation between the reference wavelengths `linf` and `linf + 1`.
#[derive(Debug, Clone, Copy)]
struct Bracket {
    wl: f64,
    linf: usize,
    lsup: usize,
    coef: f64,
}

impl Bracket {
    fn new(wl: f64) -> Self {
        let (linf, lsup, coef) = bracket(wl);
        Self {
            wl,
            linf,
            lsup,
            coef,
        }
    }

    fn linear(&self, yinf: f64, ysup: f64) -> f64 {
        let (x0, x1) = (WLDIS[self.linf], WLDIS[self.lsup]);
        yinf + (ysup - yinf) * (self.wl - x0) / (x1 - x0)
    }

    fn power(&self, yinf: f64, ysup: f64) -> f64 {
        if yinf <= 0. || ysup <= 0. {
            return self.linear(yinf, ysup);
        }
        let alpha = (ysup / yinf).ln() / self.coef;
        let beta = yinf / WLDIS[self.linf].powf(alpha);
        beta * self.wl.powf(alpha)
    }

    /// Power law on a row of a table.
    fn row(&self, values: &[f64; 10]) -> f64 {
        self.power(values[self.linf], values[self.lsup])
    }

    fn reflectance(&self, values: &[f64; 10]) -> f64 {
        let (yinf, ysup) = (values[self.linf], values[self.lsup]);
        if yinf < SMALL_REFLECTANCE {
            self.linear(yinf, ysup)
        } else {
            self.power(yinf, ysup)
        }
    }
}

/// Total (direct plus diffuse) transmittance of one row of the tables.
fn total(dir: &[[f64; 10]; 3], dif: &[[f64; 10]; 3], row: usize) -> [f64; 10] {
    std::array::from_fn(|i| dir[row][i] + dif[row][i])
}

/// Interpolate the tables of `disc` to the wavelength `wl` (µm).
///
/// `idatmp` is the sensor regime: 0 for a ground sensor, for which there is
/// no intrinsic reflectance and no upward path.
#[allow(clippy::too_many_arguments)]
pub(crate) fn interp(
    wl: f64,
    iaer: i32,
    idatmp: i32,
    xmud: f64,
    taer55: f64,
    taer55p: f64,
    tables: &AerosolTables,
    disc: &DiscreteTables,
) -> Optics {
    let b = Bracket::new(wl);
    let aerosols = iaer != 0;
    let airborne = idatmp != 0;
    let mut o = Optics {
        dtota: 1.,
        utota: 1.,
        utotr: 1.,
        utott: 1.,
        ..Default::default()
    };

    if aerosols {
        o.phaa = b.row(&tables.phase);
    }
    o.phar = 2. * (1. - DELTA) / (2. + DELTA) * 0.75 * (1. + xmud * xmud)
        + 3. * DELTA / (2. + DELTA);

    if airborne {
        o.rorayl = b.reflectance(&disc.roatm[RAYLEIGH]);
        o.romix = b.reflectance(&disc.roatm[MIXED]);
        if aerosols {
            o.roaero = b.reflectance(&disc.roatm[AEROSOL]);
        }
    }

    o.tray = b.row(&disc.trayl);
    if airborne {
        o.trayp = b.row(&disc.traypl);
    }

    if aerosols {
        let (ext, ome) = (&tables.ext, &tables.ome);
        let sca: [f64; 10] = std::array::from_fn(|i| ext[i] * ome[i]);
        o.tsca = taer55 * b.row(&sca) / ext[I550];
        let ext_wl = b.row(ext);
        o.taer = taer55 * ext_wl / ext[I550];
        o.taerp = taer55p * ext_wl / ext[I550];
    }

    let down: [[f64; 10]; 3] = std::array::from_fn(|row| total(&disc.dtdir, &disc.dtdif, row));
    o.dtotr = b.row(&down[RAYLEIGH]);
    let dtotc = b.power(
        down[MIXED][b.linf] / down[RAYLEIGH][b.linf],
        down[MIXED][b.lsup] / down[RAYLEIGH][b.lsup],
    );
    if aerosols {
        o.dtota = b.row(&down[AEROSOL]);
    }
    o.dtott = dtotc * o.dtotr;

    if airborne {
        let up: [[f64; 10]; 3] = std::array::from_fn(|row| total(&disc.utdir, &disc.utdif, row));
        o.utotr = b.row(&up[RAYLEIGH]);
        let utotc = b.power(
            up[MIXED][b.linf] / up[RAYLEIGH][b.linf],
            up[MIXED][b.lsup] / up[RAYLEIGH][b.lsup],
        );
        if aerosols {
            o.utota = b.row(&up[AEROSOL]);
        }
        o.utott = utotc * o.utotr;
    }

    o.asray = b.row(&disc.sphal[RAYLEIGH]);
    o.astot = b.row(&disc.sphal[MIXED]);
    if aerosols {
        o.asaer = b.row(&disc.sphal[AEROSOL]);
    }
    o
}

/// Direct upward transmittance along the view direction for the optical
/// depth `tau` below the sensor.
pub(crate) fn direct_up(tau: f64, xmuv: f64) -> f64 {
    (-tau / xmuv).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tables() -> DiscreteTables {
        let mut disc = DiscreteTables::default();
        for (i, wl) in WLDIS.iter().enumerate() {
            let tray = 0.0088 * wl.powf(-4.05);
            disc.trayl[i] = tray;
            disc.traypl[i] = tray;
            disc.roatm[RAYLEIGH][i] = tray / 2.;
            disc.roatm[MIXED][i] = tray / 2. + 0.02;
            disc.roatm[AEROSOL][i] = 0.02;
            for row in 0..3 {
                disc.dtdir[row][i] = (-tray).exp();
                disc.dtdif[row][i] = 0.05;
                disc.utdir[row][i] = (-tray).exp();
                disc.utdif[row][i] = 0.05;
                disc.sphal[row][i] = tray;
            }
        }
        disc
    }

    #[test]
    fn power_law_is_exact_on_a_power_law() {
        let disc = tables();
        let aero = AerosolTables::empty();
        let o = interp(0.6, 0, 4, 0.5, 0., 0., &aero, &disc);
        assert_relative_eq!(o.tray, 0.0088 * 0.6f64.powf(-4.05), max_relative = 1e-10);
        assert_relative_eq!(o.rorayl, o.tray / 2., max_relative = 1e-10);
    }

    #[test]
    fn nodes_are_reproduced() {
        let disc = tables();
        let aero = AerosolTables::empty();
        let o = interp(WLDIS[4], 1, 4, 0.5, 0.2, 0.2, &aero, &disc);
        assert_relative_eq!(o.romix, disc.roatm[MIXED][4], max_relative = 1e-10);
        assert_relative_eq!(o.roaero, 0.02, max_relative = 1e-10);
        assert_relative_eq!(o.asaer, disc.sphal[AEROSOL][4], max_relative = 1e-10);
        // The mixed transmittance is the molecular one times the ratio
        assert_relative_eq!(o.dtott, o.dtotr, max_relative = 1e-10);
    }

    #[test]
    fn ground_sensor() {
        let disc = tables();
        let aero = AerosolTables::empty();
        let o = interp(0.6, 1, 0, 0.5, 0.2, 0., &aero, &disc);
        assert_eq!((o.rorayl, o.romix, o.roaero), (0., 0., 0.));
        assert_eq!((o.utotr, o.utott, o.trayp), (1., 1., 0.));
    }

    #[test]
    fn small_reflectances_are_linear() {
        let mut disc = tables();
        disc.roatm[AEROSOL][3] = 0.0005;
        disc.roatm[AEROSOL][4] = 0.0015;
        let aero = AerosolTables::empty();
        let wl = 0.5 * (WLDIS[3] + WLDIS[4]);
        let o = interp(wl, 1, 4, 0.5, 0.2, 0.2, &aero, &disc);
        assert_relative_eq!(o.roaero, 0.001, max_relative = 1e-10);
    }

    #[test]
    fn molecular_phase() {
        let disc = tables();
        let aero = AerosolTables::empty();
        let o = interp(0.6, 0, 4, 1., 0., 0., &aero, &disc);
        // Backscattering: (1 - δ)/(2 + δ)·3 + 3δ/(2 + δ)
        assert_relative_eq!(o.phar, 3. / (2. + DELTA), max_relative = 1e-12);
    }

    #[test]
    fn band_average() {
        let disc = tables();
        let aero = AerosolTables::empty();
        let a = interp(0.6, 0, 4, 0.5, 0., 0., &aero, &disc);
        let b = interp(0.65, 0, 4, 0.5, 0., 0., &aero, &disc);
        let mut sum = Optics::default();
        sum.accumulate(&a, 2.);
        sum.accumulate(&b, 2.);
        sum.scale(0.25);
        assert_relative_eq!(sum.tray, 0.5 * (a.tray + b.tray));
        assert_relative_eq!(sum.phar, a.phar);
    }

    #[test]
    fn no_aerosol_values() {
        let disc = tables();
        let aero = AerosolTables::empty();
        let o = interp(0.6, 0, 4, 0.5, 0., 0., &aero, &disc);
        assert_eq!((o.taer, o.taerp, o.tsca, o.phaa), (0., 0., 0., 0.));
        assert_eq!((o.dtota, o.utota, o.asaer), (1., 1., 0.));
    }
}
