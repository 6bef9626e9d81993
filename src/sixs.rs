//! The 6S radiative transfer code for atmospheric correction
//!
//! An [`AtmosphereContext`] is built once from the conditions text. It
//! computes the optical properties of the atmosphere at ten reference
//! wavelengths and integrates them over the spectral band into the
//! coefficients of a [`TransformInput`]. The target elevation and the
//! visibility can then be changed cheaply with the `pre_compute_*` methods,
//! which start again from the parsed conditions each time.

mod aerosol;
mod altitude;
mod atmosphere;
mod concentration;
mod conditions;
mod discrete;
mod environment;
mod gas;
mod gauss;
mod geometry;
mod interp;
mod mie;
mod mie_file;
mod reflectance;
mod sensors;
mod sos;
mod wave;

#[cfg(test)]
mod tests;

use std::fmt;
use std::io::BufRead;
use std::path::PathBuf;

use log::{debug, info, warn};

pub use self::aerosol::{AerosolModel, AerosolTables, PhaseTable};
pub use self::altitude::{Altitude, SensorPlatform, TargetElevation};
pub use self::atmosphere::{Atmosphere, Profile, NLEVELS};
pub use self::concentration::AerosolConcentration;
pub use self::discrete::EquivalentOptics;
pub use self::environment::Environment;
pub use self::gas::{GasPath, GasTransmittances};
pub use self::geometry::Geometry;
pub use self::interp::Optics;
pub use self::mie::{MieComponent, MieInputs, SizeDistribution};
pub use self::wave::SpectralConditions;

use self::aerosol::aerosol_name;
use self::atmosphere::atmosphere_name;
use self::conditions::ConditionsReader;
use self::discrete::{discom, specinterp, DiscreteTables};
use self::environment::enviro;
use self::gas::{abstra, Absorbers};
use self::geometry::geometry_name;
use self::interp::{direct_up, interp};
use self::sensors::sensor_band;
use self::wave::{grid_wavelength, solirr, STEP};
use crate::error::SixsError;
use crate::transform::TransformInput;

/// The reference wavelengths (µm) the atmosphere is computed at.
pub(crate) const WLDIS: [f64; 10] = [
    0.400, 0.488, 0.515, 0.550, 0.633, 0.694, 0.860, 1.536, 2.250, 3.750,
];

/// Normalization sums below this are reported as degenerate.
const MIN_FLUX: f64 = 1e-7;

/// Settings that are not part of the conditions text.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionsOptions {
    /// Directory relative `.mie` file names are resolved against
    pub mie_dir: PathBuf,
    /// Radius of the target (km) used for the environment functions
    pub radius: f64,
}

impl Default for ConditionsOptions {
    fn default() -> Self {
        Self {
            mie_dir: PathBuf::from("."),
            radius: 0.5,
        }
    }
}

/// The parts of the conditions that change with the target elevation and the
/// visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphereState {
    /// Atmospheric profile, moved to the target elevation once derived
    pub atmosphere: Atmosphere,
    /// Aerosol amount
    pub concentration: AerosolConcentration,
    /// Target and sensor altitudes
    pub altitude: Altitude,
}

/// Everything needed to run 6S for one set of conditions.
///
/// `baseline` holds the conditions as parsed and is never modified.
/// `current` is re-derived from it by [`AtmosphereContext::pre_compute_h`]
/// and friends, together with the reference-wavelength tables.
#[derive(Debug, Clone)]
pub struct AtmosphereContext {
    options: ConditionsOptions,
    /// Sun and view geometry
    pub geometry: Geometry,
    /// Aerosol model and its optical tables
    pub aerosol: AerosolModel,
    /// Spectral band
    pub spectral: SpectralConditions,
    baseline: AtmosphereState,
    current: AtmosphereState,
    disc: DiscreteTables,
    equivalent: EquivalentOptics,
}

/// Result of the band integration with the band-averaged intermediate
/// quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct BandIntegration {
    /// Coefficients of the correction
    pub transform: TransformInput,
    /// Band-averaged optical properties
    pub optics: Optics,
    /// Band-averaged gas transmittances
    pub gas: GasTransmittances,
    /// Intrinsic atmospheric reflectances: with gas absorption (total
    /// path, half water vapour, upward only), then without (molecules,
    /// aerosols, mixture)
    pub ainr: [[f64; 3]; 2],
    /// Factor from apparent reflectance to apparent radiance (W/m²/sr/µm)
    pub radiance_factor: f64,
    /// Environment functions at the equivalent wavelength
    pub environment: Environment,
    /// Aerosol properties at the equivalent wavelength
    pub equivalent: EquivalentOptics,
}

impl AtmosphereContext {
    /// Parse the conditions text and compute the reference-wavelength tables.
    pub fn from_conditions(text: &str, options: ConditionsOptions) -> Result<Self, SixsError> {
        let mut reader = ConditionsReader::new(text);

        let geometry = Geometry::parse(&mut reader)?;
        let atmosphere = Atmosphere::parse(&mut reader)?;
        let aerosol = AerosolModel::parse(&mut reader, geometry.xmud, &options.mie_dir)?;
        let concentration =
            AerosolConcentration::parse(&mut reader, aerosol.iaer, &atmosphere.profile)?;
        let altitude = Altitude::parse(&mut reader)?;
        let spectral = SpectralConditions::parse(&mut reader)?;

        let baseline = AtmosphereState {
            atmosphere,
            concentration,
            altitude,
        };
        let mut ctx = Self {
            options,
            geometry,
            aerosol,
            spectral,
            current: baseline.clone(),
            baseline,
            disc: DiscreteTables::default(),
            equivalent: EquivalentOptics::default(),
        };
        ctx.derive(None, None);
        info!(
            "6S conditions ready: {}, {}, taer55 = {:.4}",
            geometry_name(ctx.geometry.igeom),
            aerosol_name(ctx.aerosol.iaer),
            ctx.current.concentration.taer55
        );
        Ok(ctx)
    }

    /// Same as [`AtmosphereContext::from_conditions`], reading the whole
    /// text from `reader`.
    pub fn from_reader(
        mut reader: impl BufRead,
        options: ConditionsOptions,
    ) -> Result<Self, SixsError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_conditions(&text, options)
    }

    /// Conditions as parsed.
    pub fn baseline(&self) -> &AtmosphereState {
        &self.baseline
    }

    /// Conditions as last derived.
    pub fn current(&self) -> &AtmosphereState {
        &self.current
    }

    /// Start again from the baseline with an optional new target elevation
    /// (km) and visibility (km), then recompute the tables.
    fn derive(&mut self, height: Option<f64>, visibility: Option<f64>) {
        let mut state = self.baseline.clone();
        if let Some(v) = visibility {
            state
                .concentration
                .set_visibility(self.aerosol.iaer, v, &state.atmosphere.profile);
        }
        if let Some(h) = height {
            state.altitude.set_height(h);
        }
        let taer55 = state.concentration.taer55;
        state.altitude.init(&mut state.atmosphere, taer55);

        self.disc = discom(
            &self.geometry,
            &state.atmosphere.profile,
            &self.aerosol,
            taer55,
            &state.altitude,
            &self.spectral,
        );
        self.equivalent = if self.aerosol.iaer != 0 {
            specinterp(
                self.spectral.wlmoy,
                &self.aerosol.tables,
                taer55,
                state.altitude.taer55p,
            )
        } else {
            EquivalentOptics::default()
        };
        self.current = state;
    }

    /// Recompute for a target elevation of `height` km.
    pub fn pre_compute_h(&mut self, height: f64) {
        debug!("recomputing for a target at {height:.3} km");
        self.derive(Some(height), None);
    }

    /// Recompute for a visibility of `visibility` km.
    pub fn pre_compute_v(&mut self, visibility: f64) {
        debug!("recomputing for a visibility of {visibility:.2} km");
        self.derive(None, Some(visibility));
    }

    /// Recompute for a target elevation of `height` km and a visibility of
    /// `visibility` km.
    pub fn pre_compute_hv(&mut self, height: f64, visibility: f64) {
        debug!("recomputing for a target at {height:.3} km and a visibility of {visibility:.2} km");
        self.derive(Some(height), Some(visibility));
    }

    fn absorbers(&self) -> Absorbers {
        let atms = &self.current.atmosphere;
        let alt = &self.current.altitude;
        let surface = atms.profile.p[0];
        Absorbers {
            idatm: atms.idatm,
            idatmp: alt.idatmp,
            uw: atms.uw,
            uo3: atms.uo3,
            puw: alt.puw,
            puo3: alt.puo3,
            column: surface / 1013.25,
            plane_column: ((surface - alt.pps) / 1013.25).max(0.),
        }
    }

    fn optics_at(&self, wl: f64) -> Optics {
        interp(
            wl,
            self.aerosol.iaer,
            self.current.altitude.idatmp,
            self.geometry.xmud,
            self.current.concentration.taer55,
            self.current.altitude.taer55p,
            &self.aerosol.tables,
            &self.disc,
        )
    }

    /// Integrate over the spectral band and return the correction
    /// coefficients.
    pub fn compute(&self) -> TransformInput {
        self.compute_band().transform
    }

    /// Integrate over the spectral band.
    pub fn compute_band(&self) -> BandIntegration {
        let geom = &self.geometry;
        let spectral = &self.spectral;
        let absorbers = self.absorbers();
        let half_water = absorbers.half_water();

        let mut optics = Optics::default();
        let mut gas = GasTransmittances::default();
        let mut ainr = [[0.; 3]; 2];
        let (mut seb, mut sb) = (0., 0.);
        let (mut tgasm, mut sdtott, mut sutott, mut sast, mut srotot) = (0., 0., 0., 0., 0.);

        for l in spectral.iinf..=spectral.isup {
            let sbor = spectral.weight(l);
            let wl = grid_wavelength(l);

            let attwava = abstra(wl, geom.xmus, geom.xmuv, &half_water).water.total;
            let g = abstra(wl, geom.xmus, geom.xmuv, &absorbers);
            let o = self.optics_at(wl);

            let tgtot = g.total();
            let ugtot = g.up();
            let tgp1 = g.total_dry();
            let tgp2 = attwava * tgp1;
            let ratm1 = (o.romix - o.rorayl) * tgtot + o.rorayl * tgp1;
            let ratm2 = (o.romix - o.rorayl) * tgp2 + o.rorayl * tgp1;
            let ratm3 = o.romix * ugtot;

            let swl = solirr(wl) * geom.dsol;
            let coef = sbor * STEP * swl;
            sb += sbor * STEP;
            seb += coef;

            tgasm += tgtot * coef;
            sdtott += o.dtott * coef;
            sutott += o.utott * coef;
            sast += o.astot * coef;
            srotot += o.romix * coef;
            for (sum, r) in ainr[0].iter_mut().zip([ratm1, ratm2, ratm3]) {
                *sum += r * coef;
            }
            for (sum, r) in ainr[1].iter_mut().zip([o.rorayl, o.roaero, o.romix]) {
                *sum += r * coef;
            }
            optics.accumulate(&o, coef);
            gas.accumulate(&g, coef);

            if spectral.step_output() {
                debug!(
                    "{wl:.4} µm: tgas {tgtot:.4} dtot {:.4} utot {:.4} sast {:.4} ratm {ratm2:.4} swl {swl:.2}",
                    o.dtott, o.utott, o.astot
                );
            }
        }

        if sb < MIN_FLUX {
            warn!("integrated filter function is {sb:e}, the band is degenerate");
        }
        if seb < MIN_FLUX {
            warn!("integrated solar flux is {seb:e}, the band is degenerate");
        } else {
            let norm = 1. / seb;
            tgasm *= norm;
            sdtott *= norm;
            sutott *= norm;
            sast *= norm;
            srotot *= norm;
            ainr.iter_mut().flatten().for_each(|a| *a *= norm);
            optics.scale(norm);
            gas.scale(norm);
        }

        let at_wlmoy = self.optics_at(spectral.wlmoy);
        let edifr = at_wlmoy.utotr - direct_up(at_wlmoy.trayp, geom.xmuv);
        let edifa = at_wlmoy.utota - direct_up(at_wlmoy.taerp, geom.xmuv);
        let environment = enviro(
            edifr,
            edifa,
            self.options.radius,
            self.current.altitude.palt,
            geom.xmuv,
        );

        let radiance_factor = if sb > 0. {
            geom.xmus * seb / (std::f64::consts::PI * sb)
        } else {
            0.
        };

        BandIntegration {
            transform: TransformInput {
                iwave: spectral.iwave,
                asol: geom.asol,
                xmus: geom.xmus,
                tgasm,
                sutott,
                sdtott,
                sast,
                srotot,
                seb,
                sb,
                ainr,
            },
            optics,
            gas,
            ainr,
            radiance_factor,
            environment,
            equivalent: self.equivalent,
        }
    }
}

impl fmt::Display for AtmosphereContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.geometry;
        let atms = &self.baseline.atmosphere;
        let conc = &self.current.concentration;
        let alt = &self.current.altitude;
        let s = &self.spectral;

        writeln!(f, "{:*^79}", " 6S atmospheric conditions ")?;
        writeln!(f, "geometrical conditions: {}", geometry_name(g.igeom))?;
        writeln!(
            f,
            "  month {:2} day {:2}   solar zenith {:7.2}°   solar azimuth {:7.2}°",
            g.month, g.jday, g.asol, g.phi0
        )?;
        writeln!(
            f,
            "  view zenith {:7.2}°   view azimuth {:7.2}°   scattering angle {:7.2}°",
            g.avis, g.phiv, g.adif
        )?;
        writeln!(f, "atmospheric model: {}", atmosphere_name(atms.idatm))?;
        writeln!(
            f,
            "  water vapour {:.3} g/cm²   ozone {:.3} cm-atm",
            atms.uw, atms.uo3
        )?;
        writeln!(f, "aerosol model: {}", aerosol_name(self.aerosol.iaer))?;
        if self.aerosol.iaer == 4 {
            let c = &self.aerosol.c;
            writeln!(
                f,
                "  dust {:.3}   water-soluble {:.3}   oceanic {:.3}   soot {:.3}",
                c[0], c[1], c[2], c[3]
            )?;
        }
        writeln!(
            f,
            "  optical depth at 550 nm {:.4}   visibility {:.2} km",
            conc.taer55, conc.v
        )?;
        match alt.target {
            TargetElevation::SeaLevel => writeln!(f, "target at sea level")?,
            TargetElevation::Above(km) => writeln!(f, "target at {km:.3} km")?,
        }
        match alt.sensor {
            SensorPlatform::Ground => writeln!(f, "sensor on the ground")?,
            SensorPlatform::Satellite => writeln!(f, "sensor on a satellite")?,
            SensorPlatform::Aircraft { .. } => writeln!(
                f,
                "sensor on an aircraft at {:.3} km, {:.1} hPa, taer55 below {:.4}",
                alt.palt, alt.pps, alt.taer55p
            )?,
        }
        match sensor_band(s.iwave) {
            Some(band) => writeln!(f, "spectral band: {}", band.name)?,
            None if s.iwave == -1 => writeln!(f, "monochromatic: {:.4} µm", s.wlinf)?,
            None => writeln!(f, "spectral band: user defined")?,
        }
        writeln!(
            f,
            "  {:.4} to {:.4} µm, equivalent wavelength {:.4} µm",
            s.wlinf, s.wlsup, s.wlmoy
        )?;
        write!(f, "{:*^79}", "")
    }
}
