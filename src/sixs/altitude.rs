//! Target elevation and sensor altitude.
//!
//! A target above sea level moves the bottom of the profile up to the target
//! (fewer molecules, less absorber). An airborne sensor splits the atmosphere
//! into the part below the plane, which affects the upward path, and the part
//! above it.

use log::{debug, warn};

use super::atmosphere::{integrated_content, Atmosphere, Profile, NLEVELS, US62_UO3, US62_UW};
use super::conditions::ConditionsReader;
use crate::error::SixsError;

/// Relative threshold below which the aerosol optical depth under the plane is
/// considered equal to the total.
const ACCU2: f64 = 1e-3;

/// Elevation of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetElevation {
    /// At sea level
    SeaLevel,
    /// At the given altitude in km
    Above(f64),
}

impl TargetElevation {
    /// Elevation from an altitude in km; zero or below is sea level.
    pub fn from_km(height: f64) -> Self {
        if height > 0. {
            TargetElevation::Above(height)
        } else {
            TargetElevation::SeaLevel
        }
    }
}

/// Where the sensor observes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorPlatform {
    /// On the ground, looking at the target
    Ground,
    /// Airborne at the given altitude above the target
    Aircraft {
        /// Altitude of the plane above the target in km
        altitude_km: f64,
        /// Water vapour (g/cm²) and ozone (cm-atm) below the plane, if known
        gas: Option<(f64, f64)>,
        /// Aerosol optical depth at 550 nm below the plane, if known
        taer55p: Option<f64>,
    },
    /// Outside the atmosphere
    Satellite,
}

/// Target and sensor altitudes with the path quantities derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Altitude {
    /// Elevation of the target
    pub target: TargetElevation,
    /// Sensor platform
    pub sensor: SensorPlatform,
    /// Altitude of the sensor above the target in km (1000 for a satellite)
    pub palt: f64,
    /// Pressure at the sensor in hPa
    pub pps: f64,
    /// Path regime: 0 ground, 2 or 8 aircraft, 4 satellite
    pub idatmp: i32,
    /// Aerosol optical depth at 550 nm below the sensor
    pub taer55p: f64,
    /// Fraction of the Rayleigh optical depth below the sensor
    pub ftray: f64,
    /// Water vapour below the sensor in g/cm²
    pub puw: f64,
    /// Ozone below the sensor in cm-atm
    pub puo3: f64,
}

/// Profile truncated at the plane, with the quantities integrated over it.
#[derive(Debug, Clone)]
pub(crate) struct PlaneProfile {
    pub(crate) profile: Profile,
    pub(crate) puw: f64,
    pub(crate) puo3: f64,
    pub(crate) ftray: f64,
    pub(crate) palt: f64,
    pub(crate) pps: f64,
}

/// First level strictly above `x` (at least 1).
fn level_above(z: &[f64; NLEVELS], x: f64) -> usize {
    z.iter().position(|&zk| zk > x).unwrap_or(NLEVELS - 1).max(1)
}

/// Pressure, temperature, water vapour, and ozone at altitude `x` between the
/// levels `isup - 1` and `isup`. Pressure is interpolated in log, the rest
/// linearly.
fn level_at(profile: &Profile, isup: usize, x: f64) -> (f64, f64, f64, f64) {
    let iinf = isup - 1;
    let (z0, z1) = (profile.z[iinf], profile.z[isup]);
    let xa = (z1 - z0) / (profile.p[isup] / profile.p[iinf]).ln();
    let xb = z1 - xa * profile.p[isup].ln();
    let ps = ((x - xb) / xa).exp();

    let lin = |v: &[f64; NLEVELS]| v[iinf] + (v[isup] - v[iinf]) / (z1 - z0) * (x - z0);
    (ps, lin(&profile.t), lin(&profile.wh), lin(&profile.wo))
}

/// Move the bottom of the profile to the altitude `xps` (km), and recompute
/// the integrated contents.
///
/// Returns the contents integrated over the moved profile. For `idatm` 8 the
/// profile is the US-62 shape, and the user-given contents are scaled by the
/// fraction of the US-62 column left above the target.
pub(crate) fn pressure(atms: &mut Atmosphere, xps: f64) -> (f64, f64) {
    let xps = xps.min(99.99);
    let isup = level_above(&atms.profile.z, xps);
    let iinf = isup - 1;
    let (ps, xt, xwh, xwo) = level_at(&atms.profile, isup, xps);

    let old = atms.profile.clone();
    let p = &mut atms.profile;
    p.z[0] = xps;
    p.p[0] = ps;
    p.t[0] = xt;
    p.wh[0] = xwh;
    p.wo[0] = xwo;
    for i in 1..(33 - iinf) {
        p.z[i] = old.z[i + iinf];
        p.p[i] = old.p[i + iinf];
        p.t[i] = old.t[i + iinf];
        p.wh[i] = old.wh[i + iinf];
        p.wo[i] = old.wo[i + iinf];
    }
    // Fill the freed levels linearly up to the top
    let l = 32 - iinf;
    for i in l + 1..NLEVELS - 1 {
        let f = (i - l) as f64 / (33 - l) as f64;
        p.z[i] = p.z[l] + (p.z[33] - p.z[l]) * f;
        p.p[i] = p.p[l] + (p.p[33] - p.p[l]) * f;
        p.t[i] = p.t[l] + (p.t[33] - p.t[l]) * f;
        p.wh[i] = p.wh[l] + (p.wh[33] - p.wh[l]) * f;
        p.wo[i] = p.wo[l] + (p.wo[33] - p.wo[l]) * f;
    }

    let (uw, uo3) = integrated_content(&atms.profile);
    if atms.idatm == 8 {
        atms.uw *= uw / US62_UW;
        atms.uo3 *= uo3 / US62_UO3;
    } else {
        atms.uw = uw;
        atms.uo3 = uo3;
    }
    (uw, uo3)
}

/// Truncate the profile at a plane `xpp` km above its bottom level.
pub(crate) fn presplane(profile: &Profile, xpp: f64) -> PlaneProfile {
    let xpp = xpp + profile.z[0];
    let isup = level_above(&profile.z, xpp);
    let (ps, xt, xwh, xwo) = level_at(profile, isup, xpp);

    let mut plane = profile.clone();
    for i in isup..NLEVELS {
        plane.z[i] = xpp;
        plane.p[i] = ps;
        plane.t[i] = xt;
        plane.wh[i] = xwh;
        plane.wo[i] = xwo;
    }
    let (puw, puo3) = integrated_content(&plane);

    let column = |pr: &Profile| {
        (0..NLEVELS - 1)
            .map(|k| (pr.p[k + 1] / pr.t[k + 1] + pr.p[k] / pr.t[k]) * (pr.z[k + 1] - pr.z[k]))
            .sum::<f64>()
    };
    let ftray = column(&plane) / column(profile);

    PlaneProfile {
        palt: plane.z[NLEVELS - 1] - profile.z[0],
        pps: plane.p[NLEVELS - 1],
        profile: plane,
        puw,
        puo3,
        ftray,
    }
}

impl Altitude {
    pub fn new(target: TargetElevation, sensor: SensorPlatform) -> Self {
        Self {
            target,
            sensor,
            palt: 0.,
            pps: 0.,
            idatmp: 0,
            taer55p: 0.,
            ftray: 1.,
            puw: 0.,
            puo3: 0.,
        }
    }

    /// Change the target elevation (km). The derived quantities are only
    /// updated by the next [`Altitude::init`].
    pub fn set_height(&mut self, height: f64) {
        self.target = TargetElevation::from_km(height);
    }

    /// Move `atms` to the target elevation and derive the sensor path for an
    /// aerosol optical depth `taer55` at 550 nm.
    pub fn init(&mut self, atms: &mut Atmosphere, taer55: f64) {
        let (uwus, uo3us) = match self.target {
            TargetElevation::Above(xps) => pressure(atms, xps),
            TargetElevation::SeaLevel => (US62_UW, US62_UO3),
        };

        let (altitude_km, gas, taer55p) = match &self.sensor {
            SensorPlatform::Ground => {
                self.ground(atms.profile.p[0]);
                return;
            }
            SensorPlatform::Satellite => {
                self.satellite(taer55);
                return;
            }
            SensorPlatform::Aircraft {
                altitude_km,
                gas,
                taer55p,
            } => (*altitude_km, *gas, *taer55p),
        };
        if altitude_km + atms.profile.z[0] >= 100. {
            warn!("plane at {altitude_km} km is above the atmosphere, treated as a satellite");
            self.satellite(taer55);
            return;
        }

        let plane = presplane(&atms.profile, altitude_km);
        self.ftray = plane.ftray;
        self.palt = plane.palt;
        self.pps = plane.pps;
        match gas {
            Some((puw, puo3)) => {
                self.puw = puw;
                self.puo3 = puo3;
                self.idatmp = 8;
            }
            None if atms.idatm == 8 => {
                self.puw = plane.puw * atms.uw / uwus;
                self.puo3 = plane.puo3 * atms.uo3 / uo3us;
                self.idatmp = 8;
            }
            None => {
                self.puw = plane.puw;
                self.puo3 = plane.puo3;
                self.idatmp = 2;
            }
        }

        let palt = self.palt;
        self.taer55p = match taer55p {
            Some(tp) if taer55 - tp >= ACCU2 => {
                // Effective scale height of the aerosol below the plane
                let sham = (-palt / 4.).exp();
                let sha = 1. - tp / taer55;
                if sha >= sham {
                    taer55 * (1. - (-palt / 4.).exp())
                } else {
                    let sha = -palt / sha.ln();
                    taer55 * (1. - (-palt / sha).exp())
                }
            }
            // Assume a 2 km scale height
            _ => taer55 * (1. - (-palt / 2.).exp()),
        };
        debug!(
            "plane at {:.3} km: {:.1} hPa, ftray = {:.4}, taer55p = {:.4}",
            self.palt, self.pps, self.ftray, self.taer55p
        );
    }

    /// Same as [`Altitude::init`], for a new aerosol concentration.
    pub fn update_hv(&mut self, atms: &mut Atmosphere, taer55: f64) {
        self.init(atms, taer55);
    }

    fn ground(&mut self, surface_pressure: f64) {
        self.palt = 0.;
        self.pps = surface_pressure;
        self.idatmp = 0;
        self.taer55p = 0.;
        self.ftray = 1.;
        self.puw = 0.;
        self.puo3 = 0.;
    }

    fn satellite(&mut self, taer55: f64) {
        self.palt = 1000.;
        self.pps = 0.;
        self.idatmp = 4;
        self.taer55p = taer55;
        self.ftray = 1.;
        self.puw = 0.;
        self.puo3 = 0.;
    }

    /// Parse the target (`xps`) and sensor (`xpp`) altitude lines.
    ///
    /// Altitudes are given as negative numbers: `xps < 0` is a target at
    /// `-xps` km, `xpp` is 0 for a ground sensor, -1000 for a satellite, and
    /// otherwise an aircraft at `-xpp` km above the target.
    pub(crate) fn parse(reader: &mut ConditionsReader<'_>) -> Result<Self, SixsError> {
        let xps = reader.real("target altitude")?;
        reader.end_line();
        let xpp = reader.real("sensor altitude")?;
        reader.end_line();

        let target = TargetElevation::from_km(-xps);
        let sensor = if xpp >= 0. {
            SensorPlatform::Ground
        } else if xpp <= -100. {
            SensorPlatform::Satellite
        } else {
            let [puw, puo3] = reader.reals("water vapour and ozone below the plane")?;
            reader.end_line();
            let taer55p = reader.real("aerosol optical depth below the plane")?;
            reader.end_line();
            SensorPlatform::Aircraft {
                altitude_km: -xpp,
                gas: (puw >= 0.).then_some((puw, puo3)),
                taer55p: (taer55p >= 0.).then_some(taer55p),
            }
        };
        Ok(Self::new(target, sensor))
    }
}
