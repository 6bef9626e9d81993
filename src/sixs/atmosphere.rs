//! Vertical atmosphere profiles.
//!
//! The canned profiles are the McClatchey standard atmospheres: altitude (km),
//! pressure (hPa), temperature (K), water vapour density (g/m³), and ozone
//! density (g/m³) on 34 levels.

use log::debug;

use super::conditions::ConditionsReader;
use crate::error::SixsError;

/// Number of levels in every profile.
pub const NLEVELS: usize = 34;

/// Integrated water vapour (g/cm²) of the US-62 profile.
pub(crate) const US62_UW: f64 = 1.424;

/// Integrated ozone (cm-atm) of the US-62 profile.
pub(crate) const US62_UO3: f64 = 0.344;

/// Gravity acceleration (cm/s² / 10) used for the hydrostatic integration.
const G: f64 = 98.1;

/// A 34-level atmosphere profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Altitude in km
    pub z: [f64; NLEVELS],
    /// Pressure in hPa
    pub p: [f64; NLEVELS],
    /// Temperature in K
    pub t: [f64; NLEVELS],
    /// Water vapour density in g/m³
    pub wh: [f64; NLEVELS],
    /// Ozone density in g/m³
    pub wo: [f64; NLEVELS],
}

/// Atmospheric model: a profile plus its integrated absorber contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Atmosphere {
    /// Atmospheric model selector
    pub idatm: i32,
    /// Vertical profile
    pub profile: Profile,
    /// Integrated water vapour in g/cm²
    pub uw: f64,
    /// Integrated ozone in cm-atm
    pub uo3: f64,
}

const Z: [f64; NLEVELS] = [
    0., 1., 2., 3., 4., 5., 6., 7., 8., 9., 10., 11., 12., 13., 14., 15., 16., 17., 18., 19., 20.,
    21., 22., 23., 24., 25., 30., 35., 40., 45., 50., 70., 100., 99999.,
];

/// Water vapour density above 12 km, shared by most of the models
const WH_STRAT: [f64; 19] = [
    1.8e-3, 1.0e-3, 7.6e-4, 6.4e-4, 5.6e-4, 5.0e-4, 4.9e-4, 4.5e-4, 5.1e-4, 5.1e-4, 5.4e-4,
    6.0e-4, 6.7e-4, 3.6e-4, 1.1e-4, 4.3e-5, 1.9e-5, 6.3e-6, 1.4e-7,
];

/// Upper ozone levels shared by most of the models
const WO_TOP: [f64; 5] = [9.2e-5, 4.1e-5, 1.3e-5, 4.3e-6, 8.6e-8];

fn merge(low: &[f64], high: &[f64], top: &[f64]) -> [f64; NLEVELS] {
    let mut out = [0.; NLEVELS];
    for (o, v) in out.iter_mut().zip(low.iter().chain(high).chain(top)) {
        *o = *v;
    }
    out
}

fn tropical() -> Profile {
    Profile {
        z: Z,
        p: [
            1.013e3, 9.04e2, 8.05e2, 7.15e2, 6.33e2, 5.59e2, 4.92e2, 4.32e2, 3.78e2, 3.29e2,
            2.86e2, 2.47e2, 2.13e2, 1.82e2, 1.56e2, 1.32e2, 1.11e2, 9.37e1, 7.89e1, 6.66e1,
            5.65e1, 4.8e1, 4.09e1, 3.5e1, 3.0e1, 2.57e1, 1.22e1, 6.0, 3.05, 1.59, 8.54e-1, 5.79e-2,
            3.0e-4, 0.,
        ],
        t: [
            300., 294., 288., 284., 277., 270., 264., 257., 250., 244., 237., 230., 224., 217.,
            210., 204., 197., 195., 199., 203., 207., 211., 215., 217., 219., 221., 232., 243.,
            254., 265., 270., 219., 210., 210.,
        ],
        wh: merge(
            &[19., 13., 9.3, 4.7, 2.2, 1.5, 0.85, 0.47, 0.25, 0.12, 0.05, 0.017, 0.006],
            &WH_STRAT,
            &[1.0e-9, 0.],
        ),
        wo: merge(
            &[
                5.6e-5, 5.6e-5, 5.4e-5, 5.1e-5, 4.7e-5, 4.5e-5, 4.3e-5, 4.1e-5, 3.9e-5, 3.9e-5,
                3.9e-5, 4.1e-5, 4.3e-5, 4.5e-5, 4.5e-5, 4.7e-5, 4.7e-5, 6.9e-5, 9.0e-5, 1.4e-4,
                1.9e-4, 2.4e-4, 2.8e-4, 3.2e-4, 3.4e-4, 3.4e-4, 2.4e-4,
            ],
            &WO_TOP,
            &[4.3e-11, 0.],
        ),
    }
}

fn midlatitude_summer() -> Profile {
    Profile {
        z: Z,
        p: [
            1.013e3, 9.02e2, 8.02e2, 7.1e2, 6.28e2, 5.54e2, 4.87e2, 4.26e2, 3.72e2, 3.24e2,
            2.81e2, 2.43e2, 2.09e2, 1.79e2, 1.53e2, 1.3e2, 1.11e2, 9.5e1, 8.12e1, 6.95e1, 5.95e1,
            5.1e1, 4.37e1, 3.76e1, 3.22e1, 2.77e1, 1.32e1, 6.52, 3.33, 1.76, 9.51e-1, 6.71e-2,
            3.0e-4, 0.,
        ],
        t: [
            294., 290., 285., 279., 273., 267., 261., 255., 248., 242., 235., 229., 222., 216.,
            216., 216., 216., 216., 216., 217., 218., 219., 220., 222., 223., 224., 234., 245.,
            258., 270., 276., 218., 210., 210.,
        ],
        wh: merge(
            &[14., 9.3, 5.9, 3.3, 1.9, 1.0, 0.61, 0.37, 0.21, 0.12, 0.064, 0.022, 0.006],
            &WH_STRAT,
            &[1.0e-9, 0.],
        ),
        wo: merge(
            &[
                6.0e-5, 6.0e-5, 6.0e-5, 6.2e-5, 6.4e-5, 6.6e-5, 6.9e-5, 7.5e-5, 7.9e-5, 8.6e-5,
                9.0e-5, 1.1e-4, 1.2e-4, 1.5e-4, 1.8e-4, 1.9e-4, 2.1e-4, 2.4e-4, 2.8e-4, 3.2e-4,
                3.4e-4, 3.6e-4, 3.6e-4, 3.4e-4, 3.2e-4, 3.0e-4, 2.0e-4,
            ],
            &WO_TOP,
            &[4.3e-11, 0.],
        ),
    }
}

fn midlatitude_winter() -> Profile {
    Profile {
        z: Z,
        p: [
            1.018e3, 8.973e2, 7.897e2, 6.938e2, 6.081e2, 5.313e2, 4.627e2, 4.016e2, 3.473e2,
            2.992e2, 2.568e2, 2.199e2, 1.882e2, 1.61e2, 1.378e2, 1.178e2, 1.007e2, 8.61e1,
            7.35e1, 6.28e1, 5.37e1, 4.58e1, 3.91e1, 3.34e1, 2.86e1, 2.43e1, 1.11e1, 5.18, 2.53,
            1.29, 6.82e-1, 4.67e-2, 3.0e-4, 0.,
        ],
        t: [
            272.2, 268.7, 265.2, 261.7, 255.7, 249.7, 243.7, 237.7, 231.7, 225.7, 219.7, 219.2,
            218.7, 218.2, 217.7, 217.2, 216.7, 216.2, 215.7, 215.2, 215.2, 215.2, 215.2, 215.2,
            215.2, 215.2, 217.4, 227.8, 243.2, 258.5, 265.7, 230.7, 210.2, 210.,
        ],
        wh: merge(
            &[
                3.5, 2.5, 1.8, 1.2, 0.66, 0.38, 0.21, 0.085, 0.035, 0.016, 0.0075, 0.0069, 0.006,
            ],
            &WH_STRAT,
            &[1.0e-9, 0.],
        ),
        wo: merge(
            &[
                6.0e-5, 5.4e-5, 4.9e-5, 4.9e-5, 4.9e-5, 5.8e-5, 6.4e-5, 7.7e-5, 9.0e-5, 1.2e-4,
                1.6e-4, 2.1e-4, 2.6e-4, 3.0e-4, 3.2e-4, 3.4e-4, 3.6e-4, 3.9e-4, 4.1e-4, 4.3e-4,
                4.5e-4, 4.3e-4, 4.3e-4, 3.9e-4, 3.6e-4, 3.4e-4, 1.9e-4,
            ],
            &WO_TOP,
            &[4.3e-11, 0.],
        ),
    }
}

fn subarctic_summer() -> Profile {
    Profile {
        z: Z,
        p: [
            1.01e3, 8.96e2, 7.929e2, 7.0e2, 6.16e2, 5.41e2, 4.73e2, 4.13e2, 3.59e2, 3.107e2,
            2.677e2, 2.3e2, 1.977e2, 1.7e2, 1.46e2, 1.25e2, 1.08e2, 9.28e1, 7.98e1, 6.86e1,
            5.89e1, 5.07e1, 4.36e1, 3.75e1, 3.227e1, 2.78e1, 1.34e1, 6.61, 3.4, 1.81, 9.87e-1,
            7.07e-2, 3.0e-4, 0.,
        ],
        t: [
            287., 282., 276., 271., 266., 260., 253., 246., 239., 232., 225., 225., 225., 225.,
            225., 225., 225., 225., 225., 225., 225., 225., 226., 228., 229., 231., 236., 253.,
            266., 275., 277., 216., 210., 210.,
        ],
        wh: merge(
            &[9.1, 6.0, 4.2, 2.7, 1.7, 1.0, 0.54, 0.29, 0.13, 0.042, 0.015, 0.0094, 0.006],
            &WH_STRAT,
            &[1.0e-9, 0.],
        ),
        wo: merge(
            &[
                4.9e-5, 5.4e-5, 5.6e-5, 5.8e-5, 6.0e-5, 6.4e-5, 7.1e-5, 7.5e-5, 7.9e-5, 1.1e-4,
                1.3e-4, 1.8e-4, 2.1e-4, 2.6e-4, 2.8e-4, 3.2e-4, 3.4e-4, 3.9e-4, 4.1e-4, 4.1e-4,
                3.9e-4, 3.6e-4, 3.2e-4, 3.0e-4, 2.8e-4, 2.6e-4, 1.4e-4,
            ],
            &WO_TOP,
            &[4.3e-11, 0.],
        ),
    }
}

fn subarctic_winter() -> Profile {
    Profile {
        z: Z,
        p: [
            1.013e3, 8.878e2, 7.775e2, 6.798e2, 5.932e2, 5.158e2, 4.467e2, 3.853e2, 3.308e2,
            2.829e2, 2.418e2, 2.067e2, 1.766e2, 1.51e2, 1.291e2, 1.103e2, 9.431e1, 8.058e1,
            6.882e1, 5.875e1, 5.014e1, 4.277e1, 3.647e1, 3.109e1, 2.649e1, 2.256e1, 1.02e1,
            4.701, 2.243, 1.113, 5.719e-1, 4.016e-2, 3.0e-4, 0.,
        ],
        t: [
            257.1, 259.1, 255.9, 252.7, 247.7, 240.9, 234.1, 227.3, 220.6, 217.2, 217.2, 217.2,
            217.2, 217.2, 217.2, 217.2, 216.6, 216.0, 215.4, 214.8, 214.1, 213.6, 213.0, 212.4,
            211.8, 211.2, 216.0, 222.2, 234.7, 247.0, 259.3, 245.7, 210., 210.,
        ],
        wh: merge(
            &[
                1.2, 1.2, 0.94, 0.68, 0.41, 0.2, 0.098, 0.054, 0.011, 0.0084, 0.0055, 0.0038,
                0.0026,
            ],
            &WH_STRAT,
            &[1.0e-9, 0.],
        ),
        wo: merge(
            &[
                4.1e-5, 4.1e-5, 4.1e-5, 4.3e-5, 4.5e-5, 4.7e-5, 4.9e-5, 7.1e-5, 9.0e-5, 1.6e-4,
                2.4e-4, 3.2e-4, 4.3e-4, 4.7e-4, 4.9e-4, 5.6e-4, 6.2e-4, 6.2e-4, 6.2e-4, 6.0e-4,
                5.6e-4, 5.1e-4, 4.7e-4, 4.3e-4, 3.6e-4, 3.2e-4, 1.5e-4,
            ],
            &WO_TOP,
            &[4.3e-11, 0.],
        ),
    }
}

fn us62() -> Profile {
    Profile {
        z: Z,
        p: [
            1.013e3, 8.986e2, 7.95e2, 7.012e2, 6.166e2, 5.405e2, 4.722e2, 4.111e2, 3.565e2,
            3.08e2, 2.65e2, 2.27e2, 1.94e2, 1.658e2, 1.417e2, 1.211e2, 1.035e2, 8.85e1, 7.565e1,
            6.467e1, 5.529e1, 4.729e1, 4.047e1, 3.467e1, 2.972e1, 2.549e1, 1.197e1, 5.746,
            2.871, 1.491, 7.978e-1, 5.52e-2, 3.008e-4, 0.,
        ],
        t: [
            288.1, 281.6, 275.1, 268.7, 262.2, 255.7, 249.2, 242.7, 236.2, 229.7, 223.2, 216.8,
            216.6, 216.6, 216.6, 216.6, 216.6, 216.6, 216.6, 216.6, 216.6, 217.6, 218.6, 219.6,
            220.6, 221.6, 226.5, 236.5, 253.4, 264.2, 270.6, 219.7, 210., 210.,
        ],
        wh: [
            5.9, 4.2, 2.9, 1.8, 1.1, 0.64, 0.38, 0.21, 0.12, 0.046, 0.018, 0.0082, 0.0037,
            1.8e-3, 8.4e-4, 7.2e-4, 6.1e-4, 5.2e-4, 4.4e-4, 4.4e-4, 4.4e-4, 4.8e-4, 5.2e-4,
            5.7e-4, 6.1e-4, 6.6e-4, 3.8e-4, 1.6e-4, 6.7e-5, 3.2e-5, 1.2e-5, 1.5e-7, 1.0e-9, 0.,
        ],
        wo: [
            5.4e-5, 5.4e-5, 5.4e-5, 5.0e-5, 4.6e-5, 4.6e-5, 4.5e-5, 4.9e-5, 5.2e-5, 7.1e-5,
            9.0e-5, 1.3e-4, 1.6e-4, 1.7e-4, 1.9e-4, 2.1e-4, 2.4e-4, 2.8e-4, 3.2e-4, 3.5e-4,
            3.8e-4, 3.8e-4, 3.9e-4, 3.8e-4, 3.6e-4, 3.4e-4, 2.0e-4, 1.1e-4, 4.9e-5, 1.7e-5,
            4.0e-6, 8.6e-8, 4.3e-11, 0.,
        ],
    }
}

/// Integrated water vapour (g/cm²) and ozone (cm-atm) contents of a profile.
///
/// The mixing ratios are averaged over each layer and weighted by the layer's
/// pressure thickness, which is the hydrostatic column integral.
pub(crate) fn integrated_content(profile: &Profile) -> (f64, f64) {
    let air = 0.028964 / 0.0224;
    let ro3 = 0.048 / 0.0224;

    let mut rmwh = [0.; NLEVELS];
    let mut rmo3 = [0.; NLEVELS];
    for k in 0..NLEVELS - 1 {
        let roair = air * 273.16 * profile.p[k] / (1013.25 * profile.t[k]);
        rmwh[k] = profile.wh[k] / (roair * 1000.);
        rmo3[k] = profile.wo[k] / (roair * 1000.);
    }

    let p0 = profile.p[0];
    let (uw, uo3) = (1..NLEVELS - 1).fold((0., 0.), |(uw, uo3), k| {
        let ds = (profile.p[k - 1] - profile.p[k]) / p0;
        (
            uw + 0.5 * (rmwh[k] + rmwh[k - 1]) * ds,
            uo3 + 0.5 * (rmo3[k] + rmo3[k - 1]) * ds,
        )
    });

    let uw = uw * p0 * 100. / G;
    let uo3 = 1000. * (uo3 * p0 * 100. / G) / ro3;
    (uw, uo3)
}

impl Atmosphere {
    /// One of the canned atmospheric models (`idatm` 0 to 6).
    ///
    /// Model 0 is the US-62 profile; it is the caller's job to disable gas
    /// absorption for it.
    pub fn standard(idatm: i32) -> Result<Self, SixsError> {
        let profile = match idatm {
            0 | 6 => us62(),
            1 => tropical(),
            2 => midlatitude_summer(),
            3 => midlatitude_winter(),
            4 => subarctic_summer(),
            5 => subarctic_winter(),
            _ => return Err(SixsError::UnknownAtmosphere(idatm)),
        };
        let (uw, uo3) = integrated_content(&profile);
        Ok(Self {
            idatm,
            profile,
            uw,
            uo3,
        })
    }

    /// The US-62 profile shape with user-given integrated contents.
    pub fn with_contents(uw: f64, uo3: f64) -> Self {
        Self {
            idatm: 8,
            profile: us62(),
            uw,
            uo3,
        }
    }

    /// Parse the atmospheric model block.
    pub(crate) fn parse(reader: &mut ConditionsReader<'_>) -> Result<Self, SixsError> {
        let idatm = reader.int("atmospheric model")?;
        reader.end_line();

        let atms = match idatm {
            0..=6 => Self::standard(idatm)?,
            7 => {
                let mut profile = us62();
                for k in 0..NLEVELS {
                    let [z, p, t, wh, wo] = reader.reals("profile level (z p t wh wo)")?;
                    reader.end_line();
                    profile.z[k] = z;
                    profile.p[k] = p;
                    profile.t[k] = t;
                    profile.wh[k] = wh;
                    profile.wo[k] = wo;
                }
                let (uw, uo3) = integrated_content(&profile);
                Self {
                    idatm,
                    profile,
                    uw,
                    uo3,
                }
            }
            8 => {
                let [uw, uo3] = reader.reals("water vapour and ozone contents")?;
                reader.end_line();
                Self::with_contents(uw, uo3)
            }
            _ => return Err(SixsError::UnknownAtmosphere(idatm)),
        };

        debug!(
            "atmospheric model {}: uw = {:.3} g/cm², uo3 = {:.3} cm-atm",
            atms.idatm, atms.uw, atms.uo3
        );
        Ok(atms)
    }
}

/// Name of an atmospheric model.
pub(crate) fn atmosphere_name(idatm: i32) -> &'static str {
    match idatm {
        0 => "no gaseous absorption",
        1 => "tropical",
        2 => "midlatitude summer",
        3 => "midlatitude winter",
        4 => "subarctic summer",
        5 => "subarctic winter",
        6 => "us standard 62",
        7 => "user defined profile",
        8 => "user defined water vapor and ozone",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn us62_contents() {
        // The profile integrates to the well-known US-62 column amounts
        let atms = Atmosphere::standard(6).unwrap();
        assert_relative_eq!(atms.uw, US62_UW, max_relative = 0.005);
        assert_relative_eq!(atms.uo3, US62_UO3, max_relative = 0.005);
    }

    #[test]
    fn profiles_are_monotonic() {
        for idatm in 0..=6 {
            let atms = Atmosphere::standard(idatm).unwrap();
            let prof = &atms.profile;
            assert!(prof.z.windows(2).all(|w| w[0] < w[1]));
            assert!(prof.p.windows(2).all(|w| w[0] >= w[1]));
            assert!(atms.uw > 0. && atms.uo3 > 0.);
        }
        // Tropics are wetter than the subarctic winter
        let wet = Atmosphere::standard(1).unwrap().uw;
        let dry = Atmosphere::standard(5).unwrap().uw;
        assert!(wet > 5. * dry);
    }

    #[test]
    fn user_contents() {
        let atms = Atmosphere::parse(&mut ConditionsReader::new("8\n3.0 0.35\n")).unwrap();
        assert_eq!(atms.idatm, 8);
        assert_eq!(atms.uw, 3.0);
        assert_eq!(atms.uo3, 0.35);
        assert_eq!(atms.profile, us62());
    }

    #[test]
    fn user_profile() {
        let mut text = String::from("7\n");
        let base = us62();
        for k in 0..NLEVELS {
            text.push_str(&format!(
                "{} {} {} {} {}\n",
                base.z[k],
                base.p[k],
                base.t[k],
                2. * base.wh[k],
                base.wo[k]
            ));
        }
        let atms = Atmosphere::parse(&mut ConditionsReader::new(&text)).unwrap();
        let us = Atmosphere::standard(6).unwrap();
        assert_relative_eq!(atms.uw, 2. * us.uw, epsilon = 1e-12);
        assert_relative_eq!(atms.uo3, us.uo3, epsilon = 1e-12);
    }

    #[test]
    fn unknown_model() {
        assert!(matches!(
            Atmosphere::parse(&mut ConditionsReader::new("9\n")),
            Err(SixsError::UnknownAtmosphere(9))
        ));
    }
}
