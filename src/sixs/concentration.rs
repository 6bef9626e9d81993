//! Aerosol concentration: optical depth at 550 nm or horizontal visibility.

use log::{debug, warn};

use super::atmosphere::{Profile, NLEVELS};
use super::conditions::ConditionsReader;
use crate::error::SixsError;

/// Aerosol extinction per particle density (km⁻¹ per cm⁻³ × 1e3).
const SIGMA: f64 = 0.056032;

/// Aerosol number density profile for a 5 km visibility.
const AN5: [f64; NLEVELS] = [
    1.378E+04, 5.030E+03, 1.844E+03, 6.731E+02, 2.453E+02, 8.987E+01, 6.337E+01, 5.890E+01,
    6.069E+01, 5.818E+01, 5.675E+01, 5.317E+01, 5.585E+01, 5.156E+01, 5.048E+01, 4.744E+01,
    4.511E+01, 4.458E+01, 4.314E+01, 3.634E+01, 2.667E+01, 1.933E+01, 1.455E+01, 1.113E+01,
    8.826E+00, 7.429E+00, 2.238E+00, 5.890E-01, 1.550E-01, 4.082E-02, 1.078E-02, 5.550E-05,
    1.969E-08, 0.,
];

/// Aerosol number density profile for a 23 km visibility.
const AN23: [f64; NLEVELS] = [
    2.828E+03, 1.244E+03, 5.371E+02, 2.256E+02, 1.192E+02, 8.987E+01, 6.337E+01, 5.890E+01,
    6.069E+01, 5.818E+01, 5.675E+01, 5.317E+01, 5.585E+01, 5.156E+01, 5.048E+01, 4.744E+01,
    4.511E+01, 4.458E+01, 4.314E+01, 3.634E+01, 2.667E+01, 1.933E+01, 1.455E+01, 1.113E+01,
    8.826E+00, 7.429E+00, 2.238E+00, 5.890E-01, 1.550E-01, 4.082E-02, 1.078E-02, 5.550E-05,
    1.969E-08, 0.,
];

/// Aerosol optical depth at 550 nm for a horizontal visibility `v` (km).
///
/// The number density at each level is interpolated in `1/v` between the 5 km
/// and 23 km reference profiles and the extinction is integrated over the
/// lowest 32 layers.
pub(crate) fn oda550(iaer: i32, v: f64, profile: &Profile) -> f64 {
    if v == 0. || iaer == 0 {
        return 0.;
    }
    let density = |k: usize| {
        let az = (115. / 18.) * (AN5[k] - AN23[k]);
        let bz = 5. * AN5[k] / 18. - 23. * AN23[k] / 18.;
        az / v - bz
    };

    let mut taer55 = 0.;
    for k in 0..32 {
        let dz = profile.z[k + 1] - profile.z[k];
        let (bnz, bnz1) = (density(k), density(k + 1));
        if bnz <= 0. || bnz1 <= 0. {
            // Only happens for visibilities far beyond the 23 km reference
            continue;
        }
        let ev = dz * ((bnz.ln() + bnz1.ln()) / 2.).exp();
        taer55 += ev * SIGMA * 1e-3;
    }
    taer55
}

/// Visibility (km) equivalent to an optical depth at 550 nm.
pub(crate) fn visibility_from_depth(taer55: f64) -> f64 {
    (-(taer55 / 2.7628).ln() / 0.79902).exp()
}

/// Aerosol amount: optical depth at 550 nm and the matching visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct AerosolConcentration {
    /// Aerosol optical depth at 550 nm
    pub taer55: f64,
    /// Horizontal visibility in km, or a negative value when not given
    pub v: f64,
}

impl AerosolConcentration {
    /// Concentration from a visibility in km. A negative visibility means no
    /// aerosols.
    pub fn from_visibility(iaer: i32, v: f64, profile: &Profile) -> Self {
        let taer55 = if v > 0. { oda550(iaer, v, profile) } else { 0. };
        Self { taer55, v }
    }

    /// Concentration from an optical depth at 550 nm.
    pub fn from_depth(iaer: i32, taer55: f64) -> Self {
        let taer55 = if iaer == 0 { 0. } else { taer55 };
        Self {
            taer55,
            v: visibility_from_depth(taer55),
        }
    }

    /// Re-derive the optical depth for a new visibility.
    pub fn set_visibility(&mut self, iaer: i32, v: f64, profile: &Profile) {
        *self = Self::from_visibility(iaer, v, profile);
    }

    pub(crate) fn parse(
        reader: &mut ConditionsReader<'_>,
        iaer: i32,
        profile: &Profile,
    ) -> Result<Self, SixsError> {
        let v = reader.real("visibility")?;
        reader.end_line();
        let conc = if v == 0. {
            let taer55 = reader.real("aerosol optical depth at 550 nm")?;
            reader.end_line();
            Self::from_depth(iaer, taer55)
        } else {
            if v < 0. {
                warn!("negative visibility: no aerosols");
            }
            Self::from_visibility(iaer, v, profile)
        };
        debug!("visibility {:.2} km, taer55 = {:.4}", conc.v, conc.taer55);
        Ok(conc)
    }
}
