//! Gaseous absorption.
//!
//! Each gas is described by a handful of absorption bands with a Gaussian
//! profile in wavelength. The transmittance along a path with absorber amount
//! `u` and air mass `m` is `exp(-(k(λ)·u·m)^n)`, where the exponent `n` is 1
//! for ozone (a continuum absorber) and below 1 for the line absorbers, whose
//! band-averaged absorption saturates.
//!
//! NOTE: the Gaussian bands are a reconstruction standing in for the 6S
//! random exponential band tables. Transmittances inside the strong water
//! vapour and oxygen bands do not match 6S.

/// One absorption band.
#[derive(Debug, Clone, Copy)]
struct Band {
    /// Band center (µm)
    center: f64,
    /// Gaussian half width (µm)
    width: f64,
    /// Absorption coefficient at the band center, per unit absorber amount
    strength: f64,
}

const fn b(center: f64, width: f64, strength: f64) -> Band {
    Band {
        center,
        width,
        strength,
    }
}

/// Absorption bands of one gas.
#[derive(Debug)]
struct Gas {
    bands: &'static [Band],
    exponent: f64,
}

impl Gas {
    fn coefficient(&self, wl: f64) -> f64 {
        self.bands
            .iter()
            .map(|band| {
                let x = (wl - band.center) / band.width;
                if x.abs() > 6. {
                    0.
                } else {
                    band.strength * (-x * x).exp()
                }
            })
            .sum()
    }

    fn transmittance(&self, k: f64, path: f64) -> f64 {
        if k <= 0. || path <= 0. {
            1.
        } else {
            (-(k * path).powf(self.exponent)).exp()
        }
    }
}

/// Water vapour, per g/cm². Reconstructed band parameters.
const WATER: Gas = Gas {
    bands: &[
        b(0.592, 0.006, 0.0008),
        b(0.652, 0.008, 0.001),
        b(0.723, 0.010, 0.006),
        b(0.822, 0.014, 0.02),
        b(0.935, 0.025, 0.8),
        b(1.135, 0.030, 0.6),
        b(1.380, 0.050, 20.),
        b(1.870, 0.060, 30.),
        b(2.680, 0.120, 100.),
        b(3.200, 0.100, 2.),
    ],
    exponent: 0.5,
};

/// Ozone, per cm-atm: Huggins bands in the ultraviolet and the Chappuis
/// band in the visible.
const OZONE: Gas = Gas {
    bands: &[
        b(0.255, 0.030, 300.),
        b(0.300, 0.020, 10.),
        b(0.320, 0.015, 1.),
        b(0.575, 0.060, 0.09),
        b(0.605, 0.050, 0.05),
        b(0.690, 0.060, 0.01),
        b(3.270, 0.040, 0.5),
    ],
    exponent: 1.,
};

/// Oxygen, per standard column.
const OXYGEN: Gas = Gas {
    bands: &[
        b(0.628, 0.003, 0.3),
        b(0.688, 0.004, 5.),
        b(0.762, 0.005, 50.),
        b(1.268, 0.010, 2.),
    ],
    exponent: 0.5,
};

/// Carbon dioxide, per standard column.
const CARBON_DIOXIDE: Gas = Gas {
    bands: &[
        b(1.430, 0.010, 0.5),
        b(1.600, 0.020, 0.5),
        b(2.010, 0.020, 20.),
        b(2.060, 0.015, 10.),
        b(2.700, 0.050, 100.),
    ],
    exponent: 0.5,
};

/// Methane, per standard column.
const METHANE: Gas = Gas {
    bands: &[b(1.670, 0.015, 0.5), b(2.320, 0.050, 1.), b(3.310, 0.050, 50.)],
    exponent: 0.5,
};

/// Nitrous oxide, per standard column.
const NITROUS_OXIDE: Gas = Gas {
    bands: &[b(2.870, 0.020, 0.5), b(3.900, 0.050, 1.)],
    exponent: 0.5,
};

/// Carbon monoxide, per standard column.
const CARBON_MONOXIDE: Gas = Gas {
    bands: &[b(2.350, 0.020, 0.1)],
    exponent: 0.5,
};

/// Downward (sun to target), upward (target to sensor), and total
/// transmittances of one gas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GasPath {
    /// Transmittance from the top of the atmosphere to the target
    pub down: f64,
    /// Transmittance from the target to the sensor
    pub up: f64,
    /// Transmittance along the sun-target-sensor path
    pub total: f64,
}

impl GasPath {
    const CLEAR: Self = Self {
        down: 1.,
        up: 1.,
        total: 1.,
    };
}

/// Transmittances of all the absorbing gases at one wavelength.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GasTransmittances {
    /// Water vapour
    pub water: GasPath,
    /// Ozone
    pub ozone: GasPath,
    /// Oxygen
    pub oxygen: GasPath,
    /// Carbon dioxide
    pub carbon_dioxide: GasPath,
    /// Methane
    pub methane: GasPath,
    /// Nitrous oxide
    pub nitrous_oxide: GasPath,
    /// Carbon monoxide
    pub carbon_monoxide: GasPath,
}

impl GasTransmittances {
    fn gases(&self) -> [&GasPath; 7] {
        [
            &self.water,
            &self.ozone,
            &self.oxygen,
            &self.carbon_dioxide,
            &self.methane,
            &self.nitrous_oxide,
            &self.carbon_monoxide,
        ]
    }

    fn gases_mut(&mut self) -> [&mut GasPath; 7] {
        [
            &mut self.water,
            &mut self.ozone,
            &mut self.oxygen,
            &mut self.carbon_dioxide,
            &mut self.methane,
            &mut self.nitrous_oxide,
            &mut self.carbon_monoxide,
        ]
    }

    /// Add `other` weighted by `coef`.
    pub(crate) fn accumulate(&mut self, other: &Self, coef: f64) {
        for (sum, g) in self.gases_mut().into_iter().zip(other.gases()) {
            sum.down += g.down * coef;
            sum.up += g.up * coef;
            sum.total += g.total * coef;
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        for g in self.gases_mut() {
            g.down *= factor;
            g.up *= factor;
            g.total *= factor;
        }
    }

    /// Product of the downward transmittances.
    pub fn down(&self) -> f64 {
        self.gases().iter().map(|g| g.down).product()
    }

    /// Product of the upward transmittances.
    pub fn up(&self) -> f64 {
        self.gases().iter().map(|g| g.up).product()
    }

    /// Product of the total transmittances.
    pub fn total(&self) -> f64 {
        self.gases().iter().map(|g| g.total).product()
    }

    /// Product of the total transmittances of every gas but water vapour.
    pub(crate) fn total_dry(&self) -> f64 {
        self.gases().iter().skip(1).map(|g| g.total).product()
    }
}

/// Absorber amounts along the two legs of the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Absorbers {
    /// Atmosphere model selector; 0 means no gaseous absorption
    pub(crate) idatm: i32,
    /// Sensor regime (0 ground, 4 satellite, 2 or 8 aircraft)
    pub(crate) idatmp: i32,
    /// Water vapour above the target (g/cm²)
    pub(crate) uw: f64,
    /// Ozone above the target (cm-atm)
    pub(crate) uo3: f64,
    /// Water vapour between the target and the aircraft (g/cm²)
    pub(crate) puw: f64,
    /// Ozone between the target and the aircraft (cm-atm)
    pub(crate) puo3: f64,
    /// Mixed-gas column above the target, relative to a sea-level column
    pub(crate) column: f64,
    /// Mixed-gas column between the target and the aircraft, relative to a
    /// sea-level column
    pub(crate) plane_column: f64,
}

impl Absorbers {
    /// The same absorbers with half of the water vapour.
    pub(crate) fn half_water(&self) -> Self {
        Self {
            uw: self.uw / 2.,
            puw: self.puw / 2.,
            ..*self
        }
    }

    /// Amounts on the upward leg, or `None` for a ground sensor.
    fn upward(&self, down: f64, plane: f64) -> Option<f64> {
        match self.idatmp {
            0 => None,
            4 => Some(down),
            _ => Some(plane),
        }
    }
}

fn path(gas: &Gas, wl: f64, xmus: f64, xmuv: f64, down: f64, up: Option<f64>) -> GasPath {
    let k = gas.coefficient(wl);
    if k <= 0. {
        return GasPath::CLEAR;
    }
    let ms = 1. / xmus;
    let mv = 1. / xmuv;
    let up_amount = up.unwrap_or(0.);
    GasPath {
        down: gas.transmittance(k, down * ms),
        up: gas.transmittance(k, up_amount * mv),
        total: gas.transmittance(k, down * ms + up_amount * mv),
    }
}

/// Gaseous transmittances at wavelength `wl` (µm) for the sun and view
/// cosines `xmus` and `xmuv`.
pub(crate) fn abstra(wl: f64, xmus: f64, xmuv: f64, abs: &Absorbers) -> GasTransmittances {
    if abs.idatm == 0 {
        return GasTransmittances {
            water: GasPath::CLEAR,
            ozone: GasPath::CLEAR,
            oxygen: GasPath::CLEAR,
            carbon_dioxide: GasPath::CLEAR,
            methane: GasPath::CLEAR,
            nitrous_oxide: GasPath::CLEAR,
            carbon_monoxide: GasPath::CLEAR,
        };
    }
    let mixed = |gas: &Gas| {
        path(
            gas,
            wl,
            xmus,
            xmuv,
            abs.column,
            abs.upward(abs.column, abs.plane_column),
        )
    };
    GasTransmittances {
        water: path(&WATER, wl, xmus, xmuv, abs.uw, abs.upward(abs.uw, abs.puw)),
        ozone: path(&OZONE, wl, xmus, xmuv, abs.uo3, abs.upward(abs.uo3, abs.puo3)),
        oxygen: mixed(&OXYGEN),
        carbon_dioxide: mixed(&CARBON_DIOXIDE),
        methane: mixed(&METHANE),
        nitrous_oxide: mixed(&NITROUS_OXIDE),
        carbon_monoxide: mixed(&CARBON_MONOXIDE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn satellite() -> Absorbers {
        Absorbers {
            idatm: 6,
            idatmp: 4,
            uw: 1.424,
            uo3: 0.344,
            puw: 0.,
            puo3: 0.,
            column: 1.,
            plane_column: 0.,
        }
    }

    #[test]
    fn no_absorption_without_atmosphere() {
        let abs = Absorbers {
            idatm: 0,
            ..satellite()
        };
        let t = abstra(0.94, 0.8, 0.9, &abs);
        assert_eq!(t.total(), 1.);
    }

    #[test]
    fn absorption_bands() {
        let abs = satellite();
        // Deep in the 1.38 µm water band
        assert!(abstra(1.38, 0.8, 0.9, &abs).water.total < 0.01);
        // Chappuis ozone band in the visible
        let t = abstra(0.6, 0.8, 0.9, &abs);
        assert!(t.ozone.total < 0.99 && t.ozone.total > 0.85);
        // Oxygen A band
        assert!(abstra(0.762, 0.8, 0.9, &abs).oxygen.down < 0.1);
        // A window
        assert!(abstra(0.87, 0.8, 0.9, &abs).total() > 0.9);
    }

    #[test]
    fn ozone_is_linear_in_path() {
        let t = abstra(0.6, 0.7, 0.9, &satellite()).ozone;
        assert_relative_eq!(t.total, t.down * t.up, max_relative = 1e-12);
    }

    #[test]
    fn ground_sensor_has_no_upward_absorption() {
        let abs = Absorbers {
            idatmp: 0,
            ..satellite()
        };
        let t = abstra(0.94, 0.8, 0.9, &abs);
        assert_eq!(t.up(), 1.);
        assert_relative_eq!(t.water.total, t.water.down);
    }

    #[test]
    fn half_water_transmits_more() {
        let abs = satellite();
        let full = abstra(0.94, 0.8, 0.9, &abs);
        let half = abstra(0.94, 0.8, 0.9, &abs.half_water());
        assert!(half.water.total > full.water.total);
        assert_eq!(half.ozone, full.ozone);
    }

    #[test]
    fn weighted_average() {
        let abs = satellite();
        let a = abstra(0.6, 0.8, 0.9, &abs);
        let b = abstra(0.94, 0.8, 0.9, &abs);
        let mut sum = GasTransmittances::default();
        sum.accumulate(&a, 1.);
        sum.accumulate(&b, 3.);
        sum.scale(0.25);
        assert_relative_eq!(sum.water.total, 0.25 * a.water.total + 0.75 * b.water.total);
        assert_relative_eq!(sum.ozone.down, 0.25 * a.ozone.down + 0.75 * b.ozone.down);
    }
}
