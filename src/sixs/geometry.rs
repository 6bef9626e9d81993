//! Sun and sensor geometry.
//!
//! Every geometrical condition ends with the same five numbers: the solar and
//! view zenith angles, their azimuths, and the date. The satellite-specific
//! conditions only differ in how they get there (pixel coordinates of a
//! geostationary image, AVHRR scan position, or a scene center for push-broom
//! instruments).

use std::f64::consts::PI;

use log::{info, warn};

use super::conditions::ConditionsReader;
use crate::error::SixsError;

/// Mean equatorial Earth radius in km.
const EARTH_RADIUS: f64 = 6378.155;

/// Resolved sun/sensor geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Geometrical conditions selector
    pub igeom: i32,
    /// Solar zenith angle in degrees
    pub asol: f64,
    /// Solar azimuth angle in degrees
    pub phi0: f64,
    /// View zenith angle in degrees
    pub avis: f64,
    /// View azimuth angle in degrees
    pub phiv: f64,
    /// Month of the acquisition
    pub month: i32,
    /// Day of the month of the acquisition
    pub jday: i32,
    /// Cosine of the solar zenith angle
    pub xmus: f64,
    /// Cosine of the view zenith angle
    pub xmuv: f64,
    /// Cosine of the relative azimuth
    pub xmup: f64,
    /// Cosine of the scattering angle, within [-1, 1]
    pub xmud: f64,
    /// Scattering angle in degrees
    pub adif: f64,
    /// Absolute azimuth difference in degrees
    pub phi: f64,
    /// Relative azimuth in radians, in [0, 2π)
    pub phirad: f64,
    /// Earth-Sun distance correction factor for the solar irradiance
    pub dsol: f64,
}

impl Geometry {
    /// Geometry from directly given angles (in degrees) and date.
    pub fn new(asol: f64, phi0: f64, avis: f64, phiv: f64, month: i32, jday: i32) -> Self {
        Self::derive(0, asol, phi0, avis, phiv, month, jday)
    }

    #[allow(clippy::too_many_arguments)]
    fn derive(
        igeom: i32,
        asol: f64,
        phi0: f64,
        avis: f64,
        phiv: f64,
        month: i32,
        jday: i32,
    ) -> Self {
        if asol > 90. {
            warn!("the sun is not raised (solar zenith angle {asol:.2}°)");
        }

        let dsol = varsol(jday, month);

        let phi = (phiv - phi0).abs();
        let mut phirad = (phi0 - phiv).to_radians();
        if phirad < 0. {
            phirad += 2. * PI;
        }
        if phirad >= 2. * PI {
            phirad -= 2. * PI;
        }

        let xmus = asol.to_radians().cos();
        let xmuv = avis.to_radians().cos();
        let xmup = phirad.cos();
        let xmud = (-xmus * xmuv - (1. - xmus * xmus).sqrt() * (1. - xmuv * xmuv).sqrt() * xmup)
            .clamp(-1., 1.);
        let adif = xmud.acos().to_degrees();

        Self {
            igeom,
            asol,
            phi0,
            avis,
            phiv,
            month,
            jday,
            xmus,
            xmuv,
            xmup,
            xmud,
            adif,
            phi,
            phirad,
            dsol,
        }
    }

    /// Parse the geometrical conditions block.
    pub(crate) fn parse(reader: &mut ConditionsReader<'_>) -> Result<Self, SixsError> {
        let igeom = reader.int("geometrical conditions")?;
        reader.end_line();

        let geom = match igeom {
            0 => {
                let [asol, phi0, avis, phiv] = reader.reals("solar and view angles")?;
                let month = reader.int("month")?;
                let jday = reader.int("day")?;
                Self::derive(0, asol, phi0, avis, phiv, month, jday)
            }
            1..=3 => {
                let month = reader.int("month")?;
                let jday = reader.int("day")?;
                let tu = reader.real("universal time")?;
                let nc = reader.real("pixel column")?;
                let nl = reader.real("pixel line")?;
                let sat = match igeom {
                    1 => Geostationary::METEOSAT,
                    2 => Geostationary::GOES_EAST,
                    _ => Geostationary::GOES_WEST,
                };
                let (asol, phi0, avis, phiv) = sat.angles(month, jday, tu, nc, nl);
                Self::derive(igeom, asol, phi0, avis, phiv, month, jday)
            }
            4 | 5 => {
                let month = reader.int("month")?;
                let jday = reader.int("day")?;
                let tu = reader.real("universal time")?;
                let nc = reader.real("pixel column")?;
                let xlonan = reader.real("longitude of the ascending node")?;
                let hna = reader.real("time of the ascending node")?;
                let campm = if igeom == 4 { 1. } else { -1. };
                let (asol, phi0, avis, phiv) = avhrr(campm, month, jday, tu, nc, xlonan, hna);
                Self::derive(igeom, asol, phi0, avis, phiv, month, jday)
            }
            6..=30 => {
                let month = reader.int("month")?;
                let jday = reader.int("day")?;
                let [tu, xlon, xlat] = reader.reals("time and scene center")?;
                let (asol, phi0) = possol(month, jday, tu, xlon, xlat);
                Self::derive(igeom, asol, phi0, 0., 0., month, jday)
            }
            _ => return Err(SixsError::UnknownGeometry(igeom)),
        };
        reader.end_line();

        info!(
            "{}: solar zenith {:.2}°, view zenith {:.2}°, scattering angle {:.2}°",
            geometry_name(igeom),
            geom.asol,
            geom.avis,
            geom.adif
        );
        Ok(geom)
    }
}

/// Name of the platform for a geometrical conditions selector.
pub(crate) fn geometry_name(igeom: i32) -> &'static str {
    const NAMES: [&str; 31] = [
        "user defined conditions",
        "meteosat observation",
        "goes east observation",
        "goes west observation",
        "avhrr (PM noaa)",
        "avhrr (AM noaa)",
        "h.r.v. observation",
        "t.m. observation",
        "etm+ observation",
        "liss observation",
        "aster observation",
        "avnir observation",
        "ikonos observation",
        "rapideye observation",
        "vgt1 (spot4) observation",
        "vgt2 (spot5) observation",
        "worldview2 observation",
        "quickbird observation",
        "landsat 8 observation",
        "geoeye1 observation",
        "spot6 observation",
        "avnir2 observation",
        "worldview3 observation",
        "pleiades1a observation",
        "pleiades1b observation",
        "worldview4 observation",
        "sentinel2a observation",
        "sentinel2b observation",
        "planetscope 0c0d observation",
        "planetscope 0e observation",
        "planetscope 0f10 observation",
    ];
    usize::try_from(igeom)
        .ok()
        .and_then(|i| NAMES.get(i))
        .copied()
        .unwrap_or("unknown")
}

/// Earth-Sun distance correction factor for a month and day.
pub(crate) fn varsol(jday: i32, month: i32) -> f64 {
    let j = day_number(jday, month);
    let om = (0.9856 * (j as f64 - 4.)).to_radians();
    1. / (1. - 0.01673 * om.cos()).powi(2)
}

/// Day of the year, with the month lengths approximated the traditional way.
fn day_number(jday: i32, month: i32) -> i32 {
    if month <= 2 {
        31 * (month - 1) + jday
    } else if month > 8 {
        31 * (month - 1) - (month - 2) / 2 - 2 + jday
    } else {
        31 * (month - 1) - (month - 1) / 2 - 2 + jday
    }
}

/// Solar zenith and azimuth angles, in degrees, at a place and time.
///
/// `tu` is the decimal universal time in hours, `xlon`/`xlat` are in degrees
/// (east and north positive).
pub(crate) fn possol(month: i32, jday: i32, tu: f64, xlon: f64, xlat: f64) -> (f64, f64) {
    let ia = day_number(jday, month);
    pos_fft(ia, tu, xlon, xlat)
}

/// Solar position from the day number using Fourier series for the equation
/// of time and the declination.
fn pos_fft(j: i32, tu: f64, xlon: f64, xlat: f64) -> (f64, f64) {
    // Mean solar time
    let tsm = tu + xlon / 15.;
    let xla = xlat.to_radians();
    let tet = 2. * PI * j as f64 / 365.;

    // Equation of time, in minutes
    let (a1, a2, a3, a4, a5) = (0.000075, 0.001868, 0.032077, 0.014615, 0.040849);
    let et = (a1 + a2 * tet.cos() - a3 * tet.sin() - a4 * (2. * tet).cos() - a5 * (2. * tet).sin())
        * 12.
        * 60.
        / PI;

    // True solar time and hour angle
    let tsv = tsm + et / 60. - 12.;
    let ah = (tsv * 15.).to_radians();

    // Solar declination
    let (b1, b2, b3, b4, b5, b6, b7) = (
        0.006918, 0.399912, 0.070257, 0.006758, 0.000907, 0.002697, 0.001480,
    );
    let delta = b1 - b2 * tet.cos() + b3 * tet.sin() - b4 * (2. * tet).cos()
        + b5 * (2. * tet).sin()
        - b6 * (3. * tet).cos()
        + b7 * (3. * tet).sin();

    let amuzero = xla.sin() * delta.sin() + xla.cos() * delta.cos() * ah.cos();
    let elev = amuzero.clamp(-1., 1.).asin();
    let az = (delta.cos() * ah.sin() / elev.cos()).clamp(-1., 1.);
    let caz = (-xla.cos() * delta.sin() + xla.sin() * delta.cos() * ah.cos()) / elev.cos();
    let mut azim = az.asin();
    if caz <= 0. {
        azim = PI - azim;
    }
    if caz > 0. && az <= 0. {
        azim += 2. * PI;
    }
    azim += PI;
    if azim > 2. * PI {
        azim -= 2. * PI;
    }

    (90. - elev.to_degrees(), azim.to_degrees())
}

/// Scan geometry of a geostationary imager.
#[derive(Debug)]
struct Geostationary {
    /// Sub-satellite longitude in degrees
    lon: f64,
    /// Altitude above the equator in km
    altitude: f64,
    /// Image center, as (column, line)
    center: (f64, f64),
    /// Number of (columns, lines) spanning the 18° field of view
    size: (f64, f64),
}

impl Geostationary {
    const METEOSAT: Self = Self {
        lon: 0.,
        altitude: 42164.0 - EARTH_RADIUS,
        center: (2500.5, 1250.5),
        size: (5000., 2500.),
    };
    const GOES_EAST: Self = Self {
        lon: -75.,
        altitude: 42107.0 - EARTH_RADIUS,
        center: (6498.5, 8665.5),
        size: (12997., 17331.),
    };
    const GOES_WEST: Self = Self {
        lon: -135.,
        altitude: 42147.0 - EARTH_RADIUS,
        center: (6498.5, 8665.5),
        size: (12997., 17331.),
    };

    /// Solar and view angles for an image pixel.
    ///
    /// When the pixel does not see the Earth, a warning is logged and the
    /// scene is assumed to be at (0°, 0°) seen at nadir.
    fn angles(&self, month: i32, jday: i32, tu: f64, nc: f64, nl: f64) -> (f64, f64, f64, f64) {
        match self.locate(nc, nl) {
            Some((xlat, xlon, avis, phiv)) => {
                let (asol, phi0) = possol(month, jday, tu, xlon, xlat);
                (asol, phi0, avis, phiv)
            }
            None => {
                warn!("no possibility to compute lat. and long. for pixel ({nc}, {nl})");
                let (asol, phi0) = possol(month, jday, tu, 0., 0.);
                (asol, phi0, 0., 0.)
            }
        }
    }

    /// Latitude, longitude, view zenith, and view azimuth (all in degrees) of
    /// the point seen by a pixel, or `None` if the line of sight misses the
    /// Earth.
    fn locate(&self, nc: f64, nl: f64) -> Option<(f64, f64, f64, f64)> {
        let re = EARTH_RADIUS;
        let rp = re / (1. + 1. / 297.);
        let rs = re + self.altitude;

        let x = ((nc - self.center.0) * 18. / self.size.0).to_radians();
        let y = ((nl - self.center.1) * 18. / self.size.1).to_radians();
        let (tx, ty) = (x.tan(), y.tan());

        // Line of sight S + t·(-1, tx, ty) against the ellipsoid
        let a = (1. + tx * tx) / (re * re) + ty * ty / (rp * rp);
        let b = -2. * rs / (re * re);
        let c = rs * rs / (re * re) - 1.;
        let disc = b * b - 4. * a * c;
        if disc < 0. {
            return None;
        }
        let t = (-b - disc.sqrt()) / (2. * a);
        let p = [rs - t, t * tx, t * ty];

        let geocentric = p[2].atan2(p[0].hypot(p[1]));
        let lat = (geocentric.tan() * (re * re) / (rp * rp)).atan();
        let dlon = p[1].atan2(p[0]);

        // Line of sight from the ground back to the satellite
        let v = [rs - p[0], -p[1], -p[2]];
        let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        let v = [v[0] / norm, v[1] / norm, v[2] / norm];

        let up = [lat.cos() * dlon.cos(), lat.cos() * dlon.sin(), lat.sin()];
        let east = [-dlon.sin(), dlon.cos(), 0.];
        let north = [-lat.sin() * dlon.cos(), -lat.sin() * dlon.sin(), lat.cos()];
        let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];

        let avis = dot(up, v).clamp(-1., 1.).acos().to_degrees();
        let mut phiv = dot(east, v).atan2(dot(north, v)).to_degrees();
        if phiv < 0. {
            phiv += 360.;
        }

        Some((lat.to_degrees(), dlon.to_degrees() + self.lon, avis, phiv))
    }
}

/// Solar and view angles for an AVHRR pixel.
///
/// `campm` is +1 for afternoon and -1 for morning orbits, `nc` is the pixel
/// column (1 to 2048), `xlonan` and `hna` are the longitude (degrees) and
/// universal time (hours) of the ascending node.
fn avhrr(
    campm: f64,
    month: i32,
    jday: i32,
    tu: f64,
    nc: f64,
    xlonan: f64,
    hna: f64,
) -> (f64, f64, f64, f64) {
    let r = 860. / EARTH_RADIUS;
    let ai = 98.96f64.to_radians();
    // Orbital angular velocity for a 6119 s period
    let an = 2. * PI / 6119.;
    let ylonan = xlonan.to_radians();
    let t = tu * 3600.;
    let hnam = hna * 3600.;
    let u = campm * (t - hnam) * an;

    let delt = (nc - (2048. + 1.) / 2.) * 55.385 / ((2048. - 1.) / 2.);
    let delt = campm * delt.to_radians();
    let avis = ((1. + r) * delt.sin()).clamp(-1., 1.).asin();
    let d = avis - delt;

    let y = d.cos() * ai.cos() * u.sin() - ai.sin() * d.sin();
    let z = d.cos() * ai.sin() * u.sin() + ai.cos() * d.sin();
    let ylat = z.clamp(-1., 1.).asin();
    let cosy = d.cos() * u.cos() / ylat.cos();
    let siny = (y / ylat.cos()).clamp(-1., 1.);
    let mut ylon = siny.asin();
    if cosy <= 0. {
        ylon = if siny > 0. { PI - ylon } else { -PI - ylon };
    }
    let ylo1 = ylon + ylonan - (t - hnam) * 2. * PI / 86400.;

    let xlat = ylat.to_degrees();
    let xlon = ylo1.to_degrees();
    let (asol, phi0) = possol(month, jday, tu, xlon, xlat);

    let zlat = (ai.sin() * u.sin()).clamp(-1., 1.).asin();
    let zlon = (ai.cos() * u.sin()).atan2(u.cos());
    let phiv = if nc != 1024. {
        let sd = d.abs().sin();
        let xnum = (zlon - ylon).sin() * zlat.cos() / sd;
        let xden = (zlat.sin() - ylat.sin() * d.cos()) / ylat.cos() / sd;
        xnum.atan2(xden)
    } else {
        0.
    };

    (asol, phi0, avis.abs().to_degrees(), phiv.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn parse(text: &str) -> Result<Geometry, SixsError> {
        Geometry::parse(&mut ConditionsReader::new(text))
    }

    #[test]
    fn direct_angles() {
        let g = parse("0\n30.0 0.0 0.0 0.0 6 15\n").unwrap();
        assert_relative_eq!(g.xmus, 30f64.to_radians().cos(), epsilon = 1e-12);
        assert_eq!(g.xmuv, 1.);
        // Nadir view: the scattering angle is the supplement of the sun zenith
        assert_relative_eq!(g.adif, 150., epsilon = 1e-9);
        assert_eq!(g.month, 6);
        assert_eq!(g.jday, 15);
    }

    #[test]
    fn relative_azimuth_wraps() {
        let g = Geometry::new(40., 10., 20., 100., 3, 1);
        assert_relative_eq!(g.phi, 90.);
        assert_relative_eq!(g.phirad, 270f64.to_radians(), epsilon = 1e-12);
        assert!((0. ..2. * PI).contains(&g.phirad));
    }

    #[test]
    fn scattering_cosine_clamped() {
        // Backscatter geometry sits exactly on the edge of the acos domain
        let g = Geometry::new(45., 0., 45., 0., 1, 1);
        assert!(g.xmud >= -1. && g.xmud <= 1.);
        assert_abs_diff_eq!(g.adif, 180., epsilon = 1e-4);
        assert!(!g.adif.is_nan());
    }

    #[test]
    fn earth_sun_distance() {
        // Perihelion in early January, aphelion in early July
        assert!(varsol(4, 1) > 1.03);
        assert!(varsol(4, 7) < 0.97);
        assert_abs_diff_eq!(varsol(4, 4), 1., epsilon = 0.01);
    }

    #[test]
    fn solar_noon_at_equinox() {
        // Around the March equinox at local noon on the equator, the sun is
        // nearly overhead
        let (asol, _) = possol(3, 21, 12., 0., 0.);
        assert!(asol < 3., "asol = {asol}");
        // Midnight: the sun is below the horizon
        let (asol, _) = possol(3, 21, 0., 0., 0.);
        assert!(asol > 90.);
    }

    #[test]
    fn all_platforms_give_valid_cosines() {
        let texts = [
            "1\n6 15 10.5 2500 1250\n",
            "2\n6 15 10.5 6000 8000\n",
            "3\n6 15 10.5 6500 8600\n",
            "4\n6 15 13.5 1000 -5. 13.0\n",
            "5\n6 15 9.5 1500 120. 9.2\n",
            "7\n7 23 10.25 -7.5 43.1\n",
            "26\n8 2 10.7 11.5 46.2\n",
        ];
        for text in texts {
            let g = parse(text).unwrap();
            for v in [g.xmus, g.xmuv, g.xmud] {
                assert!((-1. ..=1.).contains(&v), "{text}: {g:?}");
            }
        }
    }

    #[test]
    fn geostationary_sub_satellite_point() {
        let (lat, lon, avis, _) = Geostationary::METEOSAT.locate(2500.5, 1250.5).unwrap();
        assert_abs_diff_eq!(lat, 0., epsilon = 1e-9);
        assert_abs_diff_eq!(lon, 0., epsilon = 1e-9);
        assert_abs_diff_eq!(avis, 0., epsilon = 1e-6);
        // Far outside the disk
        assert!(Geostationary::METEOSAT.locate(1., 1.).is_none());
    }

    #[test]
    fn unknown_geometry_is_fatal() {
        assert!(matches!(parse("31\n"), Err(SixsError::UnknownGeometry(31))));
    }
}
