//! Canned sensor bands.
//!
//! Each band is described by its nominal spectral limits in µm. The response
//! is taken as flat between the limits.
//!
//! NOTE: these boxcars stand in for the digitized 6S filter functions of
//! codes 2 to 98, so band-integrated results differ from 6S for every canned
//! sensor.

/// A canned sensor band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SensorBand {
    pub(crate) name: &'static str,
    pub(crate) wlinf: f64,
    pub(crate) wlsup: f64,
}

const fn band(name: &'static str, wlinf: f64, wlsup: f64) -> SensorBand {
    SensorBand { name, wlinf, wlsup }
}

/// First selector of the canned bands.
pub(crate) const FIRST: i32 = 2;

// Boxcar limits, not the digitized responses
const BANDS: [SensorBand; 97] = [
    band("meteosat vis band", 0.350, 1.110),
    band("goes east band vis", 0.490, 0.900),
    band("goes west band vis", 0.490, 0.900),
    band("avhrr (noaa6) band 1", 0.550, 0.750),
    band("avhrr (noaa6) band 2", 0.690, 1.120),
    band("avhrr (noaa7) band 1", 0.500, 0.800),
    band("avhrr (noaa7) band 2", 0.640, 1.170),
    band("avhrr (noaa8) band 1", 0.540, 1.010),
    band("avhrr (noaa8) band 2", 0.680, 1.120),
    band("avhrr (noaa9) band 1", 0.530, 0.810),
    band("avhrr (noaa9) band 2", 0.680, 1.170),
    band("avhrr (noaa10) band 1", 0.530, 0.780),
    band("avhrr (noaa10) band 2", 0.600, 1.190),
    band("avhrr (noaa11) band 1", 0.540, 0.820),
    band("avhrr (noaa11) band 2", 0.600, 1.120),
    band("hrv1 (spot1) band 1", 0.470, 0.650),
    band("hrv1 (spot1) band 2", 0.600, 0.720),
    band("hrv1 (spot1) band 3", 0.730, 0.930),
    band("hrv1 (spot1) band pan", 0.470, 0.790),
    band("hrv2 (spot1) band 1", 0.470, 0.650),
    band("hrv2 (spot1) band 2", 0.590, 0.730),
    band("hrv2 (spot1) band 3", 0.740, 0.940),
    band("hrv2 (spot1) band pan", 0.470, 0.790),
    band("tm (landsat5) band 1", 0.430, 0.560),
    band("tm (landsat5) band 2", 0.500, 0.650),
    band("tm (landsat5) band 3", 0.580, 0.740),
    band("tm (landsat5) band 4", 0.730, 0.950),
    band("tm (landsat5) band 5", 1.5025, 1.890),
    band("tm (landsat5) band 7", 1.950, 2.410),
    band("mss (landsat5) band 1", 0.475, 0.640),
    band("mss (landsat5) band 2", 0.580, 0.750),
    band("mss (landsat5) band 3", 0.655, 0.855),
    band("mss (landsat5) band 4", 0.785, 1.100),
    band("MAS (ER2) band 1", 0.5025, 0.5875),
    band("MAS (ER2) band 2", 0.6075, 0.7000),
    band("MAS (ER2) band 3", 0.8300, 0.9125),
    band("MAS (ER2) band 4", 0.9000, 0.9975),
    band("MAS (ER2) band 5", 1.8200, 1.9575),
    band("MAS (ER2) band 6", 2.0950, 2.1925),
    band("MAS (ER2) band 7", 3.5800, 3.8700),
    band("MODIS band 1", 0.6100, 0.6850),
    band("MODIS band 2", 0.8200, 0.9025),
    band("MODIS band 3", 0.4500, 0.4825),
    band("MODIS band 4", 0.5400, 0.5700),
    band("MODIS band 5", 1.2150, 1.2700),
    band("MODIS band 6", 1.6000, 1.6650),
    band("MODIS band 7", 2.0575, 2.1825),
    band("avhrr (noaa12) band 1", 0.500, 1.000),
    band("avhrr (noaa12) band 2", 0.650, 1.120),
    band("avhrr (noaa14) band 1", 0.500, 1.110),
    band("avhrr (noaa14) band 2", 0.680, 1.100),
    band("POLDER band 1", 0.4125, 0.4775),
    band("POLDER band 2 (non polar)", 0.4100, 0.5225),
    band("POLDER band 3 (non polar)", 0.5325, 0.5950),
    band("POLDER band 4 P1", 0.6300, 0.7025),
    band("POLDER band 5 (non polar)", 0.7450, 0.7800),
    band("POLDER band 6 (non polar)", 0.7000, 0.8300),
    band("POLDER band 7 P1", 0.8100, 0.9200),
    band("POLDER band 8 (non polar)", 0.8650, 0.9400),
    band("etm+ (landsat7) band 1", 0.435, 0.520),
    band("etm+ (landsat7) band 2", 0.500, 0.6225),
    band("etm+ (landsat7) band 3", 0.615, 0.7025),
    band("etm+ (landsat7) band 4", 0.740, 0.9125),
    band("etm+ (landsat7) band 5", 1.510, 1.7875),
    band("etm+ (landsat7) band 7", 2.015, 2.3775),
    band("etm+ (landsat7) band 8", 0.5025, 0.900),
    band("liss (IRS 1C) band 2", 0.502, 0.620),
    band("liss (IRS 1C) band 3", 0.612, 0.700),
    band("liss (IRS 1C) band 4", 0.752, 0.880),
    band("liss (IRS 1C) band 5", 1.452, 1.760),
    band("aster band 1", 0.485, 0.6425),
    band("aster band 2", 0.590, 0.730),
    band("aster band 3n", 0.720, 0.9075),
    band("aster band 4", 1.570, 1.7675),
    band("aster band 5", 2.120, 2.2825),
    band("aster band 6", 2.150, 2.295),
    band("aster band 7", 2.210, 2.390),
    band("aster band 8", 2.250, 2.440),
    band("aster band 9", 2.2975, 2.4875),
    band("avnir band 1", 0.390, 0.550),
    band("avnir band 2", 0.485, 0.655),
    band("avnir band 3", 0.545, 0.745),
    band("avnir band 4", 0.700, 0.925),
    band("ikonos green band", 0.506, 0.595),
    band("ikonos blue band", 0.445, 0.516),
    band("ikonos red band", 0.632, 0.698),
    band("ikonos nir band", 0.757, 0.853),
    band("ikonos pan band", 0.450, 0.900),
    band("rapideye blue band", 0.440, 0.510),
    band("rapideye green band", 0.520, 0.590),
    band("rapideye red band", 0.630, 0.685),
    band("rapideye red edge band", 0.690, 0.730),
    band("rapideye nir band", 0.760, 0.850),
    band("vgt1 (spot4) band 0", 0.430, 0.470),
    band("vgt1 (spot4) band 2", 0.610, 0.680),
    band("vgt1 (spot4) band 3", 0.780, 0.890),
    band("vgt1 (spot4) mir band", 1.580, 1.750),
];

/// Canned band for a spectral conditions selector.
pub(crate) fn sensor_band(iwave: i32) -> Option<SensorBand> {
    usize::try_from(iwave - FIRST)
        .ok()
        .and_then(|i| BANDS.get(i))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_ordered_and_in_range() {
        for b in BANDS {
            assert!(b.wlinf < b.wlsup, "{}", b.name);
            assert!(b.wlinf >= 0.25 && b.wlsup <= 4.0, "{}", b.name);
        }
    }

    #[test]
    fn lookup() {
        assert_eq!(sensor_band(2).unwrap().name, "meteosat vis band");
        assert_eq!(sensor_band(61).unwrap().name, "etm+ (landsat7) band 1");
        assert_eq!(sensor_band(67).unwrap().wlsup, 0.900);
        assert!(sensor_band(98).is_some());
        assert!(sensor_band(1).is_none());
        assert!(sensor_band(99).is_none());
    }
}
