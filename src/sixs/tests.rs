use super::discrete::{MIXED, RAYLEIGH};
use super::*;
use approx::{assert_abs_diff_eq, assert_relative_eq};

/// Continental aerosols, 23 km visibility, target at sea level seen from a
/// satellite in the red.
const CONTINENTAL: &str = "0\n30 0 0 0 6 15\n6\n1\n23\n0\n-1000\n-2\n0.62 0.67\n";

fn context(text: &str) -> AtmosphereContext {
    AtmosphereContext::from_conditions(text, ConditionsOptions::default()).unwrap()
}

#[test]
fn continental_red_band() {
    let ctx = context(CONTINENTAL);
    let band = ctx.compute_band();
    let ti = band.transform;

    assert_eq!(ti.iwave, -2);
    assert_relative_eq!(ti.xmus, 30f64.to_radians().cos(), epsilon = 1e-12);
    assert!(ti.seb > MIN_FLUX && ti.sb > MIN_FLUX);
    assert!(ti.sb > 0.045 && ti.sb < 0.055, "sb = {}", ti.sb);

    assert!(ti.tgasm > 0.8 && ti.tgasm <= 1., "tgasm = {}", ti.tgasm);
    for t in [ti.sdtott, ti.sutott] {
        assert!(t > 0.5 && t < 1., "transmittance {t}");
    }
    assert!(ti.sast > 0. && ti.sast < 0.3, "sast = {}", ti.sast);

    // Aerosols add to the molecular path reflectance
    let o = band.optics;
    assert!(o.romix > o.rorayl);
    assert!(o.rorayl > 0.01 && o.rorayl < 0.1, "rorayl = {}", o.rorayl);
    assert_relative_eq!(ti.srotot, o.romix, max_relative = 1e-12);
    assert_relative_eq!(ti.ainr[1][2], o.romix, max_relative = 1e-12);
    assert_abs_diff_eq!(o.taer, o.taerp, epsilon = 1e-12);

    // Equivalent optics at 550 nm scale the 23 km depth
    assert!(ctx.current().concentration.taer55 > 0.1);
    assert!(band.equivalent.tamoy > 0. && band.equivalent.pizmoy <= 1.);
    assert!(band.environment.fr > 0. && band.environment.fr < 1.);
    assert_relative_eq!(
        band.radiance_factor,
        ti.xmus * ti.seb / (std::f64::consts::PI * ti.sb),
        max_relative = 1e-12
    );
}

#[test]
fn ground_sensor() {
    let ctx = context("0\n30 0 0 0 6 15\n6\n1\n23\n0\n0\n0\n0.62 0.67\n");
    assert_relative_eq!(ctx.geometry.xmus, 0.866, epsilon = 1e-3);
    let band = ctx.compute_band();
    let ti = band.transform;
    assert_relative_eq!(ti.xmus, 0.866, epsilon = 1e-3);
    assert!(ti.tgasm > 0. && ti.tgasm <= 1.);
    assert!((0. ..=1.).contains(&ti.sast));
    assert!(ti.seb > MIN_FLUX && ti.sb > MIN_FLUX);
    // No atmosphere between the target and the sensor
    assert_abs_diff_eq!(band.optics.romix, 0.);
    assert_abs_diff_eq!(band.optics.utott, 1.);
}

#[test]
fn ground_sensor_keeps_a_clear_molecular_path() {
    let ground = context("0\n30 0 0 0 6 15\n6\n1\n23\n0\n0\n0\n0.62 0.67\n");
    let satellite = context("0\n30 0 0 0 6 15\n6\n1\n23\n0\n-1000\n0\n0.62 0.67\n");

    // 0.55, 0.633 and 0.694 µm bracket the band
    for i in 3..=5 {
        let (g, s) = (&ground.disc, &satellite.disc);
        assert_eq!(g.dtdir[RAYLEIGH][i], 1.);
        assert_eq!(g.dtdif[RAYLEIGH][i], 0.);
        assert_eq!(g.sphal[RAYLEIGH][i], 0.);
        assert!(s.dtdir[RAYLEIGH][i] < 1. && s.sphal[RAYLEIGH][i] > 0.);
        // The downward mixture does not depend on the sensor
        assert_eq!(g.dtdir[MIXED][i], s.dtdir[MIXED][i]);
        assert_eq!(g.dtdif[MIXED][i], s.dtdif[MIXED][i]);
    }

    let (g, s) = (ground.optics_at(0.65), satellite.optics_at(0.65));
    assert_eq!(g.asray, 0.);
    assert_eq!(g.dtotr, 1.);
    assert!(s.dtotr < 1. && s.asray > 0.);
    // Only the mixture is left to interpolate
    assert_relative_eq!(g.dtott, s.dtott, max_relative = 1e-9);
    assert!(g.dtott < 1.);

    let band = ground.compute_band();
    assert_eq!(band.optics.asray, 0.);
    assert_relative_eq!(band.optics.dtotr, 1., max_relative = 1e-12);
    assert_relative_eq!(
        band.transform.sdtott,
        satellite.compute().sdtott,
        max_relative = 1e-9
    );
}

#[test]
fn recomputing_starts_from_the_parsed_conditions() {
    let mut ctx = context(CONTINENTAL);
    let original = ctx.compute();

    ctx.pre_compute_h(1.5);
    let high = ctx.compute();
    assert_eq!(ctx.compute(), high);
    ctx.pre_compute_h(1.5);
    assert_eq!(ctx.compute(), high);
    assert!(high.ainr[1][0] < original.ainr[1][0]);
    assert!(high.tgasm > original.tgasm);

    // Back to sea level and the original visibility
    ctx.pre_compute_v(23.);
    assert_eq!(ctx.compute(), original);
    assert_eq!(ctx.baseline().concentration, ctx.current().concentration);
}

#[test]
fn clearer_air_has_less_path_radiance() {
    let mut ctx = context(CONTINENTAL);
    ctx.pre_compute_v(10.);
    let hazy = ctx.compute();
    ctx.pre_compute_v(60.);
    let clear = ctx.compute();
    assert!(clear.srotot < hazy.srotot);
    assert!(clear.sdtott > hazy.sdtott);

    ctx.pre_compute_hv(0.5, 60.);
    assert!(ctx.current().concentration.taer55 < ctx.baseline().concentration.taer55);
}

#[test]
fn no_aerosols() {
    let ctx = context("0\n30 0 0 0 6 15\n6\n0\n23\n0\n-1000\n-2\n0.62 0.67\n");
    let band = ctx.compute_band();
    assert_abs_diff_eq!(ctx.current().concentration.taer55, 0.);
    assert_relative_eq!(band.optics.romix, band.optics.rorayl, max_relative = 1e-9);
    assert_abs_diff_eq!(band.optics.roaero, 0.);
    assert_abs_diff_eq!(band.optics.taer, 0.);
    assert_eq!(band.equivalent, EquivalentOptics::default());
}

#[test]
fn aircraft_sees_part_of_the_aerosols() {
    let ctx = context("0\n30 0 20 90 6 15\n6\n2\n15\n0\n-3\n-1 -1\n-1\n-1\n0.55\n");
    let alt = &ctx.current().altitude;
    let taer55 = ctx.current().concentration.taer55;
    assert!(alt.taer55p > 0. && alt.taer55p < taer55);
    assert!(alt.pps < 1013.);

    let satellite = context("0\n30 0 20 90 6 15\n6\n2\n15\n0\n-1000\n-1\n0.55\n");
    let plane = ctx.compute_band();
    let sat = satellite.compute_band();
    assert!(plane.optics.utott > sat.optics.utott);
    assert!(plane.optics.taerp < sat.optics.taerp);
    // The downward path is the same
    assert_relative_eq!(plane.optics.dtott, sat.optics.dtott, max_relative = 1e-6);
}

#[test]
fn canned_etm_band() {
    let ctx = context("0\n40 120 5 300 7 1\n1\n1\n30\n-0.5\n-1000\n63\n");
    let ti = ctx.compute();
    assert_eq!(ti.iwave, 63);
    assert!(ti.sb > 0.);
    assert!(ti.tgasm > 0. && ti.tgasm <= 1.);
}

#[test]
fn reading_from_a_stream() {
    let from_text = context(CONTINENTAL).compute();
    let from_reader =
        AtmosphereContext::from_reader(CONTINENTAL.as_bytes(), ConditionsOptions::default())
            .unwrap()
            .compute();
    assert_eq!(from_text, from_reader);
}

#[test]
fn configuration_errors() {
    let err = AtmosphereContext::from_conditions(
        "0\n30 0 0 0 6 15\n6\n13\n",
        ConditionsOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SixsError::UnknownAerosolModel(13)));

    let err = AtmosphereContext::from_conditions("0\n30 0 0 0 6 15\n6\n1\n23\n", Default::default())
        .unwrap_err();
    assert!(matches!(err, SixsError::Parse { .. }));
}

#[test]
fn report_fits_in_79_columns() {
    let report = context(CONTINENTAL).to_string();
    assert!(report.lines().count() > 8);
    for line in report.lines() {
        assert!(line.chars().count() <= 79, "too long: {line}");
    }
    assert!(report.contains("continental"));
}
