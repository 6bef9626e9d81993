//! Text tables of Mie results (`.mie` files).
//!
//! The file holds a 10-row table of wavelength, normalized extinction and
//! scattering coefficients, single scattering albedo, asymmetry factor, and
//! raw extinction and scattering coefficients, followed by the phase function
//! at the 83 quadrature angles for each of the 10 reference wavelengths.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use ndarray::Array2;

use super::aerosol::AerosolTables;
use super::gauss::{phase_quadrature, NQUAD};
use super::WLDIS;
use crate::error::SixsError;

const HEADER: &str =
    "   Wlgth  Nor_Ext_Co  Nor_Sca_Co  Sg_Sca_Alb  Asymm_Para  Extinct_Co  Scatter_Co";

/// Contents of a `.mie` file.
#[derive(Debug, Clone)]
pub(crate) struct SavedMie {
    pub(crate) ext: [f64; 10],
    pub(crate) sca: [f64; 10],
    pub(crate) ome: [f64; 10],
    pub(crate) gasym: [f64; 10],
    pub(crate) phasel: Array2<f64>,
}

fn io_error(path: &Path, err: std::io::Error) -> SixsError {
    SixsError::MieFile(format!("{}: {err}", path.display()))
}

pub(crate) fn save(path: &Path, tables: &AerosolTables) -> Result<(), SixsError> {
    let file = fs::File::create(path).map_err(|e| io_error(path, e))?;
    let mut out = BufWriter::new(file);
    write_tables(&mut out, tables).map_err(|e| io_error(path, e))?;
    info!("Mie results saved to {}", path.display());
    Ok(())
}

fn write_tables(out: &mut impl Write, t: &AerosolTables) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for i in 0..10 {
        writeln!(
            out,
            "  {:>10.4}   {:>10.4e}      {:>10.4e}      {:>10.4}      {:>10.4}      {:>10.4e}      {:>10.4e}",
            WLDIS[i],
            t.ext[i],
            t.sca[i],
            t.ome[i],
            t.gasym[i],
            t.ext[i] / t.nis,
            t.sca[i] / t.nis
        )?;
    }

    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "{:20} Phase Function ", "")?;
    write!(out, "   TETA ")?;
    for wl in WLDIS {
        write!(out, "   {wl:>10.4}  ")?;
    }
    writeln!(out)?;

    let cgaus = &phase_quadrature().cgaus;
    for (k, cos) in cgaus.iter().enumerate() {
        write!(out, "  {:>8.2}", cos.acos().to_degrees())?;
        for i in 0..10 {
            write!(out, " {:>14.4e}", t.phasel[[i, k]])?;
        }
        writeln!(out)?;
    }
    out.flush()
}

fn numbers(line: &str, path: &Path, line_no: usize) -> Result<Vec<f64>, SixsError> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                SixsError::MieFile(format!(
                    "{}:{line_no}: expected a number, found '{tok}'",
                    path.display()
                ))
            })
        })
        .collect()
}

pub(crate) fn load(path: &Path) -> Result<SavedMie, SixsError> {
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    parse(&text, path)
}

fn parse(text: &str, path: &Path) -> Result<SavedMie, SixsError> {
    let truncated = || SixsError::MieFile(format!("{}: file is truncated", path.display()));
    let mut lines = text.lines().enumerate().skip(1);

    let mut saved = SavedMie {
        ext: [0.; 10],
        sca: [0.; 10],
        ome: [0.; 10],
        gasym: [0.; 10],
        phasel: Array2::zeros((10, NQUAD)),
    };
    for i in 0..10 {
        let (n, line) = lines.next().ok_or_else(truncated)?;
        let row = numbers(line, path, n + 1)?;
        if row.len() < 5 {
            return Err(truncated());
        }
        saved.ext[i] = row[1];
        saved.sca[i] = row[2];
        saved.ome[i] = row[3];
        saved.gasym[i] = row[4];
    }

    // Skip down to the phase function column headings
    lines
        .by_ref()
        .find(|(_, line)| line.trim_start().starts_with("TETA"))
        .ok_or_else(truncated)?;

    for k in 0..NQUAD {
        let (n, line) = lines.next().ok_or_else(truncated)?;
        let row = numbers(line, path, n + 1)?;
        if row.len() < 11 {
            return Err(truncated());
        }
        for i in 0..10 {
            saved.phasel[[i, k]] = row[i + 1];
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sixs::aerosol::AerosolModel;
    use crate::sixs::mie::{MieComponent, MieInputs, SizeDistribution};
    use approx::assert_relative_eq;
    use num_complex::Complex64;
    use smallvec::smallvec;

    fn lognormal() -> MieInputs {
        MieInputs {
            rmin: 0.005,
            rmax: 5.,
            components: smallvec![MieComponent {
                distribution: SizeDistribution::LogNormal {
                    radius: 0.08,
                    sigma: 2.2,
                },
                cij: 1.,
                index: [Complex64::new(1.44, 0.003); 10],
            }],
        }
    }

    #[test]
    fn saved_file_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mie");
        let xmud = -0.8;

        let computed =
            AerosolModel::new(8, [0.; 4], Some(lognormal()), Some(path.clone()), xmud).unwrap();
        assert!(path.exists());
        let loaded = AerosolModel::new(12, [0.; 4], None, Some(path), xmud).unwrap();

        for i in 0..10 {
            let (a, b) = (&computed.tables, &loaded.tables);
            assert_relative_eq!(a.phase[i], b.phase[i], max_relative = 1e-3);
            assert_relative_eq!(a.ext[i], b.ext[i], max_relative = 1e-3);
            assert_relative_eq!(a.ome[i], b.ome[i], max_relative = 1e-3);
            for k in 0..NQUAD {
                assert_relative_eq!(a.phasel[[i, k]], b.phasel[[i, k]], max_relative = 1e-3);
            }
        }
    }

    #[test]
    fn truncated_file() {
        let err = parse("header\n  0.4 1 1 1 0.7 1 1\n", Path::new("x.mie")).unwrap_err();
        assert!(matches!(err, SixsError::MieFile(_)));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.mie")).unwrap_err();
        assert!(matches!(err, SixsError::MieFile(_)));
    }
}
