//! Aerosol optical model.
//!
//! Produces the extinction and scattering coefficients, single scattering
//! albedo, asymmetry factor, and phase function of the aerosol at the 10
//! reference wavelengths, either by mixing the four basic components of the
//! International Radiation Commission (1983), from one of the canned
//! desert/biomass/stratospheric models, from a Mie computation over a user size
//! distribution, or from a previously saved `.mie` file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use ndarray::Array2;
use num_complex::Complex64;
use smallvec::{smallvec, SmallVec};

use super::conditions::ConditionsReader;
use super::gauss::{phase_quadrature, NQUAD};
use super::mie::{mie, MieComponent, MieInputs, SizeDistribution};
use super::mie_file;
use crate::error::SixsError;

/// Index of 0.55 µm among the reference wavelengths.
pub(crate) const I550: usize = 3;

/// Volume of one particle of each basic component (µm³).
const VI: [f64; 4] = [113.983516, 1.13983516e-4, 5.1444150196, 5.977353425e-5];

/// Number of particles of each basic component per unit volume.
const NI: [f64; 4] = [54.734, 1868550., 276.05, 1805820.];

/// Extinction coefficients (km⁻¹) of the basic components: dust-like,
/// water-soluble, oceanic, soot.
#[allow(clippy::excessive_precision)]
const S_EX: [[f64; 10]; 4] = [
    [
        0.1796674e-01, 0.1815135e-01, 0.1820247e-01, 0.1827016e-01, 0.1842182e-01,
        0.1853081e-01, 0.1881427e-01, 0.1974608e-01, 0.1910712e-01, 0.1876025e-01,
    ],
    [
        0.7653460e-06, 0.6158538e-06, 0.5793444e-06, 0.5351736e-06, 0.4480091e-06,
        0.3971033e-06, 0.2900993e-06, 0.1161433e-06, 0.3975192e-07, 0.1338443e-07,
    ],
    [
        0.3499458e-02, 0.3574996e-02, 0.3596592e-02, 0.3622467e-02, 0.3676341e-02,
        0.3708866e-02, 0.3770822e-02, 0.3692255e-02, 0.3267943e-02, 0.2801670e-02,
    ],
    [
        0.8609083e-06, 0.6590103e-06, 0.6145787e-06, 0.5537643e-06, 0.4503008e-06,
        0.3966041e-06, 0.2965532e-06, 0.1493927e-06, 0.1017134e-06, 0.6065031e-07,
    ],
];

/// Scattering coefficients (km⁻¹) of the basic components.
#[allow(clippy::excessive_precision)]
const S_SC: [[f64; 10]; 4] = [
    [
        0.1126647e-01, 0.1168918e-01, 0.1180978e-01, 0.1196792e-01, 0.1232056e-01,
        0.1256952e-01, 0.1319347e-01, 0.1520712e-01, 0.1531952e-01, 0.1546761e-01,
    ],
    [
        0.7377123e-06, 0.5939413e-06, 0.5587120e-06, 0.5125148e-06, 0.4289210e-06,
        0.3772760e-06, 0.2648252e-06, 0.9331806e-07, 0.3345499e-07, 0.1201109e-07,
    ],
    [
        0.3499455e-02, 0.3574993e-02, 0.3596591e-02, 0.3622465e-02, 0.3676338e-02,
        0.3708858e-02, 0.3770696e-02, 0.3677038e-02, 0.3233194e-02, 0.2728013e-02,
    ],
    [
        0.2299196e-06, 0.1519321e-06, 0.1350890e-06, 0.1155423e-06, 0.8200095e-07,
        0.6469735e-07, 0.3610638e-07, 0.6227224e-08, 0.1779378e-08, 0.3050002e-09,
    ],
];

/// Asymmetry factors of the basic components.
const S_ASY: [[f64; 10]; 4] = [
    [0.896, 0.885, 0.880, 0.877, 0.867, 0.860, 0.845, 0.836, 0.905, 0.871],
    [0.642, 0.633, 0.631, 0.628, 0.621, 0.616, 0.610, 0.572, 0.562, 0.495],
    [0.795, 0.790, 0.788, 0.781, 0.783, 0.782, 0.778, 0.783, 0.797, 0.750],
    [0.397, 0.359, 0.348, 0.337, 0.311, 0.294, 0.253, 0.154, 0.103, 0.055],
];

// Background desert model
const EX2: [f64; 10] = [
    43.83631, 42.12415, 41.57425, 40.85399, 39.1404, 37.89763, 34.67506, 24.59, 17.96726,
    10.57569,
];
const SC2: [f64; 10] = [
    40.28625, 39.04473, 38.6147, 38.03645, 36.61054, 35.54456, 32.69951, 23.41019, 17.15375,
    10.09731,
];
const ASY2: [f64; 10] = [0.718, 0.712, 0.71, 0.708, 0.704, 0.702, 0.696, 0.68, 0.668, 0.649];

// Biomass burning model
const EX3: [f64; 10] = [
    95397.86, 75303.6, 70210.64, 64218.28, 52430.56, 45577.68, 31937.77, 9637.68, 3610.691,
    810.5614,
];
const SC3: [f64; 10] = [
    92977.9, 73397.17, 68425.49, 62571.8, 51049.87, 44348.77, 31006.21, 9202.678, 3344.476,
    664.1915,
];
const ASY3: [f64; 10] = [0.704, 0.69, 0.686, 0.68, 0.667, 0.659, 0.637, 0.541, 0.437, 0.241];

// Stratospheric model (non-absorbing)
const EX4: [f64; 10] = [
    54273040., 61981440., 63024320., 63489470., 61467600., 58179720., 46689090., 15190620.,
    5133055., 899859.4,
];
const ASY4: [f64; 10] = [0.705, 0.744, 0.751, 0.757, 0.762, 0.759, 0.737, 0.586, 0.372, 0.139];

/// Phase function tables at the reference wavelengths.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseTable {
    /// Background desert model
    DesertBackground,
    /// Biomass burning model
    BiomassBurning,
    /// Stratospheric model
    Stratospheric,
    /// Dust-like basic component
    Dust,
    /// Water-soluble basic component
    WaterSoluble,
    /// Oceanic basic component
    Oceanic,
    /// Soot basic component
    Soot,
    /// Computed from a size distribution, 10 wavelengths × 83 angles
    User(Array2<f64>),
}

impl PhaseTable {
    /// The table, 10 wavelengths × 83 scattering angles.
    pub fn values(&self) -> &Array2<f64> {
        let canned = canned_tables();
        match self {
            PhaseTable::DesertBackground => &canned[0],
            PhaseTable::BiomassBurning => &canned[1],
            PhaseTable::Stratospheric => &canned[2],
            PhaseTable::Dust => &canned[3],
            PhaseTable::WaterSoluble => &canned[4],
            PhaseTable::Oceanic => &canned[5],
            PhaseTable::Soot => &canned[6],
            PhaseTable::User(table) => table,
        }
    }
}

/// Henyey-Greenstein phase function at the quadrature nodes, one row per
/// wavelength, for the given asymmetry factors.
///
/// NOTE: the canned tables below are reconstructions from the asymmetry
/// factors and stand in for the tabulated 6S phase functions.
fn henyey_greenstein(asy: &[f64; 10]) -> Array2<f64> {
    let quad = phase_quadrature();
    Array2::from_shape_fn((10, NQUAD), |(i, k)| {
        let g = asy[i];
        (1. - g * g) / (1. + g * g - 2. * g * quad.cgaus[k]).powf(1.5)
    })
}

/// Reconstructed phase tables, in the order of [`PhaseTable`].
fn canned_tables() -> &'static [Array2<f64>; 7] {
    static TABLES: OnceLock<[Array2<f64>; 7]> = OnceLock::new();
    TABLES.get_or_init(|| {
        [
            henyey_greenstein(&ASY2),
            henyey_greenstein(&ASY3),
            henyey_greenstein(&ASY4),
            henyey_greenstein(&S_ASY[0]),
            henyey_greenstein(&S_ASY[1]),
            henyey_greenstein(&S_ASY[2]),
            henyey_greenstein(&S_ASY[3]),
        ]
    })
}

/// Aerosol optical properties at the 10 reference wavelengths.
#[derive(Debug, Clone, PartialEq)]
pub struct AerosolTables {
    /// Extinction coefficient, normalized
    pub ext: [f64; 10],
    /// Scattering coefficient, normalized
    pub sca: [f64; 10],
    /// Single scattering albedo
    pub ome: [f64; 10],
    /// Asymmetry factor
    pub gasym: [f64; 10],
    /// Phase function at the scattering angle of the observation
    pub phase: [f64; 10],
    /// Phase function at the 83 quadrature angles, 10 × 83
    pub phasel: Array2<f64>,
    /// Normalization applied to `ext` and `sca`
    pub nis: f64,
}

impl AerosolTables {
    /// Tables for an aerosol-free atmosphere. The extinction at 550 nm is 1 so
    /// that ratios against it stay finite.
    pub(crate) fn empty() -> Self {
        let mut ext = [0.; 10];
        ext[I550] = 1.;
        Self {
            ext,
            sca: [0.; 10],
            ome: [0.; 10],
            gasym: [0.; 10],
            phase: [0.; 10],
            phasel: Array2::zeros((10, NQUAD)),
            nis: 1.,
        }
    }
}

/// One scattering species of a mixture.
struct Species {
    cij: f64,
    ext: [f64; 10],
    sca: [f64; 10],
    asy: [f64; 10],
    phase: PhaseTable,
}

/// Aerosol model and its optical tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AerosolModel {
    /// Aerosol model selector (0 to 12)
    pub iaer: i32,
    /// Volume fractions of dust-like, water-soluble, oceanic, and soot
    /// components
    pub c: [f64; 4],
    /// Size distribution and refractive index for the Mie models (8 to 11)
    pub mie: Option<MieInputs>,
    /// File the Mie results are saved to (8 to 11) or loaded from (12)
    pub file: Option<PathBuf>,
    /// Optical properties
    pub tables: AerosolTables,
}

impl AerosolModel {
    /// Build the model and compute its tables for the scattering angle cosine
    /// `xmud`.
    ///
    /// `c` is only used by the user mixture (`iaer` 4); the continental,
    /// maritime, and urban models have fixed fractions.
    pub fn new(
        iaer: i32,
        c: [f64; 4],
        mie: Option<MieInputs>,
        file: Option<PathBuf>,
        xmud: f64,
    ) -> Result<Self, SixsError> {
        let c = match iaer {
            1 => [0.70, 0.29, 0.00, 0.01],
            2 => [0.00, 0.05, 0.95, 0.00],
            3 => [0.17, 0.61, 0.00, 0.22],
            4 => c,
            0 | 5..=12 => [0.; 4],
            _ => return Err(SixsError::UnknownAerosolModel(iaer)),
        };
        let mut model = Self {
            iaer,
            c,
            mie,
            file,
            tables: AerosolTables::empty(),
        };
        model.tables = model.aeroso(xmud)?;
        Ok(model)
    }

    /// The continental model.
    pub fn continental(xmud: f64) -> Self {
        let mut model = Self {
            iaer: 1,
            c: [0.70, 0.29, 0.00, 0.01],
            mie: None,
            file: None,
            tables: AerosolTables::empty(),
        };
        // The component mixtures have no fallible step
        if let Ok(tables) = model.aeroso(xmud) {
            model.tables = tables;
        }
        model
    }

    fn species(&self) -> Result<SmallVec<[Species; 4]>, SixsError> {
        let basic = |ext, sca, asy, phase| Species {
            cij: 1.,
            ext,
            sca,
            asy,
            phase,
        };
        let species = match self.iaer {
            1..=4 => {
                let sigm: f64 = self.c.iter().zip(VI.iter()).map(|(c, v)| c / v).sum();
                let tables = [
                    PhaseTable::Dust,
                    PhaseTable::WaterSoluble,
                    PhaseTable::Oceanic,
                    PhaseTable::Soot,
                ];
                tables
                    .into_iter()
                    .enumerate()
                    .map(|(i, phase)| Species {
                        cij: self.c[i] / VI[i] / sigm,
                        ext: S_EX[i],
                        sca: S_SC[i],
                        asy: S_ASY[i],
                        phase,
                    })
                    .collect()
            }
            5 => smallvec![basic(EX2, SC2, ASY2, PhaseTable::DesertBackground)],
            6 => smallvec![basic(EX3, SC3, ASY3, PhaseTable::BiomassBurning)],
            7 => smallvec![basic(EX4, EX4, ASY4, PhaseTable::Stratospheric)],
            8..=11 => {
                let inputs = self.mie.as_ref().ok_or(SixsError::InconsistentInputs)?;
                let res = mie(inputs);
                smallvec![basic(res.ext, res.sca, res.asy, PhaseTable::User(res.phase))]
            }
            iaer => return Err(SixsError::UnknownAerosolModel(iaer)),
        };
        Ok(species)
    }

    /// Compute the optical tables.
    fn aeroso(&self, xmud: f64) -> Result<AerosolTables, SixsError> {
        let mut tables = AerosolTables::empty();
        if self.iaer == 0 {
            return Ok(tables);
        }
        tables.ext = [0.; 10];

        let Some((j1, coef)) = locate_node(xmud) else {
            warn!("no phase function node around the scattering angle cosine {xmud}");
            return Ok(tables);
        };
        let at_node = |ph: &Array2<f64>, i: usize| {
            ph[[i, j1]] + coef * (ph[[i, j1]] - ph[[i, j1 + 1]])
        };

        if self.iaer == 12 {
            let path = self.file.as_deref().ok_or(SixsError::InconsistentInputs)?;
            let saved = mie_file::load(path)?;
            for i in 0..10 {
                tables.phase[i] = at_node(&saved.phasel, i);
            }
            tables.ext = saved.ext;
            tables.sca = saved.sca;
            tables.ome = saved.ome;
            tables.gasym = saved.gasym;
            tables.phasel = saved.phasel;
            return Ok(tables);
        }

        let species = self.species()?;
        tables.nis = if self.iaer >= 5 {
            1. / species[0].ext[I550]
        } else {
            1. / species.iter().zip(NI.iter()).map(|(s, n)| s.cij / n).sum::<f64>()
        };

        for i in 0..10 {
            for s in &species {
                let ph = s.phase.values();
                let weight = s.sca[i] * s.cij;
                tables.ext[i] += s.ext[i] * s.cij;
                tables.sca[i] += weight;
                tables.gasym[i] += weight * s.asy[i];
                tables.phase[i] += weight * at_node(ph, i);
                for k in 0..NQUAD {
                    tables.phasel[[i, k]] += weight * ph[[i, k]];
                }
            }
            let sca = tables.sca[i];
            tables.ome[i] = sca / tables.ext[i];
            tables.gasym[i] /= sca;
            tables.phase[i] /= sca;
            tables.phasel.row_mut(i).mapv_inplace(|v| v / sca);
            tables.ext[i] *= tables.nis;
            tables.sca[i] *= tables.nis;
        }

        if let (8..=11, Some(path)) = (self.iaer, self.file.as_deref()) {
            mie_file::save(path, &tables)?;
        }
        debug!(
            "aerosol model {}: ome(550) = {:.4}, g(550) = {:.4}",
            self.iaer, tables.ome[I550], tables.gasym[I550]
        );
        Ok(tables)
    }

    /// Parse the aerosol model block. Relative `.mie` file names are resolved
    /// against `mie_dir`.
    pub(crate) fn parse(
        reader: &mut ConditionsReader<'_>,
        xmud: f64,
        mie_dir: &Path,
    ) -> Result<Self, SixsError> {
        let iaer = reader.int("aerosol model")?;
        reader.end_line();

        let mut c = [0.; 4];
        let mut mie = None;
        let mut file = None;
        match iaer {
            0..=3 | 5..=7 => {}
            4 => {
                c = reader.reals("component fractions")?;
                reader.end_line();
            }
            8..=11 => mie = Some(parse_mie(reader, iaer)?),
            12 => {
                file = Some(mie_dir.join(reader.word("aerosol file name")?));
                reader.end_line();
            }
            _ => return Err(SixsError::UnknownAerosolModel(iaer)),
        }

        if (8..=11).contains(&iaer) {
            let iaerp = reader.int("save flag")?;
            if iaerp == 1 {
                let stem = reader.word("aerosol file name")?;
                file = Some(mie_dir.join(format!("{stem}.mie")));
            }
            reader.end_line();
        }

        Self::new(iaer, c, mie, file, xmud)
    }
}

/// Quadrature interval holding `xmud`, with the (negative) interpolation
/// coefficient within it.
fn locate_node(xmud: f64) -> Option<(usize, f64)> {
    let cgaus = &phase_quadrature().cgaus;
    (0..NQUAD - 1)
        .find(|&i| xmud >= cgaus[i] && xmud < cgaus[i + 1])
        .map(|j1| (j1, -(xmud - cgaus[j1]) / (cgaus[j1 + 1] - cgaus[j1])))
}

fn refractive_indices(reader: &mut ConditionsReader<'_>) -> Result<[Complex64; 10], SixsError> {
    let nr: [f64; 10] = reader.reals("real refractive indices")?;
    reader.end_line();
    let ni: [f64; 10] = reader.reals("imaginary refractive indices")?;
    reader.end_line();
    Ok(std::array::from_fn(|j| Complex64::new(nr[j], ni[j])))
}

fn parse_mie(reader: &mut ConditionsReader<'_>, iaer: i32) -> Result<MieInputs, SixsError> {
    let mut components = SmallVec::new();
    let (rmin, rmax) = match iaer {
        8 => {
            let [rmin, rmax] = reader.reals("radius range")?;
            let icp = reader.int("number of log-normal components")?;
            reader.end_line();
            if !(1..=4).contains(&icp) {
                return Err(SixsError::TooManyComponents(icp.max(0) as usize));
            }
            for _ in 0..icp {
                let [radius, sigma, cij] = reader.reals("log-normal component")?;
                reader.end_line();
                components.push(MieComponent {
                    distribution: SizeDistribution::LogNormal { radius, sigma },
                    cij,
                    index: refractive_indices(reader)?,
                });
            }
            (rmin, rmax)
        }
        9 | 10 => {
            let [rmin, rmax] = reader.reals("radius range")?;
            reader.end_line();
            let distribution = if iaer == 9 {
                let [alpha, b, gamma] = reader.reals("modified gamma parameters")?;
                SizeDistribution::ModifiedGamma { alpha, b, gamma }
            } else {
                SizeDistribution::Junge {
                    alpha: reader.real("power law exponent")?,
                }
            };
            reader.end_line();
            components.push(MieComponent {
                distribution,
                cij: 1.,
                index: refractive_indices(reader)?,
            });
            (rmin, rmax)
        }
        _ => {
            let irsunph = reader.int("number of sun-photometer samples")?;
            reader.end_line();
            if !(2..=50).contains(&irsunph) {
                return Err(SixsError::TooManySunPhotometerPoints(irsunph.max(0) as usize));
            }
            let mut samples: SmallVec<[(f64, f64); 8]> = SmallVec::new();
            for _ in 0..irsunph {
                let [r, dv] = reader.reals("sun-photometer sample")?;
                reader.end_line();
                // dV/dlog(r) to dN/dr
                samples.push((r, dv / r.powi(4) / std::f64::consts::LN_10));
            }
            let rmin = samples[0].0;
            let rmax = samples[samples.len() - 1].0 + 1e-7;
            components.push(MieComponent {
                distribution: SizeDistribution::SunPhotometer(samples),
                cij: 1.,
                index: refractive_indices(reader)?,
            });
            (rmin, rmax)
        }
    };
    Ok(MieInputs {
        rmin,
        rmax,
        components,
    })
}

/// Name of an aerosol model.
pub(crate) fn aerosol_name(iaer: i32) -> &'static str {
    match iaer {
        0 => "no aerosols",
        1 => "continental",
        2 => "maritime",
        3 => "urban",
        4 => "user defined mixture",
        5 => "desertic",
        6 => "smoke",
        7 => "stratospheric",
        8 => "log-normal size distribution",
        9 => "modified gamma size distribution",
        10 => "power law size distribution",
        11 => "sun photometer size distribution",
        12 => "from file",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const BACKSCATTER: f64 = -0.9;

    #[test]
    fn no_aerosol() {
        let m = AerosolModel::new(0, [0.; 4], None, None, BACKSCATTER).unwrap();
        assert_eq!(m.tables.ext[I550], 1.);
        assert!(m.tables.sca.iter().all(|&v| v == 0.));
        assert!(m.tables.phasel.iter().all(|&v| v == 0.));
    }

    #[test]
    fn continental_mixture() {
        let m = AerosolModel::continental(BACKSCATTER);
        let t = &m.tables;
        for i in 0..10 {
            assert!(t.ome[i] > 0.5 && t.ome[i] <= 1.);
            assert!(t.gasym[i] > 0. && t.gasym[i] < 1.);
            assert!(t.phase[i] > 0.);
        }
        // Extinction decreases through the visible
        assert!(t.ext[0] > t.ext[I550] && t.ext[I550] > t.ext[6]);
        assert_relative_eq!(t.ome[I550], 0.89, epsilon = 0.03);
    }

    #[test]
    fn fixed_fractions_override_input() {
        let m = AerosolModel::new(2, [1., 0., 0., 0.], None, None, BACKSCATTER).unwrap();
        assert_eq!(m.c, [0., 0.05, 0.95, 0.]);
    }

    #[test]
    fn basic_models_normalized_at_550() {
        for iaer in 5..=7 {
            let m = AerosolModel::new(iaer, [0.; 4], None, None, BACKSCATTER).unwrap();
            assert_relative_eq!(m.tables.ext[I550], 1., epsilon = 1e-12);
        }
        let strat = AerosolModel::new(7, [0.; 4], None, None, BACKSCATTER).unwrap();
        assert!(strat.tables.ome.iter().all(|&o| o == 1.));
    }

    #[test]
    fn phase_at_node_matches_table() {
        // Exactly on a node, the interpolated phase is the tabulated one
        let node = phase_quadrature().cgaus[20];
        let m = AerosolModel::new(5, [0.; 4], None, None, node).unwrap();
        for i in 0..10 {
            assert_abs_diff_eq!(m.tables.phase[i], m.tables.phasel[[i, 20]], epsilon = 1e-12);
        }
    }

    #[test]
    fn canned_phase_normalized() {
        let quad = phase_quadrature();
        let ph = PhaseTable::WaterSoluble.values();
        for i in 0..10 {
            let integral: f64 = (0..NQUAD).map(|k| ph[[i, k]] * quad.pdgs[k]).sum();
            assert_relative_eq!(integral, 2., max_relative = 1e-3);
        }
    }

    #[test]
    fn forward_scattering_is_not_located() {
        let m = AerosolModel::new(1, [0.; 4], None, None, 1.).unwrap();
        assert!(m.tables.ext.iter().all(|&v| v == 0.));
    }

    #[test]
    fn parses_user_mixture() {
        let mut r = ConditionsReader::new("4\n0.25 0.25 0.25 0.25\n");
        let m = AerosolModel::parse(&mut r, BACKSCATTER, Path::new(".")).unwrap();
        assert_eq!(m.c, [0.25; 4]);
    }

    #[test]
    fn component_count_checked() {
        let text = "8\n0.01 10 5\n";
        let mut r = ConditionsReader::new(text);
        assert!(matches!(
            AerosolModel::parse(&mut r, BACKSCATTER, Path::new(".")),
            Err(SixsError::TooManyComponents(5))
        ));

        let text = "11\n51\n";
        let mut r = ConditionsReader::new(text);
        assert!(matches!(
            AerosolModel::parse(&mut r, BACKSCATTER, Path::new(".")),
            Err(SixsError::TooManySunPhotometerPoints(51))
        ));
    }

    #[test]
    fn parses_sun_photometer() {
        let text = "11\n3\n0.12 1.0\n0.5 2.0\n1.0 0.5\n\
            1.5 1.5 1.5 1.5 1.5 1.5 1.5 1.5 1.5 1.5\n\
            0.01 0.01 0.01 0.01 0.01 0.01 0.01 0.01 0.01 0.01\n0\n";
        let mut r = ConditionsReader::new(text);
        let m = AerosolModel::parse(&mut r, BACKSCATTER, Path::new(".")).unwrap();
        let inputs = m.mie.as_ref().unwrap();
        assert_eq!(inputs.rmin, 0.12);
        assert_relative_eq!(inputs.rmax, 1.0 + 1e-7);
        match &inputs.components[0].distribution {
            SizeDistribution::SunPhotometer(s) => {
                assert_relative_eq!(s[1].1, 2.0 / 0.5f64.powi(4) / std::f64::consts::LN_10)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_relative_eq!(m.tables.ome[I550], 0.8812561536999861, max_relative = 1e-8);
    }

    #[test]
    fn unknown_model() {
        assert!(matches!(
            AerosolModel::new(13, [0.; 4], None, None, BACKSCATTER),
            Err(SixsError::UnknownAerosolModel(13))
        ));
    }
}
