/// Possible errors while setting up or running the atmospheric correction.
#[derive(Debug)]
pub enum SixsError {
    /// A value in the conditions stream is missing or is not a number
    Parse {
        /// 1-based line number in the conditions stream
        line: usize,
        /// What was expected there
        message: String,
    },
    /// The geometrical conditions selector is not supported
    UnknownGeometry(i32),
    /// The atmospheric model selector is not supported
    UnknownAtmosphere(i32),
    /// The aerosol model selector is not supported
    UnknownAerosolModel(i32),
    /// The spectral conditions selector is not supported
    UnknownSpectralCondition(i32),
    /// Too many (or zero) log-normal size-distribution modes
    TooManyComponents(usize),
    /// Too many (or too few) sun-photometer size-distribution samples
    TooManySunPhotometerPoints(usize),
    /// A wavelength is outside of the 0.25 to 4.0 µm grid
    WavelengthOutOfRange(f64),
    /// Reading or writing a `.mie` aerosol file failed
    MieFile(String),
    /// Reading the conditions failed
    Io(std::io::Error),
    /// The inputs don't have the expected shape(s)
    InconsistentInputs,
    /// The transform produced a NaN
    NumericalInstability,
    /// The operation was aborted early
    Cancelled,
}

impl std::fmt::Display for SixsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SixsError::Parse { line, message } => {
                write!(f, "error in conditions at line {line}: {message}")
            }
            SixsError::UnknownGeometry(igeom) => {
                write!(f, "unsupported geometrical conditions: {igeom}")
            }
            SixsError::UnknownAtmosphere(idatm) => {
                write!(f, "unknown atmospheric model: {idatm}")
            }
            SixsError::UnknownAerosolModel(iaer) => write!(f, "unknown aerosol model: {iaer}"),
            SixsError::UnknownSpectralCondition(iwave) => {
                write!(f, "unsupported spectral conditions: {iwave}")
            }
            SixsError::TooManyComponents(icp) => write!(
                f,
                "number of log-normal components must be between 1 and 4, got {icp}"
            ),
            SixsError::TooManySunPhotometerPoints(n) => write!(
                f,
                "number of sun-photometer radius samples must be between 2 and 50, got {n}"
            ),
            SixsError::WavelengthOutOfRange(wl) => {
                write!(f, "wavelength {wl} µm is outside 0.25-4.0 µm")
            }
            SixsError::MieFile(msg) => write!(f, "aerosol .mie file: {msg}"),
            SixsError::Io(e) => write!(f, "reading conditions: {e}"),
            SixsError::InconsistentInputs => write!(f, "inputs have the wrong shape"),
            SixsError::NumericalInstability => write!(f, "numerical instability in 6S"),
            SixsError::Cancelled => write!(f, "operation cancelled early"),
        }
    }
}

impl std::error::Error for SixsError {}

impl From<std::io::Error> for SixsError {
    fn from(e: std::io::Error) -> Self {
        SixsError::Io(e)
    }
}
