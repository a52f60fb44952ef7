use std::{error::Error, fmt, io};

use machine_learning::MlErr;
use rayon::ThreadPoolBuildError;
use safetensors::{Dtype, SafeTensorError};

/// The subject models' result type.
pub type Result<T> = std::result::Result<T, SubjectErr>;

/// Failures of a subject model training run.
#[derive(Debug)]
pub enum SubjectErr {
    /// The requested function is not one of the registered ones.
    InvalidFnName(String),
    InvalidConfig(String),
    Ml(MlErr),
    Io(io::Error),
    Json(serde_json::Error),
    Safetensors(SafeTensorError),
    /// A stored tensor has an element type other than `f32`.
    Dtype { name: String, got: Dtype },
    ThreadPool(ThreadPoolBuildError),
}

impl fmt::Display for SubjectErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectErr::InvalidFnName(name) => write!(f, "invalid function name: {name}"),
            SubjectErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            SubjectErr::Ml(e) => write!(f, "training error: {e}"),
            SubjectErr::Io(e) => write!(f, "io error: {e}"),
            SubjectErr::Json(e) => write!(f, "json error: {e}"),
            SubjectErr::Safetensors(e) => write!(f, "safetensors error: {e}"),
            SubjectErr::Dtype { name, got } => {
                write!(f, "tensor {name} is stored as {got:?}, expected F32")
            }
            SubjectErr::ThreadPool(e) => write!(f, "failed to build thread pool: {e}"),
        }
    }
}

impl Error for SubjectErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SubjectErr::Ml(e) => Some(e),
            SubjectErr::Io(e) => Some(e),
            SubjectErr::Json(e) => Some(e),
            SubjectErr::Safetensors(e) => Some(e),
            SubjectErr::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for SubjectErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<io::Error> for SubjectErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SubjectErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SafeTensorError> for SubjectErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Safetensors(value)
    }
}

impl From<ThreadPoolBuildError> for SubjectErr {
    fn from(value: ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<SubjectErr> for io::Error {
    fn from(value: SubjectErr) -> Self {
        match value {
            SubjectErr::Io(e) => e,
            e @ (SubjectErr::InvalidFnName(_) | SubjectErr::InvalidConfig(_)) => {
                io::Error::new(io::ErrorKind::InvalidInput, e)
            }
            other => io::Error::other(other),
        }
    }
}
