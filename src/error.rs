//! Errors surfaced while loading and cross-checking configuration.

use std::fmt::{Display, Formatter};
use std::io;

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A fatal error raised before a simulation or analysis pass starts.
///
/// The simulation and analysis passes themselves never fail; every
/// variant here is produced while reading or validating input files.
#[derive(Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    Io(io::Error),
    /// The two configuration sources disagree with each other.
    ConfigMismatch(String),
    /// A parameter is outside its valid range.
    InvalidParameter(String),
    /// A field could not be parsed.
    MalformedInput(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::ConfigMismatch(msg) => write!(f, "configuration mismatch: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
