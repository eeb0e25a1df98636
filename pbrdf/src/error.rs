use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::Mueller;

/// The pbrdf module's result type.
pub type Result<T> = std::result::Result<T, PbrdfErr>;

#[derive(Debug)]
pub enum PbrdfErr {
    Io(io::Error),
    /// The file does not start with `tensor_file\0`.
    BadMagic,
    UnsupportedVersion {
        major: u8,
        minor: u8,
    },
    /// The file ended before `what` could be read.
    Truncated {
        what: &'static str,
        offset: usize,
    },
    UnknownDtype(u8),
    MissingField(String),
    InvalidShape {
        field: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    /// A BSDF evaluation did not match its reference value.
    ReferenceMismatch {
        got: Box<Mueller>,
        expected: Box<Mueller>,
    },
}

impl Display for PbrdfErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PbrdfErr::Io(e) => write!(f, "io error: {e}"),
            PbrdfErr::BadMagic => write!(f, "not a tensor file, bad magic"),
            PbrdfErr::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported tensor file version {major}.{minor}")
            }
            PbrdfErr::Truncated { what, offset } => {
                write!(f, "tensor file truncated while reading {what} at byte {offset}")
            }
            PbrdfErr::UnknownDtype(dtype) => write!(f, "unknown field data type {dtype}"),
            PbrdfErr::MissingField(name) => write!(f, "tensor file has no field \"{name}\""),
            PbrdfErr::InvalidShape {
                field,
                got,
                expected,
            } => write!(f, "field \"{field}\" has shape {got:?}, expected {expected:?}"),
            PbrdfErr::ReferenceMismatch { got, expected } => {
                write!(f, "mueller matrix mismatch, got\n{got}\nexpected\n{expected}")
            }
        }
    }
}

impl Error for PbrdfErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PbrdfErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PbrdfErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
