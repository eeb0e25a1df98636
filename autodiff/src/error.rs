use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the autodiff crate.
pub type Result<T> = std::result::Result<T, AutodiffErr>;

/// Failures when reading or writing differentiable variables.
#[derive(Debug, Clone, PartialEq)]
pub enum AutodiffErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnknownParameter(String),
}

impl Display for AutodiffErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutodiffErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for {what}: got {got} elements, expected {expected}"
            ),
            AutodiffErr::UnknownParameter(key) => write!(f, "unknown parameter \"{key}\""),
        }
    }
}

impl Error for AutodiffErr {}
