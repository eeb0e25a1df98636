use std::{
    error::Error,
    fmt::{self, Display},
};

use autodiff::AutodiffErr;
use ndarray::ShapeError;

/// The render module's result type.
pub type Result<T> = std::result::Result<T, RenderErr>;

/// Failures while rendering or differentiating an image.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderErr {
    /// The requested pixel format is not one of `y`, `xyz` or `rgb`.
    InvalidPixelFormat(String),
    InvalidArgument(String),
    UnknownParameter(String),
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Layout(String),
    Autodiff(AutodiffErr),
}

impl Display for RenderErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderErr::InvalidPixelFormat(format) => write!(
                f,
                "unknown pixel format \"{format}\", must be one of \"y\", \"xyz\" or \"rgb\""
            ),
            RenderErr::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            RenderErr::UnknownParameter(key) => write!(f, "unknown scene parameter \"{key}\""),
            RenderErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} has {got} elements, expected {expected}"),
            RenderErr::Layout(msg) => write!(f, "array layout error: {msg}"),
            RenderErr::Autodiff(e) => write!(f, "autodiff error: {e}"),
        }
    }
}

impl Error for RenderErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderErr::Autodiff(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AutodiffErr> for RenderErr {
    fn from(value: AutodiffErr) -> Self {
        match value {
            AutodiffErr::UnknownParameter(key) => Self::UnknownParameter(key),
            other => Self::Autodiff(other),
        }
    }
}

impl From<ShapeError> for RenderErr {
    fn from(value: ShapeError) -> Self {
        Self::Layout(value.to_string())
    }
}
