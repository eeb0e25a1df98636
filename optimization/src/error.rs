use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire optimization crate.
pub type Result<T> = std::result::Result<T, OptimErr>;

/// The optimization crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimErr {
    /// A hyper-parameter outside of its admissible range, rejected at construction.
    InvalidHyperparameter {
        name: &'static str,
        value: f32,
        constraint: &'static str,
    },
    /// A gradient whose length doesn't match its parameter or accumulator.
    SizeMismatch {
        key: String,
        got: usize,
        expected: usize,
    },
}

impl Display for OptimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimErr::InvalidHyperparameter {
                name,
                value,
                constraint,
            } => write!(f, "invalid {name} = {value}, it must be {constraint}"),
            OptimErr::SizeMismatch { key, got, expected } => write!(
                f,
                "gradient of \"{key}\" has {got} elements, expected {expected}"
            ),
        }
    }
}

impl Error for OptimErr {}

/// Checks that `value` lies in `[0, 1)`.
pub(crate) fn check_unit_interval(name: &'static str, value: f32) -> Result<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(OptimErr::InvalidHyperparameter {
            name,
            value,
            constraint: "in [0, 1)",
        })
    }
}

/// Checks that `value` is a finite number.
pub(crate) fn check_finite(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(OptimErr::InvalidHyperparameter {
            name,
            value,
            constraint: "finite",
        })
    }
}
