mod error;
mod parameters;
mod variable;

pub use error::{AutodiffErr, Result};
pub use parameters::{ParamScope, ParameterSet};
pub use variable::Variable;
