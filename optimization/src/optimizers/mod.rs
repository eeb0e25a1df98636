mod adam;
mod dummy;
mod optimizer;
mod sgd;

pub use adam::{Adam, DEFAULT_BETA_1, DEFAULT_BETA_2, DEFAULT_EPSILON, Moments};
pub use dummy::Dummy;
pub use optimizer::{Optimizer, OptimizerBase};
pub use sgd::Sgd;
