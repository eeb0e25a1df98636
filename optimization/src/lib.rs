mod accumulator;
mod error;
mod guard;
pub mod optimizers;
mod spec;

pub use accumulator::{GradientAccumulator, Gradients};
pub use error::{OptimErr, Result};
pub use guard::NoGradGuard;
pub use optimizers::{Adam, Dummy, Optimizer, OptimizerBase, Sgd};
pub use spec::{AnyOptimizer, OptimizerSpec};
