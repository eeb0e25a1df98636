use std::fmt;

use autodiff::ParameterSet;

use super::{Optimizer, OptimizerBase};
use crate::Result;

/// An optimizer which applies a "no-op" step, simply detaching every parameter
/// from this iteration's gradient history.
#[derive(Debug)]
pub struct Dummy {
    base: OptimizerBase,
}

impl Dummy {
    pub fn new(params: ParameterSet) -> Result<Self> {
        Ok(Self {
            base: OptimizerBase::new(params, 0.)?,
        })
    }
}

impl Optimizer for Dummy {
    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn reset(&mut self, _key: &str) {}

    fn step(&mut self) -> Result<()> {
        for (_, var) in self.base.params.iter_mut() {
            let mut detached = var.detach();
            detached.set_requires_grad(true);
            *var = detached;
        }

        Ok(())
    }

    fn into_params(self) -> ParameterSet {
        self.base.into_params()
    }
}

impl fmt::Display for Dummy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dummy[]")
    }
}
