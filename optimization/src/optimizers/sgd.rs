use std::{collections::BTreeMap, fmt};

use autodiff::ParameterSet;
use log::debug;
use rayon::prelude::*;

use super::{Optimizer, OptimizerBase};
use crate::{
    Result,
    error::{check_finite, check_unit_interval},
};

/// Stochastic gradient descent with a fixed learning rate and, optionally,
/// momentum (0.9 is a typical value).
#[derive(Debug)]
pub struct Sgd {
    base: OptimizerBase,
    momentum: f32,
    velocity: BTreeMap<String, Box<[f32]>>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `params` - The parameters to optimize.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Fraction of the previous update carried over, in `[0, 1)`.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error if any argument is out of range.
    pub fn new(params: ParameterSet, learning_rate: f32, momentum: f32) -> Result<Self> {
        check_finite("momentum", momentum)?;
        check_unit_interval("momentum", momentum)?;

        let mut sgd = Self {
            base: OptimizerBase::new(params, learning_rate)?,
            momentum,
            velocity: BTreeMap::new(),
        };

        sgd.reset_all();
        Ok(sgd)
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    /// The momentum buffer of `key`, if it has been initialized.
    pub fn velocity(&self, key: &str) -> Option<&[f32]> {
        self.velocity.get(key).map(|v| &**v)
    }
}

impl Optimizer for Sgd {
    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn reset(&mut self, key: &str) {
        let len = self.base.params().get(key).map_or(0, |var| var.len());
        self.velocity
            .insert(key.to_string(), vec![0.; len].into_boxed_slice());
    }

    fn is_stale(&self, key: &str, len: usize) -> bool {
        self.velocity.get(key).is_none_or(|v| v.len() != len)
    }

    fn step(&mut self) -> Result<()> {
        let grads = self.compute_gradients()?;
        self.reset_stale();

        let lr = self.base.learning_rate();
        let mu = self.momentum;

        for (key, var) in self.base.params.iter_mut() {
            let Some(grad) = grads.get(key).map(|g| &g[..]) else {
                continue;
            };

            let mut updated = var.detach();

            if mu == 0. {
                updated
                    .data_mut()
                    .par_iter_mut()
                    .zip(grad.par_iter())
                    .for_each(|(p, g)| *p -= lr * g);
            } else {
                // `reset_stale` guarantees a buffer of the right size.
                let Some(velocity) = self.velocity.get_mut(key) else {
                    continue;
                };

                updated
                    .data_mut()
                    .par_iter_mut()
                    .zip(velocity[..].par_iter_mut())
                    .zip(grad.par_iter())
                    .for_each(|((p, v), g)| {
                        *v = mu * *v + lr * g;
                        *p -= *v;
                    });
            }

            updated.set_requires_grad(true);
            *var = updated;
        }

        debug!(lr = lr, momentum = mu; "sgd step");
        Ok(())
    }

    fn into_params(self) -> ParameterSet {
        self.base.into_params()
    }
}

impl fmt::Display for Sgd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sgd[\n  lr = {},\n  momentum = {}\n]",
            self.base.learning_rate(),
            self.momentum
        )
    }
}
