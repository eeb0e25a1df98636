use autodiff::ParameterSet;
use log::debug;

use crate::{GradientAccumulator, Gradients, NoGradGuard, OptimErr, Result, error::check_finite};

/// The state shared by every optimizer: the parameters being optimized, the
/// learning rate and the gradient accumulator.
#[derive(Debug)]
pub struct OptimizerBase {
    pub(crate) params: ParameterSet,
    learning_rate: f32,
    accumulator: GradientAccumulator,
}

impl OptimizerBase {
    /// Creates a new `OptimizerBase`, marking every parameter as gradient-tracked.
    ///
    /// # Arguments
    /// * `params` - The parameters to optimize.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error if the learning rate is not finite.
    pub fn new(mut params: ParameterSet, learning_rate: f32) -> Result<Self> {
        check_finite("learning_rate", learning_rate)?;
        params.set_requires_grad(true);

        Ok(Self {
            params,
            learning_rate,
            accumulator: GradientAccumulator::new(),
        })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    pub fn into_params(self) -> ParameterSet {
        self.params
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) -> Result<()> {
        check_finite("learning_rate", learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    pub fn accumulator(&self) -> &GradientAccumulator {
        &self.accumulator
    }

    pub fn accumulator_mut(&mut self) -> &mut GradientAccumulator {
        &mut self.accumulator
    }

    /// Accumulates the current gradients until the next `compute_gradients`.
    pub fn accumulate_gradients(&mut self) -> Result<()> {
        self.accumulator.accumulate(&self.params)
    }

    /// Returns the gradients that the next update should use.
    ///
    /// These are the averaged gradients collected with `accumulate_gradients`
    /// if there are any, or else the current gradient of every parameter that
    /// has one. The accumulator is cleared only once every gradient has been
    /// checked against its parameter.
    ///
    /// # Returns
    /// A `SizeMismatch` error if a gradient's length differs from its
    /// parameter, in which case nothing is consumed.
    pub fn compute_gradients(&mut self) -> Result<Gradients> {
        let (grads, accumulated) = match self.accumulator.average() {
            Some(avg) => (avg, true),
            None => (
                self.params
                    .iter()
                    .filter_map(|(key, var)| var.grad().map(|g| (key.clone(), Box::from(g))))
                    .collect(),
                false,
            ),
        };

        for (key, grad) in &grads {
            let Some(var) = self.params.get(key) else {
                continue;
            };

            if grad.len() != var.len() {
                return Err(OptimErr::SizeMismatch {
                    key: key.clone(),
                    got: grad.len(),
                    expected: var.len(),
                });
            }
        }

        if accumulated {
            self.accumulator.clear();
        }

        Ok(grads)
    }
}

/// Defines the strategy for updating a set of differentiable parameters from
/// their gradients.
pub trait Optimizer {
    fn base(&self) -> &OptimizerBase;

    fn base_mut(&mut self) -> &mut OptimizerBase;

    /// Resets the per-parameter state of `key` to zero for its current size.
    fn reset(&mut self, key: &str);

    /// Whether the state of `key` no longer fits a parameter of `len` elements.
    fn is_stale(&self, _key: &str, _len: usize) -> bool {
        false
    }

    /// Applies one update to every parameter with a gradient.
    fn step(&mut self) -> Result<()>;

    /// Consumes the optimizer, handing back the optimized parameters.
    fn into_params(self) -> ParameterSet
    where
        Self: Sized;

    fn params(&self) -> &ParameterSet {
        self.base().params()
    }

    fn params_mut(&mut self) -> &mut ParameterSet {
        self.base_mut().params_mut()
    }

    fn learning_rate(&self) -> f32 {
        self.base().learning_rate()
    }

    fn set_learning_rate(&mut self, learning_rate: f32) -> Result<()> {
        self.base_mut().set_learning_rate(learning_rate)
    }

    fn accumulate_gradients(&mut self) -> Result<()> {
        self.base_mut().accumulate_gradients()
    }

    fn compute_gradients(&mut self) -> Result<Gradients> {
        self.base_mut().compute_gradients()
    }

    /// Temporarily disables gradients for the optimized parameters.
    fn no_gradients(&mut self) -> NoGradGuard<'_> {
        NoGradGuard::new(self.params_mut())
    }

    /// Runs `f` with gradient tracking disabled on every parameter.
    fn with_no_gradients<R, F>(&mut self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut ParameterSet) -> R,
    {
        let mut guard = self.no_gradients();
        f(&mut guard)
    }

    /// Calls `reset` on every parameter.
    fn reset_all(&mut self) {
        let keys: Vec<_> = self.params().keys().map(str::to_owned).collect();
        keys.iter().for_each(|key| self.reset(key));
    }

    /// Calls `reset` on every parameter whose state no longer matches its size.
    fn reset_stale(&mut self) {
        let stale: Vec<_> = self
            .params()
            .iter()
            .filter(|(key, var)| self.is_stale(key, var.len()))
            .map(|(key, _)| key.clone())
            .collect();

        for key in stale {
            debug!(key = key.as_str(); "parameter size changed, resetting optimizer state");
            self.reset(&key);
        }
    }
}
