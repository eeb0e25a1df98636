use std::{collections::BTreeMap, fmt};

use autodiff::ParameterSet;
use log::debug;
use rayon::prelude::*;

use super::{Optimizer, OptimizerBase};
use crate::{OptimErr, Result, error::check_unit_interval};

pub const DEFAULT_BETA_1: f32 = 0.9;
pub const DEFAULT_BETA_2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-8;

/// First and second moment estimates of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub m: Box<[f32]>,
    pub v: Box<[f32]>,
}

impl Moments {
    fn zeros(len: usize) -> Self {
        Self {
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
        }
    }
}

/// The optimization technique presented in "Adam: A Method for Stochastic
/// Optimization", Kingma and Ba, ICLR 2015.
#[derive(Debug)]
pub struct Adam {
    base: OptimizerBase,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    epsilon: f32,
    moments: BTreeMap<String, Moments>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `params` - The parameters to optimize.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1` - Exponential decay of the first order moments, in `[0, 1)`.
    /// * `beta2` - Exponential decay of the second order moments, in `[0, 1)`.
    /// * `epsilon` - Positive stabilizer added to the denominator.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error if any argument is out of range.
    pub fn new(
        params: ParameterSet,
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Result<Self> {
        check_unit_interval("beta_1", beta1)?;
        check_unit_interval("beta_2", beta2)?;

        if !(epsilon.is_finite() && epsilon > 0.) {
            return Err(OptimErr::InvalidHyperparameter {
                name: "epsilon",
                value: epsilon,
                constraint: "positive",
            });
        }

        let mut adam = Self {
            base: OptimizerBase::new(params, learning_rate)?,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            epsilon,
            moments: BTreeMap::new(),
        };

        adam.reset_all();
        Ok(adam)
    }

    /// Creates a new `Adam` optimizer with the usual default hyper-parameters.
    pub fn with_defaults(params: ParameterSet, learning_rate: f32) -> Result<Self> {
        Self::new(
            params,
            learning_rate,
            DEFAULT_BETA_1,
            DEFAULT_BETA_2,
            DEFAULT_EPSILON,
        )
    }

    /// The bias-corrected learning rate used by the latest step.
    pub fn learning_rate_t(&self) -> f32 {
        bias_corrected(self.base.learning_rate(), self.beta1_t, self.beta2_t)
    }

    pub fn moments(&self, key: &str) -> Option<&Moments> {
        self.moments.get(key)
    }
}

fn bias_corrected(lr: f32, beta1_t: f32, beta2_t: f32) -> f32 {
    let bc1 = 1. - beta1_t;
    let bc2 = 1. - beta2_t;

    if bc1 == 0. {
        // No step taken yet.
        return lr;
    }

    lr * (bc2.sqrt() / bc1)
}

impl Optimizer for Adam {
    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn reset(&mut self, key: &str) {
        let len = self.base.params().get(key).map_or(0, |var| var.len());
        self.moments.insert(key.to_string(), Moments::zeros(len));
    }

    fn is_stale(&self, key: &str, len: usize) -> bool {
        self.moments.get(key).is_none_or(|mo| mo.m.len() != len)
    }

    fn step(&mut self) -> Result<()> {
        let Self {
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        let grads = self.compute_gradients()?;
        self.reset_stale();

        self.beta1_t *= b1;
        self.beta2_t *= b2;
        let step_size = bias_corrected(self.base.learning_rate(), self.beta1_t, self.beta2_t);

        for (key, var) in self.base.params.iter_mut() {
            let Some(grad) = grads.get(key).map(|g| &g[..]) else {
                continue;
            };

            let Some(Moments { m, v }) = self.moments.get_mut(key) else {
                continue;
            };

            let mut updated = var.detach();
            updated
                .data_mut()
                .par_iter_mut()
                .zip(m[..].par_iter_mut())
                .zip(v[..].par_iter_mut())
                .zip(grad.par_iter())
                .for_each(|(((p, m), v), g)| {
                    *m = b1 * *m + (1. - b1) * g;
                    *v = b2 * *v + (1. - b2) * g.powi(2);
                    *p -= step_size * *m / (v.sqrt() + eps);
                });

            updated.set_requires_grad(true);
            *var = updated;
        }

        debug!(lr_t = step_size; "adam step");
        Ok(())
    }

    fn into_params(self) -> ParameterSet {
        self.base.into_params()
    }
}

impl fmt::Display for Adam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Adam[")?;
        writeln!(f, "  lr = {},", self.base.learning_rate())?;
        writeln!(f, "  beta_1 = {},", self.beta1)?;
        writeln!(f, "  beta_2 = {},", self.beta2)?;
        write!(f, "  params = ")?;

        let params = self.base.params().to_string();
        let mut lines = params.lines();
        if let Some(first) = lines.next() {
            writeln!(f, "{first}")?;
        }
        for line in lines {
            writeln!(f, "  {line}")?;
        }

        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use autodiff::Variable;

    use super::*;

    fn params(values: Vec<f32>, grad: &[f32]) -> ParameterSet {
        let mut var = Variable::new(values);
        var.set_grad(grad).unwrap();
        [("x", var)].into_iter().collect()
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::with_defaults(params(vec![1., 1.], &[2., -0.5]), 0.01).unwrap();
        adam.step().unwrap();

        // On the first step m / sqrt(v) == sign(g) after bias correction.
        let x = adam.params().get("x").unwrap().data();
        assert!((x[0] - 0.99).abs() < 1e-5, "{x:?}");
        assert!((x[1] - 1.01).abs() < 1e-5, "{x:?}");
    }

    #[test]
    fn test_bias_correction_converges_to_learning_rate() {
        let mut adam = Adam::new(params(vec![0.], &[1.]), 0.1, 0.5, 0.5, 1e-8).unwrap();

        for _ in 0..64 {
            adam.params_mut()
                .get_mut("x")
                .unwrap()
                .set_grad(&[1.])
                .unwrap();
            adam.step().unwrap();
        }

        assert!((adam.learning_rate_t() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_moments_follow_update_rule() {
        let mut adam = Adam::new(params(vec![0.], &[2.]), 0.1, 0.5, 0.75, 1e-8).unwrap();
        adam.step().unwrap();

        let moments = adam.moments("x").unwrap();
        assert_eq!(&*moments.m, &[1.]);
        assert_eq!(&*moments.v, &[1.]);
    }

    #[test]
    fn test_rejects_invalid_hyperparameters() {
        let cases = [
            (1., 0.9, 1e-8, "beta_1"),
            (0.9, -0.1, 1e-8, "beta_2"),
            (0.9, 0.999, 0., "epsilon"),
            (0.9, 0.999, -1., "epsilon"),
        ];

        for (b1, b2, eps, name) in cases {
            let res = Adam::new(ParameterSet::new(), 0.1, b1, b2, eps);
            assert!(
                matches!(res, Err(OptimErr::InvalidHyperparameter { name: got, .. }) if got == name),
                "expected {name} to be rejected"
            );
        }
    }

    #[test]
    fn test_mismatched_accumulated_gradient_keeps_bias_correction() {
        let mut adam = Adam::with_defaults(params(vec![0.], &[1.]), 0.1).unwrap();
        adam.accumulate_gradients().unwrap();
        adam.params_mut().insert("x", Variable::zeros(2));

        assert!(matches!(adam.step(), Err(OptimErr::SizeMismatch { .. })));
        assert_eq!(adam.learning_rate_t(), 0.1);
        assert_eq!(&*adam.moments("x").unwrap().m, &[0.]);
    }

    #[test]
    fn test_display_lists_hyperparameters() {
        let adam = Adam::with_defaults(params(vec![0., 0.], &[1., 1.]), 0.5).unwrap();
        let expected = "Adam[\n  lr = 0.5,\n  beta_1 = 0.9,\n  beta_2 = 0.999,\n  \
                        params = ParameterSet[\n    * x (2 elements)\n  ]\n]";

        assert_eq!(adam.to_string(), expected);
    }

    #[test]
    fn test_resized_parameter_resets_moments() {
        let mut adam = Adam::with_defaults(params(vec![0.], &[1.]), 0.1).unwrap();
        adam.step().unwrap();

        let mut resized = Variable::zeros(4);
        resized.set_grad(&[1.; 4]).unwrap();
        adam.params_mut().insert("x", resized);
        adam.step().unwrap();

        assert_eq!(adam.moments("x").unwrap().m.len(), 4);
        assert_eq!(adam.params().get("x").unwrap().len(), 4);
    }
}
