use std::fmt;

use autodiff::ParameterSet;
use serde::{Deserialize, Serialize};

use crate::{
    Adam, Dummy, Optimizer, OptimizerBase, Result, Sgd,
    optimizers::{DEFAULT_BETA_1, DEFAULT_BETA_2, DEFAULT_EPSILON},
};

fn default_beta_1() -> f32 {
    DEFAULT_BETA_1
}

fn default_beta_2() -> f32 {
    DEFAULT_BETA_2
}

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

/// Serializable description of an optimizer and its hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerSpec {
    Dummy,
    Sgd {
        lr: f32,
        #[serde(default)]
        momentum: f32,
    },
    Adam {
        lr: f32,
        #[serde(default = "default_beta_1")]
        beta_1: f32,
        #[serde(default = "default_beta_2")]
        beta_2: f32,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
}

impl OptimizerSpec {
    /// Builds the described optimizer over `params`.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error if any hyper-parameter is out of range.
    pub fn build(self, params: ParameterSet) -> Result<AnyOptimizer> {
        let optimizer = match self {
            OptimizerSpec::Dummy => AnyOptimizer::Dummy(Dummy::new(params)?),
            OptimizerSpec::Sgd { lr, momentum } => AnyOptimizer::Sgd(Sgd::new(params, lr, momentum)?),
            OptimizerSpec::Adam {
                lr,
                beta_1,
                beta_2,
                epsilon,
            } => AnyOptimizer::Adam(Adam::new(params, lr, beta_1, beta_2, epsilon)?),
        };

        Ok(optimizer)
    }
}

/// Any of the available optimizers, chosen at runtime.
#[derive(Debug)]
pub enum AnyOptimizer {
    Dummy(Dummy),
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer for AnyOptimizer {
    fn base(&self) -> &OptimizerBase {
        match self {
            AnyOptimizer::Dummy(o) => o.base(),
            AnyOptimizer::Sgd(o) => o.base(),
            AnyOptimizer::Adam(o) => o.base(),
        }
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        match self {
            AnyOptimizer::Dummy(o) => o.base_mut(),
            AnyOptimizer::Sgd(o) => o.base_mut(),
            AnyOptimizer::Adam(o) => o.base_mut(),
        }
    }

    fn reset(&mut self, key: &str) {
        match self {
            AnyOptimizer::Dummy(o) => o.reset(key),
            AnyOptimizer::Sgd(o) => o.reset(key),
            AnyOptimizer::Adam(o) => o.reset(key),
        }
    }

    fn is_stale(&self, key: &str, len: usize) -> bool {
        match self {
            AnyOptimizer::Dummy(o) => o.is_stale(key, len),
            AnyOptimizer::Sgd(o) => o.is_stale(key, len),
            AnyOptimizer::Adam(o) => o.is_stale(key, len),
        }
    }

    fn step(&mut self) -> Result<()> {
        match self {
            AnyOptimizer::Dummy(o) => o.step(),
            AnyOptimizer::Sgd(o) => o.step(),
            AnyOptimizer::Adam(o) => o.step(),
        }
    }

    fn into_params(self) -> ParameterSet {
        match self {
            AnyOptimizer::Dummy(o) => o.into_params(),
            AnyOptimizer::Sgd(o) => o.into_params(),
            AnyOptimizer::Adam(o) => o.into_params(),
        }
    }
}

impl fmt::Display for AnyOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyOptimizer::Dummy(o) => fmt::Display::fmt(o, f),
            AnyOptimizer::Sgd(o) => fmt::Display::fmt(o, f),
            AnyOptimizer::Adam(o) => fmt::Display::fmt(o, f),
        }
    }
}
