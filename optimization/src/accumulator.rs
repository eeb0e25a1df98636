use std::collections::BTreeMap;

use autodiff::ParameterSet;
use log::debug;

use crate::{OptimErr, Result};

/// Per-parameter gradients, keyed like the `ParameterSet` they came from.
pub type Gradients = BTreeMap<String, Box<[f32]>>;

/// Running sum of gradients across several sub-steps (e.g. tiled rendering).
///
/// The average is taken over the number of `accumulate` calls, not over the
/// number of samples each call represents.
#[derive(Debug, Default)]
pub struct GradientAccumulator {
    sums: Gradients,
    count: usize,
}

impl GradientAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount of `accumulate` calls since the last `take_average`.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether any gradient has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Adds the current gradient of every parameter onto the running sums.
    ///
    /// Parameters without gradient data are skipped, the counter is increased
    /// once per call regardless.
    ///
    /// # Returns
    /// A `SizeMismatch` error if a parameter changed length since it was first
    /// accumulated.
    pub fn accumulate(&mut self, params: &ParameterSet) -> Result<()> {
        for (key, var) in params {
            let Some(grad) = var.grad().filter(|g| !g.is_empty()) else {
                continue;
            };

            let sum = self
                .sums
                .entry(key.clone())
                .or_insert_with(|| vec![0.; grad.len()].into_boxed_slice());

            if sum.len() != grad.len() {
                return Err(OptimErr::SizeMismatch {
                    key: key.clone(),
                    got: grad.len(),
                    expected: sum.len(),
                });
            }

            sum.iter_mut().zip(grad).for_each(|(acc, g)| *acc += g);
        }

        self.count += 1;
        debug!(count = self.count; "accumulated gradients");
        Ok(())
    }

    /// Returns the averaged gradients, leaving the running sums untouched.
    ///
    /// # Returns
    /// `None` if nothing was accumulated since the last `clear`.
    pub fn average(&self) -> Option<Gradients> {
        if self.sums.is_empty() {
            return None;
        }

        let count = self.count as f32;
        let avg = self
            .sums
            .iter()
            .map(|(key, sum)| (key.clone(), sum.iter().map(|g| g / count).collect()))
            .collect();

        Some(avg)
    }

    pub fn clear(&mut self) {
        self.sums.clear();
        self.count = 0;
    }

    /// Returns the averaged gradients and clears the accumulator.
    ///
    /// # Returns
    /// `None` if nothing was accumulated since the last call.
    pub fn take_average(&mut self) -> Option<Gradients> {
        let avg = self.average()?;
        self.clear();
        Some(avg)
    }
}
