use std::fmt;

use crate::{AutodiffErr, Result};

/// A flat array of values tracked by the differentiation engine.
///
/// The gradient, when present, always has the same length as the values. A
/// variable without gradient data reports `None` from [`Variable::grad`], which
/// is how optimizers tell apart "not differentiated yet" from a zero gradient.
#[derive(Clone, PartialEq)]
pub struct Variable {
    data: Box<[f32]>,
    grad: Option<Box<[f32]>>,
    requires_grad: bool,
}

impl Variable {
    /// Creates a new untracked `Variable` from its values.
    pub fn new(data: impl Into<Box<[f32]>>) -> Self {
        Self {
            data: data.into(),
            grad: None,
            requires_grad: false,
        }
    }

    /// Creates a single element variable.
    pub fn scalar(value: f32) -> Self {
        Self::new(vec![value])
    }

    /// Creates a zero filled variable of `len` elements.
    pub fn zeros(len: usize) -> Self {
        Self::new(vec![0.; len])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Replaces the values, the new values must keep the current length.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `data` has a different length.
    pub fn set_data(&mut self, data: &[f32]) -> Result<()> {
        if data.len() != self.data.len() {
            return Err(AutodiffErr::SizeMismatch {
                what: "variable data",
                got: data.len(),
                expected: self.data.len(),
            });
        }

        self.data.copy_from_slice(data);
        Ok(())
    }

    /// Returns the gradient, if the variable has been differentiated.
    pub fn grad(&self) -> Option<&[f32]> {
        self.grad.as_deref()
    }

    /// Overwrites the gradient of this variable.
    ///
    /// # Returns
    /// A `SizeMismatch` error if `grad` doesn't match the variable's length.
    pub fn set_grad(&mut self, grad: &[f32]) -> Result<()> {
        if grad.len() != self.data.len() {
            return Err(AutodiffErr::SizeMismatch {
                what: "variable gradient",
                got: grad.len(),
                expected: self.data.len(),
            });
        }

        self.grad = Some(grad.into());
        Ok(())
    }

    /// Adds `grad` onto the current gradient, starting from zero if there is none.
    ///
    /// Untracked variables silently ignore the contribution.
    pub fn accumulate_grad(&mut self, grad: &[f32]) -> Result<()> {
        if grad.len() != self.data.len() {
            return Err(AutodiffErr::SizeMismatch {
                what: "variable gradient",
                got: grad.len(),
                expected: self.data.len(),
            });
        }

        if !self.requires_grad {
            return Ok(());
        }

        let acc = self
            .grad
            .get_or_insert_with(|| vec![0.; grad.len()].into_boxed_slice());

        acc.iter_mut().zip(grad).for_each(|(a, g)| *a += g);
        Ok(())
    }

    pub fn clear_grad(&mut self) {
        self.grad = None;
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Enables or disables gradient tracking.
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Returns a copy of the values cut off from any gradient history.
    pub fn detach(&self) -> Self {
        Self::new(self.data.clone())
    }
}

impl From<Vec<f32>> for Variable {
    fn from(value: Vec<f32>) -> Self {
        Self::new(value)
    }
}

impl From<f32> for Variable {
    fn from(value: f32) -> Self {
        Self::scalar(value)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("len", &self.data.len())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_drops_gradient_and_tracking() {
        let mut var = Variable::new(vec![1., 2.]);
        var.set_requires_grad(true);
        var.set_grad(&[0.5, 0.5]).unwrap();

        let detached = var.detach();
        assert_eq!(detached.data(), &[1., 2.]);
        assert!(detached.grad().is_none());
        assert!(!detached.requires_grad());
    }

    #[test]
    fn test_accumulate_grad_starts_from_zero() {
        let mut var = Variable::zeros(3);
        var.set_requires_grad(true);

        var.accumulate_grad(&[1., 2., 3.]).unwrap();
        var.accumulate_grad(&[1., 1., 1.]).unwrap();
        assert_eq!(var.grad(), Some(&[2., 3., 4.][..]));
    }

    #[test]
    fn test_untracked_variable_ignores_gradient() {
        let mut var = Variable::zeros(2);
        var.accumulate_grad(&[1., 1.]).unwrap();
        assert!(var.grad().is_none());
    }

    #[test]
    fn test_set_grad_rejects_wrong_length() {
        let mut var = Variable::zeros(2);
        let err = var.set_grad(&[1.]).unwrap_err();
        assert_eq!(
            err,
            AutodiffErr::SizeMismatch {
                what: "variable gradient",
                got: 1,
                expected: 2
            }
        );
    }
}
