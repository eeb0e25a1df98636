use std::ops::{Deref, DerefMut};

use autodiff::ParameterSet;

/// Disables gradient tracking on a `ParameterSet` for as long as it lives.
///
/// The tracking flag each parameter had when the guard was created is
/// restored on drop, which also runs while unwinding from a panic.
pub struct NoGradGuard<'a> {
    params: &'a mut ParameterSet,
    prior: Vec<(String, bool)>,
}

impl<'a> NoGradGuard<'a> {
    pub fn new(params: &'a mut ParameterSet) -> Self {
        let prior = params
            .iter()
            .map(|(key, var)| (key.clone(), var.requires_grad()))
            .collect();

        params.set_requires_grad(false);
        Self { params, prior }
    }
}

impl Deref for NoGradGuard<'_> {
    type Target = ParameterSet;

    fn deref(&self) -> &Self::Target {
        self.params
    }
}

impl DerefMut for NoGradGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.params
    }
}

impl Drop for NoGradGuard<'_> {
    fn drop(&mut self) {
        for (key, requires_grad) in self.prior.drain(..) {
            if let Some(var) = self.params.get_mut(&key) {
                var.set_requires_grad(requires_grad);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use autodiff::Variable;

    use super::*;

    fn tracked_params() -> ParameterSet {
        let mut tracked = Variable::zeros(1);
        tracked.set_requires_grad(true);
        [("tracked", tracked), ("untracked", Variable::zeros(1))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_flags_disabled_inside_and_restored_after() {
        let mut params = tracked_params();

        {
            let guard = NoGradGuard::new(&mut params);
            assert!(guard.iter().all(|(_, var)| !var.requires_grad()));
        }

        assert!(params.get("tracked").unwrap().requires_grad());
        assert!(!params.get("untracked").unwrap().requires_grad());
    }

    #[test]
    fn test_flags_restored_after_panic() {
        let mut params = tracked_params();

        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = NoGradGuard::new(&mut params);
            panic!("render failed");
        }));

        assert!(res.is_err());
        assert!(params.get("tracked").unwrap().requires_grad());
    }
}
