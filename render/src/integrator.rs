use std::sync::Arc;

use autodiff::ParameterSet;
use scene::SceneNode;

use crate::{Ray, Result, Sensor};

/// Light transport algorithm, differentiable w.r.t. the scene parameters.
pub trait Integrator {
    /// Computes the radiance (as CIE XYZ) arriving along each ray under the
    /// current parameter values.
    fn eval(&self, params: &ParameterSet, rays: &[Ray]) -> Result<Vec<[f32; 3]>>;

    /// Propagates the gradient of some loss w.r.t. the radiance of each ray
    /// onto the gradients of the tracked parameters.
    fn backward(
        &self,
        params: &mut ParameterSet,
        rays: &[Ray],
        grad_radiance: &[[f32; 3]],
    ) -> Result<()>;
}

/// Everything a render needs: a sensor, an integrator and the scene graph.
pub trait Scene {
    fn sensor(&self) -> &dyn Sensor;

    fn integrator(&self) -> &dyn Integrator;

    /// The root of the scene graph.
    fn root(&self) -> &Arc<dyn SceneNode>;

    /// Collects the differentiable parameters of the whole scene graph.
    fn parameters(&self) -> ParameterSet {
        scene::collect_parameters(self.root())
    }
}
