//! A small differentiable scene: a textured diffuse rectangle seen head on by
//! an orthographic sensor, lit by a constant environment.

use std::sync::Arc;

use autodiff::{ParamScope, ParameterSet, Variable};
use scene::SceneNode;

use crate::{
    Film, IndependentSampler, Integrator, Ray, ReconstructionFilter, RenderErr, Result, Sampler,
    Scene, Sensor, sample_wavelength, srgb_to_xyz, srgb_to_xyz_adjoint,
};

/// Key of the RGB albedo texture, `3 * width * height` values.
pub const ALBEDO_KEY: &str = "/Scene/Rectangle/SmoothDiffuse/Bitmap[id=\"albedo\"]/data";
/// Key of the scalar environment radiance.
pub const RADIANCE_KEY: &str = "/Scene/ConstantEmitter/radiance";

/// Generic scene graph node.
struct Node {
    type_name: &'static str,
    id: Option<String>,
    children: Vec<Arc<dyn SceneNode>>,
    params: Vec<(&'static str, Vec<f32>)>,
}

impl Node {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            id: None,
            children: Vec::new(),
            params: Vec::new(),
        }
    }

    fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    fn child(mut self, node: Node) -> Self {
        self.children.push(Arc::new(node));
        self
    }

    fn param(mut self, name: &'static str, values: Vec<f32>) -> Self {
        self.params.push((name, values));
        self
    }
}

impl SceneNode for Node {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn children(&self) -> &[Arc<dyn SceneNode>] {
        &self.children
    }

    fn put_parameters(&self, scope: &mut ParamScope<'_>) {
        for (name, values) in &self.params {
            scope.put(name, Variable::new(values.clone()));
        }
    }
}

/// Maps the film one to one onto the unit square at `z = 0`.
pub struct OrthographicSensor {
    film: Film,
    sampler: IndependentSampler,
}

impl OrthographicSensor {
    pub fn new(film: Film, sampler: IndependentSampler) -> Self {
        Self { film, sampler }
    }
}

impl Sensor for OrthographicSensor {
    fn film(&self) -> &Film {
        &self.film
    }

    fn sampler(&self) -> &dyn Sampler {
        &self.sampler
    }

    fn sample_ray(
        &self,
        time: f32,
        wavelength_sample: f32,
        position_sample: [f32; 2],
    ) -> (Ray, f32) {
        let [u, v] = position_sample;
        let ray = Ray {
            origin: [u, v, -1.],
            direction: [0., 0., 1.],
            time,
            wavelength: sample_wavelength(wavelength_sample),
        };

        (ray, 1.)
    }
}

/// Radiance reflected by the rectangle: `albedo(u, v) * radiance`.
pub struct AlbedoIntegrator {
    width: usize,
    height: usize,
}

impl AlbedoIntegrator {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    fn texel(&self, ray: &Ray) -> usize {
        let x = ((ray.origin[0] * self.width as f32).max(0.) as usize).min(self.width - 1);
        let y = ((ray.origin[1] * self.height as f32).max(0.) as usize).min(self.height - 1);
        y * self.width + x
    }

    fn albedo<'a>(&self, params: &'a ParameterSet) -> Result<&'a [f32]> {
        let albedo = params.require(ALBEDO_KEY)?.data();
        let expected = 3 * self.width * self.height;
        if albedo.len() != expected {
            return Err(RenderErr::ShapeMismatch {
                what: "albedo texture",
                got: albedo.len(),
                expected,
            });
        }

        Ok(albedo)
    }

    fn radiance(params: &ParameterSet) -> Result<f32> {
        let radiance = params.require(RADIANCE_KEY)?.data();
        match radiance {
            [l] => Ok(*l),
            _ => Err(RenderErr::ShapeMismatch {
                what: "radiance",
                got: radiance.len(),
                expected: 1,
            }),
        }
    }
}

impl Integrator for AlbedoIntegrator {
    fn eval(&self, params: &ParameterSet, rays: &[Ray]) -> Result<Vec<[f32; 3]>> {
        let albedo = self.albedo(params)?;
        let radiance = Self::radiance(params)?;

        Ok(rays
            .iter()
            .map(|ray| {
                let t = 3 * self.texel(ray);
                srgb_to_xyz([albedo[t], albedo[t + 1], albedo[t + 2]].map(|c| c * radiance))
            })
            .collect())
    }

    fn backward(
        &self,
        params: &mut ParameterSet,
        rays: &[Ray],
        grad_radiance: &[[f32; 3]],
    ) -> Result<()> {
        if rays.len() != grad_radiance.len() {
            return Err(RenderErr::ShapeMismatch {
                what: "radiance gradient",
                got: grad_radiance.len(),
                expected: rays.len(),
            });
        }

        let albedo = self.albedo(params)?;
        let radiance = Self::radiance(params)?;

        let mut grad_albedo = vec![0.; albedo.len()];
        let mut grad_l = 0.;
        for (ray, g) in rays.iter().zip(grad_radiance) {
            let t = 3 * self.texel(ray);
            let g_rgb = srgb_to_xyz_adjoint(*g);
            for c in 0..3 {
                grad_albedo[t + c] += radiance * g_rgb[c];
                grad_l += albedo[t + c] * g_rgb[c];
            }
        }

        params.require_mut(ALBEDO_KEY)?.accumulate_grad(&grad_albedo)?;
        params.require_mut(RADIANCE_KEY)?.accumulate_grad(&[grad_l])?;
        Ok(())
    }
}

/// The demo scene, its film and texture share the same resolution.
pub struct DemoScene {
    root: Arc<dyn SceneNode>,
    sensor: OrthographicSensor,
    integrator: AlbedoIntegrator,
}

impl DemoScene {
    /// Creates the scene with a uniform grey albedo of `0.5` and unit radiance.
    pub fn new(width: usize, height: usize, spp: u32, seed: u64) -> Self {
        Self::with_albedo(width, height, spp, seed, vec![0.5; 3 * width * height], 1.)
    }

    /// # Arguments
    /// * `albedo` - Row major RGB texture, `3 * width * height` values.
    /// * `radiance` - Constant environment radiance.
    pub fn with_albedo(
        width: usize,
        height: usize,
        spp: u32,
        seed: u64,
        albedo: Vec<f32>,
        radiance: f32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let root = Node::new("Scene")
            .child(
                Node::new("OrthographicCamera")
                    .with_id("sensor")
                    .child(Node::new("IndependentSampler")),
            )
            .child(
                Node::new("Rectangle").child(
                    Node::new("SmoothDiffuse")
                        .child(Node::new("Bitmap").with_id("albedo").param("data", albedo)),
                ),
            )
            .child(Node::new("ConstantEmitter").param("radiance", vec![radiance]));

        let film = Film::new(width, height, ReconstructionFilter::Box);
        Self {
            root: Arc::new(root),
            sensor: OrthographicSensor::new(film, IndependentSampler::new(spp, seed)),
            integrator: AlbedoIntegrator::new(width, height),
        }
    }
}

impl Scene for DemoScene {
    fn sensor(&self) -> &dyn Sensor {
        &self.sensor
    }

    fn integrator(&self) -> &dyn Integrator {
        &self.integrator
    }

    fn root(&self) -> &Arc<dyn SceneNode> {
        &self.root
    }
}
