use std::sync::OnceLock;

use autodiff::{ParameterSet, Variable};
use log::debug;
use ndarray::{Array3, ArrayD, ArrayViewD, IxDyn};

use crate::{PixelFormat, RenderErr, Rendered, Result, Scene, render};

/// A keyword argument of a render call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderArg {
    /// New value for the scene parameter named by the keyword.
    Tensor(ArrayD<f32>),
    Spp(u32),
    PixelFormat(String),
}

/// An operation a tensor framework can record in its graph.
///
/// `forward` stores whatever `backward` needs in the context.
pub trait AutogradFunction {
    type Ctx: Default;

    fn forward(
        &self,
        ctx: &mut Self::Ctx,
        scene: &dyn Scene,
        params: &mut ParameterSet,
        args: Vec<(String, RenderArg)>,
    ) -> Result<ArrayD<f32>>;

    /// # Returns
    /// One entry per forward argument, `None` for those without a gradient.
    fn backward(
        &self,
        ctx: &mut Self::Ctx,
        scene: &dyn Scene,
        params: &mut ParameterSet,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<Vec<Option<ArrayD<f32>>>>;
}

/// State carried from a render's forward pass to its backward pass.
#[derive(Debug, Default)]
pub struct RenderCtx {
    /// Parameter key and tensor shape for each tensor argument, in call order.
    inputs: Vec<Option<(String, Vec<usize>)>>,
    output: Option<Rendered>,
}

impl RenderCtx {
    pub fn rendered(&self) -> Option<&Rendered> {
        self.output.as_ref()
    }
}

/// Exposes rendering as a differentiable operation.
#[derive(Debug, Clone, Default)]
pub struct RenderFunction {
    default_format: PixelFormat,
}

static RENDER_FUNCTION: OnceLock<RenderFunction> = OnceLock::new();

/// The process wide render function, created on first use.
pub fn render_function() -> &'static RenderFunction {
    RENDER_FUNCTION.get_or_init(|| {
        debug!("creating render function");
        RenderFunction::default()
    })
}

impl AutogradFunction for RenderFunction {
    type Ctx = RenderCtx;

    fn forward(
        &self,
        ctx: &mut RenderCtx,
        scene: &dyn Scene,
        params: &mut ParameterSet,
        args: Vec<(String, RenderArg)>,
    ) -> Result<ArrayD<f32>> {
        ctx.inputs.clear();
        ctx.output = None;

        let mut spp = None;
        let mut format = self.default_format.to_string();
        for (_, arg) in &args {
            match arg {
                RenderArg::Spp(n) => spp = Some(*n),
                RenderArg::PixelFormat(f) => format.clone_from(f),
                RenderArg::Tensor(_) => {}
            }
        }
        format.parse::<PixelFormat>()?;

        for (key, arg) in args {
            let RenderArg::Tensor(tensor) = arg else {
                ctx.inputs.push(None);
                continue;
            };

            params.require(&key)?;
            let shape = tensor.shape().to_vec();
            let mut var = Variable::new(tensor.iter().copied().collect::<Vec<_>>());
            var.set_requires_grad(true);
            params.insert(key.clone(), var);
            ctx.inputs.push(Some((key, shape)));
        }

        let rendered = render(scene, params, spp, &format)?;
        let flat = rendered.image().iter().copied().collect::<Vec<_>>();
        let output = ArrayD::from_shape_vec(IxDyn(&[flat.len()]), flat)?;
        ctx.output = Some(rendered);

        Ok(output)
    }

    fn backward(
        &self,
        ctx: &mut RenderCtx,
        scene: &dyn Scene,
        params: &mut ParameterSet,
        grad_output: ArrayViewD<'_, f32>,
    ) -> Result<Vec<Option<ArrayD<f32>>>> {
        let rendered = ctx.output.take().ok_or_else(|| {
            RenderErr::InvalidArgument("backward called without a matching forward".into())
        })?;
        let inputs = std::mem::take(&mut ctx.inputs);

        let expected = rendered.image().len();
        if grad_output.len() != expected {
            return Err(RenderErr::ShapeMismatch {
                what: "output gradient",
                got: grad_output.len(),
                expected,
            });
        }

        let grad = Array3::from_shape_vec(
            rendered.image().dim(),
            grad_output.iter().copied().collect(),
        )?;

        for (key, _) in inputs.iter().flatten() {
            params.require_mut(key)?.clear_grad();
        }
        rendered.backward(scene, params, grad.view())?;
        drop(rendered);
        debug!(inputs = inputs.len(); "released render outputs");

        inputs
            .into_iter()
            .map(|input| {
                let Some((key, shape)) = input else {
                    return Ok(None);
                };

                let var = params.require(&key)?;
                let values = match var.grad() {
                    Some(g) => g.to_vec(),
                    None => vec![0.; var.len()],
                };
                Ok(Some(ArrayD::from_shape_vec(IxDyn(&shape), values)?))
            })
            .collect()
    }
}

/// Renders `scene` through the render function and shapes the result like an
/// image tensor: `[height, width, channels]` with every unit axis removed.
///
/// # Returns
/// The image and the context to hand to `RenderFunction::backward`.
pub fn render_torch(
    scene: &dyn Scene,
    params: &mut ParameterSet,
    args: Vec<(String, RenderArg)>,
) -> Result<(ArrayD<f32>, RenderCtx)> {
    let function = render_function();
    let mut ctx = RenderCtx::default();
    let flat = function.forward(&mut ctx, scene, params, args)?;

    let (width, height) = scene.sensor().film().size();
    let pixels = width * height;
    let channels = if pixels == 0 { 0 } else { flat.len() / pixels };

    let image = flat.into_shape_with_order(IxDyn(&[height, width, channels]))?;
    Ok((squeeze(image)?, ctx))
}

fn squeeze(array: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let shape: Vec<usize> = array.shape().iter().copied().filter(|&n| n != 1).collect();
    Ok(array.into_shape_with_order(IxDyn(&shape))?)
}
