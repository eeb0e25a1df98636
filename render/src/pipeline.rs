use autodiff::ParameterSet;
use log::debug;
use ndarray::{Array3, ArrayView3, s};

use crate::{ImageBlock, PixelFormat, Ray, RenderErr, Result, Scene};

/// The samples traced during a render, kept around for the backward pass.
#[derive(Debug, Clone, Default)]
pub struct SampleRecord {
    pub rays: Vec<Ray>,
    /// Film position of each sample, in pixels.
    pub positions: Vec<[f32; 2]>,
    /// Importance weight returned by the sensor for each ray, zero for
    /// samples the image block dropped.
    pub weights: Vec<f32>,
}

impl SampleRecord {
    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }
}

/// Traces `spp` samples per pixel and splats them onto a fresh image block.
///
/// # Arguments
/// * `scene` - The scene to render.
/// * `params` - Current values of the scene parameters.
/// * `spp` - Samples per pixel, the sensor's sampler decides when `None`.
///
/// # Returns
/// The accumulated block and the samples that produced it.
pub fn render_path(
    scene: &dyn Scene,
    params: &ParameterSet,
    spp: Option<u32>,
) -> Result<(ImageBlock, SampleRecord)> {
    let sensor = scene.sensor();
    let film = sensor.film();
    let (width, height) = film.size();

    // every render replays the same sample stream
    let mut sampler = sensor.sampler().clone_box();
    let spp = spp.unwrap_or_else(|| sampler.sample_count());
    if spp == 0 {
        return Err(RenderErr::InvalidArgument(
            "samples per pixel must be positive".into(),
        ));
    }

    debug!(width = width, height = height, spp = spp; "rendering");

    let count = film.pixel_count() * spp as usize;
    let mut record = SampleRecord {
        rays: Vec::with_capacity(count),
        positions: Vec::with_capacity(count),
        weights: Vec::with_capacity(count),
    };

    for i in 0..count {
        let idx = i / spp as usize;
        let (px, py) = ((idx % width) as f32, (idx / width) as f32);

        let wavelength_sample = sampler.next_1d();
        let [dx, dy] = sampler.next_2d();
        let pos = [px + dx, py + dy];
        let adjusted = [pos[0] / width as f32, pos[1] / height as f32];

        let (ray, weight) = sensor.sample_ray(0., wavelength_sample, adjusted);
        record.rays.push(ray);
        record.positions.push(pos);
        record.weights.push(weight);
    }

    let radiance = scene.integrator().eval(params, &record.rays)?;
    if radiance.len() != record.len() {
        return Err(RenderErr::ShapeMismatch {
            what: "integrator output",
            got: radiance.len(),
            expected: record.len(),
        });
    }

    let mut block = ImageBlock::new(width, height, film.filter());
    for ((pos, xyz), weight) in record.positions.iter().zip(radiance).zip(&mut record.weights) {
        if !block.put(*pos, xyz.map(|c| c * *weight), 1.) {
            *weight = 0.;
        }
    }

    Ok((block, record))
}

/// Renders `scene` and develops the result into `pixel_format`.
///
/// The format is validated before any ray is traced.
pub fn render(
    scene: &dyn Scene,
    params: &ParameterSet,
    spp: Option<u32>,
    pixel_format: &str,
) -> Result<Rendered> {
    let format: PixelFormat = pixel_format.parse()?;
    let (block, samples) = render_path(scene, params, spp)?;
    let image = block.develop(format);

    Ok(Rendered {
        format,
        image,
        block,
        samples,
    })
}

/// A developed image together with everything needed to differentiate it.
#[derive(Debug, Clone)]
pub struct Rendered {
    format: PixelFormat,
    image: Array3<f32>,
    block: ImageBlock,
    samples: SampleRecord,
}

impl Rendered {
    /// The `[height, width, channels]` image.
    pub fn image(&self) -> &Array3<f32> {
        &self.image
    }

    pub fn into_image(self) -> Array3<f32> {
        self.image
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn samples(&self) -> &SampleRecord {
        &self.samples
    }

    /// Propagates `grad_image`, the gradient of a loss w.r.t. every pixel of
    /// the image, onto the gradients of the tracked scene parameters.
    ///
    /// The development and splatting steps are linear, so their adjoint
    /// redistributes each pixel's gradient onto the samples that reached it.
    pub fn backward(
        &self,
        scene: &dyn Scene,
        params: &mut ParameterSet,
        grad_image: ArrayView3<'_, f32>,
    ) -> Result<()> {
        if grad_image.dim() != self.image.dim() {
            return Err(RenderErr::ShapeMismatch {
                what: "image gradient",
                got: grad_image.len(),
                expected: self.image.len(),
            });
        }

        let grad_radiance: Vec<[f32; 3]> = self
            .samples
            .positions
            .iter()
            .zip(&self.samples.weights)
            .map(|(&pos, &weight)| {
                let mut acc = [0.; 3];
                for tap in self.block.footprint(pos) {
                    let w = self.block.weight(tap.x, tap.y);
                    if w <= 0. {
                        continue;
                    }

                    let pixel = grad_image.slice(s![tap.y, tap.x, ..]);
                    let pixel: Vec<f32> = pixel.iter().copied().collect();
                    let adj = self.format.convert_adjoint(&pixel);
                    let scale = tap.weight / w * weight;
                    for (a, g) in acc.iter_mut().zip(adj) {
                        *a += scale * g;
                    }
                }
                acc
            })
            .collect();

        debug!(samples = grad_radiance.len(); "backpropagating image gradient");
        scene
            .integrator()
            .backward(params, &self.samples.rays, &grad_radiance)
    }
}
