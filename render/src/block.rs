use log::warn;
use ndarray::{Array3, ArrayView3, Axis, Zip, s};

use crate::{PixelFormat, ReconstructionFilter};

/// Channels stored per pixel: `X`, `Y`, `Z`, alpha and the filter weight sum.
pub const BLOCK_CHANNELS: usize = 5;
const WEIGHT: usize = 4;

/// Accumulation buffer that samples are splatted onto.
///
/// Pixel `(x, y)` has its center at `(x + 0.5, y + 0.5)`. Samples only reach
/// pixels inside the film, there is no border.
#[derive(Debug, Clone)]
pub struct ImageBlock {
    data: Array3<f32>,
    filter: ReconstructionFilter,
}

/// A pixel touched by a sample, and the filter weight of that sample there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub x: usize,
    pub y: usize,
    pub weight: f32,
}

impl ImageBlock {
    pub fn new(width: usize, height: usize, filter: ReconstructionFilter) -> Self {
        Self {
            data: Array3::zeros((height, width, BLOCK_CHANNELS)),
            filter,
        }
    }

    /// The `(width, height)` of the block in pixels.
    pub fn size(&self) -> (usize, usize) {
        let (height, width, _) = self.data.dim();
        (width, height)
    }

    pub fn clear(&mut self) {
        self.data.fill(0.);
    }

    /// The raw `[height, width, 5]` accumulation buffer.
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    fn axis_taps(&self, p: f32, size: usize) -> Vec<(usize, f32)> {
        let radius = self.filter.radius();
        let p = p - 0.5;
        let lo = (p - radius).ceil().max(0.);
        let hi = (p + radius).floor();

        if size == 0 || hi < lo {
            return Vec::new();
        }

        let hi = (hi as usize).min(size - 1);
        (lo as usize..=hi)
            .map(|i| (i, self.filter.eval(i as f32 - p)))
            .filter(|&(_, w)| w != 0.)
            .collect()
    }

    /// The pixels a sample at film position `pos` contributes to.
    pub fn footprint(&self, pos: [f32; 2]) -> Vec<Tap> {
        if !pos.iter().all(|p| p.is_finite()) {
            return Vec::new();
        }

        let (width, height) = self.size();
        let xs = self.axis_taps(pos[0], width);
        let ys = self.axis_taps(pos[1], height);

        ys.iter()
            .flat_map(|&(y, wy)| xs.iter().map(move |&(x, wx)| Tap { x, y, weight: wx * wy }))
            .collect()
    }

    /// Splats a sample with value `xyz` and coverage `alpha` at film position `pos`.
    ///
    /// # Returns
    /// `false` if the sample was dropped for holding non finite values.
    pub fn put(&mut self, pos: [f32; 2], xyz: [f32; 3], alpha: f32) -> bool {
        if !xyz.iter().all(|v| v.is_finite()) {
            warn!(x = pos[0], y = pos[1]; "dropping non finite sample");
            return false;
        }

        for Tap { x, y, weight } in self.footprint(pos) {
            let mut pixel = self.data.slice_mut(s![y, x, ..]);
            pixel[0] += weight * xyz[0];
            pixel[1] += weight * xyz[1];
            pixel[2] += weight * xyz[2];
            pixel[3] += weight * alpha;
            pixel[WEIGHT] += weight;
        }

        true
    }

    /// Sum of filter weights that landed on pixel `(x, y)`.
    pub fn weight(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x, WEIGHT]]
    }

    /// Normalizes every pixel by its weight and converts it into `format`.
    ///
    /// # Returns
    /// An image of shape `[height, width, format.channels()]`. Pixels no sample
    /// reached are zero.
    pub fn develop(&self, format: PixelFormat) -> Array3<f32> {
        let (width, height) = self.size();
        let mut image = Array3::zeros((height, width, format.channels()));

        Zip::from(image.lanes_mut(Axis(2)))
            .and(self.data.lanes(Axis(2)))
            .for_each(|mut out, px| {
                let w = px[WEIGHT];
                if w <= 0. {
                    return;
                }

                let mut buf = [0.; 3];
                format.convert([px[0] / w, px[1] / w, px[2] / w], &mut buf);
                out.iter_mut().zip(buf).for_each(|(o, v)| *o = v);
            });

        image
    }
}
