mod block;
mod bridge;
pub mod demo;
mod error;
mod film;
mod format;
mod integrator;
mod pipeline;
mod sampler;
mod sensor;

pub use block::{BLOCK_CHANNELS, ImageBlock, Tap};
pub use bridge::{
    AutogradFunction, RenderArg, RenderCtx, RenderFunction, render_function, render_torch,
};
pub use error::{RenderErr, Result};
pub use film::{Film, ReconstructionFilter};
pub use format::{PixelFormat, srgb_to_xyz, srgb_to_xyz_adjoint, xyz_to_srgb};
pub use integrator::{Integrator, Scene};
pub use pipeline::{Rendered, SampleRecord, render, render_path};
pub use sampler::{IndependentSampler, Sampler};
pub use sensor::{Ray, Sensor, WAVELENGTH_MAX, WAVELENGTH_MIN, sample_wavelength};
