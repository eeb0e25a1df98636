use crate::{Film, Sampler};

/// Shortest and longest wavelength (in nm) that sensors sample.
pub const WAVELENGTH_MIN: f32 = 360.;
pub const WAVELENGTH_MAX: f32 = 830.;

/// A primary ray leaving the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub time: f32,
    /// Wavelength in nanometers carried by this ray.
    pub wavelength: f32,
}

/// Maps a uniform sample in `[0, 1)` onto the visible range.
pub fn sample_wavelength(sample: f32) -> f32 {
    WAVELENGTH_MIN + (WAVELENGTH_MAX - WAVELENGTH_MIN) * sample
}

/// The measuring device of a scene.
pub trait Sensor {
    fn film(&self) -> &Film;

    fn sampler(&self) -> &dyn Sampler;

    /// Generates a ray for a sample on the film.
    ///
    /// # Arguments
    /// * `time` - The time at which the ray is traced.
    /// * `wavelength_sample` - Uniform sample used to choose the wavelength.
    /// * `position_sample` - Position on the film, normalized to `[0, 1)^2`.
    ///
    /// # Returns
    /// The ray and its importance weight.
    fn sample_ray(&self, time: f32, wavelength_sample: f32, position_sample: [f32; 2])
    -> (Ray, f32);
}
