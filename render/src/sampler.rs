use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of the random numbers used to place samples on the film.
pub trait Sampler {
    /// The default amount of samples per pixel.
    fn sample_count(&self) -> u32;

    /// Returns an independent copy of this sampler, starting from its current state.
    fn clone_box(&self) -> Box<dyn Sampler>;

    fn next_1d(&mut self) -> f32;

    fn next_2d(&mut self) -> [f32; 2];
}

/// Uniform samples in `[0, 1)` without any stratification.
#[derive(Debug, Clone)]
pub struct IndependentSampler {
    sample_count: u32,
    rng: StdRng,
}

impl IndependentSampler {
    pub fn new(sample_count: u32, seed: u64) -> Self {
        Self {
            sample_count,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for IndependentSampler {
    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn clone_box(&self) -> Box<dyn Sampler> {
        Box::new(self.clone())
    }

    fn next_1d(&mut self) -> f32 {
        self.rng.random()
    }

    fn next_2d(&mut self) -> [f32; 2] {
        [self.rng.random(), self.rng.random()]
    }
}
