use serde::{Deserialize, Serialize};

/// Image reconstruction filter used when splatting samples onto the film.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReconstructionFilter {
    /// Each sample only contributes to the pixel it lands in.
    #[default]
    Box,
    /// Truncated Gaussian, shifted so that it reaches zero at `4 * stddev`.
    Gaussian { stddev: f32 },
}

impl ReconstructionFilter {
    pub fn radius(&self) -> f32 {
        match *self {
            ReconstructionFilter::Box => 0.5,
            ReconstructionFilter::Gaussian { stddev } => 4. * stddev,
        }
    }

    /// Evaluates the 1D filter at offset `x` from its center.
    pub fn eval(&self, x: f32) -> f32 {
        match *self {
            ReconstructionFilter::Box => {
                if x.abs() <= 0.5 {
                    1.
                } else {
                    0.
                }
            }
            ReconstructionFilter::Gaussian { stddev } => {
                let alpha = -1. / (2. * stddev * stddev);
                let bias = (alpha * self.radius().powi(2)).exp();
                ((alpha * x * x).exp() - bias).max(0.)
            }
        }
    }
}

/// The film of a sensor: its resolution and reconstruction filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    width: usize,
    height: usize,
    filter: ReconstructionFilter,
}

impl Film {
    pub fn new(width: usize, height: usize, filter: ReconstructionFilter) -> Self {
        Self {
            width,
            height,
            filter,
        }
    }

    /// The `(width, height)` of the film in pixels.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn filter(&self) -> ReconstructionFilter {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_vanishes_at_radius() {
        let filter = ReconstructionFilter::Gaussian { stddev: 0.5 };
        assert_eq!(filter.radius(), 2.);
        assert_eq!(filter.eval(2.), 0.);
        assert!(filter.eval(0.) > filter.eval(1.));
    }

    #[test]
    fn test_box_is_one_inside() {
        let filter = ReconstructionFilter::Box;
        assert_eq!(filter.eval(0.3), 1.);
        assert_eq!(filter.eval(-0.6), 0.);
    }

    #[test]
    fn test_deserialize_filter() {
        let filter: ReconstructionFilter =
            serde_json::from_str(r#"{ "type": "gaussian", "stddev": 0.5 }"#).unwrap();
        assert_eq!(filter, ReconstructionFilter::Gaussian { stddev: 0.5 });

        let filter: ReconstructionFilter = serde_json::from_str(r#"{ "type": "box" }"#).unwrap();
        assert_eq!(filter, ReconstructionFilter::Box);
    }
}
