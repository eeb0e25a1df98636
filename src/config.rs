use std::{fs, num::NonZeroUsize, path::Path};

use anyhow::{Context, Result};
use optimization::OptimizerSpec;
use render::PixelFormat;
use serde::{Deserialize, Serialize};

/// Settings of an optimization run, read from a JSON file.
///
/// Every field is optional, missing ones take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub optimizer: OptimizerSpec,
    pub iterations: usize,
    pub spp: u32,
    pub pixel_format: PixelFormat,
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    /// Renders averaged per optimizer step.
    pub accumulate: Option<NonZeroUsize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerSpec::Adam {
                lr: 0.05,
                beta_1: 0.9,
                beta_2: 0.999,
                epsilon: 1e-8,
            },
            iterations: 50,
            spp: 4,
            pixel_format: PixelFormat::Rgb,
            width: 16,
            height: 16,
            seed: 0,
            accumulate: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;

        serde_json::from_str(&content).with_context(|| format!("invalid config '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{ "optimizer": { "type": "sgd", "lr": 0.5 }, "pixel_format": "y", "accumulate": 2 }"#,
        )
        .unwrap();

        assert_eq!(
            config.optimizer,
            OptimizerSpec::Sgd {
                lr: 0.5,
                momentum: 0.
            }
        );
        assert_eq!(config.pixel_format, PixelFormat::Y);
        assert_eq!(config.accumulate, NonZeroUsize::new(2));
        assert_eq!(config.iterations, RunConfig::default().iterations);
    }

    #[test]
    fn test_rejects_unknown_pixel_format() {
        assert!(serde_json::from_str::<RunConfig>(r#"{ "pixel_format": "rgba" }"#).is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = RunConfig::load("/nonexistent/run.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
