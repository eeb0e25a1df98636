use std::path::Path;

use log::debug;
use ndarray::{Array1, Array6, s};

use crate::{Mueller, PbrdfErr, Result, TensorFile};

/// Measured polarized BRDF data in the Rusinkiewicz parameterization.
///
/// `M` holds one Mueller matrix per `(phi_d, theta_d, theta_h, wavelength)`
/// sample of the axes.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrdfTable {
    phi_d: Array1<f32>,
    theta_d: Array1<f32>,
    theta_h: Array1<f32>,
    wavelengths: Array1<f32>,
    mueller: Array6<f32>,
}

fn axis(file: &TensorFile, name: &str) -> Result<Array1<f32>> {
    let field = file.require(name)?;
    if field.shape().len() != 1 {
        return Err(PbrdfErr::InvalidShape {
            field: name.to_string(),
            got: field.shape().to_vec(),
            expected: vec![field.len()],
        });
    }

    Ok(Array1::from(field.to_f32()))
}

impl PbrdfTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_tensor_file(&TensorFile::open(path)?)
    }

    /// Validates and extracts the fields `phi_d`, `theta_d`, `theta_h`,
    /// `wvls` and `M`.
    pub fn from_tensor_file(file: &TensorFile) -> Result<Self> {
        let phi_d = axis(file, "phi_d")?;
        let theta_d = axis(file, "theta_d")?;
        let theta_h = axis(file, "theta_h")?;
        let wavelengths = axis(file, "wvls")?;

        let expected = vec![
            phi_d.len(),
            theta_d.len(),
            theta_h.len(),
            wavelengths.len(),
            4,
            4,
        ];
        let field = file.require("M")?;
        if field.shape() != expected {
            return Err(PbrdfErr::InvalidShape {
                field: "M".to_string(),
                got: field.shape().to_vec(),
                expected,
            });
        }

        let shape = (expected[0], expected[1], expected[2], expected[3], 4, 4);
        let mueller = Array6::from_shape_vec(shape, field.to_f32()).map_err(|_| {
            PbrdfErr::InvalidShape {
                field: "M".to_string(),
                got: field.shape().to_vec(),
                expected: expected.clone(),
            }
        })?;

        debug!(
            phi_d = phi_d.len(),
            theta_d = theta_d.len(),
            theta_h = theta_h.len(),
            wavelengths = wavelengths.len();
            "loaded pbrdf table"
        );

        Ok(Self {
            phi_d,
            theta_d,
            theta_h,
            wavelengths,
            mueller,
        })
    }

    pub fn phi_d(&self) -> &Array1<f32> {
        &self.phi_d
    }

    pub fn theta_d(&self) -> &Array1<f32> {
        &self.theta_d
    }

    pub fn theta_h(&self) -> &Array1<f32> {
        &self.theta_h
    }

    pub fn wavelengths(&self) -> &Array1<f32> {
        &self.wavelengths
    }

    /// The `[phi_d, theta_d, theta_h, wavelength, 4, 4]` tensor.
    pub fn data(&self) -> &Array6<f32> {
        &self.mueller
    }

    /// The Mueller matrix stored at the given sample indices, `None` if any
    /// index is out of range.
    pub fn mueller(
        &self,
        phi_d: usize,
        theta_d: usize,
        theta_h: usize,
        wavelength: usize,
    ) -> Option<Mueller> {
        let (p, td, th, w, _, _) = self.mueller.dim();
        if phi_d >= p || theta_d >= td || theta_h >= th || wavelength >= w {
            return None;
        }

        let view = self.mueller.slice(s![phi_d, theta_d, theta_h, wavelength, .., ..]);
        let mut m = Mueller::default();
        for ((row, col), v) in view.indexed_iter() {
            m[(row, col)] = *v;
        }
        Some(m)
    }
}
