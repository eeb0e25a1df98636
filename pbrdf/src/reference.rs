use log::debug;

use crate::{Mueller, PbrdfErr, Result};

/// Tabulated BSDF that returns a Mueller matrix for a pair of directions.
pub trait PolarizedBsdf {
    /// # Arguments
    /// * `wi` - Incident direction in the local shading frame.
    /// * `wo` - Outgoing direction in the local shading frame.
    /// * `wavelength` - In nanometers.
    fn eval(&self, wi: [f32; 3], wo: [f32; 3], wavelength: f32) -> Mueller;
}

/// Unit vector for the spherical angles `theta` (from the normal) and `phi`,
/// both in degrees.
pub fn direction(theta: f32, phi: f32) -> [f32; 3] {
    let (sin_theta, cos_theta) = theta.to_radians().sin_cos();
    let (sin_phi, cos_phi) = phi.to_radians().sin_cos();
    [sin_theta * cos_phi, sin_theta * sin_phi, cos_theta]
}

/// Incident `(phi, theta)` in degrees of the reference evaluation.
pub const REFERENCE_INCIDENT: (f32, f32) = (30., 10.);
/// Outgoing `(phi, theta)` in degrees of the reference evaluation.
pub const REFERENCE_OUTGOING: (f32, f32) = (180., 40.);
pub const REFERENCE_WAVELENGTH: f32 = 500.;

/// Value of the low resolution spectralon measurement at the reference
/// directions.
pub const REFERENCE: Mueller = Mueller([
    [0.10709418, 0.00101667, 0.00030897, -0.00033723],
    [-0.00213606, 0.00369295, -0.00124276, 0.00031914],
    [0.00045378, 0.00065644, -0.00414510, 0.00068390],
    [0.00049230, -0.00086907, -0.00068085, -0.00219314],
]);

/// Evaluates `bsdf` at the reference directions and wavelength and compares
/// the result against `REFERENCE`.
pub fn check_reference(bsdf: &dyn PolarizedBsdf) -> Result<Mueller> {
    let (phi_i, theta_i) = REFERENCE_INCIDENT;
    let (phi_o, theta_o) = REFERENCE_OUTGOING;
    let wi = direction(theta_i, phi_i);
    let wo = direction(theta_o, phi_o);

    let got = bsdf.eval(wi, wo, REFERENCE_WAVELENGTH);
    debug!(m00 = got[(0, 0)]; "evaluated reference mueller matrix");

    if !got.allclose(&REFERENCE) {
        return Err(PbrdfErr::ReferenceMismatch {
            got: Box::new(got),
            expected: Box::new(REFERENCE),
        });
    }

    Ok(got)
}
