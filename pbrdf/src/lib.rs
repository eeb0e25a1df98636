mod error;
mod mueller;
mod reference;
mod table;
mod tensor;

pub use error::{PbrdfErr, Result};
pub use mueller::{ATOL, Mueller, RTOL};
pub use reference::{
    PolarizedBsdf, REFERENCE, REFERENCE_INCIDENT, REFERENCE_OUTGOING, REFERENCE_WAVELENGTH,
    check_reference, direction,
};
pub use table::PbrdfTable;
pub use tensor::{Dtype, Field, MAGIC, TensorFile, VERSION};
