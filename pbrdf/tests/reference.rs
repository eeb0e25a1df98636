use pbrdf::{
    MAGIC, Mueller, PbrdfErr, PbrdfTable, PolarizedBsdf, REFERENCE, REFERENCE_WAVELENGTH,
    TensorFile, check_reference,
};

/// Encodes `f32` fields into a version 1.0 tensor file.
fn encode(fields: &[(&str, Vec<usize>, Vec<f32>)]) -> Vec<u8> {
    let header_len: usize = MAGIC.len()
        + 2
        + 4
        + fields
            .iter()
            .map(|(name, shape, _)| 2 + name.len() + 2 + 1 + 8 + 8 * shape.len())
            .sum::<usize>();

    let mut header = MAGIC.to_vec();
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&(fields.len() as u32).to_le_bytes());

    let mut data = Vec::new();
    for (name, shape, values) in fields {
        header.extend_from_slice(&(name.len() as u16).to_le_bytes());
        header.extend_from_slice(name.as_bytes());
        header.extend_from_slice(&(shape.len() as u16).to_le_bytes());
        header.push(9);
        header.extend_from_slice(&((header_len + data.len()) as u64).to_le_bytes());
        for &n in shape {
            header.extend_from_slice(&(n as u64).to_le_bytes());
        }
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
    }

    assert_eq!(header.len(), header_len);
    header.extend(data);
    header
}

/// A 2x1x1x1 table whose second `phi_d` sample holds the reference matrix.
fn spectralon_like() -> Vec<u8> {
    let mut m = vec![0.; 16];
    m.extend(REFERENCE.0.iter().flatten());

    encode(&[
        ("phi_d", vec![2], vec![0., 180.]),
        ("theta_d", vec![1], vec![20.]),
        ("theta_h", vec![1], vec![15.]),
        ("wvls", vec![1], vec![500.]),
        ("M", vec![2, 1, 1, 1, 4, 4], m),
    ])
}

/// Returns the stored matrix of the closest `phi_d` sample for a fixed
/// half-vector configuration.
struct NearestPhi {
    table: PbrdfTable,
}

impl PolarizedBsdf for NearestPhi {
    fn eval(&self, wi: [f32; 3], wo: [f32; 3], wavelength: f32) -> Mueller {
        assert_eq!(wavelength, REFERENCE_WAVELENGTH);
        let phi_i = wi[1].atan2(wi[0]).to_degrees();
        let phi_o = wo[1].atan2(wo[0]).to_degrees();
        let phi_d = (phi_o - phi_i).abs();

        let index = self
            .table
            .phi_d()
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - phi_d).abs().total_cmp(&(b.1 - phi_d).abs()))
            .map_or(0, |(i, _)| i);

        self.table.mueller(index, 0, 0, 0).unwrap_or_default()
    }
}

struct Perturbed<B>(B);

impl<B: PolarizedBsdf> PolarizedBsdf for Perturbed<B> {
    fn eval(&self, wi: [f32; 3], wo: [f32; 3], wavelength: f32) -> Mueller {
        let mut m = self.0.eval(wi, wo, wavelength);
        m[(2, 2)] *= 1.01;
        m
    }
}

#[test]
fn test_table_fields_are_validated() {
    let file = TensorFile::from_bytes(&spectralon_like()).unwrap();
    let table = PbrdfTable::from_tensor_file(&file).unwrap();

    assert_eq!(table.data().dim(), (2, 1, 1, 1, 4, 4));
    assert_eq!(table.wavelengths().to_vec(), vec![500.]);
    assert_eq!(table.mueller(1, 0, 0, 0), Some(REFERENCE));
    assert_eq!(table.mueller(2, 0, 0, 0), None);
}

#[test]
fn test_mismatched_mueller_shape_is_rejected() {
    let bytes = encode(&[
        ("phi_d", vec![2], vec![0., 180.]),
        ("theta_d", vec![1], vec![20.]),
        ("theta_h", vec![1], vec![15.]),
        ("wvls", vec![1], vec![500.]),
        ("M", vec![1, 1, 1, 1, 4, 4], vec![0.; 16]),
    ]);
    let file = TensorFile::from_bytes(&bytes).unwrap();

    let err = PbrdfTable::from_tensor_file(&file).unwrap_err();
    assert!(matches!(err, PbrdfErr::InvalidShape { ref field, .. } if field == "M"));
}

#[test]
fn test_missing_field_is_reported() {
    let bytes = encode(&[("phi_d", vec![1], vec![0.])]);
    let file = TensorFile::from_bytes(&bytes).unwrap();

    let err = PbrdfTable::from_tensor_file(&file).unwrap_err();
    assert!(matches!(err, PbrdfErr::MissingField(ref name) if name == "theta_d"));
}

#[test]
fn test_reference_matrix_is_reproduced() {
    let path = std::env::temp_dir().join("pbrdf_reference_test.tensor");
    std::fs::write(&path, spectralon_like()).unwrap();
    let table = PbrdfTable::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let bsdf = NearestPhi { table };
    let got = check_reference(&bsdf).unwrap();
    assert!(got.allclose(&REFERENCE));

    let err = check_reference(&Perturbed(bsdf)).unwrap_err();
    assert!(matches!(err, PbrdfErr::ReferenceMismatch { .. }));
}
