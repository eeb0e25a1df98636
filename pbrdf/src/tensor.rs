use std::{collections::BTreeMap, fs, path::Path};

use bytemuck::{Pod, pod_read_unaligned};
use half::f16;
use log::debug;

use crate::{PbrdfErr, Result};

pub const MAGIC: &[u8; 12] = b"tensor_file\0";
pub const VERSION: (u8, u8) = (1, 0);

/// Element type of a tensor field, numbered as in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
}

impl Dtype {
    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        match self {
            Dtype::Int8 | Dtype::UInt8 => 1,
            Dtype::Int16 | Dtype::UInt16 | Dtype::Float16 => 2,
            Dtype::Int32 | Dtype::UInt32 | Dtype::Float32 => 4,
            Dtype::Int64 | Dtype::UInt64 | Dtype::Float64 => 8,
        }
    }
}

impl TryFrom<u8> for Dtype {
    type Error = PbrdfErr;

    fn try_from(value: u8) -> Result<Self> {
        let dtype = match value {
            0 => Dtype::Int8,
            1 => Dtype::UInt8,
            2 => Dtype::Int16,
            3 => Dtype::UInt16,
            4 => Dtype::Int32,
            5 => Dtype::UInt32,
            6 => Dtype::Int64,
            7 => Dtype::UInt64,
            8 => Dtype::Float16,
            9 => Dtype::Float32,
            10 => Dtype::Float64,
            other => return Err(PbrdfErr::UnknownDtype(other)),
        };

        Ok(dtype)
    }
}

/// A named n-dimensional array stored in a tensor file.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    dtype: Dtype,
    shape: Vec<usize>,
    data: Vec<u8>,
}

/// Number of bytes taken by a field of `shape`, `None` if it overflows.
fn byte_size(shape: &[usize], dtype: Dtype) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))?
        .checked_mul(dtype.size())
}

fn read_all<T: Pod, U>(data: &[u8], f: impl Fn(T) -> U) -> Vec<U> {
    data.chunks_exact(size_of::<T>())
        .map(|chunk| f(pod_read_unaligned(chunk)))
        .collect()
}

impl Field {
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        // the shape's byte size was checked for overflow when the field was read
        self.data.len() / self.dtype.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw little endian bytes of the field.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Converts every element to `f32`, in row major order.
    pub fn to_f32(&self) -> Vec<f32> {
        let data = &self.data[..];
        match self.dtype {
            Dtype::Int8 => data.iter().map(|&b| b as i8 as f32).collect(),
            Dtype::UInt8 => data.iter().map(|&b| b as f32).collect(),
            Dtype::Int16 => read_all(data, |v: i16| i16::from_le(v) as f32),
            Dtype::UInt16 => read_all(data, |v: u16| u16::from_le(v) as f32),
            Dtype::Int32 => read_all(data, |v: i32| i32::from_le(v) as f32),
            Dtype::UInt32 => read_all(data, |v: u32| u32::from_le(v) as f32),
            Dtype::Int64 => read_all(data, |v: i64| i64::from_le(v) as f32),
            Dtype::UInt64 => read_all(data, |v: u64| u64::from_le(v) as f32),
            Dtype::Float16 => read_all(data, |v: u16| f16::from_bits(u16::from_le(v)).to_f32()),
            Dtype::Float32 => read_all(data, |v: u32| f32::from_bits(u32::from_le(v))),
            Dtype::Float64 => read_all(data, |v: u64| f64::from_bits(u64::from_le(v)) as f32),
        }
    }
}

/// Cursor over the header of a tensor file.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.buf.len());
        let Some(end) = end else {
            return Err(PbrdfErr::Truncated {
                what,
                offset: self.pos,
            });
        };

        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read<T: Pod>(&mut self, what: &'static str) -> Result<T> {
        Ok(pod_read_unaligned(self.take(size_of::<T>(), what)?))
    }

    fn u8(&mut self, what: &'static str) -> Result<u8> {
        self.read(what)
    }

    fn u16(&mut self, what: &'static str) -> Result<u16> {
        self.read(what).map(u16::from_le)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        self.read(what).map(u32::from_le)
    }

    fn u64(&mut self, what: &'static str) -> Result<usize> {
        self.read(what).map(|v: u64| u64::from_le(v) as usize)
    }
}

/// A set of named tensors, as stored by the tabulated BSDF models.
///
/// The layout is the magic `tensor_file\0`, a `u8` major and minor version, a
/// `u32` field count, then for every field its `u16` name length, the name,
/// a `u16` rank, a `u8` data type, a `u64` absolute data offset and the `u64`
/// extent of every axis. All integers are little endian.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorFile {
    fields: BTreeMap<String, Field>,
}

impl TensorFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        debug!(path = display.as_str(); "reading tensor file");
        Self::from_bytes(&fs::read(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { buf: bytes, pos: 0 };

        if reader.take(MAGIC.len(), "magic").map_err(|_| PbrdfErr::BadMagic)? != MAGIC {
            return Err(PbrdfErr::BadMagic);
        }

        let major = reader.u8("version")?;
        let minor = reader.u8("version")?;
        if (major, minor) != VERSION {
            return Err(PbrdfErr::UnsupportedVersion { major, minor });
        }

        let count = reader.u32("field count")?;
        let mut fields = BTreeMap::new();

        for _ in 0..count {
            let name_len = reader.u16("field name length")? as usize;
            let name = String::from_utf8_lossy(reader.take(name_len, "field name")?).into_owned();
            let ndim = reader.u16("field rank")? as usize;
            let dtype = Dtype::try_from(reader.u8("field type")?)?;
            let offset = reader.u64("field offset")?;
            let shape = (0..ndim)
                .map(|_| reader.u64("field shape"))
                .collect::<Result<Vec<_>>>()?;

            let Some(size) = byte_size(&shape, dtype) else {
                return Err(PbrdfErr::InvalidShape {
                    field: name,
                    got: shape,
                    expected: Vec::new(),
                });
            };

            let mut data_reader = Reader {
                buf: bytes,
                pos: offset,
            };
            let data = data_reader.take(size, "field data")?.to_vec();

            debug!(name = name.as_str(), ndim = ndim, size = size; "read tensor field");
            fields.insert(name, Field { dtype, shape, data });
        }

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Field> {
        self.field(name)
            .ok_or_else(|| PbrdfErr::MissingField(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(count: u32) -> Vec<u8> {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&count.to_le_bytes());
        buf
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = TensorFile::from_bytes(b"tensor_fil").unwrap_err();
        assert!(matches!(err, PbrdfErr::BadMagic));

        let err = TensorFile::from_bytes(b"something_else\0\0\0").unwrap_err();
        assert!(matches!(err, PbrdfErr::BadMagic));
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&[2, 1, 0, 0, 0, 0]);

        let err = TensorFile::from_bytes(&buf).unwrap_err();
        assert!(matches!(
            err,
            PbrdfErr::UnsupportedVersion { major: 2, minor: 1 }
        ));
    }

    #[test]
    fn test_reports_truncated_header() {
        let mut buf = header(1);
        buf.extend_from_slice(&5u16.to_le_bytes());
        buf.extend_from_slice(b"ab");

        let err = TensorFile::from_bytes(&buf).unwrap_err();
        assert!(matches!(err, PbrdfErr::Truncated { what: "field name", .. }));
    }

    #[test]
    fn test_reads_half_precision_field() {
        let mut buf = header(1);
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(b'h');
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(8);
        let offset = buf.len() as u64 + 16;
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&2u64.to_le_bytes());
        for v in [0.5f32, -2.] {
            buf.extend_from_slice(&f16::from_f32(v).to_bits().to_le_bytes());
        }

        let file = TensorFile::from_bytes(&buf).unwrap();
        let field = file.field("h").unwrap();
        assert_eq!(field.dtype(), Dtype::Float16);
        assert_eq!(field.shape(), &[2]);
        assert_eq!(field.to_f32(), vec![0.5, -2.]);
    }

    #[test]
    fn test_rejects_unknown_dtype() {
        let mut buf = header(1);
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(b'x');
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.push(42);

        let err = TensorFile::from_bytes(&buf).unwrap_err();
        assert!(matches!(err, PbrdfErr::UnknownDtype(42)));
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let mut buf = header(1);
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(b'm');
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.push(9);
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&(1u64 << 62).to_le_bytes());
        buf.extend_from_slice(&8u64.to_le_bytes());

        let err = TensorFile::from_bytes(&buf).unwrap_err();
        assert!(matches!(err, PbrdfErr::InvalidShape { ref field, .. } if field == "m"));
    }

    #[test]
    fn test_field_len_counts_elements() {
        let mut buf = header(1);
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(b'd');
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.push(10);
        let offset = buf.len() as u64 + 24;
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&2u64.to_le_bytes());
        buf.extend_from_slice(&3u64.to_le_bytes());
        buf.extend((0..6).flat_map(|i| (i as f64).to_le_bytes()));

        let file = TensorFile::from_bytes(&buf).unwrap();
        let field = file.require("d").unwrap();
        assert_eq!(field.len(), 6);
        assert_eq!(field.to_f32(), vec![0., 1., 2., 3., 4., 5.]);
    }
}
