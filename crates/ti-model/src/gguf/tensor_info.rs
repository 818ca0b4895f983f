use std::fmt;

use crate::error::{ModelError, Result};
use super::cursor::ByteCursor;
use super::metadata::write_string;

/// Storage format of a weight tensor inside the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    F32,
    F16,
    /// 34-byte blocks of 32 elements: f16 scale followed by 32 signed bytes.
    Q8_0,
}

impl WeightFormat {
    /// Elements per storage block (1 for unquantized formats).
    pub fn block_size(&self) -> usize {
        match self {
            WeightFormat::F32 | WeightFormat::F16 => 1,
            WeightFormat::Q8_0 => 32,
        }
    }

    /// Bytes per storage block.
    pub fn block_bytes(&self) -> usize {
        match self {
            WeightFormat::F32 => 4,
            WeightFormat::F16 => 2,
            WeightFormat::Q8_0 => 34,
        }
    }

    pub fn from_gguf_type(id: u32) -> Option<WeightFormat> {
        match id {
            0 => Some(WeightFormat::F32),
            1 => Some(WeightFormat::F16),
            8 => Some(WeightFormat::Q8_0),
            _ => None,
        }
    }

    pub fn to_gguf_type(&self) -> u32 {
        match self {
            WeightFormat::F32 => 0,
            WeightFormat::F16 => 1,
            WeightFormat::Q8_0 => 8,
        }
    }
}

impl fmt::Display for WeightFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightFormat::F32 => write!(f, "f32"),
            WeightFormat::F16 => write!(f, "f16"),
            WeightFormat::Q8_0 => write!(f, "q8_0"),
        }
    }
}

/// Describes a single tensor stored within a GGUF file.
#[derive(Debug, Clone, PartialEq)]
pub struct GgufTensorInfo {
    pub name: String,
    /// Dimension sizes, innermost first (GGUF `ne` order).
    pub dims: Vec<u64>,
    pub format: WeightFormat,
    /// Byte offset from the start of the tensor data section.
    pub offset: u64,
}

impl GgufTensorInfo {
    /// Element count, or `None` if the dims overflow `usize`.
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(usize::try_from(d).ok()?))
    }

    /// Raw byte size in the file, or `None` on overflow.
    pub fn checked_data_size(&self) -> Option<usize> {
        self.checked_numel()?
            .div_ceil(self.format.block_size())
            .checked_mul(self.format.block_bytes())
    }

    /// Element count. Saturates for dims that `parse_tensor_infos` would
    /// have rejected.
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }

    /// Total byte size of this tensor's raw data in the file. Saturates
    /// like `numel`.
    pub fn data_size(&self) -> usize {
        self.checked_data_size().unwrap_or(usize::MAX)
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_string(out, &self.name);
        out.extend_from_slice(&(self.dims.len() as u32).to_le_bytes());
        for d in &self.dims {
            out.extend_from_slice(&d.to_le_bytes());
        }
        out.extend_from_slice(&self.format.to_gguf_type().to_le_bytes());
        out.extend_from_slice(&self.offset.to_le_bytes());
    }
}

/// Parse `n_tensors` entries of: name, u32 rank, rank x u64 dims,
/// u32 GGUF type ID, u64 data offset.
pub fn parse_tensor_infos(cursor: &mut ByteCursor<'_>, n_tensors: u64) -> Result<Vec<GgufTensorInfo>> {
    let mut infos = Vec::new();
    for _ in 0..n_tensors {
        let name = cursor.read_string()?;

        let n_dims = cursor.read_u32()?;
        let dims = (0..n_dims)
            .map(|_| cursor.read_u64())
            .collect::<Result<Vec<u64>>>()?;

        let type_id = cursor.read_u32()?;
        let format = WeightFormat::from_gguf_type(type_id)
            .ok_or(ModelError::UnsupportedGgufType(type_id))?;

        let offset = cursor.read_u64()?;

        let info = GgufTensorInfo {
            name,
            dims,
            format,
            offset,
        };
        if info.checked_data_size().is_none() {
            return Err(ModelError::InvalidTensor {
                name: info.name,
                reason: format!("dims {:?} overflow the addressable size", info.dims),
            });
        }
        infos.push(info);
    }
    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_size() {
        let info = GgufTensorInfo {
            name: "w".into(),
            dims: vec![2, 40],
            format: WeightFormat::Q8_0,
            offset: 0,
        };
        // 80 elements -> 3 blocks of 34 bytes.
        assert_eq!(info.data_size(), 102);

        let f = GgufTensorInfo {
            format: WeightFormat::F16,
            ..info
        };
        assert_eq!(f.data_size(), 160);
    }

    #[test]
    fn test_write_then_parse() {
        let info = GgufTensorInfo {
            name: "token_embd.weight".into(),
            dims: vec![2, 5],
            format: WeightFormat::F32,
            offset: 64,
        };
        let mut bytes = Vec::new();
        info.write(&mut bytes);
        let parsed = parse_tensor_infos(&mut ByteCursor::new(&bytes), 1).unwrap();
        assert_eq!(parsed, vec![info]);
    }

    #[test]
    fn test_overflowing_dims_rejected() {
        let info = GgufTensorInfo {
            name: "token_embd.weight".into(),
            dims: vec![1 << 40, 1 << 40],
            format: WeightFormat::F32,
            offset: 0,
        };
        assert_eq!(info.checked_numel(), None);
        assert_eq!(info.data_size(), usize::MAX);

        let mut bytes = Vec::new();
        info.write(&mut bytes);
        assert!(matches!(
            parse_tensor_infos(&mut ByteCursor::new(&bytes), 1),
            Err(ModelError::InvalidTensor { .. })
        ));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(WeightFormat::from_gguf_type(2).is_none());
        assert_eq!(WeightFormat::from_gguf_type(8), Some(WeightFormat::Q8_0));
    }
}
