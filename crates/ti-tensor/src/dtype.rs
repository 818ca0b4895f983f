use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;

/// Element types a runtime tensor can carry.
///
/// Inputs to the text models are always `I32` token ids. Outputs depend on
/// how the model was quantized: 8/16/32-bit integers carrying affine
/// quantization parameters, or plain floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Unsigned 8-bit integer (asymmetric quantization).
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// 16-bit floating point (via the `half` crate).
    F16,
    /// 32-bit floating point.
    F32,
}

impl DType {
    /// Width in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::I16 | DType::F16 => 2,
            DType::I32 | DType::F32 => 4,
        }
    }

    /// Returns true for integer types, whose values are only meaningful
    /// together with quantization parameters.
    pub fn is_quantized(&self) -> bool {
        !self.is_float()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::F32)
    }

    /// Inclusive value range of an integer type, `None` for floats.
    pub fn int_range(&self) -> Option<(i64, i64)> {
        match self {
            DType::U8 => Some((u8::MIN as i64, u8::MAX as i64)),
            DType::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            DType::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            DType::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            DType::F16 | DType::F32 => None,
        }
    }

    /// Short lowercase name, as used in model metadata.
    pub fn name(&self) -> &'static str {
        match self {
            DType::U8 => "u8",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::F16 => "f16",
            DType::F32 => "f32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(DType::U8),
            "i8" | "int8" => Ok(DType::I8),
            "i16" | "int16" => Ok(DType::I16),
            "i32" | "int32" => Ok(DType::I32),
            "f16" | "float16" => Ok(DType::F16),
            "f32" | "float32" => Ok(DType::F32),
            other => Err(TensorError::UnsupportedDType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DType; 6] = [DType::U8, DType::I8, DType::I16, DType::I32, DType::F16, DType::F32];

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(DType::U8.size_in_bytes(), 1);
        assert_eq!(DType::I8.size_in_bytes(), 1);
        assert_eq!(DType::I16.size_in_bytes(), 2);
        assert_eq!(DType::F16.size_in_bytes(), 2);
        assert_eq!(DType::I32.size_in_bytes(), 4);
        assert_eq!(DType::F32.size_in_bytes(), 4);
    }

    #[test]
    fn test_parse_names() {
        for dtype in ALL {
            assert_eq!(dtype.name().parse::<DType>().unwrap(), dtype);
        }
        assert_eq!("UINT8".parse::<DType>().unwrap(), DType::U8);
        assert!("q4_0".parse::<DType>().is_err());
    }

    #[test]
    fn test_int_range() {
        assert_eq!(DType::U8.int_range(), Some((0, 255)));
        assert_eq!(DType::I8.int_range(), Some((-128, 127)));
        assert!(DType::F32.int_range().is_none());
        assert!(DType::I16.is_quantized());
        assert!(!DType::F16.is_quantized());
    }
}
