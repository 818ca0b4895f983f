use crate::dtype::DType;

/// Affine quantization parameters attached to a tensor.
///
/// A stored integer `q` represents the real value `(q - zero_point) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    pub fn new(scale: f32, zero_point: i32) -> Self {
        QuantParams { scale, zero_point }
    }

    /// `scale = 1`, `zero_point = 0`: stored integers are the real values.
    pub fn identity() -> Self {
        QuantParams::new(1.0, 0)
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.zero_point == 0
    }

    /// Map a stored integer to its real value.
    pub fn dequantize(&self, q: i32) -> f32 {
        (q as i64 - self.zero_point as i64) as f32 * self.scale
    }

    /// Map a real value to the nearest integer representable in `dtype`.
    ///
    /// Values outside the dtype's range saturate. A zero scale maps
    /// everything to the zero point.
    pub fn quantize(&self, x: f32, dtype: DType) -> i32 {
        let (lo, hi) = dtype.int_range().unwrap_or((i32::MIN as i64, i32::MAX as i64));
        if self.scale == 0.0 || !x.is_finite() {
            return (self.zero_point as i64).clamp(lo, hi) as i32;
        }
        let q = (x / self.scale).round() as i64 + self.zero_point as i64;
        q.clamp(lo, hi) as i32
    }
}

impl Default for QuantParams {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dequantize_affine() {
        let q = QuantParams::new(0.5, 10);
        assert_relative_eq!(q.dequantize(10), 0.0);
        assert_relative_eq!(q.dequantize(14), 2.0);
        assert_relative_eq!(q.dequantize(0), -5.0);
    }

    #[test]
    fn test_identity_round_trip() {
        let q = QuantParams::identity();
        for x in [-128.0f32, -3.0, 0.0, 7.0, 127.0] {
            assert_relative_eq!(q.dequantize(q.quantize(x, DType::I8)), x);
        }
        // Fractional values come back within rounding tolerance.
        let back = q.dequantize(q.quantize(2.4, DType::I32));
        assert!((back - 2.4).abs() <= 0.5);
    }

    #[test]
    fn test_quantize_saturates() {
        let q = QuantParams::new(0.1, 128);
        assert_eq!(q.quantize(1000.0, DType::U8), 255);
        assert_eq!(q.quantize(-1000.0, DType::U8), 0);
        assert_eq!(q.quantize(0.0, DType::U8), 128);
    }

    #[test]
    fn test_zero_scale() {
        let q = QuantParams::new(0.0, 3);
        assert_eq!(q.quantize(42.0, DType::I8), 3);
    }

    #[test]
    fn test_scaled_round_trip() {
        let q = QuantParams::new(0.05, -3);
        for x in [-2.0f32, -0.33, 0.0, 1.27, 4.9] {
            let back = q.dequantize(q.quantize(x, DType::I8));
            assert!((back - x).abs() <= q.scale / 2.0 + 1e-6, "{} -> {}", x, back);
        }
    }
}
