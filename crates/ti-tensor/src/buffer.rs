use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::quant::QuantParams;

/// Fixed-capacity byte buffer holding tensor elements in native byte order.
///
/// The backing allocation is sized once, from the element capacity and the
/// dtype width, and never grows. Writes that would exceed the capacity are
/// rejected before any byte is touched, so a failed write leaves the
/// previous contents intact.
#[derive(Debug, Clone)]
pub struct TensorBuffer {
    dtype: DType,
    capacity: usize,
    /// Number of elements holding written data.
    len: usize,
    bytes: Vec<u8>,
}

impl TensorBuffer {
    /// Allocate a zero-filled buffer for `capacity` elements of `dtype`.
    pub fn new(dtype: DType, capacity: usize) -> Self {
        TensorBuffer {
            dtype,
            capacity,
            len: 0,
            bytes: vec![0; capacity * dtype.size_in_bytes()],
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Declared element capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements currently written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write 32-bit integers from the start of the buffer, zero-filling the
    /// remaining slots.
    ///
    /// # Errors
    /// `DTypeMismatch` if the buffer is not `I32`, `CapacityExceeded` if
    /// `values` is longer than the capacity. Neither case modifies the buffer.
    pub fn write_i32(&mut self, values: &[i32]) -> Result<()> {
        if self.dtype != DType::I32 {
            return Err(TensorError::DTypeMismatch {
                expected: DType::I32.to_string(),
                got: self.dtype.to_string(),
            });
        }
        if values.len() > self.capacity {
            return Err(TensorError::CapacityExceeded {
                capacity: self.capacity,
                requested: values.len(),
            });
        }

        let split = values.len() * 4;
        for (chunk, v) in self.bytes[..split].chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&v.to_ne_bytes());
        }
        self.bytes[split..].fill(0);
        self.len = values.len();
        Ok(())
    }

    /// The full backing storage (all `capacity` elements).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access to the full backing storage, for a runtime to write
    /// its results into. Call `set_len` afterwards.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Declare how many elements hold valid data.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.capacity {
            return Err(TensorError::CapacityExceeded {
                capacity: self.capacity,
                requested: len,
            });
        }
        self.len = len;
        Ok(())
    }

    /// Decode the written elements of an integer buffer.
    ///
    /// # Errors
    /// Returns an error for float buffers.
    pub fn read_ints(&self) -> Result<Vec<i32>> {
        if self.dtype.is_float() {
            return Err(TensorError::DTypeMismatch {
                expected: "integer".to_string(),
                got: self.dtype.to_string(),
            });
        }
        Ok((0..self.len).map(|i| self.int_at(i)).collect())
    }

    /// Decode the written elements as plain numbers, without applying any
    /// quantization mapping.
    pub fn read_values(&self) -> Vec<f32> {
        (0..self.len).map(|i| self.value_at(i)).collect()
    }

    /// Decode the written elements and map integers through `params`.
    /// Float buffers are returned unchanged.
    pub fn read_dequantized(&self, params: &QuantParams) -> Vec<f32> {
        if self.dtype.is_float() {
            return self.read_values();
        }
        (0..self.len).map(|i| params.dequantize(self.int_at(i))).collect()
    }

    fn element(&self, i: usize) -> &[u8] {
        let width = self.dtype.size_in_bytes();
        &self.bytes[i * width..(i + 1) * width]
    }

    fn int_at(&self, i: usize) -> i32 {
        let b = self.element(i);
        match self.dtype {
            DType::U8 => b[0] as i32,
            DType::I8 => b[0] as i8 as i32,
            DType::I16 => i16::from_ne_bytes([b[0], b[1]]) as i32,
            DType::I32 => i32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
            DType::F16 => half::f16::from_ne_bytes([b[0], b[1]]).to_f32() as i32,
            DType::F32 => f32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as i32,
        }
    }

    fn value_at(&self, i: usize) -> f32 {
        let b = self.element(i);
        match self.dtype {
            DType::F16 => half::f16::from_ne_bytes([b[0], b[1]]).to_f32(),
            DType::F32 => f32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
            _ => self.int_at(i) as f32,
        }
    }
}
