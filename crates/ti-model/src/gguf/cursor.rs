use crate::error::{ModelError, Result};

/// Little-endian reader over an in-memory (usually memory-mapped) byte slice.
///
/// Every read is bounds-checked; running off the end yields
/// `ModelError::Truncated` rather than a panic, so a cut-short artifact is
/// reported as a load failure.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Current byte offset from the start of the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(ModelError::Truncated {
                offset: self.pos,
                needed: n - (self.data.len() - self.pos).min(n),
            }),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Read a length as u64 and convert it to `usize`, refusing lengths that
    /// could not possibly fit in the remaining data.
    pub fn read_len(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.read_u64()?;
        let remaining = (self.data.len() - self.pos) as u64;
        if len > remaining {
            return Err(ModelError::Truncated {
                offset,
                needed: (len - remaining) as usize,
            });
        }
        Ok(len as usize)
    }

    /// GGUF string: u64 byte length followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ModelError::Other(format!("invalid UTF-8 in string: {}", e)))
    }
}
