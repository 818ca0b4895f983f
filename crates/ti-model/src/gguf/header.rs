use crate::error::{ModelError, Result};
use super::cursor::ByteCursor;

/// The four-byte magic number identifying a GGUF file: ASCII "GGUF".
pub const GGUF_MAGIC: [u8; 4] = [0x47, 0x47, 0x55, 0x46];

/// The only container version read and written.
pub const GGUF_VERSION: u32 = 3;

/// Default alignment (in bytes) for tensor data within a GGUF file.
pub const GGUF_DEFAULT_ALIGNMENT: usize = 32;

/// Parsed GGUF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GgufHeader {
    pub version: u32,
    /// Number of tensors stored in the file.
    pub n_tensors: u64,
    /// Number of key-value metadata entries.
    pub n_kv: u64,
}

impl GgufHeader {
    /// Validate the magic and version, then read the tensor and KV counts.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<GgufHeader> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(cursor.take(4)?);
        if magic != GGUF_MAGIC {
            return Err(ModelError::InvalidMagic(magic));
        }

        let version = cursor.read_u32()?;
        if version != GGUF_VERSION {
            return Err(ModelError::UnsupportedVersion(version));
        }

        Ok(GgufHeader {
            version,
            n_tensors: cursor.read_u64()?,
            n_kv: cursor.read_u64()?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&GGUF_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.n_tensors.to_le_bytes());
        out.extend_from_slice(&self.n_kv.to_le_bytes());
    }
}

/// Round `offset` up to the next multiple of `GGUF_DEFAULT_ALIGNMENT`.
pub fn align_offset(offset: usize) -> usize {
    (offset + GGUF_DEFAULT_ALIGNMENT - 1) & !(GGUF_DEFAULT_ALIGNMENT - 1)
}
