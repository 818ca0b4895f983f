use std::path::Path;

use memmap2::Mmap;

use crate::error::{ModelError, Result};
use super::cursor::ByteCursor;
use super::header::{align_offset, GgufHeader};
use super::metadata::GgufMetadata;
use super::tensor_info::{self, GgufTensorInfo, WeightFormat};

/// A parsed GGUF file backed by a memory-mapped region.
///
/// The file is mapped first and the header, metadata, and tensor info table
/// are parsed straight out of the mapping. Every tensor's byte range is
/// checked against the file size at open time, so later accesses cannot
/// run past the end of a truncated artifact.
pub struct GgufFile {
    pub header: GgufHeader,
    pub metadata: GgufMetadata,
    pub tensor_infos: Vec<GgufTensorInfo>,
    mmap: Mmap,
    /// Byte offset within the file where tensor data begins (aligned).
    data_offset: usize,
}

impl GgufFile {
    pub fn open(path: &Path) -> Result<GgufFile> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and the artifact is not expected to
        // be modified while a model is loaded.
        let mmap = unsafe { Mmap::map(&file)? };

        let mut cursor = ByteCursor::new(&mmap);
        let header = GgufHeader::parse(&mut cursor)?;
        let metadata = GgufMetadata::parse_kv(&mut cursor, header.n_kv)?;
        let tensor_infos = tensor_info::parse_tensor_infos(&mut cursor, header.n_tensors)?;
        let data_offset = align_offset(cursor.position());

        for info in &tensor_infos {
            let end = (data_offset as u64)
                .checked_add(info.offset)
                .and_then(|start| start.checked_add(info.data_size() as u64));
            if end.map_or(true, |end| end > mmap.len() as u64) {
                return Err(ModelError::InvalidTensor {
                    name: info.name.clone(),
                    reason: format!(
                        "data range (offset {}, {} bytes) exceeds file size {}",
                        info.offset,
                        info.data_size(),
                        mmap.len()
                    ),
                });
            }
        }

        Ok(GgufFile {
            header,
            metadata,
            tensor_infos,
            mmap,
            data_offset,
        })
    }

    /// Size of the mapped file in bytes.
    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    pub fn tensor_info(&self, name: &str) -> Result<&GgufTensorInfo> {
        self.tensor_infos
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ModelError::TensorNotFound(name.to_string()))
    }

    /// Raw bytes of a tensor within the mapping.
    pub fn tensor_data(&self, info: &GgufTensorInfo) -> &[u8] {
        let start = self.data_offset + info.offset as usize;
        &self.mmap[start..start + info.data_size()]
    }

    /// Load a tensor by name, dequantizing it to f32.
    pub fn tensor_f32(&self, name: &str) -> Result<(Vec<f32>, &GgufTensorInfo)> {
        let info = self.tensor_info(name)?;
        let raw = self.tensor_data(info);
        let numel = info.numel();

        let data = match info.format {
            WeightFormat::F32 => raw
                .chunks_exact(4)
                .take(numel)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            WeightFormat::F16 => raw
                .chunks_exact(2)
                .take(numel)
                .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            WeightFormat::Q8_0 => dequantize_q8_0(raw, numel),
        };
        Ok((data, info))
    }
}

/// Dequantize Q8_0 blocks: each value is `i8 * scale`, with one f16 scale
/// per block of 32.
fn dequantize_q8_0(data: &[u8], numel: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(numel);
    for block in data.chunks_exact(34) {
        let scale = half::f16::from_le_bytes([block[0], block[1]]).to_f32();
        out.extend(block[2..].iter().map(|&q| q as i8 as f32 * scale));
    }
    // The last block may carry padding.
    out.truncate(numel);
    out
}
