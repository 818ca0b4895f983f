use std::path::Path;

use crate::error::Result;
use super::header::{align_offset, GgufHeader, GGUF_VERSION};
use super::metadata::{GgufMetadata, MetadataValue};
use super::tensor_info::{GgufTensorInfo, WeightFormat};

/// Builder for GGUF artifacts.
///
/// Used to package classifier weights and to produce fixtures for tests.
/// Tensor data is laid out in insertion order, each tensor aligned to
/// `GGUF_DEFAULT_ALIGNMENT` within the data section.
#[derive(Default)]
pub struct GgufWriter {
    metadata: GgufMetadata,
    tensors: Vec<(GgufTensorInfo, Vec<u8>)>,
    data_len: usize,
}

impl GgufWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(mut self, key: &str, value: MetadataValue) -> Self {
        self.metadata.entries.insert(key.to_string(), value);
        self
    }

    /// Encode `values` in `format` and append it as a tensor with the given
    /// dims (innermost first).
    pub fn tensor(mut self, name: &str, dims: &[u64], format: WeightFormat, values: &[f32]) -> Self {
        let data = match format {
            WeightFormat::F32 => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            WeightFormat::F16 => values
                .iter()
                .flat_map(|&v| half::f16::from_f32(v).to_le_bytes())
                .collect(),
            WeightFormat::Q8_0 => encode_q8_0(values),
        };

        let offset = align_offset(self.data_len);
        self.data_len = offset + data.len();
        let info = GgufTensorInfo {
            name: name.to_string(),
            dims: dims.to_vec(),
            format,
            offset: offset as u64,
        };
        self.tensors.push((info, data));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        GgufHeader {
            version: GGUF_VERSION,
            n_tensors: self.tensors.len() as u64,
            n_kv: self.metadata.entries.len() as u64,
        }
        .write(&mut out);
        self.metadata.write_kv(&mut out);
        for (info, _) in &self.tensors {
            info.write(&mut out);
        }

        let data_start = align_offset(out.len());
        for (info, data) in &self.tensors {
            out.resize(data_start + info.offset as usize, 0);
            out.extend_from_slice(data);
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Q8_0 encoding: per block of 32, scale = max|v| / 127 stored as f16,
/// followed by the 32 rounded `v / scale` bytes. A short final block is
/// zero-padded.
pub fn encode_q8_0(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len().div_ceil(32) * 34);
    for chunk in values.chunks(32) {
        let amax = chunk.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        let scale = amax / 127.0;
        let inv = if scale == 0.0 { 0.0 } else { 1.0 / scale };

        out.extend_from_slice(&half::f16::from_f32(scale).to_le_bytes());
        for i in 0..32 {
            let q = chunk.get(i).map_or(0, |&v| (v * inv).round().clamp(-127.0, 127.0) as i8);
            out.push(q as u8);
        }
    }
    out
}
