pub mod config;

pub use config::ClassifierConfig;

use ti_tensor::{DType, Shape};

use crate::error::{ModelError, Result};
use crate::gguf::GgufFile;
use crate::runtime::{Interpreter, TensorSpec};
use config::{TENSOR_BIAS, TENSOR_EMBEDDINGS};

/// Quantized bag-of-embeddings text classifier.
///
/// Each vocabulary id owns a row of `class_count` logit contributions. The
/// pooled variant averages the rows of all attended positions and adds the
/// bias; the per-token variant emits `row + bias` for every attended
/// position and the bare bias for padding. Logits are quantized into the
/// output dtype with the artifact's output quantization parameters, so the
/// caller sees exactly what an on-device quantized model would hand back.
pub struct BowClassifier {
    config: ClassifierConfig,
    n_vocab: usize,
    /// Row-major `[n_vocab, class_count]`, dequantized at load.
    embeddings: Vec<f32>,
    bias: Vec<f32>,
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
}

impl BowClassifier {
    pub const ARCHITECTURE: &'static str = "bow-classifier";

    pub fn from_gguf(gguf: &GgufFile) -> Result<BowClassifier> {
        let config = ClassifierConfig::from_gguf(&gguf.metadata)?;
        let classes = config.class_count;

        let (embeddings, info) = gguf.tensor_f32(TENSOR_EMBEDDINGS)?;
        if info.dims.len() != 2 || info.dims[0] as usize != classes {
            return Err(ModelError::InvalidTensor {
                name: TENSOR_EMBEDDINGS.to_string(),
                reason: format!("expected dims [{}, n_vocab], got {:?}", classes, info.dims),
            });
        }
        let n_vocab = info.dims[1] as usize;

        let (bias, info) = gguf.tensor_f32(TENSOR_BIAS)?;
        if info.numel() != classes {
            return Err(ModelError::InvalidTensor {
                name: TENSOR_BIAS.to_string(),
                reason: format!("expected {} values, got {}", classes, info.numel()),
            });
        }

        let seq = config.context_length;
        let input_names: &[&str] = if config.input_count == 3 {
            &["input_ids", "attention_mask", "token_type_ids"]
        } else {
            &["input_ids"]
        };
        let inputs = input_names
            .iter()
            .map(|name| TensorSpec {
                name: name.to_string(),
                shape: Shape::new(vec![1, seq]),
                dtype: DType::I32,
                quant: config.input_quant,
            })
            .collect();

        let out_shape = if config.per_token {
            Shape::new(vec![1, seq, classes])
        } else {
            Shape::new(vec![1, classes])
        };
        let outputs = vec![TensorSpec {
            name: "logits".to_string(),
            shape: out_shape,
            dtype: config.output_dtype,
            quant: config.output_dtype.is_quantized().then_some(config.output_quant),
        }];

        if let Some(q) = config.input_quant {
            log::info!(
                "input quantization - scale: {}, zero point: {}",
                q.scale,
                q.zero_point
            );
        }
        log::info!(
            "bow-classifier: vocab {}, context {}, {} classes, output {} (scale {}, zero point {})",
            n_vocab,
            seq,
            classes,
            config.output_dtype,
            config.output_quant.scale,
            config.output_quant.zero_point
        );

        Ok(BowClassifier {
            config,
            n_vocab,
            embeddings,
            bias,
            inputs,
            outputs,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn vocab_size(&self) -> usize {
        self.n_vocab
    }

    fn row(&self, id: usize) -> &[f32] {
        let c = self.config.class_count;
        &self.embeddings[id * c..(id + 1) * c]
    }

    fn logits(&self, ids: &[i32], mask: &[bool]) -> Vec<f32> {
        let c = self.config.class_count;
        if self.config.per_token {
            let mut out = Vec::with_capacity(ids.len() * c);
            for (&id, &attended) in ids.iter().zip(mask) {
                if attended {
                    out.extend(self.row(id as usize).iter().zip(&self.bias).map(|(e, b)| e + b));
                } else {
                    out.extend_from_slice(&self.bias);
                }
            }
            out
        } else {
            let mut sum = vec![0.0f32; c];
            let mut count = 0usize;
            for (&id, &attended) in ids.iter().zip(mask) {
                if !attended {
                    continue;
                }
                for (s, e) in sum.iter_mut().zip(self.row(id as usize)) {
                    *s += e;
                }
                count += 1;
            }
            let denom = count.max(1) as f32;
            sum.iter().zip(&self.bias).map(|(s, b)| s / denom + b).collect()
        }
    }

    fn write_output(&self, logits: &[f32], out: &mut [u8]) {
        let dtype = self.config.output_dtype;
        let quant = &self.config.output_quant;
        let width = dtype.size_in_bytes();
        for (slot, &v) in out.chunks_exact_mut(width).zip(logits) {
            match dtype {
                DType::U8 => slot[0] = quant.quantize(v, dtype) as u8,
                DType::I8 => slot[0] = quant.quantize(v, dtype) as i8 as u8,
                DType::I16 => {
                    slot.copy_from_slice(&(quant.quantize(v, dtype) as i16).to_ne_bytes())
                }
                DType::I32 => slot.copy_from_slice(&quant.quantize(v, dtype).to_ne_bytes()),
                DType::F16 => slot.copy_from_slice(&half::f16::from_f32(v).to_ne_bytes()),
                DType::F32 => slot.copy_from_slice(&v.to_ne_bytes()),
            }
        }
    }
}

fn decode_i32(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|b| i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn check_sizes(kind: &str, specs: &[TensorSpec], lens: impl ExactSizeIterator<Item = usize>) -> Result<()> {
    if lens.len() != specs.len() {
        return Err(ModelError::Invoke(format!(
            "expected {} {} tensors, got {}",
            specs.len(),
            kind,
            lens.len()
        )));
    }
    for (spec, len) in specs.iter().zip(lens) {
        if len != spec.byte_size() {
            return Err(ModelError::Invoke(format!(
                "{} '{}' needs {} bytes, got {}",
                kind,
                spec.name,
                spec.byte_size(),
                len
            )));
        }
    }
    Ok(())
}

impl Interpreter for BowClassifier {
    fn name(&self) -> &str {
        Self::ARCHITECTURE
    }

    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    fn invoke(&self, inputs: &[&[u8]], outputs: &mut [&mut [u8]]) -> Result<()> {
        check_sizes("input", &self.inputs, inputs.iter().map(|b| b.len()))?;
        check_sizes("output", &self.outputs, outputs.iter().map(|b| b.len()))?;

        let ids = decode_i32(inputs[0]);
        if let Some(bad) = ids.iter().find(|&&id| id < 0 || id as usize >= self.n_vocab) {
            return Err(ModelError::Invoke(format!(
                "token id {} out of range for vocabulary of {}",
                bad, self.n_vocab
            )));
        }

        let mask: Vec<bool> = if self.config.input_count == 3 {
            decode_i32(inputs[1]).iter().map(|&m| m != 0).collect()
        } else {
            ids.iter().map(|&id| id != 0).collect()
        };

        let logits = self.logits(&ids, &mask);
        self.write_output(&logits, &mut outputs[0][..]);
        Ok(())
    }
}
