use ti_tensor::{DType, QuantParams};

use crate::error::{ModelError, Result};
use crate::gguf::{GgufMetadata, GgufWriter, MetadataValue, WeightFormat};

pub const KEY_CONTEXT_LENGTH: &str = "classifier.context_length";
pub const KEY_CLASS_COUNT: &str = "classifier.class_count";
pub const KEY_INPUT_COUNT: &str = "classifier.input_count";
pub const KEY_PER_TOKEN: &str = "classifier.per_token";
pub const KEY_OUTPUT_DTYPE: &str = "classifier.output.dtype";
pub const KEY_OUTPUT_SCALE: &str = "classifier.output.scale";
pub const KEY_OUTPUT_ZERO_POINT: &str = "classifier.output.zero_point";
pub const KEY_INPUT_SCALE: &str = "classifier.input.scale";
pub const KEY_INPUT_ZERO_POINT: &str = "classifier.input.zero_point";

pub const TENSOR_EMBEDDINGS: &str = "token_embd.weight";
pub const TENSOR_BIAS: &str = "output.bias";

/// Hyperparameters and tensor contract of a bag-of-embeddings classifier,
/// parsed from GGUF metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Fixed input sequence length.
    pub context_length: usize,
    /// Number of output classes per row.
    pub class_count: usize,
    /// 1 (token ids only) or 3 (ids, attention mask, token type ids).
    pub input_count: usize,
    /// Emit one row of class logits per position instead of one pooled row.
    pub per_token: bool,
    pub output_dtype: DType,
    pub output_quant: QuantParams,
    /// Informational; token ids are never requantized.
    pub input_quant: Option<QuantParams>,
}

impl ClassifierConfig {
    /// Reads the `classifier.*` keys. `input_count`, `per_token`, and the
    /// output quantization default to 1, false, and identity when absent.
    pub fn from_gguf(metadata: &GgufMetadata) -> Result<ClassifierConfig> {
        let context_length = metadata.get_u32(KEY_CONTEXT_LENGTH)? as usize;
        let class_count = metadata.get_u32(KEY_CLASS_COUNT)? as usize;
        let input_count = if metadata.contains(KEY_INPUT_COUNT) {
            metadata.get_u32(KEY_INPUT_COUNT)? as usize
        } else {
            1
        };
        let per_token = if metadata.contains(KEY_PER_TOKEN) {
            metadata.get_bool(KEY_PER_TOKEN)?
        } else {
            false
        };

        let output_dtype: DType = metadata.get_str(KEY_OUTPUT_DTYPE)?.parse()?;
        let output_quant = QuantParams::new(
            optional(metadata, KEY_OUTPUT_SCALE, GgufMetadata::get_f32)?.unwrap_or(1.0),
            optional(metadata, KEY_OUTPUT_ZERO_POINT, GgufMetadata::get_i32)?.unwrap_or(0),
        );
        let input_quant = match optional(metadata, KEY_INPUT_SCALE, GgufMetadata::get_f32)? {
            Some(scale) => Some(QuantParams::new(
                scale,
                optional(metadata, KEY_INPUT_ZERO_POINT, GgufMetadata::get_i32)?.unwrap_or(0),
            )),
            None => None,
        };

        if context_length == 0 || class_count == 0 {
            return Err(ModelError::Other(format!(
                "classifier needs a positive context length and class count, got {} and {}",
                context_length, class_count
            )));
        }
        if input_count != 1 && input_count != 3 {
            return Err(ModelError::Other(format!(
                "classifier input count must be 1 or 3, got {}",
                input_count
            )));
        }

        Ok(ClassifierConfig {
            context_length,
            class_count,
            input_count,
            per_token,
            output_dtype,
            output_quant,
            input_quant,
        })
    }

    /// Start an artifact carrying this configuration plus the two weight
    /// tensors: `embeddings` is `n_vocab` rows of `class_count` values and
    /// `bias` has `class_count` values.
    pub fn artifact(&self, embeddings: &[f32], bias: &[f32], format: WeightFormat) -> GgufWriter {
        let n_vocab = embeddings.len() / self.class_count;
        let mut writer = GgufWriter::new()
            .metadata(
                "general.architecture",
                MetadataValue::String(super::BowClassifier::ARCHITECTURE.to_string()),
            )
            .metadata(KEY_CONTEXT_LENGTH, MetadataValue::U32(self.context_length as u32))
            .metadata(KEY_CLASS_COUNT, MetadataValue::U32(self.class_count as u32))
            .metadata(KEY_INPUT_COUNT, MetadataValue::U32(self.input_count as u32))
            .metadata(KEY_PER_TOKEN, MetadataValue::Bool(self.per_token))
            .metadata(KEY_OUTPUT_DTYPE, MetadataValue::String(self.output_dtype.to_string()))
            .metadata(KEY_OUTPUT_SCALE, MetadataValue::F32(self.output_quant.scale))
            .metadata(KEY_OUTPUT_ZERO_POINT, MetadataValue::I32(self.output_quant.zero_point));
        if let Some(q) = self.input_quant {
            writer = writer
                .metadata(KEY_INPUT_SCALE, MetadataValue::F32(q.scale))
                .metadata(KEY_INPUT_ZERO_POINT, MetadataValue::I32(q.zero_point));
        }
        writer
            .tensor(
                TENSOR_EMBEDDINGS,
                &[self.class_count as u64, n_vocab as u64],
                format,
                embeddings,
            )
            .tensor(TENSOR_BIAS, &[self.class_count as u64], WeightFormat::F32, bias)
    }
}

fn optional<T>(
    metadata: &GgufMetadata,
    key: &str,
    get: impl Fn(&GgufMetadata, &str) -> Result<T>,
) -> Result<Option<T>> {
    if metadata.contains(key) {
        get(metadata, key).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GgufMetadata {
        let mut m = GgufMetadata::default();
        m.entries.insert(KEY_CONTEXT_LENGTH.into(), MetadataValue::U32(384));
        m.entries.insert(KEY_CLASS_COUNT.into(), MetadataValue::U32(2));
        m.entries.insert(KEY_OUTPUT_DTYPE.into(), MetadataValue::String("u8".into()));
        m
    }

    #[test]
    fn test_defaults() {
        let cfg = ClassifierConfig::from_gguf(&base()).unwrap();
        assert_eq!(cfg.context_length, 384);
        assert_eq!(cfg.class_count, 2);
        assert_eq!(cfg.input_count, 1);
        assert!(!cfg.per_token);
        assert_eq!(cfg.output_dtype, DType::U8);
        assert!(cfg.output_quant.is_identity());
        assert!(cfg.input_quant.is_none());
    }

    #[test]
    fn test_quant_params_read() {
        let mut m = base();
        m.entries.insert(KEY_OUTPUT_SCALE.into(), MetadataValue::F32(0.125));
        m.entries.insert(KEY_OUTPUT_ZERO_POINT.into(), MetadataValue::I32(128));
        m.entries.insert(KEY_INPUT_SCALE.into(), MetadataValue::F32(1.0));
        let cfg = ClassifierConfig::from_gguf(&m).unwrap();
        assert_eq!(cfg.output_quant, QuantParams::new(0.125, 128));
        assert_eq!(cfg.input_quant, Some(QuantParams::new(1.0, 0)));
    }

    #[test]
    fn test_rejects_bad_input_count() {
        let mut m = base();
        m.entries.insert(KEY_INPUT_COUNT.into(), MetadataValue::U32(2));
        assert!(ClassifierConfig::from_gguf(&m).is_err());
    }

    #[test]
    fn test_rejects_unknown_dtype() {
        let mut m = base();
        m.entries.insert(KEY_OUTPUT_DTYPE.into(), MetadataValue::String("q4".into()));
        assert!(matches!(
            ClassifierConfig::from_gguf(&m),
            Err(ModelError::TensorError(_))
        ));
    }

    #[test]
    fn test_missing_required_key() {
        let mut m = base();
        m.entries.remove(KEY_CLASS_COUNT);
        assert!(matches!(
            ClassifierConfig::from_gguf(&m),
            Err(ModelError::MissingKey(k)) if k == KEY_CLASS_COUNT
        ));
    }
}
