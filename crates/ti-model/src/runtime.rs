use std::path::Path;

use ti_tensor::{DType, QuantParams, Shape};

use crate::classifier::BowClassifier;
use crate::error::{ModelError, Result};
use crate::gguf::GgufFile;

/// Declared shape, element type, and quantization of one runtime tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Shape,
    pub dtype: DType,
    /// Present for quantized integer tensors.
    pub quant: Option<QuantParams>,
}

impl TensorSpec {
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Bytes needed to hold the whole tensor.
    pub fn byte_size(&self) -> usize {
        self.numel() * self.dtype.size_in_bytes()
    }
}

/// A loaded model that can run inference over raw tensor bytes.
///
/// This is the seam to the inference runtime: implementations expose the
/// tensor contract they were built with and execute one forward pass per
/// `invoke`. A loaded interpreter is read-only, so `invoke` takes `&self`.
pub trait Interpreter: Send + Sync {
    /// Short identifier of the model family (e.g. "bow-classifier").
    fn name(&self) -> &str;

    /// Input tensors, in the order `invoke` expects them.
    fn inputs(&self) -> &[TensorSpec];

    /// Output tensors, in the order `invoke` fills them.
    fn outputs(&self) -> &[TensorSpec];

    /// Run a single synchronous inference.
    ///
    /// - `inputs`: one byte slice per input spec, native byte order, each
    ///   exactly `byte_size()` long.
    /// - `outputs`: one mutable byte slice per output spec, overwritten in
    ///   full on success.
    fn invoke(&self, inputs: &[&[u8]], outputs: &mut [&mut [u8]]) -> Result<()>;
}

/// Open a model artifact and build the interpreter its
/// `general.architecture` key names.
pub fn open_interpreter(path: &Path) -> Result<Box<dyn Interpreter>> {
    let file = GgufFile::open(path)?;
    log::info!(
        "model artifact {} mapped: {} bytes, {} tensors",
        path.display(),
        file.size(),
        file.tensor_infos.len()
    );

    let arch = file.metadata.get_str("general.architecture")?;
    match arch {
        BowClassifier::ARCHITECTURE => Ok(Box::new(BowClassifier::from_gguf(&file)?)),
        other => Err(ModelError::UnsupportedArchitecture(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gguf::{GgufWriter, MetadataValue};

    #[test]
    fn test_byte_size() {
        let spec = TensorSpec {
            name: "logits".into(),
            shape: Shape::new(vec![1, 384, 2]),
            dtype: DType::U8,
            quant: Some(QuantParams::new(0.1, 128)),
        };
        assert_eq!(spec.byte_size(), 768);
    }

    #[test]
    fn test_unknown_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llama.gguf");
        GgufWriter::new()
            .metadata("general.architecture", MetadataValue::String("llama".into()))
            .write_to(&path)
            .unwrap();
        assert!(matches!(
            open_interpreter(&path),
            Err(ModelError::UnsupportedArchitecture(a)) if a == "llama"
        ));
    }

    #[test]
    fn test_missing_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.gguf");
        GgufWriter::new().write_to(&path).unwrap();
        assert!(matches!(
            open_interpreter(&path),
            Err(ModelError::MissingKey(_))
        ));
    }
}
