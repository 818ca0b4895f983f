use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use ti_decode::{decoder_for, Output, OutputDecoder};
use ti_model::{
    open_interpreter, Interpreter, TensorSpec, TokenizedSequence, Vocab, WhitespaceTokenizer,
};
use ti_tensor::{DType, QuantParams, TensorBuffer, TensorError};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Which tokenizer tensor feeds a model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputRole {
    Ids,
    Mask,
    TypeIds,
}

impl InputRole {
    const POSITIONAL: [InputRole; 3] = [InputRole::Ids, InputRole::Mask, InputRole::TypeIds];

    fn from_name(name: &str) -> Option<InputRole> {
        let name = name.to_ascii_lowercase();
        if name.contains("mask") {
            Some(InputRole::Mask)
        } else if name.contains("type") || name.contains("segment") {
            Some(InputRole::TypeIds)
        } else if name.contains("ids") || name.contains("input") {
            Some(InputRole::Ids)
        } else {
            None
        }
    }

    fn select<'a>(&self, seq: &'a TokenizedSequence) -> &'a [i32] {
        match self {
            InputRole::Ids => &seq.input_ids,
            InputRole::Mask => &seq.attention_mask,
            InputRole::TypeIds => &seq.token_type_ids,
        }
    }
}

struct InputSlot {
    name: String,
    role: InputRole,
    buffer: TensorBuffer,
}

/// Tokenizer, interpreter, and the byte buffers between them.
///
/// Buffers are allocated once from the model's tensor contract and reused
/// for every call. A call that cannot fit is rejected before any buffer is
/// touched.
pub struct Engine {
    interpreter: Option<Box<dyn Interpreter>>,
    tokenizer: WhitespaceTokenizer,
    config: EngineConfig,
    inputs: Vec<InputSlot>,
    input_specs: Vec<TensorSpec>,
    outputs: Vec<TensorBuffer>,
    output_spec: TensorSpec,
    output_quant: QuantParams,
    decoder: Box<dyn OutputDecoder>,
}

impl Engine {
    /// Load the vocabulary and model from disk.
    pub fn open(model_path: &Path, vocab_path: &Path, config: EngineConfig) -> Result<Engine> {
        let vocab = Vocab::load(vocab_path).map_err(EngineError::from_load)?;
        log::info!(
            "loaded vocabulary of {} tokens from {}",
            vocab.len(),
            vocab_path.display()
        );
        let interpreter = open_interpreter(model_path).map_err(EngineError::from_load)?;
        Self::from_parts(interpreter, Arc::new(vocab), config)
    }

    /// Build an engine around an already-loaded interpreter, checking that
    /// its tensor contract matches what the tokenizer and decoder produce.
    pub fn from_parts(
        interpreter: Box<dyn Interpreter>,
        vocab: Arc<Vocab>,
        config: EngineConfig,
    ) -> Result<Engine> {
        let seq_len = config.max_seq_len;
        let specs = interpreter.inputs();
        if specs.len() != 1 && specs.len() != 3 {
            return Err(EngineError::ShapeMismatch(format!(
                "model has {} inputs, expected 1 or 3",
                specs.len()
            )));
        }
        for spec in specs {
            if spec.dtype != DType::I32 {
                return Err(EngineError::ShapeMismatch(format!(
                    "input '{}' has dtype {}, expected i32",
                    spec.name, spec.dtype
                )));
            }
            if spec.shape.last_dim() != Some(seq_len) || spec.numel() != seq_len {
                return Err(EngineError::ShapeMismatch(format!(
                    "input '{}' has shape {}, tokenizer produces {} tokens",
                    spec.name, spec.shape, seq_len
                )));
            }
        }
        let roles = assign_roles(specs);
        let inputs = specs
            .iter()
            .zip(roles)
            .map(|(spec, role)| InputSlot {
                name: spec.name.clone(),
                role,
                buffer: TensorBuffer::new(DType::I32, seq_len),
            })
            .collect::<Vec<_>>();
        let input_specs = specs.to_vec();

        let output_spec = interpreter
            .outputs()
            .first()
            .cloned()
            .ok_or_else(|| EngineError::ShapeMismatch("model has no outputs".to_string()))?;
        config
            .output_mode
            .check_layout(output_spec.numel())
            .map_err(|e| {
                EngineError::ShapeMismatch(format!("output '{}': {}", output_spec.name, e))
            })?;
        let outputs = interpreter
            .outputs()
            .iter()
            .map(|spec| TensorBuffer::new(spec.dtype, spec.numel()))
            .collect();

        let output_quant = match output_spec.quant {
            Some(q) if q.scale < 0.0 || !q.scale.is_finite() => {
                return Err(EngineError::ShapeMismatch(format!(
                    "output '{}' has unusable scale {}",
                    output_spec.name, q.scale
                )));
            }
            Some(q) if q.scale != 0.0 => q,
            Some(_) => {
                log::warn!(
                    "output '{}' reports a zero scale, treating as unquantized",
                    output_spec.name
                );
                QuantParams::identity()
            }
            None => QuantParams::identity(),
        };

        let decoder = decoder_for(&config.output_mode);
        let tokenizer = WhitespaceTokenizer::new(vocab, config.add_special_tokens);

        log::info!(
            "engine ready: model {}, {} input(s) of {} tokens, output '{}' {} {} (scale {}, zero point {}), decoder {}",
            interpreter.name(),
            inputs.len(),
            seq_len,
            output_spec.name,
            output_spec.dtype,
            output_spec.shape,
            output_quant.scale,
            output_quant.zero_point,
            decoder.name()
        );

        Ok(Engine {
            interpreter: Some(interpreter),
            tokenizer,
            config,
            inputs,
            input_specs,
            outputs,
            output_spec,
            output_quant,
            decoder,
        })
    }

    /// Tokenize `text`, run one inference, and decode the result.
    pub fn predict(&mut self, text: &str) -> Result<Output> {
        if self.interpreter.is_none() {
            return Err(EngineError::EngineClosed);
        }
        let seq = self.tokenizer.tokenize(text, self.config.max_seq_len);
        log::debug!("tokenized {} real tokens", seq.real_len());
        self.predict_sequence(&seq)
    }

    /// Run one inference on an already-tokenized sequence.
    pub fn predict_sequence(&mut self, seq: &TokenizedSequence) -> Result<Output> {
        let result = self.run(seq);
        if let Err(e) = &result {
            log::warn!("prediction failed: {}", e);
        }
        result
    }

    fn run(&mut self, seq: &TokenizedSequence) -> Result<Output> {
        let interpreter = self
            .interpreter
            .as_deref()
            .ok_or(EngineError::EngineClosed)?;

        // all-or-nothing across inputs
        for slot in &self.inputs {
            let data = slot.role.select(seq);
            if data.len() > slot.buffer.capacity() {
                return Err(EngineError::BufferOverflow {
                    tensor: slot.name.clone(),
                    capacity: slot.buffer.capacity(),
                    requested: data.len(),
                });
            }
        }
        for slot in &mut self.inputs {
            slot.buffer
                .write_i32(slot.role.select(seq))
                .map_err(|e| match e {
                    TensorError::CapacityExceeded {
                        capacity,
                        requested,
                    } => EngineError::BufferOverflow {
                        tensor: slot.name.clone(),
                        capacity,
                        requested,
                    },
                    other => EngineError::Inference(other.to_string()),
                })?;
        }

        let input_bytes: Vec<&[u8]> = self.inputs.iter().map(|s| s.buffer.as_bytes()).collect();
        let mut output_bytes: Vec<&mut [u8]> =
            self.outputs.iter_mut().map(|b| b.as_bytes_mut()).collect();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.invoke(&input_bytes, &mut output_bytes)
        }));
        drop(output_bytes);
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(EngineError::Inference(e.to_string())),
            Err(payload) => {
                return Err(EngineError::Inference(format!(
                    "interpreter panicked: {}",
                    panic_message(payload.as_ref())
                )))
            }
        }
        for buffer in &mut self.outputs {
            let capacity = buffer.capacity();
            buffer
                .set_len(capacity)
                .map_err(|e| EngineError::Inference(e.to_string()))?;
        }

        let output = &self.outputs[0];
        let values = if self.decoder.wants_dequantized() {
            output.read_dequantized(&self.output_quant)
        } else {
            output.read_values()
        };
        log::trace!(
            "raw output head: {:?}",
            &values[..values.len().min(8)]
        );
        self.decoder
            .decode(&values)
            .map_err(|e| EngineError::Inference(e.to_string()))
    }

    /// Release the interpreter. Later predictions fail with `EngineClosed`.
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(interpreter) = self.interpreter.take() {
            log::info!("closing interpreter {}", interpreter.name());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.interpreter.is_none()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Current contents of the `i`-th input buffer.
    pub fn input_buffer(&self, i: usize) -> Option<&TensorBuffer> {
        self.inputs.get(i).map(|s| &s.buffer)
    }

    pub fn input_specs(&self) -> &[TensorSpec] {
        &self.input_specs
    }

    pub fn output_spec(&self) -> &TensorSpec {
        &self.output_spec
    }

    /// Quantization used to dequantize the decoded output; identity for
    /// float outputs.
    pub fn output_quant(&self) -> QuantParams {
        self.output_quant
    }
}

/// Match inputs to tokenizer tensors by name, falling back to position
/// when the names are not distinct or not recognizable.
fn assign_roles(specs: &[TensorSpec]) -> Vec<InputRole> {
    let named: Option<Vec<InputRole>> = specs
        .iter()
        .map(|s| InputRole::from_name(&s.name))
        .collect();
    if let Some(roles) = named {
        let distinct = roles
            .iter()
            .enumerate()
            .all(|(i, r)| !roles[..i].contains(r));
        if distinct && roles.contains(&InputRole::Ids) {
            return roles;
        }
    }
    InputRole::POSITIONAL[..specs.len()].to_vec()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
