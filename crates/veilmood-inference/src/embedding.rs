/// ONNX sentence encoder: token IDs in, one pooled hidden vector out.
///
/// The encoder's final hidden state is [1, seq_len, hidden]. Pooling turns it
/// into a single feature vector:
/// - `Mean`: average over real tokens, weighted by the attention mask so
///   padding never contributes (the sentence-transformers convention);
/// - `Cls`: the first token's hidden state (the classification-head input of
///   BERT-style models).
///
/// WHY TRACT?
/// Pure Rust, no ONNX Runtime install, and a plan that can be shared across
/// threads. The graph is specialized once at load time for the tokenizer's
/// fixed length, so `embed` is a single `run` with no re-optimization.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;
use veilmood_core::{Error, Result};

use crate::tokenizer::EncodedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    #[default]
    Mean,
    Cls,
}

/// Mean pool over token embeddings, weighted by attention mask.
///
/// `hidden_states` is a flat f32 buffer of shape [seq_len, embed_dim].
/// An all-zero mask yields zeros rather than NaN.
pub fn mean_pool(hidden_states: &[f32], seq_len: usize, embed_dim: usize, mask: &[i64]) -> Vec<f32> {
    let mut result = vec![0.0f32; embed_dim];
    let mut mask_sum = 0.0f32;

    for t in 0..seq_len {
        if mask[t] == 1 {
            let row = &hidden_states[t * embed_dim..(t + 1) * embed_dim];
            for (r, &h) in result.iter_mut().zip(row) {
                *r += h;
            }
            mask_sum += 1.0;
        }
    }

    if mask_sum > 0.0 {
        for r in result.iter_mut() {
            *r /= mask_sum;
        }
    }
    result
}

/// First-token pooling.
pub fn cls_pool(hidden_states: &[f32], embed_dim: usize) -> Vec<f32> {
    hidden_states[..embed_dim].to_vec()
}

fn model_err(context: &str) -> impl Fn(TractError) -> Error + '_ {
    move |e| Error::Model(format!("{}: {}", context, e))
}

pub struct EmbeddingModel {
    plan: TypedRunnableModel<TypedModel>,
    seq_len: usize,
    hidden_size: usize,
    /// 3 when the graph also takes token_type_ids.
    num_inputs: usize,
    pooling: Pooling,
}

impl EmbeddingModel {
    /// Load and optimize the encoder for inputs of shape [1, seq_len].
    pub fn from_onnx(path: &Path, seq_len: usize, hidden_size: usize, pooling: Pooling) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Model(format!("Failed to read ONNX model from {}: {}", path.display(), e))
        })?;

        let mut model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(&bytes))
            .map_err(model_err("Failed to parse ONNX model"))?;

        let num_inputs = model.input_outlets().map_err(model_err("Invalid encoder graph"))?.len();
        if !(2..=3).contains(&num_inputs) {
            return Err(Error::Model(format!(
                "encoder must take 2 or 3 inputs (ids, mask[, token types]), found {}",
                num_inputs
            )));
        }
        for i in 0..num_inputs {
            model = model
                .with_input_fact(i, InferenceFact::dt_shape(i64::datum_type(), tvec!(1, seq_len as i64)))
                .map_err(model_err("Failed to set encoder input shape"))?;
        }
        let plan = model
            .into_optimized()
            .map_err(model_err("Failed to optimize encoder"))?
            .into_runnable()
            .map_err(model_err("Failed to build encoder plan"))?;

        tracing::info!(
            path = %path.display(),
            seq_len,
            hidden_size,
            inputs = num_inputs,
            ?pooling,
            "loaded encoder"
        );
        Ok(Self { plan, seq_len, hidden_size, num_inputs, pooling })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Run the encoder and pool. Returns `hidden_size` values.
    pub fn embed(&self, input: &EncodedInput) -> Result<Vec<f32>> {
        if input.len() != self.seq_len {
            return Err(Error::Dimension { expected: self.seq_len, actual: input.len() });
        }
        let shape = (1, self.seq_len);
        let to_tensor = |data: &[i64]| -> Result<TValue> {
            let arr = tract_ndarray::Array2::from_shape_vec(shape, data.to_vec())
                .map_err(|e| Error::Model(format!("Failed to build input tensor: {}", e)))?;
            Ok(Tensor::from(arr).into())
        };

        let mut inputs = tvec!(to_tensor(input.token_ids())?, to_tensor(input.attention_mask())?);
        if self.num_inputs == 3 {
            inputs.push(to_tensor(input.token_type_ids())?);
        }

        let outputs = self.plan.run(inputs).map_err(model_err("Encoder forward pass failed"))?;
        let hidden = outputs[0]
            .to_array_view::<f32>()
            .map_err(model_err("Encoder output is not f32"))?;

        let dims = hidden.shape();
        if dims.len() != 3 || dims[1] != self.seq_len || dims[2] != self.hidden_size {
            return Err(Error::Model(format!(
                "expected encoder output [1, {}, {}], got {:?}",
                self.seq_len, self.hidden_size, dims
            )));
        }
        let flat: Vec<f32> = hidden.iter().copied().collect();

        Ok(match self.pooling {
            Pooling::Mean => mean_pool(&flat, self.seq_len, self.hidden_size, input.attention_mask()),
            Pooling::Cls => cls_pool(&flat, self.hidden_size),
        })
    }
}
