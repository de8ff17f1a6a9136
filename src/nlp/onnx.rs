//! DistilBERT SST-2 sentiment scorer backed by ONNX Runtime.

use std::{path::Path, sync::Mutex};

use ndarray::{Array2, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use tokenizers::{Tokenizer, TruncationParams};

use crate::{
    error::{PipelineError, Result},
    nlp::sentiment::{SentimentLabel, SentimentScore, SentimentScorer},
};

const MAX_TOKENS: usize = 512;

/// Binary classifier exported with `model.onnx` and `tokenizer.json` side by side.
pub struct OnnxScorer {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxScorer {
    pub fn load(dir: &Path) -> Result<Self> {
        let environment = Environment::builder()
            .with_name("bank-reviews")
            .build()
            .map_err(model_error)?
            .into_arc();
        let session = SessionBuilder::new(&environment)
            .map_err(model_error)?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(model_error)?
            .with_model_from_file(dir.join("model.onnx"))
            .map_err(model_error)?;
        let tokenizer = Tokenizer::from_file(dir.join("tokenizer.json")).map_err(model_error)?;
        let tokenizer = with_model_limit(tokenizer)?;
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl SentimentScorer for OnnxScorer {
    fn score(&self, text: &str) -> Result<SentimentScore> {
        let (ids, mask) = encode(&self.tokenizer, text)?;
        let len = ids.len();

        let ids = Array2::from_shape_vec((1, len), ids).map_err(model_error)?;
        let mask = Array2::from_shape_vec((1, len), mask).map_err(model_error)?;
        let ids = CowArray::from(ids.into_dyn());
        let mask = CowArray::from(mask.into_dyn());

        let session = self
            .session
            .lock()
            .map_err(|_| PipelineError::upstream("sentiment model", "session lock poisoned"))?;
        let inputs = vec![
            Value::from_array(session.allocator(), &ids).map_err(model_error)?,
            Value::from_array(session.allocator(), &mask).map_err(model_error)?,
        ];
        let outputs = session.run(inputs).map_err(model_error)?;
        let logits = outputs[0].try_extract::<f32>().map_err(model_error)?;
        let logits: Vec<f32> = logits.view().iter().copied().collect();
        let &[negative, positive] = logits.as_slice() else {
            return Err(PipelineError::upstream(
                "sentiment model",
                format!("expected 2 logits, got {}", logits.len()),
            ));
        };

        let max = negative.max(positive);
        let (neg, pos) = ((negative - max).exp(), (positive - max).exp());
        let p_positive = f64::from(pos / (neg + pos));
        Ok(if p_positive >= 0.5 {
            SentimentScore {
                label: SentimentLabel::Positive,
                score: p_positive,
            }
        } else {
            SentimentScore {
                label: SentimentLabel::Negative,
                score: 1.0 - p_positive,
            }
        })
    }
}

/// Cap encodings at the model's input size, keeping `[CLS]`/`[SEP]`.
fn with_model_limit(mut tokenizer: Tokenizer) -> Result<Tokenizer> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_TOKENS,
            ..TruncationParams::default()
        }))
        .map_err(model_error)?;
    Ok(tokenizer)
}

/// Token ids and attention mask for one review.
fn encode(tokenizer: &Tokenizer, text: &str) -> Result<(Vec<i64>, Vec<i64>)> {
    let encoding = tokenizer.encode(text, true).map_err(model_error)?;
    let ids = encoding.get_ids().iter().map(|&v| i64::from(v)).collect();
    let mask = encoding
        .get_attention_mask()
        .iter()
        .map(|&v| i64::from(v))
        .collect();
    Ok((ids, mask))
}

fn model_error(err: impl ToString) -> PipelineError {
    PipelineError::upstream("sentiment model", err)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "WhitespaceSplit" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "good": 1, "[CLS]": 2, "[SEP]": 3 },
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn long_reviews_keep_special_tokens() {
        let tokenizer = with_model_limit(Tokenizer::from_str(TOKENIZER_JSON).unwrap()).unwrap();
        let (ids, mask) = encode(&tokenizer, &"good ".repeat(600)).unwrap();

        assert_eq!(ids.len(), MAX_TOKENS);
        assert_eq!(mask.len(), MAX_TOKENS);
        assert_eq!(ids.first(), Some(&2));
        assert_eq!(ids.last(), Some(&3));
    }
}
