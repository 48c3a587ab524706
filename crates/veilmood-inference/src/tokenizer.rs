/// Tokenization wrapper for the sentence encoder.
///
/// Wraps HuggingFace's tokenizers crate behind one path: load from a
/// tokenizer.json file, encode a single post, get fixed-length IDs, mask and
/// token type IDs back.
///
/// FIXED LENGTH:
/// Every post is truncated or padded to `max_length` tokens. The encoder plan
/// is built once for that exact shape, so no per-call shape specialization is
/// needed and every post costs the same forward pass. Padding positions get
/// mask 0 and never reach the pooled embedding.

use std::path::Path;

use tokenizers::{Tokenizer, TruncationParams};
use veilmood_core::{Error, Result};

/// Token IDs, attention mask and token type IDs for one post.
///
/// All three have the same length, equal to the tokenizer's `max_length`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInput {
    ids: Vec<i64>,
    mask: Vec<i64>,
    type_ids: Vec<i64>,
}

impl EncodedInput {
    /// The token IDs as i64 (ONNX models expect i64 inputs).
    pub fn token_ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn attention_mask(&self) -> &[i64] {
        &self.mask
    }

    pub fn token_type_ids(&self) -> &[i64] {
        &self.type_ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tokens that are not padding.
    pub fn real_tokens(&self) -> usize {
        self.mask.iter().filter(|&&m| m == 1).count()
    }
}

pub struct SentenceTokenizer {
    inner: Tokenizer,
    max_length: usize,
    pad_id: i64,
}

impl SentenceTokenizer {
    /// Load from a tokenizer.json file.
    ///
    /// Truncation is delegated to the tokenizer (it keeps the trailing
    /// special token in place). Padding is done by hand in `encode`.
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self> {
        if max_length < 2 {
            return Err(Error::Model(format!(
                "max_length must leave room for special tokens, got {}",
                max_length
            )));
        }
        let mut inner = Tokenizer::from_file(path).map_err(|e| {
            Error::Model(format!("Failed to load tokenizer from {}: {}", path.display(), e))
        })?;
        inner.with_padding(None);
        inner
            .with_truncation(Some(TruncationParams { max_length, ..Default::default() }))
            .map_err(|e| Error::Model(format!("Failed to configure truncation: {}", e)))?;

        let pad_id = ["<pad>", "[PAD]"]
            .iter()
            .find_map(|t| inner.token_to_id(t))
            .unwrap_or(0) as i64;

        Ok(Self { inner, max_length, pad_id })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn pad_id(&self) -> i64 {
        self.pad_id
    }

    /// Tokenize one post into exactly `max_length` positions.
    pub fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| Error::Model(format!("Tokenization failed: {}", e)))?;

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
        let mut type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        ids.resize(self.max_length, self.pad_id);
        mask.resize(self.max_length, 0);
        type_ids.resize(self.max_length, 0);

        Ok(EncodedInput { ids, mask, type_ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer_path() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/tokenizer.json"))
    }

    // =========================================================================
    // TEST GROUP 1: Loading the tokenizer
    // =========================================================================

    #[test]
    fn test_load_tokenizer_bad_path() {
        let err = SentenceTokenizer::from_file(Path::new("/nonexistent/tokenizer.json"), 128)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Model(_)));
        assert!(err.to_string().contains("Failed to load tokenizer"));
    }

    #[test]
    fn test_rejects_tiny_max_length() {
        assert!(SentenceTokenizer::from_file(tokenizer_path(), 1).is_err());
    }

    #[test]
    #[ignore = "requires models/tokenizer.json"]
    fn test_load_tokenizer() {
        let tok = SentenceTokenizer::from_file(tokenizer_path(), 128);
        assert!(tok.is_ok(), "Failed to load tokenizer: {:?}", tok.err());
    }

    // =========================================================================
    // TEST GROUP 2: Fixed-length encoding
    // =========================================================================

    #[test]
    #[ignore = "requires models/tokenizer.json"]
    fn test_short_text_is_padded() {
        let tok = SentenceTokenizer::from_file(tokenizer_path(), 128).unwrap();
        let enc = tok.encode("I love this").unwrap();

        assert_eq!(enc.len(), 128);
        assert_eq!(enc.attention_mask().len(), 128);
        assert_eq!(enc.token_type_ids().len(), 128);
        let real = enc.real_tokens();
        assert!(real >= 3 && real < 128);
        assert!(enc.token_ids()[real..].iter().all(|&id| id == tok.pad_id()));
        assert!(enc.attention_mask()[real..].iter().all(|&m| m == 0));
    }

    #[test]
    #[ignore = "requires models/tokenizer.json"]
    fn test_long_text_is_truncated() {
        let tok = SentenceTokenizer::from_file(tokenizer_path(), 32).unwrap();
        let text = "words ".repeat(500);
        let enc = tok.encode(&text).unwrap();

        assert_eq!(enc.len(), 32);
        assert_eq!(enc.real_tokens(), 32);
    }

    #[test]
    #[ignore = "requires models/tokenizer.json"]
    fn test_encoding_is_deterministic() {
        let tok = SentenceTokenizer::from_file(tokenizer_path(), 64).unwrap();
        assert_eq!(tok.encode("same text").unwrap(), tok.encode("same text").unwrap());
    }
}
