//! Text to feature vectors: tokenizer, ONNX encoder and pooling.
pub mod embedding;
pub mod extractor;
pub mod tokenizer;

pub use embedding::{EmbeddingModel, Pooling};
pub use extractor::{EmbeddingExtractor, EncoderConfig};
pub use tokenizer::{EncodedInput, SentenceTokenizer};
