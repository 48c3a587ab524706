/// Error taxonomy shared by every veilmood crate.
///
/// Two families matter to callers:
/// - per-post errors (bad text, shape mismatch, overflow) are recorded and
///   the batch keeps going;
/// - scheme configuration errors mean every later evaluation would fail the
///   same way, so the orchestrator aborts the batch on the first one.
///
/// `Error::is_fatal` encodes that split.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty, whitespace-only or otherwise unusable post text.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Vector, weight row or slot count disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Two operands carry different scales or sit at different modulus levels.
    #[error("scale mismatch: {left_scale} at level {left_level} vs {right_scale} at level {right_level}")]
    ScaleMismatch {
        left_scale: f64,
        right_scale: f64,
        left_level: usize,
        right_level: usize,
    },

    /// The modulus chain cannot absorb the requested multiplicative depth.
    #[error("insufficient depth: required {required}, available {available}")]
    InsufficientDepth { required: usize, available: usize },

    /// A ciphertext produced under a different encryption context.
    #[error("ciphertext belongs to context {found}, expected {expected}")]
    ForeignCiphertext { expected: u64, found: u64 },

    #[error("invalid encryption parameters: {0}")]
    InvalidParameters(String),

    /// A value does not fit the base modulus at the current scale.
    #[error("value {value} exceeds the encodable bound {bound}")]
    Overflow { value: f64, bound: f64 },

    /// No post survived extraction.
    #[error("empty batch: no posts analyzed ({skipped} skipped)")]
    EmptyBatch { skipped: usize },

    #[error("analysis cancelled")]
    Cancelled,

    /// Tokenizer or encoder failure.
    #[error("model error: {0}")]
    Model(String),

    /// Weight, key or config artifact could not be read or parsed.
    #[error("{0}")]
    Artifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for scheme configuration errors that abort a whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ScaleMismatch { .. }
                | Error::InsufficientDepth { .. }
                | Error::ForeignCiphertext { .. }
                | Error::InvalidParameters(_)
                | Error::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
