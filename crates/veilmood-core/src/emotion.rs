/// The closed 7-way emotion taxonomy and per-post scores.
///
/// The label set is fixed when the classifier is exported, so it is an enum
/// rather than a string key. Every array indexed by emotion in this crate
/// (`[T; EMOTION_COUNT]`) uses `Emotion::index` order, which means a model
/// whose output width disagrees with the decoder cannot be wired in without a
/// conversion step that checks the labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Number of emotion classes the classifier head emits.
pub const EMOTION_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Neutral,
}

impl Emotion {
    /// All labels in index order.
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Neutral,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Emotion> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Neutral => "neutral",
        }
    }

    /// Chart color used by the dashboard.
    pub fn color(self) -> &'static str {
        match self {
            Emotion::Joy => "#FFD700",
            Emotion::Sadness => "#1E90FF",
            Emotion::Anger => "#FF0000",
            Emotion::Fear => "#800080",
            Emotion::Surprise => "#FF8C00",
            Emotion::Disgust => "#006400",
            Emotion::Neutral => "#A9A9A9",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.label() == lowered)
            .ok_or_else(|| Error::Artifact(format!("Unknown emotion label: {}", s)))
    }
}

/// Probability-like distribution over the taxonomy for one post.
///
/// Values lie in [0, 1] and sum to 1 (up to floating-point rounding).
/// Immutable once produced by the decoder. Deserialized values go through
/// the same check as `EmotionScores::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScores")]
pub struct EmotionScores {
    scores: [f64; EMOTION_COUNT],
}

#[derive(Deserialize)]
struct RawScores {
    scores: [f64; EMOTION_COUNT],
}

impl TryFrom<RawScores> for EmotionScores {
    type Error = Error;

    fn try_from(raw: RawScores) -> Result<Self, Error> {
        Self::new(raw.scores)
    }
}

/// Allowed drift of the score total from 1.
const TOTAL_TOLERANCE: f64 = 1e-6;

impl EmotionScores {
    /// Checked constructor: every score in [0, 1], total 1.
    pub fn new(scores: [f64; EMOTION_COUNT]) -> Result<Self, Error> {
        if let Some(bad) = scores.iter().find(|s| !(0.0..=1.0).contains(*s)) {
            return Err(Error::InvalidInput(format!("emotion score {} outside [0, 1]", bad)));
        }
        let total: f64 = scores.iter().sum();
        if (total - 1.0).abs() > TOTAL_TOLERANCE {
            return Err(Error::InvalidInput(format!("emotion scores sum to {}, not 1", total)));
        }
        Ok(Self { scores })
    }

    /// Build from already-normalized scores in `Emotion::index` order.
    pub fn from_probabilities(scores: [f64; EMOTION_COUNT]) -> Self {
        Self { scores }
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        self.scores[emotion.index()]
    }

    pub fn as_array(&self) -> &[f64; EMOTION_COUNT] {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.scores[e.index()]))
    }

    /// Highest-scoring emotion. Ties go to the earlier label.
    pub fn dominant(&self) -> Emotion {
        let mut best = 0;
        for i in 1..EMOTION_COUNT {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        Emotion::ALL[best]
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }
}
