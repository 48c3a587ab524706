/// Batch results and their aggregation.
///
/// `AnalysisResult` is what the presentation layer charts: one entry per
/// analyzed post in input order, the posts that were skipped and why, an
/// overall emotion, per-emotion counts and mean scores, and timing metadata.
///
/// OVERALL EMOTION:
/// Majority vote over per-post dominant emotions. A tied vote goes to the
/// emotion with the highest total score across all analyzed posts, and a
/// tie on that as well to the earlier label in taxonomy order.

use std::time::Duration;

use serde::{Serialize, Serializer};
use veilmood_core::{Emotion, EmotionScores, EMOTION_COUNT};

#[derive(Debug, Clone, Serialize)]
pub struct PostResult {
    /// Position of the post in the input batch.
    pub index: usize,
    pub snippet: String,
    pub scores: EmotionScores,
    pub dominant: Emotion,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedPost {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmotionStat {
    pub emotion: Emotion,
    pub count: usize,
    pub mean_score: f64,
    pub color: &'static str,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Time spent per stage, summed over every analyzed post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    #[serde(rename = "extract_ms", serialize_with = "as_millis")]
    pub extract: Duration,
    #[serde(rename = "encrypt_ms", serialize_with = "as_millis")]
    pub encrypt: Duration,
    #[serde(rename = "evaluate_ms", serialize_with = "as_millis")]
    pub evaluate: Duration,
    #[serde(rename = "decrypt_ms", serialize_with = "as_millis")]
    pub decrypt: Duration,
}

impl StageTimings {
    pub fn accumulate(&mut self, other: &StageTimings) {
        self.extract += other.extract;
        self.encrypt += other.encrypt;
        self.evaluate += other.evaluate;
        self.decrypt += other.decrypt;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub posts_received: usize,
    pub posts_analyzed: usize,
    pub posts_skipped: usize,
    pub timings: StageTimings,
    #[serde(rename = "wall_ms", serialize_with = "as_millis")]
    pub wall: Duration,
    /// Total size of every ciphertext produced (inputs and logits).
    pub ciphertext_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub posts: Vec<PostResult>,
    pub skipped: Vec<SkippedPost>,
    pub overall_emotion: Emotion,
    /// One entry per emotion, in taxonomy order.
    pub emotions: Vec<EmotionStat>,
    /// Question-derived keywords, echoed for display.
    pub keywords: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Build the aggregate. `posts` must be non-empty and in input order.
    pub fn aggregate(
        posts: Vec<PostResult>,
        skipped: Vec<SkippedPost>,
        keywords: Vec<String>,
        metadata: AnalysisMetadata,
    ) -> Self {
        let mut counts = [0usize; EMOTION_COUNT];
        let mut totals = [0.0f64; EMOTION_COUNT];
        for post in &posts {
            counts[post.dominant.index()] += 1;
            for (t, s) in totals.iter_mut().zip(post.scores.as_array()) {
                *t += s;
            }
        }

        let n = posts.len().max(1) as f64;
        let emotions = Emotion::ALL
            .iter()
            .map(|&e| EmotionStat {
                emotion: e,
                count: counts[e.index()],
                mean_score: totals[e.index()] / n,
                color: e.color(),
            })
            .collect();

        Self {
            overall_emotion: overall_emotion(&counts, &totals),
            posts,
            skipped,
            emotions,
            keywords,
            metadata,
        }
    }

    pub fn count(&self, emotion: Emotion) -> usize {
        self.emotions[emotion.index()].count
    }

    pub fn mean_score(&self, emotion: Emotion) -> f64 {
        self.emotions[emotion.index()].mean_score
    }
}

/// Majority vote; ties by total score, then by taxonomy order.
pub fn overall_emotion(counts: &[usize; EMOTION_COUNT], totals: &[f64; EMOTION_COUNT]) -> Emotion {
    let mut best = 0;
    for i in 1..EMOTION_COUNT {
        if counts[i] > counts[best] || (counts[i] == counts[best] && totals[i] > totals[best]) {
            best = i;
        }
    }
    Emotion::ALL[best]
}

/// The first `max_chars` characters, with "..." when anything was cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
