/// The pipeline orchestrator: a batch of post texts in, an `AnalysisResult`
/// out.
///
/// FLOW PER POST:
/// 1. Extractor: text → FeatureVector
/// 2. Scheme: FeatureVector → Ciphertext
/// 3. Evaluator: Ciphertext → 7 logit ciphertexts
/// 4. Decoder: logit ciphertexts → EmotionScores
///
/// Posts are independent, so they run on a rayon pool. The only shared state
/// is the extractor, the scheme and the weights, all read-only. Results are
/// collected in input order whatever order the workers finish in.
///
/// FAILURE POLICY:
/// - per-post errors (blank text, shape mismatch, overflow) skip the post and
///   are recorded with its index;
/// - scheme configuration errors (`Error::is_fatal`) stop the batch: workers
///   see the abort flag before starting another post and the first such
///   error in input order is returned;
/// - cancellation is checked between posts. A post already in the scheme runs
///   to completion; nothing partial is ever decrypted.
///
/// No step is retried. Everything is deterministic apart from encryption
/// noise, so a retry would fail the same way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use veilmood_core::{
    ClassifierWeights, EncryptedEvaluator, Error, FeatureExtractor, HomomorphicScheme,
    ResultDecoder, Result,
};

use crate::stats::{snippet, AnalysisMetadata, AnalysisResult, PostResult, SkippedPost, StageTimings};

/// Caller-held handle that stops a running batch between posts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker threads; `None` uses one per CPU.
    pub workers: Option<usize>,
    pub snippet_chars: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { workers: None, snippet_chars: 100 }
    }
}

enum Outcome {
    Analyzed { post: PostResult, timings: StageTimings, bytes: usize },
    Skipped(SkippedPost),
    Fatal(Error),
    NotRun,
}

pub struct Pipeline<E, S> {
    extractor: Arc<E>,
    scheme: Arc<S>,
    weights: Arc<ClassifierWeights>,
    pool: rayon::ThreadPool,
    snippet_chars: usize,
}

impl<E: FeatureExtractor, S: HomomorphicScheme> Pipeline<E, S> {
    pub fn new(
        extractor: Arc<E>,
        scheme: Arc<S>,
        weights: Arc<ClassifierWeights>,
        options: PipelineOptions,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.unwrap_or(0))
            .thread_name(|i| format!("veilmood-worker-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        if extractor.dim() != weights.feature_dim() {
            tracing::warn!(
                extractor_dim = extractor.dim(),
                weights_dim = weights.feature_dim(),
                "extractor and classifier disagree on feature length; every post will be skipped"
            );
        }
        Ok(Self { extractor, scheme, weights, pool, snippet_chars: options.snippet_chars })
    }

    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn analyze<T: AsRef<str> + Sync>(&self, posts: &[T]) -> Result<AnalysisResult> {
        self.analyze_with(posts, &[], &CancellationToken::new())
    }

    /// Analyze a batch, echoing `keywords` into the result.
    pub fn analyze_with<T: AsRef<str> + Sync>(
        &self,
        posts: &[T],
        keywords: &[String],
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let started = Instant::now();
        let abort = AtomicBool::new(false);

        let outcomes: Vec<Outcome> = self.pool.install(|| {
            posts
                .par_iter()
                .enumerate()
                .map(|(index, text)| {
                    if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                        return Outcome::NotRun;
                    }
                    match self.analyze_post(index, text.as_ref()) {
                        Ok((post, timings, bytes)) => Outcome::Analyzed { post, timings, bytes },
                        Err(e) if e.is_fatal() => {
                            abort.store(true, Ordering::SeqCst);
                            Outcome::Fatal(e)
                        }
                        Err(e) => {
                            tracing::warn!(index, reason = %e, "skipping post");
                            Outcome::Skipped(SkippedPost { index, reason: e.to_string() })
                        }
                    }
                })
                .collect()
        });

        let mut analyzed = Vec::new();
        let mut skipped = Vec::new();
        let mut timings = StageTimings::default();
        let mut ciphertext_bytes = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Analyzed { post, timings: t, bytes } => {
                    timings.accumulate(&t);
                    ciphertext_bytes += bytes;
                    analyzed.push(post);
                }
                Outcome::Skipped(s) => skipped.push(s),
                Outcome::Fatal(e) => {
                    tracing::error!(error = %e, "aborting batch on scheme configuration error");
                    return Err(e);
                }
                Outcome::NotRun => {}
            }
        }
        if cancel.is_cancelled() {
            tracing::info!(analyzed = analyzed.len(), "batch cancelled");
            return Err(Error::Cancelled);
        }
        if analyzed.is_empty() {
            return Err(Error::EmptyBatch { skipped: skipped.len() });
        }

        let metadata = AnalysisMetadata {
            posts_received: posts.len(),
            posts_analyzed: analyzed.len(),
            posts_skipped: skipped.len(),
            timings,
            wall: started.elapsed(),
            ciphertext_bytes,
        };
        tracing::info!(
            received = metadata.posts_received,
            analyzed = metadata.posts_analyzed,
            skipped = metadata.posts_skipped,
            wall_ms = ms(metadata.wall),
            "batch analyzed"
        );
        Ok(AnalysisResult::aggregate(analyzed, skipped, keywords.to_vec(), metadata))
    }

    fn analyze_post(&self, index: usize, text: &str) -> Result<(PostResult, StageTimings, usize)> {
        let scheme = self.scheme.as_ref();
        let mut t = StageTimings::default();

        let clock = Instant::now();
        let features = self.extractor.extract(text)?;
        t.extract = clock.elapsed();

        let clock = Instant::now();
        let ct = scheme.encrypt(&features)?;
        t.encrypt = clock.elapsed();
        drop(features);

        let clock = Instant::now();
        let logits = EncryptedEvaluator::new(scheme).evaluate(&ct, &self.weights)?;
        t.evaluate = clock.elapsed();

        let bytes = scheme.ciphertext_bytes(&ct)
            + logits.iter().map(|l| scheme.ciphertext_bytes(l)).sum::<usize>();

        let clock = Instant::now();
        let scores = ResultDecoder::new(scheme).decode(&logits)?;
        t.decrypt = clock.elapsed();

        tracing::debug!(
            index,
            extract_ms = ms(t.extract),
            encrypt_ms = ms(t.encrypt),
            evaluate_ms = ms(t.evaluate),
            decrypt_ms = ms(t.decrypt),
            "post analyzed"
        );
        let post = PostResult {
            index,
            snippet: snippet(text, self.snippet_chars),
            dominant: scores.dominant(),
            scores,
        };
        Ok((post, t, bytes))
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
