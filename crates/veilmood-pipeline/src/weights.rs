/// Load the linear classifier head from the JSON artifact exported alongside
/// the encoder.
///
/// The export carries the model's own label order, which need not match the
/// closed `Emotion` order:
///
/// ```json
/// {
///   "labels": ["anger", "disgust", "fear", "joy", "neutral", "sadness", "surprise"],
///   "weight": [[...768 floats...], ...7 rows...],
///   "bias":   [...7 floats...]
/// }
/// ```
///
/// Rows are reordered into `Emotion::index` order here, once. A label set that
/// is not exactly the seven emotions fails at load, before any post is
/// evaluated against the wrong row.

use std::collections::HashMap;
use std::path::Path;

use veilmood_core::{ClassifierWeights, Emotion, Error, Result, EMOTION_COUNT};

pub fn load_classifier_weights(path: &Path) -> Result<ClassifierWeights> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        Error::Artifact(format!("Failed to read weights file {}: {}", path.display(), e))
    })?;
    parse_classifier_weights(&data)
}

pub fn parse_classifier_weights(data: &str) -> Result<ClassifierWeights> {
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(data)
        .map_err(|e| Error::Artifact(format!("Failed to parse weights JSON: {}", e)))?;

    let get = |key: &str| -> Result<&serde_json::Value> {
        raw.get(key).ok_or_else(|| Error::Artifact(format!("Missing key: {}", key)))
    };

    let labels: Vec<Emotion> = get("labels")?
        .as_array()
        .ok_or_else(|| Error::Artifact("Expected array for labels".into()))?
        .iter()
        .map(|v| {
            v.as_str()
                .ok_or_else(|| Error::Artifact("Expected string in labels".into()))?
                .parse()
        })
        .collect::<Result<_>>()?;

    let rows: Vec<Vec<f64>> = get("weight")?
        .as_array()
        .ok_or_else(|| Error::Artifact("Expected array for weight".into()))?
        .iter()
        .map(|row| parse_vector(row, "weight"))
        .collect::<Result<_>>()?;
    let bias = parse_vector(get("bias")?, "bias")?;

    if labels.len() != EMOTION_COUNT {
        return Err(Error::Dimension { expected: EMOTION_COUNT, actual: labels.len() });
    }
    if rows.len() != labels.len() || bias.len() != labels.len() {
        return Err(Error::Artifact(format!(
            "{} labels but {} weight rows and {} biases",
            labels.len(),
            rows.len(),
            bias.len()
        )));
    }

    // slot[e] = position of emotion e in the export
    let mut slot: [Option<usize>; EMOTION_COUNT] = [None; EMOTION_COUNT];
    for (pos, label) in labels.iter().enumerate() {
        if slot[label.index()].replace(pos).is_some() {
            return Err(Error::Artifact(format!("Duplicate label: {}", label)));
        }
    }

    let mut ordered_rows = Vec::with_capacity(EMOTION_COUNT);
    let mut ordered_bias = Vec::with_capacity(EMOTION_COUNT);
    for (emotion, pos) in Emotion::ALL.iter().zip(slot) {
        let pos = pos.ok_or_else(|| Error::Artifact(format!("Missing label: {}", emotion)))?;
        ordered_rows.push(rows[pos].clone());
        ordered_bias.push(bias[pos]);
    }

    let weights = ClassifierWeights::new(ordered_rows, ordered_bias)?;
    tracing::info!(feature_dim = weights.feature_dim(), "loaded classifier weights");
    Ok(weights)
}

fn parse_vector(value: &serde_json::Value, key: &str) -> Result<Vec<f64>> {
    value
        .as_array()
        .ok_or_else(|| Error::Artifact(format!("Expected array for {}", key)))?
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| Error::Artifact(format!("Expected f64 in {}", key))))
        .collect()
}
