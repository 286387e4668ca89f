//! Training-data export for the offline intent model.
//!
//! Every knowledge-base pattern becomes a labelled example plus a set of surface
//! variations (punctuation, casing, request prefixes). The shuffled set is split into
//! train/validation files that the external training notebook consumes.

use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TRAIN_PATH: &str = "data/train_data.json";
pub const DEFAULT_VAL_PATH: &str = "data/val_data.json";
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

const REQUEST_PREFIXES: [&str; 6] = [
    "can you",
    "could you",
    "i need",
    "i want",
    "tell me about",
    "what about",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub intents: usize,
    pub total: usize,
    pub train: usize,
    pub validation: usize,
}

/// First character uppercased, the rest lowercased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(&chars.as_str().to_lowercase());
            out
        }
        None => String::new(),
    }
}

/// The pattern itself plus ten variations.
pub fn augment_pattern(pattern: &str) -> Vec<String> {
    let mut variations = vec![
        pattern.to_string(),
        format!("{}?", pattern),
        format!("{}.", pattern),
        capitalize(pattern),
        pattern.to_uppercase(),
    ];
    variations.extend(REQUEST_PREFIXES.iter().map(|prefix| format!("{} {}", prefix, pattern)));
    variations
}

/// One example per pattern plus all its augmentations, shuffled.
pub fn generate_examples<R: Rng + ?Sized>(knowledge: &KnowledgeBase, rng: &mut R) -> Vec<TrainingExample> {
    let mut examples = Vec::new();
    for entry in knowledge.iter() {
        for pattern in &entry.patterns {
            examples.push(TrainingExample {
                text: pattern.clone(),
                label: entry.intent.clone(),
            });
            examples.extend(augment_pattern(pattern).into_iter().map(|text| TrainingExample {
                text,
                label: entry.intent.clone(),
            }));
        }
    }
    examples.shuffle(rng);
    examples
}

/// Shuffles, then cuts at `floor(len * train_ratio)`.
pub fn split_examples<R: Rng + ?Sized>(
    mut examples: Vec<TrainingExample>,
    train_ratio: f64,
    rng: &mut R,
) -> (Vec<TrainingExample>, Vec<TrainingExample>) {
    examples.shuffle(rng);
    let ratio = train_ratio.clamp(0.0, 1.0);
    let split_at = (examples.len() as f64 * ratio).floor() as usize;
    let validation = examples.split_off(split_at);
    (examples, validation)
}

/// Generates, splits and writes both datasets as pretty JSON arrays.
pub fn export_dataset<R: Rng + ?Sized>(
    knowledge: &KnowledgeBase,
    train_path: &Path,
    val_path: &Path,
    train_ratio: f64,
    rng: &mut R,
) -> Result<DatasetStats> {
    let examples = generate_examples(knowledge, rng);
    let total = examples.len();
    let (train, validation) = split_examples(examples, train_ratio, rng);

    for (path, set) in [(train_path, &train), (val_path, &validation)] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(set)?)?;
        tracing::info!(path = %path.display(), examples = set.len(), "Dataset written");
    }

    Ok(DatasetStats {
        intents: knowledge.len(),
        total,
        train: train.len(),
        validation: validation.len(),
    })
}
