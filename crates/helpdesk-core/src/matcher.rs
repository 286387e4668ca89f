//! Keyword matcher: scores each intent by token overlap with its patterns.

use crate::knowledge::KnowledgeBase;
use crate::text::preprocess;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Winning intent and its overlap score (always > 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub intent: String,
    pub score: usize,
}

struct IntentTokens {
    intent: String,
    patterns: Vec<HashSet<String>>,
}

/// Pattern tokens are preprocessed once, when the matcher is built.
pub struct KeywordMatcher {
    intents: Vec<IntentTokens>,
}

impl KeywordMatcher {
    pub fn new(knowledge: &KnowledgeBase) -> Self {
        let intents = knowledge
            .iter()
            .map(|entry| IntentTokens {
                intent: entry.intent.clone(),
                patterns: entry
                    .patterns
                    .iter()
                    .map(|p| preprocess(p).into_iter().collect())
                    .collect(),
            })
            .collect();
        Self { intents }
    }

    /// Every message token found in a pattern adds one point, per pattern. Highest score wins;
    /// on a tie the intent listed first in the knowledge base wins.
    pub fn detect(&self, message: &str) -> Option<KeywordMatch> {
        let best = self.rank(message).into_iter().next();
        tracing::debug!(matched = ?best, "Keyword match");
        best
    }

    /// All intents with a non-zero score, best first (ties keep knowledge-base order).
    pub fn rank(&self, message: &str) -> Vec<KeywordMatch> {
        let tokens = preprocess(message);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<KeywordMatch> = self
            .intents
            .iter()
            .filter_map(|intent| {
                let score: usize = intent
                    .patterns
                    .iter()
                    .map(|pattern| tokens.iter().filter(|t| pattern.contains(*t)).count())
                    .sum();
                (score > 0).then(|| KeywordMatch {
                    intent: intent.intent.clone(),
                    score,
                })
            })
            .collect();
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches
    }
}
