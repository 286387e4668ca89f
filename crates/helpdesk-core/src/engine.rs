//! Chat engine: intent detection (model first, keywords as fallback) and response lookup.

use crate::classifier::{IntentModel, Prediction};
use crate::knowledge::KnowledgeBase;
use crate::matcher::KeywordMatcher;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Intent reported when nothing in the knowledge base matches.
pub const UNKNOWN_INTENT: &str = "unknown";

pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, I didn't understand that. Could you please rephrase your question?";

/// Model predictions below this confidence are re-checked with the keyword matcher.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Which path decided the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Model,
    Keyword,
    /// Neither the model nor the keywords produced a known intent.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub intent: String,
    /// Model confidence, present whenever the model produced a prediction
    /// (also when it was too low and the keywords decided).
    pub confidence: Option<f64>,
    pub source: DetectionSource,
}

/// Ranked candidate intents for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub source: DetectionSource,
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub intent: String,
    pub confidence: Option<f64>,
}

pub struct ChatEngine {
    knowledge: Arc<KnowledgeBase>,
    matcher: KeywordMatcher,
    model: Option<Arc<dyn IntentModel>>,
    confidence_threshold: f64,
    fallback_response: String,
}

impl ChatEngine {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        let matcher = KeywordMatcher::new(&knowledge);
        Self {
            knowledge: Arc::new(knowledge),
            matcher,
            model: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fallback_response: FALLBACK_RESPONSE.to_string(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn IntentModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Reply used for `unknown` and for intents without responses.
    pub fn with_fallback_response(mut self, response: impl Into<String>) -> Self {
        self.fallback_response = response.into();
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// The attached model, if it reported itself loaded.
    fn active_model(&self) -> Option<&Arc<dyn IntentModel>> {
        self.model.as_ref().filter(|m| m.is_loaded())
    }

    pub fn model_active(&self) -> bool {
        self.active_model().is_some()
    }

    /// Intents the knowledge base does not define collapse to [`UNKNOWN_INTENT`].
    fn known_or_unknown(&self, intent: String) -> String {
        if self.knowledge.contains(&intent) {
            intent
        } else {
            tracing::warn!(intent = %intent, "Model predicted an intent missing from the knowledge base");
            UNKNOWN_INTENT.to_string()
        }
    }

    pub async fn detect_intent(&self, message: &str) -> Detection {
        let mut confidence = None;

        if let Some(model) = self.active_model() {
            match model.predict(message).await {
                Ok(prediction) => {
                    confidence = Some(prediction.confidence);
                    if prediction.confidence >= self.confidence_threshold {
                        return Detection {
                            intent: self.known_or_unknown(prediction.intent),
                            confidence,
                            source: DetectionSource::Model,
                        };
                    }
                    tracing::warn!(
                        model = model.name(),
                        confidence = prediction.confidence,
                        threshold = self.confidence_threshold,
                        "Low confidence model prediction; trying keyword fallback"
                    );
                }
                Err(e) => {
                    tracing::warn!(model = model.name(), error = %e, "Intent model failed; falling back to keywords");
                }
            }
        }

        match self.matcher.detect(message) {
            Some(m) => Detection {
                intent: m.intent,
                confidence,
                source: DetectionSource::Keyword,
            },
            None => Detection {
                intent: UNKNOWN_INTENT.to_string(),
                confidence,
                source: DetectionSource::None,
            },
        }
    }

    /// Random canned response for `intent`, or the fallback response.
    pub fn respond<R: Rng + ?Sized>(&self, intent: &str, rng: &mut R) -> String {
        self.knowledge
            .choose_response(intent, rng)
            .unwrap_or(self.fallback_response.as_str())
            .to_string()
    }

    pub async fn reply(&self, message: &str) -> ChatReply {
        let detection = self.detect_intent(message).await;
        let response = self.respond(&detection.intent, &mut rand::thread_rng());
        tracing::debug!(intent = %detection.intent, source = ?detection.source, "Reply chosen");
        ChatReply {
            response,
            intent: detection.intent,
            confidence: detection.confidence,
        }
    }

    /// Up to `k` candidate intents. Uses the model when active; otherwise keyword scores,
    /// normalized to their share of the total score. Model predictions for intents the
    /// knowledge base does not define are dropped.
    pub async fn rank_intents(&self, message: &str, k: usize) -> Ranking {
        if let Some(model) = self.active_model() {
            match model.predict_top_k(message, k).await {
                Ok(predictions) => {
                    let predictions: Vec<Prediction> = predictions
                        .into_iter()
                        .filter(|p| {
                            let known = self.knowledge.contains(&p.intent);
                            if !known {
                                tracing::debug!(intent = %p.intent, "Dropping ranked intent missing from the knowledge base");
                            }
                            known
                        })
                        .collect();
                    let source = if predictions.is_empty() {
                        DetectionSource::None
                    } else {
                        DetectionSource::Model
                    };
                    return Ranking {
                        source,
                        predictions,
                    };
                }
                Err(e) => {
                    tracing::warn!(model = model.name(), error = %e, "Intent model ranking failed; using keywords");
                }
            }
        }

        let ranked = self.matcher.rank(message);
        let total: usize = ranked.iter().map(|m| m.score).sum();
        let predictions: Vec<Prediction> = ranked
            .into_iter()
            .take(k)
            .map(|m| Prediction {
                confidence: m.score as f64 / total as f64,
                intent: m.intent,
            })
            .collect();
        let source = if predictions.is_empty() {
            DetectionSource::None
        } else {
            DetectionSource::Keyword
        };
        Ranking {
            source,
            predictions,
        }
    }
}
