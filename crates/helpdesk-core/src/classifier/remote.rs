//! Intent model served over HTTP by an inference endpoint.
//!
//! Wire format:
//! - `GET  {endpoint}/health`  -> any 2xx means the model is loaded
//! - `POST {endpoint}/predict` `{"text": "...", "top_k": 3}`
//!   -> `{"predictions": [{"intent": "greeting", "confidence": 0.93}, {"label_id": 4, "confidence": 0.02}]}`
//!
//! A prediction may carry the label directly (`intent`) or the raw class id (`label_id`),
//! which is resolved through the `label_mappings.json` exported with the model.

use super::{IntentModel, Prediction};
use crate::error::{HelpdeskError, Result};
use crate::shared::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const MODEL_NAME: &str = "remote";

/// Class-id to label table written next to the trained model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMappings {
    /// Keys are class ids as strings (`"0"`, `"1"`, ...).
    pub id2label: HashMap<String, String>,
    #[serde(default)]
    pub label2id: HashMap<String, u32>,
}

impl LabelMappings {
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        self.id2label.get(&id.to_string()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<RawPrediction>,
}

#[derive(Deserialize)]
struct RawPrediction {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    label_id: Option<u32>,
    confidence: f64,
}

pub struct RemoteIntentModel {
    client: reqwest::Client,
    endpoint: String,
    labels: Option<LabelMappings>,
    loaded: bool,
}

impl RemoteIntentModel {
    /// Builds the client and probes `/health`. An unreachable endpoint is not an error:
    /// the model is reported as not loaded and the engine falls back to keywords.
    pub async fn connect(config: &ClassifierConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| HelpdeskError::Model("classifier.endpoint is not set".into()))?
            .trim_end_matches('/')
            .to_string();

        let labels = match config.label_mappings_path.as_deref() {
            Some(path) => {
                let labels = LabelMappings::load_path(path)?;
                tracing::info!(path, intents = labels.len(), "Label mappings loaded");
                Some(labels)
            }
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let mut model = Self {
            client,
            endpoint,
            labels,
            loaded: false,
        };
        model.loaded = model.probe().await;
        Ok(model)
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(res) if res.status().is_success() => {
                tracing::info!(endpoint = %self.endpoint, "Intent model reachable");
                true
            }
            Ok(res) => {
                tracing::warn!(endpoint = %self.endpoint, status = %res.status(), "Intent model not ready");
                false
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Intent model unreachable");
                false
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resolve(&self, raw: RawPrediction) -> Result<Prediction> {
        let intent = match (raw.intent, raw.label_id) {
            (Some(intent), _) => intent,
            (None, Some(id)) => self
                .labels
                .as_ref()
                .and_then(|l| l.label(id))
                .map(str::to_string)
                .ok_or_else(|| HelpdeskError::Model(format!("no label for class id {}", id)))?,
            (None, None) => {
                return Err(HelpdeskError::Model(
                    "prediction has neither intent nor label_id".into(),
                ))
            }
        };
        Ok(Prediction {
            intent,
            confidence: raw.confidence,
        })
    }
}

#[async_trait::async_trait]
impl IntentModel for RemoteIntentModel {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn predict(&self, text: &str) -> Result<Prediction> {
        self.predict_top_k(text, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HelpdeskError::Model("model returned no predictions".into()))
    }

    async fn predict_top_k(&self, text: &str, k: usize) -> Result<Vec<Prediction>> {
        let url = format!("{}/predict", self.endpoint);
        let body: PredictResponse = self
            .client
            .post(&url)
            .json(&PredictRequest { text, top_k: k })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut predictions = body
            .predictions
            .into_iter()
            .map(|raw| self.resolve(raw))
            .collect::<Result<Vec<_>>>()?;
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        predictions.truncate(k);
        Ok(predictions)
    }
}
