//! Optional pre-trained intent model.
//!
//! The model is trained offline and treated as a black box: text in, `(intent, confidence)` out.
//! [`RemoteIntentModel`] reaches it through an inference endpoint; anything else implementing
//! [`IntentModel`] can be attached to the chat engine instead.

mod remote;

pub use remote::{LabelMappings, RemoteIntentModel};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub intent: String,
    /// Softmax probability, 0.0 - 1.0.
    pub confidence: f64,
}

/// Trait implemented by every intent model backend.
#[async_trait::async_trait]
pub trait IntentModel: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// False when the artifact could not be loaded; the engine then skips the model entirely.
    fn is_loaded(&self) -> bool;

    /// Most likely intent for `text`.
    async fn predict(&self, text: &str) -> Result<Prediction>;

    /// The `k` most likely intents, highest confidence first.
    async fn predict_top_k(&self, text: &str, k: usize) -> Result<Vec<Prediction>>;
}
