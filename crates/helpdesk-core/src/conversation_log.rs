//! Append-only conversation log persisted as a pretty-printed JSON array.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationLogEntry {
    /// Local time, ISO-8601 with microseconds.
    pub timestamp: String,
    pub user_message: String,
    pub intent: String,
    pub bot_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ConversationLogEntry {
    pub fn now(
        user_message: impl Into<String>,
        intent: impl Into<String>,
        bot_response: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            user_message: user_message.into(),
            intent: intent.into(),
            bot_response: bot_response.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Serializes appends so concurrent requests never drop each other's entries.
pub struct ConversationLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConversationLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds `entry` to the end of the log. Existing contents that are not a JSON array
    /// are discarded, matching a fresh log.
    pub async fn append(&self, entry: &ConversationLogEntry) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read_existing().await?;
        entries.push(serde_json::to_value(entry)?);

        self.ensure_parent().await?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "Conversation logged");
        Ok(())
    }

    /// Pre-flight: the log location can be created and written without touching its contents.
    pub async fn check_writable(&self) -> Result<()> {
        self.ensure_parent().await?;
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(())
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    // Entries stay as raw JSON so fields written by other versions survive the rewrite.
    async fn read_existing(&self) -> Result<Vec<serde_json::Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Conversation log unreadable; starting a new one");
                Ok(Vec::new())
            }
        }
    }
}
