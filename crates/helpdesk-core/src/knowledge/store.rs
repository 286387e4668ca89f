//! In-memory knowledge base loaded from JSON.

use crate::error::{HelpdeskError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// One intent: the phrases that trigger it and the replies it may produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(skip)]
    pub intent: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

/// Ordered intent table. Order follows the source document and breaks keyword-score ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        let mut kb = Self::default();
        for entry in entries {
            kb.upsert(entry);
        }
        kb
    }

    /// Reads and parses the knowledge base at `path`.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HelpdeskError::KnowledgeBaseNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Startup loader: any failure is logged and an empty knowledge base is used instead,
    /// so the service still answers (every message then resolves to `unknown`).
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_path(path) {
            Ok(kb) => {
                tracing::info!(
                    path = %path.display(),
                    intents = kb.len(),
                    "Knowledge base loaded"
                );
                kb
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Knowledge base unavailable; starting empty");
                Self::default()
            }
        }
    }

    /// Later definitions of an intent replace earlier ones in place.
    fn upsert(&mut self, entry: KnowledgeEntry) {
        match self.entries.iter_mut().find(|e| e.intent == entry.intent) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, intent: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.intent == intent)
    }

    pub fn contains(&self, intent: &str) -> bool {
        self.get(intent).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.entries.iter()
    }

    pub fn intent_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.intent.as_str()).collect()
    }

    /// Uniformly random response for `intent`; `None` if the intent is unknown or has no responses.
    pub fn choose_response<R: Rng + ?Sized>(&self, intent: &str, rng: &mut R) -> Option<&str> {
        self.get(intent)?
            .responses
            .choose(rng)
            .map(String::as_str)
    }
}

struct KnowledgeBaseVisitor;

impl<'de> Visitor<'de> for KnowledgeBaseVisitor {
    type Value = KnowledgeBase;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping intent names to { patterns, responses }")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut kb = KnowledgeBase::default();
        while let Some((intent, mut entry)) = map.next_entry::<String, KnowledgeEntry>()? {
            entry.intent = intent;
            kb.upsert(entry);
        }
        Ok(kb)
    }
}

impl<'de> Deserialize<'de> for KnowledgeBase {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(KnowledgeBaseVisitor)
    }
}
