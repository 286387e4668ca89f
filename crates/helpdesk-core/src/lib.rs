//! helpdesk-core: customer-service chatbot core (config, knowledge base, intent detection,
//! conversation log, training-data export).
//!
//! The gateway add-on wires these pieces behind a single `/chat` endpoint.

mod classifier;
mod conversation_log;
mod engine;
mod error;
mod knowledge;
mod matcher;
mod shared;
mod text;
mod training;

pub use shared::{ClassifierConfig, CoreConfig, DEFAULT_CONFIG_PATH};

pub use error::{HelpdeskError, Result};

pub use knowledge::{KnowledgeBase, KnowledgeEntry};

pub use text::{is_stopword, preprocess, tokenize};

pub use matcher::{KeywordMatch, KeywordMatcher};

pub use classifier::{IntentModel, LabelMappings, Prediction, RemoteIntentModel};

pub use engine::{
    ChatEngine, ChatReply, Detection, DetectionSource, Ranking, DEFAULT_CONFIDENCE_THRESHOLD,
    FALLBACK_RESPONSE, UNKNOWN_INTENT,
};

pub use conversation_log::{ConversationLog, ConversationLogEntry};

pub use training::{
    augment_pattern, capitalize, export_dataset, generate_examples, split_examples, DatasetStats,
    TrainingExample, DEFAULT_TRAIN_PATH, DEFAULT_TRAIN_RATIO, DEFAULT_VAL_PATH,
};
