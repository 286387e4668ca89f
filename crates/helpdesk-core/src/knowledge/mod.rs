//! Static knowledge base: intents with trigger patterns and canned responses.
//!
//! File format (one object, document order is significant):
//!
//! ```json
//! {
//!   "greeting": { "patterns": ["hello", "hi there"], "responses": ["Hello! How can I help?"] },
//!   "order_status": { "patterns": ["where is my order"], "responses": ["..."] }
//! }
//! ```
//!
//! Loaded once at startup and never mutated afterwards.

mod store;

pub use store::{KnowledgeBase, KnowledgeEntry};
