//! # Watchword Engine
//!
//! Incremental keyword scanning over a mutating document, with a
//! deduplicated, capped event log and a throttled activity heartbeat.
//!
//! ## Pipeline
//!
//! ```text
//! Document mutation
//!     │
//!     ├──> MutationWatcher (batch dispatch)
//!     │      └─> ElementTracker.evaluate(node)
//!     │            └─> KeywordScanner
//!     │                  └─> DedupGate ──> BoundedLog ──> Sink
//!     │
//!     └──> Input events ──> ActivityThrottle ──> StateStore + Sink
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use watchword_engine::{MemoryDocument, MemoryStore, NullSink, WatchContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut doc = MemoryDocument::new();
//!     doc.append_child(doc.root(), "p", "this looks unsafe");
//!
//!     let mut context =
//!         WatchContext::new("chatgpt.com", Arc::new(MemoryStore::new()), Arc::new(NullSink));
//!     let flagged = context.highlight(&doc).await;
//!     println!("flagged {flagged} elements");
//! }
//! ```

mod activity;
mod bounded_log;
mod context;
mod dedup;
mod document;
mod error;
mod scanner;
mod sink;
mod storage;
mod tracker;
mod watcher;

pub use activity::ActivityThrottle;
pub use bounded_log::BoundedLog;
pub use context::{Command, CommandResponse, WatchContext};
pub use dedup::{normalize_keywords, DedupGate};
pub use document::{
    is_monitored_kind, monitored_subtree, nearest_monitored, DocumentEvent, DocumentView,
    InputEvent, MemoryDocument, Mutation, NodeId, MONITORED_KINDS,
};
pub use error::{EngineError, Result};
pub use scanner::{KeywordScanner, KEYWORDS};
pub use sink::{ChannelSink, NullSink, Sink};
pub use storage::{JsonFileStore, MemoryStore, StateStore};
pub use tracker::{ElementTracker, ScannableElement};
pub use watcher::MutationWatcher;
