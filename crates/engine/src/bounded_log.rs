use crate::dedup::DedupGate;
use crate::sink::Sink;
use crate::storage::StateStore;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;
use watchword_protocol::{EntryMeta, LogEntry, SinkEvent, LOG_MAX_ENTRIES};

/// Capped, newest-first, dedup-gated event history over the persistence
/// boundary. Every append is a whole-log read-modify-write.
///
/// Appends are serialized: the dedup gate lock is held across the full
/// read-prepend-write cycle, so two rapid detections cannot both read the
/// same pre-append snapshot and silently drop one another's entry. An
/// append already in flight when the baseline is reset still completes and
/// notifies, which is the documented acceptable race.
pub struct BoundedLog {
    store: Arc<dyn StateStore>,
    sink: Arc<dyn Sink>,
    platform: String,
    gate: Mutex<DedupGate>,
}

impl BoundedLog {
    pub fn new(store: Arc<dyn StateStore>, sink: Arc<dyn Sink>, platform: impl Into<String>) -> Self {
        Self {
            store,
            sink,
            platform: platform.into(),
            gate: Mutex::new(DedupGate::new()),
        }
    }

    /// Appends a keyword detection. An empty keyword set is a no-op.
    pub async fn log_keywords(&self, keywords: Vec<String>) {
        if keywords.is_empty() {
            return;
        }
        let entry = LogEntry::Keyword {
            keywords,
            toxicity: None,
            meta: EntryMeta::now(&self.platform),
        };
        self.append(entry).await;
    }

    /// Appends a system message entry.
    pub async fn log_system(&self, text: impl Into<String>) {
        let entry = LogEntry::System {
            text: text.into(),
            meta: EntryMeta::now(&self.platform),
        };
        self.append(entry).await;
    }

    /// Clears the dedup baseline (visibility regain, reset command).
    pub async fn reset_baseline(&self) {
        self.gate.lock().await.reset();
    }

    /// Fire-and-forget append: dedup check, whole-log read, prepend,
    /// truncate to the cap, whole-log write, then sink notify and baseline
    /// commit. Any persistence failure aborts silently at debug level with
    /// no state mutated.
    async fn append(&self, entry: LogEntry) {
        let mut gate = self.gate.lock().await;
        if !gate.accept(&entry) {
            return;
        }

        let current = match self.store.read_log().await {
            Ok(entries) => entries,
            Err(err) => {
                debug!("log read failed, dropping entry: {err}");
                return;
            }
        };

        let mut next = Vec::with_capacity(current.len() + 1);
        next.push(entry.clone());
        next.extend(current);
        next.truncate(LOG_MAX_ENTRIES);

        if let Err(err) = self.store.write_log(&next).await {
            debug!("log write failed, dropping entry: {err}");
            return;
        }

        if let Err(err) = self.sink.notify(SinkEvent::LogEntry(entry.clone())).await {
            debug!("log notification failed: {err}");
        }
        gate.commit(entry);
    }
}
