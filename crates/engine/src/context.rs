use crate::activity::{unix_now_ms, ActivityThrottle};
use crate::document::{
    monitored_subtree, nearest_monitored, DocumentEvent, DocumentView, Mutation, NodeId,
};
use crate::bounded_log::BoundedLog;
use crate::scanner::KeywordScanner;
use crate::sink::Sink;
use crate::storage::StateStore;
use crate::tracker::ElementTracker;
use log::debug;
use std::sync::Arc;
use watchword_protocol::{
    is_activity_host, is_tracked_provider, provider_label, ActivityRecord, SinkEvent,
};

/// Command accepted from the external command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Re-enable tracking and run a full-document pass.
    Highlight,
    /// Freeze tracking, clear per-node flags and the dedup baseline.
    Reset,
}

/// Synchronous command acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub status: String,
}

/// Everything one monitored document needs, threaded explicitly through
/// every operation: scanner, per-node cache, enable flag, bounded log,
/// activity throttle and host identity. One context per document; no
/// process-global state.
pub struct WatchContext {
    hostname: String,
    platform: String,
    scanner: KeywordScanner,
    tracker: ElementTracker,
    enabled: bool,
    log: BoundedLog,
    throttle: ActivityThrottle,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn Sink>,
}

impl WatchContext {
    pub fn new(
        hostname: impl Into<String>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let hostname = hostname.into();
        let platform = provider_label(&hostname);
        Self {
            log: BoundedLog::new(store.clone(), sink.clone(), &platform),
            hostname,
            platform,
            scanner: KeywordScanner::new(),
            tracker: ElementTracker::new(),
            enabled: true,
            throttle: ActivityThrottle::new(),
            store,
            sink,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    #[must_use]
    pub fn is_flagged(&self, id: NodeId) -> bool {
        self.tracker.is_flagged(id)
    }

    /// Dispatches one host event: mutation batch, visibility change, or raw
    /// input. Runs to completion before the next event is dispatched.
    pub async fn process_event<D: DocumentView>(&mut self, doc: &D, event: DocumentEvent) {
        match event {
            DocumentEvent::Mutations(mutations) => self.process_mutations(doc, &mutations).await,
            DocumentEvent::Visibility { hidden } => {
                if !hidden {
                    // Becoming visible again resets the dedup baseline so
                    // the first detection after a tab switch always logs.
                    self.log.reset_baseline().await;
                }
            }
            DocumentEvent::Input(_) => {
                if is_activity_host(&self.hostname) {
                    self.record_activity().await;
                }
            }
        }
    }

    async fn process_mutations<D: DocumentView>(&mut self, doc: &D, mutations: &[Mutation]) {
        for mutation in mutations {
            match mutation {
                Mutation::ChildList { added, removed } => {
                    // Eviction runs even while disabled so the arena keeps
                    // tracking the live tree, not nodes long gone.
                    for id in removed {
                        self.tracker.evict(*id);
                    }
                    if !self.enabled {
                        continue;
                    }
                    for id in added {
                        self.evaluate_subtree(doc, *id).await;
                    }
                }
                Mutation::CharacterData { target } => {
                    if !self.enabled {
                        continue;
                    }
                    // Only the nearest enclosing element, never the whole
                    // subtree: keystroke-level churn stays O(1).
                    if let Some(element) = nearest_monitored(doc, *target) {
                        self.evaluate_node(doc, element).await;
                    }
                }
            }
        }
    }

    async fn evaluate_subtree<D: DocumentView>(&mut self, doc: &D, root: NodeId) {
        for id in monitored_subtree(doc, root) {
            self.evaluate_node(doc, id).await;
        }
    }

    /// Evaluates one node; returns whether this produced a new detection.
    async fn evaluate_node<D: DocumentView>(&mut self, doc: &D, id: NodeId) -> bool {
        // A node detached mid-batch reads as no text at all.
        let Some(text) = doc.text_of(id) else {
            return false;
        };
        match self.tracker.evaluate(id, &text, &self.scanner) {
            Some(keywords) => {
                self.log.log_keywords(keywords).await;
                true
            }
            None => false,
        }
    }

    /// Full-document pass over every monitored element, in document order.
    /// Returns how many elements this pass newly flagged.
    pub async fn highlight<D: DocumentView>(&mut self, doc: &D) -> usize {
        let mut marked = 0;
        for id in doc.monitored_nodes() {
            if self.evaluate_node(doc, id).await {
                marked += 1;
            }
        }
        marked
    }

    /// Freezes mutation processing, clears flags and the dedup baseline.
    /// The System entry is logged before the baseline clears, so a repeated
    /// reset is not suppressed as a duplicate.
    pub async fn reset(&mut self) {
        self.enabled = false;
        self.tracker.clear_flags();
        self.log.log_system("Highlight tracking cleared.").await;
        self.log.reset_baseline().await;
    }

    /// Runs an external command and produces its acknowledgement string.
    pub async fn run_command<D: DocumentView>(
        &mut self,
        doc: &D,
        command: Command,
    ) -> CommandResponse {
        match command {
            Command::Highlight => {
                self.enabled = true;
                let highlighted = self.highlight(doc).await;
                self.log.log_system("Manual scan triggered.").await;
                let plural = if highlighted == 1 { "" } else { "s" };
                CommandResponse {
                    status: format!("Highlighted {highlighted} element{plural}."),
                }
            }
            Command::Reset => {
                self.reset().await;
                CommandResponse {
                    status: "Hints reset.".to_string(),
                }
            }
        }
    }

    /// Records a qualifying raw interaction at the current wall clock.
    pub async fn record_activity(&mut self) {
        self.record_activity_at(unix_now_ms()).await;
    }

    /// Throttled heartbeat: no-op off tracked providers or inside the
    /// window. On acceptance the record is overwritten and the sink
    /// notified; persistence failure degrades to diagnostics only.
    pub async fn record_activity_at(&mut self, now_ms: u64) {
        if !is_tracked_provider(&self.hostname) {
            return;
        }
        if !self.throttle.accept(now_ms) {
            return;
        }
        let record = ActivityRecord {
            timestamp: now_ms,
            platform: self.platform.clone(),
        };
        if let Err(err) = self.store.write_activity(&record).await {
            debug!("activity write failed: {err}");
        }
        if let Err(err) = self.sink.notify(SinkEvent::Activity(record)).await {
            debug!("activity notification failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, WatchContext};
    use crate::document::{DocumentEvent, MemoryDocument, Mutation};
    use crate::sink::{ChannelSink, NullSink};
    use crate::storage::{MemoryStore, StateStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use watchword_protocol::{LogEntry, SinkEvent};

    fn context_on(host: &str, store: Arc<MemoryStore>) -> WatchContext {
        WatchContext::new(host, store, Arc::new(NullSink))
    }

    #[tokio::test]
    async fn highlight_counts_newly_flagged_elements_once() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store.clone());
        let mut doc = MemoryDocument::new();
        doc.append_child(doc.root(), "p", "a risk here");
        doc.append_child(doc.root(), "p", "nothing");
        doc.append_child(doc.root(), "li", "so urgent");

        assert_eq!(ctx.highlight(&doc).await, 2);
        // Flagged and unchanged nodes are skipped on the second pass.
        assert_eq!(ctx.highlight(&doc).await, 0);
    }

    #[tokio::test]
    async fn character_data_narrows_to_nearest_element() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store.clone());
        let mut doc = MemoryDocument::new();
        let para = doc.append_child(doc.root(), "p", "quiet");
        let sibling = doc.append_child(doc.root(), "p", "warning sign");

        ctx.highlight(&doc).await;
        assert!(ctx.is_flagged(sibling));

        doc.set_text(para, "new risk text");
        ctx.process_event(
            &doc,
            DocumentEvent::Mutations(vec![Mutation::CharacterData { target: para }]),
        )
        .await;

        assert!(ctx.is_flagged(para));
        let entries = store.read_log().await.expect("read");
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn disabled_context_observes_but_does_not_evaluate() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store.clone());
        let mut doc = MemoryDocument::new();

        ctx.reset().await;
        assert!(!ctx.is_enabled());

        let added = doc.append_child(doc.root(), "p", "a risk");
        ctx.process_event(
            &doc,
            DocumentEvent::Mutations(vec![Mutation::ChildList {
                added: vec![added],
                removed: Vec::new(),
            }]),
        )
        .await;

        let entries = store.read_log().await.expect("read");
        // Only the reset's own system entry; the mutation produced nothing.
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            &entries[0],
            LogEntry::System { text, .. } if text == "Highlight tracking cleared."
        ));
    }

    #[tokio::test]
    async fn reset_then_highlight_reflags_and_recounts() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store.clone());
        let mut doc = MemoryDocument::new();
        doc.append_child(doc.root(), "p", "a risk here");
        doc.append_child(doc.root(), "span", "stay careful");

        assert_eq!(ctx.highlight(&doc).await, 2);

        let response = ctx.run_command(&doc, Command::Reset).await;
        assert_eq!(response.status, "Hints reset.");

        let response = ctx.run_command(&doc, Command::Highlight).await;
        assert_eq!(response.status, "Highlighted 2 elements.");
        assert!(ctx.is_enabled());
    }

    #[tokio::test]
    async fn highlight_status_is_singular_for_one_element() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store);
        let mut doc = MemoryDocument::new();
        doc.append_child(doc.root(), "p", "a risk");

        let response = ctx.run_command(&doc, Command::Highlight).await;
        assert_eq!(response.status, "Highlighted 1 element.");
    }

    #[tokio::test]
    async fn removal_evicts_so_reinsertion_redetects() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store.clone());
        let mut doc = MemoryDocument::new();
        let para = doc.append_child(doc.root(), "p", "a risk");

        ctx.highlight(&doc).await;
        ctx.run_command(&doc, Command::Highlight).await; // interleave a system entry

        let removed = doc.remove(para);
        ctx.process_event(
            &doc,
            DocumentEvent::Mutations(vec![Mutation::ChildList {
                added: Vec::new(),
                removed,
            }]),
        )
        .await;

        let again = doc.append_child(doc.root(), "p", "a risk");
        ctx.process_event(
            &doc,
            DocumentEvent::Mutations(vec![Mutation::ChildList {
                added: vec![again],
                removed: Vec::new(),
            }]),
        )
        .await;

        let keyword_entries = store
            .read_log()
            .await
            .expect("read")
            .into_iter()
            .filter(|entry| matches!(entry, LogEntry::Keyword { .. }))
            .count();
        assert_eq!(keyword_entries, 2);
    }

    #[tokio::test]
    async fn visibility_regain_resets_dedup_baseline() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("chatgpt.com", store.clone());
        let mut doc = MemoryDocument::new();
        let para = doc.append_child(doc.root(), "p", "a risk");

        ctx.highlight(&doc).await;

        // Same keyword set in a fresh node: normally a consecutive duplicate.
        doc.set_text(para, "another risk");
        ctx.process_event(&doc, DocumentEvent::Visibility { hidden: true })
            .await;
        ctx.process_event(&doc, DocumentEvent::Visibility { hidden: false })
            .await;
        ctx.process_event(
            &doc,
            DocumentEvent::Mutations(vec![Mutation::CharacterData { target: para }]),
        )
        .await;

        assert_eq!(store.read_log().await.expect("read").len(), 2);
    }

    #[tokio::test]
    async fn activity_ignored_on_untracked_hosts() {
        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("example.org", store.clone());
        ctx.record_activity_at(1_000_000).await;
        assert_eq!(store.read_activity().await.expect("read"), None);
    }

    #[tokio::test]
    async fn activity_throttles_then_reopens() {
        let store = Arc::new(MemoryStore::new());
        let (sink, mut rx) = ChannelSink::new();
        let mut ctx = WatchContext::new("chatgpt.com", store.clone(), Arc::new(sink));

        ctx.record_activity_at(1_000_000).await;
        ctx.record_activity_at(1_003_000).await;
        ctx.record_activity_at(1_006_000).await;

        let record = store
            .read_activity()
            .await
            .expect("read")
            .expect("record present");
        assert_eq!(record.timestamp, 1_006_000);
        assert_eq!(record.platform, "ChatGPT");

        let mut notified = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SinkEvent::Activity(record) = event {
                notified.push(record.timestamp);
            }
        }
        assert_eq!(notified, vec![1_000_000, 1_006_000]);
    }

    #[tokio::test]
    async fn input_events_gated_by_activity_host() {
        use crate::document::InputEvent;

        let store = Arc::new(MemoryStore::new());
        let mut ctx = context_on("gemini.google.com", store.clone());
        let doc = MemoryDocument::new();

        // Tracked provider, but not an activity host: no heartbeat wiring.
        ctx.process_event(&doc, DocumentEvent::Input(InputEvent::KeyDown))
            .await;
        assert_eq!(store.read_activity().await.expect("read"), None);
    }
}
