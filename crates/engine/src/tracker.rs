use crate::document::NodeId;
use crate::scanner::KeywordScanner;
use std::collections::HashMap;

/// Per-node scan cache: what we last saw, and whether it was flagged.
#[derive(Debug, Clone, Default)]
pub struct ScannableElement {
    pub last_scanned_text: String,
    pub flagged: bool,
}

/// Arena of per-node scan state, keyed by stable node handles. Entries are
/// created on first evaluation and evicted when the node is confirmed
/// detached by a removal mutation.
#[derive(Debug, Default)]
pub struct ElementTracker {
    elements: HashMap<NodeId, ScannableElement>,
}

impl ElementTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates one monitored node against its current rendered text.
    /// Returns the matched keywords when this call produced a new, loggable
    /// detection; `None` otherwise.
    ///
    /// An unchanged-and-flagged node is skipped without rescanning; an
    /// unchanged-but-unflagged node is rescanned. The second case is a known
    /// inefficiency kept on purpose: rescanning is pure and cheap, and the
    /// asymmetry is what lets a reset-then-rescan re-flag untouched nodes.
    pub fn evaluate(
        &mut self,
        id: NodeId,
        current_text: &str,
        scanner: &KeywordScanner,
    ) -> Option<Vec<String>> {
        let element = self.elements.entry(id).or_default();
        if current_text == element.last_scanned_text && element.flagged {
            return None;
        }

        let keywords = scanner.scan(current_text);
        if keywords.is_empty() {
            // A formerly flagged node silently un-flags when its content
            // turns innocuous; the prior log entry stands.
            element.last_scanned_text = current_text.to_string();
            element.flagged = false;
            return None;
        }

        element.last_scanned_text = current_text.to_string();
        element.flagged = true;
        Some(keywords)
    }

    /// Drops the cache entry for a detached node.
    pub fn evict(&mut self, id: NodeId) {
        self.elements.remove(&id);
    }

    /// Clears every flagged bit while keeping cached text, the reset-command
    /// semantics: the next evaluation rescans and may re-flag.
    pub fn clear_flags(&mut self) {
        for element in self.elements.values_mut() {
            element.flagged = false;
        }
    }

    #[must_use]
    pub fn is_flagged(&self, id: NodeId) -> bool {
        self.elements
            .get(&id)
            .is_some_and(|element| element.flagged)
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.elements.len()
    }
}
