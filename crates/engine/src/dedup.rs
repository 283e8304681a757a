use watchword_protocol::{LogEntry, ToxicityTag};

/// Normalized equality form for keyword sets: lowercased, sorted, joined.
/// An equality rule only; stored entries keep first-occurrence order.
#[must_use]
pub fn normalize_keywords(keywords: &[String]) -> String {
    let mut lowered: Vec<String> = keywords.iter().map(|kw| kw.to_lowercase()).collect();
    lowered.sort();
    lowered.join("|")
}

fn toxicity_label(tag: Option<&ToxicityTag>) -> &str {
    tag.map_or("", |tag| tag.label.as_str())
}

/// Suppresses order-independent consecutive duplicates by comparing each
/// candidate against the single most-recently accepted entry. O(1) per
/// check, and deliberately lets a detection re-fire after any other entry
/// was logged in between.
#[derive(Debug, Default)]
pub struct DedupGate {
    baseline: Option<LogEntry>,
}

impl DedupGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `candidate` should be logged. Does not move the baseline;
    /// call [`DedupGate::commit`] once the entry has actually persisted.
    #[must_use]
    pub fn accept(&self, candidate: &LogEntry) -> bool {
        let Some(baseline) = self.baseline.as_ref() else {
            return true;
        };
        if candidate.meta().platform != baseline.meta().platform {
            return true;
        }
        let duplicate = match (candidate, baseline) {
            (
                LogEntry::Keyword {
                    keywords: next,
                    toxicity: next_tag,
                    ..
                },
                LogEntry::Keyword {
                    keywords: prev,
                    toxicity: prev_tag,
                    ..
                },
            ) => {
                normalize_keywords(next) == normalize_keywords(prev)
                    && toxicity_label(next_tag.as_ref()) == toxicity_label(prev_tag.as_ref())
            }
            (LogEntry::System { text: next, .. }, LogEntry::System { text: prev, .. }) => {
                next == prev
            }
            _ => false,
        };
        !duplicate
    }

    /// Records `entry` as the new comparison baseline.
    pub fn commit(&mut self, entry: LogEntry) {
        self.baseline = Some(entry);
    }

    /// Clears the baseline (document became visible again, or log reset).
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
