use chrono::Local;
use serde::{Deserialize, Serialize};

/// Storage key holding the bounded event log (newest first).
pub const LOG_STORAGE_KEY: &str = "dialogueSafetyKeywordLog";

/// Storage key holding the single most-recent activity record.
pub const ACTIVITY_STORAGE_KEY: &str = "dialogueSafetyLastActivity";

/// Hard cap on persisted log entries; oldest entries are dropped on overflow.
pub const LOG_MAX_ENTRIES: usize = 40;

/// Minimum gap between accepted activity heartbeats.
pub const ACTIVITY_THROTTLE_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy)]
pub struct Provider {
    /// Substring matched against the host name.
    pub host_match: &'static str,
    /// Human-readable platform label.
    pub label: &'static str,
    /// Whether input-activity heartbeats apply on this provider.
    pub tracks_activity: bool,
}

/// Registry of host documents eligible for platform labeling and, where
/// marked, activity-heartbeat tracking. Immutable, process-wide.
pub const TRACKED_PROVIDERS: &[Provider] = &[
    Provider {
        host_match: "gemini.google.com",
        label: "Google Gemini",
        tracks_activity: false,
    },
    Provider {
        host_match: "chatgpt.com",
        label: "ChatGPT",
        tracks_activity: true,
    },
    Provider {
        host_match: "chat.openai.com",
        label: "ChatGPT",
        tracks_activity: true,
    },
];

fn provider_for(hostname: &str) -> Option<&'static Provider> {
    TRACKED_PROVIDERS
        .iter()
        .find(|provider| hostname.contains(provider.host_match))
}

/// Platform label for a host: the registry label when the host matches a
/// tracked provider, otherwise the hostname itself.
pub fn provider_label(hostname: &str) -> String {
    provider_for(hostname)
        .map(|provider| provider.label.to_string())
        .unwrap_or_else(|| hostname.to_string())
}

#[must_use]
pub fn is_tracked_provider(hostname: &str) -> bool {
    provider_for(hostname).is_some()
}

/// Whether the host registers input listeners for activity tracking at all.
/// Narrower than [`is_tracked_provider`]: only some providers opt in.
#[must_use]
pub fn is_activity_host(hostname: &str) -> bool {
    provider_for(hostname).is_some_and(|provider| provider.tracks_activity)
}

/// Derived metadata shared by every log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryMeta {
    pub platform: String,
    pub date: String,
    pub time: String,
}

impl EntryMeta {
    /// Builds metadata for an entry created now, stamped with the current
    /// local date and time in the log's human-readable formats
    /// (`Aug 28, 2026` / `01:23:45 PM`).
    pub fn now(platform: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            platform: platform.into(),
            date: now.format("%b %-d, %Y").to_string(),
            time: now.format("%I:%M:%S %p").to_string(),
        }
    }
}

/// Optional severity tag attached to keyword entries by external classifiers.
/// The core never produces one; it only compares them for dedup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToxicityTag {
    #[serde(default)]
    pub label: String,
}

/// One event in the bounded log.
///
/// Serialized flat with a `type` tag so the persisted layout matches the
/// log's storage schema: `{"type":"keyword","keywords":[...],"platform":...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    Keyword {
        /// Distinct matched terms, first-occurrence order, display casing.
        keywords: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        toxicity: Option<ToxicityTag>,
        #[serde(flatten)]
        meta: EntryMeta,
    },
    System {
        text: String,
        #[serde(flatten)]
        meta: EntryMeta,
    },
}

impl LogEntry {
    #[must_use]
    pub fn meta(&self) -> &EntryMeta {
        match self {
            LogEntry::Keyword { meta, .. } | LogEntry::System { meta, .. } => meta,
        }
    }

    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            LogEntry::Keyword { .. } => "keyword",
            LogEntry::System { .. } => "system",
        }
    }

    /// Short human-readable payload summary, as the console sink prints it.
    #[must_use]
    pub fn details(&self) -> String {
        match self {
            LogEntry::Keyword { keywords, .. } => keywords.join(", "),
            LogEntry::System { text, .. } => text.clone(),
        }
    }
}

/// Single most-recent "user is active" record. Overwritten, never appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityRecord {
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
    pub platform: String,
}

/// Fire-and-forget notification delivered to the external sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "entry", rename_all = "kebab-case")]
pub enum SinkEvent {
    LogEntry(LogEntry),
    Activity(ActivityRecord),
}
