use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors returned by the yarr JSON API layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No API URL configured; no request is attempted.
    #[error("API not available")]
    Disabled,
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The server answered with `success: false`.
    #[error("{0}")]
    Rejected(String),
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Invalid API URL")]
    InvalidUrl,
}

// ============================================================================
// Identifiers
// ============================================================================

/// Primary key of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryPk(pub i64);

/// Primary key of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedPk(pub i64);

impl fmt::Display for EntryPk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for FeedPk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Join ids the way the server expects them in a query string: `1,2,3`.
pub fn join_pks<T: fmt::Display>(pks: &[T]) -> String {
    pks.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// Entry State and Ordering
// ============================================================================

/// Persisted state of an entry. Encoded on the wire as 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EntryState {
    Unread,
    Read,
    Saved,
}

impl EntryState {
    pub fn code(self) -> u8 {
        match self {
            EntryState::Unread => 0,
            EntryState::Read => 1,
            EntryState::Saved => 2,
        }
    }

    /// Parse the CLI spelling. `all` is represented by `None` at the call site.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unread" => Some(EntryState::Unread),
            "read" => Some(EntryState::Read),
            "saved" => Some(EntryState::Saved),
            _ => None,
        }
    }
}

impl TryFrom<u8> for EntryState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EntryState::Unread),
            1 => Ok(EntryState::Read),
            2 => Ok(EntryState::Saved),
            other => Err(format!("unknown entry state {}", other)),
        }
    }
}

impl From<EntryState> for u8 {
    fn from(state: EntryState) -> Self {
        state.code()
    }
}

/// Sort order of a view. The server sorts by entry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Desc,
    Asc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Desc => "desc",
            Order::Asc => "asc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Order::Desc => Order::Asc,
            Order::Asc => Order::Desc,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// A single entry as returned by `entry/get`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPayload {
    pub pk: EntryPk,
    pub feed: FeedPk,
    pub state: EntryState,
    /// Server-rendered markup for the entry.
    pub html: Arc<str>,
}

/// Result of `feed/pks`: the ordered ids of a view plus fresh unread counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPks {
    pub pks: Vec<EntryPk>,
    pub feed_unread: HashMap<FeedPk, i64>,
}

/// Result of `entry/set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateChange {
    /// Human readable confirmation from the server, e.g. "Marked as read".
    pub msg: String,
    pub feed_unread: HashMap<FeedPk, i64>,
}

/// Feed metadata from `feed/get`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedInfo {
    pub pk: FeedPk,
    pub title: String,
    pub unread: Option<i64>,
}

// ============================================================================
// Wire Types
// ============================================================================

/// Fields every API response carries.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntryWire {
    pub feed: FeedPk,
    pub state: EntryState,
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntriesWire {
    #[serde(default)]
    pub entries: HashMap<String, EntryWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedPksWire {
    #[serde(default)]
    pub pks: Vec<EntryPk>,
    #[serde(default)]
    pub feed_unread: HashMap<String, i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StateChangeWire {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub feed_unread: HashMap<String, i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedWire {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub count_unread: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedsWire {
    #[serde(default)]
    pub feeds: HashMap<String, FeedWire>,
}

/// JSON object keys are strings; feed pks that fail to parse are dropped.
pub(crate) fn feed_counts(raw: HashMap<String, i64>) -> HashMap<FeedPk, i64> {
    raw.into_iter()
        .filter_map(|(k, v)| match k.parse::<i64>() {
            Ok(pk) => Some((FeedPk(pk), v)),
            Err(_) => {
                tracing::debug!(key = %k, "Ignoring non-numeric feed pk in feed_unread");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_state_wire_codes() {
        assert_eq!(serde_json::to_string(&EntryState::Saved).unwrap(), "2");
        let state: EntryState = serde_json::from_str("0").unwrap();
        assert_eq!(state, EntryState::Unread);
        assert!(serde_json::from_str::<EntryState>("7").is_err());
    }

    #[test]
    fn test_join_pks() {
        assert_eq!(join_pks(&[EntryPk(3), EntryPk(1), EntryPk(2)]), "3,1,2");
        assert_eq!(join_pks::<EntryPk>(&[]), "");
    }

    #[test]
    fn test_feed_counts_skips_bad_keys() {
        let raw = HashMap::from([("4".to_string(), 2), ("x".to_string(), 9)]);
        let counts = feed_counts(raw);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&FeedPk(4)), Some(&2));
    }

    #[test]
    fn test_order_toggle() {
        assert_eq!(Order::default(), Order::Desc);
        assert_eq!(Order::Desc.toggled(), Order::Asc);
        assert_eq!(Order::Asc.as_str(), "asc");
    }
}
