//! Navigation state and the process-wide state channel
//!
//! Raw address-bar-equivalent input (`#table/realms`, `?id=1&name=x`) is parsed
//! into a `NavigationState` and broadcast on a `StateChannel`. Parsing never
//! fails: anything unrecognisable degrades to an empty context or query.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, SubscriptionId};

const PATH_SEPARATOR: char = '/';
const PARAM_SEPARATOR: char = '&';
const ASSIGNMENT: char = '=';

/// Context discriminator for a table listing
pub const CONTEXT_TABLE: &str = "table";
/// Context discriminator for a single record
pub const CONTEXT_RECORD: &str = "record";

/// Where the user is: `context` path segments plus `query` parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub context: Vec<String>,
    pub query: BTreeMap<String, String>,
}

impl NavigationState {
    /// First context segment (`table`, `record`, ...)
    pub fn discriminator(&self) -> Option<&str> {
        self.context.first().map(String::as_str)
    }

    /// Second context segment, naming the target table
    pub fn table_name(&self) -> Option<&str> {
        self.context.get(1).map(String::as_str)
    }

    pub fn is_table_view(&self) -> bool {
        self.discriminator() == Some(CONTEXT_TABLE)
    }

    pub fn is_record_view(&self) -> bool {
        self.discriminator() == Some(CONTEXT_RECORD)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// One raw navigation change: the fragment and the query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationEvent {
    pub hash: String,
    pub search: String,
}

impl NavigationEvent {
    pub fn new(hash: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            search: search.into(),
        }
    }

    /// Split a location tail such as `?id=1#record/members`
    ///
    /// The query string runs from `?` up to `#`; the fragment follows `#`.
    pub fn from_location(location: &str) -> Self {
        let (before_hash, hash) = match location.split_once('#') {
            Some((before, hash)) => (before, hash),
            None => (location, ""),
        };
        let search = match before_hash.split_once('?') {
            Some((_, search)) => search,
            None => "",
        };
        Self::new(hash, search)
    }
}

/// Parse a raw event into navigation state
pub fn parse_navigation(event: &NavigationEvent) -> NavigationState {
    NavigationState {
        context: parse_context(&event.hash),
        query: parse_query(&event.search),
    }
}

fn parse_context(hash: &str) -> Vec<String> {
    hash.trim_start_matches('#')
        .split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Later duplicate keys overwrite earlier ones; a value keeps any `=` after
/// the first
fn parse_query(search: &str) -> BTreeMap<String, String> {
    let mut query = BTreeMap::new();
    for param in search.trim_start_matches('?').split(PARAM_SEPARATOR) {
        let (key, value) = param.split_once(ASSIGNMENT).unwrap_or((param, ""));
        if key.is_empty() {
            continue;
        }
        query.insert(key.to_string(), value.to_string());
    }
    query
}

/// Process-wide reactive slot for the current navigation state
///
/// Exactly one publish per `navigate` call; events are never coalesced.
/// Subscribers receive a reference to a snapshot and never a live slot.
#[derive(Debug)]
pub struct StateChannel {
    channel: Channel<NavigationState>,
    current: Mutex<NavigationState>,
}

impl Default for StateChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StateChannel {
    pub fn new() -> Self {
        Self {
            channel: Channel::new("navigation"),
            current: Mutex::new(NavigationState::default()),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&NavigationState) + Send + Sync + 'static,
    {
        self.channel.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }

    /// Replace the current state wholesale and broadcast it
    pub fn publish(&self, state: NavigationState) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();
        self.channel.publish(&state);
    }

    /// Parse a raw navigation event and publish the result
    pub fn navigate(&self, event: &NavigationEvent) -> NavigationState {
        let state = parse_navigation(event);
        tracing::debug!(
            context = ?state.context,
            params = state.query.len(),
            "navigation event"
        );
        self.publish(state.clone());
        state
    }

    /// Snapshot of the last published state
    pub fn current(&self) -> NavigationState {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.channel.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_parse_table_context() {
        let state = parse_navigation(&NavigationEvent::new("#table/realms", ""));
        assert_eq!(state.context, vec!["table", "realms"]);
        assert!(state.is_table_view());
        assert_eq!(state.table_name(), Some("realms"));
        assert!(state.query.is_empty());
    }

    #[test]
    fn test_last_duplicate_key_wins() {
        let state = parse_navigation(&NavigationEvent::new("", "?a=1&b=2&a=3"));
        assert_eq!(state.param("a"), Some("3"));
        assert_eq!(state.param("b"), Some("2"));
        assert_eq!(state.query.len(), 2);
    }

    #[test]
    fn test_empty_input_yields_empty_state() {
        let state = parse_navigation(&NavigationEvent::default());
        assert_eq!(state, NavigationState::default());
    }

    #[test]
    fn test_malformed_input_degrades() {
        let state = parse_navigation(&NavigationEvent::new("///", "&&=x&flag&k=v=w"));
        assert!(state.context.is_empty());
        assert_eq!(state.param("flag"), Some(""));
        // only the first '=' separates key from value
        assert_eq!(state.param("k"), Some("v=w"));
        assert!(!state.query.contains_key(""));
    }

    #[test]
    fn test_from_location_splits_search_and_hash() {
        let event = NavigationEvent::from_location("?id=7&name=Ann#record/members");
        assert_eq!(event.hash, "record/members");
        assert_eq!(event.search, "id=7&name=Ann");

        let state = parse_navigation(&event);
        assert!(state.is_record_view());
        assert_eq!(state.param("id"), Some("7"));
    }

    #[test]
    fn test_navigate_publishes_once_per_event() {
        let channel = StateChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        channel.subscribe(move |state| {
            sink.lock()
                .unwrap()
                .push(state.table_name().unwrap_or_default().to_string())
        });

        channel.navigate(&NavigationEvent::new("table/a", ""));
        channel.navigate(&NavigationEvent::new("table/a", ""));
        channel.navigate(&NavigationEvent::new("table/b", ""));

        assert_eq!(*seen.lock().unwrap(), vec!["a", "a", "b"]);
        assert_eq!(channel.current().table_name(), Some("b"));
    }
}
