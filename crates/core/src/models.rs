use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator placed between location identifiers when a route is built.
pub const ROUTE_SEPARATOR: &str = " to ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentTag(String);

impl IntentTag {
    pub const AIRLINE: &'static str = "airline";
    pub const RECOMMENDED_AIRLINES: &'static str = "recommended_airlines";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tags whose replies are produced by dedicated handlers rather than the intent bank.
    pub fn is_bespoke(&self) -> bool {
        self.0 == Self::AIRLINE || self.0 == Self::RECOMMENDED_AIRLINES
    }
}

impl fmt::Display for IntentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntentTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentExample {
    pub utterance: String,
    pub tag: IntentTag,
}

impl IntentExample {
    pub fn new(utterance: impl Into<String>, tag: impl Into<IntentTag>) -> Self {
        Self {
            utterance: utterance.into(),
            tag: tag.into(),
        }
    }
}

/// Ordered chain of location identifiers joined by [`ROUTE_SEPARATOR`].
///
/// An empty route means nothing was recognised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_locations<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts = locations
            .into_iter()
            .map(|location| location.as_ref().trim().to_string())
            .filter(|location| !location.is_empty())
            .collect::<Vec<_>>();
        Self(parts.join(ROUTE_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Whitespace-delimited words of the route, separator word included.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Route {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Airline names in first-seen order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AirlineSet(Vec<String>);

impl AirlineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the airline was already present.
    pub fn insert(&mut self, airline: impl Into<String>) -> bool {
        let airline = airline.into();
        if self.contains(&airline) {
            return false;
        }
        self.0.push(airline);
        true
    }

    pub fn contains(&self, airline: &str) -> bool {
        self.0.iter().any(|known| known == airline)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for AirlineSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();
        for airline in iter {
            set.insert(airline);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlineRow {
    #[serde(rename = "Route", default)]
    pub route: String,
    #[serde(rename = "Airline", default)]
    pub airline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRow {
    #[serde(rename = "Route", default)]
    pub route: String,
    #[serde(rename = "Airline", default)]
    pub airline: String,
    pub sentiment_score: f64,
}

/// Per-session memory carried from one turn to the next.
///
/// Only the dialogue controller writes it: `route` and `airlines` are set
/// together after a successful airline lookup, and a fresh lookup overwrites
/// both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub route: Option<Route>,
    pub airlines: Option<AirlineSet>,
    pub last_tag: Option<IntentTag>,
}

impl ConversationState {
    /// Route and airlines remembered from an earlier turn, if both are usable.
    pub fn known_route_and_airlines(&self) -> Option<(&Route, &AirlineSet)> {
        match (&self.route, &self.airlines) {
            (Some(route), Some(airlines)) if !route.is_empty() && !airlines.is_empty() => {
                Some((route, airlines))
            }
            _ => None,
        }
    }

    pub fn record_airline_match(&mut self, route: Route, airlines: AirlineSet, tag: IntentTag) {
        self.route = Some(route);
        self.airlines = Some(airlines);
        self.last_tag = Some(tag);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub response: String,
    pub state: ConversationState,
    pub tag: Option<IntentTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub at: DateTime<Utc>,
    pub user_text: String,
    pub assistant_text: String,
    pub tag: Option<IntentTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub state: ConversationState,
    pub expires_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub session_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub message: String,
    pub tag: Option<IntentTag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_joins_locations_with_separator() {
        let route = Route::from_locations(["SYD", " MEL "]);
        assert_eq!(route.as_str(), "SYD to MEL");
        assert_eq!(route.tokens().collect::<Vec<_>>(), vec!["SYD", "to", "MEL"]);
        assert!(Route::from_locations(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn airline_set_keeps_first_seen_order() {
        let set: AirlineSet = ["Qantas", "Jetstar", "Qantas", "Virgin"].into_iter().collect();
        assert_eq!(set.as_slice(), ["Qantas", "Jetstar", "Virgin"]);
    }

    #[test]
    fn known_route_requires_both_fields() {
        let mut state = ConversationState::default();
        assert!(state.known_route_and_airlines().is_none());

        state.route = Some(Route::from("SYD to LAX"));
        assert!(state.known_route_and_airlines().is_none());

        state.airlines = Some(["Qantas"].into_iter().collect());
        assert!(state.known_route_and_airlines().is_some());
    }
}
