//! Subscription management for WebSocket clients.

use std::collections::HashMap;
use std::fmt;

use ballot_types::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Available subscription topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTopic {
    /// Newly created sessions.
    Sessions,
    /// Accepted votes.
    Votes,
    /// Finalized session results.
    Results,
}

impl SubscriptionTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sessions => "sessions",
            Self::Votes => "votes",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for SubscriptionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional filter for subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionFilter {
    /// Only receive events for this session.
    pub session_id: Option<SessionId>,
}

/// Messages a client may send.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        topic: SubscriptionTopic,
        #[serde(default)]
        session_id: Option<SessionId>,
    },
    Unsubscribe {
        topic: SubscriptionTopic,
    },
    Ping,
}

/// Messages the server sends besides events.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack {
        action: String,
        topic: SubscriptionTopic,
    },
    Error {
        message: String,
    },
    Pong,
}

/// An event sent to subscribed clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub topic: SubscriptionTopic,
    pub data: Value,
    pub timestamp: u64,
}

impl SubscriptionEvent {
    /// Session the event concerns, read from its payload.
    pub fn session_id(&self) -> Option<SessionId> {
        self.data
            .get("session_id")
            .and_then(Value::as_u64)
            .map(SessionId::new)
    }
}

/// Per-connection subscription set.
#[derive(Debug, Default)]
pub struct ClientSubscriptions {
    topics: HashMap<SubscriptionTopic, SubscriptionFilter>,
}

impl ClientSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe (or replace the filter of an existing subscription).
    pub fn subscribe(&mut self, topic: SubscriptionTopic, filter: SubscriptionFilter) {
        self.topics.insert(topic, filter);
    }

    /// Returns whether the topic was subscribed.
    pub fn unsubscribe(&mut self, topic: &SubscriptionTopic) -> bool {
        self.topics.remove(topic).is_some()
    }

    pub fn is_subscribed(&self, topic: &SubscriptionTopic) -> bool {
        self.topics.contains_key(topic)
    }

    /// Whether `event` should be delivered under this client's filter for `topic`.
    pub fn matches_filter(&self, topic: &SubscriptionTopic, event: &SubscriptionEvent) -> bool {
        match self.topics.get(topic) {
            None => false,
            Some(SubscriptionFilter { session_id: None }) => true,
            Some(SubscriptionFilter {
                session_id: Some(wanted),
            }) => event.session_id() == Some(*wanted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vote_event(session: u64) -> SubscriptionEvent {
        SubscriptionEvent {
            topic: SubscriptionTopic::Votes,
            data: json!({"event": "vote_cast", "session_id": session, "candidate_index": 0}),
            timestamp: 0,
        }
    }

    #[test]
    fn unfiltered_subscription_matches_everything() {
        let mut subs = ClientSubscriptions::new();
        subs.subscribe(SubscriptionTopic::Votes, SubscriptionFilter::default());
        assert!(subs.matches_filter(&SubscriptionTopic::Votes, &vote_event(3)));
        assert!(!subs.matches_filter(&SubscriptionTopic::Results, &vote_event(3)));
    }

    #[test]
    fn session_filter_narrows_delivery() {
        let mut subs = ClientSubscriptions::new();
        subs.subscribe(
            SubscriptionTopic::Votes,
            SubscriptionFilter {
                session_id: Some(SessionId::new(2)),
            },
        );
        assert!(subs.matches_filter(&SubscriptionTopic::Votes, &vote_event(2)));
        assert!(!subs.matches_filter(&SubscriptionTopic::Votes, &vote_event(3)));
    }

    #[test]
    fn unsubscribe_reports_prior_state() {
        let mut subs = ClientSubscriptions::new();
        assert!(!subs.unsubscribe(&SubscriptionTopic::Sessions));
        subs.subscribe(SubscriptionTopic::Sessions, SubscriptionFilter::default());
        assert!(subs.is_subscribed(&SubscriptionTopic::Sessions));
        assert!(subs.unsubscribe(&SubscriptionTopic::Sessions));
    }

    #[test]
    fn client_messages_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"subscribe","topic":"results","session_id":4}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Subscribe {
                topic: SubscriptionTopic::Results,
                session_id: Some(id)
            } if id == SessionId::new(4)
        ));
        let msg: ClientMessage = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }
}
