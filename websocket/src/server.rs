//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/ws` and allows clients to subscribe
//! to registry event topics (sessions, votes, results). Events are delivered
//! via broadcast channels and filtered per-client by session id.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use ballot_registry::RegistryEvent;
use ballot_types::Clock;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::subscriptions::{
    ClientMessage, ClientSubscriptions, ServerMessage, SubscriptionEvent, SubscriptionFilter,
    SubscriptionTopic,
};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state for the WebSocket server, holding one broadcast channel
/// per event topic.
pub struct WsState {
    pub sessions_tx: broadcast::Sender<String>,
    pub votes_tx: broadcast::Sender<String>,
    pub results_tx: broadcast::Sender<String>,
    /// Stamps event envelopes; the registry's own clock.
    clock: Arc<dyn Clock>,
}

impl WsState {
    /// Create a new `WsState` with the given channel capacity for each topic.
    /// A capacity of 0 is raised to 1.
    pub fn new(channel_capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = channel_capacity.max(1);
        let (sessions_tx, _) = broadcast::channel(capacity);
        let (votes_tx, _) = broadcast::channel(capacity);
        let (results_tx, _) = broadcast::channel(capacity);

        Self {
            sessions_tx,
            votes_tx,
            results_tx,
            clock,
        }
    }

    /// Get the broadcast sender for a given topic.
    pub fn sender_for(&self, topic: &SubscriptionTopic) -> &broadcast::Sender<String> {
        match topic {
            SubscriptionTopic::Sessions => &self.sessions_tx,
            SubscriptionTopic::Votes => &self.votes_tx,
            SubscriptionTopic::Results => &self.results_tx,
        }
    }

    /// Topic a registry event is published under.
    pub fn topic_of(event: &RegistryEvent) -> SubscriptionTopic {
        match event {
            RegistryEvent::SessionCreated { .. } => SubscriptionTopic::Sessions,
            RegistryEvent::VoteCast { .. } => SubscriptionTopic::Votes,
            RegistryEvent::ResultsCalculated { .. } => SubscriptionTopic::Results,
        }
    }

    /// Publish a registry event to its topic. Fire-and-forget: with no
    /// subscribers the event is dropped.
    pub fn publish(&self, event: &RegistryEvent) {
        let topic = Self::topic_of(event);
        let data = match serde_json::to_value(event) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to encode {} event: {}", topic, e);
                return;
            }
        };
        let envelope = SubscriptionEvent {
            topic,
            data,
            timestamp: self.clock.now().as_secs(),
        };
        match serde_json::to_string(&envelope) {
            Ok(text) => {
                let _ = self.sender_for(&topic).send(text);
            }
            Err(e) => warn!("failed to encode {} envelope: {}", topic, e),
        }
    }
}

/// The WebSocket server, configured with a port and shared state.
pub struct WebSocketServer {
    pub port: u16,
    pub state: Arc<WsState>,
}

impl WebSocketServer {
    /// Create a new server with the provided shared state.
    pub fn with_state(port: u16, state: Arc<WsState>) -> Self {
        Self { port, state }
    }

    pub fn router(state: Arc<WsState>) -> Router {
        Router::new().route("/ws", get(ws_handler)).with_state(state)
    }

    /// Start listening for WebSocket connections. This runs until the server
    /// is shut down.
    pub async fn start(&self) -> Result<(), WsError> {
        let app = Self::router(Arc::clone(&self.state));
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| WsError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("WebSocket server listening on {}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
///
/// The flow:
/// 1. Split the socket into sender and receiver halves.
/// 2. Listen for client messages (subscribe, unsubscribe, ping).
/// 3. For each active subscription, spawn a forwarder task that reads from
///    the topic broadcast channel and sends matching events to the client.
/// 4. Abort all forwarder tasks when the client disconnects.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(ws_sender));

    let mut client_subs = ClientSubscriptions::new();
    let mut forwarders: HashMap<SubscriptionTopic, JoinHandle<()>> = HashMap::new();

    debug!("New WebSocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_text_message(&text, &state, &mut client_subs, &mut forwarders, &ws_sender)
                    .await;
            }
            Message::Close(_) => {
                debug!("Client sent close frame");
                break;
            }
            Message::Ping(data) => {
                let mut sender = ws_sender.lock().await;
                let _ = sender.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    for (topic, handle) in forwarders.drain() {
        debug!("Aborting forwarder for topic: {}", topic);
        handle.abort();
    }
    debug!("WebSocket client disconnected");
}

async fn send_json<T: Serialize>(ws_sender: &WsSender, message: &T) {
    match serde_json::to_string(message) {
        Ok(text) => {
            let mut sender = ws_sender.lock().await;
            let _ = sender.send(Message::Text(text)).await;
        }
        Err(e) => warn!("failed to encode server message: {}", e),
    }
}

/// Process a text message from the client.
async fn handle_text_message(
    text: &str,
    state: &Arc<WsState>,
    client_subs: &mut ClientSubscriptions,
    forwarders: &mut HashMap<SubscriptionTopic, JoinHandle<()>>,
    ws_sender: &WsSender,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            let error = ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            };
            send_json(ws_sender, &error).await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Subscribe { topic, session_id } => {
            // Re-subscribing replaces the previous filter.
            if let Some(handle) = forwarders.remove(&topic) {
                handle.abort();
            }

            let filter = SubscriptionFilter { session_id };
            client_subs.subscribe(topic, filter.clone());

            let rx = state.sender_for(&topic).subscribe();
            let sender = Arc::clone(ws_sender);
            let handle = tokio::spawn(forward_events(rx, sender, topic, filter));
            forwarders.insert(topic, handle);

            let ack = ServerMessage::Ack {
                action: "subscribe".to_string(),
                topic,
            };
            send_json(ws_sender, &ack).await;
            debug!("Client subscribed to {}", topic);
        }
        ClientMessage::Unsubscribe { topic } => {
            let was_subscribed = client_subs.unsubscribe(&topic);
            if let Some(handle) = forwarders.remove(&topic) {
                handle.abort();
            }

            let reply = if was_subscribed {
                ServerMessage::Ack {
                    action: "unsubscribe".to_string(),
                    topic,
                }
            } else {
                ServerMessage::Error {
                    message: format!("Not subscribed to {}", topic),
                }
            };
            send_json(ws_sender, &reply).await;
            debug!("Client unsubscribed from {}", topic);
        }
        ClientMessage::Ping => {
            send_json(ws_sender, &ServerMessage::Pong).await;
        }
    }
}

/// Forwarder task: reads events from a broadcast receiver and sends matching
/// ones to the WebSocket client.
async fn forward_events(
    mut rx: broadcast::Receiver<String>,
    ws_sender: WsSender,
    topic: SubscriptionTopic,
    filter: SubscriptionFilter,
) {
    let mut matcher = ClientSubscriptions::new();
    matcher.subscribe(topic, filter);

    loop {
        match rx.recv().await {
            Ok(event_str) => {
                let should_send = match serde_json::from_str::<SubscriptionEvent>(&event_str) {
                    Ok(event) => matcher.matches_filter(&topic, &event),
                    Err(_) => false,
                };

                if should_send {
                    let mut sender = ws_sender.lock().await;
                    if sender.send(Message::Text(event_str)).await.is_err() {
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Client lagged behind by {} events on topic {}", n, topic);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Broadcast channel closed for topic {}", topic);
                break;
            }
        }
    }
}
