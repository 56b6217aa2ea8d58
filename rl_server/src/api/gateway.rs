//! Real-time gateway between WebSocket clients and the lift service.
//!
//! The gateway owns the connection registry, validates every inbound
//! message before it reaches the service, and fans each state snapshot out
//! to all registered connections.
//!
//! Lock order is always service first, then registry: the broadcast
//! listener runs while the service holds its machine lock and takes a read
//! lock on the registry.
//!
//! A connection whose outbound queue is full is evicted rather than left
//! holding a stale view. The broadcast only signals its `closing` handle;
//! the socket loop then calls [`LiftGateway::disconnect`] outside any lock.

use log::{debug, info, warn};
use referee_lights::{
    Decision, LiftService, LiftSnapshot, Position, SubscriptionId,
    messages::{Ack, ClientEvent, ClientMessage, ServerMessage},
    net::ParseClientEventError,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock},
};
use tokio::sync::{
    Notify,
    mpsc::{self, error::TrySendError},
};
use uuid::Uuid;

use super::{auth, errors::ValidationError};
use crate::metrics;

/// Identity of one accepted connection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue feeding one connection's socket.
#[derive(Clone, Debug)]
struct Outbox {
    sender: mpsc::Sender<String>,
    /// Signalled once the queue overflows.
    closing: Arc<Notify>,
}

#[derive(Debug)]
struct ClientRecord {
    /// Seat claimed by `join`, if any. Observers never hold one.
    position: Option<Position>,
    outbox: Outbox,
}

type Registry = Arc<RwLock<HashMap<ConnectionId, ClientRecord>>>;

/// Gateway shared by every WebSocket connection.
#[derive(Debug)]
pub struct LiftGateway {
    service: Arc<LiftService>,
    clients: Registry,
    auth_token: Option<String>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl LiftGateway {
    /// Create the gateway and subscribe it to `service`.
    ///
    /// `auth_token` is the shared secret required from every connection;
    /// `None` accepts all connections.
    pub fn new(service: Arc<LiftService>, auth_token: Option<String>) -> Arc<Self> {
        let clients: Registry = Arc::default();
        let registry = Arc::clone(&clients);
        let subscription = service.subscribe(move |snapshot| broadcast(&registry, snapshot));

        Arc::new(Self {
            service,
            clients,
            auth_token,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    #[must_use]
    pub fn service(&self) -> &LiftService {
        &self.service
    }

    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Check a presented credential against the configured token.
    #[must_use]
    pub fn authorize(&self, credential: Option<&str>) -> bool {
        match &self.auth_token {
            None => true,
            Some(expected) => {
                credential.is_some_and(|presented| auth::token_matches(expected, presented))
            }
        }
    }

    /// Register an accepted connection. It receives every broadcast from now on.
    ///
    /// The returned handle is notified when `outbound` overflows. The caller
    /// must then stop serving the connection and call [`Self::disconnect`].
    pub fn connect(&self, id: ConnectionId, outbound: mpsc::Sender<String>) -> Arc<Notify> {
        let closing = Arc::new(Notify::new());
        let count = {
            let mut clients = write(&self.clients);
            clients.insert(
                id,
                ClientRecord {
                    position: None,
                    outbox: Outbox {
                        sender: outbound,
                        closing: Arc::clone(&closing),
                    },
                },
            );
            clients.len()
        };

        metrics::websocket_connections_total();
        metrics::websocket_connections_active(count);
        info!("Client connected: {id}");
        closing
    }

    /// Drop a connection and release the seat it held.
    pub fn disconnect(&self, id: ConnectionId) {
        let (record, count) = {
            let mut clients = write(&self.clients);
            let record = clients.remove(&id);
            (record, clients.len())
        };

        metrics::websocket_connections_active(count);

        let Some(record) = record else {
            return;
        };

        if let Some(position) = record.position {
            self.service.referee_disconnected(position);
            info!("Client disconnected: {id} ({position})");
        } else {
            info!("Client disconnected: {id}");
        }
    }

    /// Handle one text frame from `id` and produce its acknowledgement.
    pub fn handle_text(&self, id: ConnectionId, text: &str) -> Ack {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Malformed message from {id}: {e}");
                return self.reject(id, &ValidationError::InvalidFormat, None);
            }
        };

        match self.dispatch(id, &message) {
            Ok(()) => Ack::success().with_id(message.id),
            Err(e) => self.reject(id, &e, message.id),
        }
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        read(&self.clients).len()
    }

    /// Release the service subscription. Safe to call more than once.
    pub fn shutdown(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(subscription) = subscription {
            self.service.unsubscribe(subscription);
            info!("Gateway unsubscribed from lift service");
        }
    }

    fn dispatch(&self, id: ConnectionId, message: &ClientMessage) -> Result<(), ValidationError> {
        let event: ClientEvent = message
            .event
            .parse()
            .map_err(|e: ParseClientEventError| ValidationError::UnknownEvent(e.0))?;

        metrics::websocket_messages_received(event.as_str());

        match event {
            ClientEvent::Join => {
                let position = text(message.position(), ValidationError::InvalidPosition)?
                    .filter(|position| !position.is_empty())
                    .map(parse_position)
                    .transpose()?;
                self.join(id, position);
            }
            ClientEvent::Decision => {
                let position = required_position(message)?;
                let decision = required_decision(message)?;
                self.service.make_decision(position, decision);
            }
            ClientEvent::ResetRefereeDecision => {
                let position = required_position(message)?;
                self.service.reset_referee_decision(position);
            }
            ClientEvent::JuryOverrule => {
                let decision = required_decision(message)?;
                self.service.jury_overrule(decision);
            }
            ClientEvent::RevealDecisions => self.service.reveal_decisions(),
            ClientEvent::ResetAll => self.service.reset_all(),
            ClientEvent::ClearJuryOverrule => self.service.clear_jury_overrule(),
        }

        Ok(())
    }

    fn join(&self, id: ConnectionId, position: Option<Position>) {
        let (previous, outbox) = {
            let mut clients = write(&self.clients);
            let Some(record) = clients.get_mut(&id) else {
                warn!("Join from unregistered connection {id}");
                return;
            };
            let previous = std::mem::replace(&mut record.position, position);
            (previous, record.outbox.clone())
        };

        if let Some(previous) = previous.filter(|previous| Some(*previous) != position) {
            self.service.referee_disconnected(previous);
        }

        // Push under the service lock so no newer broadcast can overtake it.
        self.service.with_state(|snapshot| send_snapshot(id, &outbox, &snapshot));

        match position {
            Some(position) => {
                info!("Client {id} joined as {position}");
                self.service.referee_connected(position);
            }
            None => info!("Client {id} joined as observer"),
        }
    }

    fn reject(&self, id: ConnectionId, error: &ValidationError, message_id: Option<u64>) -> Ack {
        metrics::validation_failures_total(error.kind());
        debug!("Rejected message from {id}: {error}");
        Ack::failure(error.to_string()).with_id(message_id)
    }
}

fn parse_position(raw: &str) -> Result<Position, ValidationError> {
    raw.parse().map_err(|_| ValidationError::InvalidPosition)
}

/// Read an optional payload field that must be a string when present.
fn text(value: Option<&Value>, error: ValidationError) -> Result<Option<&str>, ValidationError> {
    value.map(|value| value.as_str().ok_or(error)).transpose()
}

fn required_position(message: &ClientMessage) -> Result<Position, ValidationError> {
    text(message.position(), ValidationError::InvalidPosition)?
        .ok_or(ValidationError::InvalidPosition)
        .and_then(parse_position)
}

fn required_decision(message: &ClientMessage) -> Result<Decision, ValidationError> {
    text(message.decision(), ValidationError::InvalidDecision)?
        .ok_or(ValidationError::InvalidDecision)?
        .parse()
        .map_err(|_| ValidationError::InvalidDecision)
}

fn encode(snapshot: &LiftSnapshot) -> Option<String> {
    serde_json::to_string(&ServerMessage::from(snapshot))
        .inspect_err(|e| warn!("Failed to serialize state update: {e}"))
        .ok()
}

fn send_snapshot(id: ConnectionId, outbox: &Outbox, snapshot: &LiftSnapshot) {
    if let Some(json) = encode(snapshot) {
        deliver(id, outbox, json);
    }
}

fn deliver(id: ConnectionId, outbox: &Outbox, json: String) {
    match outbox.sender.try_send(json) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!("Outbound queue full for {id}, evicting connection");
            outbox.closing.notify_one();
        }
        // Receiver gone; `disconnect` cleans the record up.
        Err(TrySendError::Closed(_)) => {}
    }
}

/// Serialize once and push to every registered connection.
fn broadcast(clients: &RwLock<HashMap<ConnectionId, ClientRecord>>, snapshot: &LiftSnapshot) {
    metrics::lift_snapshots_total(snapshot.state.as_str());

    let Some(json) = encode(snapshot) else {
        return;
    };

    let clients = read(clients);
    debug!(
        "State changed: {}, decisions: {} ({} clients)",
        snapshot.state,
        snapshot.context.decisions.len(),
        clients.len()
    );

    for (&id, record) in clients.iter() {
        deliver(id, &record.outbox, json.clone());
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
