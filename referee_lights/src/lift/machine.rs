//! Lift state machine.
//!
//! Pure, synchronous transition logic over an in-memory context. The machine
//! never fails: every event either applies cleanly or is ignored, and
//! subscribers are notified with a fresh snapshot after every event.
//!
//! Lifecycle:
//!
//! ```text
//! awaitingDecisions -> collectingDecisions -> readyToReveal -> revealingDecisions
//!         ^                                                          |
//!         +------------------------- resetAll -----------------------+
//!
//! any state --juryOverrule--> juryOverrule --clearJuryOverrule--> awaitingDecisions
//! ```

use log::trace;
use std::fmt;

use super::{
    constants::{Decision, Position, REQUIRED_REFEREE_COUNT},
    types::{JuryOverrule, LiftContext, LiftEvent, LiftSnapshot, LiftState},
};

/// Callback invoked with a snapshot after every event.
pub type Listener = Box<dyn FnMut(&LiftSnapshot) + Send>;

/// Handle returned by [`LiftStateMachine::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// State machine that manages the lifecycle of a single lift.
pub struct LiftStateMachine {
    state: LiftState,
    context: LiftContext,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    /// Millisecond clock used to stamp jury overrules.
    clock: fn() -> i64,
}

impl Default for LiftStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LiftStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiftStateMachine")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LiftStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(system_clock)
    }

    /// Create a machine that stamps overrules with `clock` instead of the
    /// system time.
    #[must_use]
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self {
            state: LiftState::AwaitingDecisions,
            context: LiftContext::default(),
            listeners: Vec::new(),
            next_subscription: 0,
            clock,
        }
    }

    /// Current state without copying the context.
    #[must_use]
    pub fn state(&self) -> LiftState {
        self.state
    }

    /// Returns a deep copy of the current state and context.
    #[must_use]
    pub fn snapshot(&self) -> LiftSnapshot {
        LiftSnapshot {
            state: self.state,
            context: LiftContext {
                decisions: self.context.decisions.clone(),
                connected_referees: self.context.connected_referees.clone(),
                jury_overrule: self.context.jury_overrule,
            },
        }
    }

    /// Register a listener that is called after every event.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&LiftSnapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Apply an event and notify every listener.
    pub fn send(&mut self, event: LiftEvent) {
        let previous = self.state;

        match event {
            LiftEvent::RefereeConnected { position } => {
                self.context.connected_referees.insert(position);
            }
            LiftEvent::RefereeDisconnected { position } => {
                self.context.connected_referees.remove(&position);
            }
            LiftEvent::Decision { position, decision } => self.on_decision(position, decision),
            LiftEvent::ResetRefereeDecision { position } => {
                self.on_reset_referee_decision(position);
            }
            LiftEvent::RevealDecisions => {
                if self.state == LiftState::ReadyToReveal {
                    self.state = LiftState::RevealingDecisions;
                }
            }
            LiftEvent::ResetAll => self.on_reset_all(),
            LiftEvent::JuryOverrule { decision } => {
                self.context.jury_overrule = Some(JuryOverrule {
                    decision,
                    timestamp: (self.clock)(),
                });
                self.state = LiftState::JuryOverrule;
            }
            LiftEvent::ClearJuryOverrule => self.on_clear_jury_overrule(),
        }

        trace!("{event}: {previous} -> {}", self.state);
        self.notify_listeners();
    }

    /// Blocked while the jury overrule is active.
    fn on_decision(&mut self, position: Position, decision: Decision) {
        if self.state == LiftState::JuryOverrule {
            return;
        }

        self.context.decisions.insert(position, decision);
        self.state = if self.all_decisions_made() {
            LiftState::ReadyToReveal
        } else {
            LiftState::CollectingDecisions
        };
    }

    /// A referee may retract only while decisions are still being collected.
    fn on_reset_referee_decision(&mut self, position: Position) {
        if matches!(
            self.state,
            LiftState::JuryOverrule | LiftState::ReadyToReveal | LiftState::RevealingDecisions
        ) {
            return;
        }

        self.context.decisions.remove(&position);
        if self.state == LiftState::CollectingDecisions && self.context.decisions.is_empty() {
            self.state = LiftState::AwaitingDecisions;
        }
    }

    fn on_reset_all(&mut self) {
        if self.state == LiftState::JuryOverrule {
            return;
        }

        self.context.decisions.clear();
        self.state = LiftState::AwaitingDecisions;
    }

    /// The only way out of `JuryOverrule`. Stale referee decisions are purged
    /// so they cannot leak into the next lift.
    fn on_clear_jury_overrule(&mut self) {
        self.context.jury_overrule = None;
        if self.state == LiftState::JuryOverrule {
            self.context.decisions.clear();
            self.state = LiftState::AwaitingDecisions;
        }
    }

    fn all_decisions_made(&self) -> bool {
        self.context.decisions.len() >= REQUIRED_REFEREE_COUNT
    }

    fn notify_listeners(&mut self) {
        if self.listeners.is_empty() {
            return;
        }

        let snapshot = self.snapshot();
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }
}
