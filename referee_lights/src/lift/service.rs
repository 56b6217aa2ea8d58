//! Service layer that owns the lift state machine.
//!
//! Exposes one verb per domain action so callers never build [`LiftEvent`]s
//! themselves. Every verb runs the transition and the subscriber
//! notification under a single lock, so no caller can observe a partially
//! applied transition.

use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    constants::{Decision, Position},
    machine::{LiftStateMachine, SubscriptionId},
    types::{LiftEvent, LiftSnapshot},
};

/// Thread-safe facade over a single [`LiftStateMachine`].
///
/// Listeners run while the machine lock is held and must not call back into
/// the service.
#[derive(Debug, Default)]
pub struct LiftService {
    machine: Mutex<LiftStateMachine>,
}

impl LiftService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to state changes.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&LiftSnapshot) + Send + 'static,
    {
        self.lock().subscribe(listener)
    }

    /// Release a subscription. Safe to call more than once.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().unsubscribe(id)
    }

    /// Current state snapshot.
    #[must_use]
    pub fn get_state(&self) -> LiftSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` with the current snapshot while no transition can interleave.
    pub fn with_state<R>(&self, f: impl FnOnce(LiftSnapshot) -> R) -> R {
        let machine = self.lock();
        f(machine.snapshot())
    }

    /// Record a referee's decision.
    pub fn make_decision(&self, position: Position, decision: Decision) {
        self.send(LiftEvent::Decision { position, decision });
    }

    /// Allow a referee to retract their decision.
    pub fn reset_referee_decision(&self, position: Position) {
        self.send(LiftEvent::ResetRefereeDecision { position });
    }

    /// Show the lights once all decisions are in.
    pub fn reveal_decisions(&self) {
        self.send(LiftEvent::RevealDecisions);
    }

    /// Clear all decisions for the next lift.
    pub fn reset_all(&self) {
        self.send(LiftEvent::ResetAll);
    }

    pub fn jury_overrule(&self, decision: Decision) {
        self.send(LiftEvent::JuryOverrule { decision });
    }

    pub fn clear_jury_overrule(&self) {
        self.send(LiftEvent::ClearJuryOverrule);
    }

    pub fn referee_connected(&self, position: Position) {
        self.send(LiftEvent::RefereeConnected { position });
    }

    pub fn referee_disconnected(&self, position: Position) {
        self.send(LiftEvent::RefereeDisconnected { position });
    }

    fn send(&self, event: LiftEvent) {
        debug!("Lift event: {event}");
        self.lock().send(event);
    }

    fn lock(&self) -> MutexGuard<'_, LiftStateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
