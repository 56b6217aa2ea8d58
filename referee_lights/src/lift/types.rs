//! Lift lifecycle states, context, snapshots, and events.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use super::constants::{Decision, Position};

/// Possible states in the lift lifecycle.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LiftState {
    #[default]
    AwaitingDecisions,
    CollectingDecisions,
    ReadyToReveal,
    RevealingDecisions,
    JuryOverrule,
}

impl LiftState {
    /// Wire name for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingDecisions => "awaitingDecisions",
            Self::CollectingDecisions => "collectingDecisions",
            Self::ReadyToReveal => "readyToReveal",
            Self::RevealingDecisions => "revealingDecisions",
            Self::JuryOverrule => "juryOverrule",
        }
    }
}

impl fmt::Display for LiftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authoritative jury verdict that supersedes the referees for display.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct JuryOverrule {
    pub decision: Decision,
    /// Milliseconds since the Unix epoch when the overrule was issued.
    pub timestamp: i64,
}

/// Context data maintained throughout the lift lifecycle.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LiftContext {
    /// At most one decision per seat.
    pub decisions: BTreeMap<Position, Decision>,
    /// Seats with a live connection. Presence only; never implies a decision.
    pub connected_referees: BTreeSet<Position>,
    pub jury_overrule: Option<JuryOverrule>,
}

/// Point-in-time copy of the machine's state and context.
///
/// A snapshot owns all of its collections. Mutating one never affects the
/// machine or any other snapshot.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LiftSnapshot {
    pub state: LiftState,
    pub context: LiftContext,
}

/// Every event the lift state machine understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LiftEvent {
    RefereeConnected { position: Position },
    RefereeDisconnected { position: Position },
    Decision { position: Position, decision: Decision },
    ResetRefereeDecision { position: Position },
    RevealDecisions,
    ResetAll,
    JuryOverrule { decision: Decision },
    ClearJuryOverrule,
}

impl fmt::Display for LiftEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefereeConnected { position } => write!(f, "REFEREE_CONNECTED({position})"),
            Self::RefereeDisconnected { position } => {
                write!(f, "REFEREE_DISCONNECTED({position})")
            }
            Self::Decision { position, decision } => {
                write!(f, "DECISION({position}, {decision})")
            }
            Self::ResetRefereeDecision { position } => {
                write!(f, "RESET_REFEREE_DECISION({position})")
            }
            Self::RevealDecisions => write!(f, "REVEAL_DECISIONS"),
            Self::ResetAll => write!(f, "RESET_ALL"),
            Self::JuryOverrule { decision } => write!(f, "JURY_OVERRULE({decision})"),
            Self::ClearJuryOverrule => write!(f, "CLEAR_JURY_OVERRULE"),
        }
    }
}
