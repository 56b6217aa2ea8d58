//! Referee decision lifecycle for a single lift.
//!
//! This module provides:
//! - Seat and decision tokens shared with every client
//! - A synchronous state machine enforcing the decision lifecycle
//! - A thread-safe service facade with publish/subscribe notifications

pub mod constants;
pub mod errors;
pub mod machine;
pub mod service;
pub mod types;

pub use constants::{ALL_DECISIONS, ALL_POSITIONS, Decision, Position, REQUIRED_REFEREE_COUNT};
pub use errors::{ParseDecisionError, ParsePositionError};
pub use machine::{LiftStateMachine, Listener, SubscriptionId};
pub use service::LiftService;
pub use types::{JuryOverrule, LiftContext, LiftEvent, LiftSnapshot, LiftState};
