//! # Referee Lights
//!
//! Decision lights for refereed strength-sport competitions.
//!
//! Up to three referees (left, chief, right) independently submit a verdict
//! on a lift. Once every verdict is in, the verdicts are revealed together on
//! a public display. A jury can overrule the outcome at any time.
//!
//! ## Architecture
//!
//! The lift is modelled as a finite state machine with five states:
//!
//! - **awaitingDecisions**: No verdicts recorded yet
//! - **collectingDecisions**: One or two verdicts recorded
//! - **readyToReveal**: All three verdicts recorded, lights still hidden
//! - **revealingDecisions**: Lights shown on the display
//! - **juryOverrule**: The jury's verdict supersedes the referees
//!
//! ## Core Modules
//!
//! - [`lift`]: State machine, service facade, and domain types
//! - [`net`]: JSON wire protocol for real-time clients
//!
//! ## Example
//!
//! ```
//! use referee_lights::{Decision, LiftService, LiftState, Position};
//!
//! let service = LiftService::new();
//! service.make_decision(Position::Left, Decision::White);
//! service.make_decision(Position::Chief, Decision::White);
//! service.make_decision(Position::Right, Decision::Red);
//! assert_eq!(service.get_state().state, LiftState::ReadyToReveal);
//!
//! service.reveal_decisions();
//! assert_eq!(service.get_state().state, LiftState::RevealingDecisions);
//! ```

/// Lift lifecycle: state machine, service, and domain types.
pub mod lift;
pub use lift::{
    Decision, JuryOverrule, LiftContext, LiftEvent, LiftService, LiftSnapshot, LiftState,
    LiftStateMachine, Position, SubscriptionId,
};

/// Networking components for the real-time protocol.
pub mod net;
pub use net::messages;
