//! Real-time server for referee decision lights.
//!
//! Referee, jury, and display clients connect over WebSocket; every state
//! change of the shared [`referee_lights::LiftService`] is pushed to all of
//! them. See [`api`] for the endpoints.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
