//! Wire protocol shared by the server and its clients.
//!
//! Messages are JSON objects carried in WebSocket text frames.

pub mod errors;
/// Message types for client-server communication protocol.
pub mod messages;

pub use errors::ParseClientEventError;
