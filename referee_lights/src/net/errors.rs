use thiserror::Error;

/// A string that is not one of the inbound event names.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown client event: {0:?}")]
pub struct ParseClientEventError(pub String);
