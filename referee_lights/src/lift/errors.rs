//! Error types for lift tokens

use thiserror::Error;

/// A string that is not one of the referee seat tokens.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown referee position: {0:?}")]
pub struct ParsePositionError(pub String);

/// A string that is not one of the decision tokens.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown decision: {0:?}")]
pub struct ParseDecisionError(pub String);
