//! Error taxonomy (C2)
//!
//! A tagged sum of every way a pipeline attempt can fail, with a bounded
//! cause chain (at most 25 deep — traversal must terminate even if a
//! `source()` cycle somehow formed).
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use std::fmt;
use thiserror::Error;

/// Maximum depth walked when rendering a cause chain.
pub const MAX_CAUSE_DEPTH: usize = 25;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("node reverted: {0}")]
    NodeReverted(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("fee cap too low: {0}")]
    FeeCapTooLow(String),

    #[error("user rejected: {0}")]
    UserRejected(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("compose error: {0}")]
    Compose(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no route: {0}")]
    NoRoute(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SolverError {
    pub fn transport(msg: impl Into<String>) -> Self {
        SolverError::Transport(msg.into())
    }
    pub fn timeout(msg: impl Into<String>) -> Self {
        SolverError::Timeout(msg.into())
    }
    pub fn node_reverted(msg: impl Into<String>) -> Self {
        SolverError::NodeReverted(msg.into())
    }
    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        SolverError::InsufficientFunds(msg.into())
    }
    pub fn fee_cap_too_low(msg: impl Into<String>) -> Self {
        SolverError::FeeCapTooLow(msg.into())
    }
    pub fn user_rejected(msg: impl Into<String>) -> Self {
        SolverError::UserRejected(msg.into())
    }
    pub fn decode(msg: impl Into<String>) -> Self {
        SolverError::Decode(msg.into())
    }
    pub fn compose(msg: impl Into<String>) -> Self {
        SolverError::Compose(msg.into())
    }
    pub fn parse(msg: impl Into<String>) -> Self {
        SolverError::Parse(msg.into())
    }
    pub fn no_route(msg: impl Into<String>) -> Self {
        SolverError::NoRoute(msg.into())
    }
    pub fn fetch(msg: impl Into<String>) -> Self {
        SolverError::Fetch(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        SolverError::Internal(msg.into())
    }

    /// Whether the node itself produced this error, as opposed to a
    /// transport-level failure (used for the `noneNodeError` telemetry flag).
    pub fn contains_node_error(&self) -> bool {
        matches!(
            self,
            SolverError::NodeReverted(_)
                | SolverError::InsufficientFunds(_)
                | SolverError::FeeCapTooLow(_)
        )
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

/// A single link in an error cause chain, produced for telemetry snapshots.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CauseLink {
    pub message: String,
}

/// Render up to `MAX_CAUSE_DEPTH` links of a `std::error::Error` cause chain.
/// Guaranteed to terminate even on a pathological chain.
pub fn cause_chain(err: &(dyn std::error::Error + 'static)) -> Vec<CauseLink> {
    let mut chain = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    let mut depth = 0;
    while let Some(e) = current {
        if depth >= MAX_CAUSE_DEPTH {
            break;
        }
        chain.push(CauseLink {
            message: e.to_string(),
        });
        current = e.source();
        depth += 1;
    }
    chain
}

impl fmt::Display for CauseLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct Chained {
        msg: String,
        inner: Option<Box<Chained>>,
    }

    impl fmt::Display for Chained {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.msg)
        }
    }

    impl StdError for Chained {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.inner.as_deref().map(|e| e as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_cause_chain_terminates_on_long_chain() {
        let mut top = Chained {
            msg: "root".to_string(),
            inner: None,
        };
        for i in 0..100 {
            top = Chained {
                msg: format!("layer {}", i),
                inner: Some(Box::new(top)),
            };
        }
        let chain = cause_chain(&top);
        assert_eq!(chain.len(), MAX_CAUSE_DEPTH);
    }

    #[test]
    fn test_contains_node_error() {
        assert!(SolverError::node_reverted("x").contains_node_error());
        assert!(SolverError::insufficient_funds("x").contains_node_error());
        assert!(!SolverError::transport("x").contains_node_error());
        assert!(!SolverError::timeout("x").contains_node_error());
    }
}
