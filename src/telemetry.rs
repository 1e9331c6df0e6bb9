//! Telemetry: span-attribute accumulation and terminal pair-attempt
//! outcomes (§4.6, §7).
//!
//! Mirrors the teacher's `info!`/`debug!`/`warn!` density pattern: heavy
//! in hot paths (`selector.rs`), sparse in plumbing.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, U256};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{cause_chain, CauseLink, SolverError};

/// Accumulates attributes across a single pair-attempt pipeline; forwarded
/// to `tracing` on completion regardless of outcome.
#[derive(Debug, Default, Clone)]
pub struct SpanAttributes {
    map: Map<String, Value>,
}

impl SpanAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.map.insert(key.to_string(), value.into());
    }

    pub fn set_duration(&mut self, key_prefix: &str, duration: Duration) {
        self.set(&format!("duration.{key_prefix}"), duration.as_secs_f64());
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.map)
    }
}

/// A simple stopwatch used to time each pipeline stage for span attributes.
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Terminal state of one `process_order` attempt (§4.6/§7).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum PairOutcome {
    FoundOpportunity { tx_hash: String, income: HashMap<Address, U256> },
    ZeroOutput,
    NoOpportunity,
    FailedToQuote { reason: String },
    FailedToUpdatePools { reason: String },
    FailedToGetPools { reason: String },
    FailedToGetEthPrice { reason: String },
    TxFailed { classification: TxFailureKind },
}

#[derive(Debug, Clone, Serialize)]
pub enum TxFailureKind {
    Reverted { reason: String, frontrun_by: Option<String> },
    Timeout,
}

/// The full telemetry record emitted for one pair attempt.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    pub outcome: PairOutcome,
    pub end_time_unix: u64,
    pub span_attributes: Value,
    pub error_chain: Vec<CauseLink>,
    pub none_node_error: bool,
}

/// Build the final telemetry record for a pair attempt, deriving
/// `none_node_error` from the §7 `contains_node_error` classification.
pub fn finalize(
    outcome: PairOutcome,
    end_time_unix: u64,
    attributes: SpanAttributes,
    error: Option<&SolverError>,
) -> OutcomeRecord {
    let error_chain = error.map(|e| cause_chain(e)).unwrap_or_default();
    let none_node_error = match error {
        Some(e) => !e.contains_node_error(),
        None => true,
    };

    OutcomeRecord {
        outcome,
        end_time_unix,
        span_attributes: attributes.into_json(),
        error_chain,
        none_node_error,
    }
}
