//! Arbitrage solver for an on-chain order-book protocol.
//!
//! Watches open orders across one or more orderbook deployments, quotes
//! counterparty and external-liquidity trade routes for each, and clears
//! the best opportunity found when it covers its own gas in eth terms.
//!
//! Author: AI-Generated
//! Created: 2026-01-28

pub mod bounty;
pub mod config;
pub mod contracts;
pub mod downtime;
pub mod error;
pub mod fixed_point;
pub mod indexer;
pub mod model;
pub mod registry;
pub mod revert;
pub mod router;
pub mod selector;
pub mod signer;
pub mod telemetry;
pub mod tx;
pub mod worker;

pub use config::SolverConfig;
pub use error::{SolverError, SolverResult};
pub use fixed_point::Fp18;
pub use registry::OrderRegistry;
