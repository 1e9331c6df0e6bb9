//! Frontrun detection (§4.7.2).
//!
//! New logic, grounded on the "same block, other log, structural match"
//! shape already implied by the teacher's mempool cross-referencing in
//! `mempool/monitor.rs`'s confirmation tracker — generalized from "did
//! this pending tx land" to "did a lower-index tx front-run ours."
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{B256, TxHash};

/// A decoded `TakeOrder`/`Clear` log relevant to frontrun detection.
#[derive(Debug, Clone)]
pub struct CandidateLog {
    pub tx_hash: TxHash,
    pub transaction_index: u64,
    /// Hash of the order config this log decoded to, used for the
    /// "structurally equals" comparison instead of a full struct diff.
    pub order_config_hash: B256,
}

/// Inspect logs from the same block/orderbook for one that front-ran our
/// receipt: same block, lower transaction index, matching order config.
pub fn detect_frontrun(
    our_transaction_index: u64,
    our_order_config_hashes: &[B256],
    candidate_logs: &[CandidateLog],
) -> Option<TxHash> {
    candidate_logs
        .iter()
        .filter(|log| log.transaction_index < our_transaction_index)
        .find(|log| our_order_config_hashes.contains(&log.order_config_hash))
        .map(|log| log.tx_hash)
}
