//! Realized income extraction from receipt logs (§4.7 "CLASSIFY").
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, U256};
use std::collections::HashMap;

/// A decoded ERC-20 `Transfer` log.
#[derive(Debug, Clone)]
pub struct TransferLog {
    pub token: Address,
    pub to: Address,
    pub value: U256,
}

/// A decoded orderbook `AfterClear` log.
#[derive(Debug, Clone)]
pub struct AfterClearLog {
    pub alice_output: U256,
}

/// Scan receipt logs for realized income: the first ERC-20 `Transfer` to
/// `signer` per token, or — for clear-against-self, where transfers land
/// on the orderbook rather than the signer — the `AfterClear` event's
/// `aliceOutput`.
pub fn extract_income(
    signer: Address,
    orderbook: Address,
    transfers: &[TransferLog],
    after_clear: Option<&AfterClearLog>,
) -> HashMap<Address, U256> {
    let mut income = HashMap::new();

    for transfer in transfers {
        if transfer.to == signer {
            income.entry(transfer.token).or_insert(transfer.value);
        }
    }

    if income.is_empty() {
        if let Some(clear) = after_clear {
            let _ = orderbook;
            income.insert(Address::ZERO, clear.alice_output);
        }
    }

    income
}
