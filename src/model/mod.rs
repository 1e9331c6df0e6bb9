//! Core data model (§3): Order, Vault, Pair, OwnerProfile, and the two
//! indices the registry serves reads from.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::fixed_point::Fp18;

/// Wire version of an order. Immutable for the order's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderVersion {
    V3,
    V4,
}

/// One input or output vault slot an order is willing to trade through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoEntry {
    pub token: Address,
    pub vault_id: B256,
    pub decimals: u8,
}

/// An immutable record published by an owner, identified by a stable hash.
///
/// Two wire versions coexist (v3 integer amounts, v4 32-byte fixed point);
/// the core treats them as a sum type and is version-aware only when
/// composing the final clearing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub hash: B256,
    pub owner: Address,
    pub orderbook: Address,
    pub version: OrderVersion,
    pub inputs: Vec<IoEntry>,
    pub outputs: Vec<IoEntry>,
    /// Opaque interpreter/store/bytecode bundle — never evaluated off-chain.
    pub evaluable: Evaluable,
    pub nonce: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluable {
    pub interpreter: Address,
    pub store: Address,
    pub bytecode: Vec<u8>,
}

/// A per-owner, per-token, per-id balance: (owner, token, vaultId) -> fp18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaultKey {
    pub owner: Address,
    pub token: Address,
    pub vault_id: B256,
}

#[derive(Debug, Default, Clone)]
pub struct VaultLedger {
    balances: BTreeMap<VaultKey, Fp18>,
}

impl VaultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, key: &VaultKey) -> Fp18 {
        self.balances.get(key).copied().unwrap_or(Fp18::ZERO)
    }

    pub fn set_balance(&mut self, key: VaultKey, value: Fp18) {
        self.balances.insert(key, value);
    }
}

/// The most recently observed quote for a pair: (maxOutput, ratio), both
/// normalized to 18-decimal fixed point. Ratio is sell-per-buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub max_output: Fp18,
    pub ratio: Fp18,
}

impl Quote {
    pub fn is_zero(&self) -> bool {
        self.max_output.is_zero()
    }
}

/// A directional (buy-token, sell-token) projection of one order.
///
/// Pairs are the unit of scheduling. `quote` is `None` until the first
/// successful `quote_order` call; it is ephemeral and refreshed before
/// every evaluation attempt.
#[derive(Debug, Clone)]
pub struct Pair {
    pub order_hash: B256,
    pub orderbook: Address,
    pub owner: Address,
    pub sell_token: Address,
    pub buy_token: Address,
    pub input_io_index: usize,
    pub output_io_index: usize,
    pub sell_decimals: u8,
    pub buy_decimals: u8,
    pub quote: Option<Quote>,
}

impl Pair {
    pub fn max_output(&self) -> Fp18 {
        self.quote.map(|q| q.max_output).unwrap_or(Fp18::ZERO)
    }

    pub fn ratio(&self) -> Fp18 {
        self.quote.map(|q| q.ratio).unwrap_or(Fp18::ZERO)
    }

    pub fn has_nonzero_quote(&self) -> bool {
        self.quote.is_some_and(|q| !q.is_zero())
    }
}

/// Tie-break ordering among counterparty candidates (§4.3): higher
/// `maxOutput` first, then lower `ratio`, then lexicographic order hash.
/// Exposed as a free function rather than `Ord` on `Pair` because it
/// depends on comparing against a reference pair's tokens only implicitly
/// (the caller has already filtered to matching counterparties).
pub fn counterparty_cmp(a: &Pair, b: &Pair) -> Ordering {
    b.max_output()
        .cmp(&a.max_output())
        .then_with(|| a.ratio().cmp(&b.ratio()))
        .then_with(|| a.order_hash.cmp(&b.order_hash))
}

/// Ordered map of one owner's orders, plus round-robin scheduling state.
#[derive(Debug, Clone)]
pub struct OwnerProfile {
    pub owner: Address,
    /// Stable iteration order; order hashes in insertion order.
    pub order_hashes: Vec<B256>,
    /// Number of consecutive pairs considered before the scheduler moves on.
    pub limit: usize,
    /// Last-considered index into a flattened (order, pair) sequence.
    pub last_index: usize,
}

impl OwnerProfile {
    pub fn new(owner: Address, limit: usize) -> Self {
        Self {
            owner,
            order_hashes: Vec::new(),
            limit: limit.max(1),
            last_index: 0,
        }
    }

    pub fn add_order(&mut self, hash: B256) {
        if !self.order_hashes.contains(&hash) {
            self.order_hashes.push(hash);
        }
    }

    pub fn remove_order(&mut self, hash: &B256) {
        self.order_hashes.retain(|h| h != hash);
        if self.last_index >= self.order_hashes.len() && !self.order_hashes.is_empty() {
            self.last_index %= self.order_hashes.len();
        }
    }

    /// Advance `last_index` by one modulo the order count, wrapping to zero
    /// once `limit` consecutive advances have happened.
    pub fn advance(&mut self) {
        if self.order_hashes.is_empty() {
            self.last_index = 0;
            return;
        }
        self.last_index = (self.last_index + 1) % self.order_hashes.len();
    }
}
