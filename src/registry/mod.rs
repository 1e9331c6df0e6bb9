//! Order registry (C3): order-book map, pair map, round-robin scheduler,
//! and counterparty lookups.
//!
//! Backed by `DashMap`s for the same reason the teacher's
//! `PoolStateManager` is (`pool/state.rs`): many concurrent readers doing
//! counterparty lookups and quoting, with writers (`add_order`/
//! `remove_order`/pair-map mutation) that must finish quickly against
//! in-memory structures only.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, B256};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{counterparty_cmp, Order, OwnerProfile, Pair, Quote};

/// `(orderbook -> owner -> orders)`.
type OrderbookMap = DashMap<Address, DashMap<Address, OwnerOrders>>;

#[derive(Default)]
struct OwnerOrders {
    profile: RwLock<OwnerProfile>,
    orders: DashMap<B256, Order>,
}

/// `(orderbook -> sell-token -> buy-token -> orderHash -> Pair)`.
type PairMap = DashMap<Address, DashMap<Address, DashMap<Address, DashMap<B256, Pair>>>>;

/// Holds the order-book map and pair map, and serves the worker scheduler.
///
/// Cheap to clone: internally `Arc`-backed, mirroring the teacher's
/// `PoolStateManager` clone-as-handle convention.
#[derive(Clone)]
pub struct OrderRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    orderbooks: OrderbookMap,
    pairs: PairMap,
    /// Round-robin cursor over orderbook addresses, advanced by `next_pair`.
    orderbook_cursor: RwLock<Vec<Address>>,
    /// Per-orderbook index of the next owner `next_pair` should resume
    /// from, so consecutive calls rotate across owners instead of always
    /// restarting from the first one in iteration order.
    owner_cursor: DashMap<Address, usize>,
}

/// Per-(input, output) IO combination pair plus the underlying order and
/// orderbook, returned by `add_order` to the caller for any bookkeeping
/// the caller wants to do with freshly projected pairs (tests, metrics).
pub struct ProjectedPair {
    pub pair: Pair,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                orderbooks: DashMap::new(),
                pairs: DashMap::new(),
                orderbook_cursor: RwLock::new(Vec::new()),
                owner_cursor: DashMap::new(),
            }),
        }
    }

    /// Insert an order into the order-book map and project it into pairs
    /// for every `(input, output)` IO combination whose tokens differ.
    /// Projected pairs are *not* inserted into the pair-map yet — that
    /// only happens after a successful non-zero quote (§4.6).
    pub async fn add_order(&self, order: Order) -> Vec<ProjectedPair> {
        let book = self
            .inner
            .orderbooks
            .entry(order.orderbook)
            .or_insert_with(DashMap::new);
        let owner_orders = book.entry(order.owner).or_insert_with(|| OwnerOrders {
            profile: RwLock::new(OwnerProfile::new(order.owner, 1)),
            orders: DashMap::new(),
        });

        {
            let mut profile = owner_orders.profile.write().await;
            profile.add_order(order.hash);
            profile.limit = profile.order_hashes.len().max(1);
        }

        let mut projected = Vec::new();
        for (in_idx, input) in order.inputs.iter().enumerate() {
            for (out_idx, output) in order.outputs.iter().enumerate() {
                if input.token == output.token {
                    continue;
                }
                projected.push(ProjectedPair {
                    pair: Pair {
                        order_hash: order.hash,
                        orderbook: order.orderbook,
                        owner: order.owner,
                        sell_token: input.token,
                        buy_token: output.token,
                        input_io_index: in_idx,
                        output_io_index: out_idx,
                        sell_decimals: input.decimals,
                        buy_decimals: output.decimals,
                        quote: None,
                    },
                });
            }
        }

        owner_orders.orders.insert(order.hash, order);

        let mut cursor = self.inner.orderbook_cursor.write().await;
        if !cursor.contains(&book.key().clone()) {
            cursor.push(*book.key());
        }

        projected
    }

    /// Look up the full order record a pair was projected from, for
    /// collaborators (the quote oracle) that need fields `Pair` doesn't
    /// carry — the evaluable bytecode, nonce, and full IO list.
    pub fn get_order(&self, orderbook: Address, owner: Address, hash: B256) -> Option<Order> {
        self.inner
            .orderbooks
            .get(&orderbook)?
            .get(&owner)?
            .orders
            .get(&hash)
            .map(|entry| entry.clone())
    }

    /// Delete an order and all derived pairs from both maps.
    pub async fn remove_order(&self, orderbook: Address, owner: Address, hash: B256) {
        if let Some(book) = self.inner.orderbooks.get(&orderbook) {
            if let Some(owner_orders) = book.get(&owner) {
                owner_orders.orders.remove(&hash);
                owner_orders.profile.write().await.remove_order(&hash);
            }
        }

        if let Some(sell_map) = self.inner.pairs.get(&orderbook) {
            for buy_map in sell_map.iter() {
                for orderhash_map in buy_map.iter() {
                    orderhash_map.remove(&hash);
                }
            }
        }
    }

    /// Ensure `pair` is present in the pair-map; no-op if its quote is
    /// zero or absent (enforces the pair-map invariant from the caller
    /// side — callers must only invoke this after a non-zero quote).
    pub fn add_to_pair_maps(&self, pair: Pair) {
        if !pair.has_nonzero_quote() {
            return;
        }
        let sell_map = self
            .inner
            .pairs
            .entry(pair.orderbook)
            .or_insert_with(DashMap::new);
        let buy_map = sell_map
            .entry(pair.sell_token)
            .or_insert_with(DashMap::new);
        let hash_map = buy_map.entry(pair.buy_token).or_insert_with(DashMap::new);
        hash_map.insert(pair.order_hash, pair);
    }

    pub fn remove_from_pair_maps(&self, orderbook: Address, sell_token: Address, buy_token: Address, hash: B256) {
        if let Some(sell_map) = self.inner.pairs.get(&orderbook) {
            if let Some(buy_map) = sell_map.get(&sell_token) {
                if let Some(hash_map) = buy_map.get(&buy_token) {
                    hash_map.remove(&hash);
                }
            }
        }
    }

    /// Apply a freshly observed quote to `pair`: update the pair-map
    /// membership according to the invariant (present iff non-zero).
    pub fn apply_quote(&self, mut pair: Pair, quote: Quote) -> Pair {
        pair.quote = Some(quote);
        if quote.is_zero() {
            self.remove_from_pair_maps(pair.orderbook, pair.sell_token, pair.buy_token, pair.order_hash);
        } else {
            self.add_to_pair_maps(pair.clone());
        }
        pair
    }

    /// Round-robin across orderbooks, then owners, then orders. Each call
    /// advances the current owner's `last_index`; once `limit` consecutive
    /// advances have happened for that owner (a full cycle through its
    /// order list), scheduling moves to the next owner, resuming there on
    /// the following call via the persisted `owner_cursor`.
    pub async fn next_pair(&self) -> Option<Pair> {
        let orderbook_order = { self.inner.orderbook_cursor.read().await.clone() };
        for orderbook in orderbook_order {
            let Some(book) = self.inner.orderbooks.get(&orderbook) else {
                continue;
            };
            let owners: Vec<Address> = book.iter().map(|entry| *entry.key()).collect();
            if owners.is_empty() {
                continue;
            }
            let start = self.inner.owner_cursor.get(&orderbook).map(|i| *i).unwrap_or(0) % owners.len();

            for offset in 0..owners.len() {
                let idx = (start + offset) % owners.len();
                let owner = owners[idx];
                let Some(owner_orders) = book.get(&owner) else {
                    continue;
                };

                let drawn = {
                    let mut profile = owner_orders.profile.write().await;
                    if profile.order_hashes.is_empty() {
                        None
                    } else {
                        let hash = profile.order_hashes[profile.last_index];
                        profile.advance();
                        Some((hash, profile.last_index == 0))
                    }
                };
                let Some((hash, cycled)) = drawn else {
                    continue;
                };

                let next_owner_idx = if cycled { (idx + 1) % owners.len() } else { idx };
                self.inner.owner_cursor.insert(orderbook, next_owner_idx);

                if let Some(order) = owner_orders.orders.get(&hash) {
                    if let (Some(input), Some(output)) = (order.inputs.first(), order.outputs.first()) {
                        return Some(Pair {
                            order_hash: order.hash,
                            orderbook: order.orderbook,
                            owner: order.owner,
                            sell_token: input.token,
                            buy_token: output.token,
                            input_io_index: 0,
                            output_io_index: 0,
                            sell_decimals: input.decimals,
                            buy_decimals: output.decimals,
                            quote: None,
                        });
                    }
                }
            }
        }
        None
    }

    /// Counterparties in the **same** orderbook whose buy-token is
    /// `pair.sell_token` and sell-token is `pair.buy_token`, owned by a
    /// different owner, ordered per the §4.3 tie-break.
    pub fn find_intra_ob_counterparties(&self, pair: &Pair) -> Vec<Pair> {
        let mut out = self.counterparties_in(pair.orderbook, pair);
        out.sort_by(counterparty_cmp);
        out
    }

    /// Same as above, across every **other** orderbook.
    pub fn find_inter_ob_counterparties(&self, pair: &Pair) -> Vec<Pair> {
        let mut out = Vec::new();
        for book in self.inner.pairs.iter() {
            if *book.key() == pair.orderbook {
                continue;
            }
            out.extend(self.counterparties_in(*book.key(), pair));
        }
        out.sort_by(counterparty_cmp);
        out
    }

    fn counterparties_in(&self, orderbook: Address, pair: &Pair) -> Vec<Pair> {
        let mut out = Vec::new();
        if let Some(sell_map) = self.inner.pairs.get(&orderbook) {
            // counterparty sell_token == our buy_token, counterparty buy_token == our sell_token
            if let Some(buy_map) = sell_map.get(&pair.buy_token) {
                if let Some(hash_map) = buy_map.get(&pair.sell_token) {
                    for entry in hash_map.iter() {
                        let candidate = entry.value();
                        if candidate.owner != pair.owner {
                            out.push(candidate.clone());
                        }
                    }
                }
            }
        }
        out
    }
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
