//! Router abstraction (C4): three variants sharing one polymorphic
//! interface — composition over a class hierarchy, per design note.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

pub mod external;
pub mod inter;
pub mod intra;
pub mod partial_fill;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;

use crate::error::SolverResult;
use crate::fixed_point::Fp18;
use crate::model::Pair;

/// One routing leg: a pool/aggregator call plus the amounts it moves.
#[derive(Debug, Clone)]
pub struct RouteLeg {
    pub pool: Address,
    pub pool_code: String,
    pub amount_in: Fp18,
    pub amount_out: Fp18,
}

/// Result of a `Router::quote` call.
#[derive(Debug, Clone)]
pub struct Quote {
    pub amount_out: Fp18,
    pub legs: Vec<RouteLeg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    Single,
    Multi,
}

#[derive(Debug, Clone)]
pub struct QuoteParams {
    pub from_token: Address,
    pub to_token: Address,
    pub decimals_in: u8,
    pub decimals_out: u8,
    pub amount_in: Fp18,
    pub gas_price: Fp18,
    pub block_number: u64,
    pub mode: RouteMode,
}

#[derive(Debug, Clone)]
pub struct MarketPriceParams {
    pub from_token: Address,
    pub to_token: Address,
    pub decimals_in: u8,
    pub decimals_out: u8,
    pub block_number: u64,
}

/// Arguments for composing the final on-chain call parameters for a
/// winning trade: the pair being traded, an optional counterparty (for
/// intra/inter-orderbook routes), and the partial-fill amount selected.
#[derive(Debug, Clone)]
pub struct TradeParamsArgs<'a> {
    pub pair: &'a Pair,
    pub counterparty: Option<&'a Pair>,
    pub amount_in: Fp18,
    pub gas_price: Fp18,
    pub input_to_eth_price: Fp18,
    pub output_to_eth_price: Fp18,
}

/// The fully composed parameters for a clearing transaction: calldata for
/// the orderbook-appropriate arb function plus the estimated profit used
/// to rank candidates in §4.6 step 6.
#[derive(Debug, Clone)]
pub struct TradeParams {
    pub take_orders_calldata: Vec<u8>,
    pub counterparty_hash: Option<B256>,
    pub amount_in: Fp18,
    pub amount_out: Fp18,
    pub estimated_profit_eth: Fp18,
}

/// Shared interface implemented by `ExternalRouter`, `IntraOrderbookRouter`,
/// and `InterOrderbookRouter`.
#[async_trait]
pub trait Router: Send + Sync {
    async fn quote(&self, params: QuoteParams) -> SolverResult<Quote>;
    async fn get_market_price(&self, params: MarketPriceParams) -> SolverResult<Fp18>;
    async fn get_trade_params(&self, args: TradeParamsArgs<'_>) -> SolverResult<TradeParams>;
}
