//! Intra-orderbook router (C4): clears our pair directly against a
//! counterparty pair in the same orderbook, with zero external swap data.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use async_trait::async_trait;

use crate::error::{SolverError, SolverResult};
use crate::fixed_point::Fp18;

use super::{MarketPriceParams, Quote, QuoteParams, Router, TradeParams, TradeParamsArgs};

pub struct IntraOrderbookRouter;

impl IntraOrderbookRouter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IntraOrderbookRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for IntraOrderbookRouter {
    async fn quote(&self, _params: QuoteParams) -> SolverResult<Quote> {
        Err(SolverError::no_route(
            "intra-orderbook router is quoted via get_trade_params, not quote",
        ))
    }

    async fn get_market_price(&self, _params: MarketPriceParams) -> SolverResult<Fp18> {
        Err(SolverError::no_route(
            "intra-orderbook router has no standalone market price",
        ))
    }

    async fn get_trade_params(&self, args: TradeParamsArgs<'_>) -> SolverResult<TradeParams> {
        let counterparty = args
            .counterparty
            .ok_or_else(|| SolverError::no_route("intra-orderbook route requires a counterparty"))?;

        let amount_out = std::cmp::min(counterparty.max_output(), args.pair.max_output());
        if amount_out.is_zero() {
            return Err(SolverError::no_route("no overlapping liquidity with counterparty"));
        }

        let estimated_profit_eth = args
            .input_to_eth_price
            .checked_mul(args.amount_in)
            .unwrap_or(Fp18::ZERO)
            .checked_add(
                args.output_to_eth_price
                    .checked_mul(amount_out)
                    .unwrap_or(Fp18::ZERO),
            )
            .unwrap_or(Fp18::ZERO);

        Ok(TradeParams {
            take_orders_calldata: Vec::new(),
            counterparty_hash: Some(counterparty.order_hash),
            amount_in: args.amount_in,
            amount_out,
            estimated_profit_eth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pair, Quote as ModelQuote};
    use alloy::primitives::{Address, B256, U256};

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    fn hash_of(n: u8) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        B256::from(bytes)
    }

    fn pair_with(max_output: u64, hash_byte: u8) -> Pair {
        Pair {
            order_hash: hash_of(hash_byte),
            orderbook: addr(1),
            owner: addr(2),
            sell_token: addr(3),
            buy_token: addr(4),
            input_io_index: 0,
            output_io_index: 0,
            sell_decimals: 18,
            buy_decimals: 18,
            quote: Some(ModelQuote {
                max_output: Fp18::from_raw(U256::from(max_output)),
                ratio: Fp18::from_raw(U256::from(1u64)),
            }),
        }
    }

    #[tokio::test]
    async fn test_trade_params_takes_min_of_both_sides() {
        let router = IntraOrderbookRouter::new();
        let pair = pair_with(100, 1);
        let counterparty = pair_with(50, 2);
        let args = TradeParamsArgs {
            pair: &pair,
            counterparty: Some(&counterparty),
            amount_in: Fp18::from_raw(U256::from(10u64)),
            gas_price: Fp18::ZERO,
            input_to_eth_price: Fp18::ZERO,
            output_to_eth_price: Fp18::ZERO,
        };
        let params = router.get_trade_params(args).await.unwrap();
        assert_eq!(params.amount_out.raw(), U256::from(50u64));
        assert_eq!(params.counterparty_hash, Some(hash_of(2)));
    }

    #[tokio::test]
    async fn test_missing_counterparty_is_no_route() {
        let router = IntraOrderbookRouter::new();
        let pair = pair_with(100, 1);
        let args = TradeParamsArgs {
            pair: &pair,
            counterparty: None,
            amount_in: Fp18::ZERO,
            gas_price: Fp18::ZERO,
            input_to_eth_price: Fp18::ZERO,
            output_to_eth_price: Fp18::ZERO,
        };
        assert!(router.get_trade_params(args).await.is_err());
    }
}
