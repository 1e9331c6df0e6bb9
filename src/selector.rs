//! Trade-mode selector (C6): `process_order(pair, signer)`.
//!
//! Directly modeled on `arbitrage/detector.rs::check_pair`/
//! `check_pair_unified` (scan -> filter -> compare -> pick best),
//! generalized from "V2 vs V3 pool price compare" to "three router
//! variants, pick highest estimated profit."
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::SolverError;
use crate::fixed_point::Fp18;
use crate::model::{Pair, Quote as ModelQuote};
use crate::registry::OrderRegistry;
use crate::router::external::{ExternalRouter, PoolSource};
use crate::router::inter::InterOrderbookRouter;
use crate::router::intra::IntraOrderbookRouter;
use crate::router::{MarketPriceParams, Router, TradeParams, TradeParamsArgs};
use crate::telemetry::{PairOutcome, SpanAttributes, Stopwatch};

/// Result of a successful `TradeExecutor::execute` call: the submitted
/// transaction hash, plus realized income per token extracted from the
/// receipt's logs (§4.7 "CLASSIFY").
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub tx_hash: String,
    pub income: HashMap<Address, U256>,
}

/// Collaborator that refreshes a pair's quote on-chain (`quote`/`quote2`).
#[async_trait]
pub trait QuoteOracle: Send + Sync {
    async fn quote_order(&self, pair: &Pair, block_number: u64) -> Result<ModelQuote, SolverError>;
}

/// Collaborator that prices a token against the chain's native asset.
#[async_trait]
pub trait NativePriceOracle: Send + Sync {
    async fn price_to_native(&self, token: Address, block_number: u64) -> Result<Fp18, SolverError>;
}

/// Executes a winning `TradeParams` (hands off to the C7 transaction
/// pipeline). Kept as a trait here so `selector.rs` does not depend on
/// `tx::`'s signer/provider generics directly.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute(&self, pair: &Pair, trade: TradeParams) -> Result<ExecutionOutcome, SolverError>;
}

pub struct SelectorConfig {
    pub gas_price: Fp18,
    pub gas_coverage_percentage: String,
    pub block_number: u64,
}

/// Run the full ordered pipeline for one pair attempt.
pub async fn process_order<S: PoolSource>(
    pair: Pair,
    registry: &OrderRegistry,
    quote_oracle: &dyn QuoteOracle,
    external_router: &ExternalRouter<S>,
    native_price_oracle: &dyn NativePriceOracle,
    executor: &dyn TradeExecutor,
    config: &SelectorConfig,
) -> (PairOutcome, SpanAttributes) {
    let mut attrs = SpanAttributes::new();

    // 1. Quote
    let quote_timer = Stopwatch::start();
    let quote_result = quote_oracle.quote_order(&pair, config.block_number).await;
    attrs.set_duration("quoteOrder", quote_timer.elapsed());

    let quote = match quote_result {
        Ok(q) => q,
        Err(e) => {
            registry.remove_from_pair_maps(pair.orderbook, pair.sell_token, pair.buy_token, pair.order_hash);
            warn!(order = %pair.order_hash, error = %e, "failed to quote order");
            return (PairOutcome::FailedToQuote { reason: e.to_string() }, attrs);
        }
    };

    if quote.is_zero() {
        registry.remove_from_pair_maps(pair.orderbook, pair.sell_token, pair.buy_token, pair.order_hash);
        return (PairOutcome::ZeroOutput, attrs);
    }

    // 2. Commit to pair-map
    let pair = registry.apply_quote(pair, quote);

    // 3. Pools refresh
    let pools_timer = Stopwatch::start();
    let fetch_result = external_router
        .fetch_pools(pair.sell_token, pair.buy_token, config.block_number, false)
        .await;
    attrs.set_duration("fetchPools", pools_timer.elapsed());
    if let Err(e) = fetch_result {
        if !e.to_string().contains("fetchPoolsForToken") {
            return (PairOutcome::FailedToGetPools { reason: e.to_string() }, attrs);
        }
    }

    // 4. Pair market price (telemetry only)
    if let Ok(price) = external_router
        .get_market_price(MarketPriceParams {
            from_token: pair.sell_token,
            to_token: pair.buy_token,
            decimals_in: pair.sell_decimals,
            decimals_out: pair.buy_decimals,
            block_number: config.block_number,
        })
        .await
    {
        attrs.set("pairMarketPrice", price.to_string());
    }

    // 5. Eth prices
    let input_price = native_price_oracle.price_to_native(pair.sell_token, config.block_number).await;
    let output_price = native_price_oracle.price_to_native(pair.buy_token, config.block_number).await;

    let (input_to_eth_price, output_to_eth_price) = match (input_price, output_price) {
        (Ok(i), Ok(o)) => (i, o),
        (Ok(i), Err(_)) => (i, Fp18::ZERO),
        (Err(_), Ok(o)) => (Fp18::ZERO, o),
        (Err(_), Err(_)) => {
            if config.gas_coverage_percentage != "0" {
                return (PairOutcome::FailedToGetEthPrice { reason: "both eth price quotes failed".to_string() }, attrs);
            }
            (Fp18::ZERO, Fp18::ZERO)
        }
    };
    attrs.set("inputToEthPrice", input_to_eth_price.to_string());
    attrs.set("outputToEthPrice", output_to_eth_price.to_string());

    // 6. Find best trade across the three router variants.
    let intra_counterparties = registry.find_intra_ob_counterparties(&pair);
    let inter_counterparties = registry.find_inter_ob_counterparties(&pair);

    let mut best: Option<TradeParams> = None;

    let external_args = TradeParamsArgs {
        pair: &pair,
        counterparty: None,
        amount_in: pair.max_output(),
        gas_price: config.gas_price,
        input_to_eth_price,
        output_to_eth_price,
    };
    if let Ok(candidate) = external_router.get_trade_params(external_args).await {
        attrs.set("external.estimatedProfitEth", candidate.estimated_profit_eth.to_string());
        best = pick_better(best, candidate);
    }

    if let Some(counterparty) = intra_counterparties.first() {
        let intra_router = IntraOrderbookRouter::new();
        let args = TradeParamsArgs {
            pair: &pair,
            counterparty: Some(counterparty),
            amount_in: pair.max_output(),
            gas_price: config.gas_price,
            input_to_eth_price,
            output_to_eth_price,
        };
        if let Ok(candidate) = intra_router.get_trade_params(args).await {
            attrs.set("intra.estimatedProfitEth", candidate.estimated_profit_eth.to_string());
            best = pick_better(best, candidate);
        }
    }

    if let Some(counterparty) = inter_counterparties.first() {
        let inter_router = InterOrderbookRouter::new();
        let args = TradeParamsArgs {
            pair: &pair,
            counterparty: Some(counterparty),
            amount_in: pair.max_output(),
            gas_price: config.gas_price,
            input_to_eth_price,
            output_to_eth_price,
        };
        if let Ok(candidate) = inter_router.get_trade_params(args).await {
            attrs.set("inter.estimatedProfitEth", candidate.estimated_profit_eth.to_string());
            best = pick_better(best, candidate);
        }
    }

    let Some(winner) = best.filter(|t| !t.estimated_profit_eth.is_zero()) else {
        return (PairOutcome::NoOpportunity, attrs);
    };

    // 7. Execute
    match executor.execute(&pair, winner).await {
        Ok(outcome) => {
            info!(order = %pair.order_hash, tx_hash = %outcome.tx_hash, income = ?outcome.income, "found opportunity");
            (PairOutcome::FoundOpportunity { tx_hash: outcome.tx_hash, income: outcome.income }, attrs)
        }
        Err(e) => {
            debug!(order = %pair.order_hash, error = %e, "execution failed");
            let reason = e.to_string();
            let frontrun_by = extract_frontrun_hash(&reason);
            (
                PairOutcome::TxFailed {
                    classification: crate::telemetry::TxFailureKind::Reverted { reason, frontrun_by },
                },
                attrs,
            )
        }
    }
}

/// Pull a frontrunning transaction hash back out of a decoded revert
/// reason produced by the C7 pipeline's "actual cause" note.
fn extract_frontrun_hash(reason: &str) -> Option<String> {
    let marker = "frontrun by transaction with hash ";
    let start = reason.find(marker)? + marker.len();
    let rest = &reason[start..];
    let end = rest.find(')').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

fn pick_better(current: Option<TradeParams>, candidate: TradeParams) -> Option<TradeParams> {
    match current {
        Some(existing) if existing.estimated_profit_eth >= candidate.estimated_profit_eth => Some(existing),
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Evaluable, IoEntry, Order, OrderVersion};
    use crate::router::external::PoolSource;
    use alloy::primitives::{B256, U256};
    use std::collections::HashSet;

    struct ZeroQuoteOracle;
    #[async_trait]
    impl QuoteOracle for ZeroQuoteOracle {
        async fn quote_order(&self, _pair: &Pair, _block_number: u64) -> Result<ModelQuote, SolverError> {
            Ok(ModelQuote { max_output: Fp18::ZERO, ratio: Fp18::ZERO })
        }
    }

    struct NonZeroQuoteOracle;
    #[async_trait]
    impl QuoteOracle for NonZeroQuoteOracle {
        async fn quote_order(&self, _pair: &Pair, _block_number: u64) -> Result<ModelQuote, SolverError> {
            Ok(ModelQuote {
                max_output: Fp18::from_raw(U256::from(10u64).pow(U256::from(18))),
                ratio: Fp18::from_raw(U256::from(2u64) * U256::from(10u64).pow(U256::from(18))),
            })
        }
    }

    struct FailingPriceOracle;
    #[async_trait]
    impl NativePriceOracle for FailingPriceOracle {
        async fn price_to_native(&self, _token: Address, _block_number: u64) -> Result<Fp18, SolverError> {
            Err(SolverError::no_route("no price feed"))
        }
    }

    struct NoopExecutor;
    #[async_trait]
    impl TradeExecutor for NoopExecutor {
        async fn execute(&self, _pair: &Pair, _trade: TradeParams) -> Result<ExecutionOutcome, SolverError> {
            Ok(ExecutionOutcome { tx_hash: "0xhash".to_string(), income: HashMap::new() })
        }
    }

    struct EmptyPoolSource;
    #[async_trait]
    impl PoolSource for EmptyPoolSource {
        async fn pools_for(&self, _from: Address, _to: Address, _up_to_block: u64) -> Result<Vec<(Address, String)>, SolverError> {
            Ok(vec![])
        }
        async fn quote_amount_out(&self, _pool: Address, _from: Address, _to: Address, _amount_in: U256) -> Result<U256, SolverError> {
            Err(SolverError::no_route("no pools"))
        }
    }

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

    fn sample_pair() -> Pair {
        Pair {
            order_hash: hash_of(1),
            orderbook: addr(1),
            owner: addr(2),
            sell_token: addr(3),
            buy_token: addr(4),
            input_io_index: 0,
            output_io_index: 0,
            sell_decimals: 18,
            buy_decimals: 18,
            quote: None,
        }
    }

    fn sample_order() -> Order {
        Order {
            hash: hash_of(1),
            owner: addr(2),
            orderbook: addr(1),
            version: OrderVersion::V4,
            inputs: vec![IoEntry { token: addr(3), vault_id: hash_of(5), decimals: 18 }],
            outputs: vec![IoEntry { token: addr(4), vault_id: hash_of(6), decimals: 18 }],
            evaluable: Evaluable { interpreter: addr(9), store: addr(10), bytecode: vec![] },
            nonce: hash_of(0),
        }
    }

    #[tokio::test]
    async fn test_scenario_zero_output_quote() {
        let registry = OrderRegistry::new();
        registry.add_order(sample_order()).await;
        let external_router = ExternalRouter::new(EmptyPoolSource, HashSet::new());
        let config = SelectorConfig {
            gas_price: Fp18::ZERO,
            gas_coverage_percentage: "100".to_string(),
            block_number: 1,
        };
        let (outcome, attrs) = process_order(
            sample_pair(),
            &registry,
            &ZeroQuoteOracle,
            &external_router,
            &FailingPriceOracle,
            &NoopExecutor,
            &config,
        )
        .await;
        assert!(matches!(outcome, PairOutcome::ZeroOutput));
        assert!(attrs.into_json()["duration.quoteOrder"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_scenario_no_eth_price_gas_coverage_zero() {
        let registry = OrderRegistry::new();
        registry.add_order(sample_order()).await;
        let external_router = ExternalRouter::new(EmptyPoolSource, HashSet::new());
        let config = SelectorConfig {
            gas_price: Fp18::ZERO,
            gas_coverage_percentage: "0".to_string(),
            block_number: 1,
        };
        let (outcome, _attrs) = process_order(
            sample_pair(),
            &registry,
            &NonZeroQuoteOracle,
            &external_router,
            &FailingPriceOracle,
            &NoopExecutor,
            &config,
        )
        .await;
        assert!(matches!(outcome, PairOutcome::NoOpportunity));
    }

    #[tokio::test]
    async fn test_scenario_no_eth_price_gas_coverage_nonzero_fails() {
        let registry = OrderRegistry::new();
        registry.add_order(sample_order()).await;
        let external_router = ExternalRouter::new(EmptyPoolSource, HashSet::new());
        let config = SelectorConfig {
            gas_price: Fp18::ZERO,
            gas_coverage_percentage: "50".to_string(),
            block_number: 1,
        };
        let (outcome, _attrs) = process_order(
            sample_pair(),
            &registry,
            &NonZeroQuoteOracle,
            &external_router,
            &FailingPriceOracle,
            &NoopExecutor,
            &config,
        )
        .await;
        assert!(matches!(outcome, PairOutcome::FailedToGetEthPrice { .. }));
    }

    #[test]
    fn test_extract_frontrun_hash_present() {
        let reason = "node reverted: MinimumOutput (actual cause: current transaction has been actually frontrun by transaction with hash 0xabc123)";
        assert_eq!(extract_frontrun_hash(reason), Some("0xabc123".to_string()));
    }

    #[test]
    fn test_extract_frontrun_hash_absent() {
        let reason = "node reverted: MinimumOutput (transaction ran out of specified gas)";
        assert_eq!(extract_frontrun_hash(reason), None);
    }
}
