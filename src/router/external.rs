//! External router (C4): AMM aggregator, pool snapshot, and the pool
//! blacklist.
//!
//! Grounded on `pool/state.rs`'s `DashMap`-backed `PoolStateManager` for
//! the snapshot cache, and `filters/whitelist.rs`'s blacklist-section
//! shape for the lowercased-address blacklist.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::contracts::IAggregatorRouter;
use crate::error::{SolverError, SolverResult};
use crate::fixed_point::{price18, Fp18};
use alloy::providers::Provider;

use super::{MarketPriceParams, Quote, QuoteParams, Router, RouteLeg, RouteMode, TradeParams, TradeParamsArgs};

#[derive(Debug, Clone)]
struct CandidatePool {
    address: Address,
    pool_code: String,
}

/// Pool snapshot keyed by `(fromToken, toToken)`, annotated with the
/// block it was last refreshed at. One instance per `ExternalRouter`;
/// refresh is exclusive (a single write at a time per key), reads are
/// concurrent — same discipline as `pool/state.rs`'s `PoolStateManager`.
#[derive(Default)]
struct PoolSnapshot {
    pools: DashMap<(Address, Address), (u64, Vec<CandidatePool>)>,
}

/// Source of pool discovery events; kept behind a trait so the router
/// logic is independent of how candidate pools for a token pair are
/// actually surfaced (factory event logs, an off-chain pool list, a
/// third-party aggregator's route-finding endpoint).
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn pools_for(&self, from: Address, to: Address, up_to_block: u64) -> SolverResult<Vec<(Address, String)>>;

    async fn quote_amount_out(
        &self,
        pool: Address,
        from: Address,
        to: Address,
        amount_in: U256,
    ) -> SolverResult<U256>;
}

/// AMM aggregator-backed `PoolSource` using a deployed router contract's
/// `getAmountsOut` for pricing and a single aggregator address as the
/// sole "pool" candidate — the aggregator itself does the internal
/// multi-hop routing.
pub struct AggregatorPoolSource<P> {
    provider: Arc<P>,
    aggregator: Address,
}

impl<P> AggregatorPoolSource<P> {
    pub fn new(provider: Arc<P>, aggregator: Address) -> Self {
        Self { provider, aggregator }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static> PoolSource for AggregatorPoolSource<P> {
    async fn pools_for(&self, _from: Address, _to: Address, _up_to_block: u64) -> SolverResult<Vec<(Address, String)>> {
        Ok(vec![(self.aggregator, "aggregator".to_string())])
    }

    async fn quote_amount_out(
        &self,
        pool: Address,
        from: Address,
        to: Address,
        amount_in: U256,
    ) -> SolverResult<U256> {
        let router = IAggregatorRouter::new(pool, self.provider.clone());
        let path = vec![from, to];
        let result = router
            .getAmountsOut(amount_in, path)
            .call()
            .await
            .map_err(|e| SolverError::transport(e.to_string()))?;
        result
            .amounts
            .last()
            .copied()
            .ok_or_else(|| SolverError::no_route("aggregator returned no amounts"))
    }
}

pub struct ExternalRouter<S> {
    source: S,
    snapshot: PoolSnapshot,
    blacklist: HashSet<String>,
}

impl<S: PoolSource> ExternalRouter<S> {
    pub fn new(source: S, blacklist: HashSet<String>) -> Self {
        Self {
            source,
            snapshot: PoolSnapshot::default(),
            blacklist: blacklist.into_iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    fn is_blacklisted(&self, pool: Address) -> bool {
        self.blacklist.contains(&format!("{:#x}", pool).to_lowercase())
    }

    /// Refresh the pool snapshot for `(from, to)` by consuming events up
    /// to `block`. When `ignore_cache` is false and the snapshot is
    /// already at or past `block`, this is a no-op.
    pub async fn fetch_pools(
        &self,
        from: Address,
        to: Address,
        block: u64,
        ignore_cache: bool,
    ) -> SolverResult<()> {
        let key = (from, to);
        if !ignore_cache {
            if let Some(entry) = self.snapshot.pools.get(&key) {
                if entry.0 >= block {
                    return Ok(());
                }
            }
        }

        let fetched = self.source.pools_for(from, to, block).await;
        let pools = match fetched {
            Ok(pools) => pools,
            Err(e) => {
                if e.to_string().contains("fetchPoolsForToken") {
                    debug!("fetchPoolsForToken warning, keeping prior snapshot: {e}");
                    return Ok(());
                }
                return Err(e);
            }
        };

        let candidates: Vec<CandidatePool> = pools
            .into_iter()
            .map(|(address, pool_code)| CandidatePool { address, pool_code })
            .filter(|p| !self.is_blacklisted(p.address))
            .collect();

        if candidates.is_empty() {
            warn!(?from, ?to, "no whitelisted pools found for pair");
        }

        self.snapshot.pools.insert(key, (block, candidates));
        Ok(())
    }

    /// Find the best route for `amount_in`, filtering blacklisted pools
    /// both here and (redundantly, defensively) at fetch time. Decimals
    /// are supplied per call since one router instance serves every pair,
    /// each with its own token decimals.
    pub async fn find_best_route(
        &self,
        from: Address,
        to: Address,
        decimals_in: u8,
        decimals_out: u8,
        amount_in: Fp18,
        _gas_price: Fp18,
        mode: RouteMode,
    ) -> SolverResult<Quote> {
        let key = (from, to);
        let candidates = self
            .snapshot
            .pools
            .get(&key)
            .map(|entry| entry.1.clone())
            .unwrap_or_default();

        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|p| !self.is_blacklisted(p.address))
            .collect();

        if candidates.is_empty() {
            return Err(SolverError::no_route("no candidate pools for pair"));
        }

        let amount_in_raw = crate::fixed_point::scale_from_18(amount_in, decimals_in)?;

        let mut best: Option<(CandidatePool, U256)> = None;
        for pool in candidates {
            match self.source.quote_amount_out(pool.address, from, to, amount_in_raw).await {
                Ok(amount_out) => {
                    if best.as_ref().is_none_or(|(_, current)| amount_out > *current) {
                        best = Some((pool, amount_out));
                    }
                }
                Err(e) => {
                    debug!(pool = %pool.address, error = %e, "pool quote failed, skipping");
                }
            }
            if mode == RouteMode::Single {
                break;
            }
        }

        let (pool, amount_out_raw) = best.ok_or_else(|| SolverError::no_route("all pool quotes failed"))?;
        let amount_out = crate::fixed_point::scale_to_18(amount_out_raw, decimals_out)?;

        Ok(Quote {
            amount_out,
            legs: vec![RouteLeg {
                pool: pool.address,
                pool_code: pool.pool_code,
                amount_in,
                amount_out,
            }],
        })
    }
}

#[async_trait]
impl<S: PoolSource> Router for ExternalRouter<S> {
    async fn quote(&self, params: QuoteParams) -> SolverResult<Quote> {
        self.find_best_route(
            params.from_token,
            params.to_token,
            params.decimals_in,
            params.decimals_out,
            params.amount_in,
            params.gas_price,
            params.mode,
        )
        .await
    }

    async fn get_market_price(&self, params: MarketPriceParams) -> SolverResult<Fp18> {
        let probe = Fp18::from_raw(U256::from(10u64).pow(U256::from(18u64)));
        let quote = self
            .find_best_route(
                params.from_token,
                params.to_token,
                params.decimals_in,
                params.decimals_out,
                probe,
                Fp18::ZERO,
                RouteMode::Single,
            )
            .await?;
        price18(
            crate::fixed_point::scale_from_18(probe, params.decimals_in)?,
            crate::fixed_point::scale_from_18(quote.amount_out, params.decimals_out)?,
            params.decimals_in,
            params.decimals_out,
        )
    }

    async fn get_trade_params(&self, args: TradeParamsArgs<'_>) -> SolverResult<TradeParams> {
        let quote = self
            .find_best_route(
                args.pair.sell_token,
                args.pair.buy_token,
                args.pair.sell_decimals,
                args.pair.buy_decimals,
                args.amount_in,
                args.gas_price,
                RouteMode::Multi,
            )
            .await?;

        let estimated_profit_eth = args
            .input_to_eth_price
            .checked_mul(args.amount_in)
            .unwrap_or(Fp18::ZERO)
            .checked_add(
                args.output_to_eth_price
                    .checked_mul(quote.amount_out)
                    .unwrap_or(Fp18::ZERO),
            )
            .unwrap_or(Fp18::ZERO);

        Ok(TradeParams {
            take_orders_calldata: Vec::new(),
            counterparty_hash: None,
            amount_in: args.amount_in,
            amount_out: quote.amount_out,
            estimated_profit_eth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        pools: Vec<(Address, String)>,
        amount_out: U256,
    }

    #[async_trait]
    impl PoolSource for FixedSource {
        async fn pools_for(&self, _from: Address, _to: Address, _up_to_block: u64) -> SolverResult<Vec<(Address, String)>> {
            Ok(self.pools.clone())
        }

        async fn quote_amount_out(
            &self,
            _pool: Address,
            _from: Address,
            _to: Address,
            _amount_in: U256,
        ) -> SolverResult<U256> {
            Ok(self.amount_out)
        }
    }

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    #[tokio::test]
    async fn test_fetch_pools_filters_blacklist() {
        let pool = addr(5);
        let source = FixedSource {
            pools: vec![(pool, "test".to_string())],
            amount_out: U256::from(100u64),
        };
        let mut blacklist = HashSet::new();
        blacklist.insert(format!("{:#x}", pool));
        let router = ExternalRouter::new(source, blacklist);
        router.fetch_pools(addr(1), addr(2), 100, false).await.unwrap();
        let result = router
            .find_best_route(addr(1), addr(2), 18, 18, Fp18::from_raw(U256::from(10u64).pow(U256::from(18))), Fp18::ZERO, RouteMode::Multi)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_find_best_route_returns_highest_output() {
        let source = FixedSource {
            pools: vec![(addr(5), "test".to_string())],
            amount_out: U256::from(10u64).pow(U256::from(18)) * U256::from(2u64),
        };
        let router = ExternalRouter::new(source, HashSet::new());
        router.fetch_pools(addr(1), addr(2), 100, false).await.unwrap();
        let quote = router
            .find_best_route(addr(1), addr(2), 18, 18, Fp18::from_raw(U256::from(10u64).pow(U256::from(18))), Fp18::ZERO, RouteMode::Multi)
            .await
            .unwrap();
        assert_eq!(quote.amount_out.raw(), U256::from(10u64).pow(U256::from(18)) * U256::from(2u64));
    }

    #[tokio::test]
    async fn test_fetch_pools_cache_skipped_without_ignore() {
        let source = FixedSource {
            pools: vec![(addr(5), "test".to_string())],
            amount_out: U256::from(1u64),
        };
        let router = ExternalRouter::new(source, HashSet::new());
        router.fetch_pools(addr(1), addr(2), 100, false).await.unwrap();
        // second call with a lower block should be a no-op (cache ahead)
        router.fetch_pools(addr(1), addr(2), 50, false).await.unwrap();
        let entry = router.snapshot.pools.get(&(addr(1), addr(2))).unwrap();
        assert_eq!(entry.0, 100);
    }
}
