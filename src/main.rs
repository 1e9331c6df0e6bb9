//! Arbitrage solver entry point.
//!
//! Author: AI-Generated
//! Created: 2026-01-28
//!
//! Dependencies:
//!     - alloy (RPC provider, primitives, signing)
//!     - tokio (async runtime, worker pool)
//!     - clap/dotenv (configuration)
//!     - tracing (logging)
//!
//! Wiring: connect a provider, load signers and orders, then hand a
//! bounded worker pool the full quote -> route -> execute pipeline for
//! every pair the order registry produces.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn, Level};

use obarb_solver::contracts::{IOrderbookV4, OrderV3, EvaluableV3, IO, QuoteConfig};
use obarb_solver::error::SolverError;
use obarb_solver::fixed_point::Fp18;
use obarb_solver::indexer::{OrderEventSource, SubgraphClient};
use obarb_solver::model::{Evaluable, IoEntry, Order, OrderVersion, Pair, Quote as ModelQuote};
use obarb_solver::registry::OrderRegistry;
use obarb_solver::revert::{default_seed, seed_known_signatures, HttpSelectorRegistry, SelectorRegistry};
use obarb_solver::router::external::{AggregatorPoolSource, ExternalRouter};
use obarb_solver::router::{MarketPriceParams, Router};
use obarb_solver::selector::{self, NativePriceOracle, QuoteOracle, SelectorConfig, TradeExecutor};
use obarb_solver::signer::{LocalSigner, Signer, SignerPool};
use obarb_solver::telemetry::finalize;
use obarb_solver::tx::{ProviderFrontrunLogSource, TxPipeline, TxPipelineConfig, TxPipelineExecutor, RouterVariant};
use obarb_solver::worker::{PairProcessor, ShutdownSignal, WorkerScheduler};
use obarb_solver::SolverConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .json()
        .init();

    let config = SolverConfig::load().context("loading configuration")?;
    info!(chain_id = config.chain_id, "solver starting");

    let provider = Arc::new(
        ProviderBuilder::new()
            .connect_ws(WsConnect::new(&config.rpc_url))
            .await
            .context("connecting to rpc endpoint")?,
    );

    let signers: Vec<Arc<dyn Signer>> = config
        .signer_keys
        .iter()
        .map(|key| -> Result<Arc<dyn Signer>> {
            let wallet = PrivateKeySigner::from_str(key).context("parsing signer private key")?;
            Ok(Arc::new(LocalSigner::new(wallet, provider.clone())))
        })
        .collect::<Result<_>>()?;
    if signers.is_empty() {
        anyhow::bail!("no signer keys configured");
    }
    let signer_pool = SignerPool::new(signers);

    let registry = OrderRegistry::new();
    for subgraph_url in &config.subgraph_urls {
        let client = SubgraphClient::new(subgraph_url.clone());
        match client.fetch_all_transactions().await {
            Ok(transactions) => {
                let ingested = ingest_transactions(&registry, &transactions).await;
                info!(subgraph = %subgraph_url, orders = ingested, "ingested orders from subgraph");
            }
            Err(e) => warn!(subgraph = %subgraph_url, error = %e, "failed to fetch subgraph transactions"),
        }
    }

    let selector_registry: Arc<dyn SelectorRegistry> =
        Arc::new(HttpSelectorRegistry::new(config.selector_registry_url.clone()));
    seed_known_signatures(&default_seed());

    let aggregator = config.aggregator_router_address()?;
    let pool_source = AggregatorPoolSource::new(provider.clone(), aggregator);
    let blacklist: HashSet<String> = config.pool_blacklist.iter().cloned().collect();
    let external_router = Arc::new(ExternalRouter::new(pool_source, blacklist));

    let quote_oracle: Arc<dyn QuoteOracle> = Arc::new(OnChainQuoteOracle {
        provider: provider.clone(),
        registry: registry.clone(),
    });

    let native_token = config.native_token_address()?;
    let native_price_oracle: Arc<dyn NativePriceOracle> = Arc::new(AggregatorNativePriceOracle {
        router: external_router.clone(),
        native_token,
    });

    let frontrun_log_source = Arc::new(ProviderFrontrunLogSource::new(provider.clone()));
    let pipeline = TxPipeline::new(
        provider.clone(),
        signer_pool,
        selector_registry,
        frontrun_log_source,
        TxPipelineConfig {
            arb_contract: config.arb_contract_address()?,
            gas_price: U256::from(0u64),
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            is_arbitrum: config.is_arbitrum,
        },
    );
    let executor: Arc<dyn TradeExecutor> = Arc::new(TxPipelineExecutor {
        pipeline,
        orderbook_is_v4: true,
        variant: RouterVariant::External,
    });

    let gas_coverage_percentage = config.gas_coverage_percentage.clone();
    let registry_for_processor = registry.clone();
    let provider_for_processor = provider.clone();
    let processor: PairProcessor = Arc::new(move |pair: Pair| {
        let registry = registry_for_processor.clone();
        let quote_oracle = quote_oracle.clone();
        let external_router = external_router.clone();
        let native_price_oracle = native_price_oracle.clone();
        let executor = executor.clone();
        let gas_coverage_percentage = gas_coverage_percentage.clone();
        let provider = provider_for_processor.clone();
        Box::pin(async move {
            let block_number = provider.get_block_number().await.unwrap_or(0);
            let selector_config = SelectorConfig {
                gas_price: Fp18::ZERO,
                gas_coverage_percentage,
                block_number,
            };
            let (outcome, attrs) = selector::process_order(
                pair,
                &registry,
                quote_oracle.as_ref(),
                external_router.as_ref(),
                native_price_oracle.as_ref(),
                executor.as_ref(),
                &selector_config,
            )
            .await;
            let record = finalize(outcome.clone(), 0, attrs, None);
            info!(outcome = ?record.outcome, "pair attempt finished");
            outcome
        })
    });

    let scheduler = Arc::new(WorkerScheduler::new(registry, config.signer_keys.len().max(1), Duration::from_millis(250)));
    let shutdown = ShutdownSignal::new();
    let shutdown_for_ctrlc = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        shutdown_for_ctrlc.cancel();
    });

    scheduler.run(processor, shutdown).await;
    info!("solver stopped");
    Ok(())
}

/// Decode `AddOrder`/`RemoveOrder` subgraph events into registry mutations.
/// Mirrors the shape rain orderbook subgraphs publish: each event carries
/// an `order` object with the wire-format order plus its orderbook.
async fn ingest_transactions(registry: &OrderRegistry, transactions: &[obarb_solver::indexer::SgTransaction]) -> usize {
    let mut ingested = 0;
    for tx in transactions {
        for event in &tx.events {
            match event.typename.as_str() {
                "AddOrder" => {
                    if let Some(order) = decode_order_event(&event.data) {
                        registry.add_order(order).await;
                        ingested += 1;
                    }
                }
                "RemoveOrder" => {
                    if let (Some(orderbook), Some(owner), Some(hash)) = (
                        event.data.pointer("/orderbook/id").and_then(|v| v.as_str()).and_then(|s| Address::from_str(s).ok()),
                        event.data.pointer("/order/owner").and_then(|v| v.as_str()).and_then(|s| Address::from_str(s).ok()),
                        event.data.pointer("/order/orderHash").and_then(|v| v.as_str()).and_then(|s| B256::from_str(s).ok()),
                    ) {
                        registry.remove_order(orderbook, owner, hash).await;
                    }
                }
                _ => {}
            }
        }
    }
    ingested
}

fn decode_order_event(data: &serde_json::Value) -> Option<Order> {
    let hash = B256::from_str(data.pointer("/order/orderHash")?.as_str()?).ok()?;
    let owner = Address::from_str(data.pointer("/order/owner")?.as_str()?).ok()?;
    let orderbook = Address::from_str(data.pointer("/orderbook/id")?.as_str()?).ok()?;
    let inputs = decode_io_list(data.pointer("/order/validInputs")?)?;
    let outputs = decode_io_list(data.pointer("/order/validOutputs")?)?;
    let interpreter = Address::from_str(data.pointer("/order/interpreter")?.as_str()?).ok()?;
    let store = Address::from_str(data.pointer("/order/store")?.as_str()?).ok()?;
    let nonce = data
        .pointer("/order/nonce")
        .and_then(|v| v.as_str())
        .and_then(|s| B256::from_str(s).ok())
        .unwrap_or_default();

    Some(Order {
        hash,
        owner,
        orderbook,
        version: OrderVersion::V4,
        inputs,
        outputs,
        evaluable: Evaluable { interpreter, store, bytecode: Vec::new() },
        nonce,
    })
}

fn decode_io_list(value: &serde_json::Value) -> Option<Vec<IoEntry>> {
    value
        .as_array()?
        .iter()
        .map(|io| {
            Some(IoEntry {
                token: Address::from_str(io.get("token")?.get("id")?.as_str()?).ok()?,
                vault_id: B256::from_str(io.get("vaultId")?.as_str()?).ok()?,
                decimals: io.get("token")?.get("decimals")?.as_u64()? as u8,
            })
        })
        .collect()
}

/// Quotes an order by calling `quote2` on its orderbook directly.
struct OnChainQuoteOracle<P> {
    provider: Arc<P>,
    registry: OrderRegistry,
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static> QuoteOracle for OnChainQuoteOracle<P> {
    async fn quote_order(&self, pair: &Pair, _block_number: u64) -> Result<ModelQuote, SolverError> {
        let order = self
            .registry
            .get_order(pair.orderbook, pair.owner, pair.order_hash)
            .ok_or_else(|| SolverError::internal("order vanished from registry before quoting"))?;

        let order_v3 = OrderV3 {
            owner: order.owner,
            evaluable: EvaluableV3 {
                interpreter: order.evaluable.interpreter,
                store: order.evaluable.store,
                bytecode: order.evaluable.bytecode.into(),
            },
            validInputs: order.inputs.iter().map(io_to_sol).collect(),
            validOutputs: order.outputs.iter().map(io_to_sol).collect(),
            nonce: order.nonce,
        };

        let contract = IOrderbookV4::new(pair.orderbook, self.provider.clone());
        let result = contract
            .quote2(QuoteConfig {
                order: order_v3,
                inputIOIndex: U256::from(pair.input_io_index as u64),
                outputIOIndex: U256::from(pair.output_io_index as u64),
                signedContext: Default::default(),
            })
            .call()
            .await
            .map_err(|e| SolverError::transport(e.to_string()))?;

        if !result.exists {
            return Ok(ModelQuote { max_output: Fp18::ZERO, ratio: Fp18::ZERO });
        }

        Ok(ModelQuote {
            max_output: Fp18::from_raw(result.maxOutput),
            ratio: Fp18::from_raw(result.ioRatio),
        })
    }
}

fn io_to_sol(entry: &IoEntry) -> IO {
    IO { token: entry.token, decimals: entry.decimals, vaultId: U256::from_be_bytes(entry.vault_id.0) }
}

/// Prices a token against the native wrapped asset via the external
/// aggregator router's single-hop quote.
struct AggregatorNativePriceOracle<S> {
    router: Arc<ExternalRouter<S>>,
    native_token: Address,
}

#[async_trait]
impl<S: obarb_solver::router::external::PoolSource + Send + Sync> NativePriceOracle for AggregatorNativePriceOracle<S> {
    async fn price_to_native(&self, token: Address, block_number: u64) -> Result<Fp18, SolverError> {
        if token == self.native_token {
            return Ok(Fp18::from_raw(U256::from(10u64).pow(U256::from(18u64))));
        }
        self.router
            .get_market_price(MarketPriceParams {
                from_token: token,
                to_token: self.native_token,
                decimals_in: 18,
                decimals_out: 18,
                block_number,
            })
            .await
    }
}
