//! End-to-end scenario tests exercising the crate's public API together,
//! rather than one collaborator at a time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use obarb_solver::downtime::capture_downtime;
use obarb_solver::error::SolverError;
use obarb_solver::fixed_point::Fp18;
use obarb_solver::model::{Evaluable, IoEntry, Order, OrderVersion, Pair, Quote};
use obarb_solver::registry::OrderRegistry;
use obarb_solver::revert::{decode_revert, SelectorRegistry};
use obarb_solver::router::external::{ExternalRouter, PoolSource};
use obarb_solver::router::TradeParams;
use obarb_solver::selector::{process_order, ExecutionOutcome, NativePriceOracle, QuoteOracle, SelectorConfig, TradeExecutor};
use obarb_solver::telemetry::{PairOutcome, TxFailureKind};

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

struct NonZeroQuoteOracle;
#[async_trait]
impl QuoteOracle for NonZeroQuoteOracle {
    async fn quote_order(&self, _pair: &Pair, _block_number: u64) -> Result<Quote, SolverError> {
        Ok(Quote {
            max_output: Fp18::from_raw(U256::from(10u64).pow(U256::from(18))),
            ratio: Fp18::from_raw(U256::from(2u64) * U256::from(10u64).pow(U256::from(18))),
        })
    }
}

struct FixedPriceOracle(Fp18);
#[async_trait]
impl NativePriceOracle for FixedPriceOracle {
    async fn price_to_native(&self, _token: Address, _block_number: u64) -> Result<Fp18, SolverError> {
        Ok(self.0)
    }
}

struct FixedPoolSource {
    amount_out: U256,
}
#[async_trait]
impl PoolSource for FixedPoolSource {
    async fn pools_for(&self, _from: Address, _to: Address, _up_to_block: u64) -> Result<Vec<(Address, String)>, SolverError> {
        Ok(vec![(addr(99), "test-pool".to_string())])
    }
    async fn quote_amount_out(&self, _pool: Address, _from: Address, _to: Address, _amount_in: U256) -> Result<U256, SolverError> {
        Ok(self.amount_out)
    }
}

struct SuccessExecutor;
#[async_trait]
impl TradeExecutor for SuccessExecutor {
    async fn execute(&self, pair: &Pair, _trade: TradeParams) -> Result<ExecutionOutcome, SolverError> {
        let mut income = HashMap::new();
        income.insert(pair.buy_token, U256::from(1_000u64));
        Ok(ExecutionOutcome { tx_hash: "0xdeadbeef".to_string(), income })
    }
}

/// Stands in for a reverted on-chain clear whose revert reason already
/// carries the C7 pipeline's "actual cause" frontrun note, the way
/// `TxPipeline::run` renders one once `ProviderFrontrunLogSource` finds a
/// matching lower-index `TakeOrder` log in the same block.
struct FrontrunRevertingExecutor;
#[async_trait]
impl TradeExecutor for FrontrunRevertingExecutor {
    async fn execute(&self, _pair: &Pair, _trade: TradeParams) -> Result<ExecutionOutcome, SolverError> {
        Err(SolverError::node_reverted(
            "MinimumOutput (actual cause: current transaction has been actually frontrun by transaction with hash 0x9999)",
        ))
    }
}

#[tokio::test]
async fn test_scenario_happy_path_external_route_clears() {
    let registry = OrderRegistry::new();
    registry.add_order(sample_order()).await;

    let external_router = ExternalRouter::new(
        FixedPoolSource { amount_out: U256::from(10u64).pow(U256::from(18)) * U256::from(3u64) },
        HashSet::new(),
    );
    external_router.fetch_pools(addr(3), addr(4), 1, false).await.unwrap();

    let config = SelectorConfig { gas_price: Fp18::ZERO, gas_coverage_percentage: "100".to_string(), block_number: 1 };
    let native_price = FixedPriceOracle(Fp18::from_raw(U256::from(10u64).pow(U256::from(18))));

    let (outcome, _attrs) = process_order(
        sample_pair(),
        &registry,
        &NonZeroQuoteOracle,
        &external_router,
        &native_price,
        &SuccessExecutor,
        &config,
    )
    .await;

    match outcome {
        PairOutcome::FoundOpportunity { tx_hash, income } => {
            assert_eq!(tx_hash, "0xdeadbeef");
            assert_eq!(income.get(&addr(4)), Some(&U256::from(1_000u64)));
        }
        other => panic!("expected FoundOpportunity, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scenario_revert_with_frontrun_attaches_cause() {
    let registry = OrderRegistry::new();
    registry.add_order(sample_order()).await;

    let external_router = ExternalRouter::new(FixedPoolSource { amount_out: U256::ZERO }, HashSet::new());
    let config = SelectorConfig { gas_price: Fp18::ZERO, gas_coverage_percentage: "100".to_string(), block_number: 1 };
    let native_price = FixedPriceOracle(Fp18::from_raw(U256::from(10u64).pow(U256::from(18))));

    let (outcome, _attrs) = process_order(
        sample_pair(),
        &registry,
        &NonZeroQuoteOracle,
        &external_router,
        &native_price,
        &FrontrunRevertingExecutor,
        &config,
    )
    .await;

    match outcome {
        PairOutcome::TxFailed { classification: TxFailureKind::Reverted { frontrun_by, .. } } => {
            assert_eq!(frontrun_by, Some("0x9999".to_string()));
        }
        other => panic!("expected a reverted outcome with a frontrun cause, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scenario_downtime_with_gap_over_window() {
    // §8 scenario: events at 900_000s and 970_000s, 1-hour cycles, window
    // 900_000..1_000_000s — the trailing stretch with no events is down.
    let report = capture_downtime(&[900_000, 970_000], 900_000, 1_000_000, 3_600);
    assert!(report.total_downtime_secs > 0);
    assert!(report.downtime_occurrences > 0);
}

#[tokio::test]
async fn test_scenario_selector_cache_single_flight_across_concurrent_lookups() {
    struct CountingRegistry {
        calls: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl SelectorRegistry for CountingRegistry {
        async fn fetch_signatures(&self, _selector: [u8; 4]) -> Result<Vec<String>, SolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(vec!["ZeroAmount()".to_string()])
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(CountingRegistry { calls: calls.clone() });

    let selector_bytes: [u8; 4] = [0x55, 0x66, 0x77, 0x88];
    let data = format!("0x{}{}", hex::encode(selector_bytes), "0".repeat(64));

    let r1 = registry.clone();
    let d1 = data.clone();
    let r2 = registry.clone();
    let d2 = data.clone();

    let (res1, res2) = tokio::join!(decode_revert(&d1, r1.as_ref()), decode_revert(&d2, r2.as_ref()));

    assert!(res1.is_ok());
    assert!(res2.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

mod hex {
    pub fn encode(bytes: [u8; 4]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
