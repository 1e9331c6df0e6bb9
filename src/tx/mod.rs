//! Transaction pipeline (C7): BUILD -> ESTIMATE -> SIGN -> SUBMIT ->
//! WAIT_RECEIPT -> CLASSIFY.
//!
//! Grounded on `arbitrage/executor.rs::execute` (build -> sign -> submit
//! -> await receipt -> classify) and `mempool/simulator.rs` for the
//! post-hoc reproduction-via-`eth_call` idiom.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

pub mod gas;
pub mod frontrun;
pub mod income;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::contracts::{IArbV2, IArbV3, IArbV4, IArbV5, IERC20, IOrderbookV4, INodeInterface, OrderV3, NODE_INTERFACE_ADDRESS};
use crate::error::{SolverError, SolverResult};
use crate::model::Pair;
use crate::revert::{decode_revert, SelectorRegistry};
use crate::router::TradeParams;
use crate::selector::{ExecutionOutcome, TradeExecutor};
use crate::signer::SignerPool;

use frontrun::{detect_frontrun, CandidateLog};
use gas::{classify as classify_gas, GasDiagnosis};

/// Supplies candidate `TakeOrder` logs for frontrun detection (§4.7.2),
/// kept behind a trait so `TxPipeline` stays testable without a live node.
#[async_trait]
pub trait FrontrunLogSource: Send + Sync {
    async fn candidate_logs(&self, orderbook: Address, block_number: u64) -> SolverResult<Vec<CandidateLog>>;
}

/// Reads `TakeOrder` logs for the reverted transaction's block directly
/// off the provider and decodes them with the generated event ABI.
pub struct ProviderFrontrunLogSource<P> {
    provider: Arc<P>,
}

impl<P> ProviderFrontrunLogSource<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static> FrontrunLogSource for ProviderFrontrunLogSource<P> {
    async fn candidate_logs(&self, orderbook: Address, block_number: u64) -> SolverResult<Vec<CandidateLog>> {
        let filter = Filter::new().address(orderbook).from_block(block_number).to_block(block_number);
        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| SolverError::transport(e.to_string()))?;

        let mut candidates = Vec::new();
        for log in logs {
            let topics = log.topics().to_vec();
            if topics.first() != Some(&IOrderbookV4::TakeOrder::SIGNATURE_HASH) {
                continue;
            }
            let Ok(decoded) = IOrderbookV4::TakeOrder::decode_raw_log(topics, &log.data().data, true) else {
                continue;
            };
            candidates.push(CandidateLog {
                tx_hash: log.transaction_hash.unwrap_or_default(),
                transaction_index: log.transaction_index.unwrap_or_default(),
                order_config_hash: order_config_hash(&decoded.config),
            });
        }
        Ok(candidates)
    }
}

/// Stand-in for "structurally equals" comparison between order configs:
/// the keccak of the abi-encoded struct, compared against our own order
/// hashes (themselves content hashes of the same struct on-chain).
fn order_config_hash(order: &OrderV3) -> B256 {
    alloy::primitives::keccak256(order.abi_encode())
}

/// Which orderbook generation's arb entrypoint to call. Derived from
/// (orderbook version, router variant, is-partial-fill) per the open
/// question in the design notes; the mapping is centralized in
/// `arb_version_for` so the rest of the pipeline is oblivious to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbVersion {
    V2,
    V3,
    V4,
    V5,
}

/// Router variant used to compose the winning trade, needed only to
/// select the arb entrypoint (§9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterVariant {
    External,
    Intra,
    Inter,
}

/// Resolve which arb entrypoint a given orderbook generation + router
/// variant + partial-fill combination should call. `arb2`/`arb3` serve
/// orderbook v3/v4-era deployments without native partial-fill support;
/// `arb4`/`arb5` serve the generation that added it. Intra-orderbook
/// clears never partial-fill across two full orders, so they always use
/// the non-partial entrypoint for their generation.
pub fn arb_version_for(orderbook_is_v4: bool, variant: RouterVariant, is_partial: bool) -> ArbVersion {
    match (orderbook_is_v4, variant, is_partial) {
        (false, _, false) => ArbVersion::V2,
        (false, _, true) => ArbVersion::V3,
        (true, RouterVariant::Intra, _) => ArbVersion::V4,
        (true, _, _) => ArbVersion::V5,
    }
}

fn encode_arb_call(version: ArbVersion, orderbook: Address, take_orders: Bytes, task: Bytes) -> Bytes {
    match version {
        ArbVersion::V2 => IArbV2::arb2Call { orderbook, takeOrdersConfig: take_orders, task }.abi_encode().into(),
        ArbVersion::V3 => IArbV3::arb3Call { orderbook, takeOrdersConfig: take_orders, task }.abi_encode().into(),
        ArbVersion::V4 => IArbV4::arb4Call { orderbook, takeOrdersConfig: take_orders, task }.abi_encode().into(),
        ArbVersion::V5 => IArbV5::arb5Call { orderbook, takeOrdersConfig: take_orders, task }.abi_encode().into(),
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub tx_hash: String,
    pub income: HashMap<Address, U256>,
}

/// Scan a receipt's logs for ERC-20 `Transfer`s and the orderbook's
/// `AfterClear` event, the two sources `income::extract_income` reads.
fn scan_income_logs(logs: &[Log]) -> (Vec<income::TransferLog>, Option<income::AfterClearLog>) {
    let mut transfers = Vec::new();
    let mut after_clear = None;

    for log in logs {
        let topics = log.topics().to_vec();
        match topics.first() {
            Some(sig) if *sig == IERC20::Transfer::SIGNATURE_HASH => {
                if let Ok(decoded) = IERC20::Transfer::decode_raw_log(topics, &log.data().data, true) {
                    transfers.push(income::TransferLog {
                        token: log.address,
                        to: decoded.to,
                        value: decoded.value,
                    });
                }
            }
            Some(sig) if *sig == IOrderbookV4::AfterClear::SIGNATURE_HASH => {
                if let Ok(decoded) = IOrderbookV4::AfterClear::decode_raw_log(topics, &log.data().data, true) {
                    after_clear = Some(income::AfterClearLog { alice_output: decoded.aliceOutput });
                }
            }
            _ => {}
        }
    }

    (transfers, after_clear)
}

pub struct TxPipelineConfig {
    pub arb_contract: Address,
    pub gas_price: U256,
    pub receipt_timeout: Duration,
    pub is_arbitrum: bool,
}

/// Transaction pipeline over a generic provider and selector registry.
pub struct TxPipeline<P> {
    provider: Arc<P>,
    signers: SignerPool,
    selector_registry: Arc<dyn SelectorRegistry>,
    frontrun_log_source: Arc<dyn FrontrunLogSource>,
    config: TxPipelineConfig,
}

impl<P: Provider + Send + Sync + 'static> TxPipeline<P> {
    pub fn new(
        provider: Arc<P>,
        signers: SignerPool,
        selector_registry: Arc<dyn SelectorRegistry>,
        frontrun_log_source: Arc<dyn FrontrunLogSource>,
        config: TxPipelineConfig,
    ) -> Self {
        Self { provider, signers, selector_registry, frontrun_log_source, config }
    }

    async fn estimate_gas(&self, tx: &TransactionRequest, to: Address, data: Bytes) -> SolverResult<(u64, u64)> {
        let l2_gas = self
            .provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|e| SolverError::transport(e.to_string()))?;

        let l1_gas = if self.config.is_arbitrum {
            let node_interface: Address = NODE_INTERFACE_ADDRESS.parse().unwrap_or(Address::ZERO);
            let contract = INodeInterface::new(node_interface, self.provider.clone());
            match contract.gasEstimateL1Component(to, false, data).call().await {
                Ok(result) => result.gasEstimateForL1,
                Err(e) => {
                    warn!(error = %e, "L1 gas estimate failed, proceeding with L2-only estimate");
                    0
                }
            }
        } else {
            0
        };

        Ok((l2_gas, l1_gas))
    }

    async fn run(&self, pair: &Pair, trade: TradeParams, orderbook_is_v4: bool, variant: RouterVariant) -> SolverResult<PipelineOutcome> {
        // BUILD
        let version = arb_version_for(orderbook_is_v4, variant, trade.counterparty_hash.is_some());
        let task = trade.take_orders_calldata.clone();
        let calldata = encode_arb_call(version, pair.orderbook, Bytes::from(Vec::new()), Bytes::from(task));

        let lease = self.signers.acquire().await?;
        let signer = lease.signer();

        let tx = TransactionRequest::default()
            .with_to(self.config.arb_contract)
            .with_input(calldata.clone())
            .with_value(U256::ZERO)
            .with_gas_price(self.config.gas_price.to::<u128>());

        // ESTIMATE
        let (l2_gas, _l1_gas) = self.estimate_gas(&tx, self.config.arb_contract, calldata.clone()).await?;
        let tx = tx.with_gas_limit(l2_gas);

        // SIGN
        let signed = signer.sign_tx(tx).await?;

        // SUBMIT
        let tx_hash = signer.send_raw(signed).await?;

        // WAIT_RECEIPT
        let receipt = signer.wait_receipt(tx_hash, self.config.receipt_timeout).await?;

        // CLASSIFY
        if receipt.status() {
            let (transfers, after_clear) = scan_income_logs(receipt.logs());
            let income = income::extract_income(signer.address(), pair.orderbook, &transfers, after_clear.as_ref());
            info!(tx_hash = %tx_hash, income = ?income, "clearing transaction confirmed");
            Ok(PipelineOutcome { tx_hash: format!("{tx_hash:#x}"), income })
        } else {
            let balance = signer.balance().await.unwrap_or(U256::ZERO);
            let gas_used = receipt.gas_used;
            let effective_price = U256::from(receipt.effective_gas_price);
            let gas_limit = l2_gas;
            let diagnosis = classify_gas(gas_used, effective_price, gas_limit, balance);

            let revert_data = reproduce_revert(self.provider.as_ref(), &tx_for_replay(&calldata, self.config.arb_contract), receipt.block_number)
                .await
                .unwrap_or_default();

            let decoded = if revert_data.is_empty() {
                "unknown revert (no data returned by eth_call)".to_string()
            } else {
                decode_revert(&revert_data, self.selector_registry.as_ref())
                    .await
                    .map(|d| d.reason)
                    .unwrap_or_else(|e| e.to_string())
            };

            let gas_note = match diagnosis {
                GasDiagnosis::AccountRanOutOfGas => " (account ran out of gas)",
                GasDiagnosis::TransactionRanOutOfSpecifiedGas => " (transaction ran out of specified gas)",
                GasDiagnosis::None => "",
            };

            let mut our_order_config_hashes = vec![pair.order_hash];
            if let Some(counterparty_hash) = trade.counterparty_hash {
                our_order_config_hashes.push(counterparty_hash);
            }
            let frontrun_note = match self.frontrun_log_source.candidate_logs(pair.orderbook, receipt.block_number.unwrap_or_default()).await {
                Ok(candidates) => detect_frontrun(receipt.transaction_index.unwrap_or_default(), &our_order_config_hashes, &candidates)
                    .map(|hash| format!(" (actual cause: current transaction has been actually frontrun by transaction with hash {hash:#x})")),
                Err(e) => {
                    warn!(error = %e, "frontrun log lookup failed, skipping");
                    None
                }
            }
            .unwrap_or_default();

            Err(SolverError::node_reverted(format!("{decoded}{gas_note}{frontrun_note}")))
        }
    }
}

fn tx_for_replay(calldata: &Bytes, to: Address) -> TransactionRequest {
    TransactionRequest::default().with_to(to).with_input(calldata.clone())
}

async fn reproduce_revert<P: Provider + Send + Sync + 'static>(
    provider: &P,
    tx: &TransactionRequest,
    block_number: Option<u64>,
) -> SolverResult<String> {
    let mut call = provider.call(tx.clone());
    if let Some(block) = block_number {
        call = call.block(block.into());
    }
    match call.await {
        Ok(_) => Ok(String::new()),
        Err(e) => {
            let msg = e.to_string();
            // alloy surfaces revert data embedded in the error message for
            // most transports; extract the hex payload if present.
            if let Some(start) = msg.find("0x") {
                Ok(msg[start..].to_string())
            } else {
                Ok(String::new())
            }
        }
    }
}

/// Adapts `TxPipeline` to the `selector::TradeExecutor` trait the trade
/// selector pipeline (C6) depends on.
pub struct TxPipelineExecutor<P> {
    pub pipeline: TxPipeline<P>,
    pub orderbook_is_v4: bool,
    pub variant: RouterVariant,
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static> TradeExecutor for TxPipelineExecutor<P> {
    async fn execute(&self, pair: &Pair, trade: TradeParams) -> Result<ExecutionOutcome, SolverError> {
        self.pipeline
            .run(pair, trade, self.orderbook_is_v4, self.variant)
            .await
            .map(|outcome| ExecutionOutcome { tx_hash: outcome.tx_hash, income: outcome.income })
    }
}
