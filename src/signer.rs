//! Signer abstraction & pool (§6, A3).
//!
//! Wraps an `alloy` local signer behind a narrow trait so the
//! transaction pipeline never depends on a concrete wallet type, then
//! pools a fixed set of them — one per in-flight attempt, released on
//! terminal state (§4.7/§4.8).
//!
//! Grounded on `executor.rs`'s `SignerMiddleware`-wrapped-wallet usage,
//! generalized behind a trait the way `router::Router` generalizes the
//! three router variants.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::consensus::TxEnvelope;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{SolverError, SolverResult};

#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;
    async fn balance(&self) -> SolverResult<U256>;
    async fn sign_tx(&self, tx: TransactionRequest) -> SolverResult<TxEnvelope>;
    async fn send_raw(&self, signed: TxEnvelope) -> SolverResult<TxHash>;
    async fn wait_receipt(&self, hash: TxHash, timeout: Duration) -> SolverResult<TransactionReceipt>;
}

/// A signer backed by a local private key, submitting through a shared
/// `alloy` provider.
pub struct LocalSigner<P> {
    wallet: PrivateKeySigner,
    provider: Arc<P>,
}

impl<P> LocalSigner<P> {
    pub fn new(wallet: PrivateKeySigner, provider: Arc<P>) -> Self {
        Self { wallet, provider }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static> Signer for LocalSigner<P> {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn balance(&self) -> SolverResult<U256> {
        self.provider
            .get_balance(self.address())
            .await
            .map_err(|e| SolverError::transport(e.to_string()))
    }

    async fn sign_tx(&self, tx: TransactionRequest) -> SolverResult<TxEnvelope> {
        let tx = tx.with_from(self.address());
        let typed_tx = tx
            .build_typed_tx()
            .map_err(|_| SolverError::compose("transaction request missing required fields"))?;
        let signed = typed_tx
            .eip1559()
            .cloned()
            .ok_or_else(|| SolverError::compose("only eip1559 transactions are supported"))?;
        use alloy::signers::Signer as _;
        let signature = self
            .wallet
            .sign_transaction(&mut signed.clone())
            .await
            .map_err(|e| SolverError::user_rejected(e.to_string()))?;
        Ok(TxEnvelope::Eip1559(signed.into_signed(signature)))
    }

    async fn send_raw(&self, signed: TxEnvelope) -> SolverResult<TxHash> {
        let bytes: Bytes = alloy::eips::eip2718::Encodable2718::encoded_2718(&signed).into();
        let pending = self
            .provider
            .send_raw_transaction(&bytes)
            .await
            .map_err(classify_send_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_receipt(&self, hash: TxHash, timeout: Duration) -> SolverResult<TransactionReceipt> {
        let fut = self.provider.get_transaction_receipt(hash);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(Some(receipt))) => Ok(receipt),
            Ok(Ok(None)) => Err(SolverError::timeout(format!("no receipt yet for {hash:#x}"))),
            Ok(Err(e)) => Err(SolverError::transport(e.to_string())),
            Err(_) => Err(SolverError::timeout(format!("receipt wait timed out for {hash:#x}"))),
        }
    }
}

fn classify_send_error<E: std::fmt::Display>(e: E) -> SolverError {
    let msg = e.to_string();
    if msg.contains("insufficient funds") {
        SolverError::insufficient_funds(msg)
    } else if msg.contains("max fee per gas") || msg.contains("fee cap") {
        SolverError::fee_cap_too_low(msg)
    } else {
        SolverError::transport(msg)
    }
}

/// A bounded pool of signers: at most one attempt may be in flight per
/// signer. Acquisition blocks until one is free; a leased signer is
/// returned to the free list when its `SignerLease` is dropped.
pub struct SignerPool {
    total: usize,
    free: Arc<Mutex<VecDeque<Arc<dyn Signer>>>>,
    notify: Arc<Notify>,
}

pub struct SignerLease {
    signer: Option<Arc<dyn Signer>>,
    free: Arc<Mutex<VecDeque<Arc<dyn Signer>>>>,
    notify: Arc<Notify>,
}

impl SignerLease {
    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_deref().expect("signer taken before drop")
    }
}

impl Drop for SignerLease {
    fn drop(&mut self) {
        if let Some(signer) = self.signer.take() {
            self.free.lock().unwrap().push_back(signer);
            self.notify.notify_one();
        }
    }
}

impl SignerPool {
    pub fn new(signers: Vec<Arc<dyn Signer>>) -> Self {
        Self {
            total: signers.len(),
            free: Arc::new(Mutex::new(signers.into())),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Acquire any free signer, blocking until one becomes available.
    pub async fn acquire(&self) -> SolverResult<SignerLease> {
        if self.total == 0 {
            return Err(SolverError::internal("signer pool is empty"));
        }
        loop {
            {
                let mut free = self.free.lock().unwrap();
                if let Some(signer) = free.pop_front() {
                    return Ok(SignerLease {
                        signer: Some(signer),
                        free: self.free.clone(),
                        notify: self.notify.clone(),
                    });
                }
            }
            self.notify.notified().await;
        }
    }
}
