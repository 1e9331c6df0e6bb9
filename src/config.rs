//! Configuration loading (A1).
//!
//! CLI flags via `clap` (`derive` + `env`), `.env` loaded first via
//! `dotenv`, following the same layering the teacher's `backfill_events.rs`
//! binary uses.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::Address;
use clap::Parser;
use std::str::FromStr;

use crate::error::{SolverError, SolverResult};

#[derive(Debug, Clone, Parser)]
#[command(name = "obarb-solver", about = "Arbitrage solver for an on-chain order-book protocol")]
pub struct SolverConfig {
    /// WebSocket or IPC RPC endpoint for the target chain.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: String,

    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: u64,

    /// Comma-separated private keys, one per funded signer account.
    #[arg(long, env = "SIGNER_KEYS", value_delimiter = ',')]
    pub signer_keys: Vec<String>,

    /// One or more `chain=url` subgraph endpoints to ingest orders from.
    #[arg(long = "subgraph", env = "SUBGRAPH_URLS", value_delimiter = ',')]
    pub subgraph_urls: Vec<String>,

    #[arg(long, env = "SELECTOR_REGISTRY_URL")]
    pub selector_registry_url: String,

    #[arg(long, env = "ARB_CONTRACT")]
    pub arb_contract: String,

    #[arg(long, env = "DEPLOYER_CONTRACT")]
    pub deployer_contract: String,

    #[arg(long, env = "AGGREGATOR_ROUTER")]
    pub aggregator_router: String,

    /// Wrapped native-asset token address, used as the `to_token` when
    /// pricing an order's input/output tokens against the chain's gas
    /// asset (§4.6 step 5).
    #[arg(long, env = "NATIVE_TOKEN")]
    pub native_token: String,

    /// Percentage of an order's output that must be covered by estimated
    /// eth-priced bounty for the trade to be considered opportunity; `"0"`
    /// disables the eth-price requirement entirely (§4.6 step 5).
    #[arg(long, env = "GAS_COVERAGE_PERCENTAGE", default_value = "100")]
    pub gas_coverage_percentage: String,

    #[arg(long, env = "RECEIPT_TIMEOUT_SECS", default_value_t = 120)]
    pub receipt_timeout_secs: u64,

    #[arg(long, env = "IS_ARBITRUM", default_value_t = false)]
    pub is_arbitrum: bool,

    /// Lowercased pool addresses excluded from every route search.
    #[arg(long, env = "POOL_BLACKLIST", value_delimiter = ',')]
    pub pool_blacklist: Vec<String>,
}

impl SolverConfig {
    pub fn load() -> SolverResult<Self> {
        dotenv::dotenv().ok();
        Ok(Self::parse())
    }

    pub fn arb_contract_address(&self) -> SolverResult<Address> {
        Address::from_str(&self.arb_contract).map_err(|e| SolverError::parse(format!("ARB_CONTRACT: {e}")))
    }

    pub fn deployer_contract_address(&self) -> SolverResult<Address> {
        Address::from_str(&self.deployer_contract).map_err(|e| SolverError::parse(format!("DEPLOYER_CONTRACT: {e}")))
    }

    pub fn aggregator_router_address(&self) -> SolverResult<Address> {
        Address::from_str(&self.aggregator_router).map_err(|e| SolverError::parse(format!("AGGREGATOR_ROUTER: {e}")))
    }

    pub fn native_token_address(&self) -> SolverResult<Address> {
        Address::from_str(&self.native_token).map_err(|e| SolverError::parse(format!("NATIVE_TOKEN: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_minimal_args() {
        let config = SolverConfig::parse_from([
            "obarb-solver",
            "--rpc-url",
            "wss://example",
            "--chain-id",
            "1",
            "--selector-registry-url",
            "https://example/selectors",
            "--arb-contract",
            "0x0000000000000000000000000000000000000001",
            "--deployer-contract",
            "0x0000000000000000000000000000000000000002",
            "--aggregator-router",
            "0x0000000000000000000000000000000000000003",
            "--native-token",
            "0x0000000000000000000000000000000000000004",
        ]);
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.gas_coverage_percentage, "100");
    }

    #[test]
    fn test_invalid_arb_contract_is_parse_error() {
        let config = SolverConfig::parse_from([
            "obarb-solver",
            "--rpc-url",
            "wss://example",
            "--chain-id",
            "1",
            "--selector-registry-url",
            "https://example/selectors",
            "--arb-contract",
            "not-an-address",
            "--deployer-contract",
            "0x0000000000000000000000000000000000000002",
            "--aggregator-router",
            "0x0000000000000000000000000000000000000003",
            "--native-token",
            "0x0000000000000000000000000000000000000004",
        ]);
        assert!(config.arb_contract_address().is_err());
    }
}
