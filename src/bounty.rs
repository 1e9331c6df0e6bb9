//! Bounty-ensure task builder (C5).
//!
//! Every clearing transaction carries a post-execution guard expressed in
//! the deployer's expression language. This module instantiates one of
//! two templates with literal parameters, submits the text to the
//! deployer's `parse2`, and returns bytecode.
//!
//! Grounded on `contracts.rs`'s `sol!` typed-call pattern for the
//! deployer call, and on `multicall_quoter.rs`'s "template + external
//! parse/encode" shape.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::Address;
use alloy::providers::Provider;
use std::sync::Arc;

use crate::contracts::IExpressionDeployerV3;
use crate::error::{SolverError, SolverResult};
use crate::fixed_point::Fp18;

/// Which side of the arb this transaction represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountyTemplate {
    /// Our bot is both sides of the arb (external-router or intra-orderbook route).
    External,
    /// Clearing against another orderbook's order (inter-orderbook route).
    Internal,
}

/// Literal parameters substituted into the chosen template before parsing.
#[derive(Debug, Clone)]
pub struct BountyParams {
    pub sender: Address,
    pub input_to_eth_price: Fp18,
    pub output_to_eth_price: Fp18,
    pub minimum_expected: Fp18,
}

fn format_price(price: Fp18) -> String {
    // 18-decimal literal string, e.g. "1234567890123456789"
    price.raw().to_string()
}

fn format_address(address: Address) -> SolverResult<String> {
    let hex = format!("{:#x}", address);
    if hex.len() != 42 {
        return Err(SolverError::compose("sender address is not a valid 20-byte address"));
    }
    Ok(hex)
}

fn external_template(params: &BountyParams) -> SolverResult<String> {
    if params.sender == Address::ZERO {
        return Err(SolverError::compose("empty sender address in bounty template"));
    }
    let sender = format_address(params.sender)?;
    Ok(format!(
        "/* external bounty guard */\n\
         :ensure(equal-to(sender() {sender})),\n\
         total-bounty-eth: add(\n\
           mul({input_price} context<1 0>())\n\
           mul({output_price} context<1 1>())\n\
         ),\n\
         :ensure(greater-than(total-bounty-eth {minimum}));",
        sender = sender,
        input_price = format_price(params.input_to_eth_price),
        output_price = format_price(params.output_to_eth_price),
        minimum = format_price(params.minimum_expected),
    ))
}

fn internal_template(params: &BountyParams) -> SolverResult<String> {
    if params.sender == Address::ZERO {
        return Err(SolverError::compose("empty sender address in bounty template"));
    }
    let sender = format_address(params.sender)?;
    Ok(format!(
        "/* internal bounty guard */\n\
         :ensure(equal-to(sender() {sender})),\n\
         input-delta: sub(after-balance<0>() before-balance<0>()),\n\
         output-delta: sub(after-balance<1>() before-balance<1>()),\n\
         total-bounty-eth: add(\n\
           mul({input_price} input-delta)\n\
           mul({output_price} output-delta)\n\
         ),\n\
         :ensure(greater-than(total-bounty-eth {minimum}));",
        sender = sender,
        input_price = format_price(params.input_to_eth_price),
        output_price = format_price(params.output_to_eth_price),
        minimum = format_price(params.minimum_expected),
    ))
}

/// Instantiate the chosen template, submit it to the deployer's `parse2`,
/// and return the resulting guard bytecode.
pub async fn build_bounty_task<P: Provider + Send + Sync + 'static>(
    provider: Arc<P>,
    deployer: Address,
    template: BountyTemplate,
    params: &BountyParams,
) -> SolverResult<Vec<u8>> {
    let text = match template {
        BountyTemplate::External => external_template(params)?,
        BountyTemplate::Internal => internal_template(params)?,
    };

    let deployer_contract = IExpressionDeployerV3::new(deployer, provider);
    let bytecode = deployer_contract
        .parse2(text.into_bytes().into())
        .call()
        .await
        .map_err(|e| SolverError::parse(format!("deployer rejected bounty task: {e}")))?;

    Ok(bytecode.bytecode.to_vec())
}
