//! Gas sufficiency classification (§4.7.1).
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::U256;

/// Local gas diagnosis attached to a reverted attempt, in addition to the
/// decoded revert reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasDiagnosis {
    AccountRanOutOfGas,
    TransactionRanOutOfSpecifiedGas,
    None,
}

/// Fraction of `gas_limit` at/above which a revert is classified as
/// "ran out of specified gas", expressed as a (numerator, denominator)
/// pair to stay in integer arithmetic.
const OUT_OF_GAS_NUMERATOR: u64 = 98;
const OUT_OF_GAS_DENOMINATOR: u64 = 100;

/// Classify gas sufficiency from a receipt and the original transaction.
pub fn classify(
    gas_used: u64,
    effective_gas_price: U256,
    gas_limit: u64,
    signer_balance: U256,
) -> GasDiagnosis {
    if U256::from(gas_used) * U256::from(OUT_OF_GAS_DENOMINATOR)
        >= U256::from(gas_limit) * U256::from(OUT_OF_GAS_NUMERATOR)
    {
        return GasDiagnosis::TransactionRanOutOfSpecifiedGas;
    }
    let cost = U256::from(gas_used).saturating_mul(effective_gas_price);
    if cost > signer_balance {
        return GasDiagnosis::AccountRanOutOfGas;
    }
    GasDiagnosis::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_ran_out_of_gas_when_cost_exceeds_balance() {
        let diagnosis = classify(100_000, U256::from(1_000_000_000u64), 200_000, U256::from(1u64));
        assert_eq!(diagnosis, GasDiagnosis::AccountRanOutOfGas);
    }

    #[test]
    fn test_ran_out_of_specified_gas_at_threshold() {
        let diagnosis = classify(196_000, U256::from(1u64), 200_000, U256::from(u128::MAX));
        assert_eq!(diagnosis, GasDiagnosis::TransactionRanOutOfSpecifiedGas);
    }

    #[test]
    fn test_monotonicity_regardless_of_balance() {
        // gas_used >= 98% of gas_limit always yields the same classification,
        // even when the balance check would also fire (nonzero price, zero
        // balance) — the gas-limit check must take priority over it.
        let diagnosis = classify(196_000, U256::from(1_000_000_000u64), 200_000, U256::ZERO);
        assert_eq!(diagnosis, GasDiagnosis::TransactionRanOutOfSpecifiedGas);
    }

    #[test]
    fn test_no_local_gas_error_under_threshold() {
        let diagnosis = classify(100_000, U256::from(1u64), 200_000, U256::from(u128::MAX));
        assert_eq!(diagnosis, GasDiagnosis::None);
    }
}
