//! Normalized 18-decimal fixed point (C1)
//!
//! Every monetary quantity inside the solver is carried as an unsigned
//! 18-decimal fixed-point integer, backed by `alloy`'s 256-bit `U256`.
//! Conversions to/from token-native decimals and the v4 wire float format
//! are explicit — nothing here ever panics, and nothing rounds up.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::U256;
use std::fmt;

use crate::error::{SolverError, SolverResult};

/// Fixed decimal precision used for all internal monetary quantities.
pub const DECIMALS: u32 = 18;

/// A non-negative 18-decimal fixed-point number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Fp18(pub U256);

impl Fp18 {
    pub const ZERO: Fp18 = Fp18(U256::ZERO);

    pub fn from_raw(value: U256) -> Self {
        Fp18(value)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Fp18) -> SolverResult<Fp18> {
        self.0
            .checked_add(other.0)
            .map(Fp18)
            .ok_or_else(|| SolverError::internal("fp18 addition overflow"))
    }

    pub fn checked_sub(&self, other: Fp18) -> SolverResult<Fp18> {
        self.0
            .checked_sub(other.0)
            .map(Fp18)
            .ok_or_else(|| SolverError::internal("fp18 subtraction underflow"))
    }

    pub fn checked_mul(&self, other: Fp18) -> SolverResult<Fp18> {
        // a * b is computed in 18-decimal space: (a_raw * b_raw) / 1e18
        let product = self
            .0
            .checked_mul(other.0)
            .ok_or_else(|| SolverError::internal("fp18 multiplication overflow"))?;
        Ok(Fp18(product / one_e18()))
    }

    pub fn checked_div(&self, other: Fp18) -> SolverResult<Fp18> {
        if other.0.is_zero() {
            return Err(SolverError::internal("fp18 division by zero"));
        }
        let scaled = self
            .0
            .checked_mul(one_e18())
            .ok_or_else(|| SolverError::internal("fp18 division overflow"))?;
        Ok(Fp18(scaled / other.0))
    }
}

impl fmt::Display for Fp18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn one_e18() -> U256 {
    U256::from(10u64).pow(U256::from(DECIMALS))
}

fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals as u64))
}

/// Widen a token-native integer amount to 18-decimal fixed point.
///
/// `decimals` is the token's own decimal count (e.g. 6 for USDC, 18 for WETH).
pub fn scale_to_18(raw: U256, decimals: u8) -> SolverResult<Fp18> {
    if decimals as u32 == DECIMALS {
        return Ok(Fp18(raw));
    }
    if (decimals as u32) < DECIMALS {
        let factor = pow10(DECIMALS as u8 - decimals);
        raw.checked_mul(factor)
            .map(Fp18)
            .ok_or_else(|| SolverError::internal("scale_to_18 overflow"))
    } else {
        let factor = pow10(decimals - DECIMALS as u8);
        Ok(Fp18(raw / factor))
    }
}

/// Narrow an 18-decimal fixed-point amount back to a token-native integer.
///
/// Truncates toward zero; fails only when narrowing would require widening
/// (i.e. `decimals > 18`) and the conversion overflows — it never rounds up.
pub fn scale_from_18(value: Fp18, decimals: u8) -> SolverResult<U256> {
    if decimals as u32 == DECIMALS {
        return Ok(value.0);
    }
    if (decimals as u32) < DECIMALS {
        let factor = pow10(DECIMALS as u8 - decimals);
        Ok(value.0 / factor)
    } else {
        let factor = pow10(decimals - DECIMALS as u8);
        value
            .0
            .checked_mul(factor)
            .map(|v| v)
            .ok_or_else(|| SolverError::internal("scale_from_18 overflow"))
    }
}

/// Parse a v4 wire-format 32-byte float (itself an 18-decimal fixed point
/// value, already normalized) into an `Fp18`.
pub fn parse_float(bytes32: [u8; 32]) -> SolverResult<Fp18> {
    Ok(Fp18(U256::from_be_bytes(bytes32)))
}

/// Denormalize an `Fp18` back into the v4 32-byte wire format.
pub fn to_float(value: Fp18) -> [u8; 32] {
    value.0.to_be_bytes()
}

/// `(amount_out_fp18 * 1e18) / amount_in_fp18`, expressed directly from raw
/// token-native amounts and their decimals.
pub fn price18(
    amount_in_raw: U256,
    amount_out_raw: U256,
    decimals_in: u8,
    decimals_out: u8,
) -> SolverResult<Fp18> {
    let amount_in = scale_to_18(amount_in_raw, decimals_in)?;
    let amount_out = scale_to_18(amount_out_raw, decimals_out)?;
    if amount_in.is_zero() {
        return Err(SolverError::internal("price18: zero amount_in"));
    }
    amount_out.checked_div(amount_in)
}
