//! Largest partial-fill binary search (§4.4).
//!
//! Generalizes the teacher's escalating/halving-step idiom in
//! `arbitrage/cooldown.rs` (bounded-iteration loop with a shrinking step)
//! to amount search instead of cooldown search.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use crate::error::SolverResult;
use crate::fixed_point::Fp18;

/// Number of bisection iterations, fixed per §4.4.
pub const ITERATIONS: u32 = 25;

/// Given `maximum_input` and a minimum acceptable price `ratio`, binary
/// search for the largest input amount whose quoted price meets `ratio`.
///
/// `quote_price` returns the price (`amount_out / amount_in`, both
/// fp18) for a candidate input amount. Starts at `maximum_input / 2`
/// with step `maximum_input / 4`, halving the step every iteration.
pub async fn largest_partial_fill<F, Fut>(
    maximum_input: Fp18,
    ratio: Fp18,
    mut quote_price: F,
) -> SolverResult<Option<Fp18>>
where
    F: FnMut(Fp18) -> Fut,
    Fut: std::future::Future<Output = SolverResult<Fp18>>,
{
    if maximum_input.is_zero() {
        return Ok(None);
    }

    let two = Fp18::from_raw(alloy::primitives::U256::from(2u64));
    let mut amount = maximum_input.checked_div(two)?;
    let mut step = amount.checked_div(two)?;
    let mut best: Option<Fp18> = None;

    for _ in 0..ITERATIONS {
        let price = match quote_price(amount).await {
            Ok(p) => p,
            Err(_) => Fp18::ZERO,
        };

        if price >= ratio {
            best = Some(amount);
            amount = amount.checked_add(step).unwrap_or(amount);
            if amount > maximum_input {
                amount = maximum_input;
            }
        } else {
            amount = amount.checked_sub(step).unwrap_or(Fp18::ZERO);
        }

        step = step.checked_div(two).unwrap_or(Fp18::ZERO);
        if step.is_zero() {
            break;
        }
    }

    Ok(best)
}
