//! # Stable-swap invariant math
//!
//! Integer Newton iterations for the two-coin stable-swap invariant `D` and for the
//! post-trade balance `y`, plus the exchange-rate probe used to derive a missing USD price.
//!
//! The amplification convention is `Ann = A * N` (N = 2). Balances of tokens with different
//! decimals are first normalised to the larger of the two precisions.
//!
//! All intermediate values are arbitrary-precision integers: `D^3` overflows 256 bits for
//! realistic 18-decimal reserves.

use crate::pool_registry::RegistryEntry;
use crate::types::conversions::pow10;
use crate::types::TokenAmount;
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

const N_COINS: u32 = 2;
const MAX_ITERATIONS: usize = 255;
/// Smallest probe trade, in raw token-0 units.
const MIN_PROBE_AMOUNT: u64 = 10_000;

fn converged(a: &BigInt, b: &BigInt) -> bool {
    (a - b).abs() <= BigInt::one()
}

/// Stable-swap invariant `D` for balances `amount_a`, `amount_b`.
///
/// Returns `None` when the invariant is undefined (zero amplification or one empty side).
pub fn compute_d(amp: &BigUint, amount_a: &BigUint, amount_b: &BigUint) -> Option<BigUint> {
    if amp.is_zero() {
        return None;
    }
    let sum = amount_a + amount_b;
    if sum.is_zero() {
        return Some(BigUint::zero());
    }
    if amount_a.is_zero() || amount_b.is_zero() {
        return None;
    }

    let n = BigInt::from(N_COINS);
    let ann = BigInt::from(amp.clone()) * &n;
    let a = BigInt::from(amount_a.clone());
    let b = BigInt::from(amount_b.clone());
    let s = BigInt::from(sum);

    let mut d = s.clone();
    for _ in 0..MAX_ITERATIONS {
        let mut d_p = d.clone();
        d_p = &d_p * &d / (&a * &n);
        d_p = &d_p * &d / (&b * &n);

        let d_prev = d.clone();
        let numerator = &d * (&ann * &s + &d_p * &n);
        let denominator = &d * (&ann - BigInt::one()) + &d_p * (&n + BigInt::one());
        if denominator <= BigInt::zero() {
            return None;
        }
        d = numerator / denominator;

        if converged(&d, &d_prev) {
            break;
        }
    }

    d.to_biguint()
}

/// Balance of the other coin after the first coin's balance becomes `x`, keeping `d` fixed.
pub fn compute_y(amp: &BigUint, x: &BigUint, d: &BigUint) -> Option<BigUint> {
    if amp.is_zero() || x.is_zero() {
        return None;
    }

    let n = BigInt::from(N_COINS);
    let ann = BigInt::from(amp.clone()) * &n;
    let x = BigInt::from(x.clone());
    let d = BigInt::from(d.clone());

    // y^2 + b*y = c
    let b = &x + &d / &ann - &d;
    let c = &d * &d * &d / (&n * &n * &x * &ann);

    let mut y = d.clone();
    for _ in 0..MAX_ITERATIONS {
        let y_prev = y.clone();
        let denominator = BigInt::from(2) * &y + &b;
        if denominator <= BigInt::zero() {
            return None;
        }
        y = (&y * &y + &c) / denominator;

        if converged(&y, &y_prev) {
            break;
        }
    }

    y.to_biguint()
}

/// Outcome of swapping token 0 into token 1 against current reserves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub input: TokenAmount,
    pub output_before_fees: TokenAmount,
    /// Trade fee charged on the output side.
    pub fee: TokenAmount,
    pub output: TokenAmount,
}

/// Quotes a token-0 → token-1 swap of `input_raw` raw units.
///
/// Returns `None` when the invariant is undefined or the pool cannot pay anything out.
pub fn estimate_swap_output(
    registry: &RegistryEntry,
    reserves: &[TokenAmount; 2],
    input_raw: &BigUint,
) -> Option<SwapQuote> {
    let [from, to] = reserves;
    let precision = from.decimals.max(to.decimals) as u32;
    let from_mult = pow10(precision - from.decimals as u32);
    let to_mult = pow10(precision - to.decimals as u32);

    let from_norm = &from.raw * &from_mult;
    let to_norm = &to.raw * &to_mult;

    let d = compute_d(&registry.amp_factor, &from_norm, &to_norm)?;
    let new_from = (&from.raw + input_raw) * &from_mult;
    let new_to = compute_y(&registry.amp_factor, &new_from, &d)?;
    if new_to >= to_norm {
        return None;
    }

    let before_fees = (to_norm - new_to) / &to_mult;
    if before_fees.is_zero() {
        return None;
    }

    let trade_fee = &registry.fees.trade;
    let fee = (BigInt::from(before_fees.clone()) * trade_fee.numer() / trade_fee.denom())
        .to_biguint()
        .unwrap_or_default();
    let output = if fee >= before_fees {
        BigUint::zero()
    } else {
        &before_fees - &fee
    };

    Some(SwapQuote {
        input: TokenAmount::new(input_raw.clone(), from.decimals),
        output_before_fees: TokenAmount::new(before_fees, to.decimals),
        fee: TokenAmount::new(fee, to.decimals),
        output: TokenAmount::new(output, to.decimals),
    })
}

/// Probe size: 1% of the token-0 reserve, capped at one whole token, floored at 10_000 raw units.
pub fn probe_amount(reserve0: &TokenAmount) -> BigUint {
    let one_token = pow10(reserve0.decimals as u32);
    let one_percent = &reserve0.raw / BigUint::from(100u32);
    one_token.min(one_percent).max(BigUint::from(MIN_PROBE_AMOUNT))
}

/// Exchange rate in whole tokens: how much token 1 one token 0 buys, before fees.
///
/// `None` when the pool state does not define a rate.
pub fn calculate_swap_price(registry: &RegistryEntry, reserves: &[TokenAmount; 2]) -> Option<BigRational> {
    let input = probe_amount(&reserves[0]);
    let quote = estimate_swap_output(registry, reserves, &input)?;

    let rate = quote.output_before_fees.to_fraction() / quote.input.to_fraction();
    if rate.is_zero() {
        None
    } else {
        Some(rate)
    }
}
