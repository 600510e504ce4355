//! Pool invariant math.
//!
//! Integer arithmetic throughout the amount paths; floats only appear in the
//! reporting-side price figures. Anything that cannot converge or would go
//! negative comes back as an error instead of a truncated answer.

use crate::constants::fees::{STABLE_CURVE_MAX_ITERATIONS, STABLE_CURVE_TOLERANCE};
use crate::errors::SwapError;

/// Two-asset pools only.
const N_COINS: u128 = 2;

/// Input net of the trade fee, scaled by `fee_denominator`; the caller folds
/// the denominator into its own fraction.
fn input_after_fee(input: u128, fee_numerator: u64, fee_denominator: u64) -> u128 {
    input * (fee_denominator - fee_numerator) as u128
}

fn check_fee_fraction(fee_numerator: u64, fee_denominator: u64) -> Result<(), SwapError> {
    if fee_denominator == 0 || fee_numerator >= fee_denominator {
        return Err(SwapError::InvalidPool("malformed fee fraction".into()));
    }
    Ok(())
}

/// Constant-product output: `r_out * in' / (r_in + in')` with
/// `in' = in * (1 - fee)`, computed as one fraction so no precision is lost
/// to intermediate rounding.
pub fn constant_product_out(
    input: u64,
    reserve_in: u64,
    reserve_out: u64,
    fee_numerator: u64,
    fee_denominator: u64,
) -> Result<u64, SwapError> {
    check_fee_fraction(fee_numerator, fee_denominator)?;
    if reserve_in == 0 || reserve_out == 0 {
        return Err(SwapError::InsufficientLiquidity("empty reserves".into()));
    }
    if input == 0 {
        return Ok(0);
    }
    let input_with_fee = input_after_fee(input as u128, fee_numerator, fee_denominator);
    let numerator = (reserve_out as u128)
        .checked_mul(input_with_fee)
        .ok_or_else(|| SwapError::Unknown("constant-product overflow".into()))?;
    let denominator = (reserve_in as u128)
        .checked_mul(fee_denominator as u128)
        .and_then(|v| v.checked_add(input_with_fee))
        .ok_or_else(|| SwapError::Unknown("constant-product overflow".into()))?;
    let out = numerator / denominator;
    u64::try_from(out).map_err(|_| SwapError::Unknown("constant-product output overflow".into()))
}

/// Invariant `D` of the amplified curve, solved by fixed-point iteration.
fn compute_d(leverage: u128, reserve_a: u128, reserve_b: u128) -> Option<u128> {
    let sum_x = reserve_a.checked_add(reserve_b)?;
    if sum_x == 0 {
        return Some(0);
    }
    let mut d = sum_x;
    for _ in 0..STABLE_CURVE_MAX_ITERATIONS {
        let mut d_product = d;
        d_product = d_product.checked_mul(d)?.checked_div(reserve_a.checked_mul(N_COINS)?)?;
        d_product = d_product.checked_mul(d)?.checked_div(reserve_b.checked_mul(N_COINS)?)?;
        let d_previous = d;
        let numerator =
            d.checked_mul(leverage.checked_mul(sum_x)?.checked_add(d_product.checked_mul(N_COINS)?)?)?;
        let denominator = d
            .checked_mul(leverage.checked_sub(1)?)?
            .checked_add(d_product.checked_mul(N_COINS.checked_add(1)?)?)?;
        d = numerator.checked_div(denominator)?;
        if d.abs_diff(d_previous) <= STABLE_CURVE_TOLERANCE {
            return Some(d);
        }
    }
    None
}

/// New output-side reserve for a given input-side reserve, by Newton
/// iteration on the invariant. Seeded at the constant-product estimate.
fn compute_new_destination_reserve(
    leverage: u128,
    old_source: u128,
    old_destination: u128,
    new_source: u128,
    d: u128,
) -> Option<u128> {
    // y^2 + y*(b - d) - c = 0, with
    //   c = d^(n+1) / (n^n * x * leverage)
    //   b = x + d / leverage
    let c = d
        .checked_mul(d)?
        .checked_div(new_source.checked_mul(N_COINS)?)?
        .checked_mul(d)?
        .checked_div(leverage.checked_mul(N_COINS)?)?;
    let b = new_source.checked_add(d.checked_div(leverage)?)?;

    let mut y = old_source.checked_mul(old_destination)?.checked_div(new_source)?.max(1);
    for _ in 0..STABLE_CURVE_MAX_ITERATIONS {
        let y_previous = y;
        let numerator = y.checked_mul(y)?.checked_add(c)?;
        let denominator = y.checked_mul(2)?.checked_add(b)?.checked_sub(d)?;
        if denominator == 0 {
            return None;
        }
        y = numerator.checked_div(denominator)?;
        if y.abs_diff(y_previous) <= STABLE_CURVE_TOLERANCE {
            return Some(y);
        }
    }
    None
}

/// Amplified/stable curve output. The trade fee is taken on the input, then
/// the invariant is solved for the new output reserve.
pub fn stable_out(
    input: u64,
    reserve_in: u64,
    reserve_out: u64,
    amp: u64,
    fee_numerator: u64,
    fee_denominator: u64,
) -> Result<u64, SwapError> {
    check_fee_fraction(fee_numerator, fee_denominator)?;
    if reserve_in == 0 || reserve_out == 0 {
        return Err(SwapError::InsufficientLiquidity("empty reserves".into()));
    }
    if input == 0 {
        return Ok(0);
    }
    if amp == 0 {
        return Err(SwapError::InvalidPool("zero amplification coefficient".into()));
    }
    let net_input =
        input_after_fee(input as u128, fee_numerator, fee_denominator) / fee_denominator as u128;
    let leverage = (amp as u128)
        .checked_mul(N_COINS)
        .ok_or_else(|| SwapError::Unknown("amplification overflow".into()))?;

    let non_convergent = || SwapError::Unknown("stable curve iteration did not converge".into());

    let d = compute_d(leverage, reserve_in as u128, reserve_out as u128)
        .ok_or_else(non_convergent)?;
    let new_source = reserve_in as u128 + net_input;
    let new_destination =
        compute_new_destination_reserve(leverage, reserve_in as u128, reserve_out as u128, new_source, d)
            .ok_or_else(non_convergent)?;
    let out = (reserve_out as u128)
        .checked_sub(new_destination)
        .ok_or_else(|| SwapError::Unknown("stable curve produced negative output".into()))?;
    u64::try_from(out).map_err(|_| SwapError::Unknown("stable output overflow".into()))
}

/// Marginal (pre-trade) price of the output asset in input-asset terms.
/// Reporting only; never feeds an amount.
pub fn mid_price(
    reserve_in: u64,
    reserve_out: u64,
    amp: Option<u64>,
) -> Result<f64, SwapError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(SwapError::InsufficientLiquidity("empty reserves".into()));
    }
    let x = reserve_in as f64;
    let y = reserve_out as f64;
    match amp {
        None => Ok(y / x),
        Some(amp) => {
            let leverage = (amp as u128 * N_COINS) as f64;
            let d = compute_d(amp as u128 * N_COINS, reserve_in as u128, reserve_out as u128)
                .ok_or_else(|| {
                    SwapError::Unknown("stable curve iteration did not converge".into())
                })? as f64;
            // dy/dx from 4A(x+y) + D = 4AD + D^3/(4xy)
            let d_cubed = d * d * d;
            let numerator = 2.0 * leverage + d_cubed / (2.0 * x * x * y);
            let denominator = 2.0 * leverage + d_cubed / (2.0 * x * y * y);
            let price = numerator / denominator;
            if !price.is_finite() || price <= 0.0 {
                return Err(SwapError::Unknown("non-finite stable mid price".into()));
            }
            Ok(price)
        },
    }
}
