//! Constant-product (UniswapV2) swap math over arbitrary-precision integers.
//!
//! Raw amounts are token smallest units as `BigUint`. Human amounts are
//! decimal strings scaled by `10^decimals`. Nothing here touches floats.

use crate::types::{QuoterError, Result};
use alloy_primitives::U256;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;

/// Basis points in one whole.
pub const FEE_DENOMINATOR: u32 = 10_000;

/// Fractional digits kept when rendering price impact.
pub const PRICE_IMPACT_SCALE: u32 = 18;

/// Swap fee charged on the input leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapFee {
    bps: u32,
}

impl SwapFee {
    /// 0.3%: `amountIn * 997 / 1000` reaches the pool.
    pub const UNISWAP_V2: SwapFee = SwapFee { bps: 30 };

    pub fn from_bps(bps: u32) -> Result<Self> {
        if bps >= FEE_DENOMINATOR {
            return Err(QuoterError::Config(format!("swap fee of {} bps leaves nothing to trade", bps)));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    fn retained(&self) -> BigUint {
        BigUint::from(FEE_DENOMINATOR - self.bps)
    }
}

impl Default for SwapFee {
    fn default() -> Self {
        Self::UNISWAP_V2
    }
}

pub fn u256_to_biguint(value: &U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

/// Output of a single constant-product swap, truncated toward zero like the
/// on-chain `getAmountOut`.
pub fn get_amount_out(
    amount_in: &BigUint,
    reserve_in: &BigUint,
    reserve_out: &BigUint,
    fee: SwapFee,
) -> Result<BigUint> {
    if amount_in.is_zero() {
        return Err(QuoterError::InvalidAmount("amount in must be greater than 0".into()));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(QuoterError::InsufficientLiquidity);
    }
    let amount_in_with_fee = amount_in * fee.retained();
    let numerator = &amount_in_with_fee * reserve_out;
    let denominator = reserve_in * BigUint::from(FEE_DENOMINATOR) + amount_in_with_fee;
    Ok(numerator / denominator)
}

/// Percentage drop of the pool's marginal price caused by the trade.
///
/// `(before - after) / before * 100` with `before = rOut / rIn` and
/// `after = (rOut - out) / (rIn + in)`, evaluated exactly and then truncated
/// to [`PRICE_IMPACT_SCALE`] fractional digits.
pub fn price_impact_pct(
    amount_in: &BigUint,
    amount_out: &BigUint,
    reserve_in: &BigUint,
    reserve_out: &BigUint,
) -> Result<Decimal> {
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
        return Err(QuoterError::InsufficientLiquidity);
    }
    let denominator = (reserve_in + amount_in) * reserve_out;
    let after = (reserve_out - amount_out) * reserve_in;
    // after <= denominator because the post-trade price never rises
    let numerator = &denominator - after;

    let scaled = numerator * BigUint::from(100u32) * BigUint::from(10u32).pow(PRICE_IMPACT_SCALE) / denominator;
    let mantissa = scaled
        .to_i128()
        .ok_or_else(|| QuoterError::InvalidAmount("price impact out of range".into()))?;
    Decimal::try_from_i128_with_scale(mantissa, PRICE_IMPACT_SCALE)
        .map(|d| d.normalize())
        .map_err(|e| QuoterError::InvalidAmount(format!("price impact out of range: {}", e)))
}

/// Parse a human decimal amount into smallest units.
///
/// Digits beyond `decimals` are below the smallest unit and are dropped. An
/// amount that is zero after scaling is rejected.
pub fn to_raw(human: &str, decimals: u8) -> Result<BigUint> {
    let invalid = || QuoterError::InvalidAmount(human.to_string());
    let (int_part, frac_part) = split_human(human)?;

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(int_part.len() + decimals);
    digits.push_str(int_part);
    let kept = &frac_part[..frac_part.len().min(decimals)];
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(decimals - kept.len()));

    let raw = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
    if raw.is_zero() {
        return Err(QuoterError::InvalidAmount(format!(
            "{} must be greater than 0 at {} decimals",
            human, decimals
        )));
    }
    Ok(raw)
}

/// Reject anything that is not a strictly positive plain decimal, before
/// the token's decimals are known.
pub fn check_human(human: &str) -> Result<()> {
    let (int_part, frac_part) = split_human(human)?;
    if int_part.bytes().chain(frac_part.bytes()).all(|b| b == b'0') {
        return Err(QuoterError::InvalidAmount("amount in must be greater than 0".into()));
    }
    Ok(())
}

fn split_human(human: &str) -> Result<(&str, &str)> {
    let trimmed = human.trim();
    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(QuoterError::InvalidAmount(human.to_string()));
    }
    Ok((int_part, frac_part))
}

/// Render smallest units as an exact human decimal, trailing zeros trimmed.
pub fn to_human(raw: &BigUint, decimals: u8) -> String {
    let digits = raw.to_str_radix(10);
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}
