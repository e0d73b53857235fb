//! Arbitrary-precision helpers for on-chain fixed-point values.
//!
//! Values stay `U256` end to end; division by `10^decimals` only happens when
//! rendering.

use alloy_primitives::U256;
use std::fmt;

/// USDC-style fixed point.
pub const USDC_DECIMALS: u8 = 6;

/// `maxClaimableSupply` sentinel for an uncapped drop.
pub const UNLIMITED: U256 = U256::MAX;

const BPS_SCALE: u64 = 10_000;

/// Parse a decimal on-chain value. Empty input is zero.
pub fn parse_u256(field: &str, raw: &str) -> Result<U256, crate::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| crate::Error::InvalidField {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn scale(decimals: u8) -> U256 {
    U256::from(10u64.pow(u32::from(decimals)))
}

/// Exact decimal rendering of `value / 10^decimals`, trailing zeros trimmed.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let unit = scale(decimals);
    let whole = value / unit;
    let frac = value % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Maximum claimable supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supply {
    Limited(U256),
    Unlimited,
}

impl Supply {
    pub fn from_raw(max: U256) -> Self {
        if max == UNLIMITED {
            Supply::Unlimited
        } else {
            Supply::Limited(max)
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Supply::Unlimited)
    }

    /// Zero max supply: the drop has not been set up.
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Supply::Limited(max) if max.is_zero())
    }

    pub fn raw(&self) -> U256 {
        match self {
            Supply::Limited(max) => *max,
            Supply::Unlimited => UNLIMITED,
        }
    }

    /// Units left to claim. Unlimited supply never computes a difference.
    pub fn remaining(&self, claimed: U256) -> Supply {
        match self {
            Supply::Limited(max) => Supply::Limited(max.saturating_sub(claimed)),
            Supply::Unlimited => Supply::Unlimited,
        }
    }

    /// Claimed share in basis points. `None` hides the progress bar.
    pub fn progress_bps(&self, claimed: U256) -> Option<u64> {
        match self {
            Supply::Unlimited => None,
            Supply::Limited(max) if max.is_zero() => None,
            Supply::Limited(max) => {
                let claimed = claimed.min(*max);
                // claimed <= max, so claimed * 10_000 only overflows near U256::MAX.
                let bps = match claimed.checked_mul(U256::from(BPS_SCALE)) {
                    Some(scaled) => scaled / *max,
                    None => claimed / (*max / U256::from(BPS_SCALE)).max(U256::from(1u64)),
                };
                Some(u64::try_from(bps).unwrap_or(BPS_SCALE).min(BPS_SCALE))
            }
        }
    }
}

impl fmt::Display for Supply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Supply::Limited(n) => write!(f, "{n}"),
            Supply::Unlimited => f.write_str("∞"),
        }
    }
}
