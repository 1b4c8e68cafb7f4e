//! # Phase & Share Arithmetic
//!
//! The pure half of the vault: which phase a vault is in at a given
//! instant, how many shares a deposit earns, how an early exit splits into
//! payout, fee, and reward, and how a pool divides among share holders.
//!
//! Everything here is unsigned integer math with floor division. Products
//! of two amounts, or of an amount and a time power, are formed in 256 bits
//! so only the final quotient has to fit in `u128`. Functions that can still
//! overflow return `None` and let the caller pick the error.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use hodl_protocol::config::RATE_DENOMINATOR;
use hodl_protocol::{Amount, Timestamp};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle phase of an initialized vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Before the locking window: deposits accepted.
    Open,
    /// Inside the locking window: no deposits, early exit still possible.
    Locked,
    /// At or past expiry: principal withdrawable 1:1.
    Expired,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Open => write!(f, "Open"),
            Phase::Locked => write!(f, "Locked"),
            Phase::Expired => write!(f, "Expired"),
        }
    }
}

/// Phase of a vault with the given `expiry` and `locking_window` at `now`.
///
/// ```text
///  Open            | Locked              | Expired
/// -----------------+---------------------+---------------->
///                  expiry - window       expiry
/// ```
pub fn phase(now: Timestamp, expiry: Timestamp, locking_window: u64) -> Phase {
    if now >= expiry {
        Phase::Expired
    } else if now >= expiry.saturating_sub(locking_window) {
        Phase::Locked
    } else {
        Phase::Open
    }
}

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

/// Shares earned by depositing `amount` with `time_left` seconds to expiry
/// in a vault whose full lifetime is `total_time`:
///
/// `amount * time_left^n / total_time^n`
///
/// A deposit at creation earns one share per unit; the rate falls to zero
/// at expiry, steeper for larger `n`. Returns `None` only when
/// `total_time^n` itself does not fit in 256 bits.
pub fn decayed_shares(
    amount: Amount,
    time_left: u64,
    total_time: u64,
    exponent: u32,
) -> Option<Amount> {
    if total_time == 0 {
        return Some(0);
    }
    let time_left = time_left.min(total_time);
    let exponent = U256::from(exponent);
    let numerator = U256::from(time_left).checked_pow(exponent)?;
    let denominator = U256::from(total_time).checked_pow(exponent)?;
    mul_div(amount, numerator, denominator)
}

// ---------------------------------------------------------------------------
// Penalty
// ---------------------------------------------------------------------------

/// How an early exit of `amount` divides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PenaltySplit {
    /// Total forfeited: `amount * penalty_rate / 1000`.
    pub penalty: Amount,
    /// Part of the penalty sent to the fee recipient.
    pub fee: Amount,
    /// Part of the penalty added to the reward pool.
    pub reward: Amount,
    /// What the exiting holder gets back.
    pub returned: Amount,
}

/// Splits an early exit of `amount` under the given per-mille rates.
///
/// `penalty_rate` and `fee_rate` are expected to be at most 1000; the
/// vault validates that at init.
pub fn penalty_split(amount: Amount, penalty_rate: u16, fee_rate: u16) -> Option<PenaltySplit> {
    let denominator = Amount::from(RATE_DENOMINATOR);
    let penalty = amount.checked_mul(Amount::from(penalty_rate))? / denominator;
    let fee = penalty.checked_mul(Amount::from(fee_rate))? / denominator;
    Some(PenaltySplit {
        penalty,
        fee,
        reward: penalty.checked_sub(fee)?,
        returned: amount.checked_sub(penalty)?,
    })
}

// ---------------------------------------------------------------------------
// Pro Rata
// ---------------------------------------------------------------------------

/// `pool * shares / total_shares`, or zero when nobody holds shares.
pub fn pro_rata(pool: Amount, shares: Amount, total_shares: Amount) -> Option<Amount> {
    if total_shares == 0 {
        return Some(0);
    }
    mul_div(pool, U256::from(shares), U256::from(total_shares))
}

/// `floor(a * b / c)` with a 256-bit product. `c` must be non-zero.
fn mul_div(a: Amount, b: U256, c: U256) -> Option<Amount> {
    let quotient = U256::from(a).checked_mul(b)? / c;
    Amount::try_from(quotient).ok()
}
