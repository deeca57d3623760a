// crates/lockstep-vesting/src/curve.rs
//
// Release curve of a vesting position.
//
// Shape over time t:
//   t <= start          : 0
//   start < t <= end    : start_tokens + (total - start_tokens) * ratio
//   t > end             : total
// where ratio = floor((t - start) * RELEASE_SCALE / (end - start)) / RELEASE_SCALE.
//
// The time ratio is fixed-point with 9 decimals and everything is floored,
// so the curve is non-decreasing in t and never exceeds `total_tokens`.
// These functions are pure: same position and time, same answer.

use lockstep_core::{Amount, Timestamp};

use crate::position::VestingPosition;

/// Fixed-point scale of the elapsed-time ratio.
pub const RELEASE_SCALE: Amount = 1_000_000_000;

/// Total amount unlocked by `position` at `now`, ignoring what was claimed.
pub fn unlocked_amount(position: &VestingPosition, now: Timestamp) -> Amount {
    if now <= position.start_date {
        return 0;
    }
    if now > position.end_date {
        return position.total_tokens;
    }

    // start < now <= end, so the duration is at least one second.
    let elapsed = (now - position.start_date) as Amount;
    let duration = (position.end_date - position.start_date) as Amount;
    let ratio = elapsed * RELEASE_SCALE / duration;

    let span = position.total_tokens - position.start_tokens;
    position.start_tokens + scale_down(span, ratio)
}

/// Amount `position` can pay out at `now`.
pub fn claimable_amount(position: &VestingPosition, now: Timestamp) -> Amount {
    let unlocked = unlocked_amount(position, now);
    debug_assert!(
        unlocked >= position.claimed,
        "claimed {} exceeds unlocked {}",
        position.claimed,
        unlocked
    );
    unlocked.saturating_sub(position.claimed)
}

/// floor(value * ratio / RELEASE_SCALE) without overflowing for any u128
/// `value`, given `ratio <= RELEASE_SCALE`.
fn scale_down(value: Amount, ratio: Amount) -> Amount {
    let whole = value / RELEASE_SCALE;
    let rest = value % RELEASE_SCALE;
    whole * ratio + rest * ratio / RELEASE_SCALE
}
