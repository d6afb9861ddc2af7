//! Plasticity rules: integer STDP and eligibility-trace reward

use crate::{REWARD_SCALE_FACTOR, STDP_WINDOW, WEIGHT_MAX, WEIGHT_MIN};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Learning regime selected on the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlasticityMode {
    /// Immediate STDP weight updates on causal pairings
    #[default]
    Pavlovian,
    /// Pairings tag an eligibility trace; weights move only on reward
    Operant,
}

/// Integer STDP weight delta for `dt = t_post - t_pre`
///
/// Zero outside `|dt| <= STDP_WINDOW` and at `dt == 0`; otherwise
/// `±(2 * (STDP_WINDOW - |dt|)) / STDP_WINDOW` with the sign of `dt`
/// (pre-before-post potentiates, post-before-pre depresses). The integer
/// division means the magnitude is 0, 1, or 2.
#[inline]
pub fn stdp_delta(dt: i64) -> i32 {
    let magnitude = dt.unsigned_abs() as i64;
    if dt == 0 || magnitude > STDP_WINDOW {
        return 0;
    }
    let m = ((2 * (STDP_WINDOW - magnitude)) / STDP_WINDOW) as i32;
    if dt > 0 {
        m
    } else {
        -m
    }
}

/// Weight delta released by a reward of `amount` against a trace
///
/// `(trace * amount) / REWARD_SCALE_FACTOR`, saturated to the weight range
/// so one reward can never swing a synapse by more than the full span.
#[inline]
pub fn reward_delta(trace: i8, amount: i32) -> i32 {
    ((trace as i32 * amount) / REWARD_SCALE_FACTOR).clamp(WEIGHT_MIN as i32, WEIGHT_MAX as i32)
}
