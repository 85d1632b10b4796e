//! Rollout selector (spec §4.2).
//!
//! Deterministic cohort selection and time-ramped effective rollout
//! percentage.

use chrono::{DateTime, Utc};

/// 32-bit signed wraparound string hash: `h <- (h << 5) - h + codepoint(ch)`.
///
/// Must be reproduced bit-exactly — it determines cohort membership, and
/// a 64-bit implementation would reshuffle every in-progress rollout.
pub fn hash_string(input: &str) -> i32 {
    let mut h: i32 = 0;
    for ch in input.chars() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(ch as i32);
    }
    h
}

/// `clientId + "-" + releaseTag`, hashed, `|hash| mod 100 < rollout`.
///
/// `rollout` is compared in `f64`, not truncated to an integer first:
/// mid-ramp it carries a fractional part (rounded to three decimals in
/// [`effective_rollout`]), and truncating would exclude clients at the
/// integer boundary that the original float comparison would include.
pub fn is_selected_for_rollout(client_id: &str, rollout: f64, release_tag: &str) -> bool {
    let tag = format!("{client_id}-{release_tag}");
    let h = hash_string(&tag);
    ((h.unsigned_abs() % 100) as f64) < rollout
}

/// True iff `rollout` is present and not equal to 100.
pub fn is_unfinished_rollout(rollout: Option<u32>) -> bool {
    matches!(rollout, Some(r) if r != 100)
}

/// Parameters of a release's time-based rollout ramp.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolloutRamp {
    pub rollout: Option<u32>,
    pub hold_duration_minutes: Option<i64>,
    pub ramp_duration_minutes: Option<i64>,
    pub upload_time: Option<DateTime<Utc>>,
}

/// Effective rollout percentage with time-based ramp-up (spec §4.2 step
/// 1-7). Grows monotonically from `base` at hold-expiry to `100` at
/// ramp-expiry; the final value is rounded to three decimal places.
pub fn effective_rollout(ramp: &RolloutRamp, now: DateTime<Utc>) -> f64 {
    let Some(rollout) = ramp.rollout else {
        return 100.0;
    };
    if rollout == 100 {
        return 100.0;
    }

    let base = rollout as f64;

    let Some(upload_time) = ramp.upload_time else {
        return base;
    };

    let elapsed_ms = (now - upload_time).num_milliseconds();
    let hold_ms = ramp.hold_duration_minutes.unwrap_or(0).max(0) * 60_000;

    let within_hold = if hold_ms > 0 {
        elapsed_ms < hold_ms
    } else {
        elapsed_ms < 0
    };
    if within_hold {
        return base;
    }

    let ramp_ms = ramp.ramp_duration_minutes.unwrap_or(0).max(0) * 60_000;
    if ramp_ms <= 0 {
        return base;
    }

    let progress = ((elapsed_ms - hold_ms) as f64 / ramp_ms as f64).clamp(0.0, 1.0);
    let computed = base + (100.0 - base) * progress;
    let rounded = (computed * 1000.0).round() / 1000.0;
    rounded.min(100.0).max(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn empty_string_hashes_to_zero() {
        assert_eq!(hash_string(""), 0);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_string("c1-v2"), hash_string("c1-v2"));
    }

    #[test]
    fn selection_roughly_matches_rollout_fraction() {
        let total = 10_000;
        let selected = (0..total)
            .filter(|i| is_selected_for_rollout(&format!("client-{i}"), 25.0, "v1"))
            .count();
        let fraction = selected as f64 / total as f64;
        assert!((fraction - 0.25).abs() < 0.03, "fraction was {fraction}");
    }

    #[test]
    fn unfinished_rollout() {
        assert!(!is_unfinished_rollout(None));
        assert!(!is_unfinished_rollout(Some(100)));
        assert!(is_unfinished_rollout(Some(50)));
        assert!(is_unfinished_rollout(Some(0)));
    }

    #[test]
    fn effective_rollout_absent_is_full() {
        let ramp = RolloutRamp::default();
        assert_eq!(effective_rollout(&ramp, Utc::now()), 100.0);
    }

    #[test]
    fn effective_rollout_without_upload_time_is_base() {
        let ramp = RolloutRamp {
            rollout: Some(30),
            ..Default::default()
        };
        assert_eq!(effective_rollout(&ramp, Utc::now()), 30.0);
    }

    #[test]
    fn effective_rollout_holds_then_ramps_to_full() {
        let upload_time = Utc::now() - Duration::minutes(30);
        let ramp = RolloutRamp {
            rollout: Some(20),
            hold_duration_minutes: Some(10),
            ramp_duration_minutes: Some(20),
            upload_time: Some(upload_time),
        };

        // Still within hold.
        let during_hold = effective_rollout(&ramp, upload_time + Duration::minutes(5));
        assert_eq!(during_hold, 20.0);

        // Midway through ramp.
        let midpoint = effective_rollout(&ramp, upload_time + Duration::minutes(20));
        assert!(midpoint > 20.0 && midpoint < 100.0);

        // Past ramp-expiry.
        let done = effective_rollout(&ramp, upload_time + Duration::minutes(40));
        assert_eq!(done, 100.0);
    }

    #[test]
    fn effective_rollout_is_monotonic_non_decreasing() {
        let upload_time = Utc::now() - Duration::minutes(60);
        let ramp = RolloutRamp {
            rollout: Some(10),
            hold_duration_minutes: Some(5),
            ramp_duration_minutes: Some(50),
            upload_time: Some(upload_time),
        };
        let mut last = 0.0;
        for minute in 0..70 {
            let now = upload_time + Duration::minutes(minute);
            let v = effective_rollout(&ramp, now);
            assert!(v >= last, "rollout decreased at minute {minute}");
            last = v;
        }
    }
}
