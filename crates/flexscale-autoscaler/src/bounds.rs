//! Min/max bounding. Owns the `ScalingUnbounded` condition.

use chrono::{DateTime, Utc};
use tracing::debug;

use flexscale_api::{ConditionType, Conditions};

pub const REASON_WITHIN_BOUNDS: &str = "WithinBounds";
pub const REASON_LIMITED_BY_BOUNDS: &str = "LimitedByBounds";

/// Clamp `value` into `[min, max]`. If `max < min`, `max` wins.
pub fn clamp_replicas(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

/// Clamp the limiter's output and record whether the bounds applied.
pub fn bound_recommendation(
    value: i32,
    min: i32,
    max: i32,
    now: DateTime<Utc>,
    conditions: &mut Conditions,
) -> i32 {
    let bounded = clamp_replicas(value, min, max);
    if bounded != value {
        debug!(recommendation = value, bounded, min, max, "limited by bounds");
        conditions.mark_false(
            ConditionType::ScalingUnbounded,
            REASON_LIMITED_BY_BOUNDS,
            format!("recommendation {value} limited by bounds [{min}, {max}]"),
            now,
        );
    } else {
        conditions.mark_true(ConditionType::ScalingUnbounded, REASON_WITHIN_BOUNDS, "", now);
    }
    bounded
}
