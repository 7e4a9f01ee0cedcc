//! Transient limits: stabilization windows and rate policies.
//!
//! Decides whether the selected recommendation may take effect now,
//! independent of the `[min, max]` bounds. Owns the `AbleToScale` condition.

use chrono::{DateTime, Utc};
use tracing::debug;

use flexscale_api::{
    Behavior, ConditionType, Conditions, ScaleDirection, ScalingPolicy, ScalingPolicyType,
    ScalingRules,
};

pub const REASON_SCALING_ALLOWED: &str = "ScalingAllowed";
pub const REASON_STABILIZING: &str = "WithinStabilizationWindow";
pub const REASON_RATE_LIMITED: &str = "RateLimited";

/// Apply the stabilization window, then the rate policies, for the
/// direction implied by `recommendation` vs `replicas`.
///
/// Returns `replicas` while the window is open, a rate-limited value if a
/// policy restricts the change, and `recommendation` otherwise. Exactly one
/// of `AbleToScale = True | False` is recorded.
pub fn limit_recommendation(
    behavior: &Behavior,
    replicas: i32,
    recommendation: i32,
    last_scale_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    conditions: &mut Conditions,
) -> i32 {
    let direction = ScaleDirection::between(replicas, recommendation);
    let Some(rules) = behavior.rules_for(direction) else {
        conditions.mark_true(
            ConditionType::AbleToScale,
            REASON_SCALING_ALLOWED,
            "recommendation matches current replicas",
            now,
        );
        return recommendation;
    };

    // Checked after resolving direction: a scale-up window never holds back
    // a scale-down.
    if rules.within_stabilization_window(last_scale_time, now) {
        let permitted_at = rules.permitted_at(last_scale_time).unwrap_or(now);
        debug!(
            %direction,
            replicas,
            recommendation,
            permitted_at = %permitted_at,
            "held by stabilization window"
        );
        conditions.mark_false(
            ConditionType::AbleToScale,
            REASON_STABILIZING,
            format!(
                "within stabilization window, able to scale at {}",
                permitted_at.format("%Y-%m-%dT%H:%M:%SZ")
            ),
            now,
        );
        return replicas;
    }

    if let Some((limited, policy)) =
        rate_limit(rules, direction, replicas, recommendation, last_scale_time, now)
    {
        debug!(%direction, replicas, recommendation, limited, %policy, "rate limited");
        conditions.mark_false(
            ConditionType::AbleToScale,
            REASON_RATE_LIMITED,
            format!("recommendation {recommendation} limited to {limited} by scale {direction} policy {policy}"),
            now,
        );
        return limited;
    }

    conditions.mark_true(ConditionType::AbleToScale, REASON_SCALING_ALLOWED, "", now);
    recommendation
}

/// Most restrictive policy bound, if it restricts `recommendation`.
fn rate_limit<'r>(
    rules: &'r ScalingRules,
    direction: ScaleDirection,
    replicas: i32,
    recommendation: i32,
    last_scale_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<(i32, &'r ScalingPolicy)> {
    let bounds = rules
        .policies
        .iter()
        .map(|p| (policy_bound(p, direction, replicas, last_scale_time, now), p));

    match direction {
        ScaleDirection::Up => {
            let (bound, policy) = bounds.min_by_key(|(b, _)| *b)?;
            (recommendation > bound).then_some((bound, policy))
        }
        ScaleDirection::Down => {
            let (bound, policy) = bounds.max_by_key(|(b, _)| *b)?;
            (recommendation < bound).then_some((bound, policy))
        }
        ScaleDirection::None => None,
    }
}

/// Furthest replica count `policy` allows in `direction` this pass.
///
/// A policy whose period has not elapsed since the last scale has spent its
/// budget and allows no change.
fn policy_bound(
    policy: &ScalingPolicy,
    direction: ScaleDirection,
    replicas: i32,
    last_scale_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i32 {
    if last_scale_time.is_some_and(|t| now < t + policy.period()) {
        return replicas;
    }

    let r = i64::from(replicas);
    let v = i64::from(policy.value);
    let bound = match (direction, policy.policy_type) {
        (ScaleDirection::Up, ScalingPolicyType::Pods) => r + v,
        // At least one replica, so a percentage can grow from zero.
        (ScaleDirection::Up, ScalingPolicyType::Percent) => r + ((r * v + 99) / 100).max(1),
        (ScaleDirection::Down, ScalingPolicyType::Pods) => r - v,
        (ScaleDirection::Down, ScalingPolicyType::Percent) => r - r * v / 100,
        (ScaleDirection::None, _) => r,
    };
    // A policy only holds a change back; it never reverses the direction.
    let bound = match direction {
        ScaleDirection::Up => bound.max(r),
        ScaleDirection::Down => bound.min(r),
        ScaleDirection::None => r,
    };
    bound.clamp(0, i64::from(i32::MAX)) as i32
}
