//! Per-metric recommendation strategies.
//!
//! A strategy is chosen once per metric when the autoscaler is built, from
//! the metric's declared target type. Recommendations are pure functions of
//! one observation and the current replica count.

use flexscale_api::{AutoscalerSpec, MetricTargetType};

use crate::metrics::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Scale current replicas by `observed / target`.
    Proportional,
    /// Divide an aggregate observation by the per-replica target.
    AverageValue,
}

impl Algorithm {
    pub fn for_target(target_type: MetricTargetType) -> Self {
        match target_type {
            MetricTargetType::Utilization | MetricTargetType::Value => Self::Proportional,
            MetricTargetType::AverageValue => Self::AverageValue,
        }
    }

    /// One strategy per metric, in declaration order.
    pub fn for_spec(spec: &AutoscalerSpec) -> Vec<Self> {
        spec.metrics
            .iter()
            .map(|m| Self::for_target(m.target.target_type))
            .collect()
    }

    /// Recommended replica count for a single metric.
    ///
    /// A non-positive or non-finite target, or a non-finite observation,
    /// recommends `current_replicas` unchanged.
    pub fn recommend(&self, metric: &Metric, current_replicas: i32) -> i32 {
        if !(metric.target_value.is_finite() && metric.target_value > 0.0) {
            return current_replicas;
        }
        let raw = match self {
            Self::Proportional => f64::from(current_replicas) * metric.observed / metric.target_value,
            Self::AverageValue => metric.observed / metric.target_value,
        };
        to_replicas(raw).unwrap_or(current_replicas)
    }
}

/// Round up into `[0, i32::MAX]`.
fn to_replicas(raw: f64) -> Option<i32> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.ceil().clamp(0.0, f64::from(i32::MAX)) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(observed: f64, target_type: MetricTargetType, target: f64) -> Metric {
        Metric {
            observed,
            target_type,
            target_value: target,
        }
    }

    #[test]
    fn strategy_chosen_by_target_type() {
        assert_eq!(
            Algorithm::for_target(MetricTargetType::Utilization),
            Algorithm::Proportional
        );
        assert_eq!(Algorithm::for_target(MetricTargetType::Value), Algorithm::Proportional);
        assert_eq!(
            Algorithm::for_target(MetricTargetType::AverageValue),
            Algorithm::AverageValue
        );
    }

    #[test]
    fn proportional_scales_current_replicas() {
        let m = metric(80.0, MetricTargetType::Utilization, 50.0);
        assert_eq!(Algorithm::Proportional.recommend(&m, 5), 8);
    }

    #[test]
    fn proportional_rounds_up() {
        let m = metric(51.0, MetricTargetType::Value, 50.0);
        assert_eq!(Algorithm::Proportional.recommend(&m, 10), 11);
    }

    #[test]
    fn proportional_scales_down() {
        let m = metric(10.0, MetricTargetType::Utilization, 50.0);
        assert_eq!(Algorithm::Proportional.recommend(&m, 10), 2);
    }

    #[test]
    fn average_value_ignores_current_replicas() {
        let m = metric(950.0, MetricTargetType::AverageValue, 100.0);
        assert_eq!(Algorithm::AverageValue.recommend(&m, 3), 10);
        assert_eq!(Algorithm::AverageValue.recommend(&m, 30), 10);
    }

    #[test]
    fn zero_target_keeps_current() {
        let m = metric(10.0, MetricTargetType::Value, 0.0);
        assert_eq!(Algorithm::Proportional.recommend(&m, 4), 4);
    }

    #[test]
    fn non_finite_observation_keeps_current() {
        let m = metric(f64::NAN, MetricTargetType::AverageValue, 10.0);
        assert_eq!(Algorithm::AverageValue.recommend(&m, 4), 4);
    }

    #[test]
    fn saturates_at_i32_max() {
        let m = metric(1e30, MetricTargetType::AverageValue, 1.0);
        assert_eq!(Algorithm::AverageValue.recommend(&m, 1), i32::MAX);
    }

    #[test]
    fn negative_observation_floors_at_zero() {
        let m = metric(-20.0, MetricTargetType::Value, 10.0);
        assert_eq!(Algorithm::Proportional.recommend(&m, 3), 0);
    }
}
