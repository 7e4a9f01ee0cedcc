//! Resource types for a horizontal autoscaler.
//!
//! A `HorizontalAutoscaler` pairs a declarative `AutoscalerSpec` (what to
//! scale, on which metrics, within which bounds and with which behavior)
//! with an `AutoscalerStatus` owned by the reconciler. All types are
//! serde-serializable so manifests can be loaded from TOML and status can
//! be reported as JSON.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::conditions::Conditions;

// ── Resource ──────────────────────────────────────────────────────

/// Identity of an autoscaler resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// An autoscaler: declared spec plus reconciler-owned status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorizontalAutoscaler {
    pub metadata: ObjectMeta,
    pub spec: AutoscalerSpec,
    #[serde(default)]
    pub status: AutoscalerStatus,
}

impl HorizontalAutoscaler {
    /// `{namespace}/{name}`, used as the logging key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }
}

// ── Spec ──────────────────────────────────────────────────────────

/// Desired autoscaling configuration. Immutable for the duration of a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoscalerSpec {
    /// The workload whose replica count is managed.
    pub scale_target_ref: CrossVersionObjectReference,
    pub min_replicas: i32,
    pub max_replicas: i32,
    /// Metrics to evaluate, in declaration order.
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub behavior: Behavior,
}

/// Reference to a scalable resource by API version, kind and name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossVersionObjectReference {
    /// `group/version`, or just `version` for the core group.
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl fmt::Display for CrossVersionObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.kind, self.name, self.api_version)
    }
}

/// A single metric to scale on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSpec {
    /// Metric identity, used to key the metric source.
    pub name: String,
    /// Backend query for the metric source (e.g. a PromQL expression).
    #[serde(default)]
    pub query: String,
    pub target: MetricTarget,
}

/// Target the observed metric value is compared against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricTarget {
    #[serde(rename = "type")]
    pub target_type: MetricTargetType,
    pub value: f64,
}

/// How the target value should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTargetType {
    /// Target is a utilization percentage across current replicas.
    Utilization,
    /// Target is the raw metric value across current replicas.
    Value,
    /// Target is the per-replica share of an aggregate value.
    AverageValue,
}

impl fmt::Display for MetricTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Utilization => "utilization",
            Self::Value => "value",
            Self::AverageValue => "average_value",
        };
        f.write_str(s)
    }
}

// ── Behavior ──────────────────────────────────────────────────────

/// Direction-aware scaling rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Behavior {
    #[serde(default = "ScalingRules::default_scale_up")]
    pub scale_up: ScalingRules,
    #[serde(default = "ScalingRules::default_scale_down")]
    pub scale_down: ScalingRules,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            scale_up: ScalingRules::default_scale_up(),
            scale_down: ScalingRules::default_scale_down(),
        }
    }
}

impl Behavior {
    /// Rules for the given direction. `None` has no rules.
    pub fn rules_for(&self, direction: ScaleDirection) -> Option<&ScalingRules> {
        match direction {
            ScaleDirection::Up => Some(&self.scale_up),
            ScaleDirection::Down => Some(&self.scale_down),
            ScaleDirection::None => None,
        }
    }

    /// Rules used to reduce several recommendations into one: scale-up
    /// rules if any recommendation exceeds `replicas`, else scale-down.
    pub fn selection_rules(&self, replicas: i32, recommendations: &[i32]) -> &ScalingRules {
        if recommendations.iter().any(|&r| r > replicas) {
            &self.scale_up
        } else {
            &self.scale_down
        }
    }
}

/// Direction of a replica change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleDirection {
    Up,
    Down,
    None,
}

impl ScaleDirection {
    pub fn between(current: i32, recommendation: i32) -> Self {
        match recommendation.cmp(&current) {
            std::cmp::Ordering::Greater => Self::Up,
            std::cmp::Ordering::Less => Self::Down,
            std::cmp::Ordering::Equal => Self::None,
        }
    }
}

impl fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Stabilization window, select policy and rate policies for one direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingRules {
    #[serde(default)]
    pub stabilization_window_seconds: u32,
    #[serde(default)]
    pub select_policy: SelectPolicy,
    #[serde(default)]
    pub policies: Vec<ScalingPolicy>,
}

impl ScalingRules {
    /// Scale up immediately, by at most 4 pods or 100% per 15s.
    pub fn default_scale_up() -> Self {
        Self {
            stabilization_window_seconds: 0,
            select_policy: SelectPolicy::Max,
            policies: vec![
                ScalingPolicy {
                    policy_type: ScalingPolicyType::Pods,
                    value: 4,
                    period_seconds: 15,
                },
                ScalingPolicy {
                    policy_type: ScalingPolicyType::Percent,
                    value: 100,
                    period_seconds: 15,
                },
            ],
        }
    }

    /// Scale down after 5 minutes of stability, by at most 100% per 15s.
    pub fn default_scale_down() -> Self {
        Self {
            stabilization_window_seconds: 300,
            select_policy: SelectPolicy::Max,
            policies: vec![ScalingPolicy {
                policy_type: ScalingPolicyType::Percent,
                value: 100,
                period_seconds: 15,
            }],
        }
    }

    pub fn stabilization_window(&self) -> Duration {
        Duration::seconds(i64::from(self.stabilization_window_seconds))
    }

    /// Earliest time a change is permitted, or `None` if there was no
    /// previous scale.
    pub fn permitted_at(&self, last_scale_time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        last_scale_time.map(|t| t + self.stabilization_window())
    }

    /// Whether `now` still falls inside the window opened by the last scale.
    pub fn within_stabilization_window(
        &self,
        last_scale_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        self.permitted_at(last_scale_time)
            .is_some_and(|permitted| now < permitted)
    }
}

/// Reducer applied across per-metric recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectPolicy {
    /// Largest recommendation.
    #[default]
    Max,
    /// Smallest recommendation.
    Min,
    /// Keep the current replica count.
    Disabled,
}

/// Bound on how much replicas may change per period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingPolicy {
    #[serde(rename = "type")]
    pub policy_type: ScalingPolicyType,
    pub value: i32,
    pub period_seconds: u32,
}

impl ScalingPolicy {
    pub fn period(&self) -> Duration {
        Duration::seconds(i64::from(self.period_seconds))
    }
}

impl fmt::Display for ScalingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.policy_type {
            ScalingPolicyType::Pods => {
                write!(f, "{} pods per {}s", self.value, self.period_seconds)
            }
            ScalingPolicyType::Percent => {
                write!(f, "{}% per {}s", self.value, self.period_seconds)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicyType {
    /// Absolute number of replicas.
    Pods,
    /// Percentage of the current replica count.
    Percent,
}

// ── Status ────────────────────────────────────────────────────────

/// Observed state, written only by the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AutoscalerStatus {
    /// Replica count last observed on the scale target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_replicas: Option<i32>,
    /// Replica count last written to the scale target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_replicas: Option<i32>,
    /// When the replica count was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scale_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: Conditions,
}
