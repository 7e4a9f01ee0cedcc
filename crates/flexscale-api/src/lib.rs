//! flexscale-api — resource model for the flexscale horizontal autoscaler.
//!
//! Defines the `HorizontalAutoscaler` resource: the declarative
//! `AutoscalerSpec` (scale target, metrics, replica bounds, scaling
//! behavior) and the `AutoscalerStatus` the reconciler writes back,
//! including the `AbleToScale` / `ScalingUnbounded` condition pair that
//! records why a decision deviated from the raw recommendation.
//!
//! Manifests are TOML documents; see [`manifest`].

pub mod conditions;
pub mod error;
pub mod manifest;
pub mod types;

pub use conditions::{Condition, ConditionStatus, ConditionType, Conditions};
pub use error::{ManifestError, ManifestResult};
pub use types::*;
