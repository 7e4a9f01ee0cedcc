//! flexscale-autoscaler — the decision core of a horizontal autoscaler.
//!
//! One reconciliation pass turns observed metrics into a single bounded,
//! rate-limited replica count and commits it to the scale target:
//!
//! ```text
//! metrics   = evaluate(spec.metrics)                 // fail fast on any error
//! target    = gateway.get(spec.scale_target_ref)     // always fetched fresh
//! per_metric[i] = algorithm[i].recommend(metrics[i], target.status_replicas)
//! selected  = select(behavior, per_metric)           // max | min | disabled
//! limited   = limit(selected)                        // stabilization window, rate policies -> AbleToScale
//! desired   = clamp(limited, min, max)               // always last      -> ScalingUnbounded
//!
//! if desired != target.spec_replicas:
//!     gateway.update(target with desired)
//!     status.desired_replicas = desired
//!     status.last_scale_time  = now
//! ```
//!
//! The metric source, resource mapper and scale client are external
//! collaborators injected as traits.

pub mod algorithm;
pub mod autoscaler;
pub mod bounds;
pub mod config;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod metrics;
pub mod selector;

pub use algorithm::Algorithm;
pub use autoscaler::{Autoscaler, AutoscalerFactory, ReconcileOutcome};
pub use config::ReconcilerConfig;
pub use error::{AutoscalerError, AutoscalerResult, Stage};
pub use gateway::{
    GroupKind, GroupResource, GroupVersion, ResourceMapper, ScaleClient, ScaleFuture,
    ScaleTarget, ScaleTargetGateway, StaticResourceMapper,
};
pub use metrics::{Metric, MetricEvaluator, MetricFuture, MetricSource};
