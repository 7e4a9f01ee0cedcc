//! Autoscaler: one reconciliation pass per call.
//!
//! A pass moves through `FetchingMetrics → FetchingTarget →
//! ComputingRecommendation → (NoChange | Updating) → Done`, or fails at the
//! first external error. Nothing is cached between passes: metrics and the
//! scale target are fetched fresh every time.
//!
//! Status writes:
//! - `current_replicas` once the target has been fetched;
//! - conditions when the pass completes (no change or successful update);
//! - `desired_replicas` and `last_scale_time` only after a successful update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info};

use flexscale_api::{AutoscalerStatus, Conditions, HorizontalAutoscaler};

use crate::algorithm::Algorithm;
use crate::bounds::bound_recommendation;
use crate::config::{format_duration, ReconcilerConfig};
use crate::error::AutoscalerResult;
use crate::gateway::{ResourceMapper, ScaleClient, ScaleTarget, ScaleTargetGateway};
use crate::limiter::limit_recommendation;
use crate::metrics::{Metric, MetricEvaluator, MetricSource};
use crate::selector::select_recommendation;

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Desired replicas already match the target; nothing was written.
    Unchanged { replicas: i32 },
    /// The target was updated.
    Scaled { from: i32, to: i32 },
}

/// Builds autoscalers that share one set of collaborators.
#[derive(Clone)]
pub struct AutoscalerFactory {
    metrics: Arc<dyn MetricSource>,
    mapper: Arc<dyn ResourceMapper>,
    scales: Arc<dyn ScaleClient>,
    config: ReconcilerConfig,
}

impl AutoscalerFactory {
    pub fn new(
        metrics: Arc<dyn MetricSource>,
        mapper: Arc<dyn ResourceMapper>,
        scales: Arc<dyn ScaleClient>,
    ) -> Self {
        Self {
            metrics,
            mapper,
            scales,
            config: ReconcilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// An autoscaler for `resource`. Per-metric strategies are fixed here.
    pub fn for_resource(&self, resource: HorizontalAutoscaler) -> Autoscaler {
        Autoscaler {
            algorithms: Algorithm::for_spec(&resource.spec),
            evaluator: MetricEvaluator::new(self.metrics.clone(), self.config.call_timeout),
            gateway: ScaleTargetGateway::new(
                self.mapper.clone(),
                self.scales.clone(),
                self.config.call_timeout,
            ),
            config: self.config.clone(),
            resource,
        }
    }
}

/// Computes and applies the desired replica count for one scale target.
///
/// Passes take `&mut self`, so passes for one target never overlap.
pub struct Autoscaler {
    resource: HorizontalAutoscaler,
    algorithms: Vec<Algorithm>,
    evaluator: MetricEvaluator,
    gateway: ScaleTargetGateway,
    config: ReconcilerConfig,
}

impl Autoscaler {
    pub fn resource(&self) -> &HorizontalAutoscaler {
        &self.resource
    }

    pub fn status(&self) -> &AutoscalerStatus {
        &self.resource.status
    }

    /// Consume the autoscaler, returning the resource with its latest status.
    pub fn into_resource(self) -> HorizontalAutoscaler {
        self.resource
    }

    /// Run one pass at the current time.
    pub async fn reconcile(&mut self) -> AutoscalerResult<ReconcileOutcome> {
        self.reconcile_at(Utc::now()).await
    }

    /// Run one pass, treating `now` as the current time.
    pub async fn reconcile_at(&mut self, now: DateTime<Utc>) -> AutoscalerResult<ReconcileOutcome> {
        let key = self.resource.key();
        let spec = &self.resource.spec;
        let namespace = &self.resource.metadata.namespace;

        // 1. Metrics for every configured metric, or nothing.
        debug!(autoscaler = %key, "fetching metrics");
        let metrics = self.evaluator.evaluate(&spec.metrics).await?;

        // 2. Current scale, always fresh.
        debug!(autoscaler = %key, "fetching scale target");
        let target_ref = &spec.scale_target_ref;
        let resource = self.gateway.resolve(&target_ref.api_version, &target_ref.kind)?;
        let mut target = self.gateway.get(namespace, &resource, target_ref).await?;
        self.resource.status.current_replicas = Some(target.status_replicas);

        // 3. Recommendation; conditions are staged until the pass completes.
        let mut conditions = self.resource.status.conditions.clone();
        let desired = self.desired_replicas(&metrics, &target, now, &mut conditions);
        let existing = target.spec_replicas;
        if desired == existing {
            debug!(autoscaler = %key, replicas = desired, "no change");
            self.resource.status.conditions = conditions;
            return Ok(ReconcileOutcome::Unchanged { replicas: desired });
        }

        // 4. Persist.
        target.spec_replicas = desired;
        let stored = self
            .gateway
            .update(&self.resource.metadata.namespace, &resource, &target)
            .await?;
        info!(
            autoscaler = %key,
            existing,
            desired = stored.spec_replicas,
            "scaled replicas count"
        );

        let status = &mut self.resource.status;
        status.conditions = conditions;
        status.desired_replicas = Some(stored.spec_replicas);
        status.last_scale_time = Some(now);
        Ok(ReconcileOutcome::Scaled {
            from: existing,
            to: stored.spec_replicas,
        })
    }

    /// Select, limit, then bound. Conditions are always set, whatever the
    /// outcome: `AbleToScale` by the limiter, `ScalingUnbounded` by the
    /// clamp.
    fn desired_replicas(
        &self,
        metrics: &[Metric],
        target: &ScaleTarget,
        now: DateTime<Utc>,
        conditions: &mut Conditions,
    ) -> i32 {
        let spec = &self.resource.spec;
        let recommendations: Vec<i32> = metrics
            .iter()
            .zip(&self.algorithms)
            .map(|(metric, algorithm)| algorithm.recommend(metric, target.status_replicas))
            .collect();

        let replicas = target.spec_replicas;
        let selected = select_recommendation(&spec.behavior, replicas, &recommendations);
        let limited = limit_recommendation(
            &spec.behavior,
            replicas,
            selected,
            self.resource.status.last_scale_time,
            now,
            conditions,
        );
        let bounded =
            bound_recommendation(limited, spec.min_replicas, spec.max_replicas, now, conditions);

        debug!(
            autoscaler = %self.resource.key(),
            ?recommendations,
            selected,
            limited,
            bounded,
            "computed desired replicas"
        );
        bounded
    }

    /// Reconcile every `config.interval` until `shutdown` changes. Failed
    /// passes are logged and retried on the next tick.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.config.interval;
        info!(
            autoscaler = %self.resource.key(),
            interval = %format_duration(interval),
            "autoscaler started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.reconcile().await {
                        error!(
                            autoscaler = %self.resource.key(),
                            stage = %e.stage(),
                            error = %e,
                            "reconciliation failed"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    info!(autoscaler = %self.resource.key(), "autoscaler shutting down");
                    break;
                }
            }
        }
    }
}
