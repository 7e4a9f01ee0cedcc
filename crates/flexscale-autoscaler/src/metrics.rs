//! Metric evaluation.
//!
//! Every configured metric is looked up on each pass and paired with its
//! declared target. Any failed lookup aborts the whole evaluation: a
//! recommendation built from a partial metric set is not produced.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use flexscale_api::{MetricSpec, MetricTargetType};

use crate::error::{within, AutoscalerError, AutoscalerResult, Stage};

/// Boxed future alias for metric lookups.
pub type MetricFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<f64>> + Send + 'a>>;

/// Source of current metric values, injected by the caller.
pub trait MetricSource: Send + Sync {
    /// Current observed value for `metric`.
    fn current_value<'a>(&'a self, metric: &'a MetricSpec) -> MetricFuture<'a>;
}

/// One observation paired with its target.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub observed: f64,
    pub target_type: MetricTargetType,
    pub target_value: f64,
}

/// Looks up every metric of a spec against a `MetricSource`.
pub struct MetricEvaluator {
    source: Arc<dyn MetricSource>,
    call_timeout: Duration,
}

impl MetricEvaluator {
    pub fn new(source: Arc<dyn MetricSource>, call_timeout: Duration) -> Self {
        Self {
            source,
            call_timeout,
        }
    }

    /// Observations in the same order and length as `specs`.
    pub async fn evaluate(&self, specs: &[MetricSpec]) -> AutoscalerResult<Vec<Metric>> {
        let mut metrics = Vec::with_capacity(specs.len());
        for spec in specs {
            let observed = within(Stage::FetchingMetrics, self.call_timeout, async {
                self.source
                    .current_value(spec)
                    .await
                    .map_err(|e| AutoscalerError::Metric {
                        metric: spec.name.clone(),
                        source: e.into(),
                    })
            })
            .await?;

            debug!(
                metric = %spec.name,
                observed,
                target = spec.target.value,
                target_type = %spec.target.target_type,
                "observed metric"
            );
            metrics.push(Metric {
                observed,
                target_type: spec.target.target_type,
                target_value: spec.target.value,
            });
        }
        Ok(metrics)
    }
}
