//! Autoscaler error types.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Underlying cause reported by an external collaborator.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for reconciliation operations.
pub type AutoscalerResult<T> = Result<T, AutoscalerError>;

/// Stage of a reconciliation pass that performs external I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchingMetrics,
    FetchingTarget,
    Updating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FetchingMetrics => "fetching metrics",
            Self::FetchingTarget => "fetching scale target",
            Self::Updating => "updating scale target",
        };
        f.write_str(s)
    }
}

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum AutoscalerError {
    #[error("failed retrieving metric {metric}: {source}")]
    Metric { metric: String, source: Cause },

    #[error("resolving resource for {reference}: {source}")]
    Resolution { reference: String, source: Cause },

    #[error("getting scale target for {reference}: {source}")]
    Fetch { reference: String, source: Cause },

    #[error("updating {self_link}: {source}")]
    Update { self_link: String, source: Cause },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

impl AutoscalerError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Metric { .. } => Stage::FetchingMetrics,
            Self::Resolution { .. } | Self::Fetch { .. } => Stage::FetchingTarget,
            Self::Update { .. } => Stage::Updating,
            Self::Timeout { stage, .. } => *stage,
        }
    }
}

/// Await `fut`, failing with `Timeout` once `after` elapses. Dropping the
/// inner future cancels the call.
pub(crate) async fn within<T, F>(stage: Stage, after: Duration, fut: F) -> AutoscalerResult<T>
where
    F: Future<Output = AutoscalerResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(AutoscalerError::Timeout { stage, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_of_each_variant() {
        let cause = || -> Cause { "boom".into() };
        let metric = AutoscalerError::Metric {
            metric: "cpu".into(),
            source: cause(),
        };
        let update = AutoscalerError::Update {
            self_link: "/apis/apps/v1/namespaces/default/deployments/api/scale".into(),
            source: cause(),
        };
        assert_eq!(metric.stage(), Stage::FetchingMetrics);
        assert_eq!(update.stage(), Stage::Updating);
        assert!(update.to_string().contains("deployments/api/scale"));
        assert!(metric.to_string().contains("boom"));
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error as _;
        let err = AutoscalerError::Fetch {
            reference: "Deployment/api (apps/v1)".into(),
            source: anyhow::anyhow!("not found").into(),
        };
        assert_eq!(err.source().unwrap().to_string(), "not found");
    }

    #[tokio::test]
    async fn within_times_out() {
        let err = within(Stage::Updating, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AutoscalerError::Timeout {
                stage: Stage::Updating,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn within_passes_result_through() {
        let v = within(Stage::FetchingMetrics, Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }
}
