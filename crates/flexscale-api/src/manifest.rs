//! TOML manifest loading and validation.
//!
//! ```toml
//! [metadata]
//! name = "api"
//! namespace = "default"
//!
//! [spec]
//! min_replicas = 1
//! max_replicas = 10
//!
//! [spec.scale_target_ref]
//! api_version = "apps/v1"
//! kind = "Deployment"
//! name = "api"
//!
//! [[spec.metrics]]
//! name = "cpu"
//! query = "avg(rate(container_cpu_usage_seconds_total[1m]))"
//! target = { type = "utilization", value = 50.0 }
//! ```

use std::path::Path;

use tracing::debug;

use crate::error::{ManifestError, ManifestResult};
use crate::types::{HorizontalAutoscaler, ScalingRules};

impl HorizontalAutoscaler {
    /// Parse and validate a manifest.
    pub fn from_toml_str(s: &str) -> ManifestResult<Self> {
        let autoscaler: HorizontalAutoscaler = toml::from_str(s)?;
        autoscaler.validate()?;
        Ok(autoscaler)
    }

    /// Read, parse and validate a manifest file.
    pub fn from_file(path: &Path) -> ManifestResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let autoscaler = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), autoscaler = %autoscaler.key(), "loaded manifest");
        Ok(autoscaler)
    }

    pub fn to_toml_string(&self) -> ManifestResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the spec for problems that would make every pass fail or
    /// misbehave. All problems are reported together.
    pub fn validate(&self) -> ManifestResult<()> {
        let mut problems = Vec::new();
        let spec = &self.spec;

        if self.metadata.name.is_empty() {
            problems.push("metadata.name must not be empty".to_string());
        }
        if self.metadata.namespace.is_empty() {
            problems.push("metadata.namespace must not be empty".to_string());
        }

        let target = &spec.scale_target_ref;
        if target.kind.is_empty() || target.name.is_empty() {
            problems.push("scale_target_ref requires kind and name".to_string());
        }

        if spec.min_replicas < 0 {
            problems.push(format!("min_replicas {} is negative", spec.min_replicas));
        }
        if spec.max_replicas < spec.min_replicas {
            problems.push(format!(
                "max_replicas {} is below min_replicas {}",
                spec.max_replicas, spec.min_replicas
            ));
        }

        if spec.metrics.is_empty() {
            problems.push("at least one metric is required".to_string());
        }
        for metric in &spec.metrics {
            if !(metric.target.value.is_finite() && metric.target.value > 0.0) {
                problems.push(format!(
                    "metric {} target value must be positive, got {}",
                    metric.name, metric.target.value
                ));
            }
        }

        check_rules("scale_up", &spec.behavior.scale_up, &mut problems);
        check_rules("scale_down", &spec.behavior.scale_down, &mut problems);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid(problems))
        }
    }
}

fn check_rules(direction: &str, rules: &ScalingRules, problems: &mut Vec<String>) {
    for policy in &rules.policies {
        if policy.value <= 0 {
            problems.push(format!("{direction} policy value must be positive ({policy})"));
        }
        if policy.period_seconds == 0 {
            problems.push(format!("{direction} policy period must be positive ({policy})"));
        }
    }
}
