//! Scale target gateway.
//!
//! Resolves a `CrossVersionObjectReference` to a concrete resource through a
//! `ResourceMapper`, then reads and writes the target's scale through a
//! `ScaleClient`. Both collaborators are injected. No retries happen here;
//! a failed call fails the pass.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use flexscale_api::CrossVersionObjectReference;

use crate::error::{within, AutoscalerError, AutoscalerResult, Stage};

// ── Resource identity ─────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unexpected group/version string: {0:?}")]
pub struct GroupVersionError(String);

/// API group and version parsed from an `api_version` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl FromStr for GroupVersion {
    type Err = GroupVersionError;

    /// `"apps/v1"` → (`apps`, `v1`); `"v1"` → (core group, `v1`); an empty
    /// string is the empty group/version. More than one `/` is malformed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(version), None, None) => Ok(Self {
                group: String::new(),
                version: version.to_string(),
            }),
            (Some(group), Some(version), None) => Ok(Self {
                group: group.to_string(),
                version: version.to_string(),
            }),
            _ => Err(GroupVersionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Concrete resource a scale client operates on, e.g. `deployments.apps`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

// ── Collaborators ─────────────────────────────────────────────────

/// Maps a (group, kind, version) triple to a resource.
pub trait ResourceMapper: Send + Sync {
    fn resource_for(&self, group_kind: &GroupKind, version: &str) -> anyhow::Result<GroupResource>;
}

/// Current scale of a target, as read from the orchestration API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleTarget {
    pub name: String,
    pub namespace: String,
    /// Self-identifying API path, used in error reports.
    pub self_link: String,
    /// Desired replicas declared on the target.
    pub spec_replicas: i32,
    /// Replicas the target currently runs.
    pub status_replicas: i32,
}

/// Boxed future alias for scale client calls.
pub type ScaleFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<ScaleTarget>> + Send + 'a>>;

/// Orchestration API scale subresource client, injected by the caller.
pub trait ScaleClient: Send + Sync {
    fn get<'a>(
        &'a self,
        namespace: &'a str,
        resource: &'a GroupResource,
        name: &'a str,
    ) -> ScaleFuture<'a>;

    /// Persist `target.spec_replicas`; returns the stored object.
    fn update<'a>(
        &'a self,
        namespace: &'a str,
        resource: &'a GroupResource,
        target: &'a ScaleTarget,
    ) -> ScaleFuture<'a>;
}

/// In-memory mapper over registered (group, version, kind) entries.
#[derive(Debug, Clone, Default)]
pub struct StaticResourceMapper {
    mappings: HashMap<(String, String, String), String>,
}

impl StaticResourceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mappings for the built-in scalable workload kinds.
    pub fn with_defaults() -> Self {
        Self::new()
            .register("apps", "v1", "Deployment", "deployments")
            .register("apps", "v1", "StatefulSet", "statefulsets")
            .register("apps", "v1", "ReplicaSet", "replicasets")
    }

    pub fn register(mut self, group: &str, version: &str, kind: &str, resource: &str) -> Self {
        self.mappings.insert(
            (group.to_string(), version.to_string(), kind.to_string()),
            resource.to_string(),
        );
        self
    }
}

impl ResourceMapper for StaticResourceMapper {
    fn resource_for(&self, group_kind: &GroupKind, version: &str) -> anyhow::Result<GroupResource> {
        let key = (
            group_kind.group.clone(),
            version.to_string(),
            group_kind.kind.clone(),
        );
        let resource = self
            .mappings
            .get(&key)
            .ok_or_else(|| anyhow::anyhow!("no matches for kind {group_kind} in version {version}"))?;
        Ok(GroupResource {
            group: group_kind.group.clone(),
            resource: resource.clone(),
        })
    }
}

// ── Gateway ───────────────────────────────────────────────────────

/// Resolution plus get/update against the scale client, with each remote
/// call bounded by `call_timeout`.
#[derive(Clone)]
pub struct ScaleTargetGateway {
    mapper: Arc<dyn ResourceMapper>,
    client: Arc<dyn ScaleClient>,
    call_timeout: Duration,
}

impl ScaleTargetGateway {
    pub fn new(
        mapper: Arc<dyn ResourceMapper>,
        client: Arc<dyn ScaleClient>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            mapper,
            client,
            call_timeout,
        }
    }

    /// Resolve an API version and kind to a resource.
    pub fn resolve(&self, api_version: &str, kind: &str) -> AutoscalerResult<GroupResource> {
        let reference = format!("{kind} ({api_version})");
        let gv = api_version
            .parse::<GroupVersion>()
            .map_err(|e| AutoscalerError::Resolution {
                reference: reference.clone(),
                source: Box::new(e),
            })?;
        let group_kind = GroupKind {
            group: gv.group,
            kind: kind.to_string(),
        };
        self.mapper
            .resource_for(&group_kind, &gv.version)
            .map_err(|e| AutoscalerError::Resolution {
                reference,
                source: e.into(),
            })
    }

    /// Fetch the current scale of the referenced target.
    pub async fn get(
        &self,
        namespace: &str,
        resource: &GroupResource,
        reference: &CrossVersionObjectReference,
    ) -> AutoscalerResult<ScaleTarget> {
        let target = within(Stage::FetchingTarget, self.call_timeout, async {
            self.client
                .get(namespace, resource, &reference.name)
                .await
                .map_err(|e| AutoscalerError::Fetch {
                    reference: reference.to_string(),
                    source: e.into(),
                })
        })
        .await?;
        debug!(
            target = %reference,
            %resource,
            spec_replicas = target.spec_replicas,
            status_replicas = target.status_replicas,
            "fetched scale target"
        );
        Ok(target)
    }

    /// Persist `target`; returns the object the API stored.
    pub async fn update(
        &self,
        namespace: &str,
        resource: &GroupResource,
        target: &ScaleTarget,
    ) -> AutoscalerResult<ScaleTarget> {
        within(Stage::Updating, self.call_timeout, async {
            self.client
                .update(namespace, resource, target)
                .await
                .map_err(|e| AutoscalerError::Update {
                    self_link: target.self_link.clone(),
                    source: e.into(),
                })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn parse_group_version() {
        let gv: GroupVersion = "apps/v1".parse().unwrap();
        assert_eq!(gv.group, "apps");
        assert_eq!(gv.version, "v1");

        let core: GroupVersion = "v1".parse().unwrap();
        assert_eq!(core.group, "");
        assert_eq!(core.version, "v1");

        assert_eq!("".parse::<GroupVersion>(), Ok(GroupVersion::default()));
        assert!("a/b/c".parse::<GroupVersion>().is_err());
    }

    #[test]
    fn group_resource_display() {
        let gr = GroupResource {
            group: "apps".into(),
            resource: "deployments".into(),
        };
        assert_eq!(gr.to_string(), "deployments.apps");
    }

    struct FakeClient {
        target: Mutex<Option<ScaleTarget>>,
    }

    impl ScaleClient for FakeClient {
        fn get<'a>(&'a self, _ns: &'a str, _r: &'a GroupResource, name: &'a str) -> ScaleFuture<'a> {
            Box::pin(async move {
                self.target
                    .lock()
                    .unwrap()
                    .clone()
                    .filter(|t| t.name == name)
                    .ok_or_else(|| anyhow::anyhow!("{name} not found"))
            })
        }

        fn update<'a>(
            &'a self,
            _ns: &'a str,
            _r: &'a GroupResource,
            target: &'a ScaleTarget,
        ) -> ScaleFuture<'a> {
            Box::pin(async move {
                let mut stored = self.target.lock().unwrap();
                match stored.as_mut() {
                    Some(s) => {
                        s.spec_replicas = target.spec_replicas;
                        Ok(s.clone())
                    }
                    None => Err(anyhow::anyhow!("conflict")),
                }
            })
        }
    }

    fn target() -> ScaleTarget {
        ScaleTarget {
            name: "api".into(),
            namespace: "default".into(),
            self_link: "/apis/apps/v1/namespaces/default/deployments/api/scale".into(),
            spec_replicas: 3,
            status_replicas: 3,
        }
    }

    fn gateway(stored: Option<ScaleTarget>) -> ScaleTargetGateway {
        ScaleTargetGateway::new(
            Arc::new(StaticResourceMapper::with_defaults()),
            Arc::new(FakeClient {
                target: Mutex::new(stored),
            }),
            Duration::from_secs(1),
        )
    }

    fn reference(name: &str) -> CrossVersionObjectReference {
        CrossVersionObjectReference {
            api_version: "apps/v1".into(),
            kind: "Deployment".into(),
            name: name.into(),
        }
    }

    #[test]
    fn resolve_known_kind() {
        let gr = gateway(None).resolve("apps/v1", "Deployment").unwrap();
        assert_eq!(gr.to_string(), "deployments.apps");
    }

    #[test]
    fn resolve_malformed_version() {
        let err = gateway(None).resolve("apps/v1/extra", "Deployment").unwrap_err();
        assert!(matches!(err, AutoscalerError::Resolution { .. }));
        assert!(err.to_string().contains("apps/v1/extra"), "{err}");
    }

    #[test]
    fn resolve_unmapped_kind() {
        let err = gateway(None).resolve("apps/v1", "CronJob").unwrap_err();
        assert!(matches!(err, AutoscalerError::Resolution { .. }));
        assert!(err.to_string().contains("no matches for kind CronJob.apps"), "{err}");
    }

    #[test]
    fn custom_mapping() {
        let mapper = StaticResourceMapper::new().register(
            "",
            "v1",
            "ReplicationController",
            "replicationcontrollers",
        );
        let gr = mapper
            .resource_for(
                &GroupKind {
                    group: String::new(),
                    kind: "ReplicationController".into(),
                },
                "v1",
            )
            .unwrap();
        assert_eq!(gr.to_string(), "replicationcontrollers");
    }

    #[tokio::test]
    async fn get_wraps_not_found() {
        let gw = gateway(Some(target()));
        let gr = gw.resolve("apps/v1", "Deployment").unwrap();

        let found = gw.get("default", &gr, &reference("api")).await.unwrap();
        assert_eq!(found.spec_replicas, 3);

        let err = gw.get("default", &gr, &reference("web")).await.unwrap_err();
        assert!(matches!(err, AutoscalerError::Fetch { .. }));
        assert!(err.to_string().contains("Deployment/web"), "{err}");
    }

    #[tokio::test]
    async fn update_returns_stored_object() {
        let gw = gateway(Some(target()));
        let gr = gw.resolve("apps/v1", "Deployment").unwrap();

        let mut desired = target();
        desired.spec_replicas = 6;
        let stored = gw.update("default", &gr, &desired).await.unwrap();
        assert_eq!(stored.spec_replicas, 6);
    }

    #[tokio::test]
    async fn update_error_names_self_link() {
        let gw = gateway(None);
        let gr = gw.resolve("apps/v1", "Deployment").unwrap();

        let err = gw.update("default", &gr, &target()).await.unwrap_err();
        assert!(matches!(err, AutoscalerError::Update { .. }));
        assert!(err.to_string().contains("deployments/api/scale"), "{err}");
    }
}
