use crate::k8s::{
    api::core::v1::ObjectReference, Api, Client, ConfigMap, Deployment, FdoManufacturingServer,
    FdoOnboardingServer, FdoRendezvousServer, ListParams, Patch, PatchParams,
    PersistentVolumeClaim, Pod, PostParams, ResourceExt, Route, ServerStatus, Service,
    ServiceType,
};
use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

/// Field manager used for server-side apply.
pub const FIELD_MANAGER: &str = "fdo-controller";

/// Reason attached to events published for failed reconciles.
pub const PROCESSING_ERROR: &str = "ProcessingError";

/// Cluster operations performed by the reconcilers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn apply_config_map(&self, ns: &str, cm: ConfigMap) -> Result<ConfigMap, kube::Error>;

    async fn apply_deployment(
        &self,
        ns: &str,
        deploy: Deployment,
    ) -> Result<Deployment, kube::Error>;

    async fn apply_service(&self, ns: &str, svc: Service) -> Result<Service, kube::Error>;

    async fn apply_route(&self, ns: &str, route: Route) -> Result<Route, kube::Error>;

    /// Creates the claim unless one with the same name exists. Existing
    /// claims are left untouched.
    async fn ensure_pvc(&self, ns: &str, pvc: PersistentVolumeClaim) -> Result<(), kube::Error>;

    async fn list_config_maps(
        &self,
        ns: &str,
        selector: &str,
    ) -> Result<Vec<ConfigMap>, kube::Error>;

    async fn list_pod_names(&self, ns: &str, selector: &str) -> Result<Vec<String>, kube::Error>;

    async fn patch_status(
        &self,
        kind: ServiceType,
        ns: &str,
        name: &str,
        status: &ServerStatus,
    ) -> Result<(), kube::Error>;

    /// Publishes a warning event on the resource. Failures are logged.
    async fn publish_warning(&self, reference: &ObjectReference, note: String);
}

pub struct KubeCluster {
    client: Client,
    recorder: Recorder,
}

// === impl KubeCluster ===

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: FIELD_MANAGER.to_string(),
            instance: std::env::var("HOSTNAME").ok(),
        };
        Self {
            recorder: Recorder::new(client.clone(), reporter),
            client,
        }
    }

    async fn apply<T>(&self, ns: &str, obj: T) -> Result<T, kube::Error>
    where
        T: kube::Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned
            + Serialize,
    {
        let name = obj.name_any();
        let api = Api::<T>::namespaced(self.client.clone(), ns);
        let params = PatchParams::apply(FIELD_MANAGER).force();
        let applied = api.patch(&name, &params, &Patch::Apply(&obj)).await?;
        debug!(kind = %T::kind(&()), %ns, %name, "Applied");
        Ok(applied)
    }

    async fn patch_status_of<T>(
        &self,
        ns: &str,
        name: &str,
        status: &ServerStatus,
    ) -> Result<(), kube::Error>
    where
        T: kube::Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let api = Api::<T>::namespaced(self.client.clone(), ns);
        api.patch_status(
            name,
            &PatchParams::default(),
            &Patch::Merge(&status_patch(status)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn apply_config_map(&self, ns: &str, cm: ConfigMap) -> Result<ConfigMap, kube::Error> {
        self.apply(ns, cm).await
    }

    async fn apply_deployment(
        &self,
        ns: &str,
        deploy: Deployment,
    ) -> Result<Deployment, kube::Error> {
        self.apply(ns, deploy).await
    }

    async fn apply_service(&self, ns: &str, svc: Service) -> Result<Service, kube::Error> {
        self.apply(ns, svc).await
    }

    async fn apply_route(&self, ns: &str, route: Route) -> Result<Route, kube::Error> {
        self.apply(ns, route).await
    }

    async fn ensure_pvc(&self, ns: &str, pvc: PersistentVolumeClaim) -> Result<(), kube::Error> {
        let api = Api::<PersistentVolumeClaim>::namespaced(self.client.clone(), ns);
        let name = pvc.name_any();
        if api.get_opt(&name).await?.is_some() {
            return Ok(());
        }
        match api.create(&PostParams::default(), &pvc).await {
            Ok(_) => {
                debug!(%ns, %name, "Created PersistentVolumeClaim");
                Ok(())
            }
            // Created concurrently.
            Err(kube::Error::Api(rsp)) if rsp.code == 409 => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn list_config_maps(
        &self,
        ns: &str,
        selector: &str,
    ) -> Result<Vec<ConfigMap>, kube::Error> {
        let api = Api::<ConfigMap>::namespaced(self.client.clone(), ns);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }

    async fn list_pod_names(&self, ns: &str, selector: &str) -> Result<Vec<String>, kube::Error> {
        let api = Api::<Pod>::namespaced(self.client.clone(), ns);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        let mut names = list.items.iter().map(|p| p.name_any()).collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    async fn patch_status(
        &self,
        kind: ServiceType,
        ns: &str,
        name: &str,
        status: &ServerStatus,
    ) -> Result<(), kube::Error> {
        match kind {
            ServiceType::Manufacturing => {
                self.patch_status_of::<FdoManufacturingServer>(ns, name, status)
                    .await
            }
            ServiceType::OwnerOnboarding => {
                self.patch_status_of::<FdoOnboardingServer>(ns, name, status)
                    .await
            }
            ServiceType::Rendezvous => {
                self.patch_status_of::<FdoRendezvousServer>(ns, name, status)
                    .await
            }
        }
    }

    async fn publish_warning(&self, reference: &ObjectReference, note: String) {
        let event = Event {
            type_: EventType::Warning,
            reason: PROCESSING_ERROR.to_string(),
            note: Some(note),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(error) = self.recorder.publish(&event, reference).await {
            warn!(%error, "Failed to publish event");
        }
    }
}

fn status_patch(status: &ServerStatus) -> serde_json::Value {
    serde_json::json!({ "status": status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_patch_clears_pods() {
        let status = ServerStatus {
            pods: vec![],
            conditions: vec![],
        };
        let patch = status_patch(&status);
        assert_eq!(patch["status"]["pods"], serde_json::json!([]));
    }
}
