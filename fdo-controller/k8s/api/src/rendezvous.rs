use super::status::ServerStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE: &str = "quay.io/vemporop/fdo-rendezvous-server:rhel9.3";

/// Describes a rendezvous server, which brokers between devices and their
/// owners.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fdo.redhat.com",
    version = "v1alpha1",
    kind = "FDORendezvousServer",
    root = "FdoRendezvousServer",
    status = "ServerStatus",
    shortname = "fdorv",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FdoRendezvousServerSpec {
    #[serde(default = "default_image")]
    pub image: String,
}

impl Default for FdoRendezvousServerSpec {
    fn default() -> Self {
        Self {
            image: default_image(),
        }
    }
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn crd_metadata() {
        let crd = FdoRendezvousServer::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("fdorendezvousservers.fdo.redhat.com")
        );
        assert_eq!(crd.spec.names.kind, "FDORendezvousServer");
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn empty_spec_uses_default_image() {
        let spec: FdoRendezvousServerSpec =
            serde_json::from_value(serde_json::json!({})).expect("spec must parse");
        assert_eq!(spec, FdoRendezvousServerSpec::default());
    }
}
