#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;
pub mod manufacturing;
pub mod onboarding;
pub mod rendezvous;
pub mod route;
pub mod status;

pub use self::{
    labels::ServiceType,
    manufacturing::{FdoManufacturingServer, FdoManufacturingServerSpec},
    onboarding::{FdoOnboardingServer, FdoOnboardingServerSpec},
    rendezvous::{FdoRendezvousServer, FdoRendezvousServerSpec},
    route::Route,
    status::ServerStatus,
};
pub use k8s_openapi::{
    api::{
        self,
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            ConfigMap, Container, PersistentVolumeClaim, Pod, PodSpec, PodTemplateSpec,
            ResourceRequirements, Service, ServiceSpec,
        },
    },
    apimachinery::{
        self,
        pkg::apis::meta::v1::{Condition, Time},
    },
};
pub use kube::{
    api::{Api, ListParams, ObjectMeta, Patch, PatchParams, PostParams, ResourceExt},
    Client, CustomResourceExt, Error, Resource,
};

/// The API group shared by all FDO custom resources.
pub const API_GROUP: &str = "fdo.redhat.com";

/// Transport protocols understood by FDO clients and servers.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Tls,
    #[default]
    Http,
    Coap,
    Https,
    Coaps,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Http => "http",
            Self::Coap => "coap",
            Self::Https => "https",
            Self::Coaps => "coaps",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
