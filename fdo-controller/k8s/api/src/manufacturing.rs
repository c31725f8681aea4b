use super::{status::ServerStatus, Transport};
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE: &str = "quay.io/vemporop/fdo-manufacturing-server:rhel9.3";

/// Describes a manufacturing server, which runs device initialization and
/// produces ownership vouchers.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fdo.redhat.com",
    version = "v1alpha1",
    kind = "FDOManufacturingServer",
    root = "FdoManufacturingServer",
    status = "ServerStatus",
    shortname = "fdomfg",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FdoManufacturingServerSpec {
    /// Desired number of replicas.
    #[serde(default = "default_replicas")]
    #[schemars(range(min = 0))]
    pub replicas: i32,

    #[serde(default = "default_image")]
    pub image: String,

    /// Resources allocated for a manufacturing server pod.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Storage class used for the ownership vouchers volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    /// Hostname of the route the server is exposed through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    pub rendezvous_servers: Vec<RendezvousServer>,

    #[serde(default)]
    pub protocols: Protocols,
}

/// A rendezvous server entry written into device credentials.
///
/// Either `dns` or `ipAddress` must be set, but not both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RendezvousServer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Rendezvous port for device connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_port: Option<u16>,

    /// Rendezvous port for owner connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Transport>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Protocols {
    #[serde(default, rename = "plainDI")]
    pub plain_di: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diun: Option<Diun>,
}

/// Device Initialize over Untrusted Networks.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diun {
    pub key_type: KeyType,
    pub allowed_key_storage_types: Vec<KeyStorageType>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum KeyType {
    #[serde(rename = "SECP256R1")]
    Secp256r1,
    #[serde(rename = "SECP384R1")]
    Secp384r1,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum KeyStorageType {
    FileSystem,
    Tpm,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Off => "OFF",
        }
    }
}

fn default_replicas() -> i32 {
    1
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}
