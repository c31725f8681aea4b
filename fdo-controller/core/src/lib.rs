#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Translates FDO server resources into the configuration documents read by
//! the FDO server binaries.

pub mod address;
mod driver;
pub mod files;
pub mod manufacturing;
pub mod owner_onboarding;
pub mod rendezvous;
pub mod serviceinfo;

pub use self::{
    address::HostAddress,
    driver::StoreDriver,
    files::ServiceInfoFile,
    manufacturing::ManufacturingServerConfig,
    owner_onboarding::OwnerOnboardingServerConfig,
    rendezvous::RendezvousServerConfig,
    serviceinfo::ServiceInfoApiServerConfig,
};
pub use fdo_controller_k8s_api as k8s;

/// Directory in which key and certificate secrets are mounted.
pub const KEYS_DIR: &str = "/etc/fdo/keys";

/// Token shared between the owner-onboarding server and its service-info API
/// sidecar. Both listen in the same pod.
pub const SERVICEINFO_AUTH_TOKEN: &str = "ExampleAuthToken";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("cannot use both DNS and IP address for {0}")]
    BothAddresses(&'static str),

    #[error("either a DNS or IP address is required for {0}")]
    MissingAddress(&'static str),

    #[error("invalid IP address {addr:?} for {target}")]
    InvalidIpAddress { target: &'static str, addr: String },

    #[error("rendezvous servers must contain at least one value")]
    NoRendezvousServers,

    #[error("owner addresses must contain at least one value")]
    NoOwnerAddresses,

    #[error("owner address for transport {0} must contain at least one address")]
    EmptyOwnerAddress(k8s::Transport),

    #[error("DIUN requires at least one allowed key storage type")]
    NoKeyStorageTypes,

    #[error("serviceinfo file name and destination path are required: {0}")]
    IncompleteFile(String),

    #[error("configmap '{config_map}' does not contain file '{file}'")]
    MissingFileData { config_map: String, file: String },

    #[error("failed to encode configuration: {0}")]
    Encode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Encodes a configuration document as YAML.
///
/// Enum variants carrying data are written as single-key maps
/// (`Directory: {path: ...}`) rather than YAML tags.
pub fn to_yaml<T: serde::Serialize>(config: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_yaml::Serializer::new(&mut buf);
    serde_yaml::with::singleton_map_recursive::serialize(config, &mut ser).map_err(encode)?;
    drop(ser);
    String::from_utf8(buf).map_err(encode)
}

fn encode(error: impl std::fmt::Display) -> Error {
    Error::Encode(error.to_string())
}
