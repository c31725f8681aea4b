use super::{status::ServerStatus, Transport};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OWNER_ONBOARDING_IMAGE: &str = "quay.io/vemporop/fdo-owner-onboarding-server:1.0";
pub const DEFAULT_SERVICEINFO_IMAGE: &str = "quay.io/vemporop/fdo-serviceinfo-api-server:1.0";

/// Describes an owner-onboarding server together with the service-info API
/// server that drives the device onboarding sequence.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fdo.redhat.com",
    version = "v1alpha1",
    kind = "FDOOnboardingServer",
    root = "FdoOnboardingServer",
    status = "ServerStatus",
    shortname = "fdoonb",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FdoOnboardingServerSpec {
    #[serde(default = "default_owner_onboarding_image")]
    pub owner_onboarding_image: String,

    #[serde(default = "default_serviceinfo_image")]
    pub service_info_image: String,

    /// Owner addresses reported to rendezvous servers. The route host is used
    /// when none are given.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_addresses: Vec<OwnerAddress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_info: Option<ServiceInfo>,
}

/// An address and transport for contacting the owner-onboarding server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAddress {
    #[serde(default)]
    pub transport: Transport,

    #[serde(default = "default_owner_port")]
    pub port: u16,

    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// A host address, either a DNS name or an IP address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// A custom device onboarding sequence run through the service-info API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_user: Option<InitialUser>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,

    #[serde(
        default,
        rename = "diskEncryptionClevis",
        alias = "diskencryptionClevis",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub disk_encryption_clevis: Vec<DiskEncryptionClevis>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitialUser {
    pub username: String,

    #[serde(default)]
    pub ssh_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub may_fail: bool,

    #[serde(default, rename = "returnStdOut")]
    pub return_stdout: bool,

    #[serde(default, rename = "returnStdErr")]
    pub return_stderr: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskEncryptionClevis {
    pub disk_label: String,

    pub binding: ClevisBinding,

    #[serde(default, rename = "reencrypt")]
    pub re_encrypt: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClevisBinding {
    #[serde(default)]
    pub pin: String,

    #[serde(default)]
    pub config: String,
}

fn default_owner_onboarding_image() -> String {
    DEFAULT_OWNER_ONBOARDING_IMAGE.to_string()
}

fn default_serviceinfo_image() -> String {
    DEFAULT_SERVICEINFO_IMAGE.to_string()
}

fn default_owner_port() -> u16 {
    80
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn crd_metadata() {
        let crd = FdoOnboardingServer::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("fdoonboardingservers.fdo.redhat.com")
        );
        assert_eq!(crd.spec.names.kind, "FDOOnboardingServer");
        assert_eq!(crd.spec.names.short_names, Some(vec!["fdoonb".to_string()]));
    }

    #[test]
    fn owner_address_defaults() {
        let addr: OwnerAddress = serde_yaml::from_str(
            r#"
addresses:
  - dnsName: owner.example.com
"#,
        )
        .expect("address must parse");

        assert_eq!(
            addr,
            OwnerAddress {
                transport: Transport::Http,
                port: 80,
                addresses: vec![Address {
                    dns_name: Some("owner.example.com".to_string()),
                    ip_address: None,
                }],
            }
        );
    }

    #[test]
    fn parses_service_info() {
        let spec: FdoOnboardingServerSpec = serde_yaml::from_str(
            r#"
serviceInfo:
  initialUser:
    username: admin
    sshKeys: ["ssh-ed25519 AAAA admin@example.com"]
  commands:
    - command: systemctl
      args: ["enable", "--now", "cockpit.socket"]
      returnStdOut: true
  diskEncryptionClevis:
    - diskLabel: /dev/vda
      binding:
        pin: tpm2
        config: "{}"
      reencrypt: true
"#,
        )
        .expect("spec must parse");

        assert_eq!(spec.owner_onboarding_image, DEFAULT_OWNER_ONBOARDING_IMAGE);
        assert_eq!(spec.service_info_image, DEFAULT_SERVICEINFO_IMAGE);
        let si = spec.service_info.expect("service info must be set");
        assert_eq!(
            si.initial_user,
            Some(InitialUser {
                username: "admin".to_string(),
                ssh_keys: vec!["ssh-ed25519 AAAA admin@example.com".to_string()],
            })
        );
        assert!(si.commands[0].return_stdout);
        assert!(!si.commands[0].return_stderr);
        assert!(si.disk_encryption_clevis[0].re_encrypt);
        assert_eq!(si.disk_encryption_clevis[0].binding.pin, "tpm2");
    }
}
