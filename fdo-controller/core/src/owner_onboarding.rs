use crate::{
    address::HostAddress,
    driver::StoreDriver,
    k8s::{onboarding::OwnerAddress as OwnerAddressSpec, FdoOnboardingServerSpec, Transport},
    serviceinfo, Error, Result, KEYS_DIR, SERVICEINFO_AUTH_TOKEN,
};
use serde::Serialize;

pub const BIND: &str = "0.0.0.0:8081";
pub const PORT: u16 = 8081;
pub const FILE_NAME: &str = "owner-onboarding-server.yml";
pub const CONFIG_DIR: &str = "/etc/fdo/owner-onboarding-server.conf.d";

/// Key and certificate files, as `(secret, file)`, mounted into
/// [`KEYS_DIR`].
pub const KEY_FILES: [(&str, &str); 3] = [
    ("fdo-owner-cert", "owner_cert.pem"),
    ("fdo-owner-key", "owner_key.der"),
    ("fdo-device-ca-cert", "device_ca_cert.pem"),
];

/// Contents of `owner-onboarding-server.yml`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OwnerOnboardingServerConfig {
    pub session_store_driver: StoreDriver,
    pub ownership_voucher_store_driver: StoreDriver,
    pub bind: String,
    pub trusted_device_keys_path: String,
    pub owner_private_key_path: String,
    pub owner_public_key_path: String,
    pub owner_addresses: Vec<OwnerAddress>,
    #[serde(rename = "report_to_rendezvous_endpoint_enabled")]
    pub report_to_rendezvous_endpoint: bool,
    pub service_info_api_url: String,
    pub service_info_api_authentication: ServiceInfoApiAuthentication,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OwnerAddress {
    pub transport: Transport,
    pub port: u16,
    pub addresses: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ServiceInfoApiAuthentication {
    BearerToken { token: String },
}

// === impl OwnerOnboardingServerConfig ===

impl OwnerOnboardingServerConfig {
    /// Builds the configuration of an onboarding server.
    ///
    /// When no owner addresses are given, devices are pointed at
    /// `route_host` over plain HTTP.
    pub fn new(spec: &FdoOnboardingServerSpec, route_host: Option<&str>) -> Result<Self> {
        let owner_addresses = if spec.owner_addresses.is_empty() {
            let host = route_host
                .filter(|h| !h.is_empty())
                .ok_or(Error::NoOwnerAddresses)?;
            vec![OwnerAddress {
                transport: Transport::Http,
                port: 80,
                addresses: vec![Address {
                    dns_name: Some(host.to_string()),
                    ip_address: None,
                }],
            }]
        } else {
            validate_owner_addresses(&spec.owner_addresses)?
        };

        Ok(Self {
            session_store_driver: StoreDriver::directory("/etc/fdo/sessions/"),
            ownership_voucher_store_driver: StoreDriver::directory("/etc/fdo/ownership_vouchers/"),
            bind: BIND.to_string(),
            trusted_device_keys_path: format!("{KEYS_DIR}/device_ca_cert.pem"),
            owner_private_key_path: format!("{KEYS_DIR}/owner_key.der"),
            owner_public_key_path: format!("{KEYS_DIR}/owner_cert.pem"),
            owner_addresses,
            report_to_rendezvous_endpoint: true,
            service_info_api_url: format!("http://127.0.0.1:{}/device_info", serviceinfo::PORT),
            service_info_api_authentication: ServiceInfoApiAuthentication::BearerToken {
                token: SERVICEINFO_AUTH_TOKEN.to_string(),
            },
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        crate::to_yaml(self)
    }
}

/// Validates owner addresses given in a spec.
pub fn validate_owner_addresses(addrs: &[OwnerAddressSpec]) -> Result<Vec<OwnerAddress>> {
    addrs.iter().map(OwnerAddress::try_from).collect()
}

impl TryFrom<&OwnerAddressSpec> for OwnerAddress {
    type Error = Error;

    fn try_from(spec: &OwnerAddressSpec) -> Result<Self> {
        if spec.addresses.is_empty() {
            return Err(Error::EmptyOwnerAddress(spec.transport));
        }
        let addresses = spec
            .addresses
            .iter()
            .map(|a| {
                HostAddress::try_from(a).map(|addr| Address {
                    dns_name: addr.dns_name().map(ToString::to_string),
                    ip_address: addr.ip_address().map(|ip| ip.to_string()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            transport: spec.transport,
            port: spec.port,
            addresses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::onboarding::Address as AddressSpec;
    use pretty_assertions::assert_eq;

    fn spec(owner_addresses: Vec<OwnerAddressSpec>) -> FdoOnboardingServerSpec {
        FdoOnboardingServerSpec {
            owner_onboarding_image: "owner:latest".to_string(),
            service_info_image: "serviceinfo:latest".to_string(),
            owner_addresses,
            service_info: None,
        }
    }

    fn yaml(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).expect("yaml must parse")
    }

    #[test]
    fn generates_config_from_spec_addresses() {
        let spec = spec(vec![OwnerAddressSpec {
            transport: Transport::Https,
            port: 443,
            addresses: vec![
                AddressSpec {
                    dns_name: Some("owner.example.com".to_string()),
                    ip_address: None,
                },
                AddressSpec {
                    dns_name: None,
                    ip_address: Some("10.1.2.3".to_string()),
                },
            ],
        }]);

        let config = OwnerOnboardingServerConfig::new(&spec, Some("ignored.apps.example.com"))
            .expect("config must be valid");
        assert_eq!(
            yaml(&config.to_yaml().expect("config must encode")),
            yaml(
                r#"
session_store_driver:
  Directory:
    path: /etc/fdo/sessions/
ownership_voucher_store_driver:
  Directory:
    path: /etc/fdo/ownership_vouchers/
bind: 0.0.0.0:8081
trusted_device_keys_path: /etc/fdo/keys/device_ca_cert.pem
owner_private_key_path: /etc/fdo/keys/owner_key.der
owner_public_key_path: /etc/fdo/keys/owner_cert.pem
owner_addresses:
  - transport: https
    port: 443
    addresses:
      - dns_name: owner.example.com
      - ip_address: 10.1.2.3
report_to_rendezvous_endpoint_enabled: true
service_info_api_url: http://127.0.0.1:8083/device_info
service_info_api_authentication:
  BearerToken:
    token: ExampleAuthToken
"#
            )
        );
    }

    #[test]
    fn falls_back_to_route_host() {
        let config = OwnerOnboardingServerConfig::new(&spec(vec![]), Some("fdo.apps.example.com"))
            .expect("config must be valid");
        assert_eq!(
            config.owner_addresses,
            vec![OwnerAddress {
                transport: Transport::Http,
                port: 80,
                addresses: vec![Address {
                    dns_name: Some("fdo.apps.example.com".to_string()),
                    ip_address: None,
                }],
            }]
        );
    }

    #[test]
    fn requires_owner_addresses() {
        assert_eq!(
            OwnerOnboardingServerConfig::new(&spec(vec![]), None),
            Err(Error::NoOwnerAddresses)
        );
        assert_eq!(
            OwnerOnboardingServerConfig::new(&spec(vec![]), Some("")),
            Err(Error::NoOwnerAddresses)
        );
    }

    #[test]
    fn rejects_invalid_addresses() {
        let empty = spec(vec![OwnerAddressSpec {
            transport: Transport::Tcp,
            port: 8081,
            addresses: vec![],
        }]);
        assert_eq!(
            OwnerOnboardingServerConfig::new(&empty, None),
            Err(Error::EmptyOwnerAddress(Transport::Tcp))
        );

        let neither = spec(vec![OwnerAddressSpec {
            transport: Transport::Http,
            port: 80,
            addresses: vec![AddressSpec::default()],
        }]);
        assert_eq!(
            OwnerOnboardingServerConfig::new(&neither, None),
            Err(Error::MissingAddress("owner address"))
        );
    }
}
