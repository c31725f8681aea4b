use crate::{
    address::HostAddress,
    driver::StoreDriver,
    k8s::{
        manufacturing::{Diun, KeyStorageType, KeyType, Protocols, RendezvousServer},
        FdoManufacturingServerSpec, Transport,
    },
    Error, Result, KEYS_DIR,
};
use serde::Serialize;

pub const BIND: &str = "0.0.0.0:8080";
pub const PORT: u16 = 8080;
pub const FILE_NAME: &str = "manufacturing-server.yml";
pub const CONFIG_DIR: &str = "/etc/fdo/manufacturing-server.conf.d";

/// Key and certificate files, as `(secret, file)`, mounted into
/// [`KEYS_DIR`].
pub const KEY_FILES: [(&str, &str); 7] = [
    ("fdo-diun-cert", "diun_cert.pem"),
    ("fdo-diun-key", "diun_key.der"),
    ("fdo-manufacturer-cert", "manufacturer_cert.pem"),
    ("fdo-manufacturer-key", "manufacturer_key.der"),
    ("fdo-owner-cert", "owner_cert.pem"),
    ("fdo-device-ca-key", "device_ca_key.der"),
    ("fdo-device-ca-cert", "device_ca_cert.pem"),
];

/// Contents of `manufacturing-server.yml`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManufacturingServerConfig {
    pub session_store_driver: StoreDriver,
    pub ownership_voucher_store_driver: StoreDriver,
    pub public_key_store_driver: StoreDriver,
    pub bind: String,
    pub rendezvous_info: Vec<RendezvousInfo>,
    pub protocols: ProtocolsConfig,
    pub manufacturing: Manufacturing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RendezvousInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(rename = "ipaddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Transport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProtocolsConfig {
    pub plain_di: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diun: Option<DiunConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiunConfig {
    pub key_path: String,
    pub cert_path: String,
    pub key_type: KeyType,
    pub mfg_string_type: String,
    pub allowed_key_storage_types: Vec<KeyStorageType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Manufacturing {
    pub manufacturer_cert_path: String,
    pub manufacturer_private_key: String,
    pub owner_cert_path: String,
    pub device_cert_ca_private_key: String,
    pub device_cert_ca_chain: String,
}

// === impl ManufacturingServerConfig ===

impl ManufacturingServerConfig {
    pub fn new(spec: &FdoManufacturingServerSpec) -> Result<Self> {
        if spec.rendezvous_servers.is_empty() {
            return Err(Error::NoRendezvousServers);
        }
        let rendezvous_info = spec
            .rendezvous_servers
            .iter()
            .map(RendezvousInfo::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            session_store_driver: StoreDriver::directory("/etc/fdo/sessions/"),
            ownership_voucher_store_driver: StoreDriver::directory("/etc/fdo/ownership_vouchers/"),
            public_key_store_driver: StoreDriver::directory(format!("{KEYS_DIR}/")),
            bind: BIND.to_string(),
            rendezvous_info,
            protocols: ProtocolsConfig::try_from(&spec.protocols)?,
            manufacturing: Manufacturing {
                manufacturer_cert_path: key_path("manufacturer_cert.pem"),
                manufacturer_private_key: key_path("manufacturer_key.der"),
                owner_cert_path: key_path("owner_cert.pem"),
                device_cert_ca_private_key: key_path("device_ca_key.der"),
                device_cert_ca_chain: key_path("device_ca_cert.pem"),
            },
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        crate::to_yaml(self)
    }
}

impl TryFrom<&RendezvousServer> for RendezvousInfo {
    type Error = Error;

    fn try_from(server: &RendezvousServer) -> Result<Self> {
        let addr = HostAddress::from_fields(
            "rendezvous server",
            server.dns.as_deref(),
            server.ip_address.as_deref(),
        )?;
        Ok(Self {
            dns: addr.dns_name().map(ToString::to_string),
            ip_address: addr.ip_address().map(|ip| ip.to_string()),
            device_port: server.device_port,
            owner_port: server.owner_port,
            protocol: server.protocol,
        })
    }
}

impl TryFrom<&Protocols> for ProtocolsConfig {
    type Error = Error;

    fn try_from(protocols: &Protocols) -> Result<Self> {
        let diun = protocols
            .diun
            .as_ref()
            .map(DiunConfig::try_from)
            .transpose()?;
        Ok(Self {
            plain_di: protocols.plain_di,
            diun,
        })
    }
}

impl TryFrom<&Diun> for DiunConfig {
    type Error = Error;

    fn try_from(diun: &Diun) -> Result<Self> {
        if diun.allowed_key_storage_types.is_empty() {
            return Err(Error::NoKeyStorageTypes);
        }
        Ok(Self {
            key_path: key_path("diun_key.der"),
            cert_path: key_path("diun_cert.pem"),
            key_type: diun.key_type,
            mfg_string_type: "SerialNumber".to_string(),
            allowed_key_storage_types: diun.allowed_key_storage_types.clone(),
        })
    }
}

fn key_path(file: &str) -> String {
    format!("{KEYS_DIR}/{file}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(rendezvous_servers: Vec<RendezvousServer>, protocols: Protocols) -> FdoManufacturingServerSpec {
        FdoManufacturingServerSpec {
            replicas: 1,
            image: "mfg:latest".to_string(),
            resources: None,
            storage_class_name: None,
            route_host: None,
            log_level: None,
            rendezvous_servers,
            protocols,
        }
    }

    fn yaml(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).expect("yaml must parse")
    }

    #[test]
    fn generates_config() {
        let spec = spec(
            vec![
                RendezvousServer {
                    dns: Some("rendezvous.example.com".to_string()),
                    device_port: Some(8082),
                    owner_port: Some(8082),
                    protocol: Some(Transport::Http),
                    ..Default::default()
                },
                RendezvousServer {
                    ip_address: Some("192.168.122.99".to_string()),
                    device_port: Some(8082),
                    ..Default::default()
                },
            ],
            Protocols {
                plain_di: false,
                diun: Some(Diun {
                    key_type: KeyType::Secp256r1,
                    allowed_key_storage_types: vec![KeyStorageType::FileSystem],
                }),
            },
        );

        let config = ManufacturingServerConfig::new(&spec).expect("config must be valid");
        let generated = yaml(&config.to_yaml().expect("config must encode"));
        assert_eq!(
            generated,
            yaml(
                r#"
session_store_driver:
  Directory:
    path: /etc/fdo/sessions/
ownership_voucher_store_driver:
  Directory:
    path: /etc/fdo/ownership_vouchers/
public_key_store_driver:
  Directory:
    path: /etc/fdo/keys/
bind: 0.0.0.0:8080
rendezvous_info:
  - dns: rendezvous.example.com
    device_port: 8082
    owner_port: 8082
    protocol: http
  - ipaddress: 192.168.122.99
    device_port: 8082
protocols:
  plain_di: false
  diun:
    key_path: /etc/fdo/keys/diun_key.der
    cert_path: /etc/fdo/keys/diun_cert.pem
    key_type: SECP256R1
    mfg_string_type: SerialNumber
    allowed_key_storage_types:
      - FileSystem
manufacturing:
  manufacturer_cert_path: /etc/fdo/keys/manufacturer_cert.pem
  manufacturer_private_key: /etc/fdo/keys/manufacturer_key.der
  owner_cert_path: /etc/fdo/keys/owner_cert.pem
  device_cert_ca_private_key: /etc/fdo/keys/device_ca_key.der
  device_cert_ca_chain: /etc/fdo/keys/device_ca_cert.pem
"#
            )
        );
    }

    #[test]
    fn omits_diun_when_unset() {
        let spec = spec(
            vec![RendezvousServer {
                dns: Some("rv".to_string()),
                ..Default::default()
            }],
            Protocols {
                plain_di: true,
                diun: None,
            },
        );
        let config = ManufacturingServerConfig::new(&spec).expect("config must be valid");
        let generated = yaml(&config.to_yaml().expect("config must encode"));
        assert_eq!(generated["protocols"], yaml("plain_di: true"));
        assert_eq!(generated["rendezvous_info"], yaml("[{dns: rv}]"));
    }

    #[test]
    fn requires_rendezvous_servers() {
        let spec = spec(vec![], Protocols::default());
        assert_eq!(
            ManufacturingServerConfig::new(&spec),
            Err(Error::NoRendezvousServers)
        );
    }

    #[test]
    fn rejects_ambiguous_rendezvous_server() {
        let spec = spec(
            vec![RendezvousServer {
                dns: Some("rv".to_string()),
                ip_address: Some("10.0.0.1".to_string()),
                ..Default::default()
            }],
            Protocols::default(),
        );
        assert_eq!(
            ManufacturingServerConfig::new(&spec),
            Err(Error::BothAddresses("rendezvous server"))
        );
    }

    #[test]
    fn requires_key_storage_types() {
        let spec = spec(
            vec![RendezvousServer {
                dns: Some("rv".to_string()),
                ..Default::default()
            }],
            Protocols {
                plain_di: false,
                diun: Some(Diun {
                    key_type: KeyType::Secp384r1,
                    allowed_key_storage_types: vec![],
                }),
            },
        );
        assert_eq!(
            ManufacturingServerConfig::new(&spec),
            Err(Error::NoKeyStorageTypes)
        );
    }
}
