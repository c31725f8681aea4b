use crate::{driver::StoreDriver, Result, KEYS_DIR};
use serde::Serialize;

pub const BIND: &str = "0.0.0.0:8082";
pub const PORT: u16 = 8082;
pub const FILE_NAME: &str = "rendezvous-server.yml";
pub const CONFIG_DIR: &str = "/etc/fdo/rendezvous-server.conf.d";

/// Key and certificate files, as `(secret, file)`, mounted into
/// [`KEYS_DIR`].
pub const KEY_FILES: [(&str, &str); 1] = [("fdo-manufacturer-cert", "manufacturer_cert.pem")];

/// Contents of `rendezvous-server.yml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RendezvousServerConfig {
    pub storage_driver: StoreDriver,
    pub session_store_driver: StoreDriver,
    pub trusted_manufacturer_keys_path: String,
    pub bind: String,
}

impl Default for RendezvousServerConfig {
    fn default() -> Self {
        Self {
            storage_driver: StoreDriver::directory("/etc/fdo/rendezvous_registered"),
            session_store_driver: StoreDriver::directory("/etc/fdo/rendezvous_sessions"),
            trusted_manufacturer_keys_path: format!("{KEYS_DIR}/manufacturer_cert.pem"),
            bind: BIND.to_string(),
        }
    }
}

impl RendezvousServerConfig {
    pub fn to_yaml(&self) -> Result<String> {
        crate::to_yaml(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_config() {
        let generated: serde_yaml::Value = serde_yaml::from_str(
            &RendezvousServerConfig::default()
                .to_yaml()
                .expect("config must encode"),
        )
        .expect("yaml must parse");
        let expected: serde_yaml::Value = serde_yaml::from_str(
            r#"
storage_driver:
  Directory:
    path: /etc/fdo/rendezvous_registered
session_store_driver:
  Directory:
    path: /etc/fdo/rendezvous_sessions
trusted_manufacturer_keys_path: /etc/fdo/keys/manufacturer_cert.pem
bind: 0.0.0.0:8082
"#,
        )
        .expect("yaml must parse");
        assert_eq!(generated, expected);
    }
}
