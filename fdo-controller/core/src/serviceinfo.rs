use crate::{
    driver::StoreDriver,
    files::ServiceInfoFile,
    k8s::onboarding::{Command, DiskEncryptionClevis, InitialUser, ServiceInfo},
    Result, SERVICEINFO_AUTH_TOKEN,
};
use serde::Serialize;

pub const BIND: &str = "0.0.0.0:8083";
pub const PORT: u16 = 8083;
pub const FILE_NAME: &str = "serviceinfo-api-server.yml";
pub const CONFIG_DIR: &str = "/etc/fdo/serviceinfo-api-server.conf.d";

/// Contents of `serviceinfo-api-server.yml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceInfoApiServerConfig {
    pub bind: String,
    pub device_specific_store_driver: StoreDriver,
    pub service_info_auth_token: String,
    pub service_info: ServiceInfoConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServiceInfoConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_user: Option<InitialUserConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diskencryption_clevis: Vec<ClevisConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InitialUserConfig {
    pub username: String,
    pub sshkeys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileConfig {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    pub source_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandConfig {
    pub command: String,
    pub args: Vec<String>,
    pub may_fail: bool,
    pub return_stdout: bool,
    pub return_stderr: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClevisConfig {
    pub disk_label: String,
    pub binding: ClevisBindingConfig,
    pub reencrypt: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClevisBindingConfig {
    pub pin: String,
    pub config: String,
}

// === impl ServiceInfoApiServerConfig ===

impl ServiceInfoApiServerConfig {
    pub fn new(service_info: Option<&ServiceInfo>, files: &[ServiceInfoFile]) -> Self {
        let mut config = service_info.map(ServiceInfoConfig::from).unwrap_or_default();
        config.files = files.iter().map(FileConfig::from).collect();

        Self {
            bind: BIND.to_string(),
            device_specific_store_driver: StoreDriver::directory(
                "/etc/fdo/device_specific_serviceinfo",
            ),
            service_info_auth_token: SERVICEINFO_AUTH_TOKEN.to_string(),
            service_info: config,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        crate::to_yaml(self)
    }
}

impl From<&ServiceInfo> for ServiceInfoConfig {
    fn from(si: &ServiceInfo) -> Self {
        Self {
            initial_user: si.initial_user.as_ref().map(InitialUserConfig::from),
            files: vec![],
            commands: si.commands.iter().map(CommandConfig::from).collect(),
            diskencryption_clevis: si
                .disk_encryption_clevis
                .iter()
                .map(ClevisConfig::from)
                .collect(),
        }
    }
}

impl From<&InitialUser> for InitialUserConfig {
    fn from(user: &InitialUser) -> Self {
        Self {
            username: user.username.clone(),
            sshkeys: user.ssh_keys.clone(),
        }
    }
}

impl From<&ServiceInfoFile> for FileConfig {
    fn from(file: &ServiceInfoFile) -> Self {
        Self {
            path: file.path.clone(),
            permissions: file.permissions.clone(),
            source_path: file.source_path.clone(),
        }
    }
}

impl From<&Command> for CommandConfig {
    fn from(cmd: &Command) -> Self {
        Self {
            command: cmd.command.clone(),
            args: cmd.args.clone(),
            may_fail: cmd.may_fail,
            return_stdout: cmd.return_stdout,
            return_stderr: cmd.return_stderr,
        }
    }
}

impl From<&DiskEncryptionClevis> for ClevisConfig {
    fn from(clevis: &DiskEncryptionClevis) -> Self {
        Self {
            disk_label: clevis.disk_label.clone(),
            binding: ClevisBindingConfig {
                pin: clevis.binding.pin.clone(),
                config: clevis.binding.config.clone(),
            },
            reencrypt: clevis.re_encrypt,
        }
    }
}
