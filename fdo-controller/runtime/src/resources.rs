//! Builders for the child objects of FDO servers.

use crate::k8s::{
    api::core::v1::{
        Capabilities, ConfigMapVolumeSource, ContainerPort, KeyToPath, PersistentVolumeClaimSpec,
        PersistentVolumeClaimVolumeSource, PodSecurityContext, SeccompProfile, SecretVolumeSource,
        SecurityContext, ServicePort, Volume, VolumeMount, VolumeResourceRequirements,
    },
    apimachinery::pkg::{
        api::resource::Quantity, apis::meta::v1::LabelSelector, apis::meta::v1::OwnerReference,
        util::intstr::IntOrString,
    },
    labels,
    route::{RoutePort, RouteSpec, RouteTargetReference},
    ConfigMap, Container, Deployment, DeploymentSpec, ObjectMeta, PersistentVolumeClaim, PodSpec,
    PodTemplateSpec, Resource, Route, Service, ServiceSpec, ServiceType,
};
use std::collections::BTreeMap;

/// Claim shared by the manufacturing and owner-onboarding servers.
pub const OWNERSHIP_VOUCHERS_PVC: &str = "fdo-ownership-vouchers-pvc";
pub const OWNERSHIP_VOUCHERS_DIR: &str = "/etc/fdo/ownership_vouchers";
const OWNERSHIP_VOUCHERS_VOLUME: &str = "ownership-vouchers";
const OWNERSHIP_VOUCHERS_SIZE: &str = "1Gi";

/// Identifies the owning server of a child object.
#[derive(Clone, Debug)]
pub struct Owner {
    pub name: String,
    pub namespace: String,
    pub service: ServiceType,
    reference: Option<OwnerReference>,
}

impl Owner {
    pub fn new<T: Resource<DynamicType = ()>>(
        obj: &T,
        name: String,
        namespace: String,
        service: ServiceType,
    ) -> Self {
        Self {
            name,
            namespace,
            service,
            reference: obj.controller_owner_ref(&()),
        }
    }

    pub fn labels(&self) -> labels::Map {
        self.service.labels(&self.name)
    }

    /// Metadata of a child object named `name`.
    pub fn meta(&self, name: impl ToString) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels()),
            owner_references: self.reference.clone().map(|r| vec![r]),
            ..Default::default()
        }
    }
}

pub fn config_map(owner: &Owner, name: impl ToString, file: &str, contents: String) -> ConfigMap {
    ConfigMap {
        metadata: owner.meta(name),
        data: Some(BTreeMap::from([(file.to_string(), contents)])),
        ..Default::default()
    }
}

pub fn deployment(owner: &Owner, replicas: i32, pod: PodSpec) -> Deployment {
    Deployment {
        metadata: owner.meta(&owner.name),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(owner.labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(owner.labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    security_context: Some(pod_security_context()),
                    ..pod
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn service(owner: &Owner, port: u16) -> Service {
    Service {
        metadata: owner.meta(&owner.name),
        spec: Some(ServiceSpec {
            selector: Some(owner.labels()),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port: port.into(),
                target_port: Some(IntOrString::Int(port.into())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn route(owner: &Owner, port: u16, host: Option<&str>) -> Route {
    Route {
        metadata: owner.meta(&owner.name),
        spec: RouteSpec {
            host: host.filter(|h| !h.is_empty()).map(ToString::to_string),
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: owner.name.clone(),
            },
            port: Some(RoutePort {
                target_port: IntOrString::Int(port.into()),
            }),
            wildcard_policy: Some("None".to_string()),
        },
        status: None,
    }
}

/// The ownership-voucher claim. It is shared between servers so it carries
/// the FDO app label but no owner.
pub fn ownership_vouchers_pvc(namespace: &str, storage_class: Option<&str>) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(OWNERSHIP_VOUCHERS_PVC.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                labels::APP.to_string(),
                labels::APP_NAME.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteMany".to_string()]),
            storage_class_name: storage_class.map(ToString::to_string),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(OWNERSHIP_VOUCHERS_SIZE.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A container hardened to drop all capabilities.
pub fn container(name: &str, image: &str, port: u16, mounts: Vec<VolumeMount>) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        ports: Some(vec![ContainerPort {
            container_port: port.into(),
            ..Default::default()
        }]),
        volume_mounts: Some(mounts),
        security_context: Some(SecurityContext {
            allow_privilege_escalation: Some(false),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_security_context() -> PodSecurityContext {
    PodSecurityContext {
        run_as_non_root: Some(true),
        seccomp_profile: Some(SeccompProfile {
            type_: "RuntimeDefault".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A volume and read-only mount for each server configuration ConfigMap.
pub fn config_volume(volume: &str, config_map: &str, dir: &str) -> (Volume, VolumeMount) {
    (
        Volume {
            name: volume.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
        VolumeMount {
            name: volume.to_string(),
            mount_path: dir.to_string(),
            read_only: Some(true),
            ..Default::default()
        },
    )
}

/// Volumes and mounts placing each `(secret, file)` pair at
/// `<dir>/<file>`.
pub fn key_volumes(files: &[(&str, &str)], dir: &str) -> (Vec<Volume>, Vec<VolumeMount>) {
    files
        .iter()
        .map(|(secret, file)| {
            let name = secret.strip_prefix("fdo-").unwrap_or(secret).to_string();
            let volume = Volume {
                name: name.clone(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(secret.to_string()),
                    items: Some(vec![KeyToPath {
                        key: file.to_string(),
                        path: file.to_string(),
                        ..Default::default()
                    }]),
                    optional: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            };
            let mount = VolumeMount {
                name,
                mount_path: format!("{dir}/{file}"),
                sub_path: Some(file.to_string()),
                read_only: Some(true),
                ..Default::default()
            };
            (volume, mount)
        })
        .unzip()
}

pub fn ownership_vouchers_volume() -> (Volume, VolumeMount) {
    (
        Volume {
            name: OWNERSHIP_VOUCHERS_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: OWNERSHIP_VOUCHERS_PVC.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
        VolumeMount {
            name: OWNERSHIP_VOUCHERS_VOLUME.to_string(),
            mount_path: OWNERSHIP_VOUCHERS_DIR.to_string(),
            ..Default::default()
        },
    )
}
