use crate::{
    controller::{self, Context, Reconcile},
    core::{
        files, owner_onboarding, serviceinfo, OwnerOnboardingServerConfig, ServiceInfoApiServerConfig,
        ServiceInfoFile, KEYS_DIR,
    },
    error::Result,
    k8s::{
        labels, Client, ConfigMap, Deployment, FdoOnboardingServer, FdoOnboardingServerSpec,
        PodSpec, ResourceExt, Route, ServerStatus, Service, ServiceType,
    },
    resources::{self, Owner},
};
use async_trait::async_trait;
use kube::runtime::{
    controller::{Action, Controller},
    reflector::ObjectRef,
    watcher,
};
use std::time::Duration;
use tracing::{debug, instrument};

/// Onboarding servers are revisited periodically so that edits to
/// service-info files are picked up even when a watch event is missed.
const RESYNC: Duration = Duration::from_secs(5 * 60);

pub(crate) fn controller(
    client: &Client,
    namespace: Option<&str>,
    routes: bool,
) -> Controller<FdoOnboardingServer> {
    let ctrl = Controller::new(
        controller::api::<FdoOnboardingServer>(client, namespace),
        Default::default(),
    )
    .owns(controller::api::<Deployment>(client, namespace), controller::children())
    .owns(controller::api::<Service>(client, namespace), controller::children())
    .owns(controller::api::<ConfigMap>(client, namespace), controller::children())
    .watches(
        controller::api::<ConfigMap>(client, namespace),
        watcher::Config::default().labels(labels::SERVICEINFO_FILE_OWNER),
        file_owner,
    );
    if routes {
        ctrl.owns(controller::api::<Route>(client, namespace), controller::children())
    } else {
        ctrl
    }
}

/// Maps a service-info file ConfigMap to the onboarding server using it.
fn file_owner(cm: ConfigMap) -> Option<ObjectRef<FdoOnboardingServer>> {
    let ns = cm.namespace()?;
    let owner = cm.labels().get(labels::SERVICEINFO_FILE_OWNER)?;
    Some(ObjectRef::new(owner).within(&ns))
}

fn owner_onboarding_config_map(server: &str) -> String {
    format!("{server}-owner-onboarding-config")
}

fn serviceinfo_config_map(server: &str) -> String {
    format!("{server}-serviceinfo-api-config")
}

#[async_trait]
impl Reconcile for FdoOnboardingServer {
    const SERVICE: ServiceType = ServiceType::OwnerOnboarding;

    fn server_status(&self) -> Option<&ServerStatus> {
        self.status.as_ref()
    }

    #[instrument(skip_all, fields(namespace = %owner.namespace, name = %owner.name))]
    async fn apply(&self, owner: &Owner, ctx: &Context) -> Result<Action> {
        let ns = owner.namespace.as_str();

        let route = if ctx.routes {
            let route = resources::route(owner, owner_onboarding::PORT, None);
            Some(ctx.cluster.apply_route(ns, route).await?)
        } else {
            None
        };
        let host = route.as_ref().and_then(Route::host);

        let config = OwnerOnboardingServerConfig::new(&self.spec, host)?;
        let cm = resources::config_map(
            owner,
            owner_onboarding_config_map(&owner.name),
            owner_onboarding::FILE_NAME,
            config.to_yaml()?,
        );
        ctx.cluster.apply_config_map(ns, cm).await?;

        let files = service_info_files(ctx, ns, &owner.name).await?;
        let config = ServiceInfoApiServerConfig::new(self.spec.service_info.as_ref(), &files);
        let cm = resources::config_map(
            owner,
            serviceinfo_config_map(&owner.name),
            serviceinfo::FILE_NAME,
            config.to_yaml()?,
        );
        ctx.cluster.apply_config_map(ns, cm).await?;

        ctx.cluster
            .ensure_pvc(ns, resources::ownership_vouchers_pvc(ns, None))
            .await?;
        ctx.cluster
            .apply_deployment(ns, deployment(owner, &self.spec, &files))
            .await?;
        ctx.cluster
            .apply_service(ns, resources::service(owner, owner_onboarding::PORT))
            .await?;

        debug!(files = files.len(), "Onboarding server is up to date");
        Ok(Action::requeue(RESYNC))
    }
}

/// Loads the service-info files labeled for the named server.
async fn service_info_files(ctx: &Context, ns: &str, server: &str) -> Result<Vec<ServiceInfoFile>> {
    let selector = format!("{}={server}", labels::SERVICEINFO_FILE_OWNER);
    let cms = ctx.cluster.list_config_maps(ns, &selector).await?;

    let mut files = cms
        .iter()
        .map(|cm| {
            let keys = cm
                .data
                .iter()
                .flat_map(|d| d.keys())
                .chain(cm.binary_data.iter().flat_map(|d| d.keys()))
                .map(String::as_str);
            ServiceInfoFile::from_config_map(&cm.name_any(), cm.annotations(), keys)
        })
        .collect::<Result<Vec<_>, _>>()?;
    files::sort(&mut files);
    Ok(files)
}

fn deployment(
    owner: &Owner,
    spec: &FdoOnboardingServerSpec,
    files: &[ServiceInfoFile],
) -> Deployment {
    let (owner_config_volume, owner_config_mount) = resources::config_volume(
        "owner-onboarding-config",
        &owner_onboarding_config_map(&owner.name),
        owner_onboarding::CONFIG_DIR,
    );
    let (vouchers_volume, vouchers_mount) = resources::ownership_vouchers_volume();
    let (key_volumes, key_mounts) =
        resources::key_volumes(&owner_onboarding::KEY_FILES, KEYS_DIR);
    let (serviceinfo_volume, serviceinfo_mount) = resources::config_volume(
        "serviceinfo-api-config",
        &serviceinfo_config_map(&owner.name),
        serviceinfo::CONFIG_DIR,
    );

    let mut owner_mounts = vec![owner_config_mount, vouchers_mount];
    owner_mounts.extend(key_mounts);
    let mut serviceinfo_mounts = vec![serviceinfo_mount];
    let mut volumes = vec![owner_config_volume, vouchers_volume, serviceinfo_volume];
    volumes.extend(key_volumes);

    // ConfigMap names are not always valid volume names.
    for (i, file) in files.iter().enumerate() {
        let (volume, mount) = resources::config_volume(
            &format!("serviceinfo-file-{i}"),
            &file.config_map,
            &file.mount_path(),
        );
        volumes.push(volume);
        serviceinfo_mounts.push(mount);
    }

    resources::deployment(
        owner,
        1,
        PodSpec {
            containers: vec![
                resources::container(
                    "owner-onboarding",
                    &spec.owner_onboarding_image,
                    owner_onboarding::PORT,
                    owner_mounts,
                ),
                resources::container(
                    "serviceinfo-api",
                    &spec.service_info_image,
                    serviceinfo::PORT,
                    serviceinfo_mounts,
                ),
            ],
            volumes: Some(volumes),
            ..Default::default()
        },
    )
}
