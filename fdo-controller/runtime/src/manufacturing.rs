use crate::{
    controller::{self, Context, Reconcile},
    core::{manufacturing, ManufacturingServerConfig, KEYS_DIR},
    error::Result,
    k8s::{
        api::core::v1::EnvVar, Client, ConfigMap, Deployment, FdoManufacturingServer,
        FdoManufacturingServerSpec, PodSpec, Route, ServerStatus, Service, ServiceType,
    },
    resources::{self, Owner},
};
use async_trait::async_trait;
use kube::runtime::controller::{Action, Controller};
use tracing::{debug, instrument};

pub(crate) fn controller(
    client: &Client,
    namespace: Option<&str>,
    routes: bool,
) -> Controller<FdoManufacturingServer> {
    let ctrl = Controller::new(
        controller::api::<FdoManufacturingServer>(client, namespace),
        Default::default(),
    )
    .owns(controller::api::<Deployment>(client, namespace), controller::children())
    .owns(controller::api::<Service>(client, namespace), controller::children())
    .owns(controller::api::<ConfigMap>(client, namespace), controller::children());
    if routes {
        ctrl.owns(controller::api::<Route>(client, namespace), controller::children())
    } else {
        ctrl
    }
}

fn config_map_name(server: &str) -> String {
    format!("{server}-config")
}

#[async_trait]
impl Reconcile for FdoManufacturingServer {
    const SERVICE: ServiceType = ServiceType::Manufacturing;

    fn server_status(&self) -> Option<&ServerStatus> {
        self.status.as_ref()
    }

    #[instrument(skip_all, fields(namespace = %owner.namespace, name = %owner.name))]
    async fn apply(&self, owner: &Owner, ctx: &Context) -> Result<Action> {
        let ns = owner.namespace.as_str();
        let config = ManufacturingServerConfig::new(&self.spec)?;

        if ctx.routes {
            let route = resources::route(owner, manufacturing::PORT, self.spec.route_host.as_deref());
            ctx.cluster.apply_route(ns, route).await?;
        }

        let cm = resources::config_map(
            owner,
            config_map_name(&owner.name),
            manufacturing::FILE_NAME,
            config.to_yaml()?,
        );
        ctx.cluster.apply_config_map(ns, cm).await?;

        let pvc = resources::ownership_vouchers_pvc(ns, self.spec.storage_class_name.as_deref());
        ctx.cluster.ensure_pvc(ns, pvc).await?;

        ctx.cluster
            .apply_deployment(ns, deployment(owner, &self.spec))
            .await?;
        ctx.cluster
            .apply_service(ns, resources::service(owner, manufacturing::PORT))
            .await?;

        debug!("Manufacturing server is up to date");
        Ok(Action::await_change())
    }
}

fn deployment(owner: &Owner, spec: &FdoManufacturingServerSpec) -> Deployment {
    let (config_volume, config_mount) = resources::config_volume(
        "manufacturing-config",
        &config_map_name(&owner.name),
        manufacturing::CONFIG_DIR,
    );
    let (vouchers_volume, vouchers_mount) = resources::ownership_vouchers_volume();
    let (key_volumes, key_mounts) = resources::key_volumes(&manufacturing::KEY_FILES, KEYS_DIR);

    let mut mounts = vec![config_mount, vouchers_mount];
    mounts.extend(key_mounts);
    let mut volumes = vec![config_volume, vouchers_volume];
    volumes.extend(key_volumes);

    let mut container =
        resources::container("manufacturing", &spec.image, manufacturing::PORT, mounts);
    container.resources = spec.resources.clone();
    container.env = spec.log_level.map(|level| {
        vec![EnvVar {
            name: "LOG_LEVEL".to_string(),
            value: Some(level.as_str().to_string()),
            ..Default::default()
        }]
    });

    resources::deployment(
        owner,
        spec.replicas,
        PodSpec {
            containers: vec![container],
            volumes: Some(volumes),
            ..Default::default()
        },
    )
}
