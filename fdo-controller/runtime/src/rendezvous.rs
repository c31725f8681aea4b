use crate::{
    controller::{self, Context, Reconcile},
    core::{rendezvous, RendezvousServerConfig, KEYS_DIR},
    error::Result,
    k8s::{
        Client, ConfigMap, Deployment, FdoRendezvousServer, PodSpec, Route, ServerStatus, Service,
        ServiceType,
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
) -> Controller<FdoRendezvousServer> {
    let ctrl = Controller::new(
        controller::api::<FdoRendezvousServer>(client, namespace),
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
    format!("{server}-rendezvous-config")
}

#[async_trait]
impl Reconcile for FdoRendezvousServer {
    const SERVICE: ServiceType = ServiceType::Rendezvous;

    fn server_status(&self) -> Option<&ServerStatus> {
        self.status.as_ref()
    }

    #[instrument(skip_all, fields(namespace = %owner.namespace, name = %owner.name))]
    async fn apply(&self, owner: &Owner, ctx: &Context) -> Result<Action> {
        let ns = owner.namespace.as_str();

        let cm = resources::config_map(
            owner,
            config_map_name(&owner.name),
            rendezvous::FILE_NAME,
            RendezvousServerConfig::default().to_yaml()?,
        );
        ctx.cluster.apply_config_map(ns, cm).await?;
        ctx.cluster
            .apply_deployment(ns, deployment(owner, &self.spec.image))
            .await?;
        ctx.cluster
            .apply_service(ns, resources::service(owner, rendezvous::PORT))
            .await?;
        if ctx.routes {
            ctx.cluster
                .apply_route(ns, resources::route(owner, rendezvous::PORT, None))
                .await?;
        }

        debug!("Rendezvous server is up to date");
        Ok(Action::await_change())
    }
}

fn deployment(owner: &Owner, image: &str) -> Deployment {
    let (config_volume, config_mount) = resources::config_volume(
        "config",
        &config_map_name(&owner.name),
        rendezvous::CONFIG_DIR,
    );
    let (key_volumes, key_mounts) = resources::key_volumes(&rendezvous::KEY_FILES, KEYS_DIR);

    let mut mounts = vec![config_mount];
    mounts.extend(key_mounts);
    let mut volumes = vec![config_volume];
    volumes.extend(key_volumes);

    resources::deployment(
        owner,
        1,
        PodSpec {
            containers: vec![resources::container(
                "rendezvous",
                image,
                rendezvous::PORT,
                mounts,
            )],
            volumes: Some(volumes),
            ..Default::default()
        },
    )
}
