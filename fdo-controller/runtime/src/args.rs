use crate::{
    admission::Admission,
    cluster::KubeCluster,
    controller::{self, Context},
    k8s::{self, Client, Resource},
    manufacturing, onboarding, rendezvous, ControllerMetrics,
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "fdo-controller", about = "Manages FIDO Device Onboard servers")]
pub struct Args {
    #[clap(long, default_value = "fdo=info,warn", env = "FDO_CONTROLLER_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the admission controller server.
    #[clap(long)]
    admission_controller_disabled: bool,

    /// Restricts the controllers to a single namespace. All namespaces are
    /// watched when unset.
    #[clap(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            admission_controller_disabled,
            watch_namespace,
        } = self;

        let server = if admission_controller_disabled {
            None
        } else {
            Some(server)
        };
        let watch_namespace = watch_namespace.filter(|ns| !ns.is_empty());

        let mut prom = <Registry>::default();
        let metrics = ControllerMetrics::register(prom.sub_registry_with_prefix("fdo_controller"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(server)
            .build()
            .await?;

        let client = runtime.client();
        let routes = api_resource_exists::<k8s::Route>(&client).await;
        if !routes {
            tracing::warn!(
                "routes.route.openshift.io resource kind not found, servers will not be exposed"
            );
        }

        let ctx = Arc::new(Context {
            cluster: Arc::new(KubeCluster::new(client.clone())),
            metrics,
            routes,
        });
        let ns = watch_namespace.as_deref();
        info!(namespace = ns.unwrap_or("*"), routes, "Starting controllers");

        tokio::spawn(
            controller::run(
                manufacturing::controller(&client, ns, routes),
                ctx.clone(),
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("fdomanufacturingservers")),
        );
        tokio::spawn(
            controller::run(
                onboarding::controller(&client, ns, routes),
                ctx.clone(),
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("fdoonboardingservers")),
        );
        tokio::spawn(
            controller::run(
                rendezvous::controller(&client, ns, routes),
                ctx,
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("fdorendezvousservers")),
        );

        let runtime = runtime.spawn_server(Admission::new);

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

async fn api_resource_exists<T>(client: &Client) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    client
        .list_api_group_resources(&T::api_version(&dt))
        .await
        .ok()
        .iter()
        .flat_map(|r| r.resources.iter())
        .any(|r| r.kind == T::kind(&dt))
}
