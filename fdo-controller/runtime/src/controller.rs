use crate::{
    cluster::Cluster,
    error::{Error, Result},
    k8s::{labels, Api, Client, Resource, ResourceExt, ServerStatus, ServiceType, Time},
    metrics::ControllerMetrics,
    resources::Owner,
    status,
};
use async_trait::async_trait;
use futures::prelude::*;
use kube::{
    core::NamespaceResourceScope,
    runtime::{
        controller::{Action, Controller},
        watcher,
    },
};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, sync::Arc};
use tracing::{debug, info, warn};

/// State shared by all reconcilers.
pub struct Context {
    pub cluster: Arc<dyn Cluster>,
    pub metrics: ControllerMetrics,
    /// Whether the cluster serves OpenShift routes.
    pub routes: bool,
}

/// An FDO server resource and the children it reconciles.
#[async_trait]
pub trait Reconcile:
    Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static
{
    const SERVICE: ServiceType;

    fn server_status(&self) -> Option<&ServerStatus>;

    /// Applies the server's children.
    async fn apply(&self, owner: &Owner, ctx: &Context) -> Result<Action>;
}

/// Reconciles a server and records the outcome in its status.
pub async fn reconcile<T: Reconcile>(obj: Arc<T>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = obj
        .namespace()
        .ok_or(Error::MissingObjectKey("namespace"))?;
    let name = obj.name_any();
    let owner = Owner::new(&*obj, name.clone(), namespace.clone(), T::SERVICE);
    ctx.metrics.reconciled(T::SERVICE);

    let result = obj.apply(&owner, &ctx).await;
    match &result {
        Ok(action) => debug!(%namespace, %name, ?action, "Reconciled"),
        Err(error) => {
            ctx.metrics.failed(T::SERVICE);
            ctx.cluster
                .publish_warning(&obj.object_ref(&()), error.to_string())
                .await;
        }
    }

    update_status(&*obj, &owner, &ctx, result.as_ref().err()).await;
    result
}

pub fn error_policy<T: Reconcile>(obj: Arc<T>, error: &Error, _ctx: Arc<Context>) -> Action {
    let delay = error.requeue_after();
    warn!(
        namespace = %obj.namespace().unwrap_or_default(),
        name = %obj.name_any(),
        %error,
        ?delay,
        "Reconcile failed"
    );
    Action::requeue(delay)
}

/// Status patch failures are logged; they never fail a reconcile.
async fn update_status<T: Reconcile>(obj: &T, owner: &Owner, ctx: &Context, error: Option<&Error>) {
    let selector = T::SERVICE.selector(&owner.name);
    let pods = match ctx.cluster.list_pod_names(&owner.namespace, &selector).await {
        Ok(pods) => pods,
        Err(error) => {
            warn!(%error, name = %owner.name, "Failed to list pods");
            obj.server_status().map(|s| s.pods.clone()).unwrap_or_default()
        }
    };

    let message = error.map(ToString::to_string);
    let status = status::next(
        obj.server_status(),
        pods,
        obj.meta().generation,
        message.as_deref(),
        Time(chrono::Utc::now()),
    );
    if obj.server_status() == Some(&status) {
        return;
    }
    if let Err(error) = ctx
        .cluster
        .patch_status(T::SERVICE, &owner.namespace, &owner.name, &status)
        .await
    {
        warn!(%error, name = %owner.name, "Failed to update status");
    }
}

/// An API for servers and their children, optionally restricted to a single
/// namespace.
pub(crate) fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watches the children created by this controller.
pub(crate) fn children() -> watcher::Config {
    watcher::Config::default().labels(&format!("{}={}", labels::APP, labels::APP_NAME))
}

/// Runs a controller until the drain signal fires, then waits for in-flight
/// reconciles to finish.
pub async fn run<T: Reconcile>(controller: Controller<T>, ctx: Arc<Context>, drain: drain::Watch) {
    let (close_tx, close_rx) = tokio::sync::oneshot::channel::<()>();
    let ctrl = controller
        .graceful_shutdown_on(close_rx.map(|_| ()))
        .run(reconcile::<T>, error_policy::<T>, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!(namespace = ?obj.namespace, name = %obj.name, "Processed"),
                Err(error) => debug!(%error, "Reconcile did not complete"),
            }
        });
    tokio::pin!(ctrl);

    info!(kind = %T::kind(&()), "Controller started");
    tokio::select! {
        _ = (&mut ctrl) => {}
        handle = drain.signaled() => {
            let _ = close_tx.send(());
            handle.release_after(ctrl).await;
        }
    }
    info!(kind = %T::kind(&()), "Controller stopped");
}
