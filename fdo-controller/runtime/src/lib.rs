#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use fdo_controller_core as core;
pub use fdo_controller_k8s_api as k8s;

mod admission;
mod args;
mod cluster;
mod controller;
mod error;
mod manufacturing;
mod metrics;
mod onboarding;
mod rendezvous;
mod resources;
mod status;

pub use self::{
    args::Args,
    cluster::{Cluster, KubeCluster},
    controller::{Context, Reconcile},
    error::Error,
    metrics::ControllerMetrics,
    resources::Owner,
};
