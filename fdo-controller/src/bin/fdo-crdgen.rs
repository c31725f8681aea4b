#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Prints the FDO custom resource definitions as a YAML stream.

use fdo_controller_k8s_api::{
    CustomResourceExt, FdoManufacturingServer, FdoOnboardingServer, FdoRendezvousServer,
};

fn main() -> anyhow::Result<()> {
    let crds = [
        FdoManufacturingServer::crd(),
        FdoOnboardingServer::crd(),
        FdoRendezvousServer::crd(),
    ];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
