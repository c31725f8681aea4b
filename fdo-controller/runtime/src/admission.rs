use crate::{
    core::{owner_onboarding, ManufacturingServerConfig},
    k8s::{
        FdoManufacturingServer, FdoManufacturingServerSpec, FdoOnboardingServer,
        FdoOnboardingServerSpec, FdoRendezvousServer, FdoRendezvousServerSpec,
    },
};
use anyhow::{anyhow, ensure, Result};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::{core::DynamicObject, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Clone)]
pub struct Admission {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;
type AdmissionReview = kube::core::admission::AdmissionReview<DynamicObject>;

#[async_trait::async_trait]
trait Validate<T> {
    async fn validate(self, spec: T) -> Result<()>;
}

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ok(
                Response::builder()
                    .status(http::StatusCode::NOT_FOUND)
                    .body(Body::default())
                    .expect("not found response must be valid"),
            ));
        }

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "Failed to parse request body");
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };
            trace!(?review);

            let rsp = match review.try_into() {
                Ok(req) => {
                    debug!(?req);
                    admission.admit(req).await
                }
                Err(error) => {
                    warn!(%error, "Invalid admission request");
                    AdmissionResponse::invalid(error)
                }
            };
            debug!(?rsp);
            json_response(rsp.into_review())
        })
    }
}

impl Admission {
    pub fn new() -> Self {
        Self {}
    }

    async fn admit(self, req: AdmissionRequest) -> AdmissionResponse {
        if is_kind::<FdoManufacturingServer>(&req) {
            return self.admit_spec::<FdoManufacturingServerSpec>(req).await;
        }

        if is_kind::<FdoOnboardingServer>(&req) {
            return self.admit_spec::<FdoOnboardingServerSpec>(req).await;
        }

        if is_kind::<FdoRendezvousServer>(&req) {
            return self.admit_spec::<FdoRendezvousServerSpec>(req).await;
        }

        AdmissionResponse::invalid(format_args!(
            "unsupported resource type: {}.{}.{}",
            req.kind.group, req.kind.version, req.kind.kind
        ))
    }

    async fn admit_spec<T>(self, req: AdmissionRequest) -> AdmissionResponse
    where
        T: DeserializeOwned,
        Self: Validate<T>,
    {
        let rsp = AdmissionResponse::from(&req);

        let kind = req.kind.kind.clone();
        let (obj, spec) = match parse_spec::<T>(req) {
            Ok(spec) => spec,
            Err(error) => {
                info!(%error, "Failed to parse {} spec", kind);
                return rsp.deny(error);
            }
        };

        let ns = obj.namespace().unwrap_or_default();
        let name = obj.name_any();

        if let Err(error) = self.validate(spec).await {
            info!(%error, %ns, %name, %kind, "Denied");
            return rsp.deny(error);
        }

        rsp
    }
}

fn is_kind<T>(req: &AdmissionRequest) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    req.kind.group.eq_ignore_ascii_case(&T::group(&dt))
        && req.kind.kind.eq_ignore_ascii_case(&T::kind(&dt))
}

fn json_response(rsp: AdmissionReview) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}

fn parse_spec<T: DeserializeOwned>(req: AdmissionRequest) -> Result<(DynamicObject, T)> {
    let obj = req
        .object
        .ok_or_else(|| anyhow!("admission request missing 'object"))?;

    let spec = {
        let data = obj
            .data
            .get("spec")
            .cloned()
            .ok_or_else(|| anyhow!("admission request missing 'spec'"))?;
        serde_json::from_value(data)?
    };

    Ok((obj, spec))
}

#[async_trait::async_trait]
impl Validate<FdoManufacturingServerSpec> for Admission {
    async fn validate(self, spec: FdoManufacturingServerSpec) -> Result<()> {
        ensure!(spec.replicas >= 0, "replicas must not be negative");
        ManufacturingServerConfig::new(&spec)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<FdoOnboardingServerSpec> for Admission {
    async fn validate(self, spec: FdoOnboardingServerSpec) -> Result<()> {
        // Empty owner addresses are resolved from the route at reconcile time.
        owner_onboarding::validate_owner_addresses(&spec.owner_addresses)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<FdoRendezvousServerSpec> for Admission {
    async fn validate(self, spec: FdoRendezvousServerSpec) -> Result<()> {
        ensure!(!spec.image.trim().is_empty(), "image must not be empty");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: &str, spec: serde_json::Value) -> AdmissionRequest {
        let review: Review = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "8f0b3c2e-0000-0000-0000-000000000000",
                "kind": {"group": "fdo.redhat.com", "version": "v1alpha1", "kind": kind},
                "resource": {
                    "group": "fdo.redhat.com",
                    "version": "v1alpha1",
                    "resource": format!("{}s", kind.to_lowercase()),
                },
                "name": "server",
                "namespace": "fdo",
                "operation": "CREATE",
                "userInfo": {},
                "object": {
                    "apiVersion": "fdo.redhat.com/v1alpha1",
                    "kind": kind,
                    "metadata": {"name": "server", "namespace": "fdo"},
                    "spec": spec,
                },
                "dryRun": false,
            },
        }))
        .expect("review must parse");
        review.try_into().expect("review must contain a request")
    }

    #[tokio::test]
    async fn admits_valid_manufacturing_server() {
        let req = request(
            "FDOManufacturingServer",
            json!({"rendezvousServers": [{"dns": "rv.example.com", "devicePort": 8082}]}),
        );
        assert!(Admission::new().admit(req).await.allowed);
    }

    #[tokio::test]
    async fn denies_invalid_manufacturing_server() {
        let both = request(
            "FDOManufacturingServer",
            json!({"rendezvousServers": [{"dns": "rv", "ipAddress": "10.0.0.1"}]}),
        );
        assert!(!Admission::new().admit(both).await.allowed);

        let negative = request(
            "FDOManufacturingServer",
            json!({"replicas": -1, "rendezvousServers": [{"dns": "rv"}]}),
        );
        assert!(!Admission::new().admit(negative).await.allowed);

        let empty = request("FDOManufacturingServer", json!({"rendezvousServers": []}));
        assert!(!Admission::new().admit(empty).await.allowed);
    }

    #[tokio::test]
    async fn validates_owner_addresses() {
        let fallback = request("FDOOnboardingServer", json!({}));
        assert!(Admission::new().admit(fallback).await.allowed);

        let invalid = request(
            "FDOOnboardingServer",
            json!({"ownerAddresses": [{"transport": "http", "addresses": [{"ipAddress": "not-an-ip"}]}]}),
        );
        assert!(!Admission::new().admit(invalid).await.allowed);
    }

    #[tokio::test]
    async fn admits_rendezvous_server() {
        let req = request("FDORendezvousServer", json!({}));
        assert!(Admission::new().admit(req).await.allowed);
    }

    #[tokio::test]
    async fn rejects_unknown_kinds() {
        let req = request("FDOUnknownServer", json!({}));
        assert!(!Admission::new().admit(req).await.allowed);
    }
}
