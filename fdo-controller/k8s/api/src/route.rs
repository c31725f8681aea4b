//! A minimal rendering of OpenShift's `route.openshift.io/v1` Route.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    status = "RouteStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Assigned by the router when left empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    pub to: RouteTargetReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_policy: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RouteTargetReference {
    pub kind: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: IntOrString,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RouteStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<RouteIngress>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,
}

impl Route {
    /// The host the route is reachable at, preferring `spec.host` over hosts
    /// admitted by routers.
    pub fn host(&self) -> Option<&str> {
        self.spec
            .host
            .as_deref()
            .or_else(|| {
                self.status
                    .iter()
                    .flat_map(|s| s.ingress.iter())
                    .find_map(|i| i.host.as_deref())
            })
            .filter(|h| !h.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_falls_back_to_ingress() {
        let mut route = Route::new("fdo", RouteSpec::default());
        assert_eq!(route.host(), None);

        route.status = Some(RouteStatus {
            ingress: vec![RouteIngress {
                host: Some("fdo-ns.apps.example.com".to_string()),
                router_name: Some("default".to_string()),
            }],
        });
        assert_eq!(route.host(), Some("fdo-ns.apps.example.com"));

        route.spec.host = Some("fdo.example.com".to_string());
        assert_eq!(route.host(), Some("fdo.example.com"));
    }
}
