use std::{collections::BTreeMap, fmt};

pub type Map = BTreeMap<String, String>;

pub const APP: &str = "app";
pub const APP_NAME: &str = "fdo";
pub const SERVICE: &str = "fdo-service";
pub const INSTANCE: &str = "app.kubernetes.io/instance";

/// Marks a ConfigMap as a service-info file of the named onboarding server.
pub const SERVICEINFO_FILE_OWNER: &str = "serviceinfo.file/owner";

/// The FDO server a child object belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Manufacturing,
    OwnerOnboarding,
    Rendezvous,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manufacturing => "manufacturing",
            Self::OwnerOnboarding => "owner-onboarding",
            Self::Rendezvous => "rendezvous",
        }
    }

    /// Labels applied to every child object of the named instance. The same
    /// map selects the instance's pods.
    pub fn labels(&self, instance: &str) -> Map {
        [
            (APP.to_string(), APP_NAME.to_string()),
            (SERVICE.to_string(), self.as_str().to_string()),
            (INSTANCE.to_string(), instance.to_string()),
        ]
        .into_iter()
        .collect()
    }

    /// Renders the instance labels as a label selector string.
    pub fn selector(&self, instance: &str) -> String {
        self.labels(instance)
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_labels() {
        let labels = ServiceType::Rendezvous.labels("rv");
        assert_eq!(labels.get(SERVICE).map(String::as_str), Some("rendezvous"));
        assert_eq!(
            ServiceType::Rendezvous.selector("rv"),
            "app=fdo,app.kubernetes.io/instance=rv,fdo-service=rendezvous"
        );
    }
}
