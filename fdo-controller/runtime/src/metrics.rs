use crate::k8s::ServiceType;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct ControllerMetrics {
    reconciles: Family<KindLabels, Counter>,
    reconcile_errors: Family<KindLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: String,
}

impl ControllerMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let reconciles = Family::default();
        prom.register(
            "reconciles",
            "Count of reconciliations by kind",
            reconciles.clone(),
        );

        let reconcile_errors = Family::default();
        prom.register(
            "reconcile_errors",
            "Count of failed reconciliations by kind",
            reconcile_errors.clone(),
        );

        Self {
            reconciles,
            reconcile_errors,
        }
    }

    pub(crate) fn reconciled(&self, kind: ServiceType) {
        self.reconciles.get_or_create(&labels(kind)).inc();
    }

    pub(crate) fn failed(&self, kind: ServiceType) {
        self.reconcile_errors.get_or_create(&labels(kind)).inc();
    }

    #[cfg(test)]
    pub(crate) fn counts(&self, kind: ServiceType) -> (u64, u64) {
        (
            self.reconciles.get_or_create(&labels(kind)).get(),
            self.reconcile_errors.get_or_create(&labels(kind)).get(),
        )
    }
}

fn labels(kind: ServiceType) -> KindLabels {
    KindLabels {
        kind: kind.as_str().to_string(),
    }
}
