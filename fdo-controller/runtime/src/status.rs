use crate::k8s::{
    status::{RECONCILE_ERROR, RECONCILE_SUCCESS},
    Condition, ServerStatus, Time,
};

const SUCCEEDED: &str = "Succeeded";
const FAILED: &str = "Failed";

/// Computes the status recorded after a reconcile cycle.
///
/// Conditions other than the reconcile conditions are carried over from
/// `current`. A condition's `lastTransitionTime` only moves when its status
/// changes.
pub(crate) fn next(
    current: Option<&ServerStatus>,
    pods: Vec<String>,
    generation: Option<i64>,
    error: Option<&str>,
    now: Time,
) -> ServerStatus {
    let mut conditions = current.map(|s| s.conditions.clone()).unwrap_or_default();
    let (success, failure) = match error {
        None => ("True", "False"),
        Some(_) => ("False", "True"),
    };
    let (reason, message) = match error {
        None => (SUCCEEDED, String::new()),
        Some(e) => (FAILED, e.to_string()),
    };

    for (type_, status) in [(RECONCILE_SUCCESS, success), (RECONCILE_ERROR, failure)] {
        set(
            &mut conditions,
            Condition {
                type_: type_.to_string(),
                status: status.to_string(),
                reason: reason.to_string(),
                message: message.clone(),
                observed_generation: generation,
                last_transition_time: now.clone(),
            },
        );
    }

    ServerStatus { pods, conditions }
}

fn set(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time.clone();
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> Time {
        Time(Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"))
    }

    #[test]
    fn success_sets_both_conditions() {
        let status = next(None, vec!["mfg-abc".to_string()], Some(3), None, at(10));
        assert_eq!(status.pods, vec!["mfg-abc".to_string()]);

        let success = status.condition(RECONCILE_SUCCESS).expect("success condition");
        assert_eq!(success.status, "True");
        assert_eq!(success.observed_generation, Some(3));
        assert_eq!(success.last_transition_time, at(10));

        let error = status.condition(RECONCILE_ERROR).expect("error condition");
        assert_eq!(error.status, "False");
        assert_eq!(error.message, "");
    }

    #[test]
    fn preserves_transition_time_when_unchanged() {
        let first = next(None, vec![], Some(1), None, at(10));
        let second = next(Some(&first), vec![], Some(2), None, at(20));

        let success = second.condition(RECONCILE_SUCCESS).expect("success condition");
        assert_eq!(success.last_transition_time, at(10));
        assert_eq!(success.observed_generation, Some(2));
        assert_eq!(second.conditions.len(), 2);
    }

    #[test]
    fn failure_flips_conditions() {
        let ok = next(None, vec![], Some(1), None, at(10));
        let failed = next(Some(&ok), vec![], Some(1), Some("boom"), at(20));

        let success = failed.condition(RECONCILE_SUCCESS).expect("success condition");
        assert_eq!(success.status, "False");
        assert_eq!(success.last_transition_time, at(20));

        let error = failed.condition(RECONCILE_ERROR).expect("error condition");
        assert_eq!(error.status, "True");
        assert_eq!(error.reason, FAILED);
        assert_eq!(error.message, "boom");
    }

    #[test]
    fn keeps_foreign_conditions() {
        let mut current = ServerStatus::default();
        current.conditions.push(Condition {
            type_: "Available".to_string(),
            status: "True".to_string(),
            reason: "MinimumReplicasAvailable".to_string(),
            message: String::new(),
            observed_generation: None,
            last_transition_time: at(1),
        });
        let status = next(Some(&current), vec![], None, None, at(5));
        assert_eq!(status.conditions.len(), 3);
        assert_eq!(status.conditions[0].type_, "Available");
    }
}
