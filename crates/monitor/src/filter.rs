//! The alert decision core.
//!
//! A workflow becomes a new alert when it clears three tests, in order:
//! cost threshold, monitoring window, and duplicate suppression against the
//! persisted log. Deduplication keys on the (workflow id, cost) pair, not
//! identity alone: a workflow whose cost has changed since its last alert
//! is a new alert-worthy event.

use chrono::{DateTime, Utc};

use costwatch_alert_log::AlertLogEntry;
use costwatch_source::WorkflowCostRecord;

/// Decide whether one record is a new alert.
///
/// A record with an unknown submit time never alerts: without it the
/// window test cannot hold.
#[must_use]
#[allow(clippy::float_cmp)] // duplicate test is exact (identity, cost) equality
pub fn is_new_alert(
    record: &WorkflowCostRecord,
    log_entries: &[AlertLogEntry],
    cost_limit: f64,
    window_hours: f64,
    now: DateTime<Utc>,
) -> bool {
    if record.cost < cost_limit {
        return false;
    }

    let Some(age_hours) = record.age_hours(now) else {
        return false;
    };
    if age_hours >= window_hours {
        return false;
    }

    !log_entries.iter().any(|entry| {
        entry.record.workflow_id == record.workflow_id && entry.record.cost == record.cost
    })
}

/// Select the subset of records that are new alerts.
///
/// Pure over its inputs; output order follows the input and carries no
/// meaning.
#[must_use]
pub fn filter_new_alerts(
    records: &[WorkflowCostRecord],
    log_entries: &[AlertLogEntry],
    cost_limit: f64,
    window_hours: f64,
    now: DateTime<Utc>,
) -> Vec<WorkflowCostRecord> {
    records
        .iter()
        .filter(|record| is_new_alert(record, log_entries, cost_limit, window_hours, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use costwatch_source::WorkflowStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    fn record(workflow_id: &str, cost: f64, age: Option<Duration>) -> WorkflowCostRecord {
        WorkflowCostRecord {
            namespace: "ns".to_string(),
            workspace: "ws".to_string(),
            submission_id: "sub-1".to_string(),
            workflow_id: workflow_id.to_string(),
            submission_name: "align".to_string(),
            submitter: "user@example.org".to_string(),
            cost,
            submit_time: age.map(|a| now() - a),
            start_time: None,
            end_time: None,
            status: WorkflowStatus::Running,
        }
    }

    fn logged(workflow_id: &str, cost: f64) -> AlertLogEntry {
        AlertLogEntry::new(record(workflow_id, cost, Some(Duration::hours(1))), now())
    }

    #[test]
    fn test_below_threshold_never_alerts() {
        let w = record("wf-1", 9.99, Some(Duration::hours(1)));
        assert!(!is_new_alert(&w, &[], 10.0, 24.0, now()));
    }

    #[test]
    fn test_at_threshold_alerts() {
        let w = record("wf-1", 10.0, Some(Duration::hours(1)));
        assert!(is_new_alert(&w, &[], 10.0, 24.0, now()));
    }

    #[test]
    fn test_outside_window_never_alerts() {
        let w = record("wf-1", 100.0, Some(Duration::hours(48)));
        assert!(!is_new_alert(&w, &[], 10.0, 24.0, now()));
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let w = record("wf-1", 100.0, Some(Duration::hours(24)));
        assert!(!is_new_alert(&w, &[], 10.0, 24.0, now()));
    }

    #[test]
    fn test_unknown_submit_time_never_alerts() {
        let w = record("wf-1", 100.0, None);
        assert!(!is_new_alert(&w, &[], 10.0, 24.0, now()));
    }

    #[test]
    fn test_duplicate_identity_and_cost_is_suppressed() {
        let w = record("wf-1", 15.0, Some(Duration::hours(1)));
        let log = vec![logged("wf-1", 15.0)];
        assert!(!is_new_alert(&w, &log, 10.0, 24.0, now()));
    }

    #[test]
    fn test_changed_cost_realerts() {
        let w = record("wf-1", 25.0, Some(Duration::hours(1)));
        let log = vec![logged("wf-1", 15.0)];
        assert!(is_new_alert(&w, &log, 10.0, 24.0, now()));
    }

    #[test]
    fn test_same_cost_different_workflow_alerts() {
        let w = record("wf-2", 15.0, Some(Duration::hours(1)));
        let log = vec![logged("wf-1", 15.0)];
        assert!(is_new_alert(&w, &log, 10.0, 24.0, now()));
    }

    #[test]
    fn test_threshold_wins_over_everything() {
        // Below-threshold records stay silent even with a matching log
        // entry and a valid window.
        let w = record("wf-1", 5.0, Some(Duration::hours(1)));
        let log = vec![logged("wf-1", 5.0)];
        assert!(!is_new_alert(&w, &log, 10.0, 24.0, now()));
    }

    #[test]
    fn test_filter_selects_only_new_alerts() {
        let records = vec![
            record("wf-cheap", 1.0, Some(Duration::hours(1))),
            record("wf-dup", 15.0, Some(Duration::hours(1))),
            record("wf-new", 20.0, Some(Duration::hours(2))),
            record("wf-old", 50.0, Some(Duration::hours(30))),
        ];
        let log = vec![logged("wf-dup", 15.0)];

        let alerts = filter_new_alerts(&records, &log, 10.0, 24.0, now());
        let ids: Vec<&str> = alerts.iter().map(|r| r.workflow_id.as_str()).collect();
        assert_eq!(ids, vec!["wf-new"]);
    }
}
