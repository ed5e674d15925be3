use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use coverdesk_core::domain::renewal::{
    renewal_due, ReminderKind, RenewalDue, RenewalStatus,
};
use coverdesk_core::errors::WorkflowError;
use coverdesk_db::repositories::RenewalPolicyRepository;
use coverdesk_notify::Notifier;

use crate::quotes::map_repo_error;

#[derive(Debug, Default)]
pub struct ScanReport {
    pub scanned: usize,
    pub reminders_sent: Vec<(String, ReminderKind)>,
    pub pooled: Vec<String>,
    pub failures: Vec<(String, WorkflowError)>,
}

/// Walks the renewal book, sending each threshold reminder at most once and
/// handing expired unactioned policies to the agent pool.
///
/// Idempotency lives on the policy record (`reminders_sent`); there is no
/// separate scheduler checkpoint, so a restart resumes from whatever was
/// last persisted. A reminder whose send fails is NOT marked sent - the next
/// scan retries it.
pub struct RenewalService {
    policies: Arc<dyn RenewalPolicyRepository>,
    notifier: Arc<Notifier>,
}

impl RenewalService {
    pub fn new(policies: Arc<dyn RenewalPolicyRepository>, notifier: Arc<Notifier>) -> Self {
        Self { policies, notifier }
    }

    pub async fn scan(&self, today: NaiveDate) -> Result<ScanReport, WorkflowError> {
        let policies = self.policies.list_all().await.map_err(map_repo_error)?;

        let mut report = ScanReport { scanned: policies.len(), ..ScanReport::default() };

        for mut policy in policies {
            match renewal_due(&policy, today) {
                RenewalDue::Nothing => {}
                RenewalDue::Reminder(kind) => {
                    let days_left = policy.days_until_expiry(today);
                    let sent = self
                        .notifier
                        .send_renewal_reminder(
                            &policy.phone,
                            &policy.customer_name,
                            &policy.policy_number,
                            days_left,
                        )
                        .await;

                    match sent {
                        Ok(_) => {
                            policy.reminders_sent.push(kind);
                            policy.status = match kind {
                                ReminderKind::ThirtyDay => RenewalStatus::Reminder30Sent,
                                ReminderKind::FifteenDay => RenewalStatus::Reminder15Sent,
                            };
                            policy.updated_at = Utc::now();
                            let policy_number = policy.policy_number.clone();
                            match self.policies.save(policy).await {
                                Ok(()) => {
                                    report.reminders_sent.push((policy_number, kind));
                                }
                                Err(error) => {
                                    // Reminder went out but was not recorded;
                                    // the next scan will re-send (at-least-once).
                                    report
                                        .failures
                                        .push((policy_number, map_repo_error(error)));
                                }
                            }
                        }
                        Err(error) => {
                            report.failures.push((
                                policy.policy_number.clone(),
                                WorkflowError::NotificationFailed(error.to_string()),
                            ));
                        }
                    }
                }
                RenewalDue::PoolAssignment => {
                    policy.status = RenewalStatus::AssignedToPool;
                    policy.updated_at = Utc::now();
                    let policy_number = policy.policy_number.clone();
                    match self.policies.save(policy).await {
                        Ok(()) => report.pooled.push(policy_number),
                        Err(error) => {
                            report.failures.push((policy_number, map_repo_error(error)));
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Timer-driven entry point; the manual path is `scan` directly.
    pub async fn run_scheduler(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match self.scan(Utc::now().date_naive()).await {
                Ok(report) => {
                    info!(
                        event_name = "renewals.scan.completed",
                        scanned = report.scanned,
                        reminders = report.reminders_sent.len(),
                        pooled = report.pooled.len(),
                        failures = report.failures.len(),
                        "renewal scan completed"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "renewals.scan.failed",
                        error = %error,
                        "renewal scan failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, Utc};

    use coverdesk_core::domain::renewal::{ReminderKind, RenewalPolicy, RenewalStatus};
    use coverdesk_db::repositories::{InMemoryRenewalPolicyRepository, RenewalPolicyRepository};
    use coverdesk_notify::{MessageTemplates, MockTransport, Notifier};

    use super::RenewalService;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date")
    }

    fn policy(policy_number: &str, days_out: i64) -> RenewalPolicy {
        RenewalPolicy {
            policy_number: policy_number.to_string(),
            customer_name: "Maryam Isa".to_string(),
            phone: "39991234".to_string(),
            expiry_date: today() + Duration::days(days_out),
            status: RenewalStatus::Pending,
            reminders_sent: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn service(policies: Arc<InMemoryRenewalPolicyRepository>) -> RenewalService {
        let notifier = Arc::new(Notifier::new(
            Arc::new(MockTransport::instant()),
            MessageTemplates::new().expect("templates compile"),
            "973",
        ));
        RenewalService::new(policies, notifier)
    }

    #[tokio::test]
    async fn scan_sends_each_threshold_reminder_exactly_once() {
        let policies = Arc::new(InMemoryRenewalPolicyRepository::default());
        policies.save(policy("POL-1", 25)).await.expect("seed");
        let service = service(policies.clone());

        let first = service.scan(today()).await.expect("first scan");
        assert_eq!(first.reminders_sent, vec![("POL-1".to_string(), ReminderKind::ThirtyDay)]);

        let second = service.scan(today()).await.expect("second scan");
        assert!(second.reminders_sent.is_empty(), "same-day rescan must not re-send");

        let stored = policies.list_all().await.expect("list");
        assert_eq!(stored[0].status, RenewalStatus::Reminder30Sent);
        assert_eq!(stored[0].reminders_sent, vec![ReminderKind::ThirtyDay]);
    }

    #[tokio::test]
    async fn reminders_escalate_as_expiry_nears() {
        let policies = Arc::new(InMemoryRenewalPolicyRepository::default());
        policies.save(policy("POL-2", 25)).await.expect("seed");
        let service = service(policies.clone());

        service.scan(today()).await.expect("30-day scan");
        let later = today() + Duration::days(12);
        let report = service.scan(later).await.expect("15-day scan");

        assert_eq!(report.reminders_sent, vec![("POL-2".to_string(), ReminderKind::FifteenDay)]);
        let stored = policies.list_all().await.expect("list");
        assert_eq!(
            stored[0].reminders_sent,
            vec![ReminderKind::ThirtyDay, ReminderKind::FifteenDay]
        );
    }

    #[tokio::test]
    async fn expired_unactioned_policies_are_pooled_once() {
        let policies = Arc::new(InMemoryRenewalPolicyRepository::default());
        policies.save(policy("POL-3", -1)).await.expect("seed");
        let service = service(policies.clone());

        let report = service.scan(today()).await.expect("scan");
        assert_eq!(report.pooled, vec!["POL-3".to_string()]);

        let rescan = service.scan(today()).await.expect("rescan");
        assert!(rescan.pooled.is_empty(), "pooled policies are actioned");

        let stored = policies.list_all().await.expect("list");
        assert_eq!(stored[0].status, RenewalStatus::AssignedToPool);
    }

    #[tokio::test]
    async fn failed_reminder_sends_are_reported_and_retried_next_scan() {
        let policies = Arc::new(InMemoryRenewalPolicyRepository::default());
        // The mock transport fails the 20th send, so 20 due policies yield
        // exactly one delivery failure in the first pass.
        for index in 1..=20 {
            policies.save(policy(&format!("POL-B{index:02}"), 20)).await.expect("seed");
        }
        let service = service(policies.clone());

        let report = service.scan(today()).await.expect("scan");
        assert_eq!(report.reminders_sent.len(), 19);
        assert_eq!(report.failures.len(), 1);

        let stored = policies.list_all().await.expect("list");
        let unsent: Vec<_> =
            stored.iter().filter(|policy| policy.reminders_sent.is_empty()).collect();
        assert_eq!(unsent.len(), 1, "failed policy keeps its reminder pending");
        assert_eq!(unsent[0].policy_number, report.failures[0].0);

        let retry = service.scan(today()).await.expect("retry scan");
        assert_eq!(retry.reminders_sent.len(), 1, "failed reminder retries next scan");
    }
}
