//! Audit sink implementations.
//!
//! Both are write-only from the engine's point of view: the export feed on
//! [`MemoryAuditSink`] exists for compliance tooling, never for evaluation.

use async_trait::async_trait;
use parking_lot::Mutex;

use policy_sdk::error::PolicyError;
use policy_sdk::{AuditOutcome, AuditRecord, AuditSink};

/// Emits one structured log line per decision.
///
/// The default sink for embedders whose log pipeline is the audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), PolicyError> {
        let outcome = match record.outcome {
            AuditOutcome::Allowed => "allowed",
            AuditOutcome::Denied => "denied",
            AuditOutcome::Filtered => "filtered",
        };
        tracing::info!(
            target: "policy_audit",
            occurred_at = %record.occurred_at,
            subject_id = record.subject_id.map(|id| id.to_string()),
            resource = record.resource_kind.as_str(),
            resource_id = record.resource_id.map(|id| id.to_string()),
            action = record.action.as_str(),
            outcome,
            matched_rule = record.matched_rule.as_deref(),
            deny_reason = record.deny_reason.map(policy_sdk::DenyReason::as_str),
            privileged = record.privileged,
            "policy decision"
        );
        Ok(())
    }
}

/// Appends records to an in-process buffer.
///
/// Backs tests and embedders that ship the trail elsewhere in batches.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only export of everything recorded so far, in append order.
    #[must_use]
    pub fn export(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), PolicyError> {
        self.records.lock().push(record);
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use policy_sdk::{Action, Decision, ResourceKind, ResourceRef};
    use time::OffsetDateTime;
    use trova_security::Principal;
    use uuid::Uuid;

    fn sample_record() -> AuditRecord {
        AuditRecord::for_decision(
            OffsetDateTime::now_utc(),
            Principal::authenticated(Uuid::new_v4()),
            ResourceRef::row(ResourceKind::Profile, Uuid::new_v4()),
            Action::Select,
            &Decision::allow("owner"),
        )
    }

    #[tokio::test]
    async fn memory_sink_exports_in_append_order() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());
        sink.record(sample_record()).await.unwrap();
        sink.record(sample_record()).await.unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.export().len(), 2);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn tracing_sink_logs_the_decision() {
        TracingAuditSink::new().record(sample_record()).await.unwrap();
        assert!(logs_contain("policy decision"));
    }
}
