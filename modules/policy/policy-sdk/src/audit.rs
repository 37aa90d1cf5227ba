//! Audit trail contract.
//!
//! Every evaluation produces exactly one [`AuditRecord`], appended through
//! an [`AuditSink`]. The trail is write-only from the engine's point of
//! view: decisions are never derived from previously written records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use trova_security::{Principal, PrincipalKind};

use crate::error::PolicyError;
use crate::models::{Action, Decision, DenyReason, ResourceKind, ResourceRef};

/// How an evaluation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// A rule granted the operation.
    Allowed,
    /// The operation was refused.
    Denied,
    /// A collection read was answered with a row scope.
    Filtered,
}

/// One appended evaluation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the decision was made.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// Kind of the requesting principal.
    pub principal_kind: PrincipalKind,
    /// Requesting subject, where the principal has one.
    pub subject_id: Option<Uuid>,
    /// Resource type under evaluation.
    pub resource_kind: ResourceKind,
    /// Row identity, absent for collection requests.
    pub resource_id: Option<Uuid>,
    /// Operation under evaluation.
    pub action: Action,
    /// How the evaluation concluded.
    pub outcome: AuditOutcome,
    /// Catalog name of the granting rule, for allows.
    pub matched_rule: Option<String>,
    /// Caller-safe denial reason, for denies.
    pub deny_reason: Option<DenyReason>,
    /// Marks a service-role bypass.
    pub privileged: bool,
}

impl AuditRecord {
    /// Build the record for one completed evaluation.
    #[must_use]
    pub fn for_decision(
        occurred_at: OffsetDateTime,
        principal: Principal,
        resource: ResourceRef,
        action: Action,
        decision: &Decision,
    ) -> Self {
        let (outcome, matched_rule, deny_reason) = match decision {
            Decision::Allow { matched_rule } => {
                (AuditOutcome::Allowed, Some((*matched_rule).to_owned()), None)
            }
            Decision::Deny { reason } => (AuditOutcome::Denied, None, Some(*reason)),
            Decision::Filter { .. } => (AuditOutcome::Filtered, None, None),
        };
        Self {
            occurred_at,
            principal_kind: principal.kind(),
            subject_id: principal.subject_id(),
            resource_kind: resource.kind,
            resource_id: resource.id,
            action,
            outcome,
            matched_rule,
            deny_reason,
            privileged: principal.is_service_role() && decision.is_allowed(),
        }
    }
}

/// Append-only destination for audit records.
///
/// A failing sink must not block the operation that produced the record;
/// the engine logs the failure and counts the dropped record instead.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the record could not be appended.
    async fn record(&self, record: AuditRecord) -> Result<(), PolicyError>;
}
