//! The policy service: catalog lookup, evaluation, audit fan-out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use policy_sdk::error::{AccessError, PolicyError};
use policy_sdk::{
    Action, AuditRecord, AuditSink, ConversationStage, Decision, DenyReason, EvaluationContext,
    PolicyClient, RelationshipStore, ResourceKind, ResourceRef,
};
use trova_security::{AccessScope, Principal};

use crate::config::PolicyConfig;

use super::catalog::{self, CombiningStrategy, SERVICE_ROLE_RULE};
use super::{compiler, evaluator};

/// The decision point. Implements [`PolicyClient`] over an injected
/// relationship store and audit sink.
///
/// Holds no session state: every evaluation is a pure function of the
/// principal, the catalog and the facts read from the store during that one
/// call. The two counters are monitoring signals, never inputs to a
/// decision.
pub struct PolicyService {
    store: Arc<dyn RelationshipStore>,
    audit: Arc<dyn AuditSink>,
    config: PolicyConfig,
    dropped_audit_records: AtomicU64,
    misconfigured_lookups: AtomicU64,
}

impl PolicyService {
    #[must_use]
    pub fn new(
        store: Arc<dyn RelationshipStore>,
        audit: Arc<dyn AuditSink>,
        config: PolicyConfig,
    ) -> Self {
        Self {
            store,
            audit,
            config,
            dropped_audit_records: AtomicU64::new(0),
            misconfigured_lookups: AtomicU64::new(0),
        }
    }

    /// Audit records the sink failed to accept since startup.
    #[must_use]
    pub fn dropped_audit_records(&self) -> u64 {
        self.dropped_audit_records.load(Ordering::Relaxed)
    }

    /// Evaluations that hit a (resource, action) pair with no catalog entry.
    #[must_use]
    pub fn misconfigured_lookups(&self) -> u64 {
        self.misconfigured_lookups.load(Ordering::Relaxed)
    }

    /// The decision algorithm, without timeout or audit wrapping.
    async fn decide(
        &self,
        principal: Principal,
        resource: ResourceRef,
        action: Action,
        context: EvaluationContext,
    ) -> Result<Decision, PolicyError> {
        if principal.is_service_role() {
            return Ok(Decision::allow(SERVICE_ROLE_RULE));
        }

        let Some(set) = catalog::rule_set(resource.kind, action) else {
            self.misconfigured_lookups.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                resource = resource.kind.as_str(),
                action = action.as_str(),
                "No catalog entry for (resource, action); denying"
            );
            return Ok(Decision::deny(DenyReason::PolicyMisconfigured));
        };
        debug_assert!(
            set.deny.is_empty() || set.strategy == CombiningStrategy::DenyOverrides
        );

        let subject = principal.subject_id();
        if action == Action::Select && resource.is_collection() {
            let scope =
                compiler::compile_scope(self.store.as_ref(), subject, resource.kind, set).await?;
            return Ok(Decision::filter(scope));
        }
        evaluator::evaluate_rules(self.store.as_ref(), subject, resource, action, context, set)
            .await
    }

    /// Append the audit record for a completed decision.
    ///
    /// A failing sink never blocks the operation; the drop is logged and
    /// counted instead.
    async fn audit(
        &self,
        principal: Principal,
        resource: ResourceRef,
        action: Action,
        decision: &Decision,
    ) {
        let record = AuditRecord::for_decision(
            OffsetDateTime::now_utc(),
            principal,
            resource,
            action,
            decision,
        );
        if let Err(err) = self.audit.record(record).await {
            self.dropped_audit_records.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                error = %err,
                resource = resource.kind.as_str(),
                action = action.as_str(),
                "Failed to append audit record; decision stands"
            );
        }
    }
}

#[async_trait]
impl PolicyClient for PolicyService {
    #[tracing::instrument(
        skip_all,
        fields(resource = resource.kind.as_str(), action = action.as_str())
    )]
    async fn evaluate(
        &self,
        principal: Principal,
        resource: ResourceRef,
        action: Action,
        context: EvaluationContext,
    ) -> Result<Decision, PolicyError> {
        let deadline = self.config.decision_timeout();
        let decision = tokio::time::timeout(
            deadline,
            self.decide(principal, resource, action, context),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                resource = resource.kind.as_str(),
                action = action.as_str(),
                "Evaluation deadline exceeded; callers must treat this as deny"
            );
            PolicyError::Timeout(self.config.decision_timeout_ms)
        })??;

        self.audit(principal, resource, action, &decision).await;
        Ok(decision)
    }

    async fn access_scope(
        &self,
        principal: Principal,
        kind: ResourceKind,
    ) -> Result<AccessScope, PolicyError> {
        let decision = self
            .evaluate(
                principal,
                ResourceRef::collection(kind),
                Action::Select,
                EvaluationContext::none(),
            )
            .await?;
        Ok(decision.into_scope())
    }

    #[tracing::instrument(skip_all, fields(conversation_id = %conversation_id))]
    async fn advance_conversation_stage(
        &self,
        principal: Principal,
        conversation_id: Uuid,
        requested: ConversationStage,
    ) -> Result<ConversationStage, AccessError> {
        let decision = self
            .evaluate(
                principal,
                ResourceRef::row(ResourceKind::Conversation, conversation_id),
                Action::Update,
                EvaluationContext::none().with_requested_stage(requested),
            )
            .await?;
        decision.into_row_result()?;

        // Monotonic conditional write: converges under double-submission
        // from both participants and never lowers the stage.
        self.store
            .advance_conversation_stage(conversation_id, requested)
            .await
            .map_err(|err| AccessError::Internal(err.to_string()))
    }
}
