//! Relationship index and store contracts.
//!
//! The engine never touches storage directly: every relational fact it
//! needs (ownership, match status, participation, roles, blocks, tokens)
//! comes through [`RelationshipIndex`]. Implementations answer from live
//! state within one logical read per evaluation; the engine does not cache
//! facts across requests, so a block or an unmatch takes effect on the
//! very next call.

use async_trait::async_trait;
use secrecy::SecretString;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::PolicyError;
use crate::facts::ResourceFacts;
use crate::models::{
    ClaimType, ConversationStage, OrgRole, ResourceKind, VerificationOutcome, VerificationStatus,
};

/// A stored verification request, as the token resolver sees it.
///
/// Carries the stored secret so the resolver can re-check equality in
/// constant time. Never serialized; [`crate::models::VerifierView`] is the
/// only shape that leaves the process.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    /// Verification request row id.
    pub id: Uuid,
    /// The stored bearer secret.
    pub token: SecretString,
    /// Lifecycle state; only `Pending` grants anything.
    pub status: VerificationStatus,
    /// What is being verified.
    pub claim_type: ClaimType,
    /// Subject who issued the request.
    pub claimant_id: Uuid,
    /// Name shown to the verifier.
    pub claimant_display_name: String,
    /// Who was asked.
    pub verifier_name: String,
    /// Where the link was sent. Never exposed through token access.
    pub verifier_email: String,
    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

/// Read-side contract: the relational facts evaluation runs on.
///
/// Point predicates serve single-row verdicts; the `*_ids` enumerations
/// serve filter mode, where access paths are compiled into row scopes
/// instead of being checked per row.
#[async_trait]
pub trait RelationshipIndex: Send + Sync {
    /// Snapshot the policy-relevant fields of one row.
    ///
    /// `Ok(None)` means the row does not exist; the engine turns that into
    /// the same denial an invisible row gets.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn resource_facts(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceFacts>, PolicyError>;

    /// Whether `a` and `b` share a match in accepted state right now.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn has_accepted_match(&self, a: Uuid, b: Uuid) -> Result<bool, PolicyError>;

    /// Whether `subject_id` is one of the two participants of the conversation.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn is_conversation_participant(
        &self,
        subject_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<bool, PolicyError>;

    /// Whether a block exists between `a` and `b`, in either direction.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> Result<bool, PolicyError>;

    /// The subject's role in the organization, if an active membership exists.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn org_role(
        &self,
        subject_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<OrgRole>, PolicyError>;

    /// Number of subjects holding the `Owner` role in the organization.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn org_owner_count(&self, org_id: Uuid) -> Result<usize, PolicyError>;

    /// Subjects sharing an accepted match with `subject_id`.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn accepted_peer_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError>;

    /// Subjects blocked by or blocking `subject_id`.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn blocked_peer_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError>;

    /// Conversations `subject_id` participates in.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn participant_conversation_ids(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<Uuid>, PolicyError>;

    /// Organizations where `subject_id` holds an active membership.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn active_org_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError>;

    /// Organizations where `subject_id` holds `Admin` or above.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn admin_org_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError>;

    /// Find the verification request a presented token belongs to.
    ///
    /// Implementations must locate the record without short-circuiting on
    /// secret prefixes (constant-time comparison); the resolver re-checks
    /// equality on the returned record either way.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the lookup itself fails.
    async fn token_lookup(
        &self,
        token: &SecretString,
    ) -> Result<Option<TokenRecord>, PolicyError>;
}

/// Write-side contract for the two mutations the engine owns.
///
/// Both are conditional updates: they re-check state at write time, so the
/// verdict the engine computed a moment earlier cannot act on stale facts.
#[async_trait]
pub trait RelationshipStore: RelationshipIndex {
    /// Advance a conversation's disclosure stage.
    ///
    /// Applies `stage = max(current, requested)` atomically and returns the
    /// resulting stage. Idempotent under concurrent double-submission; never
    /// lowers the stage.
    ///
    /// # Errors
    ///
    /// [`PolicyError::Internal`] if the conversation does not exist,
    /// [`PolicyError`] if the write itself fails.
    async fn advance_conversation_stage(
        &self,
        conversation_id: Uuid,
        requested: ConversationStage,
    ) -> Result<ConversationStage, PolicyError>;

    /// Settle a pending verification request with the verifier's answer.
    ///
    /// Transitions `status` from `Pending` exactly once, atomically; returns
    /// `false` without changing anything when the request was already
    /// settled (a replay).
    ///
    /// # Errors
    ///
    /// [`PolicyError::Internal`] if the request does not exist,
    /// [`PolicyError`] if the write itself fails.
    async fn settle_verification(
        &self,
        token_id: Uuid,
        outcome: VerificationOutcome,
    ) -> Result<bool, PolicyError>;

    /// Persist a freshly issued verification request.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] if the write itself fails.
    async fn insert_verification(&self, record: TokenRecord) -> Result<(), PolicyError>;
}
