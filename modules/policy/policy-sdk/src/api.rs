//! Public API traits for the policy engine.

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use trova_security::{AccessScope, Principal};

use crate::error::{AccessError, PolicyError, TokenError};
use crate::models::{
    Action, ConversationStage, Decision, EvaluationContext, IssuedToken, ResourceKind,
    ResourceRef, TokenIssueRequest, VerificationOutcome, VerifierView,
};

/// The decision point every data-access path consults.
///
/// ```ignore
/// let resource = ResourceRef::row(ResourceKind::Profile, id);
/// let decision = policy
///     .evaluate(principal, resource, Action::Select, EvaluationContext::none())
///     .await?;
/// decision.into_row_result()?;
/// ```
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Evaluate one (principal, resource, action) triple.
    ///
    /// Returns a [`Decision`]; refusal is a value, not an error. A
    /// collection `Select` (no row id) comes back as [`Decision::Filter`]
    /// with the row scope to push into the query.
    ///
    /// # Errors
    ///
    /// [`PolicyError`] on infrastructure failure or timeout; callers must
    /// treat either as deny.
    async fn evaluate(
        &self,
        principal: Principal,
        resource: ResourceRef,
        action: Action,
        context: EvaluationContext,
    ) -> Result<Decision, PolicyError>;

    /// Compile the row scope for listing a collection.
    ///
    /// Convenience over [`PolicyClient::evaluate`] for the common list-read
    /// path: always yields a scope, collapsing `Allow` to unconstrained and
    /// `Deny` to deny-all (a silently empty listing).
    ///
    /// # Errors
    ///
    /// [`PolicyError`] on infrastructure failure or timeout.
    async fn access_scope(
        &self,
        principal: Principal,
        kind: ResourceKind,
    ) -> Result<AccessScope, PolicyError>;

    /// Move a conversation's disclosure stage forward.
    ///
    /// Evaluates `Update` on the conversation for this principal, then
    /// applies the monotonic stage write. Returns the stage after the write,
    /// which is never lower than before it.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if the principal may not see the conversation
    /// - [`AccessError::Forbidden`] if a participant requests a lower stage,
    ///   or the evaluation timed out
    /// - [`AccessError::Internal`] if the write fails
    async fn advance_conversation_stage(
        &self,
        principal: Principal,
        conversation_id: Uuid,
        requested: ConversationStage,
    ) -> Result<ConversationStage, AccessError>;
}

/// Token-scoped guest access to verification requests.
///
/// Bypasses [`Principal`] entirely: the token itself is the capability.
/// Everything a bearer can reach is the [`VerifierView`] of the one record
/// the token belongs to.
#[async_trait]
pub trait TokenAccessResolver: Send + Sync {
    /// Issue a verification request on behalf of a claimant.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Invalid`] if the principal carries no subject
    /// - [`TokenError::Internal`] if persisting the request fails
    async fn issue(
        &self,
        principal: Principal,
        request: TokenIssueRequest,
    ) -> Result<IssuedToken, TokenError>;

    /// Resolve a presented token to the verifier's view of its record.
    ///
    /// # Errors
    ///
    /// [`TokenError::Invalid`] if the token is unknown, expired or already
    /// settled; the variants are deliberately indistinguishable.
    async fn resolve(&self, token: &SecretString) -> Result<VerifierView, TokenError>;

    /// Record the verifier's answer, exactly once.
    ///
    /// Replays after the first settlement are refused, not repeated.
    ///
    /// # Errors
    ///
    /// [`TokenError::Invalid`] if the token grants nothing or was already
    /// settled.
    async fn respond(
        &self,
        token: &SecretString,
        outcome: VerificationOutcome,
    ) -> Result<(), TokenError>;
}
