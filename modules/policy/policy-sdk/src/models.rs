//! Evaluation models shared between the policy engine and its consumers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use trova_security::AccessScope;

use crate::error::AccessError;

/// The closed set of resource types the policy engine knows about.
///
/// Every evaluation names one of these. There is no string-typed fallback:
/// a (kind, action) pair the rule catalog does not configure is a
/// misconfiguration, not an implicit allow or an implicit deny-with-404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// The root profile aggregate of a person or company.
    Profile,
    /// Person-specific profile data.
    IndividualProfile,
    /// A skill row attached to a profile.
    Skill,
    /// A job/engagement posting.
    Assignment,
    /// The matchable, compensation-bearing view of a profile.
    MatchingProfile,
    /// A seeker/poster pairing with an acceptance lifecycle.
    Match,
    /// A two-party messaging channel attached to a match.
    Conversation,
    /// A message row inside a conversation.
    Message,
    /// A third-party verification request with token-scoped guest access.
    VerificationRequest,
    /// A subject's membership row in an organization.
    OrganizationMember,
    /// One direction of a block relationship.
    BlockedUser,
    /// A behavioral analytics event.
    AnalyticsEvent,
    /// A pending invitation into an organization.
    OrgInvitation,
}

impl ResourceKind {
    /// Stable lowercase name, used in audit records and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::IndividualProfile => "individual_profile",
            Self::Skill => "skill",
            Self::Assignment => "assignment",
            Self::MatchingProfile => "matching_profile",
            Self::Match => "match",
            Self::Conversation => "conversation",
            Self::Message => "message",
            Self::VerificationRequest => "verification_request",
            Self::OrganizationMember => "organization_member",
            Self::BlockedUser => "blocked_user",
            Self::AnalyticsEvent => "analytics_event",
            Self::OrgInvitation => "org_invitation",
        }
    }

    /// All resource kinds, in declaration order.
    ///
    /// Used by catalog completeness checks and tests.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Profile,
            Self::IndividualProfile,
            Self::Skill,
            Self::Assignment,
            Self::MatchingProfile,
            Self::Match,
            Self::Conversation,
            Self::Message,
            Self::VerificationRequest,
            Self::OrganizationMember,
            Self::BlockedUser,
            Self::AnalyticsEvent,
            Self::OrgInvitation,
        ]
    }
}

/// The four row-level operations the engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read one row or list a collection.
    Select,
    /// Create a row.
    Insert,
    /// Modify an existing row.
    Update,
    /// Remove an existing row.
    Delete,
}

impl Action {
    /// Stable lowercase name, used in audit records and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// All actions, in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Select, Self::Insert, Self::Update, Self::Delete]
    }

    /// Returns `true` for operations that change rows.
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Select)
    }
}

/// The resource an evaluation is about.
///
/// `id == None` on `Select` means a collection read and switches the engine
/// into filter mode. `owner_id` is the caller-declared owning subject for
/// `Insert` (there is no stored row to consult yet); for existing rows the
/// engine trusts the relationship index, not this hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource type under evaluation.
    pub kind: ResourceKind,
    /// Row identity; `None` means the whole collection.
    pub id: Option<Uuid>,
    /// Declared owning subject (`Insert` only).
    pub owner_id: Option<Uuid>,
}

impl ResourceRef {
    /// Reference a whole collection (list reads, inserts).
    #[must_use]
    pub fn collection(kind: ResourceKind) -> Self {
        Self {
            kind,
            id: None,
            owner_id: None,
        }
    }

    /// Reference a single row by id.
    #[must_use]
    pub fn row(kind: ResourceKind, id: Uuid) -> Self {
        Self {
            kind,
            id: Some(id),
            owner_id: None,
        }
    }

    /// Attach the declared owning subject (used for `Insert`).
    #[must_use]
    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Returns `true` if this references the collection rather than a row.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.id.is_none()
    }
}

/// Relational hints accompanying an evaluation.
///
/// Needed mostly for `Insert`, where the row does not exist yet and its
/// relational position (the peer, the conversation, the org) must be
/// declared by the caller, and for stage updates. The engine verifies every
/// hint against the relationship index; it never trusts them bare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationContext {
    /// The other party of the row being created (e.g. a new conversation).
    pub peer_id: Option<Uuid>,
    /// The conversation a new message belongs to.
    pub conversation_id: Option<Uuid>,
    /// The organization a membership/invitation row belongs to.
    pub org_id: Option<Uuid>,
    /// The disclosure stage an update wants to move a conversation to.
    pub requested_stage: Option<ConversationStage>,
}

impl EvaluationContext {
    /// An empty context. Sufficient for most reads.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the peer subject of the row being created.
    #[must_use]
    pub fn with_peer(mut self, peer_id: Uuid) -> Self {
        self.peer_id = Some(peer_id);
        self
    }

    /// Set the conversation the row belongs to.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Set the organization the row belongs to.
    #[must_use]
    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Set the requested disclosure stage for a conversation update.
    #[must_use]
    pub fn with_requested_stage(mut self, stage: ConversationStage) -> Self {
        self.requested_stage = Some(stage);
        self
    }
}

/// Role of a subject inside an organization, orderable by privilege.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    /// Ordinary member.
    Member,
    /// Can manage memberships and invitations.
    Admin,
    /// Full control; the last owner cannot be removed.
    Owner,
}

impl OrgRole {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

/// Lifecycle of an organization membership row.
///
/// Only `Active` grants visibility or rights; the relationship index treats
/// the other states as no membership at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Invited, not yet joined.
    Invited,
    /// Joined and in good standing.
    Active,
    /// Removed from the organization.
    Removed,
}

/// Disclosure stage of a conversation. Only ever advances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// Identity and compensation stay hidden even though the channel exists.
    Masked,
    /// Both sides revealed.
    Revealed,
}

impl ConversationStage {
    /// Numeric level as stored (1 = masked, 2 = revealed).
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Masked => 1,
            Self::Revealed => 2,
        }
    }
}

/// Lifecycle of a match between a seeker and a poster.
///
/// Only `Accepted` unlocks conversations and compensation disclosure, and
/// only for as long as the row stays in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Proposed, not yet answered.
    Pending,
    /// Both sides in.
    Accepted,
    /// Turned down, or revoked after acceptance.
    Rejected,
}

/// Visibility of an owned row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Owner only.
    Private,
    /// Readable by anyone the other gates let through.
    Public,
}

impl Visibility {
    /// Stable lowercase name, as stored in the `visibility` row property.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

/// Publish lifecycle of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Visible only to the owner, regardless of visibility.
    Draft,
    /// Listed.
    Published,
}

impl PublishStatus {
    /// Stable lowercase name, as stored in the `status` row property.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

/// Lifecycle of a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Issued, waiting for the verifier.
    Pending,
    /// Verifier confirmed the claim.
    Accepted,
    /// Verifier rejected the claim.
    Declined,
}

/// What a verification request asks a third party to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// A past or current engagement.
    Employment,
    /// A degree or course.
    Education,
    /// A professional certification.
    Certification,
}

/// A verifier's answer to a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Claim confirmed.
    Accepted,
    /// Claim rejected.
    Declined,
}

impl VerificationOutcome {
    /// Stable lowercase name, used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// The verification status this answer settles the request into.
    #[must_use]
    pub fn into_status(self) -> VerificationStatus {
        match self {
            Self::Accepted => VerificationStatus::Accepted,
            Self::Declined => VerificationStatus::Declined,
        }
    }
}

/// Why an evaluation denied.
///
/// `Select` on a single row always denies as [`DenyReason::NotFound`] so a
/// denied-but-existing row is indistinguishable from a missing one. The more
/// specific reasons are reserved for writes, where the caller has already
/// proven it can see the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Row invisible to this principal (or genuinely absent).
    NotFound,
    /// Visible but not writable by this principal.
    Forbidden,
    /// A block between the two parties suppresses the interaction.
    Blocked,
    /// The update would move a conversation to a lower disclosure stage.
    StageRegression,
    /// Removing the last owner of an organization.
    SoleOwner,
    /// The operation requires an authenticated principal.
    Anonymous,
    /// The (resource, action) pair is absent from the rule catalog.
    PolicyMisconfigured,
}

impl DenyReason {
    /// Stable lowercase code, used in audit records and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Blocked => "blocked",
            Self::StageRegression => "stage_regression",
            Self::SoleOwner => "sole_owner",
            Self::Anonymous => "anonymous",
            Self::PolicyMisconfigured => "policy_misconfigured",
        }
    }
}

/// Outcome of one policy evaluation.
///
/// Denial is a value, not an error: [`crate::error::PolicyError`] is reserved
/// for infrastructure failures (index outage, timeout), which callers must
/// treat as deny.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Permitted; `matched_rule` names the first rule that granted.
    Allow {
        /// Catalog name of the granting rule, for audit.
        matched_rule: &'static str,
    },
    /// Refused.
    Deny {
        /// Why, in caller-safe terms.
        reason: DenyReason,
    },
    /// Collection read: apply this row scope instead of a verdict.
    Filter {
        /// Disjunction of access paths the caller must push into its query.
        scope: AccessScope,
    },
}

impl Decision {
    /// Permit, recording the granting rule.
    #[must_use]
    pub fn allow(matched_rule: &'static str) -> Self {
        Self::Allow { matched_rule }
    }

    /// Refuse with a reason.
    #[must_use]
    pub fn deny(reason: DenyReason) -> Self {
        Self::Deny { reason }
    }

    /// Defer to a row scope (collection reads).
    #[must_use]
    pub fn filter(scope: AccessScope) -> Self {
        Self::Filter { scope }
    }

    /// Returns `true` for [`Decision::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Collapse into a pass/fail verdict for a single-row operation.
    ///
    /// A `Filter` here means the caller evaluated a collection request where
    /// a row verdict was expected; that is treated as a deny, never a grant.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] when the row is invisible to the principal
    /// - [`AccessError::PolicyMisconfigured`] when the catalog has no entry
    /// - [`AccessError::Forbidden`] for every other refusal
    pub fn into_row_result(self) -> Result<(), AccessError> {
        match self {
            Self::Allow { .. } => Ok(()),
            Self::Deny { reason } => match reason {
                DenyReason::NotFound => Err(AccessError::NotFound),
                DenyReason::PolicyMisconfigured => Err(AccessError::PolicyMisconfigured),
                DenyReason::Forbidden
                | DenyReason::Blocked
                | DenyReason::StageRegression
                | DenyReason::SoleOwner
                | DenyReason::Anonymous => Err(AccessError::Forbidden),
            },
            Self::Filter { .. } => Err(AccessError::Forbidden),
        }
    }

    /// Collapse into a row scope for a collection read.
    ///
    /// `Allow` (privileged bypass) becomes the unconstrained scope; `Deny`
    /// becomes deny-all, which reads back as a silently empty collection.
    #[must_use]
    pub fn into_scope(self) -> AccessScope {
        match self {
            Self::Allow { .. } => AccessScope::allow_all(),
            Self::Deny { .. } => AccessScope::deny_all(),
            Self::Filter { scope } => scope,
        }
    }
}

/// Claimant-side request to issue a verification token.
#[derive(Debug, Clone)]
pub struct TokenIssueRequest {
    /// What the verifier is asked to confirm.
    pub claim_type: ClaimType,
    /// Name shown to the verifier.
    pub claimant_display_name: String,
    /// Who is being asked.
    pub verifier_name: String,
    /// Where the link is sent. Never exposed back through token access.
    pub verifier_email: String,
    /// Validity window override. When `None` the issuer's configured
    /// window applies.
    pub ttl: Option<time::Duration>,
}

/// A freshly issued verification token.
///
/// The secret is revealed exactly once, here; afterwards it only ever
/// travels inside [`secrecy::SecretString`].
#[derive(Debug)]
pub struct IssuedToken {
    /// Verification request row id.
    pub id: Uuid,
    /// The bearer secret to embed in the verification link.
    pub token: secrecy::SecretString,
    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

/// The slice of a verification request a token bearer is allowed to see.
///
/// Deliberately narrow: no verifier email, no claimant id, no token echo,
/// and nothing reachable beyond this one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierView {
    /// What is being verified.
    pub claim_type: ClaimType,
    /// Who claims it, by display name only.
    pub claimant_display_name: String,
    /// Who was asked.
    pub verifier_name: String,
    /// When the link stops working.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
