#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Policy SDK
//!
//! This crate defines the contracts of the Trova policy engine:
//!
//! - [`PolicyClient`] - evaluation API every data-access path consults
//! - [`TokenAccessResolver`] - token-scoped guest access to verifications
//! - [`RelationshipIndex`], [`RelationshipStore`] - storage-side contracts
//! - [`Decision`], [`DenyReason`] - evaluation outcomes
//! - [`ResourceKind`], [`Action`], [`ResourceRef`] - evaluation inputs
//! - [`AuditRecord`], [`AuditSink`] - append-only decision trail
//! - [`PolicyError`], [`AccessError`], [`TokenError`] - error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use policy_sdk::{Action, EvaluationContext, PolicyClient, ResourceKind, ResourceRef};
//!
//! // Single-row read: denial is indistinguishable from absence.
//! let decision = policy
//!     .evaluate(
//!         principal,
//!         ResourceRef::row(ResourceKind::Profile, profile_id),
//!         Action::Select,
//!         EvaluationContext::none(),
//!     )
//!     .await?;
//! decision.into_row_result()?;
//!
//! // Collection read: compile a row scope instead of a verdict.
//! let scope = policy.access_scope(principal, ResourceKind::Assignment).await?;
//! ```

pub mod api;
pub mod audit;
pub mod error;
pub mod facts;
pub mod index;
pub mod models;

pub use api::{PolicyClient, TokenAccessResolver};
pub use audit::{AuditOutcome, AuditRecord, AuditSink};
pub use error::{AccessError, PolicyError, TokenError};
pub use facts::ResourceFacts;
pub use index::{RelationshipIndex, RelationshipStore, TokenRecord};
pub use models::{
    Action, ClaimType, ConversationStage, Decision, DenyReason, EvaluationContext, IssuedToken,
    MatchStatus, MembershipStatus, OrgRole, PublishStatus, ResourceKind, ResourceRef,
    TokenIssueRequest, VerificationOutcome, VerificationStatus, VerifierView, Visibility,
};
