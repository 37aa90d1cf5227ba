//! Filter-mode compilation for collection reads.
//!
//! A `Select` without a row id never yields a verdict: each allow rule is
//! compiled into an access path over row properties, and the paths are
//! OR-ed into one [`AccessScope`] the caller pushes into its query. A
//! principal with no path gets the deny-all scope, which reads back as a
//! silently empty collection.

use uuid::Uuid;

use policy_sdk::error::PolicyError;
use policy_sdk::{OrgRole, PublishStatus, RelationshipIndex, ResourceKind, Visibility};
use trova_security::{AccessScope, RowProperty, ScopeConstraint, ScopeFilter};

use super::catalog::{Guard, Rule, RuleSet};

/// Compile a rule set into the row scope for listing `kind`.
pub(crate) async fn compile_scope(
    index: &dyn RelationshipIndex,
    subject: Option<Uuid>,
    kind: ResourceKind,
    set: &RuleSet,
) -> Result<AccessScope, PolicyError> {
    if set.deny.contains(&Guard::DenyAnonymous) && subject.is_none() {
        return Ok(AccessScope::deny_all());
    }

    let mut constraints = Vec::new();
    for rule in set.allow {
        compile_rule(index, *rule, subject, kind, set, &mut constraints).await?;
    }
    Ok(AccessScope::from_constraints(constraints))
}

async fn compile_rule(
    index: &dyn RelationshipIndex,
    rule: Rule,
    subject: Option<Uuid>,
    kind: ResourceKind,
    set: &RuleSet,
    constraints: &mut Vec<ScopeConstraint>,
) -> Result<(), PolicyError> {
    match rule {
        Rule::PublicRow => {
            let mut filters = vec![ScopeFilter::eq(
                RowProperty::Visibility,
                Visibility::Public.as_str(),
            )];
            if kind == ResourceKind::Assignment {
                filters.push(ScopeFilter::eq(
                    RowProperty::PublishStatus,
                    PublishStatus::Published.as_str(),
                ));
            }
            constraints.push(ScopeConstraint::new(filters));
            Ok(())
        }
        // Every other path requires a subject; without one the rule simply
        // contributes nothing.
        _ => match subject {
            Some(subject) => {
                compile_subject_rule(index, rule, subject, kind, set, constraints).await
            }
            None => Ok(()),
        },
    }
}

async fn compile_subject_rule(
    index: &dyn RelationshipIndex,
    rule: Rule,
    subject: Uuid,
    kind: ResourceKind,
    set: &RuleSet,
    constraints: &mut Vec<ScopeConstraint>,
) -> Result<(), PolicyError> {
    match rule {
        Rule::Owner => {
            constraints.push(ScopeConstraint::new(vec![ScopeFilter::eq(
                RowProperty::Owner,
                subject,
            )]));
        }
        Rule::AcceptedMatchWithOwner => {
            let mut peers = index.accepted_peer_ids(subject).await?;
            // Blocked-pair denial is a scope subtraction here: blocked
            // peers never enter the IN set.
            if set.deny.contains(&Guard::DenyBlockedPair) {
                let blocked = index.blocked_peer_ids(subject).await?;
                peers.retain(|peer| !blocked.contains(peer));
            }
            if !peers.is_empty() {
                constraints.push(ScopeConstraint::new(vec![ScopeFilter::in_uuids(
                    RowProperty::Owner,
                    peers,
                )]));
            }
        }
        Rule::ConversationParticipant => {
            let ids = index.participant_conversation_ids(subject).await?;
            if !ids.is_empty() {
                let property = if kind == ResourceKind::Conversation {
                    RowProperty::ResourceId
                } else {
                    RowProperty::Conversation
                };
                constraints.push(ScopeConstraint::new(vec![ScopeFilter::in_uuids(
                    property, ids,
                )]));
            }
        }
        Rule::ActiveOrgMember => {
            let orgs = index.active_org_ids(subject).await?;
            if !orgs.is_empty() {
                constraints.push(ScopeConstraint::new(vec![ScopeFilter::in_uuids(
                    RowProperty::Org,
                    orgs,
                )]));
            }
        }
        Rule::OrgRoleAtLeast(min) => {
            let orgs = match min {
                OrgRole::Member => index.active_org_ids(subject).await?,
                OrgRole::Admin => index.admin_org_ids(subject).await?,
                // No enumeration for owner-gated listings; fail closed.
                OrgRole::Owner => Vec::new(),
            };
            if !orgs.is_empty() {
                constraints.push(ScopeConstraint::new(vec![ScopeFilter::in_uuids(
                    RowProperty::Org,
                    orgs,
                )]));
            }
        }
        Rule::BlockListOwner => {
            constraints.push(ScopeConstraint::new(vec![ScopeFilter::eq(
                RowProperty::Blocker,
                subject,
            )]));
        }
        Rule::MatchParty => {
            constraints.push(ScopeConstraint::new(vec![ScopeFilter::eq(
                RowProperty::Seeker,
                subject,
            )]));
            constraints.push(ScopeConstraint::new(vec![ScopeFilter::eq(
                RowProperty::Poster,
                subject,
            )]));
        }
        // Handled by the caller before the subject dispatch.
        Rule::PublicRow => {}
    }
    Ok(())
}
