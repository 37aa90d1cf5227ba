//! Single-row rule evaluation.
//!
//! Runs one catalog rule set against the facts of one row (or, for
//! `Insert`, against the relational position the caller declared in the
//! [`EvaluationContext`]). Deny guards run first; any hit refuses the
//! operation regardless of allow rules. A row the index cannot find denies
//! exactly like a row the principal may not see.

use uuid::Uuid;

use policy_sdk::{
    Action, Decision, DenyReason, EvaluationContext, OrgRole, PublishStatus, RelationshipIndex,
    ResourceFacts, ResourceKind, ResourceRef, Visibility,
};
use policy_sdk::error::PolicyError;

use super::catalog::{Guard, Rule, RuleSet};

/// Evaluate a rule set for a single row or an insert.
///
/// The caller has already handled the service-role bypass and the
/// collection-read path; `resource.id == None` here means `Insert`.
pub(crate) async fn evaluate_rules(
    index: &dyn RelationshipIndex,
    subject: Option<Uuid>,
    resource: ResourceRef,
    action: Action,
    context: EvaluationContext,
    set: &RuleSet,
) -> Result<Decision, PolicyError> {
    let facts = match resource.id {
        Some(id) => match index.resource_facts(resource.kind, id).await? {
            Some(facts) => Some(facts),
            // Absent and invisible rows produce the same shape.
            None => return Ok(Decision::deny(DenyReason::NotFound)),
        },
        None => None,
    };

    for guard in set.deny {
        if let Some(reason) =
            guard_hit(index, *guard, subject, &resource, &context, facts.as_ref()).await?
        {
            return Ok(Decision::deny(shape_reason(action, &resource, reason)));
        }
    }

    for rule in set.allow {
        if rule_allows(index, *rule, subject, &resource, &context, facts.as_ref()).await? {
            return Ok(Decision::allow(rule.name()));
        }
    }

    let reason = if action.is_write() {
        DenyReason::Forbidden
    } else {
        DenyReason::NotFound
    };
    Ok(Decision::deny(shape_reason(action, &resource, reason)))
}

/// Collapse deny reasons for single-row reads into `not_found`.
///
/// A read denial must not tell the caller anything an absent row would not;
/// the specific codes are reserved for writes, where the caller already
/// named the row.
fn shape_reason(action: Action, resource: &ResourceRef, reason: DenyReason) -> DenyReason {
    if action == Action::Select && resource.id.is_some() {
        DenyReason::NotFound
    } else {
        reason
    }
}

async fn guard_hit(
    index: &dyn RelationshipIndex,
    guard: Guard,
    subject: Option<Uuid>,
    resource: &ResourceRef,
    context: &EvaluationContext,
    facts: Option<&ResourceFacts>,
) -> Result<Option<DenyReason>, PolicyError> {
    match guard {
        Guard::DenyAnonymous => Ok(subject.is_none().then_some(DenyReason::Anonymous)),
        Guard::DenyBlockedPair => {
            let Some(subject) = subject else {
                return Ok(None);
            };
            let Some(peer) = counterparty(index, subject, context, facts).await? else {
                return Ok(None);
            };
            if index.is_blocked_pair(subject, peer).await? {
                Ok(Some(DenyReason::Blocked))
            } else {
                Ok(None)
            }
        }
        Guard::DenyStageRegression => {
            let current = facts.and_then(|f| f.stage);
            match (current, context.requested_stage) {
                (Some(current), Some(requested)) if requested < current => {
                    Ok(Some(DenyReason::StageRegression))
                }
                _ => Ok(None),
            }
        }
        Guard::DenySoleOwnerRemoval => {
            let Some(facts) = facts else {
                return Ok(None);
            };
            if facts.member_role != Some(OrgRole::Owner) {
                return Ok(None);
            }
            let Some(org_id) = facts.org_id else {
                return Ok(None);
            };
            if index.org_owner_count(org_id).await? <= 1 {
                Ok(Some(DenyReason::SoleOwner))
            } else {
                Ok(None)
            }
        }
    }
}

/// The other party of the interaction under evaluation.
///
/// Existing rows carry their counterparty in the facts (the row owner, or
/// the other conversation participant). Inserts resolve it from the declared
/// context: the named peer, or the far side of the named conversation.
async fn counterparty(
    index: &dyn RelationshipIndex,
    subject: Uuid,
    context: &EvaluationContext,
    facts: Option<&ResourceFacts>,
) -> Result<Option<Uuid>, PolicyError> {
    if let Some(facts) = facts {
        if let Some(owner) = facts.owner_id {
            if owner != subject {
                return Ok(Some(owner));
            }
        }
        if let Some(peer) = facts.participant_other_than(subject) {
            return Ok(Some(peer));
        }
        return Ok(None);
    }
    if let Some(peer) = context.peer_id {
        return Ok(Some(peer));
    }
    if let Some(conversation_id) = context.conversation_id {
        let facts = index
            .resource_facts(ResourceKind::Conversation, conversation_id)
            .await?;
        return Ok(facts.and_then(|f| f.participant_other_than(subject)));
    }
    Ok(None)
}

async fn rule_allows(
    index: &dyn RelationshipIndex,
    rule: Rule,
    subject: Option<Uuid>,
    resource: &ResourceRef,
    context: &EvaluationContext,
    facts: Option<&ResourceFacts>,
) -> Result<bool, PolicyError> {
    // PublicRow is the one rule an anonymous principal can satisfy.
    let Some(subject) = subject else {
        return match rule {
            Rule::PublicRow => Ok(public_row(resource.kind, facts)),
            _ => Ok(false),
        };
    };

    match rule {
        Rule::Owner => match facts {
            Some(facts) => Ok(facts.is_owned_by(subject)),
            // Insert: the row does not exist; the declared owner must be
            // the subject itself.
            None => Ok(resource.owner_id == Some(subject)),
        },
        Rule::PublicRow => Ok(public_row(resource.kind, facts)),
        Rule::AcceptedMatchWithOwner => {
            let target = match facts {
                Some(facts) => facts.owner_id,
                None => context.peer_id,
            };
            match target {
                Some(target) if target != subject => {
                    index.has_accepted_match(subject, target).await
                }
                _ => Ok(false),
            }
        }
        Rule::ConversationParticipant => {
            if let Some(facts) = facts {
                if !facts.participants.is_empty() {
                    return Ok(facts.participants.contains(&subject));
                }
                if let Some(conversation_id) = facts.conversation_id {
                    return index
                        .is_conversation_participant(subject, conversation_id)
                        .await;
                }
            }
            match context.conversation_id {
                Some(conversation_id) => {
                    index
                        .is_conversation_participant(subject, conversation_id)
                        .await
                }
                None => Ok(false),
            }
        }
        Rule::ActiveOrgMember => match target_org(context, facts) {
            Some(org_id) => Ok(index.org_role(subject, org_id).await?.is_some()),
            None => Ok(false),
        },
        Rule::OrgRoleAtLeast(min) => match target_org(context, facts) {
            Some(org_id) => Ok(index
                .org_role(subject, org_id)
                .await?
                .is_some_and(|role| role >= min)),
            None => Ok(false),
        },
        Rule::BlockListOwner => {
            Ok(facts.is_some_and(|facts| facts.blocker_id == Some(subject)))
        }
        Rule::MatchParty => Ok(facts.is_some_and(|facts| {
            facts.seeker_id == Some(subject) || facts.poster_id == Some(subject)
        })),
    }
}

/// Whether the row is publicly readable.
///
/// Assignments additionally require the publish gate: a draft stays
/// owner-only no matter what its visibility field says.
fn public_row(kind: ResourceKind, facts: Option<&ResourceFacts>) -> bool {
    let Some(facts) = facts else {
        return false;
    };
    if facts.visibility != Some(Visibility::Public) {
        return false;
    }
    if kind == ResourceKind::Assignment {
        return facts.publish_status == Some(PublishStatus::Published);
    }
    true
}

fn target_org(context: &EvaluationContext, facts: Option<&ResourceFacts>) -> Option<Uuid> {
    facts.and_then(|f| f.org_id).or(context.org_id)
}
