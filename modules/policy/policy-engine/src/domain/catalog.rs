//! The policy catalog: one rule set per (resource kind, action) pair.
//!
//! The catalog is a closed, static table. Adding a resource kind without
//! deciding its rules is a compile error, not a runtime surprise; the two
//! pairs deliberately left out (`BlockedUser.Update`, `OrgInvitation.Update`)
//! take the misconfiguration path, which denies and raises an alert.

use policy_sdk::{Action, OrgRole, ResourceKind};

/// Audit name recorded when a service-role principal bypasses the catalog.
pub(crate) const SERVICE_ROLE_RULE: &str = "service_role_bypass";

/// A named allow predicate.
///
/// Each rule resolves its target from the row facts for existing rows, or
/// from the declared [`policy_sdk::EvaluationContext`] on `Insert`, where
/// the row does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    /// Subject owns the row (or declares itself owner of the row to create).
    Owner,
    /// Row is publicly visible; assignments must additionally be published.
    PublicRow,
    /// Subject shares an accepted match with the row owner (or the declared
    /// peer, on create).
    AcceptedMatchWithOwner,
    /// Subject is a participant of the referenced conversation.
    ConversationParticipant,
    /// Subject holds any active membership in the row's organization.
    ActiveOrgMember,
    /// Subject's active role in the row's organization is at least this.
    OrgRoleAtLeast(OrgRole),
    /// Subject is the blocking side of the block row.
    BlockListOwner,
    /// Subject is the seeker or poster of the match row.
    MatchParty,
}

impl Rule {
    /// Stable rule name recorded in allow audit records.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::PublicRow => "public_row",
            Self::AcceptedMatchWithOwner => "accepted_match_with_owner",
            Self::ConversationParticipant => "conversation_participant",
            Self::ActiveOrgMember => "active_org_member",
            Self::OrgRoleAtLeast(OrgRole::Member) => "org_role_at_least_member",
            Self::OrgRoleAtLeast(OrgRole::Admin) => "org_role_at_least_admin",
            Self::OrgRoleAtLeast(OrgRole::Owner) => "org_role_at_least_owner",
            Self::BlockListOwner => "block_list_owner",
            Self::MatchParty => "match_party",
        }
    }
}

/// A named deny predicate, evaluated before any allow rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    /// The operation requires an authenticated subject.
    DenyAnonymous,
    /// A block between the subject and the counterparty refuses the
    /// interaction, whichever side created it.
    DenyBlockedPair,
    /// A conversation update must not lower the disclosure stage.
    DenyStageRegression,
    /// The last owner of an organization cannot be removed.
    DenySoleOwnerRemoval,
}

/// How a rule set combines its predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CombiningStrategy {
    /// Deny predicates run first; any hit denies regardless of allows.
    DenyOverrides,
    /// No deny predicates; any allow hit grants, default deny.
    AllowIfAny,
}

/// The catalog entry for one (resource kind, action) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleSet {
    pub strategy: CombiningStrategy,
    pub deny: &'static [Guard],
    pub allow: &'static [Rule],
}

const PUBLIC_OR_OWNER_READ: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::PublicRow, Rule::Owner],
};

const OWNER_ONLY: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::Owner],
};

const MATCHING_PROFILE_READ: RuleSet = RuleSet {
    strategy: CombiningStrategy::DenyOverrides,
    deny: &[Guard::DenyBlockedPair],
    allow: &[Rule::Owner, Rule::AcceptedMatchWithOwner],
};

const MATCH_PARTY_ONLY: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::MatchParty],
};

/// Configured with no allow path: only the service-role bypass reaches
/// these writes. An ordinary deny, never the misconfiguration alert.
const SYSTEM_ONLY: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[],
};

const CONVERSATION_READ: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::ConversationParticipant],
};

const CONVERSATION_OPEN: RuleSet = RuleSet {
    strategy: CombiningStrategy::DenyOverrides,
    deny: &[Guard::DenyBlockedPair],
    allow: &[Rule::AcceptedMatchWithOwner],
};

const CONVERSATION_STAGE_UPDATE: RuleSet = RuleSet {
    strategy: CombiningStrategy::DenyOverrides,
    deny: &[Guard::DenyStageRegression],
    allow: &[Rule::ConversationParticipant],
};

const MESSAGE_SEND: RuleSet = RuleSet {
    strategy: CombiningStrategy::DenyOverrides,
    deny: &[Guard::DenyBlockedPair],
    allow: &[Rule::ConversationParticipant],
};

const ORG_MEMBER_READ: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::ActiveOrgMember],
};

const ORG_ADMIN_WRITE: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::OrgRoleAtLeast(OrgRole::Admin)],
};

const ORG_MEMBER_REMOVE: RuleSet = RuleSet {
    strategy: CombiningStrategy::DenyOverrides,
    deny: &[Guard::DenySoleOwnerRemoval],
    allow: &[Rule::OrgRoleAtLeast(OrgRole::Admin)],
};

const ANALYTICS_OWNER_ONLY: RuleSet = RuleSet {
    strategy: CombiningStrategy::DenyOverrides,
    deny: &[Guard::DenyAnonymous],
    allow: &[Rule::Owner],
};

const BLOCK_LIST_OWNER: RuleSet = RuleSet {
    strategy: CombiningStrategy::AllowIfAny,
    deny: &[],
    allow: &[Rule::BlockListOwner],
};

/// Look up the catalog entry for a (kind, action) pair.
///
/// `None` is the misconfiguration case: the evaluator denies it with
/// `policy_misconfigured` and raises an alert. The match is exhaustive on
/// purpose; extending [`ResourceKind`] forces every pair to be decided here.
pub(crate) fn rule_set(kind: ResourceKind, action: Action) -> Option<&'static RuleSet> {
    match (kind, action) {
        (
            ResourceKind::Profile
            | ResourceKind::IndividualProfile
            | ResourceKind::Skill
            | ResourceKind::Assignment,
            Action::Select,
        ) => Some(&PUBLIC_OR_OWNER_READ),
        (
            ResourceKind::Profile
            | ResourceKind::IndividualProfile
            | ResourceKind::Skill
            | ResourceKind::Assignment
            | ResourceKind::MatchingProfile,
            Action::Insert | Action::Update | Action::Delete,
        )
        | (
            ResourceKind::VerificationRequest,
            Action::Select | Action::Insert | Action::Delete,
        )
        | (ResourceKind::BlockedUser, Action::Insert) => Some(&OWNER_ONLY),
        (ResourceKind::MatchingProfile, Action::Select) => Some(&MATCHING_PROFILE_READ),
        (ResourceKind::Match, Action::Select | Action::Update) => Some(&MATCH_PARTY_ONLY),
        (ResourceKind::Match, Action::Insert | Action::Delete)
        | (ResourceKind::Conversation, Action::Delete)
        | (ResourceKind::Message, Action::Update | Action::Delete)
        | (ResourceKind::VerificationRequest, Action::Update) => Some(&SYSTEM_ONLY),
        (ResourceKind::Conversation | ResourceKind::Message, Action::Select) => {
            Some(&CONVERSATION_READ)
        }
        (ResourceKind::Conversation, Action::Insert) => Some(&CONVERSATION_OPEN),
        (ResourceKind::Conversation, Action::Update) => Some(&CONVERSATION_STAGE_UPDATE),
        (ResourceKind::Message, Action::Insert) => Some(&MESSAGE_SEND),
        (ResourceKind::OrganizationMember, Action::Select) => Some(&ORG_MEMBER_READ),
        (ResourceKind::OrganizationMember, Action::Insert | Action::Update)
        | (
            ResourceKind::OrgInvitation,
            Action::Select | Action::Insert | Action::Delete,
        ) => Some(&ORG_ADMIN_WRITE),
        (ResourceKind::OrganizationMember, Action::Delete) => Some(&ORG_MEMBER_REMOVE),
        (ResourceKind::BlockedUser, Action::Select | Action::Delete) => Some(&BLOCK_LIST_OWNER),
        (ResourceKind::AnalyticsEvent, _) => Some(&ANALYTICS_OWNER_ONLY),
        (ResourceKind::BlockedUser | ResourceKind::OrgInvitation, Action::Update) => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn only_two_pairs_are_unconfigured() {
        let mut missing = Vec::new();
        for kind in ResourceKind::all() {
            for action in Action::all() {
                if rule_set(*kind, *action).is_none() {
                    missing.push((*kind, *action));
                }
            }
        }
        assert_eq!(
            missing,
            vec![
                (ResourceKind::BlockedUser, Action::Update),
                (ResourceKind::OrgInvitation, Action::Update),
            ]
        );
    }

    #[test]
    fn deny_overrides_entries_always_carry_guards() {
        for kind in ResourceKind::all() {
            for action in Action::all() {
                if let Some(set) = rule_set(*kind, *action) {
                    match set.strategy {
                        CombiningStrategy::DenyOverrides => {
                            assert!(!set.deny.is_empty(), "{kind:?}.{action:?}");
                        }
                        CombiningStrategy::AllowIfAny => {
                            assert!(set.deny.is_empty(), "{kind:?}.{action:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn assignment_read_goes_through_the_publish_gate() {
        let set = rule_set(ResourceKind::Assignment, Action::Select).unwrap();
        assert_eq!(set.allow, &[Rule::PublicRow, Rule::Owner]);
    }

    #[test]
    fn analytics_denies_anonymous_on_every_action() {
        for action in Action::all() {
            let set = rule_set(ResourceKind::AnalyticsEvent, *action).unwrap();
            assert_eq!(set.deny, &[Guard::DenyAnonymous]);
            assert_eq!(set.allow, &[Rule::Owner]);
        }
    }

    #[test]
    fn match_rows_cannot_be_created_by_principals() {
        let set = rule_set(ResourceKind::Match, Action::Insert).unwrap();
        assert!(set.allow.is_empty());
        assert!(set.deny.is_empty());
    }

    #[test]
    fn sole_owner_guard_sits_on_membership_removal() {
        let set = rule_set(ResourceKind::OrganizationMember, Action::Delete).unwrap();
        assert_eq!(set.deny, &[Guard::DenySoleOwnerRemoval]);
        assert_eq!(set.allow, &[Rule::OrgRoleAtLeast(OrgRole::Admin)]);
    }

    #[test]
    fn rule_names_are_stable() {
        assert_eq!(Rule::Owner.name(), "owner");
        assert_eq!(
            Rule::OrgRoleAtLeast(OrgRole::Admin).name(),
            "org_role_at_least_admin"
        );
        assert_eq!(Rule::AcceptedMatchWithOwner.name(), "accepted_match_with_owner");
    }
}
