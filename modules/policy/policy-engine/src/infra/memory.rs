//! In-memory relationship store.
//!
//! The reference implementation of the [`RelationshipIndex`] and
//! [`RelationshipStore`] contracts, backing tests and embedders without a
//! relational store. All state lives behind one lock, so every lookup in an
//! evaluation reads one consistent snapshot and the two conditional writes
//! are atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::SecretString;
use uuid::Uuid;

use policy_sdk::error::PolicyError;
use policy_sdk::{
    ConversationStage, MatchStatus, MembershipStatus, OrgRole, PublishStatus, RelationshipIndex,
    RelationshipStore, ResourceFacts, ResourceKind, TokenRecord, VerificationOutcome,
    VerificationStatus, Visibility,
};

use crate::domain::token::constant_time_token_eq;

#[derive(Debug, Clone)]
struct MatchRow {
    seeker_id: Uuid,
    poster_id: Uuid,
    status: MatchStatus,
}

#[derive(Debug, Clone)]
struct ConversationRow {
    participant_one_id: Uuid,
    participant_two_id: Uuid,
    stage: ConversationStage,
}

#[derive(Debug, Clone)]
struct MembershipRow {
    member_id: Uuid,
    user_id: Uuid,
    org_id: Uuid,
    role: OrgRole,
    status: MembershipStatus,
}

#[derive(Default)]
struct State {
    // Plainly owned rows, keyed by kind so ids cannot collide across kinds.
    owned_rows: HashMap<(ResourceKind, Uuid), ResourceFacts>,
    matches: HashMap<Uuid, MatchRow>,
    conversations: HashMap<Uuid, ConversationRow>,
    // message id -> (sender, conversation)
    messages: HashMap<Uuid, (Uuid, Uuid)>,
    memberships: Vec<MembershipRow>,
    // (blocker, blocked) pairs, directional as stored; row id -> pair
    blocks: HashMap<Uuid, (Uuid, Uuid)>,
    verifications: HashMap<Uuid, TokenRecord>,
}

/// Relationship store over process-local maps.
#[derive(Default)]
pub struct InMemoryRelationshipStore {
    state: RwLock<State>,
}

impl InMemoryRelationshipStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_owned(&self, kind: ResourceKind, facts: ResourceFacts) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().owned_rows.insert((kind, id), facts);
        id
    }

    /// Seed a profile row.
    #[must_use]
    pub fn seed_profile(&self, owner_id: Uuid, visibility: Visibility) -> Uuid {
        self.insert_owned(
            ResourceKind::Profile,
            ResourceFacts::owned(owner_id).with_visibility(visibility),
        )
    }

    /// Seed a person-specific profile row.
    #[must_use]
    pub fn seed_individual_profile(&self, owner_id: Uuid, visibility: Visibility) -> Uuid {
        self.insert_owned(
            ResourceKind::IndividualProfile,
            ResourceFacts::owned(owner_id).with_visibility(visibility),
        )
    }

    /// Seed a skill row owned by a profile owner.
    #[must_use]
    pub fn seed_skill(&self, owner_id: Uuid) -> Uuid {
        self.insert_owned(
            ResourceKind::Skill,
            ResourceFacts::owned(owner_id).with_visibility(Visibility::Private),
        )
    }

    /// Seed an assignment row.
    #[must_use]
    pub fn seed_assignment(
        &self,
        owner_id: Uuid,
        status: PublishStatus,
        visibility: Visibility,
    ) -> Uuid {
        self.insert_owned(
            ResourceKind::Assignment,
            ResourceFacts::owned(owner_id)
                .with_visibility(visibility)
                .with_publish_status(status),
        )
    }

    /// Publish or unpublish an existing assignment.
    pub fn set_assignment_status(&self, id: Uuid, status: PublishStatus) {
        if let Some(facts) = self
            .state
            .write()
            .owned_rows
            .get_mut(&(ResourceKind::Assignment, id))
        {
            facts.publish_status = Some(status);
        }
    }

    /// Seed the matchable, compensation-bearing view of a profile.
    #[must_use]
    pub fn seed_matching_profile(&self, owner_id: Uuid) -> Uuid {
        self.insert_owned(ResourceKind::MatchingProfile, ResourceFacts::owned(owner_id))
    }

    /// Seed an analytics event row.
    #[must_use]
    pub fn seed_analytics_event(&self, owner_id: Uuid) -> Uuid {
        self.insert_owned(ResourceKind::AnalyticsEvent, ResourceFacts::owned(owner_id))
    }

    /// Seed an org invitation row.
    #[must_use]
    pub fn seed_invitation(&self, org_id: Uuid) -> Uuid {
        self.insert_owned(
            ResourceKind::OrgInvitation,
            ResourceFacts::default().with_org(org_id),
        )
    }

    /// Seed a match row; returns the match id.
    #[must_use]
    pub fn seed_match(&self, seeker_id: Uuid, poster_id: Uuid, status: MatchStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().matches.insert(
            id,
            MatchRow {
                seeker_id,
                poster_id,
                status,
            },
        );
        id
    }

    /// Move an existing match to a new status.
    pub fn set_match_status(&self, id: Uuid, status: MatchStatus) {
        if let Some(row) = self.state.write().matches.get_mut(&id) {
            row.status = status;
        }
    }

    /// Seed a conversation row; returns the conversation id.
    #[must_use]
    pub fn seed_conversation(&self, one: Uuid, two: Uuid, stage: ConversationStage) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().conversations.insert(
            id,
            ConversationRow {
                participant_one_id: one,
                participant_two_id: two,
                stage,
            },
        );
        id
    }

    /// Seed a message row inside a conversation; returns the message id.
    #[must_use]
    pub fn seed_message(&self, sender_id: Uuid, conversation_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.state
            .write()
            .messages
            .insert(id, (sender_id, conversation_id));
        id
    }

    /// Seed an organization membership row; returns the membership row id.
    #[must_use]
    pub fn seed_membership(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        role: OrgRole,
        status: MembershipStatus,
    ) -> Uuid {
        let member_id = Uuid::new_v4();
        self.state.write().memberships.push(MembershipRow {
            member_id,
            user_id,
            org_id,
            role,
            status,
        });
        member_id
    }

    /// Seed one direction of a block relationship; returns the row id.
    #[must_use]
    pub fn seed_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().blocks.insert(id, (blocker_id, blocked_id));
        id
    }

    /// Current stage of a conversation, for test assertions.
    #[must_use]
    pub fn conversation_stage(&self, id: Uuid) -> Option<ConversationStage> {
        self.state.read().conversations.get(&id).map(|c| c.stage)
    }

    /// Current status of a verification request, for test assertions.
    #[must_use]
    pub fn verification_status(&self, id: Uuid) -> Option<VerificationStatus> {
        self.state.read().verifications.get(&id).map(|v| v.status)
    }
}

#[async_trait]
impl RelationshipIndex for InMemoryRelationshipStore {
    async fn resource_facts(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceFacts>, PolicyError> {
        let state = self.state.read();
        let facts = match kind {
            ResourceKind::Match => state.matches.get(&id).map(|row| {
                ResourceFacts::matched(row.seeker_id, row.poster_id, row.status)
            }),
            ResourceKind::Conversation => state.conversations.get(&id).map(|row| {
                ResourceFacts::conversation(
                    row.participant_one_id,
                    row.participant_two_id,
                    row.stage,
                )
            }),
            ResourceKind::Message => state.messages.get(&id).map(|(sender, conversation)| {
                ResourceFacts::owned(*sender).with_conversation(*conversation)
            }),
            ResourceKind::OrganizationMember => state
                .memberships
                .iter()
                .find(|row| row.member_id == id)
                .map(|row| ResourceFacts::membership(row.user_id, row.org_id, row.role)),
            ResourceKind::BlockedUser => state
                .blocks
                .get(&id)
                .map(|(blocker, blocked)| ResourceFacts::block(*blocker, *blocked)),
            ResourceKind::VerificationRequest => state
                .verifications
                .get(&id)
                .map(|record| ResourceFacts::owned(record.claimant_id)),
            _ => state.owned_rows.get(&(kind, id)).cloned(),
        };
        Ok(facts)
    }

    async fn has_accepted_match(&self, a: Uuid, b: Uuid) -> Result<bool, PolicyError> {
        let state = self.state.read();
        Ok(state.matches.values().any(|row| {
            row.status == MatchStatus::Accepted
                && ((row.seeker_id == a && row.poster_id == b)
                    || (row.seeker_id == b && row.poster_id == a))
        }))
    }

    async fn is_conversation_participant(
        &self,
        subject_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<bool, PolicyError> {
        let state = self.state.read();
        Ok(state.conversations.get(&conversation_id).is_some_and(|row| {
            row.participant_one_id == subject_id || row.participant_two_id == subject_id
        }))
    }

    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> Result<bool, PolicyError> {
        let state = self.state.read();
        // Storage is directional; the interaction guarantee is symmetric.
        Ok(state
            .blocks
            .values()
            .any(|&(blocker, blocked)| (blocker, blocked) == (a, b) || (blocker, blocked) == (b, a)))
    }

    async fn org_role(
        &self,
        subject_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<OrgRole>, PolicyError> {
        let state = self.state.read();
        Ok(state
            .memberships
            .iter()
            .find(|row| {
                row.user_id == subject_id
                    && row.org_id == org_id
                    && row.status == MembershipStatus::Active
            })
            .map(|row| row.role))
    }

    async fn org_owner_count(&self, org_id: Uuid) -> Result<usize, PolicyError> {
        let state = self.state.read();
        Ok(state
            .memberships
            .iter()
            .filter(|row| {
                row.org_id == org_id
                    && row.role == OrgRole::Owner
                    && row.status == MembershipStatus::Active
            })
            .count())
    }

    async fn accepted_peer_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        let state = self.state.read();
        Ok(state
            .matches
            .values()
            .filter(|row| row.status == MatchStatus::Accepted)
            .filter_map(|row| {
                if row.seeker_id == subject_id {
                    Some(row.poster_id)
                } else if row.poster_id == subject_id {
                    Some(row.seeker_id)
                } else {
                    None
                }
            })
            .collect())
    }

    async fn blocked_peer_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        let state = self.state.read();
        Ok(state
            .blocks
            .values()
            .filter_map(|&(blocker, blocked)| {
                if blocker == subject_id {
                    Some(blocked)
                } else if blocked == subject_id {
                    Some(blocker)
                } else {
                    None
                }
            })
            .collect())
    }

    async fn participant_conversation_ids(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<Uuid>, PolicyError> {
        let state = self.state.read();
        Ok(state
            .conversations
            .iter()
            .filter(|(_, row)| {
                row.participant_one_id == subject_id || row.participant_two_id == subject_id
            })
            .map(|(id, _)| *id)
            .collect())
    }

    async fn active_org_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        let state = self.state.read();
        Ok(state
            .memberships
            .iter()
            .filter(|row| row.user_id == subject_id && row.status == MembershipStatus::Active)
            .map(|row| row.org_id)
            .collect())
    }

    async fn admin_org_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        let state = self.state.read();
        Ok(state
            .memberships
            .iter()
            .filter(|row| {
                row.user_id == subject_id
                    && row.status == MembershipStatus::Active
                    && row.role >= OrgRole::Admin
            })
            .map(|row| row.org_id)
            .collect())
    }

    async fn token_lookup(
        &self,
        token: &SecretString,
    ) -> Result<Option<TokenRecord>, PolicyError> {
        let state = self.state.read();
        // Scans every record with a constant-time comparison each, so the
        // lookup cost does not depend on how much of a secret matched.
        Ok(state
            .verifications
            .values()
            .find(|record| constant_time_token_eq(token, &record.token))
            .cloned())
    }
}

#[async_trait]
impl RelationshipStore for InMemoryRelationshipStore {
    async fn advance_conversation_stage(
        &self,
        conversation_id: Uuid,
        requested: ConversationStage,
    ) -> Result<ConversationStage, PolicyError> {
        let mut state = self.state.write();
        let row = state
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| PolicyError::Internal("conversation not found".to_owned()))?;
        row.stage = row.stage.max(requested);
        Ok(row.stage)
    }

    async fn settle_verification(
        &self,
        token_id: Uuid,
        outcome: VerificationOutcome,
    ) -> Result<bool, PolicyError> {
        let mut state = self.state.write();
        let record = state
            .verifications
            .get_mut(&token_id)
            .ok_or_else(|| PolicyError::Internal("verification request not found".to_owned()))?;
        if record.status != VerificationStatus::Pending {
            return Ok(false);
        }
        record.status = outcome.into_status();
        Ok(true)
    }

    async fn insert_verification(&self, record: TokenRecord) -> Result<(), PolicyError> {
        self.state.write().verifications.insert(record.id, record);
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn block_pair_is_symmetric_over_directional_rows() {
        let store = InMemoryRelationshipStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.seed_block(a, b);

        assert!(store.is_blocked_pair(a, b).await.unwrap());
        assert!(store.is_blocked_pair(b, a).await.unwrap());
        assert!(!store.is_blocked_pair(a, Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn match_acceptance_is_live_state_not_history() {
        let store = InMemoryRelationshipStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let id = store.seed_match(a, b, MatchStatus::Pending);

        assert!(!store.has_accepted_match(a, b).await.unwrap());
        store.set_match_status(id, MatchStatus::Accepted);
        assert!(store.has_accepted_match(b, a).await.unwrap());
        store.set_match_status(id, MatchStatus::Rejected);
        assert!(!store.has_accepted_match(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn inactive_memberships_yield_no_role() {
        let store = InMemoryRelationshipStore::new();
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        store.seed_membership(user, org, OrgRole::Admin, MembershipStatus::Invited);

        assert_eq!(store.org_role(user, org).await.unwrap(), None);
        assert!(store.active_org_ids(user).await.unwrap().is_empty());

        store.seed_membership(user, org, OrgRole::Admin, MembershipStatus::Active);
        assert_eq!(store.org_role(user, org).await.unwrap(), Some(OrgRole::Admin));
        assert_eq!(store.admin_org_ids(user).await.unwrap(), vec![org]);
    }

    #[tokio::test]
    async fn stage_advance_is_monotonic_and_idempotent() {
        let store = InMemoryRelationshipStore::new();
        let id = store.seed_conversation(Uuid::new_v4(), Uuid::new_v4(), ConversationStage::Masked);

        let stage = store
            .advance_conversation_stage(id, ConversationStage::Revealed)
            .await
            .unwrap();
        assert_eq!(stage, ConversationStage::Revealed);

        // A late request for the lower stage does not regress.
        let stage = store
            .advance_conversation_stage(id, ConversationStage::Masked)
            .await
            .unwrap();
        assert_eq!(stage, ConversationStage::Revealed);
    }

    #[tokio::test]
    async fn settle_verification_is_exactly_once() {
        let store = InMemoryRelationshipStore::new();
        let record = TokenRecord {
            id: Uuid::new_v4(),
            token: SecretString::from("t0ken-t0ken-t0ken-t0ken-t0ken-32"),
            status: VerificationStatus::Pending,
            claim_type: policy_sdk::ClaimType::Employment,
            claimant_id: Uuid::new_v4(),
            claimant_display_name: "Dana Reyes".to_owned(),
            verifier_name: "Acme HR".to_owned(),
            verifier_email: "hr@acme.test".to_owned(),
            expires_at: time::OffsetDateTime::now_utc() + time::Duration::hours(1),
        };
        let id = record.id;
        store.insert_verification(record).await.unwrap();

        assert!(store
            .settle_verification(id, VerificationOutcome::Accepted)
            .await
            .unwrap());
        assert!(!store
            .settle_verification(id, VerificationOutcome::Declined)
            .await
            .unwrap());
        assert_eq!(
            store.verification_status(id),
            Some(VerificationStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn owner_count_ignores_non_owners_and_inactive_rows() {
        let store = InMemoryRelationshipStore::new();
        let org = Uuid::new_v4();
        store.seed_membership(Uuid::new_v4(), org, OrgRole::Owner, MembershipStatus::Active);
        store.seed_membership(Uuid::new_v4(), org, OrgRole::Owner, MembershipStatus::Removed);
        store.seed_membership(Uuid::new_v4(), org, OrgRole::Admin, MembershipStatus::Active);

        assert_eq!(store.org_owner_count(org).await.unwrap(), 1);
    }
}
