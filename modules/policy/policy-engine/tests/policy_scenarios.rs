//! End-to-end scenarios at the public surface of the engine.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use policy_engine::{
    Credentials, InMemoryRelationshipStore, MemoryAuditSink, PolicyConfig, PolicyService,
    PrincipalResolver,
};
use policy_sdk::error::{AccessError, PolicyError};
use policy_sdk::{
    Action, AuditOutcome, ConversationStage, EvaluationContext, MatchStatus, MembershipStatus,
    OrgRole, PolicyClient, PublishStatus, RelationshipIndex, RelationshipStore, ResourceFacts,
    ResourceKind, ResourceRef, TokenRecord, VerificationOutcome, Visibility,
};
use trova_security::{Principal, RowProperty};

fn wire(
    store: Arc<InMemoryRelationshipStore>,
) -> (PolicyService, Arc<MemoryAuditSink>) {
    let sink = Arc::new(MemoryAuditSink::new());
    let service = PolicyService::new(store, sink.clone(), PolicyConfig::default());
    (service, sink)
}

/// The draft-to-published walk: Bob cannot see Alice's draft, sees it once
/// published, and Carol's query of Alice's block list is silently empty.
#[tokio::test]
async fn assignment_lifecycle_and_block_list_scenario() {
    let store = Arc::new(InMemoryRelationshipStore::new());
    let resolver = PrincipalResolver::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let carol = Uuid::new_v4();

    let as_alice = resolver.resolve(&Credentials::subject(alice));
    let as_bob = resolver.resolve(&Credentials::subject(bob));
    let as_carol = resolver.resolve(&Credentials::subject(carol));

    let assignment = store.seed_assignment(alice, PublishStatus::Draft, Visibility::Public);
    let (service, sink) = wire(store.clone());
    let row = ResourceRef::row(ResourceKind::Assignment, assignment);

    // Bob queries the draft by id: shaped exactly like a missing row.
    let decision = service
        .evaluate(as_bob, row, Action::Select, EvaluationContext::none())
        .await
        .unwrap();
    assert!(matches!(
        decision.into_row_result().unwrap_err(),
        AccessError::NotFound
    ));

    // Alice publishes; Bob queries again and gets the row.
    let decision = service
        .evaluate(as_alice, row, Action::Update, EvaluationContext::none())
        .await
        .unwrap();
    assert!(decision.is_allowed());
    store.set_assignment_status(assignment, PublishStatus::Published);

    let decision = service
        .evaluate(as_bob, row, Action::Select, EvaluationContext::none())
        .await
        .unwrap();
    assert!(decision.is_allowed());

    // Alice blocks Bob; Carol queries Alice's block list and gets an empty
    // result, not an error.
    store.seed_block(alice, bob);
    let scope = service
        .access_scope(as_carol, ResourceKind::BlockedUser)
        .await
        .unwrap();
    assert!(scope.contains_uuid(RowProperty::Blocker, carol));
    assert!(!scope.contains_uuid(RowProperty::Blocker, alice));

    // The whole walk is on the audit trail.
    let records = sink.export();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].outcome, AuditOutcome::Denied);
    assert_eq!(records[3].outcome, AuditOutcome::Filtered);
}

/// The disclosure walk: matching unlocks conversation and compensation,
/// stage reveal is monotonic, and a block takes effect on the next request.
#[tokio::test]
async fn match_conversation_and_block_walk() {
    let store = Arc::new(InMemoryRelationshipStore::new());
    let seeker = Uuid::new_v4();
    let poster = Uuid::new_v4();
    let as_seeker = Principal::authenticated(seeker);
    let as_poster = Principal::authenticated(poster);

    let comp_profile = store.seed_matching_profile(poster);
    let match_id = store.seed_match(seeker, poster, MatchStatus::Pending);
    let (service, _) = wire(store.clone());
    let comp_row = ResourceRef::row(ResourceKind::MatchingProfile, comp_profile);

    // Pending match: compensation stays hidden.
    let decision = service
        .evaluate(as_seeker, comp_row, Action::Select, EvaluationContext::none())
        .await
        .unwrap();
    assert!(!decision.is_allowed());

    // Acceptance unlocks it on the very next read.
    store.set_match_status(match_id, MatchStatus::Accepted);
    let decision = service
        .evaluate(as_seeker, comp_row, Action::Select, EvaluationContext::none())
        .await
        .unwrap();
    assert!(decision.is_allowed());

    // Open the conversation, exchange a message, reveal.
    let open = service
        .evaluate(
            as_seeker,
            ResourceRef::collection(ResourceKind::Conversation),
            Action::Insert,
            EvaluationContext::none().with_peer(poster),
        )
        .await
        .unwrap();
    assert!(open.is_allowed());
    let conversation = store.seed_conversation(seeker, poster, ConversationStage::Masked);

    let stage = service
        .advance_conversation_stage(as_poster, conversation, ConversationStage::Revealed)
        .await
        .unwrap();
    assert_eq!(stage, ConversationStage::Revealed);

    // The poster blocks the seeker mid-conversation: message sending stops
    // immediately, in both directions.
    store.seed_block(poster, seeker);
    for principal in [as_seeker, as_poster] {
        let decision = service
            .evaluate(
                principal,
                ResourceRef::collection(ResourceKind::Message),
                Action::Insert,
                EvaluationContext::none().with_conversation(conversation),
            )
            .await
            .unwrap();
        assert!(!decision.is_allowed());
    }
}

/// Org visibility walk with the resolver: a member lists memberships of
/// their own org only, and the service role sees everything.
#[tokio::test]
async fn org_scoping_and_service_bypass() {
    let store = Arc::new(InMemoryRelationshipStore::new());
    let resolver = PrincipalResolver::new();
    let member = Uuid::new_v4();
    let org = Uuid::new_v4();
    let other_org = Uuid::new_v4();
    store.seed_membership(member, org, OrgRole::Member, MembershipStatus::Active);
    let (service, sink) = wire(store);

    let scope = service
        .access_scope(
            resolver.resolve(&Credentials::subject(member)),
            ResourceKind::OrganizationMember,
        )
        .await
        .unwrap();
    assert!(scope.contains_uuid(RowProperty::Org, org));
    assert!(!scope.contains_uuid(RowProperty::Org, other_org));

    let scope = service
        .access_scope(
            resolver.resolve(&Credentials::service()),
            ResourceKind::OrganizationMember,
        )
        .await
        .unwrap();
    assert!(scope.is_unconstrained());
    assert!(sink.export().iter().any(|record| record.privileged));
}

/// A store whose row lookups stall longer than the decision deadline.
struct StalledStore {
    inner: InMemoryRelationshipStore,
}

#[async_trait]
impl RelationshipIndex for StalledStore {
    async fn resource_facts(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceFacts>, PolicyError> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        self.inner.resource_facts(kind, id).await
    }

    async fn has_accepted_match(&self, a: Uuid, b: Uuid) -> Result<bool, PolicyError> {
        self.inner.has_accepted_match(a, b).await
    }

    async fn is_conversation_participant(
        &self,
        subject_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<bool, PolicyError> {
        self.inner
            .is_conversation_participant(subject_id, conversation_id)
            .await
    }

    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> Result<bool, PolicyError> {
        self.inner.is_blocked_pair(a, b).await
    }

    async fn org_role(
        &self,
        subject_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<OrgRole>, PolicyError> {
        self.inner.org_role(subject_id, org_id).await
    }

    async fn org_owner_count(&self, org_id: Uuid) -> Result<usize, PolicyError> {
        self.inner.org_owner_count(org_id).await
    }

    async fn accepted_peer_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        self.inner.accepted_peer_ids(subject_id).await
    }

    async fn blocked_peer_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        self.inner.blocked_peer_ids(subject_id).await
    }

    async fn participant_conversation_ids(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<Uuid>, PolicyError> {
        self.inner.participant_conversation_ids(subject_id).await
    }

    async fn active_org_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        self.inner.active_org_ids(subject_id).await
    }

    async fn admin_org_ids(&self, subject_id: Uuid) -> Result<Vec<Uuid>, PolicyError> {
        self.inner.admin_org_ids(subject_id).await
    }

    async fn token_lookup(
        &self,
        token: &SecretString,
    ) -> Result<Option<TokenRecord>, PolicyError> {
        self.inner.token_lookup(token).await
    }
}

#[async_trait]
impl RelationshipStore for StalledStore {
    async fn advance_conversation_stage(
        &self,
        conversation_id: Uuid,
        requested: ConversationStage,
    ) -> Result<ConversationStage, PolicyError> {
        self.inner
            .advance_conversation_stage(conversation_id, requested)
            .await
    }

    async fn settle_verification(
        &self,
        token_id: Uuid,
        outcome: VerificationOutcome,
    ) -> Result<bool, PolicyError> {
        self.inner.settle_verification(token_id, outcome).await
    }

    async fn insert_verification(&self, record: TokenRecord) -> Result<(), PolicyError> {
        self.inner.insert_verification(record).await
    }
}

/// A stalled index elapses the deadline; callers get a timeout error they
/// must treat as deny, never an allow.
#[tokio::test(start_paused = true)]
async fn evaluation_fails_closed_on_timeout() {
    let inner = InMemoryRelationshipStore::new();
    let owner = Uuid::new_v4();
    let profile = inner.seed_profile(owner, Visibility::Public);
    let store = Arc::new(StalledStore { inner });
    let service = PolicyService::new(
        store,
        Arc::new(MemoryAuditSink::new()),
        PolicyConfig::default(),
    );

    let err = service
        .evaluate(
            Principal::authenticated(owner),
            ResourceRef::row(ResourceKind::Profile, profile),
            Action::Select,
            EvaluationContext::none(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::Timeout(250)));

    // Collapsed for single-row callers, a timeout reads as forbidden.
    let err: AccessError = err.into();
    assert!(matches!(err, AccessError::Forbidden));
}
