//! Row facts consulted during single-row evaluation.

use uuid::Uuid;

use crate::models::{ConversationStage, MatchStatus, OrgRole, PublishStatus, Visibility};

/// The policy-relevant snapshot of one stored row.
///
/// Produced by the relationship index for exactly the row under evaluation,
/// inside the same logical read as the other relationship lookups. Fields
/// are optional because each resource kind populates only the ones it has;
/// a gate that needs an absent fact treats the row as not satisfying it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFacts {
    /// Owning subject. For indirectly owned rows (a profile card, a message)
    /// this is already resolved to the root owner.
    pub owner_id: Option<Uuid>,
    /// Row visibility, where the kind has one.
    pub visibility: Option<Visibility>,
    /// Publish lifecycle, for assignments.
    pub publish_status: Option<PublishStatus>,
    /// Containing conversation, for messages.
    pub conversation_id: Option<Uuid>,
    /// Containing organization, for memberships and invitations.
    pub org_id: Option<Uuid>,
    /// Role recorded on a membership row.
    pub member_role: Option<OrgRole>,
    /// Blocking side of a block row.
    pub blocker_id: Option<Uuid>,
    /// Blocked side of a block row.
    pub blocked_id: Option<Uuid>,
    /// Seeker party of a match row.
    pub seeker_id: Option<Uuid>,
    /// Poster party of a match row.
    pub poster_id: Option<Uuid>,
    /// Match lifecycle, for match rows.
    pub match_status: Option<MatchStatus>,
    /// Disclosure stage, for conversation rows.
    pub stage: Option<ConversationStage>,
    /// Both parties of a conversation row.
    pub participants: Vec<Uuid>,
}

impl ResourceFacts {
    /// Facts for a plainly owned row (profile, skill, assignment, event).
    #[must_use]
    pub fn owned(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    /// Set the visibility fact.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Set the publish lifecycle fact.
    #[must_use]
    pub fn with_publish_status(mut self, status: PublishStatus) -> Self {
        self.publish_status = Some(status);
        self
    }

    /// Set the containing conversation fact.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Set the containing organization fact.
    #[must_use]
    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Facts for an organization membership row.
    #[must_use]
    pub fn membership(user_id: Uuid, org_id: Uuid, role: OrgRole) -> Self {
        Self {
            owner_id: Some(user_id),
            org_id: Some(org_id),
            member_role: Some(role),
            ..Self::default()
        }
    }

    /// Facts for one direction of a block relationship.
    #[must_use]
    pub fn block(blocker_id: Uuid, blocked_id: Uuid) -> Self {
        Self {
            blocker_id: Some(blocker_id),
            blocked_id: Some(blocked_id),
            ..Self::default()
        }
    }

    /// Facts for a match row.
    #[must_use]
    pub fn matched(seeker_id: Uuid, poster_id: Uuid, status: MatchStatus) -> Self {
        Self {
            seeker_id: Some(seeker_id),
            poster_id: Some(poster_id),
            match_status: Some(status),
            ..Self::default()
        }
    }

    /// Facts for a conversation row.
    #[must_use]
    pub fn conversation(
        participant_one: Uuid,
        participant_two: Uuid,
        stage: ConversationStage,
    ) -> Self {
        Self {
            stage: Some(stage),
            participants: vec![participant_one, participant_two],
            ..Self::default()
        }
    }

    /// The conversation participant other than `subject_id`, if any.
    #[must_use]
    pub fn participant_other_than(&self, subject_id: Uuid) -> Option<Uuid> {
        self.participants
            .iter()
            .copied()
            .find(|p| *p != subject_id)
    }

    /// Returns `true` if `subject_id` is the resolved owner.
    #[must_use]
    pub fn is_owned_by(&self, subject_id: Uuid) -> bool {
        self.owner_id == Some(subject_id)
    }
}
