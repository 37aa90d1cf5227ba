use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of the identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// A signed-in user carrying a subject id.
    Authenticated,
    /// No identity at all: public traffic and capability-token flows.
    Anonymous,
    /// A trusted internal process. Never reachable from a public entry point.
    ServiceRole,
}

/// The resolved identity (or lack thereof) making a request.
///
/// Produced by the principal resolver during request admission and carried
/// unchanged through the request lifecycle. The constructors keep kind and
/// subject id consistent: only [`PrincipalKind::Authenticated`] principals
/// have a subject id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    kind: PrincipalKind,
    subject_id: Option<Uuid>,
}

impl Principal {
    /// A signed-in user.
    #[must_use]
    pub fn authenticated(subject_id: Uuid) -> Self {
        Self {
            kind: PrincipalKind::Authenticated,
            subject_id: Some(subject_id),
        }
    }

    /// Public, unauthenticated traffic.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            kind: PrincipalKind::Anonymous,
            subject_id: None,
        }
    }

    /// A trusted internal process that bypasses policy evaluation.
    #[must_use]
    pub fn service_role() -> Self {
        Self {
            kind: PrincipalKind::ServiceRole,
            subject_id: None,
        }
    }

    /// The identity classification.
    #[must_use]
    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// The subject id, present only for authenticated principals.
    #[must_use]
    pub fn subject_id(&self) -> Option<Uuid> {
        self.subject_id
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.kind == PrincipalKind::Authenticated
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.kind == PrincipalKind::Anonymous
    }

    #[must_use]
    pub fn is_service_role(&self) -> bool {
        self.kind == PrincipalKind::ServiceRole
    }
}
