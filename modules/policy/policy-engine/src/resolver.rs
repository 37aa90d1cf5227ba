//! Principal resolution from upstream-verified credentials.

use serde::Deserialize;
use uuid::Uuid;

use trova_security::Principal;

/// What the external authentication layer hands over per request.
///
/// Identity proofing happened upstream: a present `subject_id` is already
/// verified, and `service` is set only by trusted internal wiring.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    /// Verified subject of a signed-in user.
    pub subject_id: Option<Uuid>,
    /// Trusted internal process flag.
    pub service: bool,
}

impl Credentials {
    /// Credentials of a signed-in user.
    #[must_use]
    pub fn subject(subject_id: Uuid) -> Self {
        Self {
            subject_id: Some(subject_id),
            service: false,
        }
    }

    /// Credentials of a trusted internal process.
    #[must_use]
    pub fn service() -> Self {
        Self {
            subject_id: None,
            service: true,
        }
    }
}

/// Turns [`Credentials`] into a [`Principal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalResolver;

impl PrincipalResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve credentials to the principal evaluation runs under.
    ///
    /// A subject id always wins: a credential carrying both a subject and
    /// the service flag resolves to `Authenticated`, so the policy bypass
    /// cannot be smuggled in through a user-facing token.
    #[must_use]
    #[allow(clippy::unused_self)] // &self reserved for future trust config
    pub fn resolve(&self, credentials: &Credentials) -> Principal {
        match (credentials.subject_id, credentials.service) {
            (Some(subject_id), _) => {
                if credentials.service {
                    tracing::warn!(
                        subject_id = %subject_id,
                        "Service flag alongside a subject id; resolving as authenticated"
                    );
                }
                Principal::authenticated(subject_id)
            }
            (None, true) => Principal::service_role(),
            (None, false) => Principal::anonymous(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn subject_credentials_resolve_to_authenticated() {
        let subject = Uuid::new_v4();
        let principal = PrincipalResolver::new().resolve(&Credentials::subject(subject));
        assert!(principal.is_authenticated());
        assert_eq!(principal.subject_id(), Some(subject));
    }

    #[test]
    fn service_credentials_resolve_to_service_role() {
        let principal = PrincipalResolver::new().resolve(&Credentials::service());
        assert!(principal.is_service_role());
    }

    #[test]
    fn empty_credentials_resolve_to_anonymous() {
        let principal = PrincipalResolver::new().resolve(&Credentials::default());
        assert!(principal.is_anonymous());
    }

    #[test]
    fn subject_wins_over_the_service_flag() {
        let subject = Uuid::new_v4();
        let credentials = Credentials {
            subject_id: Some(subject),
            service: true,
        };
        let principal = PrincipalResolver::new().resolve(&credentials);
        assert!(principal.is_authenticated());
        assert!(!principal.is_service_role());
    }
}
