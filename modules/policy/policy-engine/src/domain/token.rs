//! Token-scoped guest access to verification requests.
//!
//! The one flow that runs without a [`Principal`]: possession of the exact
//! token string is the capability. The resolver compares tokens in constant
//! time, fails closed on expiry or a settled status with one generic error,
//! and settles each request at most once through a conditional update.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use uuid::Uuid;

use policy_sdk::error::TokenError;
use policy_sdk::{
    IssuedToken, RelationshipStore, TokenAccessResolver, TokenIssueRequest, TokenRecord,
    VerificationOutcome, VerificationStatus, VerifierView,
};
use trova_security::Principal;

use crate::config::PolicyConfig;

/// Length of generated verification tokens.
const TOKEN_LEN: usize = 32;

/// [`TokenAccessResolver`] over a relationship store.
pub struct TokenService {
    store: Arc<dyn RelationshipStore>,
    config: PolicyConfig,
}

impl TokenService {
    #[must_use]
    pub fn new(store: Arc<dyn RelationshipStore>, config: PolicyConfig) -> Self {
        Self { store, config }
    }

    /// Resolve a presented token to its record, or refuse generically.
    ///
    /// Unknown, expired and settled tokens all come back as
    /// [`TokenError::Invalid`]; a probing caller learns nothing about which.
    async fn lookup_valid(&self, token: &SecretString) -> Result<TokenRecord, TokenError> {
        let record = self
            .store
            .token_lookup(token)
            .await?
            .ok_or(TokenError::Invalid)?;
        if !constant_time_token_eq(token, &record.token) {
            return Err(TokenError::Invalid);
        }
        if record.status != VerificationStatus::Pending {
            return Err(TokenError::Invalid);
        }
        if OffsetDateTime::now_utc() >= record.expires_at {
            return Err(TokenError::Invalid);
        }
        Ok(record)
    }
}

#[async_trait]
impl TokenAccessResolver for TokenService {
    #[tracing::instrument(skip_all)]
    async fn issue(
        &self,
        principal: Principal,
        request: TokenIssueRequest,
    ) -> Result<IssuedToken, TokenError> {
        let claimant_id = principal.subject_id().ok_or(TokenError::Invalid)?;

        let secret = generate_token();
        let id = Uuid::new_v4();
        let ttl = request.ttl.unwrap_or_else(|| self.config.token_ttl());
        let expires_at = OffsetDateTime::now_utc() + ttl;
        self.store
            .insert_verification(TokenRecord {
                id,
                token: SecretString::from(secret.clone()),
                status: VerificationStatus::Pending,
                claim_type: request.claim_type,
                claimant_id,
                claimant_display_name: request.claimant_display_name,
                verifier_name: request.verifier_name,
                verifier_email: request.verifier_email,
                expires_at,
            })
            .await?;
        tracing::info!(request_id = %id, "Issued verification token");

        Ok(IssuedToken {
            id,
            token: SecretString::from(secret),
            expires_at,
        })
    }

    async fn resolve(&self, token: &SecretString) -> Result<VerifierView, TokenError> {
        let record = self.lookup_valid(token).await?;
        Ok(VerifierView {
            claim_type: record.claim_type,
            claimant_display_name: record.claimant_display_name,
            verifier_name: record.verifier_name,
            expires_at: record.expires_at,
        })
    }

    #[tracing::instrument(skip_all)]
    async fn respond(
        &self,
        token: &SecretString,
        outcome: VerificationOutcome,
    ) -> Result<(), TokenError> {
        let record = self.lookup_valid(token).await?;
        // Conditional settle: a concurrent or repeated submission loses the
        // race and is refused, not repeated.
        let settled = self.store.settle_verification(record.id, outcome).await?;
        if !settled {
            return Err(TokenError::Invalid);
        }
        tracing::info!(request_id = %record.id, outcome = outcome.as_str(), "Verification settled");
        Ok(())
    }
}

/// Constant-time equality over the two token strings.
///
/// Length is compared first; `ct_eq` requires equal-length inputs, and the
/// generated token length is public anyway.
pub(crate) fn constant_time_token_eq(presented: &SecretString, stored: &SecretString) -> bool {
    let presented = presented.expose_secret().as_bytes();
    let stored = stored.expose_secret().as_bytes();
    presented.len() == stored.len() && bool::from(presented.ct_eq(stored))
}

/// An unguessable alphanumeric bearer secret.
fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
