//! Verification token lifecycle at the resolver surface.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use policy_engine::{InMemoryRelationshipStore, PolicyConfig, TokenService};
use policy_sdk::error::TokenError;
use policy_sdk::{
    ClaimType, TokenAccessResolver, TokenIssueRequest, VerificationOutcome, VerificationStatus,
};
use trova_security::Principal;

fn request(ttl: time::Duration) -> TokenIssueRequest {
    TokenIssueRequest {
        claim_type: ClaimType::Employment,
        claimant_display_name: "Dana Reyes".to_owned(),
        verifier_name: "Acme HR".to_owned(),
        verifier_email: "hr@acme.test".to_owned(),
        ttl: Some(ttl),
    }
}

fn wire() -> (Arc<InMemoryRelationshipStore>, TokenService) {
    let store = Arc::new(InMemoryRelationshipStore::new());
    let service = TokenService::new(store.clone(), PolicyConfig::default());
    (store, service)
}

#[tokio::test]
async fn issued_token_resolves_to_the_verifier_view_only() {
    let (_, service) = wire();
    let claimant = Principal::authenticated(Uuid::new_v4());

    let issued = service
        .issue(claimant, request(time::Duration::hours(72)))
        .await
        .unwrap();
    assert_eq!(issued.token.expose_secret().len(), 32);

    let view = service.resolve(&issued.token).await.unwrap();
    assert_eq!(view.claim_type, ClaimType::Employment);
    assert_eq!(view.claimant_display_name, "Dana Reyes");
    assert_eq!(view.verifier_name, "Acme HR");
    assert_eq!(view.expires_at, issued.expires_at);
    // The verifier view never carries the verifier email or any foreign
    // record; the serialized shape proves the scoping.
    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("verifier_email").is_none());
}

#[tokio::test]
async fn issue_without_a_ttl_uses_the_configured_window() {
    let store = Arc::new(InMemoryRelationshipStore::new());
    let config: PolicyConfig = serde_json::from_str(r#"{"token_ttl_hours": 2}"#).unwrap();
    let service = TokenService::new(store, config);

    let mut request = request(time::Duration::hours(99));
    request.ttl = None;
    let issued = service
        .issue(Principal::authenticated(Uuid::new_v4()), request)
        .await
        .unwrap();

    let remaining = issued.expires_at - time::OffsetDateTime::now_utc();
    assert!(remaining > time::Duration::minutes(119));
    assert!(remaining <= time::Duration::hours(2));
}

#[tokio::test]
async fn anonymous_principals_cannot_issue() {
    let (_, service) = wire();
    let err = service
        .issue(Principal::anonymous(), request(time::Duration::hours(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid));
}

#[tokio::test]
async fn unknown_and_expired_tokens_are_indistinguishable() {
    let (_, service) = wire();
    let claimant = Principal::authenticated(Uuid::new_v4());

    let expired = service
        .issue(claimant, request(time::Duration::hours(-1)))
        .await
        .unwrap();

    let unknown = SecretString::from("nosuchtokennosuchtokennosuchtoke");
    let err_unknown = service.resolve(&unknown).await.unwrap_err();
    let err_expired = service.resolve(&expired.token).await.unwrap_err();
    assert_eq!(err_unknown.to_string(), err_expired.to_string());
}

#[tokio::test]
async fn respond_settles_exactly_once() {
    let (store, service) = wire();
    let claimant = Principal::authenticated(Uuid::new_v4());
    let issued = service
        .issue(claimant, request(time::Duration::hours(1)))
        .await
        .unwrap();

    service
        .respond(&issued.token, VerificationOutcome::Accepted)
        .await
        .unwrap();
    assert_eq!(
        store.verification_status(issued.id),
        Some(VerificationStatus::Accepted)
    );

    // Replaying the link is refused, and the stored answer stands.
    let err = service
        .respond(&issued.token, VerificationOutcome::Declined)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid));
    assert_eq!(
        store.verification_status(issued.id),
        Some(VerificationStatus::Accepted)
    );

    // A settled token no longer resolves at all.
    let err = service.resolve(&issued.token).await.unwrap_err();
    assert!(matches!(err, TokenError::Invalid));
}

#[tokio::test]
async fn decline_is_a_first_class_outcome() {
    let (store, service) = wire();
    let issued = service
        .issue(
            Principal::authenticated(Uuid::new_v4()),
            request(time::Duration::hours(1)),
        )
        .await
        .unwrap();

    service
        .respond(&issued.token, VerificationOutcome::Declined)
        .await
        .unwrap();
    assert_eq!(
        store.verification_status(issued.id),
        Some(VerificationStatus::Declined)
    );
}

#[tokio::test]
async fn expiry_refuses_even_a_pending_token() {
    let (store, service) = wire();
    let issued = service
        .issue(
            Principal::authenticated(Uuid::new_v4()),
            request(time::Duration::hours(-1)),
        )
        .await
        .unwrap();
    // Still pending in storage, but past its window.
    assert_eq!(
        store.verification_status(issued.id),
        Some(VerificationStatus::Pending)
    );

    let err = service
        .respond(&issued.token, VerificationOutcome::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid));
    assert_eq!(
        store.verification_status(issued.id),
        Some(VerificationStatus::Pending)
    );
}

#[tokio::test]
async fn a_near_miss_token_grants_nothing() {
    let (_, service) = wire();
    let issued = service
        .issue(
            Principal::authenticated(Uuid::new_v4()),
            request(time::Duration::hours(1)),
        )
        .await
        .unwrap();

    // Same length, one character off.
    let mut near_miss = issued.token.expose_secret().to_owned();
    let last = if near_miss.ends_with('x') { 'y' } else { 'x' };
    near_miss.pop();
    near_miss.push(last);

    let err = service
        .resolve(&SecretString::from(near_miss))
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Invalid));
}
