//! Login token lifecycle against the in-memory store

mod common;

use chrono::Duration;
use common::{Harness, ScriptedSecrets, BASE_URL};
use dothe2_shared::auth::manager::Delivery;
use dothe2_shared::clock::Clock;
use dothe2_shared::models::auth_token::RequestMetadata;
use dothe2_shared::CoreError;

fn metadata() -> RequestMetadata {
    RequestMetadata::new(Some("203.0.113.7".to_string()), Some("integration-test".to_string()))
}

#[tokio::test]
async fn test_request_login_creates_user_and_sends_both_messages() {
    let h = Harness::new();

    let outcome = h
        .services
        .auth
        .request_login("Alice@Example.com", metadata())
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.user.email, "alice@example.com");
    assert_eq!(outcome.user.username, "alice");
    assert_eq!(outcome.user.name, "alice");
    assert_eq!(outcome.delivery, Delivery::Sent);
    assert_eq!(outcome.token.code.len(), 6);
    assert_eq!(
        outcome.token.expires_at - outcome.token.created_at,
        Duration::minutes(15)
    );
    assert_eq!(outcome.token.ip_address.as_deref(), Some("203.0.113.7"));

    let subjects = h.notifier.subjects_for("alice@example.com");
    assert_eq!(subjects, vec!["Welcome to Dothe2!", "Sign in to Dothe2"]);

    let login = h.notifier.sent().pop().unwrap();
    assert!(login
        .text
        .contains(&format!("Your verification code is: {}", outcome.token.code)));
    assert!(login.text.contains(&format!(
        "{}/v1/auth/verify?token={}",
        BASE_URL, outcome.token.token
    )));
}

#[tokio::test]
async fn test_repeat_login_reuses_account() {
    let h = Harness::new();
    let first = h
        .services
        .auth
        .request_login("bob@example.com", metadata())
        .await
        .unwrap();
    let second = h
        .services
        .auth
        .request_login("  BOB@example.com ", metadata())
        .await
        .unwrap();

    assert!(!second.created);
    assert_eq!(first.user.id, second.user.id);
    assert_ne!(first.token.token, second.token.token);
    assert_eq!(h.notifier.subjects_for("bob@example.com").len(), 3);
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let h = Harness::new();
    let err = h
        .services
        .auth
        .request_login("not-an-email", metadata())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(h.store.token_count(), 0);
}

#[tokio::test]
async fn test_malformed_addresses_create_no_user() {
    let h = Harness::new();
    for email in ["a b@example.com", "alice@.com", "alice@@example.com"] {
        let err = h
            .services
            .auth
            .request_login(email, metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)), "{email} accepted");
    }
    assert_eq!(h.store.token_count(), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_usernames_are_deduplicated() {
    let h = Harness::new();
    let a = h
        .services
        .auth
        .request_login("alice@example.com", metadata())
        .await
        .unwrap();
    let b = h
        .services
        .auth
        .request_login("alice@other.org", metadata())
        .await
        .unwrap();
    let c = h
        .services
        .auth
        .request_login("alice@third.net", metadata())
        .await
        .unwrap();

    assert_eq!(a.user.username, "alice");
    assert_eq!(b.user.username, "alice1");
    assert_eq!(c.user.username, "alice2");
    assert_eq!(b.user.name, "alice");
}

#[tokio::test]
async fn test_code_redeems_exactly_once() {
    let h = Harness::new();
    let outcome = h
        .services
        .auth
        .request_login("carol@example.com", metadata())
        .await
        .unwrap();

    let user = h
        .services
        .auth
        .verify_code("carol@example.com", &outcome.token.code)
        .await
        .unwrap();
    assert_eq!(user.id, outcome.user.id);

    let err = h
        .services
        .auth
        .verify_code("carol@example.com", &outcome.token.code)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOrExpiredCode));

    // The link of a redeemed token is spent as well.
    let err = h
        .services
        .auth
        .verify_link(&outcome.token.token)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_link_redeems_exactly_once() {
    let h = Harness::new();
    let outcome = h
        .services
        .auth
        .request_login("dave@example.com", metadata())
        .await
        .unwrap();

    let user = h
        .services
        .auth
        .verify_link(&outcome.token.token)
        .await
        .unwrap();
    assert_eq!(user.email, "dave@example.com");

    assert!(matches!(
        h.services.auth.verify_link(&outcome.token.token).await,
        Err(CoreError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn test_code_expires_at_ttl() {
    let h = Harness::new();
    let outcome = h
        .services
        .auth
        .request_login("erin@example.com", metadata())
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(15));

    let err = h
        .services
        .auth
        .verify_code("erin@example.com", &outcome.token.code)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOrExpiredCode));
}

#[tokio::test]
async fn test_code_valid_just_before_expiry() {
    let h = Harness::new();
    let outcome = h
        .services
        .auth
        .request_login("frank@example.com", metadata())
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(15) - Duration::seconds(1));

    assert!(h
        .services
        .auth
        .verify_code("frank@example.com", &outcome.token.code)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_wrong_and_malformed_codes_fail_identically() {
    let h = Harness::new();
    let outcome = h
        .services
        .auth
        .request_login("grace@example.com", metadata())
        .await
        .unwrap();
    h.services
        .auth
        .request_login("heidi@example.com", metadata())
        .await
        .unwrap();

    for code in ["999999", "abc", "", "1234567"] {
        assert!(matches!(
            h.services.auth.verify_code("grace@example.com", code).await,
            Err(CoreError::InvalidOrExpiredCode)
        ));
    }

    // Right code, wrong account.
    assert!(matches!(
        h.services
            .auth
            .verify_code("heidi@example.com", &outcome.token.code)
            .await,
        Err(CoreError::InvalidOrExpiredCode)
    ));

    // Failed attempts do not burn the token.
    assert!(h
        .services
        .auth
        .verify_code("GRACE@example.com", &outcome.token.code)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_older_live_code_stays_valid() {
    let h = Harness::new();
    let first = h
        .services
        .auth
        .request_login("ivan@example.com", metadata())
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(1));
    let second = h
        .services
        .auth
        .request_login("ivan@example.com", metadata())
        .await
        .unwrap();

    assert!(h
        .services
        .auth
        .verify_code("ivan@example.com", &first.token.code)
        .await
        .is_ok());
    assert!(h
        .services
        .auth
        .verify_code("ivan@example.com", &second.token.code)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_colliding_code_is_regenerated() {
    let h = Harness::with_secrets(ScriptedSecrets::with_codes(&["111111", "111111", "222222"]));

    let first = h
        .services
        .auth
        .request_login("judy@example.com", metadata())
        .await
        .unwrap();
    let second = h
        .services
        .auth
        .request_login("ken@example.com", metadata())
        .await
        .unwrap();

    assert_eq!(first.token.code, "111111");
    assert_eq!(second.token.code, "222222");
}

#[tokio::test]
async fn test_notification_failure_keeps_token_valid() {
    let h = Harness::with_failing_notifier();

    let outcome = h
        .services
        .auth
        .request_login("leo@example.com", metadata())
        .await
        .unwrap();

    assert!(matches!(outcome.delivery, Delivery::Failed(_)));
    assert_eq!(h.store.token_count(), 1);
    assert!(h
        .services
        .auth
        .verify_code("leo@example.com", &outcome.token.code)
        .await
        .is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_has_one_winner() {
    for round in 0..20 {
        let h = Harness::new();
        let email = format!("race{}@example.com", round);
        let outcome = h
            .services
            .auth
            .request_login(&email, metadata())
            .await
            .unwrap();

        let attempts = (0..2).map(|_| {
            let auth = h.services.auth.clone();
            let email = email.clone();
            let code = outcome.token.code.clone();
            tokio::spawn(async move { auth.verify_code(&email, &code).await })
        });
        let results = futures::future::join_all(attempts).await;

        let wins = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(CoreError::InvalidOrExpiredCode))))
            .count();
        assert_eq!((wins, losses), (1, 1), "round {}", round);
    }
}

#[tokio::test]
async fn test_sweep_removes_only_expired_tokens() {
    let h = Harness::new();
    let redeemed = h
        .services
        .auth
        .request_login("mallory@example.com", metadata())
        .await
        .unwrap();
    h.services
        .auth
        .verify_code("mallory@example.com", &redeemed.token.code)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(10));
    h.services
        .auth
        .request_login("niaj@example.com", metadata())
        .await
        .unwrap();

    // Only the first token is past its expiry.
    h.clock.advance(Duration::minutes(6));
    let now = h.clock.utc();
    assert_eq!(h.services.auth.sweep_expired(now).await.unwrap(), 1);
    assert_eq!(h.services.auth.sweep_expired(now).await.unwrap(), 0);
    assert_eq!(h.store.token_count(), 1);
    assert_eq!(h.store.tokens()[0].user_id, 2);
}

#[tokio::test]
async fn test_soft_deleted_user_cannot_redeem() {
    let h = Harness::new();
    let outcome = h
        .services
        .auth
        .request_login("olivia@example.com", metadata())
        .await
        .unwrap();

    assert!(h.store.soft_delete_user(outcome.user.id, h.clock.utc()));

    assert!(matches!(
        h.services
            .auth
            .verify_code("olivia@example.com", &outcome.token.code)
            .await,
        Err(CoreError::InvalidOrExpiredCode)
    ));
    assert!(matches!(
        h.services.auth.current_user(outcome.user.id).await,
        Err(CoreError::NotFound { entity: "User", .. })
    ));
    assert!(matches!(
        h.services
            .auth
            .request_login("olivia@example.com", metadata())
            .await,
        Err(CoreError::Forbidden(_))
    ));
}
