mod support;

use chrono::{Duration, Utc};
use passfort_cloud::{CloudType, OAuthToken, TokenHolder};
use pretty_assertions::assert_eq;

fn sample_token(expires_at: chrono::DateTime<Utc>) -> OAuthToken {
    OAuthToken {
        access_token: "at-secret".into(),
        refresh_token: Some("rt-secret".into()),
        expires_at,
        provider: CloudType::GoogleDrive,
    }
}

#[tokio::test]
async fn load_without_file_reports_absent() {
    let dir = tempfile::tempdir().unwrap();
    let holder = TokenHolder::new(dir.path().join("token.json"));

    assert!(!holder.load().await.unwrap());
    assert!(!holder.has_token().await);
}

#[tokio::test]
async fn saved_token_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    let expires_at = Utc::now() + Duration::hours(1);

    let holder = TokenHolder::new(&path);
    holder.set_and_save(sample_token(expires_at)).await.unwrap();

    let restarted = TokenHolder::new(&path);
    assert!(restarted.load().await.unwrap());
    let token = restarted.token().await.unwrap();
    assert_eq!(token.access_token, "at-secret");
    assert_eq!(token.refresh_token.as_deref(), Some("rt-secret"));
    assert_eq!(token.provider, CloudType::GoogleDrive);
}

#[tokio::test]
async fn clear_removes_memory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");

    let holder = TokenHolder::new(&path);
    holder
        .set_and_save(sample_token(Utc::now() + Duration::hours(1)))
        .await
        .unwrap();
    assert!(path.is_file());

    holder.clear().await;
    assert!(!holder.has_token().await);
    assert!(!path.is_file());
}

#[tokio::test]
async fn clear_without_file_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let holder = TokenHolder::new(dir.path().join("token.json"));
    holder.clear().await;
    assert!(!holder.has_token().await);
}

#[test]
fn refresh_required_honors_margin() {
    let fresh = sample_token(Utc::now() + Duration::hours(1));
    assert!(!fresh.refresh_required(300));
    assert!(!fresh.is_expired());

    let expiring = sample_token(Utc::now() + Duration::seconds(60));
    assert!(expiring.refresh_required(300));
    assert!(!expiring.is_expired());

    let expired = sample_token(Utc::now() - Duration::seconds(1));
    assert!(expired.refresh_required(300));
    assert!(expired.is_expired());
}

#[test]
fn renewable_only_with_refresh_token() {
    let mut token = sample_token(Utc::now());
    assert!(token.is_renewable());
    token.refresh_token = None;
    assert!(!token.is_renewable());
}

#[test]
fn debug_redacts_token_material() {
    let token = sample_token(Utc::now());
    let rendered = format!("{token:?}");
    assert!(!rendered.contains("at-secret"));
    assert!(!rendered.contains("rt-secret"));
    assert!(rendered.contains("<redacted>"));
}
