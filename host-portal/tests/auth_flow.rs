//! Login and logout against a mocked backend.

mod common;

use common::{gateway, signed_in, store};
use host_portal::error::ClientError;
use host_portal::models::session::{LoginForm, Role, Session};
use host_portal::services::auth_client::AuthClient;
use host_portal::services::session_store::SessionStore;
use secrecy::Secret;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn form(email: &str, password: &str) -> LoginForm {
    LoginForm {
        email: email.to_string(),
        password: Secret::new(password.to_string()),
    }
}

#[tokio::test]
async fn login_persists_session_across_reload() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(serde_json::json!({
            "email": "host@example.com",
            "password": "correct horse"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "role": "ROLE_HOST"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(SessionStore::file(&session_path));
    let auth = AuthClient::new(gateway(&server.uri(), session.clone()));

    let role = auth.login(form("  host@example.com ", "correct horse")).await.unwrap();
    assert_eq!(role, Role::Host);
    drop(auth);
    drop(session);

    let reloaded = SessionStore::file(&session_path);
    let restored = reloaded.snapshot();
    assert_eq!(restored.current_role(), Some(Role::Host));
    assert_eq!(restored.identity(), Some("host@example.com"));
    assert_eq!(restored.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn wrong_password_is_reported_without_touching_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = store(Session::anonymous());
    let auth = AuthClient::new(gateway(&server.uri(), session.clone()));

    let result = auth.login(form("host@example.com", "wrong")).await;
    assert!(matches!(result, Err(ClientError::InvalidCredentials)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn invalid_form_never_reaches_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = AuthClient::new(gateway(&server.uri(), store(Session::anonymous())));

    let err = auth.login(form("not-an-email", "")).await.unwrap_err();
    let fields = err.field_errors().expect("validation errors");
    assert!(fields.has("email"));
    assert!(fields.has("password"));
}

#[tokio::test]
async fn role_falls_back_to_token_claim() {
    use base64::{engine::general_purpose, Engine as _};

    let server = MockServer::start().await;
    let token = format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.sig",
        general_purpose::URL_SAFE_NO_PAD.encode(r#"{"sub":"1","role":"ADMIN"}"#)
    );
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": token,
            "refreshToken": "refresh-1"
        })))
        .mount(&server)
        .await;

    let session = store(Session::anonymous());
    let auth = AuthClient::new(gateway(&server.uri(), session.clone()));

    assert_eq!(auth.login(form("admin@example.com", "pw")).await.unwrap(), Role::Admin);
    assert_eq!(session.current_role(), Some(Role::Admin));
}

#[tokio::test]
async fn logout_clears_session_even_when_backend_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(serde_json::json!({ "refreshToken": "refresh-1" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "role": "USER"
        })))
        .mount(&server)
        .await;

    let session = Arc::new(SessionStore::file(&session_path));
    let auth = AuthClient::new(gateway(&server.uri(), session.clone()));
    auth.login(form("guest@example.com", "pw")).await.unwrap();
    assert!(session_path.exists());

    auth.logout().await.unwrap();
    assert_eq!(session.snapshot(), Session::anonymous());
    assert!(!session_path.exists());

    // a second logout is a local no-op
    auth.logout().await.unwrap();
}

#[tokio::test]
async fn logout_does_not_refresh_an_expired_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = store(signed_in("access-1", Some(Role::Host)));
    let auth = AuthClient::new(gateway(&server.uri(), session.clone()));

    auth.logout().await.unwrap();
    assert!(!session.is_authenticated());
}
