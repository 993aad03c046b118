//! Page routing and role gating through the full router.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use common::{app_state, signed_in, UNREACHABLE};
use host_portal::models::session::{Role, Session};
use host_portal::startup::build_router;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn router(base_url: &str, session: Session) -> Router {
    build_router(app_state(base_url, session))
}

#[tokio::test]
async fn health_check_works() {
    let response = router(UNREACHABLE, Session::anonymous())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login_with_return_path() {
    let response = router(UNREACHABLE, Session::anonymous())
        .oneshot(get("/register-property"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?from=%2Fregister-property");
}

#[tokio::test]
async fn plain_user_is_sent_to_host_application() {
    let response = router(UNREACHABLE, signed_in("access", Some(Role::User)))
        .oneshot(get("/register-property"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/host-registration");
}

#[tokio::test]
async fn host_is_denied_admin_pages() {
    let response = router(UNREACHABLE, signed_in("access", Some(Role::Host)))
        .oneshot(get("/admin/host-requests"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_text(response).await.contains("Access denied"));
}

#[tokio::test]
async fn signed_in_user_skips_login_page() {
    let response = router(UNREACHABLE, signed_in("access", Some(Role::User)))
        .oneshot(get("/login"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn admin_sees_empty_review_queue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/host-requests/pending"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = router(&server.uri(), signed_in("access", Some(Role::Admin)))
        .oneshot(get("/admin/host-requests"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Nothing is waiting for review."));
}

#[tokio::test]
async fn expired_session_redirects_to_login_and_clears_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/host-requests/status"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let state = app_state(&server.uri(), signed_in("stale", Some(Role::User)));
    let session = state.session.clone();
    let response = build_router(state)
        .oneshot(get("/host-application-status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?from=%2Fhost-application-status");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn reject_without_reason_is_refused_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/accommodations/4/reject"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = router(&server.uri(), signed_in("access", Some(Role::Admin)))
        .oneshot(post_form("/admin/accommodations/4/reject", "reason=++"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response)
        .await
        .contains("Please enter a reason for the rejection."));
}

#[tokio::test]
async fn unknown_review_action_is_not_found() {
    let response = router(UNREACHABLE, signed_in("access", Some(Role::Admin)))
        .oneshot(post_form("/admin/host-requests/4/archive", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
