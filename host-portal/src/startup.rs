use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use portal_core::middleware::request_id_middleware;
use portal_core::observability::REQUEST_ID_HEADER;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    accommodations::{
        accommodation_status_page, edit_page, edit_submit, my_accommodations_page, register_page,
        register_submit,
    },
    admin::{accommodations_page, decide_accommodation, decide_host_request, host_requests_page},
    app::{health_check, index},
    auth::{login_handler, login_page, logout_handler},
    host::{host_page, host_registration_page, host_registration_submit, host_status_page},
};
use crate::middleware::metrics::metrics_middleware;
use crate::middleware::role_gate::{role_gate, GateState, HostFallback, RouteRequirement};
use crate::AppState;

/// Routes that share one requirement, wrapped in the role gate.
fn gated(state: &AppState, requirement: RouteRequirement, routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(from_fn_with_state(
        GateState::new(state.session.clone(), requirement),
        role_gate,
    ))
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(crate::handlers::metrics::metrics))
        .route("/logout", post(logout_handler));

    let guest = gated(
        &state,
        RouteRequirement::GuestOnly,
        Router::new().route("/login", get(login_page).post(login_handler)),
    );

    let authenticated = gated(
        &state,
        RouteRequirement::Authenticated,
        Router::new()
            .route(
                "/host-registration",
                get(host_registration_page).post(host_registration_submit),
            )
            .route("/host-application-status", get(host_status_page)),
    );

    let host_landing = gated(
        &state,
        RouteRequirement::Host(HostFallback::Informational),
        Router::new().route("/host", get(host_page)),
    );

    let host = gated(
        &state,
        RouteRequirement::Host(HostFallback::HostApplication),
        Router::new()
            .route("/register-property", get(register_page).post(register_submit))
            .route("/register-property/:id", get(edit_page).post(edit_submit))
            .route("/my-accommodations", get(my_accommodations_page))
            .route("/accommodation-status/:id", get(accommodation_status_page)),
    );

    let admin = gated(
        &state,
        RouteRequirement::Admin,
        Router::new()
            .route("/admin/host-requests", get(host_requests_page))
            .route("/admin/host-requests/:id/:action", post(decide_host_request))
            .route("/admin/accommodations", get(accommodations_page))
            .route("/admin/accommodations/:id/:action", post(decide_accommodation)),
    );

    Router::new()
        .merge(public)
        .merge(guest)
        .merge(authenticated)
        .merge(host_landing)
        .merge(host)
        .merge(admin)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
