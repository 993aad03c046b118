//! Route authorisation for the portal.
//!
//! [`guard`] is a pure function of the route requirement and a session
//! snapshot. [`role_gate`] applies it before a gated handler runs, so a
//! forbidden page is never rendered, not even partially.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::handlers::{error_page, NavBar};
use crate::models::session::{Role, Session};
use crate::routes::{login_url, Route};
use crate::services::session_store::SessionStore;

pub const ADMIN_ONLY: &str = "admin only";

/// What a signed-in USER gets on a HOST route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFallback {
    /// Sent to the host application flow.
    HostApplication,
    /// Let in; the page itself offers to start the host application.
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    Public,
    /// Only for signed-out users (the login page).
    GuestOnly,
    Authenticated,
    Host(HostFallback),
    Admin,
}

impl RouteRequirement {
    fn requires_authentication(self) -> bool {
        matches!(
            self,
            RouteRequirement::Authenticated | RouteRequirement::Host(_) | RouteRequirement::Admin
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectLogin { return_to: String },
    RedirectHome,
    RedirectHostApplication,
    Deny { message: String },
}

/// Decide whether `session` may open a route with `requirement`.
/// Rules are checked in order and the first match wins.
pub fn guard(requirement: RouteRequirement, session: &Session, current_path: &str) -> Decision {
    let role = session.current_role();

    if requirement.requires_authentication() && role.is_none() {
        return Decision::RedirectLogin {
            return_to: current_path.to_string(),
        };
    }

    match (requirement, role) {
        (RouteRequirement::Admin, Some(role)) if role != Role::Admin => Decision::Deny {
            message: ADMIN_ONLY.to_string(),
        },
        (RouteRequirement::Host(fallback), Some(Role::User)) => match fallback {
            HostFallback::HostApplication => Decision::RedirectHostApplication,
            HostFallback::Informational => Decision::Allow,
        },
        (RouteRequirement::GuestOnly, Some(_)) => Decision::RedirectHome,
        _ => Decision::Allow,
    }
}

impl Decision {
    /// The response that replaces the handler, or `None` to let it run.
    pub fn response(self, session: &Session) -> Option<Response> {
        match self {
            Decision::Allow => None,
            Decision::RedirectLogin { return_to } => {
                Some(axum::response::Redirect::to(&login_url(&return_to)).into_response())
            }
            Decision::RedirectHome => Some(Route::Home.redirect().into_response()),
            Decision::RedirectHostApplication => {
                Some(Route::HostRegistration.redirect().into_response())
            }
            Decision::Deny { message } => Some(error_page(
                reqwest::StatusCode::FORBIDDEN,
                "Access denied",
                &message,
                NavBar::from_session(session),
            )),
        }
    }
}

/// State for one gated route group.
#[derive(Clone)]
pub struct GateState {
    pub session: Arc<SessionStore>,
    pub requirement: RouteRequirement,
}

impl GateState {
    pub fn new(session: Arc<SessionStore>, requirement: RouteRequirement) -> Self {
        Self {
            session,
            requirement,
        }
    }
}

pub async fn role_gate(State(gate): State<GateState>, request: Request, next: Next) -> Response {
    let current_path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let session = gate.session.snapshot();
    let decision = guard(gate.requirement, &session, &current_path);
    tracing::debug!(
        path = %current_path,
        requirement = ?gate.requirement,
        decision = ?decision,
        "Role gate evaluated"
    );

    match decision.response(&session) {
        Some(response) => response,
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in(role: Option<Role>) -> Session {
        Session {
            access_token: Some("access".into()),
            refresh_token: Some("refresh".into()),
            role,
            identity: Some("someone@example.com".into()),
        }
    }

    #[test]
    fn anonymous_is_sent_to_login_with_return_path() {
        let anonymous = Session::anonymous();
        for requirement in [
            RouteRequirement::Authenticated,
            RouteRequirement::Host(HostFallback::HostApplication),
            RouteRequirement::Host(HostFallback::Informational),
            RouteRequirement::Admin,
        ] {
            assert_eq!(
                guard(requirement, &anonymous, "/register-property"),
                Decision::RedirectLogin {
                    return_to: "/register-property".into()
                }
            );
        }
    }

    #[test]
    fn stale_role_without_token_is_anonymous() {
        let session = Session {
            role: Some(Role::Admin),
            ..Session::default()
        };
        assert!(matches!(
            guard(RouteRequirement::Admin, &session, "/admin/accommodations"),
            Decision::RedirectLogin { .. }
        ));
    }

    #[test]
    fn admin_routes_deny_other_roles() {
        for role in [None, Some(Role::User), Some(Role::Host)] {
            assert_eq!(
                guard(RouteRequirement::Admin, &signed_in(role), "/admin/host-requests"),
                Decision::Deny {
                    message: ADMIN_ONLY.into()
                }
            );
        }
        assert_eq!(
            guard(RouteRequirement::Admin, &signed_in(Some(Role::Admin)), "/admin/host-requests"),
            Decision::Allow
        );
    }

    #[test]
    fn user_on_host_route_follows_fallback() {
        let user = signed_in(Some(Role::User));
        assert_eq!(
            guard(
                RouteRequirement::Host(HostFallback::HostApplication),
                &user,
                "/register-property"
            ),
            Decision::RedirectHostApplication
        );
        assert_eq!(
            guard(RouteRequirement::Host(HostFallback::Informational), &user, "/host"),
            Decision::Allow
        );

        // a token with no role counts as USER
        assert_eq!(
            guard(
                RouteRequirement::Host(HostFallback::HostApplication),
                &signed_in(None),
                "/my-accommodations"
            ),
            Decision::RedirectHostApplication
        );
    }

    #[test]
    fn hosts_and_admins_pass_host_routes() {
        for role in [Role::Host, Role::Admin] {
            assert_eq!(
                guard(
                    RouteRequirement::Host(HostFallback::HostApplication),
                    &signed_in(Some(role)),
                    "/register-property"
                ),
                Decision::Allow
            );
        }
    }

    #[test]
    fn login_page_is_guest_only() {
        assert_eq!(
            guard(RouteRequirement::GuestOnly, &Session::anonymous(), "/login"),
            Decision::Allow
        );
        assert_eq!(
            guard(RouteRequirement::GuestOnly, &signed_in(Some(Role::Host)), "/login"),
            Decision::RedirectHome
        );
    }

    #[test]
    fn public_routes_allow_everyone() {
        assert_eq!(guard(RouteRequirement::Public, &Session::anonymous(), "/"), Decision::Allow);
        assert_eq!(
            guard(RouteRequirement::Public, &signed_in(Some(Role::Admin)), "/"),
            Decision::Allow
        );
    }
}
