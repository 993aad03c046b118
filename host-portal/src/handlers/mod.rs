pub mod accommodations;
pub mod admin;
pub mod app;
pub mod auth;
pub mod host;
pub mod metrics;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::ClientError;
use crate::models::session::{Role, Session};
use crate::routes::login_url;

/// Who is signed in, for the navigation bar of every page.
#[derive(Debug, Clone, Default)]
pub struct NavBar {
    pub identity: Option<String>,
    pub role: Option<Role>,
}

impl NavBar {
    pub fn from_session(session: &Session) -> Self {
        Self {
            identity: session.identity().map(str::to_string),
            role: session.current_role(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_host(&self) -> bool {
        matches!(self.role, Some(Role::Host) | Some(Role::Admin))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn display_name(&self) -> &str {
        self.identity.as_deref().unwrap_or("Signed in")
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: NavBar,
    pub title: String,
    pub message: String,
}

pub fn error_page(status: StatusCode, title: &str, message: &str, nav: NavBar) -> Response {
    let page = ErrorTemplate {
        nav,
        title: title.to_string(),
        message: message.to_string(),
    };
    (status, page).into_response()
}

/// Page for a failed operation. Authentication failures send the user to the
/// login page, returning to `current_path` afterwards.
pub fn failure_response(error: ClientError, current_path: &str, nav: NavBar) -> Response {
    if error.requires_login() {
        tracing::info!(error = %error, path = %current_path, "Sign-in required");
        return Redirect::to(&login_url(current_path)).into_response();
    }

    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, path = %current_path, "Request failed");
    } else {
        tracing::warn!(error = %error, path = %current_path, "Request refused");
    }

    let title = match status {
        StatusCode::FORBIDDEN => "Access denied",
        StatusCode::NOT_FOUND => "Not found",
        StatusCode::CONFLICT => "Cannot continue",
        _ => "Something went wrong",
    };
    error_page(status, title, &error.user_message(), nav)
}
