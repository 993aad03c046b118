use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use portal_core::error::AppError;
use secrecy::Secret;
use serde::Deserialize;

use crate::error::{ClientError, FieldErrors};
use crate::handlers::{failure_response, NavBar};
use crate::models::session::LoginForm;
use crate::routes::Route;
use crate::utils::safe_return_path;
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: NavBar,
    pub email: String,
    pub from: String,
    pub errors: FieldErrors,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    pub password: Secret<String>,
    #[serde(default)]
    pub from: Option<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: state.nav(),
        email: String::new(),
        from: safe_return_path(query.from.as_deref())
            .unwrap_or_default()
            .to_string(),
        errors: FieldErrors::default(),
        message: None,
    }
}

pub async fn login_handler(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Response {
    let from = safe_return_path(payload.from.as_deref()).map(str::to_string);
    let form = LoginForm {
        email: payload.email,
        password: payload.password,
    };
    let email = form.email.trim().to_string();

    let rerender = |status: StatusCode, errors: FieldErrors, message: Option<String>| {
        let page = LoginTemplate {
            nav: state.nav(),
            email: email.clone(),
            from: from.clone().unwrap_or_default(),
            errors,
            message,
        };
        (status, page).into_response()
    };

    match state.auth_client.login(form).await {
        Ok(_) => {
            let destination = from.clone().unwrap_or_else(|| Route::Home.path());
            Redirect::to(&destination).into_response()
        }
        Err(ClientError::Validation(errors)) => {
            rerender(StatusCode::UNPROCESSABLE_ENTITY, errors, None)
        }
        Err(e @ ClientError::InvalidCredentials) => rerender(
            StatusCode::UNAUTHORIZED,
            FieldErrors::default(),
            Some(e.user_message()),
        ),
        Err(e) if !e.requires_login() && e.status_code().is_client_error() => rerender(
            e.status_code(),
            FieldErrors::default(),
            Some(e.user_message()),
        ),
        Err(e) => failure_response(e, Route::Login.path().as_str(), state.nav()),
    }
}

/// Controllers drop their cached views on their own once the session is gone.
pub async fn logout_handler(State(state): State<AppState>) -> Result<Redirect, AppError> {
    state
        .auth_client
        .logout()
        .await
        .map_err(|e| AppError::StorageError(anyhow::Error::new(e)))?;

    Ok(Route::Home.redirect())
}
