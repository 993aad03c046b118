use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};

use crate::controllers::host_application::{status_view, RegistrationEntry};
use crate::controllers::{LoadState, StatusView};
use crate::error::{ClientError, FieldErrors};
use crate::handlers::{failure_response, NavBar};
use crate::models::host_request::HostApplicationForm;
use crate::routes::Route;
use crate::AppState;

#[derive(Template)]
#[template(path = "host.html")]
pub struct HostTemplate {
    pub nav: NavBar,
}

#[derive(Template)]
#[template(path = "host_registration.html")]
pub struct HostRegistrationTemplate {
    pub nav: NavBar,
    pub form: HostApplicationForm,
    pub errors: FieldErrors,
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "host_status.html")]
pub struct HostStatusTemplate {
    pub nav: NavBar,
    pub view: Option<StatusView>,
    pub failure: Option<String>,
}

/// Landing page of the host flow. Open to every signed-in user.
pub async fn host_page(State(state): State<AppState>) -> impl IntoResponse {
    HostTemplate { nav: state.nav() }
}

pub async fn host_registration_page(State(state): State<AppState>) -> Response {
    let path = Route::HostRegistration.path();
    match state.host_applications.registration_entry().await {
        Ok(RegistrationEntry::StatusPage) => Route::HostApplicationStatus.redirect().into_response(),
        Ok(RegistrationEntry::Form { previous }) => {
            let message = previous
                .as_ref()
                .and_then(|application| application.rejection_reason.clone())
                .map(|reason| format!("Your previous application was rejected: {}", reason));
            let form = previous
                .map(|application| HostApplicationForm {
                    business_registration_number: application.business_registration_number,
                    phone_number: application.phone_number,
                })
                .unwrap_or_default();

            HostRegistrationTemplate {
                nav: state.nav(),
                form,
                errors: FieldErrors::default(),
                message,
            }
            .into_response()
        }
        Ok(RegistrationEntry::Unavailable(message)) => HostRegistrationTemplate {
            nav: state.nav(),
            form: HostApplicationForm::default(),
            errors: FieldErrors::default(),
            message: Some(message),
        }
        .into_response(),
        Err(e) => failure_response(e, &path, state.nav()),
    }
}

pub async fn host_registration_submit(
    State(state): State<AppState>,
    Form(form): Form<HostApplicationForm>,
) -> Response {
    let path = Route::HostRegistration.path();
    match state.host_applications.submit(form.clone()).await {
        Ok(next) => next.redirect().into_response(),
        Err(ClientError::Validation(errors)) => {
            let page = HostRegistrationTemplate {
                nav: state.nav(),
                form,
                errors,
                message: None,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
        }
        Err(e) if !e.requires_login() && e.status_code().is_client_error() => {
            let page = HostRegistrationTemplate {
                nav: state.nav(),
                form,
                errors: FieldErrors::default(),
                message: Some(e.user_message()),
            };
            (e.status_code(), page).into_response()
        }
        Err(e) => failure_response(e, &path, state.nav()),
    }
}

pub async fn host_status_page(State(state): State<AppState>) -> Response {
    let path = Route::HostApplicationStatus.path();
    let (view, failure) = match state.host_applications.load_status().await {
        Ok(LoadState::Loaded(application)) => (Some(status_view(&application)), None),
        Ok(LoadState::Failed(message)) => (None, Some(message)),
        Ok(LoadState::Loading) => (None, None),
        Err(e) => return failure_response(e, &path, state.nav()),
    };

    HostStatusTemplate {
        nav: state.nav(),
        view,
        failure,
    }
    .into_response()
}
