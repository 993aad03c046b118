use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;

use crate::controllers::admin_review::{PendingList, ReviewAction, ReviewKind};
use crate::error::ClientError;
use crate::handlers::{error_page, failure_response, NavBar};
use crate::models::timestamp;
use crate::routes::Route;
use crate::AppState;

/// A pending record as one row of an admin table.
pub struct PendingRow {
    pub id: i64,
    pub title: String,
    pub applicant: String,
    pub summary: String,
    pub requested_on: String,
}

fn rows(list: &PendingList) -> Vec<PendingRow> {
    let date = |at: Option<&chrono::NaiveDateTime>| at.map(timestamp::format_date).unwrap_or_default();

    match list {
        PendingList::Host(requests) => requests
            .iter()
            .map(|request| PendingRow {
                id: request.id,
                title: request.business_registration_number.clone(),
                applicant: applicant(&request.user_name, &request.user_email),
                summary: request.phone_number.clone(),
                requested_on: date(request.requested_at.as_ref()),
            })
            .collect(),
        PendingList::Accommodation(items) => items
            .iter()
            .map(|item| PendingRow {
                id: item.accommodation.id,
                title: item.accommodation.name.clone(),
                applicant: applicant(&item.host_name, &item.host_email),
                summary: format!(
                    "{} / {} per night / {} bedroom(s)",
                    item.accommodation.address(),
                    item.accommodation.price_per_night,
                    item.accommodation.bedroom_count
                ),
                requested_on: date(item.accommodation.submitted_at.as_ref()),
            })
            .collect(),
    }
}

fn applicant(name: &str, email: &str) -> String {
    match (name.is_empty(), email.is_empty()) {
        (false, false) => format!("{} <{}>", name, email),
        (false, true) => name.to_string(),
        _ => email.to_string(),
    }
}

#[derive(Template)]
#[template(path = "admin_review.html")]
pub struct AdminReviewTemplate {
    pub nav: NavBar,
    pub heading: &'static str,
    pub base_path: String,
    pub rows: Vec<PendingRow>,
    pub failure: Option<String>,
    pub message: Option<String>,
}

impl AdminReviewTemplate {
    fn new(nav: NavBar, kind: ReviewKind) -> Self {
        let (heading, route) = match kind {
            ReviewKind::Host => ("Pending host applications", Route::AdminHostRequests),
            ReviewKind::Accommodation => ("Pending accommodations", Route::AdminAccommodations),
        };
        Self {
            nav,
            heading,
            base_path: route.path(),
            rows: Vec::new(),
            failure: None,
            message: None,
        }
    }
}

#[derive(Deserialize)]
pub struct DecisionForm {
    #[serde(default)]
    pub reason: Option<String>,
}

fn list_route(kind: ReviewKind) -> Route {
    match kind {
        ReviewKind::Host => Route::AdminHostRequests,
        ReviewKind::Accommodation => Route::AdminAccommodations,
    }
}

async fn review_page(state: AppState, kind: ReviewKind) -> Response {
    let mut page = AdminReviewTemplate::new(state.nav(), kind);
    match state.admin_review.list_pending(kind).await {
        Ok(list) => page.rows = rows(&list),
        Err(e @ ClientError::Forbidden(_)) => {
            return failure_response(e, &list_route(kind).path(), state.nav())
        }
        Err(e) if e.requires_login() => {
            return failure_response(e, &list_route(kind).path(), state.nav())
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = %kind, "Failed to load pending list");
            page.failure = Some(e.user_message());
        }
    }
    page.into_response()
}

async fn decide(
    state: AppState,
    kind: ReviewKind,
    id: i64,
    action: String,
    form: DecisionForm,
) -> Response {
    let route = list_route(kind);
    let Some(action) = ReviewAction::parse(&action) else {
        return error_page(
            StatusCode::NOT_FOUND,
            "Not found",
            "Unknown review action.",
            state.nav(),
        );
    };

    match state
        .admin_review
        .decide(id, kind, action, form.reason.as_deref())
        .await
    {
        Ok(_) => route.redirect().into_response(),
        Err(e @ ClientError::ReasonRequired) => {
            let mut page = AdminReviewTemplate::new(state.nav(), kind);
            if let Some(list) = state.admin_review.cached(kind) {
                page.rows = rows(&list);
            }
            page.message = Some(e.user_message());
            (e.status_code(), page).into_response()
        }
        Err(e) => failure_response(e, &route.path(), state.nav()),
    }
}

pub async fn host_requests_page(State(state): State<AppState>) -> Response {
    review_page(state, ReviewKind::Host).await
}

pub async fn accommodations_page(State(state): State<AppState>) -> Response {
    review_page(state, ReviewKind::Accommodation).await
}

pub async fn decide_host_request(
    State(state): State<AppState>,
    Path((id, action)): Path<(i64, String)>,
    Form(form): Form<DecisionForm>,
) -> Response {
    decide(state, ReviewKind::Host, id, action, form).await
}

pub async fn decide_accommodation(
    State(state): State<AppState>,
    Path((id, action)): Path<(i64, String)>,
    Form(form): Form<DecisionForm>,
) -> Response {
    decide(state, ReviewKind::Accommodation, id, action, form).await
}
