use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};

use crate::controllers::accommodation::status_view;
use crate::controllers::{LoadState, StatusView};
use crate::error::{ClientError, FieldErrors};
use crate::handlers::{failure_response, NavBar};
use crate::models::accommodation::{Accommodation, AccommodationForm, AMENITIES};
use crate::models::timestamp;
use crate::routes::Route;
use crate::AppState;

#[derive(Template)]
#[template(path = "register_property.html")]
pub struct RegisterPropertyTemplate {
    pub nav: NavBar,
    pub action: String,
    pub editing: bool,
    pub form: AccommodationForm,
    pub amenities: &'static [&'static str],
    pub errors: FieldErrors,
    pub message: Option<String>,
}

impl RegisterPropertyTemplate {
    fn new(nav: NavBar, target: Route, form: AccommodationForm) -> Self {
        Self {
            nav,
            action: target.path(),
            editing: matches!(target, Route::EditProperty(_)),
            form,
            amenities: AMENITIES,
            errors: FieldErrors::default(),
            message: None,
        }
    }
}

/// One row of the "my accommodations" table.
pub struct AccommodationRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub price_per_night: i64,
    pub status: &'static str,
    pub submitted_on: String,
}

impl From<&Accommodation> for AccommodationRow {
    fn from(accommodation: &Accommodation) -> Self {
        Self {
            id: accommodation.id,
            name: accommodation.name.clone(),
            address: accommodation.address(),
            price_per_night: accommodation.price_per_night,
            status: accommodation.status.label(),
            submitted_on: accommodation
                .submitted_at
                .as_ref()
                .map(timestamp::format_date)
                .unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "my_accommodations.html")]
pub struct MyAccommodationsTemplate {
    pub nav: NavBar,
    pub rows: Vec<AccommodationRow>,
    pub failure: Option<String>,
}

#[derive(Template)]
#[template(path = "accommodation_status.html")]
pub struct AccommodationStatusTemplate {
    pub nav: NavBar,
    pub view: StatusView,
    pub address: String,
    pub price_per_night: i64,
    pub bedroom_count: u32,
    pub amenities: Vec<String>,
    pub photos: Vec<String>,
}

pub async fn register_page(State(state): State<AppState>) -> impl IntoResponse {
    RegisterPropertyTemplate::new(
        state.nav(),
        Route::RegisterProperty,
        AccommodationForm::default(),
    )
}

pub async fn register_submit(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let form = AccommodationForm::from_pairs(pairs);
    let result = state.accommodations.register(form.clone()).await;
    submitted(state, Route::RegisterProperty, form, result)
}

pub async fn edit_page(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let target = Route::EditProperty(id);
    match state.accommodations.fetch_one(id).await {
        Ok(accommodation) if !accommodation.status.accepts_resubmission() => {
            Route::AccommodationStatus(id).redirect().into_response()
        }
        Ok(accommodation) => {
            let mut page = RegisterPropertyTemplate::new(
                state.nav(),
                target,
                AccommodationForm::from_accommodation(&accommodation),
            );
            page.message = accommodation
                .rejection_reason
                .filter(|reason| !reason.trim().is_empty())
                .map(|reason| format!("Rejected: {}", reason));
            page.into_response()
        }
        Err(e) => failure_response(e, &target.path(), state.nav()),
    }
}

pub async fn edit_submit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let form = AccommodationForm::from_pairs(pairs);
    let result = state.accommodations.resubmit(id, form.clone()).await;
    submitted(state, Route::EditProperty(id), form, result)
}

fn submitted(
    state: AppState,
    target: Route,
    form: AccommodationForm,
    result: Result<Route, ClientError>,
) -> Response {
    match result {
        Ok(next) => next.redirect().into_response(),
        Err(ClientError::Validation(errors)) => {
            let mut page = RegisterPropertyTemplate::new(state.nav(), target, form);
            page.errors = errors;
            (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
        }
        Err(e) if !e.requires_login() && e.status_code().is_client_error() => {
            let status = e.status_code();
            let mut page = RegisterPropertyTemplate::new(state.nav(), target, form);
            page.message = Some(e.user_message());
            (status, page).into_response()
        }
        Err(e) => failure_response(e, &target.path(), state.nav()),
    }
}

pub async fn my_accommodations_page(State(state): State<AppState>) -> Response {
    let (rows, failure) = match state.accommodations.load_mine().await {
        Ok(LoadState::Loaded(accommodations)) => (
            accommodations.iter().map(AccommodationRow::from).collect(),
            None,
        ),
        Ok(LoadState::Failed(message)) => (Vec::new(), Some(message)),
        Ok(LoadState::Loading) => (Vec::new(), None),
        Err(e) => return failure_response(e, &Route::MyAccommodations.path(), state.nav()),
    };

    MyAccommodationsTemplate {
        nav: state.nav(),
        rows,
        failure,
    }
    .into_response()
}

pub async fn accommodation_status_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.accommodations.fetch_one(id).await {
        Ok(accommodation) => AccommodationStatusTemplate {
            nav: state.nav(),
            view: status_view(&accommodation),
            address: accommodation.address(),
            price_per_night: accommodation.price_per_night,
            bedroom_count: accommodation.bedroom_count,
            amenities: accommodation.amenities.iter().cloned().collect(),
            photos: accommodation
                .photos
                .iter()
                .map(|photo| photo.photo_url.clone())
                .collect(),
        }
        .into_response(),
        Err(e) => failure_response(e, &Route::AccommodationStatus(id).path(), state.nav()),
    }
}
