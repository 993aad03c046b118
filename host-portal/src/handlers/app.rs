use askama::Template;
use axum::{extract::State, response::IntoResponse};

use crate::handlers::NavBar;
use crate::AppState;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub nav: NavBar,
}

pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    IndexTemplate { nav: state.nav() }
}

pub async fn health_check() -> &'static str {
    "OK"
}
