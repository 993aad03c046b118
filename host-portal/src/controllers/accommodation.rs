use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use validator::Validate;

use super::{CallToAction, LoadState, SessionEpoch, StatusView, Tone, ViewSlot};
use crate::error::ClientError;
use crate::models::accommodation::{Accommodation, AccommodationForm, AccommodationStatus};
use crate::models::timestamp;
use crate::routes::Route;
use crate::services::gateway::{ApiGateway, ApiRequest};

const MINE_PATH: &str = "/api/accommodations/my-accommodations";
const REGISTER_PATH: &str = "/api/accommodations/register";

pub struct AccommodationController {
    gateway: Arc<ApiGateway>,
    epoch: SessionEpoch,
    mine: ViewSlot<Vec<Accommodation>>,
    /// Last status seen per accommodation, for the local resubmit check.
    last_seen: Mutex<HashMap<i64, AccommodationStatus>>,
}

impl AccommodationController {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            epoch: SessionEpoch::new(Arc::clone(gateway.session())),
            gateway,
            mine: ViewSlot::new(),
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the previous user's listings once the session changed.
    fn sync(&self) {
        if self.epoch.changed() {
            tracing::debug!("Session changed, dropping cached accommodations");
            self.mine.invalidate();
            self.last_seen_mut().clear();
        }
    }

    fn last_seen_mut(&self) -> std::sync::MutexGuard<'_, HashMap<i64, AccommodationStatus>> {
        self.last_seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The host's accommodations. The full listing replaces every remembered
    /// status.
    pub async fn list_mine(&self) -> Result<Vec<Accommodation>, ClientError> {
        self.sync();
        let response = self
            .gateway
            .send(&ApiRequest::get(MINE_PATH))
            .await?
            .into_result()?;

        let accommodations: Vec<Accommodation> = if response.is_no_content() {
            Vec::new()
        } else {
            response.json()?
        };

        let mut last_seen = self.last_seen_mut();
        last_seen.clear();
        last_seen.extend(accommodations.iter().map(|a| (a.id, a.status)));
        drop(last_seen);

        Ok(accommodations)
    }

    /// Sequenced [`list_mine`](Self::list_mine) into the page's view slot.
    pub async fn load_mine(&self) -> Result<LoadState<Vec<Accommodation>>, ClientError> {
        self.sync();
        let ticket = self.mine.issue();
        match self.list_mine().await {
            Ok(accommodations) => {
                self.mine.commit(ticket, LoadState::Loaded(accommodations));
            }
            Err(e) if e.requires_login() => {
                self.mine.invalidate();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load accommodations");
                self.mine.commit(ticket, LoadState::Failed(e.user_message()));
            }
        }
        Ok(self.mine.state())
    }

    pub async fn fetch_one(&self, id: i64) -> Result<Accommodation, ClientError> {
        self.sync();
        let response = self
            .gateway
            .send(&ApiRequest::get(format!("/api/accommodations/{}/status", id)))
            .await?
            .into_result()?;

        if response.is_no_content() {
            return Err(ClientError::NotFound(format!(
                "Accommodation {} was not found.",
                id
            )));
        }
        let accommodation: Accommodation = response.json()?;
        self.remember(&accommodation);
        Ok(accommodation)
    }

    /// File a new accommodation application. Navigates to its status page
    /// when the backend returns the created record, otherwise to the list.
    pub async fn register(&self, form: AccommodationForm) -> Result<Route, ClientError> {
        self.sync();
        let form = form.normalized();
        form.validate()?;

        let request = ApiRequest::post(REGISTER_PATH).json(serde_json::to_value(&form)?);
        let response = self.gateway.send(&request).await?.into_result()?;

        match response.try_json::<Accommodation>() {
            Some(created) => {
                tracing::info!(accommodation_id = created.id, "Accommodation registered");
                self.remember(&created);
                Ok(Route::AccommodationStatus(created.id))
            }
            None => {
                tracing::info!("Accommodation registered");
                Ok(Route::MyAccommodations)
            }
        }
    }

    /// Edit a pending or rejected application and send it for review again.
    pub async fn resubmit(&self, id: i64, form: AccommodationForm) -> Result<Route, ClientError> {
        let form = form.normalized();
        form.validate()?;

        if self.known_status(id) == Some(AccommodationStatus::Approved) {
            return Err(ClientError::Conflict(
                "This accommodation is already approved and can no longer be edited.".to_string(),
            ));
        }

        let request =
            ApiRequest::put(format!("/api/accommodations/{}", id)).json(serde_json::to_value(&form)?);
        self.gateway.send(&request).await?.into_result()?;

        tracing::info!(accommodation_id = id, "Accommodation resubmitted");
        self.last_seen_mut().insert(id, AccommodationStatus::Pending);
        Ok(Route::AccommodationStatus(id))
    }

    pub fn known_status(&self, id: i64) -> Option<AccommodationStatus> {
        self.sync();
        self.last_seen_mut().get(&id).copied()
    }

    fn remember(&self, accommodation: &Accommodation) {
        self.last_seen_mut()
            .insert(accommodation.id, accommodation.status);
    }
}

pub fn status_view(accommodation: &Accommodation) -> StatusView {
    let mut details = Vec::new();
    if let Some(at) = &accommodation.submitted_at {
        details.push(("Submitted on", timestamp::format_date(at)));
    }
    if let Some(at) = &accommodation.processed_at {
        details.push(("Processed on", timestamp::format_date(at)));
    }

    match accommodation.status {
        AccommodationStatus::Pending => StatusView {
            tone: Tone::Waiting,
            title: format!("{} is awaiting approval", accommodation.name),
            message: "An administrator is reviewing this accommodation.".to_string(),
            details,
            rejection_reason: None,
            action: CallToAction::new("Back to my accommodations", Route::MyAccommodations),
        },
        AccommodationStatus::Approved => StatusView {
            tone: Tone::Success,
            title: format!("{} is approved", accommodation.name),
            message: "This accommodation is approved and visible to guests.".to_string(),
            details,
            rejection_reason: None,
            action: CallToAction::new("View my accommodations", Route::MyAccommodations),
        },
        AccommodationStatus::Rejected => StatusView {
            tone: Tone::Rejected,
            title: format!("{} was rejected", accommodation.name),
            message: "Update the application and submit it again.".to_string(),
            details,
            rejection_reason: accommodation
                .rejection_reason
                .clone()
                .filter(|reason| !reason.trim().is_empty()),
            action: CallToAction::new(
                "Edit and resubmit",
                Route::EditProperty(accommodation.id),
            ),
        },
    }
}
