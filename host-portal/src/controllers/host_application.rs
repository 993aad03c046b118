use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use super::{CallToAction, LoadState, SessionEpoch, StatusView, Tone, ViewSlot};
use crate::error::ClientError;
use crate::models::host_request::{HostApplication, HostApplicationForm, HostApplicationStatus};
use crate::models::timestamp;
use crate::routes::Route;
use crate::services::gateway::{ApiGateway, ApiRequest};

const STATUS_PATH: &str = "/api/host-requests/status";
const APPLY_PATH: &str = "/api/host-requests/apply";

/// Where opening the application form leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEntry {
    /// Show the form, with the previous (rejected) application if any.
    Form { previous: Option<HostApplication> },
    /// An application is pending or approved; show its status instead.
    StatusPage,
    /// The current status could not be loaded.
    Unavailable(String),
}

pub struct HostApplicationController {
    gateway: Arc<ApiGateway>,
    epoch: SessionEpoch,
    slot: ViewSlot<HostApplication>,
}

impl HostApplicationController {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            epoch: SessionEpoch::new(Arc::clone(gateway.session())),
            gateway,
            slot: ViewSlot::new(),
        }
    }

    /// Forget the previous user's application once the session changed.
    fn sync(&self) {
        if self.epoch.changed() {
            tracing::debug!("Session changed, dropping cached host application");
            self.slot.invalidate();
        }
    }

    /// The signed-in user's application. No content means none was filed.
    pub async fn fetch_status(&self) -> Result<HostApplication, ClientError> {
        let response = self
            .gateway
            .send(&ApiRequest::get(STATUS_PATH))
            .await?
            .into_result()?;

        if response.is_no_content() {
            return Ok(HostApplication::none());
        }
        response.json()
    }

    /// Fetch into the view slot and return what the page should show.
    /// Only errors that need a fresh login are returned as `Err`.
    pub async fn load_status(&self) -> Result<LoadState<HostApplication>, ClientError> {
        self.sync();
        let ticket = self.slot.issue();
        match self.fetch_status().await {
            Ok(application) => {
                self.slot.commit(ticket, LoadState::Loaded(application));
            }
            Err(e) if e.requires_login() => {
                self.slot.invalidate();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load host application status");
                self.slot.commit(ticket, LoadState::Failed(e.user_message()));
            }
        }
        Ok(self.slot.state())
    }

    pub fn current(&self) -> LoadState<HostApplication> {
        self.sync();
        self.slot.state()
    }

    pub fn known_status(&self) -> Option<HostApplicationStatus> {
        self.current().loaded().map(|application| application.status)
    }

    pub async fn registration_entry(&self) -> Result<RegistrationEntry, ClientError> {
        Ok(registration_entry_for(self.load_status().await?))
    }

    /// Validate and file the application. On success the view shows the new
    /// PENDING application and the caller should navigate to the returned page.
    pub async fn submit(&self, form: HostApplicationForm) -> Result<Route, ClientError> {
        let form = form.normalized();
        form.validate()?;

        let status = match self.known_status() {
            Some(status) => Some(status),
            None => self.load_status().await?.loaded().map(|a| a.status),
        };
        match status {
            Some(HostApplicationStatus::Pending) => {
                return Err(ClientError::Conflict(
                    "Your host application is already awaiting review.".to_string(),
                ));
            }
            Some(HostApplicationStatus::Approved) => {
                return Err(ClientError::Conflict(
                    "Your host application has already been approved.".to_string(),
                ));
            }
            _ => {}
        }

        let request = ApiRequest::post(APPLY_PATH).json(serde_json::to_value(&form)?);
        self.gateway.send(&request).await?.into_result()?;

        tracing::info!("Host application submitted");
        self.slot.set_local(HostApplication {
            status: HostApplicationStatus::Pending,
            submitted_at: Some(Utc::now().naive_utc()),
            business_registration_number: form.business_registration_number,
            phone_number: form.phone_number,
            rejection_reason: None,
        });

        Ok(Route::HostApplicationStatus)
    }
}

/// Where the application form leads for a given load result. Only a loaded
/// NONE or REJECTED application opens the form.
fn registration_entry_for(state: LoadState<HostApplication>) -> RegistrationEntry {
    match state {
        LoadState::Loaded(application) if application.status.accepts_submission() => {
            let previous =
                (application.status == HostApplicationStatus::Rejected).then_some(application);
            RegistrationEntry::Form { previous }
        }
        LoadState::Loaded(_) => RegistrationEntry::StatusPage,
        LoadState::Failed(message) => RegistrationEntry::Unavailable(message),
        LoadState::Loading => RegistrationEntry::Unavailable(
            "Your application status is still loading. Please try again.".to_string(),
        ),
    }
}

pub fn status_view(application: &HostApplication) -> StatusView {
    let submitted = application
        .submitted_at
        .as_ref()
        .map(|at| ("Submitted on", timestamp::format_date(at)));

    match application.status {
        HostApplicationStatus::None => StatusView {
            tone: Tone::Neutral,
            title: "Host application".to_string(),
            message: "You have not applied to become a host yet.".to_string(),
            details: Vec::new(),
            rejection_reason: None,
            action: CallToAction::new("Apply to become a host", Route::HostRegistration),
        },
        HostApplicationStatus::Pending => StatusView {
            tone: Tone::Waiting,
            title: "Application awaiting approval".to_string(),
            message: "Your host application has been received and is waiting for an \
                      administrator's decision."
                .to_string(),
            details: submitted.into_iter().collect(),
            rejection_reason: None,
            action: CallToAction::new("Back to home", Route::Home),
        },
        HostApplicationStatus::Approved => StatusView {
            tone: Tone::Success,
            title: "You are now a host!".to_string(),
            message: "Your host application was approved. You can now register \
                      accommodations."
                .to_string(),
            details: submitted.into_iter().collect(),
            rejection_reason: None,
            action: CallToAction::new("Register an accommodation", Route::RegisterProperty),
        },
        HostApplicationStatus::Rejected => StatusView {
            tone: Tone::Rejected,
            title: "Application rejected".to_string(),
            message: "Your host application was rejected. You may correct it and apply \
                      again."
                .to_string(),
            details: submitted.into_iter().collect(),
            rejection_reason: application
                .rejection_reason
                .clone()
                .filter(|reason| !reason.trim().is_empty()),
            action: CallToAction::new("Apply again", Route::HostRegistration),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(status: HostApplicationStatus) -> HostApplication {
        HostApplication {
            status,
            submitted_at: timestamp::parse("2025-04-02T10:15:00").ok(),
            rejection_reason: Some("registration number does not match".into()),
            ..HostApplication::none()
        }
    }

    #[test]
    fn form_opens_only_for_loaded_none_or_rejected() {
        assert_eq!(
            registration_entry_for(LoadState::Loaded(HostApplication::none())),
            RegistrationEntry::Form { previous: None }
        );
        assert!(matches!(
            registration_entry_for(LoadState::Loaded(application(HostApplicationStatus::Rejected))),
            RegistrationEntry::Form { previous: Some(_) }
        ));
        assert_eq!(
            registration_entry_for(LoadState::Loaded(application(HostApplicationStatus::Pending))),
            RegistrationEntry::StatusPage
        );
        assert!(matches!(
            registration_entry_for(LoadState::Loading),
            RegistrationEntry::Unavailable(_)
        ));
        assert_eq!(
            registration_entry_for(LoadState::Failed("offline".into())),
            RegistrationEntry::Unavailable("offline".into())
        );
    }

    #[test]
    fn pending_view_shows_submission_date() {
        let view = status_view(&application(HostApplicationStatus::Pending));
        assert_eq!(view.tone, Tone::Waiting);
        assert_eq!(view.details, vec![("Submitted on", "2025-04-02".to_string())]);
        assert_eq!(view.rejection_reason, None);
    }

    #[test]
    fn approved_view_leads_to_accommodation_registration() {
        let view = status_view(&application(HostApplicationStatus::Approved));
        assert_eq!(view.action.route, Route::RegisterProperty);
    }

    #[test]
    fn rejected_view_shows_reason_and_resubmit() {
        let view = status_view(&application(HostApplicationStatus::Rejected));
        assert_eq!(
            view.rejection_reason.as_deref(),
            Some("registration number does not match")
        );
        assert_eq!(view.action.route, Route::HostRegistration);

        let mut blank = application(HostApplicationStatus::Rejected);
        blank.rejection_reason = Some("  ".into());
        assert_eq!(status_view(&blank).rejection_reason, None);
    }

    #[test]
    fn none_view_offers_to_apply() {
        let view = status_view(&HostApplication::none());
        assert!(view.details.is_empty());
        assert_eq!(view.action.route, Route::HostRegistration);
    }
}
