use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp;

/// Host application lifecycle. `None` is the absence of a record (HTTP 204),
/// never something the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostApplicationStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

impl HostApplicationStatus {
    /// Only a missing or rejected application may be (re)submitted.
    pub fn accepts_submission(self) -> bool {
        matches!(
            self,
            HostApplicationStatus::None | HostApplicationStatus::Rejected
        )
    }
}

/// The signed-in user's host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostApplication {
    pub status: HostApplicationStatus,
    #[serde(
        default,
        alias = "requestDate",
        alias = "requestedAt",
        with = "timestamp::option"
    )]
    pub submitted_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub business_registration_number: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl HostApplication {
    pub fn none() -> Self {
        Self {
            status: HostApplicationStatus::None,
            submitted_at: None,
            business_registration_number: String::new(),
            phone_number: String::new(),
            rejection_reason: None,
        }
    }
}

/// Fields of the "become a host" form. Also the JSON body of
/// `POST /api/host-requests/apply`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HostApplicationForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your business registration number"))]
    pub business_registration_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your phone number"))]
    pub phone_number: String,
}

impl HostApplicationForm {
    /// Trim surrounding whitespace so blank input fails the length checks.
    pub fn normalized(self) -> Self {
        Self {
            business_registration_number: self.business_registration_number.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
        }
    }
}

/// A pending host application as listed for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingHostRequest {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub business_registration_number: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(
        default,
        alias = "submittedAt",
        alias = "requestDate",
        with = "timestamp::option"
    )]
    pub requested_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_status_with_request_date_alias() {
        let app: HostApplication = serde_json::from_value(serde_json::json!({
            "status": "PENDING",
            "requestDate": "2025-04-02T10:15:00",
            "businessRegistrationNumber": "123-45-67890",
            "phoneNumber": "010-1234-5678"
        }))
        .unwrap();

        assert_eq!(app.status, HostApplicationStatus::Pending);
        assert_eq!(
            app.submitted_at.map(|t| timestamp::format_date(&t)).as_deref(),
            Some("2025-04-02")
        );
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let decoded = serde_json::from_value::<HostApplication>(serde_json::json!({
            "status": "ON_HOLD"
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn only_none_and_rejected_accept_submission() {
        assert!(HostApplicationStatus::None.accepts_submission());
        assert!(HostApplicationStatus::Rejected.accepts_submission());
        assert!(!HostApplicationStatus::Pending.accepts_submission());
        assert!(!HostApplicationStatus::Approved.accepts_submission());
    }

    #[test]
    fn blank_fields_fail_after_normalizing() {
        let form = HostApplicationForm {
            business_registration_number: "   ".into(),
            phone_number: "010-1234-5678".into(),
        }
        .normalized();

        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("business_registration_number"));
        assert!(!fields.contains_key("phone_number"));
    }
}
