use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Host,
    Admin,
}

impl Role {
    /// Parse a role as issued by the backend: case-insensitive, with or
    /// without the `ROLE_` authority prefix.
    pub fn parse(raw: &str) -> Option<Role> {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.strip_prefix("ROLE_").unwrap_or(&upper) {
            "USER" => Some(Role::User),
            "HOST" => Some(Role::Host),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Host => "HOST",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The browser user's session as persisted by the session store.
///
/// `role` and `identity` only mean something while `access_token` is set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, rename = "email", skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// `None` means anonymous. A token without a resolvable role counts as
    /// [`Role::User`].
    pub fn current_role(&self) -> Option<Role> {
        self.access_token
            .as_ref()
            .map(|_| self.role.unwrap_or(Role::User))
    }

    pub fn identity(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.identity.as_deref()
        } else {
            None
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Session")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("role", &self.role)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Token payload returned by `/api/login` and `/api/refresh`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Login form as posted by the browser.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    pub password: Secret<String>,
}

impl LoginForm {
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }

    /// Field validation plus the password presence check, which the derive
    /// cannot express on a secret.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if self.email.is_empty() {
            errors.add("email", required("Please enter your email"));
        }
        if self.password.expose_secret().is_empty() {
            errors.add("password", required("Please enter your password"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub(crate) fn required(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("required");
    error.message = Some(message.into());
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticated(role: Option<Role>) -> Session {
        Session {
            access_token: Some("access".into()),
            refresh_token: Some("refresh".into()),
            role,
            identity: Some("guest@example.com".into()),
        }
    }

    #[test]
    fn anonymous_iff_no_access_token() {
        let sessions = [
            Session::anonymous(),
            Session {
                role: Some(Role::Admin),
                identity: Some("stale@example.com".into()),
                ..Session::default()
            },
            authenticated(None),
            authenticated(Some(Role::Host)),
        ];

        for session in sessions {
            assert_eq!(
                session.is_authenticated(),
                session.current_role().is_some(),
                "{:?}",
                session
            );
        }
    }

    #[test]
    fn token_without_role_is_user() {
        assert_eq!(authenticated(None).current_role(), Some(Role::User));
    }

    #[test]
    fn identity_hidden_without_token() {
        let session = Session {
            identity: Some("stale@example.com".into()),
            ..Session::default()
        };
        assert_eq!(session.identity(), None);
    }

    #[test]
    fn parses_backend_role_spellings() {
        assert_eq!(Role::parse("HOST"), Some(Role::Host));
        assert_eq!(Role::parse("ROLE_ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse(" user "), Some(Role::User));
        assert_eq!(Role::parse("GUEST"), None);
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", authenticated(Some(Role::Host)));
        assert!(!rendered.contains("access\""));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn session_round_trips_through_camel_case_json() {
        let json = serde_json::json!({
            "accessToken": "a",
            "refreshToken": "r",
            "role": "ADMIN",
            "email": "admin@example.com"
        });
        let session: Session = serde_json::from_value(json).unwrap();
        assert_eq!(session.current_role(), Some(Role::Admin));
        assert_eq!(session.identity(), Some("admin@example.com"));
    }

    #[test]
    fn login_form_requires_email_and_password() {
        let form = LoginForm {
            email: "not-an-email".into(),
            password: Secret::new(String::new()),
        };
        let errors = form.check().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn token_grant_accepts_snake_case() {
        let grant: TokenGrant = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r"
        }))
        .unwrap();
        assert_eq!(grant.access_token, "a");
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));
        assert!(grant.role.is_none());
    }
}
