use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::models::session::Role;

#[derive(Debug, Default, Deserialize)]
pub struct JwtClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "auth")]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode JWT claims without validation.
///
/// The portal never trusts these claims for authorization; the backend
/// re-checks every call. They only fill in a role the token endpoint did not
/// report.
pub fn decode_jwt_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: JwtClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

/// Role for a freshly issued token: the explicit `role` field of the token
/// response wins, then the token's own `role` claim.
pub fn resolve_role(reported: Option<&str>, access_token: &str) -> Option<Role> {
    reported.and_then(Role::parse).or_else(|| {
        decode_jwt_claims(access_token)
            .ok()
            .and_then(|claims| claims.role)
            .and_then(|role| Role::parse(&role))
    })
}
