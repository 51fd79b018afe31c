// Authentication types

use serde::{Deserialize, Serialize};

use crate::models::User;

/// Refresh endpoint request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `data` of a refresh response
///
/// Both fields are optional on the wire so a malformed payload is treated
/// as a rejected refresh instead of a decode error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Refresh response envelope
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<RefreshData>,
}

/// `data` returned by login and registration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Login request body
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Registration request body
#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Why a session was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// 401 with no refresh token stored
    MissingRefreshToken,
    /// Refresh endpoint answered but reported failure or omitted the token
    RefreshRejected,
    /// Refresh call itself failed
    RefreshFailed,
}

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The pipeline terminated the session; callers should re-authenticate
    Expired { reason: ExpiryReason },
    /// The user logged out explicitly
    LoggedOut,
}

/// Per-request pipeline state, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    UnauthenticatedPassthrough,
    AuthenticatedSend,
    RefreshInFlight,
    Replay,
    SessionTerminated,
}
