// Token refresh logic

use crate::api_client::ApiClient;
use crate::error::ClientError;
use crate::storage::TokenStore;

use super::endpoints::REFRESH_TOKEN_PATH;
use super::types::{RefreshRequest, RefreshResponse};

/// Result of one refresh attempt, shared by every request waiting on it
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// New access token, already persisted
    Refreshed(String),
    /// Endpoint answered without a usable token
    Rejected,
    /// Refresh call failed
    Failed(ClientError),
}

/// Exchange the refresh token for a new access token
///
/// Talks to the API client directly so the refresh call never re-enters
/// the auth pipeline. Persists the new access token (and a rotated refresh
/// token, if the backend sends one) before returning.
pub async fn refresh_access_token(
    api: &ApiClient,
    store: &TokenStore,
    refresh_token: String,
) -> RefreshOutcome {
    tracing::info!("Refreshing access token...");

    let request = RefreshRequest { refresh_token };
    let response = match api.post(REFRESH_TOKEN_PATH, &request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Token refresh request failed");
            return RefreshOutcome::Failed(e);
        }
    };

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read token refresh response");
            return RefreshOutcome::Failed(ClientError::from_transport(&e));
        }
    };

    let parsed: RefreshResponse = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Token refresh response is not valid JSON");
            return RefreshOutcome::Rejected;
        }
    };

    if !parsed.success {
        tracing::warn!("Token refresh was rejected by the backend");
        return RefreshOutcome::Rejected;
    }

    let Some(data) = parsed.data else {
        tracing::warn!("Token refresh response does not contain data");
        return RefreshOutcome::Rejected;
    };

    let access_token = match data.access_token {
        Some(token) if !token.is_empty() => token,
        _ => {
            tracing::warn!("Token refresh response does not contain accessToken");
            return RefreshOutcome::Rejected;
        }
    };

    if let Err(e) = store.set_access_token(&access_token) {
        tracing::error!(error = %e, "Failed to persist refreshed access token");
        return RefreshOutcome::Failed(e);
    }

    if let Some(rotated) = data.refresh_token.filter(|t| !t.is_empty()) {
        if let Err(e) = store.set_refresh_token(&rotated) {
            tracing::error!(error = %e, "Failed to persist rotated refresh token");
            return RefreshOutcome::Failed(e);
        }
        tracing::debug!("Refresh token rotated");
    }

    tracing::info!("Access token refreshed");
    RefreshOutcome::Refreshed(access_token)
}
