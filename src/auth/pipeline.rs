use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use crate::api_client::ApiClient;
use crate::error::{ClientError, Result};
use crate::storage::TokenStore;

use super::endpoints;
use super::refresh::{refresh_access_token, RefreshOutcome};
use super::types::{ExpiryReason, RequestState, SessionEvent};

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

const EVENT_CAPACITY: usize = 16;

/// Authenticated request pipeline
///
/// Decorates outgoing requests with the stored bearer token and recovers
/// from a 401 with at most one refresh and one replay. Concurrent 401s share
/// a single in-flight refresh.
///
/// Session termination is reported through [`SessionEvent`]s; the pipeline
/// never navigates on its own.
pub struct AuthPipeline {
    /// Undecorated transport, also used for the refresh call
    api: ApiClient,

    /// Session storage
    store: Arc<TokenStore>,

    /// Session lifecycle notifications
    events: broadcast::Sender<SessionEvent>,

    /// Refresh currently in flight, if any
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl AuthPipeline {
    pub fn new(api: ApiClient, store: Arc<TokenStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            store,
            events,
            in_flight: Mutex::new(None),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Receive session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // === Authenticated verbs ===

    pub async fn get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Response> {
        self.execute(self.api.build_get(path, query)?).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.execute(self.api.build_post(path, body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.execute(self.api.build_put(path, body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.execute(self.api.build_delete(path)?).await
    }

    /// Initial state for a request to `url` given the stored token
    pub fn initial_state(url: &reqwest::Url, token: Option<&str>) -> RequestState {
        if !endpoints::is_public(url) && token.is_some() {
            RequestState::AuthenticatedSend
        } else {
            RequestState::UnauthenticatedPassthrough
        }
    }

    /// Send a request through the pipeline
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let url = request.url().clone();
        let public = endpoints::is_public(&url);

        let sent_token = if public {
            None
        } else {
            self.store.get_access_token()
        };

        let state = Self::initial_state(&url, sent_token.as_deref());
        if let Some(ref token) = sent_token {
            decorate(&mut request, token)?;
        }
        tracing::debug!(request_id = %request_id, state = ?state, url = %url, "Dispatching request");

        // Keep a copy for the replay before the original is consumed
        let replay = request.try_clone();

        let err = match self.api.send(request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if !err.is_unauthorized() || endpoints::is_refresh(&url) {
            return Err(err);
        }

        let Some(refresh_token) = self.store.get_refresh_token() else {
            // Nothing left to terminate: a failed sign-in, or another request already ended the session
            if self.store.get_access_token().is_none() && (public || sent_token.is_some()) {
                tracing::debug!(request_id = %request_id, "Received 401 with no session to terminate");
                return Err(err);
            }
            tracing::warn!(request_id = %request_id, "Received 401 without a refresh token");
            terminate_session(&self.store, &self.events, ExpiryReason::MissingRefreshToken);
            return Err(err);
        };

        let Some(mut replay) = replay else {
            tracing::warn!(request_id = %request_id, "Request body is not cloneable, cannot replay");
            return Err(err);
        };

        // Another request may have refreshed while this one was in flight
        let current = self.store.get_access_token();
        let stale = !public
            && matches!(&current, Some(cur) if sent_token.as_deref() != Some(cur.as_str()));

        let token = match current {
            Some(cur) if stale => {
                tracing::debug!(request_id = %request_id, "Access token changed since send, skipping refresh");
                cur
            }
            _ => {
                tracing::debug!(
                    request_id = %request_id,
                    state = ?RequestState::RefreshInFlight,
                    "Received 401, refreshing access token"
                );
                match self.refresh(refresh_token).await {
                    RefreshOutcome::Refreshed(token) => token,
                    RefreshOutcome::Rejected => {
                        tracing::debug!(request_id = %request_id, state = ?RequestState::SessionTerminated, "Refresh rejected");
                        return Err(err);
                    }
                    RefreshOutcome::Failed(refresh_err) => {
                        tracing::debug!(request_id = %request_id, state = ?RequestState::SessionTerminated, "Refresh failed");
                        return Err(refresh_err);
                    }
                }
            }
        };

        if !public {
            decorate(&mut replay, &token)?;
        }
        tracing::debug!(request_id = %request_id, state = ?RequestState::Replay, url = %url, "Replaying request");

        // The replay result is final, even another 401
        self.api.send(replay).await
    }

    /// Join the in-flight refresh or start a new one
    async fn refresh(&self, refresh_token: String) -> RefreshOutcome {
        let shared = {
            let mut slot = self.in_flight.lock().await;
            // A finished refresh left behind by a cancelled waiter is never joined
            match slot.as_ref() {
                Some(fut) if fut.peek().is_none() => {
                    tracing::debug!("Joining in-flight token refresh");
                    fut.clone()
                }
                _ => {
                    let fut = self.start_refresh(refresh_token);
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let outcome = shared.await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|fut| fut.peek().is_some()) {
            *slot = None;
        }

        outcome
    }

    fn start_refresh(&self, refresh_token: String) -> SharedRefresh {
        let api = self.api.clone();
        let store = Arc::clone(&self.store);
        let events = self.events.clone();

        async move {
            let outcome = refresh_access_token(&api, &store, refresh_token).await;
            match outcome {
                RefreshOutcome::Refreshed(_) => {}
                RefreshOutcome::Rejected => {
                    terminate_session(&store, &events, ExpiryReason::RefreshRejected)
                }
                RefreshOutcome::Failed(_) => {
                    terminate_session(&store, &events, ExpiryReason::RefreshFailed)
                }
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

/// Set `Authorization: Bearer <token>`
fn decorate(request: &mut Request, token: &str) -> Result<()> {
    let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
        ClientError::Internal(format!("Access token is not a valid header value: {}", e))
    })?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

/// Clear the stored session and announce it
fn terminate_session(
    store: &TokenStore,
    events: &broadcast::Sender<SessionEvent>,
    reason: ExpiryReason,
) {
    tracing::warn!(reason = ?reason, "Session terminated, login required");
    if let Err(e) = store.clear_all() {
        tracing::error!(error = %e, "Failed to clear session");
    }
    let _ = events.send(SessionEvent::Expired { reason });
}
