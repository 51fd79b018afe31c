// Login redirect observer
// Turns session events into navigation to the login route

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::auth::SessionEvent;

/// Default route shown when the session ends
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Performs client-side navigation
pub trait Navigate: Send + Sync + 'static {
    fn navigate(&self, route: &str, event: &SessionEvent);
}

impl<F> Navigate for F
where
    F: Fn(&str, &SessionEvent) + Send + Sync + 'static,
{
    fn navigate(&self, route: &str, event: &SessionEvent) {
        self(route, event)
    }
}

/// Redirects to the login route whenever the session expires or ends
pub struct LoginRedirect<N> {
    login_route: String,
    navigator: N,
}

impl<N: Navigate> LoginRedirect<N> {
    pub fn new(login_route: impl Into<String>, navigator: N) -> Self {
        Self {
            login_route: login_route.into(),
            navigator,
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// React to a single event
    pub fn handle(&self, event: &SessionEvent) {
        tracing::info!(event = ?event, route = %self.login_route, "Redirecting to login");
        self.navigator.navigate(&self.login_route, event);
    }

    /// Consume events until every sender is gone
    pub async fn run(self, mut events: broadcast::Receiver<SessionEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Login redirect lagged behind session events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    pub fn spawn(self, events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}
