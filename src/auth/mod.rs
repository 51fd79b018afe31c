// Authentication module
// Bearer-token decoration, refresh-on-401 and session lifecycle events

pub mod endpoints;
mod pipeline;
mod refresh;
mod types;

pub use pipeline::AuthPipeline;
pub use refresh::RefreshOutcome;
pub use types::{
    AuthPayload, ExpiryReason, LoginRequest, RefreshRequest, RegisterRequest, RequestState,
    SessionEvent,
};
