// Typed service wrappers over the event planner API
// Every call goes through the auth pipeline

mod auth;
mod messages;
mod rsvps;
mod tasks;
mod users;

pub use auth::AuthService;
pub use messages::MessageService;
pub use rsvps::RsvpService;
pub use tasks::TaskService;
pub use users::UserService;

use std::sync::Arc;

use crate::auth::AuthPipeline;

/// All services sharing one pipeline
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub messages: MessageService,
    pub rsvps: RsvpService,
    pub tasks: TaskService,
    pub users: UserService,
}

impl Services {
    pub fn new(pipeline: Arc<AuthPipeline>) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&pipeline)),
            messages: MessageService::new(Arc::clone(&pipeline)),
            rsvps: RsvpService::new(Arc::clone(&pipeline)),
            tasks: TaskService::new(Arc::clone(&pipeline)),
            users: UserService::new(pipeline),
        }
    }
}
