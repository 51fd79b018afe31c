// Data models for the event planner API

pub mod envelope;
pub mod message;
pub mod rsvp;
pub mod task;
pub mod user;

pub use envelope::ApiEnvelope;
pub use message::{Conversation, Message, MessagePage, NewMessage, UnreadCount};
pub use rsvp::{NewRsvp, Rsvp, RsvpStatus, RsvpSummary, RsvpUpdate};
pub use task::{NewTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};
pub use user::{ProfileUpdate, User};
