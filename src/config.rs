use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{RsvpStatus, TaskPriority, TaskStatus};
use crate::navigation::DEFAULT_LOGIN_ROUTE;
use crate::storage::DEFAULT_PREFIX;

/// Event planner client - messaging, RSVPs and tasks from the terminal
#[derive(Parser, Debug)]
#[command(name = "planner", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the event planner API
    #[arg(
        short = 'u',
        long,
        env = "PLANNER_API_URL",
        default_value = "http://localhost:5000/api"
    )]
    pub api_url: String,

    /// Path to the session storage file
    #[arg(short = 's', long, env = "PLANNER_STORAGE_FILE")]
    pub storage_file: Option<String>,

    /// Namespace prefix for stored keys
    #[arg(long, env = "PLANNER_STORAGE_PREFIX", default_value = DEFAULT_PREFIX)]
    pub storage_prefix: String,

    /// Route to navigate to when the session ends
    #[arg(long, env = "PLANNER_LOGIN_ROUTE", default_value = DEFAULT_LOGIN_ROUTE)]
    pub login_route: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in; the password is prompted for
    Login {
        #[arg(short, long)]
        email: String,
    },
    /// Create an account; the password is prompted for
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
    },
    /// Request a password reset email
    ForgotPassword { email: String },
    /// Set a new password using a reset token
    ResetPassword { token: String },
    /// Drop the local session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List conversations
    Conversations,
    /// Show one page of a conversation
    Messages {
        conversation_id: String,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Send a message to a conversation
    #[command(name = "send")]
    SendMessage {
        conversation_id: String,
        content: String,
    },
    /// Number of unread messages
    Unread,
    /// List RSVPs for an event
    Rsvps { event_id: String },
    /// Respond to an event invitation
    Rsvp {
        event_id: String,
        /// going, maybe or not-going
        #[arg(long)]
        status: RsvpStatus,
        #[arg(long, default_value = "0")]
        guests: u32,
        #[arg(long)]
        note: Option<String>,
    },
    /// Head counts for an event
    RsvpSummary { event_id: String },
    /// List tasks
    Tasks {
        #[arg(long)]
        event_id: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
    },
    /// Create a task
    TaskAdd {
        title: String,
        #[arg(long)]
        event_id: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        /// RFC 3339 due date, e.g. 2025-06-01T09:00:00Z
        #[arg(long)]
        due: Option<DateTime<Utc>>,
    },
    /// Move a task to another status
    TaskStatus { task_id: String, status: TaskStatus },
    /// Delete a task
    TaskDelete { task_id: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_base_url: String,

    // Session storage
    pub storage_file: PathBuf,
    pub storage_prefix: String,
    pub login_route: String,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let storage_file = match args.storage_file.as_deref() {
            Some(path) => expand_tilde(path),
            None => default_storage_file()
                .context("Cannot determine a data directory, set PLANNER_STORAGE_FILE")?,
        };

        Ok(Config {
            api_base_url: args.api_url.clone(),
            storage_file,
            storage_prefix: args.storage_prefix.clone(),
            login_route: args.login_route.clone(),

            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            log_level: args.log_level.clone(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_base_url)
            .with_context(|| format!("PLANNER_API_URL is not a valid URL: {}", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("PLANNER_API_URL must use http or https: {}", self.api_base_url);
        }

        if self.http_request_timeout == 0 || self.http_connect_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }

        if self.storage_prefix.is_empty() {
            anyhow::bail!("PLANNER_STORAGE_PREFIX cannot be empty");
        }

        Ok(())
    }
}

/// Platform data dir, e.g. ~/.local/share/event-planner/storage.sqlite3
fn default_storage_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("event-planner").join("storage.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
