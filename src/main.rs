use anyhow::{Context, Result};
use dialoguer::Password;
use serde::Serialize;
use std::sync::Arc;

use event_planner_client::{
    api_client::ApiClient,
    auth::{AuthPipeline, SessionEvent},
    config::{Command, Config},
    models::{NewMessage, NewRsvp, NewTask, TaskFilter},
    navigation::LoginRedirect,
    services::Services,
    storage::TokenStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(api = %config.api_base_url, storage = %config.storage_file.display(), "Starting");

    let store = Arc::new(TokenStore::open(
        &config.storage_file,
        &config.storage_prefix,
    )?);

    let api = ApiClient::new(
        &config.api_base_url,
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    let pipeline = Arc::new(AuthPipeline::new(api, store));
    let redirect = LoginRedirect::new(
        config.login_route.clone(),
        |route: &str, event: &SessionEvent| match event {
            SessionEvent::Expired { reason } => {
                tracing::warn!(reason = ?reason, route = %route, "Session expired");
                eprintln!("Session expired. Run `planner login` to sign in again.");
            }
            SessionEvent::LoggedOut => {
                tracing::debug!(route = %route, "Logged out");
            }
        },
    )
    .spawn(pipeline.subscribe());

    let services = Services::new(Arc::clone(&pipeline));
    let result = run(&services, command).await;

    // Closing the pipeline closes the event channel and lets the observer drain
    drop(services);
    drop(pipeline);
    redirect.await.context("Login redirect task failed")?;

    result
}

async fn run(services: &Services, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => {
            let password = prompt_password("Password")?;
            let user = services.auth.login(&email, &password).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::Register { name, email } => {
            let password = Password::new()
                .with_prompt("Choose a password")
                .with_confirmation("Repeat password", "Passwords do not match")
                .interact()
                .context("Failed to read password")?;
            let user = services.auth.register(&name, &email, &password).await?;
            println!("Account created for {} <{}>", user.name, user.email);
        }
        Command::ForgotPassword { email } => {
            let message = services.auth.forgot_password(&email).await?;
            println!("{}", message.unwrap_or_else(|| "Reset email requested".to_string()));
        }
        Command::ResetPassword { token } => {
            let password = prompt_password("New password")?;
            let message = services.auth.reset_password(&token, &password).await?;
            println!("{}", message.unwrap_or_else(|| "Password updated".to_string()));
        }
        Command::Logout => {
            services.auth.logout()?;
            println!("Signed out");
        }
        Command::Whoami => {
            if !services.auth.is_authenticated() {
                anyhow::bail!("Not signed in. Run `planner login` first.");
            }
            print_json(&services.users.me().await?)?;
        }
        Command::Conversations => {
            print_json(&services.messages.list_conversations().await?)?;
        }
        Command::Messages {
            conversation_id,
            page,
            limit,
        } => {
            print_json(
                &services
                    .messages
                    .get_messages(&conversation_id, page, limit)
                    .await?,
            )?;
        }
        Command::SendMessage {
            conversation_id,
            content,
        } => {
            let message = NewMessage {
                conversation_id: Some(conversation_id),
                recipient_id: None,
                content,
            };
            print_json(&services.messages.send_message(&message).await?)?;
        }
        Command::Unread => {
            println!("{}", services.messages.unread_count().await?);
        }
        Command::Rsvps { event_id } => {
            print_json(&services.rsvps.list_for_event(&event_id).await?)?;
        }
        Command::Rsvp {
            event_id,
            status,
            guests,
            note,
        } => {
            let rsvp = NewRsvp {
                event_id,
                status,
                guest_count: guests,
                note,
            };
            print_json(&services.rsvps.respond(&rsvp).await?)?;
        }
        Command::RsvpSummary { event_id } => {
            print_json(&services.rsvps.summary(&event_id).await?)?;
        }
        Command::Tasks {
            event_id,
            status,
            priority,
        } => {
            let filter = TaskFilter {
                event_id,
                status,
                priority,
            };
            print_json(&services.tasks.list(&filter).await?)?;
        }
        Command::TaskAdd {
            title,
            event_id,
            priority,
            due,
        } => {
            let task = NewTask {
                title,
                description: None,
                event_id,
                assignee_id: None,
                priority,
                due_date: due,
            };
            print_json(&services.tasks.create(&task).await?)?;
        }
        Command::TaskStatus { task_id, status } => {
            print_json(&services.tasks.set_status(&task_id, status).await?)?;
        }
        Command::TaskDelete { task_id } => {
            services.tasks.delete(&task_id).await?;
            println!("Deleted task {}", task_id);
        }
    }

    Ok(())
}

fn prompt_password(prompt: &str) -> Result<String> {
    let password = Password::new()
        .with_prompt(prompt)
        .interact()
        .context("Failed to read password")?;

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    Ok(password)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
