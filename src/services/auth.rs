use serde_json::json;
use std::sync::Arc;

use crate::api_client::{read_ack, read_data, NO_QUERY};
use crate::auth::endpoints::{
    FORGOT_PASSWORD_PATH, LOGIN_PATH, REGISTER_PATH, RESET_PASSWORD_PATH, VERIFY_TOKEN_PATH,
};
use crate::auth::{AuthPayload, AuthPipeline, LoginRequest, RegisterRequest, SessionEvent};
use crate::error::Result;
use crate::models::User;
use crate::storage::Session;

/// Login, registration, password recovery and logout
#[derive(Clone)]
pub struct AuthService {
    pipeline: Arc<AuthPipeline>,
}

impl AuthService {
    pub fn new(pipeline: Arc<AuthPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        tracing::info!(email = %email, "Logging in");
        let response = self
            .pipeline
            .post(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        let payload: AuthPayload = read_data(response).await?;
        self.start_session(payload)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        tracing::info!(email = %email, "Registering account");
        let response = self
            .pipeline
            .post(
                REGISTER_PATH,
                &RegisterRequest {
                    name,
                    email,
                    password,
                },
            )
            .await?;
        let payload: AuthPayload = read_data(response).await?;
        self.start_session(payload)
    }

    /// Ask the backend to send a password reset email
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>> {
        let response = self
            .pipeline
            .post(FORGOT_PASSWORD_PATH, &json!({ "email": email }))
            .await?;
        read_ack(response).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<Option<String>> {
        let response = self
            .pipeline
            .post(
                RESET_PASSWORD_PATH,
                &json!({ "token": token, "password": password }),
            )
            .await?;
        read_ack(response).await
    }

    /// Check the stored token with the backend and refresh the cached user
    pub async fn verify_token(&self) -> Result<User> {
        let response = self.pipeline.get(VERIFY_TOKEN_PATH, NO_QUERY).await?;
        let user: User = read_data(response).await?;
        self.pipeline.store().set_user(&user)?;
        Ok(user)
    }

    /// Drop the local session; there is no server-side logout
    pub fn logout(&self) -> Result<()> {
        self.pipeline.store().clear_all()?;
        self.pipeline.emit(SessionEvent::LoggedOut);
        tracing::info!("Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.pipeline.store().get_access_token().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.pipeline.store().get_user()
    }

    fn start_session(&self, payload: AuthPayload) -> Result<User> {
        let AuthPayload {
            user,
            access_token,
            refresh_token,
        } = payload;

        self.pipeline.store().save_session(&Session {
            access_token,
            refresh_token,
            user: Some(user.clone()),
        })?;

        tracing::info!(user_id = %user.id, "Session started");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::services::test_support::signed_in;
    use mockito::Matcher;

    const AUTH_BODY: &str = r#"{
        "success": true,
        "data": {
            "user": {"id": "u1", "name": "Ada", "email": "ada@example.com"},
            "accessToken": "a-new",
            "refreshToken": "r-new"
        }
    }"#;

    #[tokio::test]
    async fn test_login_saves_session() {
        let (mut server, pipeline) = signed_in().await;
        pipeline.store().clear_all().unwrap();

        let mock = server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::Json(
                json!({"email": "ada@example.com", "password": "hunter2"}),
            ))
            .with_status(200)
            .with_body(AUTH_BODY)
            .expect(1)
            .create_async()
            .await;

        let service = AuthService::new(pipeline.clone());
        let user = service.login("ada@example.com", "hunter2").await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.name, "Ada");
        assert!(service.is_authenticated());
        assert_eq!(pipeline.store().get_refresh_token().as_deref(), Some("r-new"));
        assert_eq!(service.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_register_saves_session() {
        let (mut server, pipeline) = signed_in().await;
        let _mock = server
            .mock("POST", "/api/auth/register")
            .with_status(201)
            .with_body(AUTH_BODY)
            .create_async()
            .await;

        let service = AuthService::new(pipeline.clone());
        service
            .register("Ada", "ada@example.com", "hunter2")
            .await
            .unwrap();

        assert_eq!(pipeline.store().get_access_token().as_deref(), Some("a-new"));
    }

    #[tokio::test]
    async fn test_login_failure_keeps_store_untouched() {
        let (mut server, pipeline) = signed_in().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_body(r#"{"success": false, "message": "Invalid credentials"}"#)
            .create_async()
            .await;

        let service = AuthService::new(pipeline.clone());
        let err = service.login("ada@example.com", "wrong").await.unwrap_err();

        assert_eq!(
            err,
            ClientError::Api {
                message: "Invalid credentials".to_string()
            }
        );
        assert_eq!(pipeline.store().get_access_token().as_deref(), Some("access"));
    }

    #[tokio::test]
    async fn test_verify_token_caches_user() {
        let (mut server, pipeline) = signed_in().await;
        let _mock = server
            .mock("GET", "/api/auth/verify-token")
            .match_header("authorization", "Bearer access")
            .with_status(200)
            .with_body(r#"{"success": true, "data": {"id": "u1", "name": "Ada", "email": "a@b.c"}}"#)
            .create_async()
            .await;

        let service = AuthService::new(pipeline.clone());
        let user = service.verify_token().await.unwrap();

        assert_eq!(pipeline.store().get_user(), Some(user));
    }

    #[tokio::test]
    async fn test_password_recovery() {
        let (mut server, pipeline) = signed_in().await;
        let _forgot = server
            .mock("POST", "/api/auth/forgot-password")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"success": true, "message": "Check your inbox"}"#)
            .create_async()
            .await;
        let _reset = server
            .mock("POST", "/api/auth/reset-password")
            .match_body(Matcher::Json(json!({"token": "t1", "password": "new-pw"})))
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let service = AuthService::new(pipeline);
        assert_eq!(
            service.forgot_password("a@b.c").await.unwrap().as_deref(),
            Some("Check your inbox")
        );
        assert_eq!(service.reset_password("t1", "new-pw").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_and_notifies() {
        let (_server, pipeline) = signed_in().await;
        let mut events = pipeline.subscribe();

        let service = AuthService::new(pipeline.clone());
        service.logout().unwrap();

        assert!(!service.is_authenticated());
        assert!(pipeline.store().get_refresh_token().is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }
}
