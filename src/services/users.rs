use std::sync::Arc;

use crate::api_client::{read_data, NO_QUERY};
use crate::auth::AuthPipeline;
use crate::error::Result;
use crate::models::{ProfileUpdate, User};

#[derive(Clone)]
pub struct UserService {
    pipeline: Arc<AuthPipeline>,
}

impl UserService {
    pub fn new(pipeline: Arc<AuthPipeline>) -> Self {
        Self { pipeline }
    }

    /// Fetch the signed-in user and refresh the cached profile
    pub async fn me(&self) -> Result<User> {
        let response = self.pipeline.get("/users/me", NO_QUERY).await?;
        let user: User = read_data(response).await?;
        self.pipeline.store().set_user(&user)?;
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let response = self.pipeline.put("/users/me", update).await?;
        let user: User = read_data(response).await?;
        self.pipeline.store().set_user(&user)?;
        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> Result<User> {
        let response = self
            .pipeline
            .get(&format!("/users/{}", user_id), NO_QUERY)
            .await?;
        read_data(response).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<User>> {
        let response = self.pipeline.get("/users", &[("search", query)]).await?;
        read_data(response).await
    }
}
