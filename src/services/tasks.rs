use serde_json::json;
use std::sync::Arc;

use crate::api_client::{read_ack, read_data, NO_QUERY};
use crate::auth::AuthPipeline;
use crate::error::Result;
use crate::models::{NewTask, Task, TaskFilter, TaskStatus, TaskUpdate};

#[derive(Clone)]
pub struct TaskService {
    pipeline: Arc<AuthPipeline>,
}

impl TaskService {
    pub fn new(pipeline: Arc<AuthPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let response = self.pipeline.get("/tasks", filter).await?;
        read_data(response).await
    }

    pub async fn get(&self, task_id: &str) -> Result<Task> {
        let response = self
            .pipeline
            .get(&format!("/tasks/{}", task_id), NO_QUERY)
            .await?;
        read_data(response).await
    }

    pub async fn create(&self, task: &NewTask) -> Result<Task> {
        tracing::debug!(title = %task.title, "Creating task");
        let response = self.pipeline.post("/tasks", task).await?;
        read_data(response).await
    }

    pub async fn update(&self, task_id: &str, update: &TaskUpdate) -> Result<Task> {
        let response = self
            .pipeline
            .put(&format!("/tasks/{}", task_id), update)
            .await?;
        read_data(response).await
    }

    pub async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        let response = self
            .pipeline
            .put(
                &format!("/tasks/{}/status", task_id),
                &json!({ "status": status }),
            )
            .await?;
        read_data(response).await
    }

    pub async fn delete(&self, task_id: &str) -> Result<()> {
        let response = self
            .pipeline
            .delete(&format!("/tasks/{}", task_id))
            .await?;
        read_ack(response).await.map(|_| ())
    }
}
