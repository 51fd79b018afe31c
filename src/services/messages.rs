use std::sync::Arc;

use crate::api_client::{read_ack, read_data, NO_QUERY};
use crate::auth::AuthPipeline;
use crate::error::Result;
use crate::models::{Conversation, Message, MessagePage, NewMessage, UnreadCount};

#[derive(Clone)]
pub struct MessageService {
    pipeline: Arc<AuthPipeline>,
}

impl MessageService {
    pub fn new(pipeline: Arc<AuthPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let response = self
            .pipeline
            .get("/messages/conversations", NO_QUERY)
            .await?;
        read_data(response).await
    }

    pub async fn get_messages(
        &self,
        conversation_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage> {
        let path = format!("/messages/conversations/{}/messages", conversation_id);
        let response = self
            .pipeline
            .get(&path, &[("page", page), ("limit", limit)])
            .await?;
        read_data(response).await
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        let response = self.pipeline.post("/messages", message).await?;
        read_data(response).await
    }

    pub async fn mark_as_read(&self, message_id: &str) -> Result<()> {
        let path = format!("/messages/{}/read", message_id);
        let response = self.pipeline.put(&path, &serde_json::json!({})).await?;
        read_ack(response).await.map(|_| ())
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<()> {
        let response = self
            .pipeline
            .delete(&format!("/messages/{}", message_id))
            .await?;
        read_ack(response).await.map(|_| ())
    }

    pub async fn unread_count(&self) -> Result<u32> {
        let response = self.pipeline.get("/messages/unread-count", NO_QUERY).await?;
        let count: UnreadCount = read_data(response).await?;
        Ok(count.count)
    }
}
