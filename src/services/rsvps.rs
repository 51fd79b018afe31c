use std::sync::Arc;

use crate::api_client::{read_ack, read_data, NO_QUERY};
use crate::auth::AuthPipeline;
use crate::error::Result;
use crate::models::{NewRsvp, Rsvp, RsvpSummary, RsvpUpdate};

#[derive(Clone)]
pub struct RsvpService {
    pipeline: Arc<AuthPipeline>,
}

impl RsvpService {
    pub fn new(pipeline: Arc<AuthPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn list_for_event(&self, event_id: &str) -> Result<Vec<Rsvp>> {
        let response = self
            .pipeline
            .get(&format!("/rsvps/event/{}", event_id), NO_QUERY)
            .await?;
        read_data(response).await
    }

    /// RSVPs of the signed-in user across all events
    pub async fn my_rsvps(&self) -> Result<Vec<Rsvp>> {
        let response = self.pipeline.get("/rsvps/me", NO_QUERY).await?;
        read_data(response).await
    }

    pub async fn respond(&self, rsvp: &NewRsvp) -> Result<Rsvp> {
        let response = self.pipeline.post("/rsvps", rsvp).await?;
        read_data(response).await
    }

    pub async fn update(&self, rsvp_id: &str, update: &RsvpUpdate) -> Result<Rsvp> {
        let response = self
            .pipeline
            .put(&format!("/rsvps/{}", rsvp_id), update)
            .await?;
        read_data(response).await
    }

    pub async fn cancel(&self, rsvp_id: &str) -> Result<()> {
        let response = self
            .pipeline
            .delete(&format!("/rsvps/{}", rsvp_id))
            .await?;
        read_ack(response).await.map(|_| ())
    }

    pub async fn summary(&self, event_id: &str) -> Result<RsvpSummary> {
        let response = self
            .pipeline
            .get(&format!("/rsvps/event/{}/summary", event_id), NO_QUERY)
            .await?;
        read_data(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RsvpStatus;
    use crate::services::test_support::signed_in;
    use mockito::Matcher;
    use serde_json::json;

    const RSVP: &str = r#"{"success": true, "data": {
        "id": "r1", "eventId": "e1", "userId": "u1",
        "status": "maybe", "guestCount": 1
    }}"#;

    #[tokio::test]
    async fn test_respond() {
        let (mut server, pipeline) = signed_in().await;
        let _mock = server
            .mock("POST", "/api/rsvps")
            .match_body(Matcher::Json(
                json!({"eventId": "e1", "status": "maybe", "guestCount": 1}),
            ))
            .with_status(201)
            .with_body(RSVP)
            .create_async()
            .await;

        let rsvp = RsvpService::new(pipeline)
            .respond(&NewRsvp {
                event_id: "e1".to_string(),
                status: RsvpStatus::Maybe,
                guest_count: 1,
                note: None,
            })
            .await
            .unwrap();

        assert_eq!(rsvp.status, RsvpStatus::Maybe);
        assert_eq!(rsvp.guest_count, 1);
    }

    #[tokio::test]
    async fn test_update_sends_only_changes() {
        let (mut server, pipeline) = signed_in().await;
        let mock = server
            .mock("PUT", "/api/rsvps/r1")
            .match_body(Matcher::Json(json!({"status": "maybe"})))
            .with_status(200)
            .with_body(RSVP)
            .expect(1)
            .create_async()
            .await;

        RsvpService::new(pipeline)
            .update(
                "r1",
                &RsvpUpdate {
                    status: Some(RsvpStatus::Maybe),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_event_listing_and_summary() {
        let (mut server, pipeline) = signed_in().await;
        let _list = server
            .mock("GET", "/api/rsvps/event/e1")
            .with_status(200)
            .with_body(r#"{"success": true, "data": []}"#)
            .create_async()
            .await;
        let _summary = server
            .mock("GET", "/api/rsvps/event/e1/summary")
            .with_status(200)
            .with_body(
                r#"{"success": true, "data": {"going": 12, "maybe": 3, "notGoing": 1, "totalGuests": 18}}"#,
            )
            .create_async()
            .await;

        let service = RsvpService::new(pipeline);
        assert!(service.list_for_event("e1").await.unwrap().is_empty());
        assert_eq!(
            service.summary("e1").await.unwrap(),
            RsvpSummary {
                going: 12,
                maybe: 3,
                not_going: 1,
                total_guests: 18
            }
        );
    }

    #[tokio::test]
    async fn test_my_rsvps_and_cancel() {
        let (mut server, pipeline) = signed_in().await;
        let _mine = server
            .mock("GET", "/api/rsvps/me")
            .with_status(200)
            .with_body(
                r#"{"success": true, "data": [{"id": "r1", "eventId": "e1", "userId": "u1", "status": "going"}]}"#,
            )
            .create_async()
            .await;
        let cancel = server
            .mock("DELETE", "/api/rsvps/r1")
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let service = RsvpService::new(pipeline);
        let mine = service.my_rsvps().await.unwrap();
        assert_eq!(mine[0].status, RsvpStatus::Going);

        service.cancel("r1").await.unwrap();
        cancel.assert_async().await;
    }
}
