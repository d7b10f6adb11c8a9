use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::db::Complaint;
use crate::domain::ComplaintStatus;

use super::{not_found, required_text, HotelCore, HotelError, HotelResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ComplaintInput {
    pub customer_id: i64,
    #[serde(default)]
    pub booking_id: Option<i64>,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplaintStatusChange {
    pub status: ComplaintStatus,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl HotelCore {
    pub async fn file_complaint(&self, input: ComplaintInput) -> HotelResult<Complaint> {
        let subject = required_text("subject", &input.subject, 200)?;
        let description = required_text("description", &input.description, 4000)?;
        self.customer(input.customer_id).await?;
        if let Some(booking_id) = input.booking_id {
            let booking = self.booking(booking_id).await?;
            if booking.customer_id != input.customer_id {
                return Err(HotelError::Validation(format!(
                    "booking {booking_id} belongs to another customer"
                )));
            }
        }

        let now = Utc::now();
        let mut complaint = Complaint {
            id: 0,
            customer_id: input.customer_id,
            booking_id: input.booking_id,
            subject,
            description,
            status: ComplaintStatus::Open,
            resolution: None,
            created_at: now,
            updated_at: now,
        };
        complaint.id = self
            .db()
            .complaint_store()
            .create_complaint(&complaint)
            .await?;
        info!(complaint_id = complaint.id, customer_id = complaint.customer_id, "complaint filed");
        Ok(complaint)
    }

    pub async fn complaint(&self, id: i64) -> HotelResult<Complaint> {
        self.db()
            .complaint_store()
            .get_complaint(id)
            .await?
            .ok_or_else(|| not_found("complaint", id))
    }

    pub async fn list_complaints(
        &self,
        status: Option<ComplaintStatus>,
        customer_id: Option<i64>,
    ) -> HotelResult<Vec<Complaint>> {
        Ok(self
            .db()
            .complaint_store()
            .list_complaints(status, customer_id)
            .await?)
    }

    pub async fn change_complaint_status(
        &self,
        id: i64,
        change: ComplaintStatusChange,
    ) -> HotelResult<Complaint> {
        let current = self.complaint(id).await?;
        if !current.status.can_transition_to(change.status) {
            return Err(HotelError::InvalidState(format!(
                "complaint {id} cannot move from {} to {}",
                current.status, change.status
            )));
        }
        let resolution = match change.status {
            ComplaintStatus::Resolved => Some(required_text(
                "resolution",
                change.resolution.as_deref().unwrap_or_default(),
                4000,
            )?),
            _ => None,
        };

        if !self
            .db()
            .complaint_store()
            .transition_complaint(id, current.status, change.status, resolution.as_deref())
            .await?
        {
            return Err(HotelError::InvalidState(format!(
                "complaint {id} changed concurrently"
            )));
        }
        info!(
            complaint_id = id,
            from = %current.status,
            to = %change.status,
            "complaint status changed"
        );
        self.complaint(id).await
    }
}
