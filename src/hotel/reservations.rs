use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::db::{Booking, BookingFilter};
use crate::domain::billing::{nights, room_total_cents};
use crate::domain::{BookingStatus, RoomStatus};

use super::{not_found, HotelCore, HotelError, HotelResult};

const STAFF_CANCELLABLE: &[BookingStatus] = &[
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::CancellationPending,
];

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub customer_id: i64,
    pub room_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i64,
    #[serde(default)]
    pub special_requests: Option<String>,
}

/// Validates a requested stay and returns its length in nights.
pub fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
    max_nights: i64,
) -> HotelResult<i64> {
    if check_in >= check_out {
        return Err(HotelError::Validation(
            "check_out must be after check_in".to_string(),
        ));
    }
    if check_in < today {
        return Err(HotelError::Validation(
            "check_in cannot be in the past".to_string(),
        ));
    }
    let nights = nights(check_in, check_out);
    if nights > max_nights {
        return Err(HotelError::Validation(format!(
            "stays are limited to {max_nights} nights"
        )));
    }
    Ok(nights)
}

pub fn can_request_cancellation(booking: &Booking, today: NaiveDate) -> bool {
    booking.status == BookingStatus::Confirmed && booking.check_in_date > today
}

impl HotelCore {
    pub async fn create_booking(
        &self,
        request: BookingRequest,
        today: NaiveDate,
    ) -> HotelResult<Booking> {
        let nights = validate_stay(
            request.check_in,
            request.check_out,
            today,
            self.settings().max_stay_nights,
        )?;
        self.customer(request.customer_id).await?;
        let room = self.room(request.room_id).await?;
        if room.status == RoomStatus::Maintenance {
            return Err(HotelError::InvalidState(format!(
                "room {} is under maintenance",
                room.number
            )));
        }
        let room_type = self.room_type(room.room_type_id).await?;
        if request.guests < 1 || request.guests > room_type.capacity {
            return Err(HotelError::Validation(format!(
                "room {} takes between 1 and {} guests",
                room.number, room_type.capacity
            )));
        }

        let total_price_cents = room_total_cents(nights, room_type.base_price_cents)
            .ok_or_else(|| HotelError::Validation("booking total is too large".to_string()))?;

        let now = Utc::now();
        let mut booking = Booking {
            id: 0,
            customer_id: request.customer_id,
            room_id: room.id,
            check_in_date: request.check_in,
            check_out_date: request.check_out,
            guests: request.guests,
            total_price_cents,
            status: BookingStatus::Confirmed,
            special_requests: request
                .special_requests
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            created_at: now,
            updated_at: now,
        };
        booking.id = self.db().booking_store().create_booking(&booking).await?;
        info!(
            booking_id = booking.id,
            customer_id = booking.customer_id,
            room_id = booking.room_id,
            nights,
            total_cents = booking.total_price_cents,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn booking(&self, id: i64) -> HotelResult<Booking> {
        self.db()
            .booking_store()
            .get_booking(id)
            .await?
            .ok_or_else(|| not_found("booking", id))
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> HotelResult<Vec<Booking>> {
        Ok(self.db().booking_store().list_bookings(filter).await?)
    }

    pub async fn request_cancellation(&self, id: i64, today: NaiveDate) -> HotelResult<Booking> {
        let booking = self.booking(id).await?;
        if !can_request_cancellation(&booking, today) {
            return Err(HotelError::InvalidState(
                "only confirmed bookings that have not started can be cancelled".to_string(),
            ));
        }
        self.move_booking(
            id,
            &[BookingStatus::Confirmed],
            BookingStatus::CancellationPending,
        )
        .await
    }

    pub async fn resolve_cancellation(&self, id: i64, approve: bool) -> HotelResult<Booking> {
        let next = if approve {
            BookingStatus::Cancelled
        } else {
            BookingStatus::Confirmed
        };
        self.move_booking(id, &[BookingStatus::CancellationPending], next)
            .await
    }

    pub async fn cancel_booking(&self, id: i64) -> HotelResult<Booking> {
        self.move_booking(id, STAFF_CANCELLABLE, BookingStatus::Cancelled)
            .await
    }

    async fn move_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> HotelResult<Booking> {
        let current = self.booking(id).await?;
        if !self
            .db()
            .booking_store()
            .transition_booking(id, from, to)
            .await?
        {
            return Err(HotelError::InvalidState(format!(
                "booking {id} cannot move from {} to {to}",
                current.status
            )));
        }
        info!(booking_id = id, from = %current.status, to = %to, "booking status changed");
        self.booking(id).await
    }
}
