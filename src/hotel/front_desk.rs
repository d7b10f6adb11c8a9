//! Check-in, in-stay charges and check-out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{Booking, BookingFilter, Stay};
use crate::domain::billing::CheckOutBill;
use crate::domain::BookingStatus;

use super::{required_text, HotelCore, HotelError, HotelResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeRequest {
    pub description: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutQuote {
    pub booking: Booking,
    pub stay: Stay,
    pub bill: CheckOutBill,
}

pub fn is_check_in_eligible(booking: &Booking, stay: Option<&Stay>, today: NaiveDate) -> bool {
    booking.status == BookingStatus::Confirmed
        && booking.check_in_date <= today
        && stay.is_none_or(|stay| stay.check_in_time.is_none())
}

pub fn is_check_out_eligible(booking: &Booking, stay: Option<&Stay>) -> bool {
    booking.status == BookingStatus::CheckedIn
        && stay.is_some_and(|stay| stay.check_in_time.is_some() && stay.check_out_time.is_none())
}

impl HotelCore {
    /// Confirmed bookings due today or earlier that nobody has checked in.
    pub async fn check_in_list(&self, today: NaiveDate) -> HotelResult<Vec<Booking>> {
        let store = self.db().booking_store();
        let due = store
            .list_bookings(&BookingFilter {
                status: Some(BookingStatus::Confirmed),
                to: Some(today),
                ..Default::default()
            })
            .await?;

        let mut eligible = Vec::with_capacity(due.len());
        for booking in due {
            let stay = store.get_stay(booking.id).await?;
            if is_check_in_eligible(&booking, stay.as_ref(), today) {
                eligible.push(booking);
            }
        }
        Ok(eligible)
    }

    pub async fn check_in(
        &self,
        booking_id: i64,
        staff_id: i64,
        request: CheckInRequest,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> HotelResult<(Booking, Stay)> {
        let booking = self.booking(booking_id).await?;
        let store = self.db().booking_store();
        let existing = store.get_stay(booking_id).await?;
        if !is_check_in_eligible(&booking, existing.as_ref(), today) {
            return Err(HotelError::InvalidState(format!(
                "booking {booking_id} is not eligible for check-in"
            )));
        }

        let stay = Stay {
            id: 0,
            booking_id,
            check_in_time: Some(now),
            check_out_time: None,
            checked_in_by: Some(staff_id),
            checked_out_by: None,
            additional_charges_cents: 0,
            charge_notes: String::new(),
            late_fee_cents: 0,
            final_total_cents: None,
            notes: request
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
        };
        if !store.check_in(&booking, &stay).await? {
            return Err(HotelError::InvalidState(format!(
                "booking {booking_id} was checked in concurrently"
            )));
        }
        info!(booking_id, room_id = booking.room_id, staff_id, "guest checked in");

        let booking = self.booking(booking_id).await?;
        let stay = self.open_stay(&booking).await?;
        Ok((booking, stay))
    }

    pub async fn add_charge(&self, booking_id: i64, request: ChargeRequest) -> HotelResult<Stay> {
        let description = required_text("description", &request.description, 200)?;
        if request.amount_cents <= 0 {
            return Err(HotelError::Validation("amount_cents must be positive".to_string()));
        }
        let booking = self.booking(booking_id).await?;
        if booking.status != BookingStatus::CheckedIn {
            return Err(HotelError::InvalidState(format!(
                "booking {booking_id} is not checked in"
            )));
        }
        let stay = self.open_stay(&booking).await?;
        if stay
            .additional_charges_cents
            .checked_add(request.amount_cents)
            .is_none()
        {
            return Err(HotelError::Validation(format!(
                "charges of booking {booking_id} would exceed the money range"
            )));
        }
        if !self
            .db()
            .booking_store()
            .add_charge(booking_id, request.amount_cents, &description)
            .await?
        {
            return Err(HotelError::InvalidState(format!(
                "booking {booking_id} has no open stay"
            )));
        }
        info!(booking_id, amount_cents = request.amount_cents, "charge added");
        self.open_stay(&booking).await
    }

    pub async fn check_out_list(&self, today: NaiveDate) -> HotelResult<Vec<CheckOutQuote>> {
        let fee = self.settings().late_checkout_fee_cents;
        self.db()
            .booking_store()
            .list_checked_in()
            .await?
            .into_iter()
            .map(|(booking, stay)| quote(booking, stay, today, fee))
            .collect()
    }

    pub async fn check_out_quote(
        &self,
        booking_id: i64,
        today: NaiveDate,
    ) -> HotelResult<CheckOutQuote> {
        let booking = self.booking(booking_id).await?;
        let stay = self.db().booking_store().get_stay(booking_id).await?;
        if !is_check_out_eligible(&booking, stay.as_ref()) {
            return Err(HotelError::InvalidState(format!(
                "booking {booking_id} is not eligible for check-out"
            )));
        }
        let stay = self.open_stay(&booking).await?;
        quote(booking, stay, today, self.settings().late_checkout_fee_cents)
    }

    pub async fn check_out(
        &self,
        booking_id: i64,
        staff_id: i64,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> HotelResult<CheckOutQuote> {
        let pending = self.check_out_quote(booking_id, today).await?;
        let fee = self.settings().late_checkout_fee_cents;
        let Some(bill) = self
            .db()
            .booking_store()
            .check_out(&pending.booking, staff_id, now, today, fee)
            .await?
        else {
            return Err(HotelError::InvalidState(format!(
                "booking {booking_id} was checked out concurrently"
            )));
        };
        info!(
            booking_id,
            room_id = pending.booking.room_id,
            staff_id,
            days_late = bill.days_late,
            total_cents = bill.total_cents,
            "guest checked out"
        );

        let booking = self.booking(booking_id).await?;
        let stay = self
            .db()
            .booking_store()
            .get_stay(booking_id)
            .await?
            .ok_or_else(|| {
                HotelError::InvalidState(format!("stay of booking {booking_id} vanished"))
            })?;
        Ok(CheckOutQuote {
            booking,
            stay,
            bill,
        })
    }

    async fn open_stay(&self, booking: &Booking) -> HotelResult<Stay> {
        self.db()
            .booking_store()
            .get_stay(booking.id)
            .await?
            .ok_or_else(|| {
                HotelError::InvalidState(format!("booking {} has no stay record", booking.id))
            })
    }
}

fn quote(booking: Booking, stay: Stay, today: NaiveDate, fee: i64) -> HotelResult<CheckOutQuote> {
    let bill = CheckOutBill::compute(
        booking.total_price_cents,
        stay.additional_charges_cents,
        booking.check_out_date,
        today,
        fee,
    )
    .ok_or_else(|| {
        HotelError::Validation(format!("bill of booking {} is too large", booking.id))
    })?;
    Ok(CheckOutQuote {
        booking,
        stay,
        bill,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use test_case::test_case;

    use crate::db::sqlite::test_support::{booking, date, now, seed_customer, seed_room};
    use crate::db::Stay;
    use crate::domain::{BookingStatus, RoomStatus};
    use crate::hotel::test_support::TestHotel;
    use crate::hotel::HotelError;

    use super::{is_check_in_eligible, is_check_out_eligible, ChargeRequest, CheckInRequest};

    fn stay(checked_in: bool, checked_out: bool) -> Stay {
        Stay {
            id: 1,
            booking_id: 1,
            check_in_time: checked_in.then(now),
            check_out_time: checked_out.then(now),
            checked_in_by: None,
            checked_out_by: None,
            additional_charges_cents: 0,
            charge_notes: String::new(),
            late_fee_cents: 0,
            final_total_cents: None,
            notes: None,
        }
    }

    #[test_case(BookingStatus::Confirmed, "2026-04-10", None, true ; "due today")]
    #[test_case(BookingStatus::Confirmed, "2026-04-08", None, true ; "arrived late")]
    #[test_case(BookingStatus::Confirmed, "2026-04-11", None, false ; "arrives tomorrow")]
    #[test_case(BookingStatus::Pending, "2026-04-10", None, false ; "not confirmed")]
    #[test_case(BookingStatus::Confirmed, "2026-04-10", Some(false), true ; "empty stay record")]
    #[test_case(BookingStatus::Confirmed, "2026-04-10", Some(true), false ; "already in")]
    fn check_in_eligibility(
        status: BookingStatus,
        check_in: &str,
        stay_checked_in: Option<bool>,
        expected: bool,
    ) {
        let mut candidate = booking(1, 1, check_in, "2026-04-20");
        candidate.status = status;
        let record = stay_checked_in.map(|checked_in| stay(checked_in, false));
        assert_eq!(
            is_check_in_eligible(&candidate, record.as_ref(), date("2026-04-10")),
            expected
        );
    }

    #[test]
    fn check_out_needs_an_open_stay() {
        let mut candidate = booking(1, 1, "2026-04-10", "2026-04-12");
        candidate.status = BookingStatus::CheckedIn;
        assert!(is_check_out_eligible(&candidate, Some(&stay(true, false))));
        assert!(!is_check_out_eligible(&candidate, Some(&stay(true, true))));
        assert!(!is_check_out_eligible(&candidate, None));
        candidate.status = BookingStatus::Confirmed;
        assert!(!is_check_out_eligible(&candidate, Some(&stay(true, false))));
    }

    #[tokio::test]
    async fn full_stay_with_charges_and_late_fee() {
        let hotel = TestHotel::new().await;
        let (_, room) = seed_room(&hotel.db, "101", 2, 10_000).await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let id = hotel
            .db
            .manager
            .booking_store()
            .create_booking(&booking(customer, room, "2026-04-10", "2026-04-13"))
            .await
            .unwrap();

        let arrivals = hotel.core.check_in_list(date("2026-04-10")).await.unwrap();
        assert_eq!(arrivals.iter().map(|b| b.id).collect::<Vec<_>>(), vec![id]);
        assert!(hotel.core.check_in_list(date("2026-04-09")).await.unwrap().is_empty());

        let early = hotel
            .core
            .check_in(id, 7, CheckInRequest::default(), Utc::now(), date("2026-04-09"))
            .await;
        assert!(matches!(early, Err(HotelError::InvalidState(_))));

        let (checked_in, stay) = hotel
            .core
            .check_in(
                id,
                7,
                CheckInRequest {
                    notes: Some("late arrival".to_string()),
                },
                Utc::now(),
                date("2026-04-10"),
            )
            .await
            .unwrap();
        assert_eq!(checked_in.status, BookingStatus::CheckedIn);
        assert_eq!(stay.checked_in_by, Some(7));
        assert!(hotel.core.check_in_list(date("2026-04-10")).await.unwrap().is_empty());
        let again = hotel
            .core
            .check_in(id, 7, CheckInRequest::default(), Utc::now(), date("2026-04-10"))
            .await;
        assert!(matches!(again, Err(HotelError::InvalidState(_))));

        let bad_charge = hotel
            .core
            .add_charge(
                id,
                ChargeRequest {
                    description: "minibar".to_string(),
                    amount_cents: 0,
                },
            )
            .await;
        assert!(matches!(bad_charge, Err(HotelError::Validation(_))));
        hotel
            .core
            .add_charge(
                id,
                ChargeRequest {
                    description: "minibar".to_string(),
                    amount_cents: 4_550,
                },
            )
            .await
            .unwrap();

        let departures = hotel.core.check_out_list(date("2026-04-15")).await.unwrap();
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].bill.days_late, 2);

        // 30_000 room + 4_550 charges + 2 days x 2_500
        let done = hotel
            .core
            .check_out(id, 8, Utc::now(), date("2026-04-15"))
            .await
            .unwrap();
        assert_eq!(done.bill.total_cents, 39_550);
        assert_eq!(done.stay.final_total_cents, Some(39_550));
        assert_eq!(done.stay.late_fee_cents, 5_000);
        assert_eq!(done.stay.checked_out_by, Some(8));
        assert_eq!(done.booking.status, BookingStatus::CheckedOut);
        assert_eq!(hotel.core.room(room).await.unwrap().status, RoomStatus::Cleaning);

        let twice = hotel.core.check_out(id, 8, Utc::now(), date("2026-04-15")).await;
        assert!(matches!(twice, Err(HotelError::InvalidState(_))));
    }

    fn charge(description: &str, amount_cents: i64) -> ChargeRequest {
        ChargeRequest {
            description: description.to_string(),
            amount_cents,
        }
    }

    #[tokio::test]
    async fn arrivals_are_ordered_by_check_in_date_then_id() {
        let hotel = TestHotel::new().await;
        let (_, lake) = seed_room(&hotel.db, "101", 2, 10_000).await;
        let (_, garden) = seed_room(&hotel.db, "102", 2, 10_000).await;
        let (_, corner) = seed_room(&hotel.db, "103", 2, 10_000).await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let store = hotel.db.manager.booking_store();

        let lake_yesterday = store
            .create_booking(&booking(customer, lake, "2026-04-10", "2026-04-12"))
            .await
            .unwrap();
        let garden_earlier = store
            .create_booking(&booking(customer, garden, "2026-04-09", "2026-04-12"))
            .await
            .unwrap();
        let corner_yesterday = store
            .create_booking(&booking(customer, corner, "2026-04-10", "2026-04-13"))
            .await
            .unwrap();
        let lake_tomorrow = store
            .create_booking(&booking(customer, lake, "2026-04-12", "2026-04-14"))
            .await
            .unwrap();

        let arrivals = hotel.core.check_in_list(date("2026-04-11")).await.unwrap();
        let ids: Vec<i64> = arrivals.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![garden_earlier, lake_yesterday, corner_yesterday]);
        assert!(!ids.contains(&lake_tomorrow));
    }

    #[tokio::test]
    async fn check_out_bills_charges_added_after_the_quote() {
        let hotel = TestHotel::new().await;
        let (_, room) = seed_room(&hotel.db, "101", 2, 10_000).await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let id = hotel
            .db
            .manager
            .booking_store()
            .create_booking(&booking(customer, room, "2026-04-10", "2026-04-13"))
            .await
            .unwrap();
        hotel
            .core
            .check_in(id, 7, CheckInRequest::default(), Utc::now(), date("2026-04-10"))
            .await
            .unwrap();

        let quoted = hotel.core.check_out_quote(id, date("2026-04-13")).await.unwrap();
        assert_eq!(quoted.bill.total_cents, 30_000);
        hotel.core.add_charge(id, charge("room service", 4_550)).await.unwrap();

        let done = hotel
            .core
            .check_out(id, 8, Utc::now(), date("2026-04-13"))
            .await
            .unwrap();
        assert_eq!(done.bill.additional_charges_cents, 4_550);
        assert_eq!(done.bill.total_cents, 34_550);
        assert_eq!(done.stay.additional_charges_cents, 4_550);
        assert_eq!(done.stay.final_total_cents, Some(34_550));
    }

    #[tokio::test]
    async fn charges_beyond_the_money_range_are_rejected() {
        let hotel = TestHotel::new().await;
        let (_, room) = seed_room(&hotel.db, "101", 2, 10_000).await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let id = hotel
            .db
            .manager
            .booking_store()
            .create_booking(&booking(customer, room, "2026-04-10", "2026-04-13"))
            .await
            .unwrap();
        hotel
            .core
            .check_in(id, 7, CheckInRequest::default(), Utc::now(), date("2026-04-10"))
            .await
            .unwrap();
        hotel.core.add_charge(id, charge("suite upgrade", i64::MAX - 1)).await.unwrap();

        let overflow = hotel.core.add_charge(id, charge("minibar", 2)).await;
        assert!(matches!(overflow, Err(HotelError::Validation(_))));
        let stay = hotel
            .db
            .manager
            .booking_store()
            .get_stay(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stay.additional_charges_cents, i64::MAX - 1);
    }
}
