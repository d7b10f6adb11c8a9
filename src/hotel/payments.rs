use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::{Payment, PaymentFilter};
use crate::domain::{BookingStatus, PaymentMethod, PaymentStatus};

use super::{not_found, required_text, HotelCore, HotelError, HotelResult};

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub customer_id: i64,
    #[serde(default)]
    pub booking_id: Option<i64>,
    #[serde(default)]
    pub travel_booking_id: Option<i64>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingBalance {
    pub booking_id: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
}

/// Totals over a payment window. `gross_cents` counts everything that was
/// collected, including money later refunded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub count: i64,
    pub gross_cents: i64,
    pub refunded_cents: i64,
    pub net_cents: i64,
}

impl PaymentSummary {
    pub fn from_payments<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Self {
        let mut summary = Self::default();
        for payment in payments {
            summary.count += 1;
            match payment.status {
                PaymentStatus::Completed => summary.gross_cents += payment.amount_cents,
                PaymentStatus::Refunded => {
                    summary.gross_cents += payment.amount_cents;
                    summary.refunded_cents += payment.amount_cents;
                }
                PaymentStatus::Pending | PaymentStatus::Failed => {}
            }
        }
        summary.net_cents = summary.gross_cents - summary.refunded_cents;
        summary
    }
}

/// Half-open UTC window covering the calendar days `from..=to`.
pub fn day_window(from: NaiveDate, to: NaiveDate) -> HotelResult<(DateTime<Utc>, DateTime<Utc>)> {
    if to < from {
        return Err(HotelError::Validation("to must not be before from".to_string()));
    }
    let end = to
        .succ_opt()
        .ok_or_else(|| HotelError::Validation("date range is out of bounds".to_string()))?;
    Ok((
        from.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

impl HotelCore {
    pub async fn record_payment(&self, input: PaymentInput) -> HotelResult<Payment> {
        if input.amount_cents <= 0 {
            return Err(HotelError::Validation("amount_cents must be positive".to_string()));
        }
        match (input.booking_id, input.travel_booking_id) {
            (Some(booking_id), None) => {
                let booking = self.booking(booking_id).await?;
                if booking.customer_id != input.customer_id {
                    return Err(HotelError::Validation(format!(
                        "booking {booking_id} belongs to another customer"
                    )));
                }
            }
            (None, Some(travel_booking_id)) => {
                let booking = self.travel_booking(travel_booking_id).await?;
                if booking.customer_id != input.customer_id {
                    return Err(HotelError::Validation(format!(
                        "travel booking {travel_booking_id} belongs to another customer"
                    )));
                }
            }
            _ => {
                return Err(HotelError::Validation(
                    "a payment targets exactly one booking or travel booking".to_string(),
                ));
            }
        }
        let reference = match input.reference.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => required_text("reference", reference, 100)?,
            _ => Uuid::new_v4().to_string(),
        };

        let now = Utc::now();
        let mut payment = Payment {
            id: 0,
            customer_id: input.customer_id,
            booking_id: input.booking_id,
            travel_booking_id: input.travel_booking_id,
            amount_cents: input.amount_cents,
            method: input.method,
            status: PaymentStatus::Completed,
            reference,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        };
        payment.id = self.db().payment_store().create_payment(&payment).await?;
        info!(
            payment_id = payment.id,
            customer_id = payment.customer_id,
            amount_cents = payment.amount_cents,
            method = %payment.method,
            "payment recorded"
        );
        Ok(payment)
    }

    pub async fn payment(&self, id: i64) -> HotelResult<Payment> {
        self.db()
            .payment_store()
            .get_payment(id)
            .await?
            .ok_or_else(|| not_found("payment", id))
    }

    pub async fn refund_payment(&self, id: i64, reason: &str) -> HotelResult<Payment> {
        let reason = required_text("reason", reason, 500)?;
        let payment = self.payment(id).await?;
        if payment.status != PaymentStatus::Completed
            || !self
                .db()
                .payment_store()
                .refund_payment(id, &reason, Utc::now())
                .await?
        {
            return Err(HotelError::InvalidState(format!(
                "payment {id} is {} and cannot be refunded",
                payment.status
            )));
        }
        info!(payment_id = id, amount_cents = payment.amount_cents, "payment refunded");
        self.payment(id).await
    }

    pub async fn list_payments(&self, filter: &PaymentFilter) -> HotelResult<Vec<Payment>> {
        Ok(self.db().payment_store().list_payments(filter).await?)
    }

    pub async fn booking_balance(&self, booking_id: i64) -> HotelResult<BookingBalance> {
        let booking = self.booking(booking_id).await?;
        let mut total_cents = booking.total_price_cents;
        if booking.status == BookingStatus::CheckedOut {
            if let Some(final_total) = self
                .db()
                .booking_store()
                .get_stay(booking_id)
                .await?
                .and_then(|stay| stay.final_total_cents)
            {
                total_cents = final_total;
            }
        }
        let paid_cents = self
            .db()
            .payment_store()
            .completed_total_for_booking(booking_id)
            .await?;
        Ok(BookingBalance {
            booking_id,
            total_cents,
            paid_cents,
            balance_cents: total_cents - paid_cents,
        })
    }

    pub async fn payment_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> HotelResult<PaymentSummary> {
        let (from, until) = day_window(from, to)?;
        let payments = self
            .list_payments(&PaymentFilter {
                from: Some(from),
                until: Some(until),
                ..Default::default()
            })
            .await?;
        Ok(PaymentSummary::from_payments(&payments))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::sqlite::test_support::{booking, date, seed_customer, seed_room};
    use crate::db::Payment;
    use crate::domain::{PaymentMethod, PaymentStatus};
    use crate::hotel::test_support::TestHotel;
    use crate::hotel::HotelError;

    use super::{day_window, PaymentInput, PaymentSummary};

    fn stored(amount: i64, status: PaymentStatus) -> Payment {
        Payment {
            id: 0,
            customer_id: 1,
            booking_id: Some(1),
            travel_booking_id: None,
            amount_cents: amount,
            method: PaymentMethod::Cash,
            status,
            reference: String::new(),
            refund_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_nets_out_refunds() {
        let payments = [
            stored(10_000, PaymentStatus::Completed),
            stored(4_000, PaymentStatus::Refunded),
            stored(900, PaymentStatus::Failed),
        ];
        let summary = PaymentSummary::from_payments(&payments);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.gross_cents, 14_000);
        assert_eq!(summary.refunded_cents, 4_000);
        assert_eq!(summary.net_cents, 10_000);
    }

    #[test]
    fn day_window_is_inclusive_of_the_last_day() {
        let (from, until) = day_window(date("2026-03-01"), date("2026-03-31")).unwrap();
        assert_eq!(from.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(until.to_rfc3339(), "2026-04-01T00:00:00+00:00");
        assert!(day_window(date("2026-03-02"), date("2026-03-01")).is_err());
    }

    fn input(customer_id: i64, booking_id: Option<i64>, amount: i64) -> PaymentInput {
        PaymentInput {
            customer_id,
            booking_id,
            travel_booking_id: None,
            amount_cents: amount,
            method: PaymentMethod::Card,
            reference: None,
        }
    }

    #[tokio::test]
    async fn payments_target_one_owned_booking() {
        let hotel = TestHotel::new().await;
        let (_, room) = seed_room(&hotel.db, "101", 2, 10_000).await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let stranger = seed_customer(&hotel.db, "stranger@example.com").await;
        let booking_id = hotel
            .db
            .manager
            .booking_store()
            .create_booking(&booking(customer, room, "2026-04-10", "2026-04-13"))
            .await
            .unwrap();

        let untargeted = hotel.core.record_payment(input(customer, None, 1_000)).await;
        assert!(matches!(untargeted, Err(HotelError::Validation(_))));
        let foreign = hotel
            .core
            .record_payment(input(stranger, Some(booking_id), 1_000))
            .await;
        assert!(matches!(foreign, Err(HotelError::Validation(_))));
        let negative = hotel
            .core
            .record_payment(input(customer, Some(booking_id), -5))
            .await;
        assert!(matches!(negative, Err(HotelError::Validation(_))));

        let deposit = hotel
            .core
            .record_payment(input(customer, Some(booking_id), 12_000))
            .await
            .unwrap();
        assert_eq!(deposit.status, PaymentStatus::Completed);
        assert_eq!(deposit.reference.len(), 36);

        let balance = hotel.core.booking_balance(booking_id).await.unwrap();
        assert_eq!(balance.total_cents, 30_000);
        assert_eq!(balance.balance_cents, 18_000);

        let refunded = hotel.core.refund_payment(deposit.id, "overcharged").await.unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        let twice = hotel.core.refund_payment(deposit.id, "overcharged").await;
        assert!(matches!(twice, Err(HotelError::InvalidState(_))));
        assert_eq!(
            hotel.core.booking_balance(booking_id).await.unwrap().balance_cents,
            30_000
        );

        let today = Utc::now().date_naive();
        let summary = hotel.core.payment_summary(today, today).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.refunded_cents, 12_000);
        assert_eq!(summary.net_cents, 0);
    }
}
