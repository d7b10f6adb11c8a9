use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::{Payment, PaymentFilter};
use crate::db::schema::payments;
use crate::db::{DatabaseError, PaymentStore};
use crate::domain::PaymentStatus;

use super::{last_insert_id, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbPayment {
    id: i64,
    customer_id: i64,
    booking_id: Option<i64>,
    travel_booking_id: Option<i64>,
    amount_cents: i64,
    method: String,
    status: String,
    reference: String,
    refund_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbPayment> for Payment {
    type Error = DatabaseError;

    fn try_from(value: DbPayment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            customer_id: value.customer_id,
            booking_id: value.booking_id,
            travel_booking_id: value.travel_booking_id,
            amount_cents: value.amount_cents,
            method: value.method.parse()?,
            status: value.status.parse()?,
            reference: value.reference,
            refund_reason: value.refund_reason,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = payments)]
struct NewPayment<'a> {
    customer_id: i64,
    booking_id: Option<i64>,
    travel_booking_id: Option<i64>,
    amount_cents: i64,
    method: &'a str,
    status: &'a str,
    reference: &'a str,
    refund_reason: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub struct SqlitePaymentStore {
    pool: Pool,
}

impl SqlitePaymentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for SqlitePaymentStore {
    async fn create_payment(&self, payment: &Payment) -> Result<i64, DatabaseError> {
        let payment = payment.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(payments::table)
                .values(&NewPayment {
                    customer_id: payment.customer_id,
                    booking_id: payment.booking_id,
                    travel_booking_id: payment.travel_booking_id,
                    amount_cents: payment.amount_cents,
                    method: payment.method.as_str(),
                    status: payment.status.as_str(),
                    reference: &payment.reference,
                    refund_reason: payment.refund_reason.as_deref(),
                    created_at: payment.created_at,
                    updated_at: payment.updated_at,
                })
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            payments::table
                .find(id)
                .select(DbPayment::as_select())
                .first(conn)
                .optional()?
                .map(Payment::try_from)
                .transpose()
        })
        .await
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, DatabaseError> {
        let filter = filter.clone();
        with_connection(self.pool.clone(), move |conn| {
            let mut query = payments::table.into_boxed();
            if let Some(status) = filter.status {
                query = query.filter(payments::status.eq(status.as_str()));
            }
            if let Some(method) = filter.method {
                query = query.filter(payments::method.eq(method.as_str()));
            }
            if let Some(customer_id) = filter.customer_id {
                query = query.filter(payments::customer_id.eq(customer_id));
            }
            if let Some(booking_id) = filter.booking_id {
                query = query.filter(payments::booking_id.eq(booking_id));
            }
            if let Some(from) = filter.from {
                query = query.filter(payments::created_at.ge(from));
            }
            if let Some(until) = filter.until {
                query = query.filter(payments::created_at.lt(until));
            }
            query
                .order((payments::created_at.asc(), payments::id.asc()))
                .select(DbPayment::as_select())
                .load(conn)?
                .into_iter()
                .map(Payment::try_from)
                .collect()
        })
        .await
    }

    async fn refund_payment(
        &self,
        id: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let reason = reason.to_string();
        with_connection(self.pool.clone(), move |conn| {
            let changed = diesel::update(
                payments::table
                    .filter(payments::id.eq(id))
                    .filter(payments::status.eq(PaymentStatus::Completed.as_str())),
            )
            .set((
                payments::status.eq(PaymentStatus::Refunded.as_str()),
                payments::refund_reason.eq(Some(reason)),
                payments::updated_at.eq(at),
            ))
            .execute(conn)?;
            Ok(changed == 1)
        })
        .await
    }

    async fn completed_total_for_booking(&self, booking_id: i64) -> Result<i64, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let amounts: Vec<i64> = payments::table
                .filter(payments::booking_id.eq(booking_id))
                .filter(payments::status.eq(PaymentStatus::Completed.as_str()))
                .select(payments::amount_cents)
                .load(conn)?;
            Ok(amounts.into_iter().sum())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::sqlite::test_support::{booking, now, seed_customer, seed_room, TestDb};
    use crate::db::{DatabaseError, Payment, PaymentFilter};
    use crate::domain::{PaymentMethod, PaymentStatus};

    fn payment(customer_id: i64, booking_id: Option<i64>, amount: i64, reference: &str) -> Payment {
        Payment {
            id: 0,
            customer_id,
            booking_id,
            travel_booking_id: None,
            amount_cents: amount,
            method: PaymentMethod::Card,
            status: PaymentStatus::Completed,
            reference: reference.to_string(),
            refund_reason: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[tokio::test]
    async fn refunds_only_apply_to_completed_payments() {
        let db = TestDb::new().await;
        let (_, room) = seed_room(&db, "101", 2, 10_000).await;
        let customer = seed_customer(&db, "guest@example.com").await;
        let booking_id = db
            .manager
            .booking_store()
            .create_booking(&booking(customer, room, "2026-07-01", "2026-07-03"))
            .await
            .expect("booking");
        let store = db.manager.payment_store();

        let deposit = store
            .create_payment(&payment(customer, Some(booking_id), 10_000, "dep-1"))
            .await
            .expect("deposit");
        store
            .create_payment(&payment(customer, Some(booking_id), 5_000, "dep-2"))
            .await
            .expect("second");
        assert_eq!(
            store.completed_total_for_booking(booking_id).await.expect("total"),
            15_000
        );

        assert!(store.refund_payment(deposit, "changed plans", now()).await.expect("refund"));
        assert!(!store.refund_payment(deposit, "again", now()).await.expect("second refund"));
        assert_eq!(
            store.completed_total_for_booking(booking_id).await.expect("total"),
            5_000
        );

        let refunded = store
            .list_payments(&PaymentFilter {
                status: Some(PaymentStatus::Refunded),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(refunded.len(), 1);
        assert_eq!(refunded[0].refund_reason.as_deref(), Some("changed plans"));
    }

    #[tokio::test]
    async fn duplicate_reference_is_a_conflict() {
        let db = TestDb::new().await;
        let customer = seed_customer(&db, "guest@example.com").await;
        let store = db.manager.payment_store();

        store
            .create_payment(&payment(customer, None, 1_000, "same"))
            .await
            .expect("first");
        let err = store
            .create_payment(&payment(customer, None, 1_000, "same"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }
}
