use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::Complaint;
use crate::db::schema::complaints;
use crate::db::{ComplaintStore, DatabaseError};
use crate::domain::ComplaintStatus;

use super::{last_insert_id, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = complaints)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbComplaint {
    id: i64,
    customer_id: i64,
    booking_id: Option<i64>,
    subject: String,
    description: String,
    status: String,
    resolution: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbComplaint> for Complaint {
    type Error = DatabaseError;

    fn try_from(value: DbComplaint) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            customer_id: value.customer_id,
            booking_id: value.booking_id,
            subject: value.subject,
            description: value.description,
            status: value.status.parse()?,
            resolution: value.resolution,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = complaints)]
struct NewComplaint<'a> {
    customer_id: i64,
    booking_id: Option<i64>,
    subject: &'a str,
    description: &'a str,
    status: &'a str,
    resolution: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub struct SqliteComplaintStore {
    pool: Pool,
}

impl SqliteComplaintStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintStore for SqliteComplaintStore {
    async fn create_complaint(&self, complaint: &Complaint) -> Result<i64, DatabaseError> {
        let complaint = complaint.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(complaints::table)
                .values(&NewComplaint {
                    customer_id: complaint.customer_id,
                    booking_id: complaint.booking_id,
                    subject: &complaint.subject,
                    description: &complaint.description,
                    status: complaint.status.as_str(),
                    resolution: complaint.resolution.as_deref(),
                    created_at: complaint.created_at,
                    updated_at: complaint.updated_at,
                })
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn get_complaint(&self, id: i64) -> Result<Option<Complaint>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            complaints::table
                .find(id)
                .select(DbComplaint::as_select())
                .first(conn)
                .optional()?
                .map(Complaint::try_from)
                .transpose()
        })
        .await
    }

    async fn list_complaints(
        &self,
        status: Option<ComplaintStatus>,
        customer_id: Option<i64>,
    ) -> Result<Vec<Complaint>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = complaints::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(complaints::status.eq(status.as_str()));
            }
            if let Some(customer_id) = customer_id {
                query = query.filter(complaints::customer_id.eq(customer_id));
            }
            query
                .order(complaints::id.desc())
                .select(DbComplaint::as_select())
                .load(conn)?
                .into_iter()
                .map(Complaint::try_from)
                .collect()
        })
        .await
    }

    async fn transition_complaint(
        &self,
        id: i64,
        from: ComplaintStatus,
        to: ComplaintStatus,
        resolution: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let resolution = resolution.map(str::to_string);
        with_connection(self.pool.clone(), move |conn| {
            let target = complaints::table
                .filter(complaints::id.eq(id))
                .filter(complaints::status.eq(from.as_str()));
            let changed = match resolution {
                Some(resolution) => diesel::update(target)
                    .set((
                        complaints::status.eq(to.as_str()),
                        complaints::resolution.eq(Some(resolution)),
                        complaints::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?,
                None => diesel::update(target)
                    .set((
                        complaints::status.eq(to.as_str()),
                        complaints::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?,
            };
            Ok(changed == 1)
        })
        .await
    }

    async fn count_open_complaints(&self) -> Result<i64, DatabaseError> {
        let open: Vec<&'static str> = ComplaintStatus::ALL
            .iter()
            .filter(|status| status.is_open())
            .map(ComplaintStatus::as_str)
            .collect();
        with_connection(self.pool.clone(), move |conn| {
            Ok(complaints::table
                .filter(complaints::status.eq_any(open))
                .count()
                .get_result(conn)?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::sqlite::test_support::{now, seed_customer, TestDb};
    use crate::db::Complaint;
    use crate::domain::ComplaintStatus;

    #[tokio::test]
    async fn transition_is_guarded_by_current_status() {
        let db = TestDb::new().await;
        let customer = seed_customer(&db, "guest@example.com").await;
        let store = db.manager.complaint_store();

        let id = store
            .create_complaint(&Complaint {
                id: 0,
                customer_id: customer,
                booking_id: None,
                subject: "Noise".to_string(),
                description: "Loud music next door".to_string(),
                status: ComplaintStatus::Open,
                resolution: None,
                created_at: now(),
                updated_at: now(),
            })
            .await
            .expect("create");
        assert_eq!(store.count_open_complaints().await.expect("count"), 1);

        assert!(store
            .transition_complaint(id, ComplaintStatus::Open, ComplaintStatus::InProgress, None)
            .await
            .expect("start"));
        assert!(!store
            .transition_complaint(id, ComplaintStatus::Open, ComplaintStatus::Resolved, Some("x"))
            .await
            .expect("stale transition"));
        assert!(store
            .transition_complaint(
                id,
                ComplaintStatus::InProgress,
                ComplaintStatus::Resolved,
                Some("Spoke with neighbours"),
            )
            .await
            .expect("resolve"));

        let resolved = store.get_complaint(id).await.expect("get").expect("exists");
        assert_eq!(resolved.status, ComplaintStatus::Resolved);
        assert_eq!(resolved.resolution.as_deref(), Some("Spoke with neighbours"));
        assert_eq!(store.count_open_complaints().await.expect("count"), 0);

        let mine = store.list_complaints(None, Some(customer)).await.expect("list");
        assert_eq!(mine.len(), 1);
        let open = store
            .list_complaints(Some(ComplaintStatus::Open), None)
            .await
            .expect("list");
        assert!(open.is_empty());
    }
}
