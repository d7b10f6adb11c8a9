use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::{TravelBooking, TravelPackage};
use crate::db::schema::{travel_bookings, travel_packages};
use crate::db::{DatabaseError, TravelStore};
use crate::domain::TravelBookingStatus;

use super::{last_insert_id, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = travel_packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbTravelPackage {
    id: i64,
    name: String,
    destination: String,
    description: String,
    price_per_person_cents: i64,
    duration_days: i64,
    capacity: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbTravelPackage> for TravelPackage {
    fn from(value: DbTravelPackage) -> Self {
        Self {
            id: value.id,
            name: value.name,
            destination: value.destination,
            description: value.description,
            price_per_person_cents: value.price_per_person_cents,
            duration_days: value.duration_days,
            capacity: value.capacity,
            active: value.active,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = travel_packages)]
struct TravelPackageRow<'a> {
    name: &'a str,
    destination: &'a str,
    description: &'a str,
    price_per_person_cents: i64,
    duration_days: i64,
    capacity: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> TravelPackageRow<'a> {
    fn new(package: &'a TravelPackage) -> Self {
        Self {
            name: &package.name,
            destination: &package.destination,
            description: &package.description,
            price_per_person_cents: package.price_per_person_cents,
            duration_days: package.duration_days,
            capacity: package.capacity,
            active: package.active,
            created_at: package.created_at,
            updated_at: package.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = travel_bookings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbTravelBooking {
    id: i64,
    package_id: i64,
    customer_id: i64,
    travel_date: NaiveDate,
    people: i64,
    total_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbTravelBooking> for TravelBooking {
    type Error = DatabaseError;

    fn try_from(value: DbTravelBooking) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            package_id: value.package_id,
            customer_id: value.customer_id,
            travel_date: value.travel_date,
            people: value.people,
            total_cents: value.total_cents,
            status: value.status.parse()?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = travel_bookings)]
struct NewTravelBooking<'a> {
    package_id: i64,
    customer_id: i64,
    travel_date: NaiveDate,
    people: i64,
    total_cents: i64,
    status: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub struct SqliteTravelStore {
    pool: Pool,
}

impl SqliteTravelStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TravelStore for SqliteTravelStore {
    async fn create_package(&self, package: &TravelPackage) -> Result<i64, DatabaseError> {
        let package = package.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(travel_packages::table)
                .values(&TravelPackageRow::new(&package))
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn update_package(&self, package: &TravelPackage) -> Result<(), DatabaseError> {
        let package = package.clone();
        with_connection(self.pool.clone(), move |conn| {
            let mut row = TravelPackageRow::new(&package);
            row.updated_at = Utc::now();
            diesel::update(travel_packages::table.find(package.id))
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get_package(&self, id: i64) -> Result<Option<TravelPackage>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(travel_packages::table
                .find(id)
                .select(DbTravelPackage::as_select())
                .first(conn)
                .optional()?
                .map(Into::into))
        })
        .await
    }

    async fn list_packages(&self, active_only: bool) -> Result<Vec<TravelPackage>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = travel_packages::table.into_boxed();
            if active_only {
                query = query.filter(travel_packages::active.eq(true));
            }
            Ok(query
                .order(travel_packages::name.asc())
                .select(DbTravelPackage::as_select())
                .load(conn)?
                .into_iter()
                .map(Into::into)
                .collect())
        })
        .await
    }

    async fn create_travel_booking(
        &self,
        booking: &TravelBooking,
        capacity: i64,
    ) -> Result<i64, DatabaseError> {
        let booking = booking.clone();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                let booked: Vec<i64> = travel_bookings::table
                    .filter(travel_bookings::package_id.eq(booking.package_id))
                    .filter(travel_bookings::travel_date.eq(booking.travel_date))
                    .filter(travel_bookings::status.ne(TravelBookingStatus::Cancelled.as_str()))
                    .select(travel_bookings::people)
                    .load(conn)?;
                let taken: i64 = booked.iter().sum();
                let fits = taken
                    .checked_add(booking.people)
                    .is_some_and(|total| total <= capacity);
                if !fits {
                    return Err(DatabaseError::Conflict(format!(
                        "only {} places left on {}",
                        (capacity - taken).max(0),
                        booking.travel_date
                    )));
                }

                diesel::insert_into(travel_bookings::table)
                    .values(&NewTravelBooking {
                        package_id: booking.package_id,
                        customer_id: booking.customer_id,
                        travel_date: booking.travel_date,
                        people: booking.people,
                        total_cents: booking.total_cents,
                        status: booking.status.as_str(),
                        created_at: booking.created_at,
                        updated_at: booking.updated_at,
                    })
                    .execute(conn)?;
                last_insert_id(conn)
            })
        })
        .await
    }

    async fn get_travel_booking(&self, id: i64) -> Result<Option<TravelBooking>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            travel_bookings::table
                .find(id)
                .select(DbTravelBooking::as_select())
                .first(conn)
                .optional()?
                .map(TravelBooking::try_from)
                .transpose()
        })
        .await
    }

    async fn list_travel_bookings(
        &self,
        customer_id: Option<i64>,
        package_id: Option<i64>,
    ) -> Result<Vec<TravelBooking>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = travel_bookings::table.into_boxed();
            if let Some(customer_id) = customer_id {
                query = query.filter(travel_bookings::customer_id.eq(customer_id));
            }
            if let Some(package_id) = package_id {
                query = query.filter(travel_bookings::package_id.eq(package_id));
            }
            query
                .order((travel_bookings::travel_date.asc(), travel_bookings::id.asc()))
                .select(DbTravelBooking::as_select())
                .load(conn)?
                .into_iter()
                .map(TravelBooking::try_from)
                .collect()
        })
        .await
    }

    async fn transition_travel_booking(
        &self,
        id: i64,
        from: TravelBookingStatus,
        to: TravelBookingStatus,
    ) -> Result<bool, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let changed = diesel::update(
                travel_bookings::table
                    .filter(travel_bookings::id.eq(id))
                    .filter(travel_bookings::status.eq(from.as_str())),
            )
            .set((
                travel_bookings::status.eq(to.as_str()),
                travel_bookings::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
            Ok(changed == 1)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::sqlite::test_support::{date, now, seed_customer, TestDb};
    use crate::db::{DatabaseError, TravelBooking, TravelPackage};
    use crate::domain::TravelBookingStatus;

    fn package() -> TravelPackage {
        TravelPackage {
            id: 0,
            name: "Lagoon tour".to_string(),
            destination: "Blue Lagoon".to_string(),
            description: String::new(),
            price_per_person_cents: 4_500,
            duration_days: 1,
            capacity: 5,
            active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn travel_booking(package_id: i64, customer_id: i64, people: i64) -> TravelBooking {
        TravelBooking {
            id: 0,
            package_id,
            customer_id,
            travel_date: date("2026-09-01"),
            people,
            total_cents: people * 4_500,
            status: TravelBookingStatus::Pending,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[tokio::test]
    async fn oversized_party_is_a_conflict() {
        let db = TestDb::new().await;
        let customer = seed_customer(&db, "guest@example.com").await;
        let store = db.manager.travel_store();
        let package_id = store.create_package(&package()).await.expect("package");
        store
            .create_travel_booking(&travel_booking(package_id, customer, 2), i64::MAX)
            .await
            .expect("first");

        let huge = TravelBooking {
            people: i64::MAX,
            total_cents: 4_500,
            ..travel_booking(package_id, customer, 1)
        };
        let err = store
            .create_travel_booking(&huge, i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn capacity_counts_only_live_bookings() {
        let db = TestDb::new().await;
        let customer = seed_customer(&db, "guest@example.com").await;
        let store = db.manager.travel_store();
        let package_id = store.create_package(&package()).await.expect("package");

        let first = store
            .create_travel_booking(&travel_booking(package_id, customer, 3), 5)
            .await
            .expect("first");
        let err = store
            .create_travel_booking(&travel_booking(package_id, customer, 3), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        assert!(store
            .transition_travel_booking(
                first,
                TravelBookingStatus::Pending,
                TravelBookingStatus::Cancelled
            )
            .await
            .expect("cancel"));
        store
            .create_travel_booking(&travel_booking(package_id, customer, 5), 5)
            .await
            .expect("fits after cancellation");

        let listed = store
            .list_travel_bookings(Some(customer), None)
            .await
            .expect("list");
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn inactive_packages_are_hidden_from_active_list() {
        let db = TestDb::new().await;
        let store = db.manager.travel_store();
        let id = store.create_package(&package()).await.expect("package");

        let mut stored = store.get_package(id).await.expect("get").expect("exists");
        stored.active = false;
        store.update_package(&stored).await.expect("update");

        assert!(store.list_packages(true).await.expect("active").is_empty());
        assert_eq!(store.list_packages(false).await.expect("all").len(), 1);
    }
}
