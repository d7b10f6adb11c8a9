use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::db::{TravelBooking, TravelPackage};
use crate::domain::TravelBookingStatus;

use super::{not_found, required_text, HotelCore, HotelError, HotelResult};

#[derive(Debug, Clone, Deserialize)]
pub struct PackageInput {
    pub name: String,
    pub destination: String,
    #[serde(default)]
    pub description: String,
    pub price_per_person_cents: i64,
    pub duration_days: i64,
    pub capacity: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TravelBookingRequest {
    pub package_id: i64,
    pub customer_id: i64,
    pub travel_date: NaiveDate,
    pub people: i64,
}

struct ValidPackage {
    name: String,
    destination: String,
}

impl PackageInput {
    fn validate(&self) -> HotelResult<ValidPackage> {
        if self.price_per_person_cents <= 0 {
            return Err(HotelError::Validation(
                "price_per_person_cents must be positive".to_string(),
            ));
        }
        if self.duration_days < 1 {
            return Err(HotelError::Validation(
                "duration_days must be at least 1".to_string(),
            ));
        }
        if self.capacity < 1 {
            return Err(HotelError::Validation("capacity must be at least 1".to_string()));
        }
        Ok(ValidPackage {
            name: required_text("name", &self.name, 120)?,
            destination: required_text("destination", &self.destination, 120)?,
        })
    }
}

impl HotelCore {
    pub async fn create_package(&self, input: PackageInput) -> HotelResult<TravelPackage> {
        let valid = input.validate()?;
        let now = Utc::now();
        let mut package = TravelPackage {
            id: 0,
            name: valid.name,
            destination: valid.destination,
            description: input.description.trim().to_string(),
            price_per_person_cents: input.price_per_person_cents,
            duration_days: input.duration_days,
            capacity: input.capacity,
            active: input.active,
            created_at: now,
            updated_at: now,
        };
        package.id = self.db().travel_store().create_package(&package).await?;
        info!(package_id = package.id, "travel package created");
        Ok(package)
    }

    pub async fn update_package(&self, id: i64, input: PackageInput) -> HotelResult<TravelPackage> {
        let valid = input.validate()?;
        let mut package = self.package(id).await?;
        package.name = valid.name;
        package.destination = valid.destination;
        package.description = input.description.trim().to_string();
        package.price_per_person_cents = input.price_per_person_cents;
        package.duration_days = input.duration_days;
        package.capacity = input.capacity;
        package.active = input.active;
        self.db().travel_store().update_package(&package).await?;
        self.package(id).await
    }

    pub async fn deactivate_package(&self, id: i64) -> HotelResult<TravelPackage> {
        let mut package = self.package(id).await?;
        package.active = false;
        self.db().travel_store().update_package(&package).await?;
        self.package(id).await
    }

    pub async fn package(&self, id: i64) -> HotelResult<TravelPackage> {
        self.db()
            .travel_store()
            .get_package(id)
            .await?
            .ok_or_else(|| not_found("travel package", id))
    }

    pub async fn list_packages(&self, active_only: bool) -> HotelResult<Vec<TravelPackage>> {
        Ok(self.db().travel_store().list_packages(active_only).await?)
    }

    pub async fn book_package(
        &self,
        request: TravelBookingRequest,
        today: NaiveDate,
    ) -> HotelResult<TravelBooking> {
        let package = self.package(request.package_id).await?;
        if !package.active {
            return Err(HotelError::InvalidState(format!(
                "travel package {} is not offered",
                package.name
            )));
        }
        if request.travel_date < today {
            return Err(HotelError::Validation(
                "travel_date cannot be in the past".to_string(),
            ));
        }
        if request.people < 1 {
            return Err(HotelError::Validation("people must be at least 1".to_string()));
        }
        if request.people > package.capacity {
            return Err(HotelError::Validation(format!(
                "package {} takes at most {} people",
                package.id, package.capacity
            )));
        }
        let total_cents = package
            .price_per_person_cents
            .checked_mul(request.people)
            .ok_or_else(|| {
                HotelError::Validation("travel booking total is too large".to_string())
            })?;
        self.customer(request.customer_id).await?;

        let now = Utc::now();
        let mut booking = TravelBooking {
            id: 0,
            package_id: package.id,
            customer_id: request.customer_id,
            travel_date: request.travel_date,
            people: request.people,
            total_cents,
            status: TravelBookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        booking.id = self
            .db()
            .travel_store()
            .create_travel_booking(&booking, package.capacity)
            .await?;
        info!(
            travel_booking_id = booking.id,
            package_id = package.id,
            people = booking.people,
            "travel package booked"
        );
        Ok(booking)
    }

    pub async fn travel_booking(&self, id: i64) -> HotelResult<TravelBooking> {
        self.db()
            .travel_store()
            .get_travel_booking(id)
            .await?
            .ok_or_else(|| not_found("travel booking", id))
    }

    pub async fn list_travel_bookings(
        &self,
        customer_id: Option<i64>,
        package_id: Option<i64>,
    ) -> HotelResult<Vec<TravelBooking>> {
        Ok(self
            .db()
            .travel_store()
            .list_travel_bookings(customer_id, package_id)
            .await?)
    }

    pub async fn change_travel_booking_status(
        &self,
        id: i64,
        next: TravelBookingStatus,
    ) -> HotelResult<TravelBooking> {
        let current = self.travel_booking(id).await?;
        if !current.status.can_transition_to(next)
            || !self
                .db()
                .travel_store()
                .transition_travel_booking(id, current.status, next)
                .await?
        {
            return Err(HotelError::InvalidState(format!(
                "travel booking {id} cannot move from {} to {next}",
                current.status
            )));
        }
        info!(
            travel_booking_id = id,
            from = %current.status,
            to = %next,
            "travel booking status changed"
        );
        self.travel_booking(id).await
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::db::sqlite::test_support::{date, seed_customer};
    use crate::domain::TravelBookingStatus;
    use crate::hotel::test_support::TestHotel;
    use crate::hotel::HotelError;

    use super::{PackageInput, TravelBookingRequest};

    fn tour() -> PackageInput {
        PackageInput {
            name: "Old town walk".to_string(),
            destination: "Old town".to_string(),
            description: String::new(),
            price_per_person_cents: 2_000,
            duration_days: 1,
            capacity: 4,
            active: true,
        }
    }

    #[test_case(0, 1, 4 ; "free")]
    #[test_case(2_000, 0, 4 ; "no duration")]
    #[test_case(2_000, 1, 0 ; "no seats")]
    fn invalid_packages(price: i64, duration: i64, capacity: i64) {
        let input = PackageInput {
            price_per_person_cents: price,
            duration_days: duration,
            capacity,
            ..tour()
        };
        assert!(matches!(input.validate(), Err(HotelError::Validation(_))));
    }

    #[tokio::test]
    async fn booking_respects_capacity_and_transitions() {
        let hotel = TestHotel::new().await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let package = hotel.core.create_package(tour()).await.unwrap();
        let today = date("2026-05-01");
        let request = |people| TravelBookingRequest {
            package_id: package.id,
            customer_id: customer,
            travel_date: date("2026-05-10"),
            people,
        };

        let booking = hotel.core.book_package(request(3), today).await.unwrap();
        assert_eq!(booking.total_cents, 6_000);
        assert_eq!(booking.status, TravelBookingStatus::Pending);

        let full = hotel.core.book_package(request(2), today).await;
        assert!(matches!(full, Err(HotelError::Conflict(_))));

        let skipped = hotel
            .core
            .change_travel_booking_status(booking.id, TravelBookingStatus::Completed)
            .await;
        assert!(matches!(skipped, Err(HotelError::InvalidState(_))));
        hotel
            .core
            .change_travel_booking_status(booking.id, TravelBookingStatus::Confirmed)
            .await
            .unwrap();
        let done = hotel
            .core
            .change_travel_booking_status(booking.id, TravelBookingStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, TravelBookingStatus::Completed);

        hotel.core.deactivate_package(package.id).await.unwrap();
        let inactive = hotel.core.book_package(request(1), today).await;
        assert!(matches!(inactive, Err(HotelError::InvalidState(_))));
        assert!(hotel.core.list_packages(true).await.unwrap().is_empty());
    }

    #[test_case(2_000, i64::MAX / 1_000 ; "party larger than the package")]
    #[test_case(i64::MAX / 2, 3 ; "total beyond the money range")]
    #[tokio::test]
    async fn oversized_travel_bookings_are_rejected(price: i64, people: i64) {
        let hotel = TestHotel::new().await;
        let customer = seed_customer(&hotel.db, "guest@example.com").await;
        let package = hotel
            .core
            .create_package(PackageInput {
                price_per_person_cents: price,
                ..tour()
            })
            .await
            .unwrap();

        let result = hotel
            .core
            .book_package(
                TravelBookingRequest {
                    package_id: package.id,
                    customer_id: customer,
                    travel_date: date("2026-05-10"),
                    people,
                },
                date("2026-05-01"),
            )
            .await;
        assert!(matches!(result, Err(HotelError::Validation(_))));
        let booked = hotel
            .core
            .list_travel_bookings(None, Some(package.id))
            .await
            .unwrap();
        assert!(booked.is_empty());
    }
}
