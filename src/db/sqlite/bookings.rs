use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::{Booking, BookingFilter, Stay};
use crate::db::schema::{bookings, rooms, stays};
use crate::db::{BookingStore, DatabaseError};
use crate::domain::billing::CheckOutBill;
use crate::domain::{BookingStatus, RoomStatus};

use super::{last_insert_id, status_strings, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbBooking {
    id: i64,
    customer_id: i64,
    room_id: i64,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    guests: i64,
    total_price_cents: i64,
    status: String,
    special_requests: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbBooking> for Booking {
    type Error = DatabaseError;

    fn try_from(value: DbBooking) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            customer_id: value.customer_id,
            room_id: value.room_id,
            check_in_date: value.check_in_date,
            check_out_date: value.check_out_date,
            guests: value.guests,
            total_price_cents: value.total_price_cents,
            status: value.status.parse()?,
            special_requests: value.special_requests,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = bookings)]
struct NewBooking<'a> {
    customer_id: i64,
    room_id: i64,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    guests: i64,
    total_price_cents: i64,
    status: &'a str,
    special_requests: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = stays)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbStay {
    id: i64,
    booking_id: i64,
    check_in_time: Option<DateTime<Utc>>,
    check_out_time: Option<DateTime<Utc>>,
    checked_in_by: Option<i64>,
    checked_out_by: Option<i64>,
    additional_charges_cents: i64,
    charge_notes: String,
    late_fee_cents: i64,
    final_total_cents: Option<i64>,
    notes: Option<String>,
}

impl From<DbStay> for Stay {
    fn from(value: DbStay) -> Self {
        Self {
            id: value.id,
            booking_id: value.booking_id,
            check_in_time: value.check_in_time,
            check_out_time: value.check_out_time,
            checked_in_by: value.checked_in_by,
            checked_out_by: value.checked_out_by,
            additional_charges_cents: value.additional_charges_cents,
            charge_notes: value.charge_notes,
            late_fee_cents: value.late_fee_cents,
            final_total_cents: value.final_total_cents,
            notes: value.notes,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = stays)]
struct NewStay<'a> {
    booking_id: i64,
    check_in_time: Option<DateTime<Utc>>,
    checked_in_by: Option<i64>,
    additional_charges_cents: i64,
    charge_notes: &'a str,
    late_fee_cents: i64,
    notes: Option<&'a str>,
}

fn collect_bookings(rows: Vec<DbBooking>) -> Result<Vec<Booking>, DatabaseError> {
    rows.into_iter().map(Booking::try_from).collect()
}

fn append_note(existing: &str, description: &str, amount_cents: i64) -> String {
    let line = format!("{description}: {amount_cents}");
    if existing.is_empty() {
        line
    } else {
        format!("{existing}\n{line}")
    }
}

pub struct SqliteBookingStore {
    pool: Pool,
}

impl SqliteBookingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    async fn create_booking(&self, booking: &Booking) -> Result<i64, DatabaseError> {
        let booking = booking.clone();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                let occupying = status_strings(BookingStatus::OCCUPYING, BookingStatus::as_str);
                let overlapping: i64 = bookings::table
                    .filter(bookings::room_id.eq(booking.room_id))
                    .filter(bookings::status.eq_any(occupying))
                    .filter(bookings::check_in_date.lt(booking.check_out_date))
                    .filter(bookings::check_out_date.gt(booking.check_in_date))
                    .count()
                    .get_result(conn)?;
                if overlapping > 0 {
                    return Err(DatabaseError::Conflict(format!(
                        "room {} is already booked between {} and {}",
                        booking.room_id, booking.check_in_date, booking.check_out_date
                    )));
                }

                diesel::insert_into(bookings::table)
                    .values(&NewBooking {
                        customer_id: booking.customer_id,
                        room_id: booking.room_id,
                        check_in_date: booking.check_in_date,
                        check_out_date: booking.check_out_date,
                        guests: booking.guests,
                        total_price_cents: booking.total_price_cents,
                        status: booking.status.as_str(),
                        special_requests: booking.special_requests.as_deref(),
                        created_at: booking.created_at,
                        updated_at: booking.updated_at,
                    })
                    .execute(conn)?;
                last_insert_id(conn)
            })
        })
        .await
    }

    async fn get_booking(&self, id: i64) -> Result<Option<Booking>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            bookings::table
                .find(id)
                .select(DbBooking::as_select())
                .first(conn)
                .optional()?
                .map(Booking::try_from)
                .transpose()
        })
        .await
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, DatabaseError> {
        let filter = filter.clone();
        with_connection(self.pool.clone(), move |conn| {
            let mut query = bookings::table.into_boxed();
            if let Some(status) = filter.status {
                query = query.filter(bookings::status.eq(status.as_str()));
            }
            if let Some(customer_id) = filter.customer_id {
                query = query.filter(bookings::customer_id.eq(customer_id));
            }
            if let Some(room_id) = filter.room_id {
                query = query.filter(bookings::room_id.eq(room_id));
            }
            if let Some(from) = filter.from {
                query = query.filter(bookings::check_out_date.ge(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(bookings::check_in_date.le(to));
            }
            let rows = query
                .order((bookings::check_in_date.asc(), bookings::id.asc()))
                .select(DbBooking::as_select())
                .load(conn)?;
            collect_bookings(rows)
        })
        .await
    }

    async fn transition_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<bool, DatabaseError> {
        let from = status_strings(from, BookingStatus::as_str);
        with_connection(self.pool.clone(), move |conn| {
            let changed = diesel::update(
                bookings::table
                    .filter(bookings::id.eq(id))
                    .filter(bookings::status.eq_any(from)),
            )
            .set((
                bookings::status.eq(to.as_str()),
                bookings::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
            Ok(changed == 1)
        })
        .await
    }

    async fn count_bookings_by_status(
        &self,
    ) -> Result<BTreeMap<BookingStatus, i64>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let rows = bookings::table
                .group_by(bookings::status)
                .select((bookings::status, count_star()))
                .load::<(String, i64)>(conn)?;

            let mut counts: BTreeMap<BookingStatus, i64> =
                BookingStatus::ALL.iter().map(|status| (*status, 0)).collect();
            for (status, count) in rows {
                counts.insert(status.parse()?, count);
            }
            Ok(counts)
        })
        .await
    }

    async fn get_stay(&self, booking_id: i64) -> Result<Option<Stay>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(stays::table
                .filter(stays::booking_id.eq(booking_id))
                .select(DbStay::as_select())
                .first(conn)
                .optional()?
                .map(Into::into))
        })
        .await
    }

    async fn check_in(&self, booking: &Booking, stay: &Stay) -> Result<bool, DatabaseError> {
        let booking = booking.clone();
        let stay = stay.clone();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                let changed = diesel::update(
                    bookings::table
                        .filter(bookings::id.eq(booking.id))
                        .filter(bookings::status.eq(BookingStatus::Confirmed.as_str())),
                )
                .set((
                    bookings::status.eq(BookingStatus::CheckedIn.as_str()),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
                if changed == 0 {
                    return Ok(false);
                }

                let existing: i64 = stays::table
                    .filter(stays::booking_id.eq(booking.id))
                    .filter(stays::check_in_time.is_not_null())
                    .count()
                    .get_result(conn)?;
                if existing > 0 {
                    // Rolls back the status change above.
                    return Err(DatabaseError::Conflict(format!(
                        "booking {} already has a check-in record",
                        booking.id
                    )));
                }
                // A stay row without a check-in time carries no information.
                diesel::delete(stays::table.filter(stays::booking_id.eq(booking.id)))
                    .execute(conn)?;

                diesel::insert_into(stays::table)
                    .values(&NewStay {
                        booking_id: booking.id,
                        check_in_time: stay.check_in_time,
                        checked_in_by: stay.checked_in_by,
                        additional_charges_cents: stay.additional_charges_cents,
                        charge_notes: &stay.charge_notes,
                        late_fee_cents: 0,
                        notes: stay.notes.as_deref(),
                    })
                    .execute(conn)?;

                diesel::update(rooms::table.find(booking.room_id))
                    .set((
                        rooms::status.eq(RoomStatus::Occupied.as_str()),
                        rooms::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
    }

    async fn add_charge(
        &self,
        booking_id: i64,
        amount_cents: i64,
        description: &str,
    ) -> Result<bool, DatabaseError> {
        let description = description.to_string();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                let Some(stay) = stays::table
                    .filter(stays::booking_id.eq(booking_id))
                    .filter(stays::check_in_time.is_not_null())
                    .filter(stays::check_out_time.is_null())
                    .select(DbStay::as_select())
                    .first(conn)
                    .optional()?
                else {
                    return Ok(false);
                };

                let charges = stay
                    .additional_charges_cents
                    .checked_add(amount_cents)
                    .ok_or_else(|| {
                        DatabaseError::Conflict(format!(
                            "charges of booking {booking_id} exceed the money range"
                        ))
                    })?;
                diesel::update(stays::table.find(stay.id))
                    .set((
                        stays::additional_charges_cents.eq(charges),
                        stays::charge_notes.eq(append_note(
                            &stay.charge_notes,
                            &description,
                            amount_cents,
                        )),
                    ))
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
    }

    async fn check_out(
        &self,
        booking: &Booking,
        checked_out_by: i64,
        at: DateTime<Utc>,
        today: NaiveDate,
        late_fee_per_day_cents: i64,
    ) -> Result<Option<CheckOutBill>, DatabaseError> {
        let booking = booking.clone();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                let changed = diesel::update(
                    bookings::table
                        .filter(bookings::id.eq(booking.id))
                        .filter(bookings::status.eq(BookingStatus::CheckedIn.as_str())),
                )
                .set((
                    bookings::status.eq(BookingStatus::CheckedOut.as_str()),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
                if changed == 0 {
                    return Ok(None);
                }

                let stay = stays::table
                    .filter(stays::booking_id.eq(booking.id))
                    .filter(stays::check_in_time.is_not_null())
                    .filter(stays::check_out_time.is_null())
                    .select(DbStay::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| {
                        DatabaseError::Conflict(format!("booking {} has no open stay", booking.id))
                    })?;
                let bill = CheckOutBill::compute(
                    booking.total_price_cents,
                    stay.additional_charges_cents,
                    booking.check_out_date,
                    today,
                    late_fee_per_day_cents,
                )
                .ok_or_else(|| {
                    DatabaseError::Conflict(format!(
                        "bill of booking {} exceeds the money range",
                        booking.id
                    ))
                })?;

                diesel::update(stays::table.find(stay.id))
                    .set((
                        stays::check_out_time.eq(Some(at)),
                        stays::checked_out_by.eq(Some(checked_out_by)),
                        stays::late_fee_cents.eq(bill.late_fee_cents),
                        stays::final_total_cents.eq(Some(bill.total_cents)),
                    ))
                    .execute(conn)?;

                diesel::update(rooms::table.find(booking.room_id))
                    .set((
                        rooms::status.eq(RoomStatus::Cleaning.as_str()),
                        rooms::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
                Ok(Some(bill))
            })
        })
        .await
    }

    async fn list_checked_in(&self) -> Result<Vec<(Booking, Stay)>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let rows = stays::table
                .inner_join(bookings::table)
                .filter(bookings::status.eq(BookingStatus::CheckedIn.as_str()))
                .filter(stays::check_in_time.is_not_null())
                .filter(stays::check_out_time.is_null())
                .order((bookings::check_out_date.asc(), bookings::id.asc()))
                .select((DbBooking::as_select(), DbStay::as_select()))
                .load::<(DbBooking, DbStay)>(conn)?;

            rows.into_iter()
                .map(|(booking, stay)| Ok((Booking::try_from(booking)?, Stay::from(stay))))
                .collect()
        })
        .await
    }
}
