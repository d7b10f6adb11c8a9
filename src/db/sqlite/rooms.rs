use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::{count_star, not};
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::{Amenity, Room, RoomType};
use crate::db::schema::{amenities, bookings, room_types, rooms};
use crate::db::{DatabaseError, RoomStore};
use crate::domain::{BookingStatus, RoomStatus};

use super::{last_insert_id, status_strings, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = room_types)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbRoomType {
    id: i64,
    name: String,
    description: String,
    base_price_cents: i64,
    capacity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbRoomType> for RoomType {
    fn from(value: DbRoomType) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            base_price_cents: value.base_price_cents,
            capacity: value.capacity,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = room_types)]
struct RoomTypeRow<'a> {
    name: &'a str,
    description: &'a str,
    base_price_cents: i64,
    capacity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> RoomTypeRow<'a> {
    fn new(value: &'a RoomType) -> Self {
        Self {
            name: &value.name,
            description: &value.description,
            base_price_cents: value.base_price_cents,
            capacity: value.capacity,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbRoom {
    id: i64,
    number: String,
    room_type_id: i64,
    floor: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbRoom> for Room {
    type Error = DatabaseError;

    fn try_from(value: DbRoom) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            number: value.number,
            room_type_id: value.room_type_id,
            floor: value.floor,
            status: value.status.parse()?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = rooms)]
struct NewRoom<'a> {
    number: &'a str,
    room_type_id: i64,
    floor: i64,
    status: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = rooms)]
struct UpdateRoom<'a> {
    number: &'a str,
    room_type_id: i64,
    floor: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = amenities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbAmenity {
    id: i64,
    name: String,
    description: String,
    room_type_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<DbAmenity> for Amenity {
    fn from(value: DbAmenity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            room_type_id: value.room_type_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = amenities)]
struct NewAmenity<'a> {
    name: &'a str,
    description: &'a str,
    room_type_id: Option<i64>,
    created_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = amenities)]
#[diesel(treat_none_as_null = true)]
struct UpdateAmenity<'a> {
    name: &'a str,
    description: &'a str,
    room_type_id: Option<i64>,
}

fn collect_rooms(rows: Vec<DbRoom>) -> Result<Vec<Room>, DatabaseError> {
    rows.into_iter().map(Room::try_from).collect()
}

pub struct SqliteRoomStore {
    pool: Pool,
}

impl SqliteRoomStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for SqliteRoomStore {
    async fn create_room_type(&self, room_type: &RoomType) -> Result<i64, DatabaseError> {
        let room_type = room_type.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(room_types::table)
                .values(&RoomTypeRow::new(&room_type))
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn update_room_type(&self, room_type: &RoomType) -> Result<(), DatabaseError> {
        let room_type = room_type.clone();
        with_connection(self.pool.clone(), move |conn| {
            let mut row = RoomTypeRow::new(&room_type);
            row.updated_at = Utc::now();
            diesel::update(room_types::table.find(room_type.id))
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get_room_type(&self, id: i64) -> Result<Option<RoomType>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(room_types::table
                .find(id)
                .select(DbRoomType::as_select())
                .first(conn)
                .optional()?
                .map(Into::into))
        })
        .await
    }

    async fn list_room_types(&self) -> Result<Vec<RoomType>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(room_types::table
                .order(room_types::name.asc())
                .select(DbRoomType::as_select())
                .load(conn)?
                .into_iter()
                .map(Into::into)
                .collect())
        })
        .await
    }

    async fn create_room(&self, room: &Room) -> Result<i64, DatabaseError> {
        let room = room.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(rooms::table)
                .values(&NewRoom {
                    number: &room.number,
                    room_type_id: room.room_type_id,
                    floor: room.floor,
                    status: room.status.as_str(),
                    created_at: room.created_at,
                    updated_at: room.updated_at,
                })
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn update_room(&self, room: &Room) -> Result<(), DatabaseError> {
        let room = room.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::update(rooms::table.find(room.id))
                .set(&UpdateRoom {
                    number: &room.number,
                    room_type_id: room.room_type_id,
                    floor: room.floor,
                    updated_at: Utc::now(),
                })
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn set_room_status(&self, id: i64, status: RoomStatus) -> Result<bool, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let changed = diesel::update(rooms::table.find(id))
                .set((
                    rooms::status.eq(status.as_str()),
                    rooms::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            Ok(changed == 1)
        })
        .await
    }

    async fn get_room(&self, id: i64) -> Result<Option<Room>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            rooms::table
                .find(id)
                .select(DbRoom::as_select())
                .first(conn)
                .optional()?
                .map(Room::try_from)
                .transpose()
        })
        .await
    }

    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        room_type_id: Option<i64>,
    ) -> Result<Vec<Room>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = rooms::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(rooms::status.eq(status.as_str()));
            }
            if let Some(type_id) = room_type_id {
                query = query.filter(rooms::room_type_id.eq(type_id));
            }
            let rows = query
                .order(rooms::number.asc())
                .select(DbRoom::as_select())
                .load(conn)?;
            collect_rooms(rows)
        })
        .await
    }

    async fn count_rooms_by_status(&self) -> Result<BTreeMap<RoomStatus, i64>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let rows = rooms::table
                .group_by(rooms::status)
                .select((rooms::status, count_star()))
                .load::<(String, i64)>(conn)?;

            let mut counts: BTreeMap<RoomStatus, i64> =
                RoomStatus::ALL.iter().map(|status| (*status, 0)).collect();
            for (status, count) in rows {
                counts.insert(status.parse()?, count);
            }
            Ok(counts)
        })
        .await
    }

    async fn available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i64,
    ) -> Result<Vec<Room>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let occupying = status_strings(BookingStatus::OCCUPYING, BookingStatus::as_str);
            let busy_rooms = bookings::table
                .filter(bookings::status.eq_any(occupying))
                .filter(bookings::check_in_date.lt(check_out))
                .filter(bookings::check_out_date.gt(check_in))
                .select(bookings::room_id);

            let rows = rooms::table
                .inner_join(room_types::table)
                .filter(room_types::capacity.ge(guests))
                .filter(rooms::status.ne(RoomStatus::Maintenance.as_str()))
                .filter(not(rooms::id.eq_any(busy_rooms)))
                .order((room_types::base_price_cents.asc(), rooms::number.asc()))
                .select(DbRoom::as_select())
                .load(conn)?;
            collect_rooms(rows)
        })
        .await
    }

    async fn create_amenity(&self, amenity: &Amenity) -> Result<i64, DatabaseError> {
        let amenity = amenity.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(amenities::table)
                .values(&NewAmenity {
                    name: &amenity.name,
                    description: &amenity.description,
                    room_type_id: amenity.room_type_id,
                    created_at: amenity.created_at,
                })
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn update_amenity(&self, amenity: &Amenity) -> Result<(), DatabaseError> {
        let amenity = amenity.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::update(amenities::table.find(amenity.id))
                .set(&UpdateAmenity {
                    name: &amenity.name,
                    description: &amenity.description,
                    room_type_id: amenity.room_type_id,
                })
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn delete_amenity(&self, id: i64) -> Result<bool, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(diesel::delete(amenities::table.find(id)).execute(conn)? == 1)
        })
        .await
    }

    async fn get_amenity(&self, id: i64) -> Result<Option<Amenity>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(amenities::table
                .find(id)
                .select(DbAmenity::as_select())
                .first(conn)
                .optional()?
                .map(Into::into))
        })
        .await
    }

    async fn list_amenities(
        &self,
        room_type_id: Option<i64>,
    ) -> Result<Vec<Amenity>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = amenities::table.into_boxed();
            if let Some(type_id) = room_type_id {
                // Hotel-wide amenities apply to every room type.
                query = query.filter(
                    amenities::room_type_id
                        .eq(type_id)
                        .or(amenities::room_type_id.is_null()),
                );
            }
            Ok(query
                .order(amenities::name.asc())
                .select(DbAmenity::as_select())
                .load(conn)?
                .into_iter()
                .map(Into::into)
                .collect())
        })
        .await
    }
}
