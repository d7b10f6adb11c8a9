use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::db::{Amenity, Room, RoomType};
use crate::domain::RoomStatus;

use super::{not_found, required_text, HotelCore, HotelError, HotelResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RoomTypeInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_price_cents: i64,
    pub capacity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomInput {
    pub number: String,
    pub room_type_id: i64,
    #[serde(default)]
    pub floor: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmenityInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Omitted for hotel-wide amenities.
    #[serde(default)]
    pub room_type_id: Option<i64>,
}

impl RoomTypeInput {
    fn validate(&self) -> HotelResult<String> {
        if self.base_price_cents <= 0 {
            return Err(HotelError::Validation(
                "base_price_cents must be positive".to_string(),
            ));
        }
        if self.capacity < 1 {
            return Err(HotelError::Validation("capacity must be at least 1".to_string()));
        }
        required_text("name", &self.name, 100)
    }
}

impl HotelCore {
    pub async fn create_room_type(&self, input: RoomTypeInput) -> HotelResult<RoomType> {
        let name = input.validate()?;
        let now = Utc::now();
        let mut room_type = RoomType {
            id: 0,
            name,
            description: input.description.trim().to_string(),
            base_price_cents: input.base_price_cents,
            capacity: input.capacity,
            created_at: now,
            updated_at: now,
        };
        room_type.id = self.db().room_store().create_room_type(&room_type).await?;
        info!(room_type_id = room_type.id, name = %room_type.name, "room type created");
        Ok(room_type)
    }

    pub async fn update_room_type(&self, id: i64, input: RoomTypeInput) -> HotelResult<RoomType> {
        let name = input.validate()?;
        let mut room_type = self.room_type(id).await?;
        room_type.name = name;
        room_type.description = input.description.trim().to_string();
        room_type.base_price_cents = input.base_price_cents;
        room_type.capacity = input.capacity;
        self.db().room_store().update_room_type(&room_type).await?;
        self.room_type(id).await
    }

    pub async fn room_type(&self, id: i64) -> HotelResult<RoomType> {
        self.db()
            .room_store()
            .get_room_type(id)
            .await?
            .ok_or_else(|| not_found("room type", id))
    }

    pub async fn list_room_types(&self) -> HotelResult<Vec<RoomType>> {
        Ok(self.db().room_store().list_room_types().await?)
    }

    pub async fn create_room(&self, input: RoomInput) -> HotelResult<Room> {
        let number = required_text("number", &input.number, 20)?;
        self.room_type(input.room_type_id).await?;
        let now = Utc::now();
        let mut room = Room {
            id: 0,
            number,
            room_type_id: input.room_type_id,
            floor: input.floor,
            status: RoomStatus::Available,
            created_at: now,
            updated_at: now,
        };
        room.id = self.db().room_store().create_room(&room).await?;
        info!(room_id = room.id, number = %room.number, "room created");
        Ok(room)
    }

    pub async fn update_room(&self, id: i64, input: RoomInput) -> HotelResult<Room> {
        let number = required_text("number", &input.number, 20)?;
        self.room_type(input.room_type_id).await?;
        let mut room = self.room(id).await?;
        room.number = number;
        room.room_type_id = input.room_type_id;
        room.floor = input.floor;
        self.db().room_store().update_room(&room).await?;
        self.room(id).await
    }

    pub async fn set_room_status(&self, id: i64, status: RoomStatus) -> HotelResult<Room> {
        if !self.db().room_store().set_room_status(id, status).await? {
            return Err(not_found("room", id));
        }
        info!(room_id = id, status = %status, "room status changed");
        self.room(id).await
    }

    pub async fn room(&self, id: i64) -> HotelResult<Room> {
        self.db()
            .room_store()
            .get_room(id)
            .await?
            .ok_or_else(|| not_found("room", id))
    }

    pub async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        room_type_id: Option<i64>,
    ) -> HotelResult<Vec<Room>> {
        Ok(self.db().room_store().list_rooms(status, room_type_id).await?)
    }

    pub async fn available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i64,
    ) -> HotelResult<Vec<Room>> {
        if check_in >= check_out {
            return Err(HotelError::Validation(
                "check_out must be after check_in".to_string(),
            ));
        }
        if guests < 1 {
            return Err(HotelError::Validation("guests must be at least 1".to_string()));
        }
        Ok(self
            .db()
            .room_store()
            .available_rooms(check_in, check_out, guests)
            .await?)
    }

    pub async fn create_amenity(&self, input: AmenityInput) -> HotelResult<Amenity> {
        let name = required_text("name", &input.name, 100)?;
        if let Some(room_type_id) = input.room_type_id {
            self.room_type(room_type_id).await?;
        }
        let mut amenity = Amenity {
            id: 0,
            name,
            description: input.description.trim().to_string(),
            room_type_id: input.room_type_id,
            created_at: Utc::now(),
        };
        amenity.id = self.db().room_store().create_amenity(&amenity).await?;
        Ok(amenity)
    }

    pub async fn update_amenity(&self, id: i64, input: AmenityInput) -> HotelResult<Amenity> {
        let name = required_text("name", &input.name, 100)?;
        if let Some(room_type_id) = input.room_type_id {
            self.room_type(room_type_id).await?;
        }
        let store = self.db().room_store();
        let mut amenity = store
            .get_amenity(id)
            .await?
            .ok_or_else(|| not_found("amenity", id))?;
        amenity.name = name;
        amenity.description = input.description.trim().to_string();
        amenity.room_type_id = input.room_type_id;
        store.update_amenity(&amenity).await?;
        Ok(amenity)
    }

    pub async fn delete_amenity(&self, id: i64) -> HotelResult<()> {
        if self.db().room_store().delete_amenity(id).await? {
            Ok(())
        } else {
            Err(not_found("amenity", id))
        }
    }

    pub async fn list_amenities(&self, room_type_id: Option<i64>) -> HotelResult<Vec<Amenity>> {
        Ok(self.db().room_store().list_amenities(room_type_id).await?)
    }
}
