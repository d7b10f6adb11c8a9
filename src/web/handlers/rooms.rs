use chrono::NaiveDate;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{Amenity, Room, RoomType};
use crate::domain::{Permission, RoomStatus};
use crate::hotel::rooms::{AmenityInput, RoomInput, RoomTypeInput};
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value, require_staff, required_query};

#[derive(Debug, Deserialize)]
struct RoomStatusChange {
    status: RoomStatus,
}

#[handler]
pub async fn list_room_types(depot: &mut Depot) -> Result<Json<Vec<RoomType>>, ApiError> {
    let (core, principal) = context(depot)?;
    require_staff(&principal)?;
    Ok(Json(core.list_room_types().await?))
}

#[handler]
pub async fn create_room_type(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<RoomType>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRooms)?;
    let input: RoomTypeInput = json_body(req).await?;
    let room_type = core.create_room_type(input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(room_type))
}

#[handler]
pub async fn get_room_type(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<RoomType>, ApiError> {
    let (core, principal) = context(depot)?;
    require_staff(&principal)?;
    Ok(Json(core.room_type(path_id(req, "id")?).await?))
}

#[handler]
pub async fn update_room_type(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<RoomType>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRooms)?;
    let id = path_id(req, "id")?;
    let input: RoomTypeInput = json_body(req).await?;
    Ok(Json(core.update_room_type(id, input).await?))
}

#[handler]
pub async fn list_rooms(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<Room>>, ApiError> {
    let (core, principal) = context(depot)?;
    require_staff(&principal)?;
    let status = query_value::<RoomStatus>(req, "status")?;
    let room_type_id = query_value::<i64>(req, "room_type_id")?;
    Ok(Json(core.list_rooms(status, room_type_id).await?))
}

#[handler]
pub async fn create_room(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Room>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRooms)?;
    let input: RoomInput = json_body(req).await?;
    let room = core.create_room(input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(room))
}

#[handler]
pub async fn get_room(req: &mut Request, depot: &mut Depot) -> Result<Json<Room>, ApiError> {
    let (core, principal) = context(depot)?;
    require_staff(&principal)?;
    Ok(Json(core.room(path_id(req, "id")?).await?))
}

#[handler]
pub async fn update_room(req: &mut Request, depot: &mut Depot) -> Result<Json<Room>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRooms)?;
    let id = path_id(req, "id")?;
    let input: RoomInput = json_body(req).await?;
    Ok(Json(core.update_room(id, input).await?))
}

#[handler]
pub async fn set_room_status(req: &mut Request, depot: &mut Depot) -> Result<Json<Room>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRooms)?;
    let id = path_id(req, "id")?;
    let change: RoomStatusChange = json_body(req).await?;
    Ok(Json(core.set_room_status(id, change.status).await?))
}

/// Open to every authenticated caller so customers can search before booking.
#[handler]
pub async fn available_rooms(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<Room>>, ApiError> {
    let (core, _) = context(depot)?;
    let check_in = required_query::<NaiveDate>(req, "check_in")?;
    let check_out = required_query::<NaiveDate>(req, "check_out")?;
    let guests = query_value::<i64>(req, "guests")?.unwrap_or(1);
    Ok(Json(core.available_rooms(check_in, check_out, guests).await?))
}

#[handler]
pub async fn list_amenities(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<Amenity>>, ApiError> {
    let (core, _) = context(depot)?;
    let room_type_id = query_value::<i64>(req, "room_type_id")?;
    Ok(Json(core.list_amenities(room_type_id).await?))
}

#[handler]
pub async fn create_amenity(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Amenity>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageAmenities)?;
    let input: AmenityInput = json_body(req).await?;
    let amenity = core.create_amenity(input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(amenity))
}

#[handler]
pub async fn update_amenity(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Amenity>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageAmenities)?;
    let id = path_id(req, "id")?;
    let input: AmenityInput = json_body(req).await?;
    Ok(Json(core.update_amenity(id, input).await?))
}

#[handler]
pub async fn delete_amenity(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageAmenities)?;
    let id = path_id(req, "id")?;
    core.delete_amenity(id).await?;
    Ok(Json(json!({ "ok": true, "id": id })))
}
