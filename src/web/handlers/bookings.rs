use chrono::NaiveDate;
use salvo::prelude::*;
use serde::Deserialize;

use crate::db::{Booking, BookingFilter};
use crate::domain::{BookingStatus, Permission};
use crate::hotel::payments::BookingBalance;
use crate::hotel::reservations::BookingRequest;
use crate::web::metrics::Metrics;
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value};

#[derive(Debug, Deserialize)]
struct CancellationDecision {
    approve: bool,
}

#[handler]
pub async fn list_bookings(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let (core, principal) = context(depot)?;
    if !principal.is_customer() {
        principal.require(Permission::ViewBookings)?;
    }
    let filter = BookingFilter {
        status: query_value::<BookingStatus>(req, "status")?,
        customer_id: principal.scope_customer(query_value::<i64>(req, "customer_id")?)?,
        room_id: query_value::<i64>(req, "room_id")?,
        from: query_value::<NaiveDate>(req, "from")?,
        to: query_value::<NaiveDate>(req, "to")?,
    };
    Ok(Json(core.list_bookings(&filter).await?))
}

#[handler]
pub async fn create_booking(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Booking>, ApiError> {
    let (core, principal) = context(depot)?;
    let request: BookingRequest = json_body(req).await?;
    principal.authorize_customer(request.customer_id, Permission::ManageBookings)?;
    let booking = core.create_booking(request, core.today()).await?;
    Metrics::booking_created();
    res.status_code(StatusCode::CREATED);
    Ok(Json(booking))
}

#[handler]
pub async fn get_booking(req: &mut Request, depot: &mut Depot) -> Result<Json<Booking>, ApiError> {
    let (core, principal) = context(depot)?;
    let booking = core.booking(path_id(req, "id")?).await?;
    principal.authorize_customer(booking.customer_id, Permission::ViewBookings)?;
    Ok(Json(booking))
}

#[handler]
pub async fn request_cancellation(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Booking>, ApiError> {
    let (core, principal) = context(depot)?;
    let booking = core.booking(path_id(req, "id")?).await?;
    principal.authorize_customer(booking.customer_id, Permission::ManageBookings)?;
    Ok(Json(
        core.request_cancellation(booking.id, core.today()).await?,
    ))
}

#[handler]
pub async fn resolve_cancellation(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Booking>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageBookings)?;
    let id = path_id(req, "id")?;
    let decision: CancellationDecision = json_body(req).await?;
    Ok(Json(core.resolve_cancellation(id, decision.approve).await?))
}

#[handler]
pub async fn cancel_booking(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Booking>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageBookings)?;
    Ok(Json(core.cancel_booking(path_id(req, "id")?).await?))
}

#[handler]
pub async fn booking_balance(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<BookingBalance>, ApiError> {
    let (core, principal) = context(depot)?;
    let booking = core.booking(path_id(req, "id")?).await?;
    principal.authorize_customer(booking.customer_id, Permission::ViewBookings)?;
    Ok(Json(core.booking_balance(booking.id).await?))
}
