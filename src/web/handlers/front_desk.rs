use chrono::Utc;
use salvo::prelude::*;
use serde_json::{json, Value};

use crate::db::{Booking, Stay};
use crate::domain::Permission;
use crate::hotel::front_desk::{ChargeRequest, CheckInRequest, CheckOutQuote};
use crate::hotel::{HotelCore, Principal};
use crate::web::metrics::Metrics;
use crate::web::{context, ApiError};

use super::{json_body, optional_json_body, path_id};

fn desk_context(depot: &Depot) -> Result<(HotelCore, Principal), ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::CheckInOut)?;
    Ok((core, principal))
}

#[handler]
pub async fn check_in_list(depot: &mut Depot) -> Result<Json<Vec<Booking>>, ApiError> {
    let (core, _) = desk_context(depot)?;
    Ok(Json(core.check_in_list(core.today()).await?))
}

#[handler]
pub async fn check_in(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let (core, principal) = desk_context(depot)?;
    let booking_id = path_id(req, "booking_id")?;
    let request: CheckInRequest = optional_json_body(req).await?;
    let (booking, stay) = core
        .check_in(booking_id, principal.user_id, request, Utc::now(), core.today())
        .await?;
    Metrics::check_in();
    Ok(Json(json!({ "booking": booking, "stay": stay })))
}

#[handler]
pub async fn add_charge(req: &mut Request, depot: &mut Depot) -> Result<Json<Stay>, ApiError> {
    let (core, _) = desk_context(depot)?;
    let booking_id = path_id(req, "booking_id")?;
    let request: ChargeRequest = json_body(req).await?;
    Ok(Json(core.add_charge(booking_id, request).await?))
}

#[handler]
pub async fn check_out_list(depot: &mut Depot) -> Result<Json<Vec<CheckOutQuote>>, ApiError> {
    let (core, _) = desk_context(depot)?;
    Ok(Json(core.check_out_list(core.today()).await?))
}

#[handler]
pub async fn check_out_quote(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<CheckOutQuote>, ApiError> {
    let (core, _) = desk_context(depot)?;
    let booking_id = path_id(req, "booking_id")?;
    Ok(Json(core.check_out_quote(booking_id, core.today()).await?))
}

#[handler]
pub async fn check_out(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<CheckOutQuote>, ApiError> {
    let (core, principal) = desk_context(depot)?;
    let booking_id = path_id(req, "booking_id")?;
    let quote = core
        .check_out(booking_id, principal.user_id, Utc::now(), core.today())
        .await?;
    Metrics::check_out();
    Ok(Json(quote))
}
