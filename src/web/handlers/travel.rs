use salvo::prelude::*;
use serde::Deserialize;

use crate::db::{TravelBooking, TravelPackage};
use crate::domain::{Permission, TravelBookingStatus};
use crate::hotel::travel::{PackageInput, TravelBookingRequest};
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value};

#[derive(Debug, Deserialize)]
struct TravelStatusChange {
    status: TravelBookingStatus,
}

/// Inactive packages are only listed for travel managers asking with `all=true`.
#[handler]
pub async fn list_packages(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<TravelPackage>>, ApiError> {
    let (core, principal) = context(depot)?;
    let all = query_value::<bool>(req, "all")?.unwrap_or(false);
    if all {
        principal.require(Permission::ManageTravel)?;
    }
    Ok(Json(core.list_packages(!all).await?))
}

#[handler]
pub async fn create_package(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<TravelPackage>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageTravel)?;
    let input: PackageInput = json_body(req).await?;
    let package = core.create_package(input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(package))
}

#[handler]
pub async fn get_package(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<TravelPackage>, ApiError> {
    let (core, principal) = context(depot)?;
    let package = core.package(path_id(req, "id")?).await?;
    if !package.active {
        principal.require(Permission::ManageTravel)?;
    }
    Ok(Json(package))
}

#[handler]
pub async fn update_package(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<TravelPackage>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageTravel)?;
    let id = path_id(req, "id")?;
    let input: PackageInput = json_body(req).await?;
    Ok(Json(core.update_package(id, input).await?))
}

#[handler]
pub async fn deactivate_package(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<TravelPackage>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageTravel)?;
    Ok(Json(core.deactivate_package(path_id(req, "id")?).await?))
}

#[handler]
pub async fn list_travel_bookings(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<TravelBooking>>, ApiError> {
    let (core, principal) = context(depot)?;
    if !principal.is_customer() {
        principal.require(Permission::ManageTravel)?;
    }
    let customer_id = principal.scope_customer(query_value::<i64>(req, "customer_id")?)?;
    let package_id = query_value::<i64>(req, "package_id")?;
    Ok(Json(core.list_travel_bookings(customer_id, package_id).await?))
}

#[handler]
pub async fn book_package(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<TravelBooking>, ApiError> {
    let (core, principal) = context(depot)?;
    let request: TravelBookingRequest = json_body(req).await?;
    principal.authorize_customer(request.customer_id, Permission::ManageTravel)?;
    let booking = core.book_package(request, core.today()).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(booking))
}

/// Customers may cancel their own travel bookings; everything else needs
/// `manage-travel`.
#[handler]
pub async fn change_travel_status(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<TravelBooking>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    let change: TravelStatusChange = json_body(req).await?;
    if principal.is_customer() {
        let booking = core.travel_booking(id).await?;
        principal.authorize_customer(booking.customer_id, Permission::ManageTravel)?;
        if change.status != TravelBookingStatus::Cancelled {
            return Err(ApiError::Forbidden(
                "customers may only cancel travel bookings".to_string(),
            ));
        }
    } else {
        principal.require(Permission::ManageTravel)?;
    }
    Ok(Json(core.change_travel_booking_status(id, change.status).await?))
}
