use salvo::prelude::*;

use crate::db::Customer;
use crate::domain::Permission;
use crate::hotel::customers::CustomerInput;
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value};

#[handler]
pub async fn list_customers(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ViewBookings)?;
    let search = query_value::<String>(req, "q")?;
    let limit = query_value::<i64>(req, "limit")?.unwrap_or(50);
    let offset = query_value::<i64>(req, "offset")?.unwrap_or(0);
    Ok(Json(
        core.list_customers(search.as_deref(), limit, offset).await?,
    ))
}

#[handler]
pub async fn create_customer(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Customer>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageBookings)?;
    let input: CustomerInput = json_body(req).await?;
    let customer = core.create_customer(input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(customer))
}

#[handler]
pub async fn get_customer(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Customer>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    principal.authorize_customer(id, Permission::ViewBookings)?;
    Ok(Json(core.customer(id).await?))
}

/// Customers may edit their own profile but never relink it to another login.
#[handler]
pub async fn update_customer(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Customer>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    principal.authorize_customer(id, Permission::ManageBookings)?;
    let mut input: CustomerInput = json_body(req).await?;
    if principal.is_customer() {
        input.user_id = Some(principal.user_id);
    }
    Ok(Json(core.update_customer(id, input).await?))
}
