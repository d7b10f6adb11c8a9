use std::collections::{BTreeMap, BTreeSet};

use salvo::prelude::*;
use serde::Deserialize;

use crate::db::User;
use crate::domain::{Permission, ResolvedPermission, Role};
use crate::hotel::users::{IssuedToken, NewUserInput, RoleGrants, UserUpdate};
use crate::hotel::{HotelCore, Principal};
use crate::web::{context, ApiError};

use super::{json_body, path_id, path_value, query_value};

#[derive(Debug, Deserialize)]
struct OverrideRequest {
    granted: bool,
}

#[derive(Debug, Deserialize)]
struct RolePermissionsRequest {
    permissions: BTreeSet<Permission>,
}

/// Users can always read their own account.
async fn visible_user(core: &HotelCore, actor: &Principal, id: i64) -> Result<User, ApiError> {
    if actor.user_id == id {
        Ok(core.user(id).await?)
    } else {
        Ok(core.managed_user(actor, id).await?)
    }
}

#[handler]
pub async fn list_users(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<User>>, ApiError> {
    let (core, principal) = context(depot)?;
    let role = query_value::<Role>(req, "role")?;
    Ok(Json(core.list_users(&principal, role).await?))
}

#[handler]
pub async fn create_user(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<IssuedToken>, ApiError> {
    let (core, principal) = context(depot)?;
    let input: NewUserInput = json_body(req).await?;
    let issued = core.create_user(&principal, input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(issued))
}

#[handler]
pub async fn get_user(req: &mut Request, depot: &mut Depot) -> Result<Json<User>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    Ok(Json(visible_user(&core, &principal, id).await?))
}

#[handler]
pub async fn update_user(req: &mut Request, depot: &mut Depot) -> Result<Json<User>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    let update: UserUpdate = json_body(req).await?;
    Ok(Json(core.update_user(&principal, id, update).await?))
}

#[handler]
pub async fn deactivate_user(req: &mut Request, depot: &mut Depot) -> Result<Json<User>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    Ok(Json(core.deactivate_user(&principal, id).await?))
}

#[handler]
pub async fn rotate_token(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<IssuedToken>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    Ok(Json(core.rotate_token(&principal, id).await?))
}

#[handler]
pub async fn effective_permissions(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<BTreeMap<Permission, ResolvedPermission>>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    let user = visible_user(&core, &principal, id).await?;
    Ok(Json(core.effective_permissions(user.id).await?))
}

#[handler]
pub async fn set_override(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<BTreeMap<Permission, ResolvedPermission>>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    let permission = path_value::<Permission>(req, "permission")?;
    let request: OverrideRequest = json_body(req).await?;
    Ok(Json(
        core.set_override(&principal, id, permission, request.granted)
            .await?,
    ))
}

#[handler]
pub async fn clear_override(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<BTreeMap<Permission, ResolvedPermission>>, ApiError> {
    let (core, principal) = context(depot)?;
    let id = path_id(req, "id")?;
    let permission = path_value::<Permission>(req, "permission")?;
    Ok(Json(core.clear_override(&principal, id, permission).await?))
}

#[handler]
pub async fn list_roles(depot: &mut Depot) -> Result<Json<Vec<RoleGrants>>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRoles)?;
    Ok(Json(core.list_roles().await?))
}

#[handler]
pub async fn set_role_permissions(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<RoleGrants>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageRoles)?;
    let role = path_value::<Role>(req, "role")?;
    let request: RolePermissionsRequest = json_body(req).await?;
    Ok(Json(core.set_role_permissions(role, request.permissions).await?))
}
