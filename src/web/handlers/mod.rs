use std::fmt::Display;
use std::str::FromStr;

use salvo::prelude::*;
use serde::de::DeserializeOwned;

use crate::hotel::Principal;
use crate::web::ApiError;

pub mod bookings;
pub mod chat;
pub mod complaints;
pub mod customers;
pub mod dashboard;
pub mod front_desk;
pub mod health;
pub mod payments;
pub mod rooms;
pub mod travel;
pub mod users;

#[cfg(test)]
mod tests;

pub(crate) fn path_value<T>(req: &Request, name: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = req
        .params()
        .get(name)
        .ok_or_else(|| ApiError::BadRequest(format!("missing path parameter {name}")))?;
    raw.parse()
        .map_err(|err| ApiError::BadRequest(format!("invalid {name} {raw:?}: {err}")))
}

pub(crate) fn path_id(req: &Request, name: &str) -> Result<i64, ApiError> {
    match path_value::<i64>(req, name)? {
        id if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!("invalid {name}"))),
    }
}

/// Optional query parameter; an empty value counts as absent.
pub(crate) fn query_value<T>(req: &Request, name: &str) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    match req.queries().get(name).map(|raw| raw.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err| ApiError::BadRequest(format!("invalid {name} {raw:?}: {err}"))),
    }
}

pub(crate) fn required_query<T>(req: &Request, name: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    query_value(req, name)?
        .ok_or_else(|| ApiError::BadRequest(format!("missing {name} query parameter")))
}

pub(crate) async fn json_body<T: DeserializeOwned>(req: &mut Request) -> Result<T, ApiError> {
    Ok(req.parse_json::<T>().await?)
}

/// Like `json_body`, but a request without a body yields `T::default()`.
pub(crate) async fn optional_json_body<T: DeserializeOwned + Default>(
    req: &mut Request,
) -> Result<T, ApiError> {
    if req.content_type().is_none() {
        return Ok(T::default());
    }
    json_body(req).await
}

pub(crate) fn require_staff(principal: &Principal) -> Result<(), ApiError> {
    if principal.role.is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("staff only".to_string()))
    }
}
