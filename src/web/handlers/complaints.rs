use salvo::prelude::*;

use crate::db::Complaint;
use crate::domain::{ComplaintStatus, Permission};
use crate::hotel::complaints::{ComplaintInput, ComplaintStatusChange};
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value};

#[handler]
pub async fn list_complaints(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let (core, principal) = context(depot)?;
    if !principal.is_customer() {
        principal.require(Permission::ManageComplaints)?;
    }
    let status = query_value::<ComplaintStatus>(req, "status")?;
    let customer_id = principal.scope_customer(query_value::<i64>(req, "customer_id")?)?;
    Ok(Json(core.list_complaints(status, customer_id).await?))
}

#[handler]
pub async fn file_complaint(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Complaint>, ApiError> {
    let (core, principal) = context(depot)?;
    let input: ComplaintInput = json_body(req).await?;
    principal.authorize_customer(input.customer_id, Permission::ManageComplaints)?;
    let complaint = core.file_complaint(input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(complaint))
}

#[handler]
pub async fn get_complaint(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Complaint>, ApiError> {
    let (core, principal) = context(depot)?;
    let complaint = core.complaint(path_id(req, "id")?).await?;
    principal.authorize_customer(complaint.customer_id, Permission::ManageComplaints)?;
    Ok(Json(complaint))
}

#[handler]
pub async fn change_status(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Complaint>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManageComplaints)?;
    let id = path_id(req, "id")?;
    let change: ComplaintStatusChange = json_body(req).await?;
    Ok(Json(core.change_complaint_status(id, change).await?))
}
