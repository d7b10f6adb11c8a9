use chrono::NaiveDate;
use salvo::prelude::*;
use serde::Deserialize;

use crate::db::{Payment, PaymentFilter};
use crate::domain::{PaymentMethod, PaymentStatus, Permission};
use crate::hotel::payments::{day_window, PaymentInput, PaymentSummary};
use crate::web::metrics::Metrics;
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value, required_query};

#[derive(Debug, Deserialize)]
struct RefundRequest {
    reason: String,
}

#[handler]
pub async fn list_payments(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let (core, principal) = context(depot)?;
    if !principal.is_customer() {
        principal.require(Permission::ManagePayments)?;
    }
    let from = query_value::<NaiveDate>(req, "from")?;
    let to = query_value::<NaiveDate>(req, "to")?;
    let (from, until) = match (from, to) {
        (None, None) => (None, None),
        (from, to) => {
            let from = from.unwrap_or_default();
            let to = to.unwrap_or(core.today());
            let (start, end) = day_window(from, to)?;
            (Some(start), Some(end))
        }
    };
    let filter = PaymentFilter {
        status: query_value::<PaymentStatus>(req, "status")?,
        method: query_value::<PaymentMethod>(req, "method")?,
        customer_id: principal.scope_customer(query_value::<i64>(req, "customer_id")?)?,
        booking_id: query_value::<i64>(req, "booking_id")?,
        from,
        until,
    };
    Ok(Json(core.list_payments(&filter).await?))
}

#[handler]
pub async fn record_payment(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Payment>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManagePayments)?;
    let input: PaymentInput = json_body(req).await?;
    let payment = core.record_payment(input).await?;
    Metrics::payment_recorded();
    res.status_code(StatusCode::CREATED);
    Ok(Json(payment))
}

#[handler]
pub async fn refund_payment(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Payment>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManagePayments)?;
    let id = path_id(req, "id")?;
    let refund: RefundRequest = json_body(req).await?;
    let payment = core.refund_payment(id, &refund.reason).await?;
    Metrics::refund();
    Ok(Json(payment))
}

#[handler]
pub async fn payment_summary(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<PaymentSummary>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ManagePayments)?;
    let from = required_query::<NaiveDate>(req, "from")?;
    let to = required_query::<NaiveDate>(req, "to")?;
    Ok(Json(core.payment_summary(from, to).await?))
}
