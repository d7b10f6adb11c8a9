use chrono::NaiveDate;
use salvo::prelude::*;

use crate::domain::Permission;
use crate::hotel::dashboard::{DashboardSummary, RevenuePoint};
use crate::web::{context, ApiError};

use super::required_query;

#[handler]
pub async fn summary(depot: &mut Depot) -> Result<Json<DashboardSummary>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ViewDashboard)?;
    Ok(Json(core.dashboard_summary(core.today()).await?))
}

#[handler]
pub async fn revenue(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<RevenuePoint>>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::ViewAnalytics)?;
    let from = required_query::<NaiveDate>(req, "from")?;
    let to = required_query::<NaiveDate>(req, "to")?;
    Ok(Json(core.revenue(from, to).await?))
}
