use std::collections::BTreeMap;

use salvo::prelude::*;
use serde::Serialize;
use serde_json::json;

use crate::domain::access::resolve_all;
use crate::domain::{Permission, ResolvedPermission};
use crate::hotel::Principal;
use crate::web::error::render_error;
use crate::web::metrics::format_prometheus;
use crate::web::{context, web_state, ApiError};

#[handler]
pub async fn health_check(res: &mut Response) {
    res.render(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })));
}

#[handler]
pub async fn metrics(depot: &mut Depot, res: &mut Response) {
    match web_state(depot) {
        Ok(state) if state.metrics_enabled => {
            res.render(Text::Plain(format_prometheus(state.started_at)));
        }
        Ok(_) => render_error(res, StatusCode::NOT_FOUND, "metrics are disabled"),
        Err(err) => res.render(err),
    }
}

#[derive(Serialize)]
pub struct Me {
    principal: Principal,
    permissions: BTreeMap<Permission, ResolvedPermission>,
}

#[handler]
pub async fn me(depot: &mut Depot) -> Result<Json<Me>, ApiError> {
    let (core, principal) = context(depot)?;
    let permissions = if principal.user_id == 0 {
        resolve_all(&principal.permissions, &BTreeMap::new())
    } else {
        core.effective_permissions(principal.user_id).await?
    };
    Ok(Json(Me {
        principal,
        permissions,
    }))
}
