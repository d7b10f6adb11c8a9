use salvo::http::header::AUTHORIZATION;
use salvo::prelude::*;
use tracing::{debug, error};

use crate::web::error::render_error;
use crate::web::metrics::Metrics;
use crate::web::WebState;

fn bearer_token(req: &Request) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

fn reject(res: &mut Response, ctrl: &mut FlowCtrl, message: &str) {
    Metrics::auth_failure();
    render_error(res, StatusCode::UNAUTHORIZED, message);
    ctrl.skip_rest();
}

/// Resolves the bearer token into a `Principal` stored in the depot.
#[handler]
pub async fn require_token(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Some(token) = bearer_token(req) else {
        reject(res, ctrl, "missing bearer token");
        return;
    };
    let core = match depot.obtain::<WebState>() {
        Ok(state) => state.core.clone(),
        Err(_) => {
            error!("web state is not attached to the request");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
            ctrl.skip_rest();
            return;
        }
    };

    match core.authenticate(&token).await {
        Ok(Some(principal)) => {
            debug!(user_id = principal.user_id, role = %principal.role, "request authenticated");
            depot.inject(principal);
            ctrl.call_next(req, depot, res).await;
        }
        Ok(None) => reject(res, ctrl, "invalid or revoked token"),
        Err(err) => {
            error!(error = %err, "token lookup failed");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
            ctrl.skip_rest();
        }
    }
}
