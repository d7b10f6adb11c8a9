use std::time::Instant;

use salvo::prelude::*;
use tracing::info;

use crate::web::metrics::Metrics;

/// Logs every request once it has been answered.
#[handler]
pub async fn request_log(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    ctrl.call_next(req, depot, res).await;

    let status = res.status_code.unwrap_or(StatusCode::OK).as_u16();
    Metrics::http_request(status);
    info!(
        method = %method,
        path = %path,
        status,
        latency_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
}
