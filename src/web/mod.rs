use std::sync::Arc;
use std::time::Instant;

use salvo::prelude::*;
use tracing::info;

use crate::config::Config;
use crate::hotel::{HotelCore, Principal};

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;

pub use self::error::ApiError;
pub use self::routes::create_router;

/// Shared by every request through the depot.
#[derive(Clone)]
pub struct WebState {
    pub core: HotelCore,
    pub metrics_enabled: bool,
    pub started_at: Instant,
}

impl WebState {
    pub fn new(core: HotelCore) -> Self {
        let metrics_enabled = core.config().metrics.enabled;
        Self {
            core,
            metrics_enabled,
            started_at: Instant::now(),
        }
    }
}

pub(crate) fn web_state(depot: &Depot) -> Result<&WebState, ApiError> {
    depot
        .obtain::<WebState>()
        .map_err(|_| ApiError::Internal("web state is not attached to the request".to_string()))
}

/// Core handle and authenticated caller of the current request.
pub(crate) fn context(depot: &Depot) -> Result<(HotelCore, Principal), ApiError> {
    let core = web_state(depot)?.core.clone();
    let principal = depot
        .obtain::<Principal>()
        .map_err(|_| ApiError::Unauthorized("authentication required".to_string()))?
        .clone();
    Ok((core, principal))
}

pub struct WebServer {
    config: Arc<Config>,
    state: WebState,
}

impl WebServer {
    pub fn new(config: Arc<Config>, core: HotelCore) -> Self {
        Self {
            config,
            state: WebState::new(core),
        }
    }

    pub async fn start(&self) -> salvo::Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        info!("Starting web server on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).try_bind().await?;
        Server::new(acceptor)
            .serve(create_router(self.state.clone()))
            .await;

        Ok(())
    }
}
