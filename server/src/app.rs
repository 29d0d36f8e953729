use crate::rooms::Hub;
use crate::upstream::Upstream;
use crate::{search, socket};
use axum::routing::get;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub hub: Hub,
    pub upstream: Upstream,
    /// Silence on a room socket before we ping it.
    pub idle_timeout: Duration,
    /// How long a pinged room socket gets to show signs of life.
    pub pong_timeout: Duration,
}

impl AppState {
    pub fn new(upstream: Upstream) -> Self {
        Self {
            hub: Hub::new(),
            upstream,
            idle_timeout: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/socket", get(socket::upgrade))
        .route("/api/search", get(search::search));
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(TraceLayer::new_for_http()).with_state(state)
}
