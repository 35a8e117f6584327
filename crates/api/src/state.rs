use std::sync::Arc;

use lectio_db::repositories::UserDirectory;

use crate::auth::claims::ClaimsCodec;
use crate::auth::session::SessionManager;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Everything is constructed once at startup and injected here; there are no
/// hidden statics. Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Access-token codec. The middleware verifies against this directly;
    /// it never touches the session store.
    pub codec: Arc<ClaimsCodec>,
    /// Session lifecycle orchestrator.
    pub sessions: Arc<SessionManager>,
    /// User lookup collaborator for the login flow.
    pub users: Arc<dyn UserDirectory>,
}
