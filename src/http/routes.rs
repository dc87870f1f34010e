use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::activity::{ActivityService, SheetStore};
use crate::core::auth::{AuthBroker, CredentialManager, TokenStore};
use crate::http::handlers;

/// Shared state handed to every request handler. Constructed once in the
/// composition root; there are no process-wide singletons.
pub struct AppContext<S: SheetStore, T: TokenStore, B: AuthBroker> {
    pub activities: ActivityService<S>,
    pub credentials: CredentialManager<T, B>,
}

pub fn router<S, T, B>(context: Arc<AppContext<S, T, B>>) -> Router
where
    S: SheetStore + 'static,
    T: TokenStore + 'static,
    B: AuthBroker + 'static,
{
    // Development posture: any origin, method, and header may call us.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health::<S, T, B>))
        .route("/api/log-activity", post(handlers::log_activity::<S, T, B>))
        .route("/api/activities", get(handlers::activities::<S, T, B>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(context)
}
