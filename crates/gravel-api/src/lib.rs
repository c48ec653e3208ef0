//! gravel-api — REST API for gravel.
//!
//! Provides axum route handlers over the namespace service. Domain errors
//! map onto four outward status categories: conflict, bad request, not
//! found, and internal failure.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/namespaces` | List namespaces with their state |
//! | POST | `/api/namespaces/{namespace}` | Create a namespace |
//! | GET | `/api/namespaces/{namespace}` | Get a namespace's state |
//! | DELETE | `/api/namespaces/{namespace}` | Mark a namespace for deletion |
//! | GET | `/api/namespaces/{namespace}/keys/{key}` | Read a key (raw body) |
//! | PUT | `/api/namespaces/{namespace}/keys/{key}` | Write a key (raw body) |
//! | DELETE | `/api/namespaces/{namespace}/keys/{key}` | Delete a key |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use gravel_kv::RedbStore;
use gravel_namespace::NamespaceService;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: NamespaceService<RedbStore>,
}

/// Build the complete API router.
pub fn build_router(service: NamespaceService<RedbStore>) -> Router {
    let api_state = ApiState { service };

    let api_routes = Router::new()
        .route("/namespaces", get(handlers::list_namespaces))
        .route(
            "/namespaces/{namespace}",
            get(handlers::get_namespace)
                .post(handlers::create_namespace)
                .delete(handlers::delete_namespace),
        )
        .route(
            "/namespaces/{namespace}/keys/{key}",
            get(handlers::get_key)
                .put(handlers::set_key)
                .delete(handlers::delete_key),
        )
        .with_state(api_state);

    Router::new()
        .nest("/api", api_routes)
        .route("/healthz", get(handlers::healthz))
}
