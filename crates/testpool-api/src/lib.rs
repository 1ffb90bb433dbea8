//! testpool-api — REST API for the test-data pool.
//!
//! Provides axum route handlers for record CRUD, the checkout allocator,
//! release transitions, bulk import, and the settings round-trip.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/records` | Filtered record list |
//! | POST | `/api/v1/records` | Create a record |
//! | DELETE | `/api/v1/records` | Delete all records |
//! | GET | `/api/v1/records/{id}` | Get one record |
//! | PUT | `/api/v1/records/{id}` | Partial update |
//! | DELETE | `/api/v1/records/{id}` | Delete one record |
//! | POST | `/api/v1/records/checkout` | Reserve a matching AVAILABLE record |
//! | POST | `/api/v1/records/{id}/release` | Transition a record's status |
//! | POST | `/api/v1/records/import` | Bulk create with dedupe |
//! | GET | `/api/v1/settings` | Read settings |
//! | POST | `/api/v1/settings` | Replace settings |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use testpool_state::{RecordStore, SettingsStore};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: RecordStore,
    pub settings: Arc<SettingsStore>,
}

/// Build the complete API router.
pub fn build_router(store: RecordStore, settings: Arc<SettingsStore>) -> Router {
    let api_state = ApiState { store, settings };

    let api_routes = Router::new()
        .route(
            "/records",
            get(handlers::list_records)
                .post(handlers::create_record)
                .delete(handlers::delete_all_records),
        )
        .route("/records/checkout", post(handlers::checkout_record))
        .route("/records/import", post(handlers::import_records))
        .route(
            "/records/{id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route("/records/{id}/release", post(handlers::release_record))
        .route(
            "/settings",
            get(handlers::get_settings).post(handlers::update_settings),
        )
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
