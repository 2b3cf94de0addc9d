// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{
    AppointmentBookingService, AppointmentLifecycleService, AppointmentStore, SlotAvailabilityService,
};

/// Services shared by every appointment handler. All of them sit on the same
/// store, which is the single synchronization point for bookings.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub availability: Arc<SlotAvailabilityService>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            booking: Arc::new(AppointmentBookingService::new(Arc::clone(&store), &config)),
            lifecycle: Arc::new(AppointmentLifecycleService::new(Arc::clone(&store))),
            availability: Arc::new(SlotAvailabilityService::new(store)),
            config,
        }
    }
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    // All appointment operations require authentication
    Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::get_my_appointments))
        .route("/doctor", get(handlers::get_doctor_appointments))
        .route("/admin", get(handlers::get_all_appointments))
        .route("/booked", get(handlers::get_booked_slots))
        .route("/slots", get(handlers::get_slot_availability))
        .route("/cancel/{appointment_id}", put(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
