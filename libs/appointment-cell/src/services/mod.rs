pub mod availability;
pub mod booking;
pub mod lifecycle;
pub mod slots;
pub mod store;
pub mod validation;

pub use availability::SlotAvailabilityService;
pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use slots::{SlotTime, SLOT_CATALOG};
pub use store::{AppointmentStore, InMemoryAppointmentStore, StoreError, SupabaseAppointmentStore};
