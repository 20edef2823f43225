// Cleaning services booking core
//
// Pricing, availability and booking orchestration, plus the HTTP surface
// and storage backends that host them.

pub mod app;
pub mod appointments;
pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod pricing;
pub mod rate_limit;
pub mod settings;
pub mod store;
pub mod types;
pub mod validation;

pub use app::{create_router, AppState, Repositories};
pub use error::{BookingError, BookingResult};
