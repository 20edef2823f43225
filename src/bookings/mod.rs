// Bookings
//
// Quotes accepted by customers become bookings. Status changes go through
// BookingStatusMachine; schedule changes through the availability chain.

pub mod manager;
pub mod models;
pub mod repository;
pub mod status_machine;

pub use manager::{estimate_duration_minutes, BookingManager};
pub use models::{
    Booking, BookingConfirmation, BookingStatus, CancelRequest, CreateBookingRequest, NewBooking,
    PaymentStatus, Quote, QuoteStatus, RescheduleRequest, ScheduleRequest, ServiceSnapshot,
};
pub use repository::{BookingRepository, QuoteRepository};
pub use status_machine::BookingStatusMachine;

use chrono::NaiveDate;
use rand::Rng;

const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Human-readable reference such as `BK-20250602-7QX2MA`
pub fn reference_number(prefix: &str, date: NaiveDate) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, date.format("%Y%m%d"), suffix)
}
