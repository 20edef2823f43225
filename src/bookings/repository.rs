use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::bookings::{Booking, BookingStatus, NewBooking, Quote, QuoteStatus};
use crate::error::BookingResult;

/// Persistence for bookings. Bookings are never deleted, only transitioned.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: NewBooking) -> BookingResult<Booking>;

    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Booking>>;

    /// Non-cancelled booking for the same quote and exact slot
    async fn find_duplicate(
        &self,
        quote_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> BookingResult<Option<Booking>>;

    /// Moves a booking and clears its reminder flag
    async fn update_schedule(
        &self,
        id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Booking>;

    async fn update_status(
        &self,
        id: i32,
        status: BookingStatus,
        cancellation_reason: Option<String>,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Booking>;

    /// Non-cancelled bookings dated within `[from, to]`; `None` counts every service
    async fn count_for_service_between(
        &self,
        service_id: Option<i32>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookingResult<u64>;

    /// Completed bookings for an email, compared case-insensitively
    async fn count_completed_for_email(&self, email: &str) -> BookingResult<u64>;

    /// Pending or confirmed bookings on `date` whose reminder has not been sent
    async fn find_due_reminders(&self, date: NaiveDate) -> BookingResult<Vec<Booking>>;

    async fn mark_reminder_sent(&self, id: i32) -> BookingResult<()>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Quote>>;

    async fn update_status(&self, id: i32, status: QuoteStatus) -> BookingResult<()>;
}
