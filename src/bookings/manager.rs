// Booking Manager
//
// Turns accepted quotes into bookings and drives their lifecycle. Every
// schedule change goes through the availability gate chain first.

use chrono::{Duration, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::availability::slots::add_minutes;
use crate::availability::{AvailabilityService, SlotAvailability, SlotSpec, TimeSlot};
use crate::bookings::{
    reference_number, Booking, BookingRepository, BookingStatus, BookingStatusMachine,
    NewBooking, QuoteRepository, QuoteStatus, RescheduleRequest, ScheduleRequest,
    ServiceSnapshot,
};
use crate::catalog::ServiceRepository;
use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::events::{DomainEvent, EventEnvelope, EventSink};
use crate::pricing::models::round_money;
use crate::pricing::resolve_service;
use crate::settings::ConfigStore;
use crate::validation::{require_date, require_time};

/// Job length from property size: under 100 sqm two hours, under 300 four, otherwise a full day
pub fn estimate_duration_minutes(area_sqm: Decimal) -> u32 {
    if area_sqm < Decimal::from(100) {
        120
    } else if area_sqm < Decimal::from(300) {
        240
    } else {
        480
    }
}

/// Resolves the end of a slot, deriving it from `duration` when not given
pub(crate) fn slot_end(
    start: NaiveTime,
    end_time: Option<&str>,
    duration: u32,
) -> BookingResult<NaiveTime> {
    match end_time {
        Some(value) => require_time("end_time", value),
        None => add_minutes(start, duration)
            .ok_or_else(|| BookingError::field("start_time", "Slot must end before midnight")),
    }
}

pub struct BookingManager {
    bookings: Arc<dyn BookingRepository>,
    quotes: Arc<dyn QuoteRepository>,
    services: Arc<dyn ServiceRepository>,
    availability: Arc<AvailabilityService>,
    config_store: Arc<ConfigStore>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl BookingManager {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        quotes: Arc<dyn QuoteRepository>,
        services: Arc<dyn ServiceRepository>,
        availability: Arc<AvailabilityService>,
        config_store: Arc<ConfigStore>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            quotes,
            services,
            availability,
            config_store,
            events,
            clock,
        }
    }

    async fn emit(&self, event: DomainEvent) {
        self.events
            .emit(EventEnvelope::new(event, self.clock.now()))
            .await;
    }

    /// Create a booking from an accepted quote
    ///
    /// # Validation
    /// - Quote must exist, match the token, and be neither expired, rejected nor cancelled
    /// - The same quote cannot be booked twice into the same slot
    /// - The slot must pass the full availability chain
    ///
    /// On success the quote is flipped to `booked` (no-op if it already is).
    pub async fn create_booking_from_quote(
        &self,
        quote_id: i32,
        token: &str,
        request: &ScheduleRequest,
    ) -> BookingResult<Booking> {
        let quote = self
            .quotes
            .find_by_id(quote_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Quote", quote_id))?;

        let today = self.clock.today();
        quote.ensure_bookable(today, token)?;

        let date = require_date("date", &request.date)?;
        let start = require_time("start_time", &request.start_time)?;
        let duration = estimate_duration_minutes(quote.area_sqm);
        let end = slot_end(start, request.end_time.as_deref(), duration)?;

        if let Some(existing) = self
            .bookings
            .find_duplicate(quote.id, date, start, end)
            .await?
        {
            warn!(quote_id, booking_id = existing.id, "Duplicate booking attempt");
            return Err(BookingError::Conflict(
                "A booking already exists for this quote and time slot".to_string(),
            ));
        }

        let check = self
            .availability
            .check_slot_availability(date, start, end, None)
            .await?;
        if !check.available {
            warn!(quote_id, reason = %check.reason, "Booking rejected: {}", check.message);
            return Err(BookingError::Unavailable(check));
        }

        let snapshot = self.config_store.snapshot().await?;
        let deposit_amount = round_money(
            quote.total_amount * snapshot.booking.deposit_percentage / Decimal::ONE_HUNDRED,
        );

        let new_booking = NewBooking {
            booking_number: reference_number("BK", today),
            quote_id: Some(quote.id),
            service_id: quote.service_id,
            customer_name: quote.customer_name.clone(),
            customer_email: quote.customer_email.clone(),
            customer_phone: quote.customer_phone.clone(),
            address: quote.address.clone(),
            service_snapshot: ServiceSnapshot {
                service_id: quote.service_id,
                service_name: quote.service_name.clone(),
                area_sqm: quote.area_sqm,
                duration_minutes: duration,
                property_type: quote.property_type,
                surface_material: quote.surface_material,
                building_height: quote.building_height,
            },
            booking_date: date,
            start_time: start,
            end_time: end,
            total_amount: quote.total_amount,
            deposit_amount,
            balance_amount: quote.total_amount - deposit_amount,
            notes: request.notes.clone(),
            created_at: self.clock.now(),
        };

        let booking = self.bookings.insert(new_booking).await?;
        info!(
            booking_id = booking.id,
            quote_id,
            "Booking {} created for {} {}-{}",
            booking.booking_number,
            booking.booking_date,
            booking.start_time.format("%H:%M"),
            booking.end_time.format("%H:%M")
        );

        if quote.status != QuoteStatus::Booked {
            self.quotes.update_status(quote.id, QuoteStatus::Booked).await?;
            self.emit(DomainEvent::QuoteBooked {
                quote_id: quote.id,
                booking_id: booking.id,
            })
            .await;
        }

        self.emit(DomainEvent::BookingCreated {
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            quote_id: booking.quote_id,
        })
        .await;

        Ok(booking)
    }

    async fn load(&self, id: i32) -> BookingResult<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", id))
    }

    /// Move a booking to a new slot, keeping its length when no end time is given
    pub async fn reschedule_booking(
        &self,
        id: i32,
        request: &RescheduleRequest,
    ) -> BookingResult<Booking> {
        let booking = self.load(id).await?;
        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::Confirmed
        ) {
            return Err(BookingError::Conflict(format!(
                "A {} booking cannot be rescheduled",
                booking.status
            )));
        }

        let date = require_date("date", &request.date)?;
        let start = require_time("start_time", &request.start_time)?;
        let current_length = (booking.end_time - booking.start_time).num_minutes();
        let duration = u32::try_from(current_length)
            .unwrap_or(booking.service_snapshot.duration_minutes);
        let end = slot_end(start, request.end_time.as_deref(), duration)?;

        let check = self
            .availability
            .check_slot_availability(date, start, end, Some(booking.id))
            .await?;
        if !check.available {
            warn!(booking_id = id, reason = %check.reason, "Reschedule rejected: {}", check.message);
            return Err(BookingError::Unavailable(check));
        }

        let updated = self
            .bookings
            .update_schedule(id, date, start, end, self.clock.now())
            .await?;
        info!(booking_id = id, "Booking rescheduled to {} {}", date, start.format("%H:%M"));

        self.emit(DomainEvent::BookingRescheduled {
            booking_id: id,
            date,
            start_time: start,
            end_time: end,
        })
        .await;

        Ok(updated)
    }

    /// Cancel a booking outside the cancellation window
    pub async fn cancel_booking(&self, id: i32, reason: Option<String>) -> BookingResult<Booking> {
        let booking = self.load(id).await?;
        BookingStatusMachine::transition(booking.status, BookingStatus::Cancelled)
            .map_err(BookingError::Conflict)?;

        let snapshot = self.config_store.snapshot().await?;
        let window_hours = snapshot.booking.cancellation_window_hours;
        let starts_at = booking.booking_date.and_time(booking.start_time);
        if starts_at - self.clock.now() < Duration::hours(i64::from(window_hours)) {
            warn!(booking_id = id, "Cancellation inside the {}h window", window_hours);
            return Err(BookingError::field(
                "booking_id",
                format!(
                    "Bookings can only be cancelled at least {} hours before the scheduled start",
                    window_hours
                ),
            ));
        }

        let cancelled = self
            .bookings
            .update_status(id, BookingStatus::Cancelled, reason.clone(), self.clock.now())
            .await?;
        info!(booking_id = id, "Booking cancelled");

        self.emit(DomainEvent::BookingCancelled {
            booking_id: id,
            reason,
        })
        .await;

        Ok(cancelled)
    }

    pub async fn confirm_booking(&self, id: i32) -> BookingResult<Booking> {
        let booking = self.transition(id, BookingStatus::Confirmed).await?;
        self.emit(DomainEvent::BookingConfirmed { booking_id: id }).await;
        Ok(booking)
    }

    pub async fn complete_booking(&self, id: i32) -> BookingResult<Booking> {
        let booking = self.transition(id, BookingStatus::Completed).await?;
        self.emit(DomainEvent::BookingCompleted { booking_id: id }).await;
        Ok(booking)
    }

    async fn transition(&self, id: i32, to: BookingStatus) -> BookingResult<Booking> {
        let booking = self.load(id).await?;
        let status =
            BookingStatusMachine::transition(booking.status, to).map_err(BookingError::Conflict)?;
        let updated = self
            .bookings
            .update_status(id, status, None, self.clock.now())
            .await?;
        info!(booking_id = id, "Booking {} -> {}", booking.status, status);
        Ok(updated)
    }

    async fn slot_spec(&self, service_id: Option<i32>) -> BookingResult<SlotSpec> {
        let service = resolve_service(self.services.as_ref(), service_id).await?;
        match service {
            Some(service) => Ok(SlotSpec {
                duration: service.duration_minutes,
                buffer_before: service.buffer_before,
                buffer_after: service.buffer_after,
            }),
            None => {
                let snapshot = self.config_store.snapshot().await?;
                Ok(SlotSpec::minutes(snapshot.booking.default_service_duration))
            }
        }
    }

    /// Slots for a date shaped by the service (or the default duration)
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        service_id: Option<i32>,
    ) -> BookingResult<Vec<SlotAvailability>> {
        let spec = self.slot_spec(service_id).await?;
        self.availability.get_available_slots(date, spec).await
    }

    pub async fn next_available_slot(
        &self,
        from: NaiveDate,
        service_id: Option<i32>,
    ) -> BookingResult<Option<TimeSlot>> {
        let spec = self.slot_spec(service_id).await?;
        self.availability.find_next_available_slot(from, spec).await
    }

    /// Emits a reminder for every active booking scheduled tomorrow, once per booking
    pub async fn dispatch_due_reminders(&self) -> BookingResult<usize> {
        let tomorrow = self.clock.today() + Duration::days(1);
        let due = self.bookings.find_due_reminders(tomorrow).await?;

        for booking in &due {
            self.bookings.mark_reminder_sent(booking.id).await?;
            self.emit(DomainEvent::BookingReminderDue {
                booking_id: booking.id,
                customer_email: booking.customer_email.clone(),
                date: booking.booking_date,
                start_time: booking.start_time,
            })
            .await;
        }

        debug!("Dispatched {} reminders for {}", due.len(), tomorrow);
        Ok(due.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::AvailabilityReason;
    use crate::bookings::{Quote, QuoteStatus};
    use crate::catalog::Service;
    use crate::clock::FixedClock;
    use crate::settings::SettingsStore;
    use crate::store::memory::{
        test_booking, MemorySettingsStore, MemoryStore, RecordingEventSink,
    };
    use crate::types::{PropertyType, ServiceCategory, SurfaceMaterial};
    use rust_decimal_macros::dec;
    use serde_json::json;

    // Monday 2025-06-02 07:00
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn quote(id: i32) -> Quote {
        Quote {
            id,
            quote_number: format!("Q-{:04}", id),
            token: "secret".to_string(),
            service_id: None,
            service_name: None,
            customer_name: "Sam".to_string(),
            customer_email: "sam@example.com".to_string(),
            customer_phone: None,
            address: Some("1 Main St".to_string()),
            area_sqm: dec!(80),
            property_type: PropertyType::Residential,
            surface_material: SurfaceMaterial::Brick,
            building_height: 1,
            total_amount: dec!(1234.20),
            status: QuoteStatus::Accepted,
            valid_until: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            created_at: monday().and_hms_opt(6, 0, 0).unwrap(),
        }
    }

    fn schedule(date: &str, start: &str) -> ScheduleRequest {
        ScheduleRequest {
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: None,
            notes: None,
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        events: Arc<RecordingEventSink>,
        manager: BookingManager,
    }

    async fn fixture(settings: &[(&str, serde_json::Value)]) -> Fixture {
        let settings_store = Arc::new(MemorySettingsStore::default());
        for (key, value) in settings {
            settings_store.update(key, value.clone()).await.unwrap();
        }
        let store = Arc::new(MemoryStore::default());
        let events = Arc::new(RecordingEventSink::default());
        let config = Arc::new(ConfigStore::new(settings_store));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(monday(), 7, 0).unwrap());
        let availability = Arc::new(AvailabilityService::new(
            config.clone(),
            store.clone(),
            clock.clone(),
        ));
        let manager = BookingManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            availability,
            config,
            events.clone(),
            clock,
        );

        Fixture {
            store,
            events,
            manager,
        }
    }

    #[test]
    fn test_duration_tiers() {
        assert_eq!(estimate_duration_minutes(dec!(99.99)), 120);
        assert_eq!(estimate_duration_minutes(dec!(100)), 240);
        assert_eq!(estimate_duration_minutes(dec!(299)), 240);
        assert_eq!(estimate_duration_minutes(dec!(300)), 480);
    }

    #[tokio::test]
    async fn test_create_booking_from_quote() {
        let f = fixture(&[]).await;
        f.store.add_quote(quote(4)).await;

        let booking = f
            .manager
            .create_booking_from_quote(4, "secret", &schedule("2025-06-04", "09:00"))
            .await
            .unwrap();

        assert!(booking.booking_number.starts_with("BK-20250602-"));
        assert_eq!(booking.booking_number.len(), 18);
        assert_eq!(booking.end_time, t(11, 0));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.deposit_amount, dec!(0));
        assert_eq!(booking.balance_amount, dec!(1234.20));
        assert_eq!(booking.service_snapshot.duration_minutes, 120);

        let stored = f.store.quote(4).await.unwrap();
        assert_eq!(stored.status, QuoteStatus::Booked);
        assert_eq!(f.events.names().await, vec!["quote.booked", "booking.created"]);
    }

    #[tokio::test]
    async fn test_already_booked_quote_is_not_flipped_again() {
        let f = fixture(&[]).await;
        f.store
            .add_quote(Quote {
                status: QuoteStatus::Booked,
                ..quote(4)
            })
            .await;

        f.manager
            .create_booking_from_quote(4, "secret", &schedule("2025-06-04", "09:00"))
            .await
            .unwrap();

        assert_eq!(f.events.names().await, vec!["booking.created"]);
    }

    #[tokio::test]
    async fn test_deposit_split() {
        let f = fixture(&[("deposit_percentage", json!(25))]).await;
        f.store.add_quote(quote(4)).await;

        let booking = f
            .manager
            .create_booking_from_quote(4, "secret", &schedule("2025-06-04", "09:00"))
            .await
            .unwrap();

        assert_eq!(booking.deposit_amount, dec!(308.55));
        assert_eq!(booking.balance_amount, dec!(925.65));
    }

    #[tokio::test]
    async fn test_duplicate_booking_is_conflict() {
        let f = fixture(&[]).await;
        f.store.add_quote(quote(4)).await;
        let request = schedule("2025-06-04", "09:00");

        f.manager
            .create_booking_from_quote(4, "secret", &request)
            .await
            .unwrap();
        let second = f
            .manager
            .create_booking_from_quote(4, "secret", &request)
            .await;

        assert!(matches!(second, Err(BookingError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unavailable_slot_is_rejected() {
        let f = fixture(&[]).await;
        f.store.add_quote(quote(4)).await;
        f.store
            .add_booking(test_booking(1, wednesday(), (10, 0), (12, 0)))
            .await;

        let result = f
            .manager
            .create_booking_from_quote(4, "secret", &schedule("2025-06-04", "09:00"))
            .await;

        match result {
            Err(BookingError::Unavailable(check)) => {
                assert_eq!(check.reason, AvailabilityReason::TimeConflict)
            }
            other => panic!("expected time conflict, got {:?}", other),
        }
        assert!(f.events.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_token_and_missing_quote() {
        let f = fixture(&[]).await;
        f.store.add_quote(quote(4)).await;

        let bad_token = f
            .manager
            .create_booking_from_quote(4, "guess", &schedule("2025-06-04", "09:00"))
            .await;
        assert!(matches!(bad_token, Err(BookingError::Validation { .. })));

        let missing = f
            .manager
            .create_booking_from_quote(99, "secret", &schedule("2025-06-04", "09:00"))
            .await;
        assert!(matches!(missing, Err(BookingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_reschedule_excludes_own_slot() {
        let f = fixture(&[]).await;
        f.store
            .add_booking(test_booking(1, wednesday(), (9, 0), (11, 0)))
            .await;

        let moved = f
            .manager
            .reschedule_booking(
                1,
                &RescheduleRequest {
                    date: "2025-06-04".to_string(),
                    start_time: "10:00".to_string(),
                    end_time: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.start_time, t(10, 0));
        assert_eq!(moved.end_time, t(12, 0));
        assert!(!moved.reminder_sent);
        assert_eq!(f.events.names().await, vec!["booking.rescheduled"]);
    }

    #[tokio::test]
    async fn test_cancel_twice_reports_already_cancelled() {
        let f = fixture(&[]).await;
        f.store
            .add_booking(test_booking(1, wednesday(), (9, 0), (11, 0)))
            .await;

        let cancelled = f
            .manager
            .cancel_booking(1, Some("Moving".to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Moving"));

        match f.manager.cancel_booking(1, None).await {
            Err(BookingError::Conflict(message)) => {
                assert_eq!(message, "Booking is already cancelled")
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_inside_window_is_rejected() {
        let f = fixture(&[]).await;
        let tomorrow = monday() + Duration::days(1);
        f.store
            .add_booking(test_booking(1, tomorrow, (9, 0), (11, 0)))
            .await;

        let result = f.manager.cancel_booking(1, None).await;
        assert!(matches!(result, Err(BookingError::Validation { .. })));

        let stored = f.store.booking(1).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_confirm_then_complete() {
        let f = fixture(&[]).await;
        f.store
            .add_booking(test_booking(1, wednesday(), (9, 0), (11, 0)))
            .await;

        let early = f.manager.complete_booking(1).await;
        assert!(matches!(early, Err(BookingError::Conflict(_))));

        f.manager.confirm_booking(1).await.unwrap();
        let completed = f.manager.complete_booking(1).await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
        assert_eq!(
            f.events.names().await,
            vec!["booking.confirmed", "booking.completed"]
        );
    }

    #[tokio::test]
    async fn test_reminders_are_sent_once() {
        let f = fixture(&[]).await;
        let tomorrow = monday() + Duration::days(1);
        f.store
            .add_booking(test_booking(1, tomorrow, (9, 0), (11, 0)))
            .await;
        f.store
            .add_booking(test_booking(2, wednesday(), (9, 0), (11, 0)))
            .await;

        assert_eq!(f.manager.dispatch_due_reminders().await.unwrap(), 1);
        assert_eq!(f.manager.dispatch_due_reminders().await.unwrap(), 0);
        assert_eq!(f.events.names().await, vec!["booking.reminder_due"]);
    }

    #[tokio::test]
    async fn test_slots_follow_service_shape() {
        let f = fixture(&[("booking_buffer_time", json!(0))]).await;
        f.store
            .add_service(Service {
                id: 10,
                name: "Window wash".to_string(),
                category: ServiceCategory::Window,
                is_active: true,
                base_rate: None,
                rate_per_sqm: None,
                rate_per_linear_meter: None,
                duration_minutes: 90,
                buffer_before: 15,
                buffer_after: 15,
                capacity: 1,
                custom_fields: Vec::new(),
            })
            .await;

        let slots = f.manager.available_slots(wednesday(), Some(10)).await.unwrap();
        // 90 minutes plus 30 of buffers: 08:00, 10:00, 12:00, 14:00
        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].slot.start, t(8, 0));
        assert_eq!(slots[0].slot.end, t(9, 30));
        assert_eq!(slots[1].slot.start, t(10, 0));

        let default_slots = f.manager.available_slots(wednesday(), None).await.unwrap();
        assert_eq!(default_slots[0].slot.end, t(10, 0));

        let unknown = f.manager.available_slots(wednesday(), Some(99)).await;
        assert!(matches!(unknown, Err(BookingError::Validation { .. })));
    }
}
