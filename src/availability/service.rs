// Availability Service
//
// Decides whether a date/time slot can be booked. A slot check is an ordered
// chain of gates that stops at the first failure:
// past date, blocked date, daily limit, time conflict, buffer spacing.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::availability::blocked::find_block;
use crate::availability::slots::{generate_slots, violates_buffer, TimeSlot};
use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::metrics::{OperationType, PerformanceMetrics};
use crate::settings::{BookingSettings, ConfigStore};

/// Outcome code of a slot check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityReason {
    DatePast,
    DateBlocked,
    DailyLimitReached,
    TimeConflict,
    InsufficientBuffer,
    SlotAvailable,
}

impl AvailabilityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityReason::DatePast => "date_past",
            AvailabilityReason::DateBlocked => "date_blocked",
            AvailabilityReason::DailyLimitReached => "daily_limit_reached",
            AvailabilityReason::TimeConflict => "time_conflict",
            AvailabilityReason::InsufficientBuffer => "insufficient_buffer",
            AvailabilityReason::SlotAvailable => "slot_available",
        }
    }
}

impl fmt::Display for AvailabilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a slot check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResult {
    pub available: bool,
    pub reason: AvailabilityReason,
    pub message: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub context: serde_json::Value,
}

impl AvailabilityResult {
    pub fn slot_available() -> Self {
        Self {
            available: true,
            reason: AvailabilityReason::SlotAvailable,
            message: "Time slot is available".to_string(),
            context: serde_json::Value::Null,
        }
    }

    pub fn rejected(
        reason: AvailabilityReason,
        message: impl Into<String>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            available: false,
            reason,
            message: message.into(),
            context,
        }
    }

    /// Converts a rejection into an error, passing availability through
    pub fn into_result(self) -> BookingResult<Self> {
        if self.available {
            Ok(self)
        } else {
            Err(BookingError::Unavailable(self))
        }
    }
}

/// Interval already occupying a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedInterval {
    pub id: i32,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Read access to whatever occupies a timeline (all bookings, or one employee's appointments).
/// Every query ignores cancelled entries and the entry with `exclude_id`.
#[async_trait]
pub trait SlotOccupancy: Send + Sync {
    async fn count_on_date(&self, date: NaiveDate, exclude_id: Option<i32>) -> BookingResult<u64>;

    /// Entries overlapping `[start, end)`
    async fn find_conflicting(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>>;

    async fn active_on_date(
        &self,
        date: NaiveDate,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>>;
}

/// A slot to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Ignored in conflict, buffer and daily-limit checks (the entry being rescheduled)
    pub exclude_id: Option<i32>,
    /// Overrides the configured buffer time
    pub buffer_minutes: Option<u32>,
}

impl SlotRequest {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            date,
            start,
            end,
            exclude_id: None,
            buffer_minutes: None,
        }
    }

    pub fn excluding(mut self, id: Option<i32>) -> Self {
        self.exclude_id = id;
        self
    }

    pub fn with_buffer(mut self, minutes: u32) -> Self {
        self.buffer_minutes = Some(minutes);
        self
    }
}

/// Slot shape used for generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSpec {
    pub duration: u32,
    pub buffer_before: u32,
    pub buffer_after: u32,
}

impl SlotSpec {
    pub fn minutes(duration: u32) -> Self {
        Self {
            duration,
            buffer_before: 0,
            buffer_after: 0,
        }
    }
}

/// A generated slot with its check outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub available: bool,
    pub reason: AvailabilityReason,
}

pub struct AvailabilityService {
    config_store: Arc<ConfigStore>,
    occupancy: Arc<dyn SlotOccupancy>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<PerformanceMetrics>>,
}

impl AvailabilityService {
    pub fn new(
        config_store: Arc<ConfigStore>,
        occupancy: Arc<dyn SlotOccupancy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_store,
            occupancy,
            clock,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PerformanceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Check a slot against all bookings; no side effects
    pub async fn check_slot_availability(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<i32>,
    ) -> BookingResult<AvailabilityResult> {
        let request = SlotRequest::new(date, start, end).excluding(exclude_id);
        self.check_slot_with(self.occupancy.as_ref(), &request).await
    }

    /// Check a slot against an arbitrary timeline
    pub async fn check_slot_with(
        &self,
        occupancy: &dyn SlotOccupancy,
        request: &SlotRequest,
    ) -> BookingResult<AvailabilityResult> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|m| m.start(OperationType::Availability));

        if request.start >= request.end {
            return Err(BookingError::field(
                "end_time",
                "End time must be after start time",
            ));
        }

        let snapshot = self.config_store.snapshot().await?;
        let result = self
            .evaluate(occupancy, &snapshot.booking, request)
            .await?;

        debug!(
            "Slot check {} {}-{}: {}",
            request.date,
            request.start.format("%H:%M"),
            request.end.format("%H:%M"),
            result.reason
        );
        Ok(result)
    }

    async fn evaluate(
        &self,
        occupancy: &dyn SlotOccupancy,
        settings: &BookingSettings,
        request: &SlotRequest,
    ) -> BookingResult<AvailabilityResult> {
        let date = request.date;

        // 1. Past dates
        if date < self.clock.today() {
            return Ok(AvailabilityResult::rejected(
                AvailabilityReason::DatePast,
                "Cannot book dates in the past",
                json!({ "date": date }),
            ));
        }

        // 2. Blocked dates
        if let Some(block) = find_block(&settings.blocked_dates, date) {
            return Ok(AvailabilityResult::rejected(
                AvailabilityReason::DateBlocked,
                "This date is not available for booking",
                json!({ "date": date, "reason": block.reason() }),
            ));
        }

        // 3. Daily limit
        if settings.max_bookings_per_day > 0 {
            let current = occupancy.count_on_date(date, request.exclude_id).await?;
            if current >= u64::from(settings.max_bookings_per_day) {
                return Ok(AvailabilityResult::rejected(
                    AvailabilityReason::DailyLimitReached,
                    "Maximum bookings for this day has been reached",
                    json!({ "limit": settings.max_bookings_per_day, "current": current }),
                ));
            }
        }

        // 4. Overlap
        let conflicts = occupancy
            .find_conflicting(date, request.start, request.end, request.exclude_id)
            .await?;
        if !conflicts.is_empty() {
            let ids: Vec<i32> = conflicts.iter().map(|c| c.id).collect();
            return Ok(AvailabilityResult::rejected(
                AvailabilityReason::TimeConflict,
                "This time slot conflicts with an existing booking",
                json!({ "conflicting_ids": ids }),
            ));
        }

        // 5. Buffer spacing against adjacent entries
        let buffer = request
            .buffer_minutes
            .unwrap_or(settings.booking_buffer_time);
        if buffer > 0 {
            let neighbours = occupancy.active_on_date(date, request.exclude_id).await?;
            let too_close = neighbours.iter().find(|other| {
                violates_buffer(request.start, request.end, other.start, other.end, buffer)
            });
            if let Some(other) = too_close {
                return Ok(AvailabilityResult::rejected(
                    AvailabilityReason::InsufficientBuffer,
                    format!("At least {} minutes are required between bookings", buffer),
                    json!({ "buffer_minutes": buffer, "conflicting_id": other.id }),
                ));
            }
        }

        Ok(AvailabilityResult::slot_available())
    }

    pub async fn is_blocked_date(&self, date: NaiveDate) -> BookingResult<bool> {
        let snapshot = self.config_store.snapshot().await?;
        Ok(find_block(&snapshot.booking.blocked_dates, date).is_some())
    }

    /// Generated slots for `date`, each run through the full gate chain.
    /// Closed days yield no slots; slots that already started today are left out.
    pub async fn get_available_slots(
        &self,
        date: NaiveDate,
        spec: SlotSpec,
    ) -> BookingResult<Vec<SlotAvailability>> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|m| m.start(OperationType::SlotSearch));

        let snapshot = self.config_store.snapshot().await?;
        let settings = &snapshot.booking;
        let Some((open, close)) = settings.business_hours.for_weekday(date.weekday()) else {
            return Ok(Vec::new());
        };
        let now = self.clock.now();

        let mut result = Vec::new();
        for slot in generate_slots(
            date,
            open,
            close,
            spec.duration,
            spec.buffer_before,
            spec.buffer_after,
        ) {
            // Already started
            if date == now.date() && slot.start <= now.time() {
                continue;
            }
            let request = SlotRequest::new(slot.date, slot.start, slot.end);
            let check = self
                .evaluate(self.occupancy.as_ref(), settings, &request)
                .await?;
            result.push(SlotAvailability {
                slot,
                available: check.available,
                reason: check.reason,
            });
        }

        Ok(result)
    }

    /// First bookable slot on or after `from`, searching up to the configured horizon
    pub async fn find_next_available_slot(
        &self,
        from: NaiveDate,
        spec: SlotSpec,
    ) -> BookingResult<Option<TimeSlot>> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|m| m.start(OperationType::SlotSearch));

        let snapshot = self.config_store.snapshot().await?;
        let settings = &snapshot.booking;
        let now = self.clock.now();
        let start_date = from.max(now.date());

        for offset in 0..settings.slot_search_horizon_days {
            let date = start_date + Duration::days(i64::from(offset));

            let Some((open, close)) = settings.business_hours.for_weekday(date.weekday()) else {
                continue;
            };
            if find_block(&settings.blocked_dates, date).is_some() {
                continue;
            }
            if settings.max_bookings_per_day > 0 {
                let count = self.occupancy.count_on_date(date, None).await?;
                if count >= u64::from(settings.max_bookings_per_day) {
                    continue;
                }
            }

            let candidates = generate_slots(
                date,
                open,
                close,
                spec.duration,
                spec.buffer_before,
                spec.buffer_after,
            );
            for slot in candidates {
                if date == now.date() && slot.start <= now.time() {
                    continue;
                }
                let request = SlotRequest::new(slot.date, slot.start, slot.end);
                let check = self
                    .evaluate(self.occupancy.as_ref(), settings, &request)
                    .await?;
                if check.available {
                    return Ok(Some(slot));
                }
            }
        }

        debug!(
            "No available slot within {} days of {}",
            settings.slot_search_horizon_days, start_date
        );
        Ok(None)
    }
}
