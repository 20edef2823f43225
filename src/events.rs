// Domain events
//
// Emitted after every successful state change. Subscribers (email, webhooks)
// live outside the core; the core only knows the EventSink seam.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::validation::hhmm;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    BookingCreated {
        booking_id: i32,
        booking_number: String,
        quote_id: Option<i32>,
    },
    BookingRescheduled {
        booking_id: i32,
        date: NaiveDate,
        #[serde(with = "hhmm")]
        start_time: NaiveTime,
        #[serde(with = "hhmm")]
        end_time: NaiveTime,
    },
    BookingCancelled {
        booking_id: i32,
        reason: Option<String>,
    },
    BookingConfirmed {
        booking_id: i32,
    },
    BookingCompleted {
        booking_id: i32,
    },
    BookingReminderDue {
        booking_id: i32,
        customer_email: String,
        date: NaiveDate,
        #[serde(with = "hhmm")]
        start_time: NaiveTime,
    },
    QuoteBooked {
        quote_id: i32,
        booking_id: i32,
    },
    AppointmentCreated {
        appointment_id: i32,
        appointment_number: String,
        employee_id: i32,
    },
    AppointmentRescheduled {
        appointment_id: i32,
        employee_id: i32,
        date: NaiveDate,
        #[serde(with = "hhmm")]
        start_time: NaiveTime,
        #[serde(with = "hhmm")]
        end_time: NaiveTime,
    },
    AppointmentCancelled {
        appointment_id: i32,
        reason: Option<String>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated { .. } => "booking.created",
            DomainEvent::BookingRescheduled { .. } => "booking.rescheduled",
            DomainEvent::BookingCancelled { .. } => "booking.cancelled",
            DomainEvent::BookingConfirmed { .. } => "booking.confirmed",
            DomainEvent::BookingCompleted { .. } => "booking.completed",
            DomainEvent::BookingReminderDue { .. } => "booking.reminder_due",
            DomainEvent::QuoteBooked { .. } => "quote.booked",
            DomainEvent::AppointmentCreated { .. } => "appointment.created",
            DomainEvent::AppointmentRescheduled { .. } => "appointment.rescheduled",
            DomainEvent::AppointmentCancelled { .. } => "appointment.cancelled",
        }
    }
}

/// Event plus delivery metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub event: &'static str,
    pub occurred_at: NaiveDateTime,
    pub data: DomainEvent,
}

impl EventEnvelope {
    pub fn new(data: DomainEvent, occurred_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: data.name(),
            occurred_at,
            data,
        }
    }
}

/// Receiver of domain events. Emission never fails the operation that caused it.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, envelope: EventEnvelope);
}

/// Writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, envelope: EventEnvelope) {
        let payload = serde_json::to_string(&envelope.data).unwrap_or_default();
        info!(event = envelope.event, event_id = %envelope.id, "Domain event: {}", payload);
    }
}

/// Retry schedule for outbound webhook deliveries. Each retry is a separately
/// scheduled trigger that re-enters the same delivery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
    pub delivery_timeout: Duration,
    pub ping_timeout: Duration,
}

impl Default for WebhookRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(60),
            backoff_factor: 3,
            delivery_timeout: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(10),
        }
    }
}

impl WebhookRetryPolicy {
    /// Delay before retry number `attempt` (1-based); `None` once retries are exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = self.backoff_factor.checked_pow(attempt - 1)?;
        self.initial_delay.checked_mul(factor)
    }

    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = DomainEvent::BookingCreated {
            booking_id: 1,
            booking_number: "BK-20250602-ABC123".to_string(),
            quote_id: Some(4),
        };
        assert_eq!(event.name(), "booking.created");
        assert_eq!(
            DomainEvent::QuoteBooked { quote_id: 4, booking_id: 1 }.name(),
            "quote.booked"
        );
    }

    #[test]
    fn test_envelope_serialization() {
        let occurred_at = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let envelope = EventEnvelope::new(
            DomainEvent::BookingRescheduled {
                booking_id: 3,
                date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
                start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            },
            occurred_at,
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"], "booking.rescheduled");
        assert_eq!(json["data"]["booking_id"], 3);
        assert_eq!(json["data"]["start_time"], "10:00");
    }

    #[test]
    fn test_retry_schedule() {
        let policy = WebhookRetryPolicy::default();

        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(60)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(180)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_secs(540)));
        assert_eq!(policy.delay_for(4), None);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert_eq!(policy.delivery_timeout, Duration::from_secs(30));
        assert_eq!(policy.ping_timeout, Duration::from_secs(10));
    }
}
