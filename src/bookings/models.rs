use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{BookingError, BookingResult};
use crate::types::{PropertyType, SurfaceMaterial};
use crate::validation::{hhmm, validate_date, validate_time};

/// Booking status enum representing the lifecycle of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Occupies its slot (counts for conflicts, buffers and daily limits)
    pub fn is_active(&self) -> bool {
        *self != BookingStatus::Cancelled
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quote status; only `accepted` and `booked` quotes (plus fresh ones) can be scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    New,
    Sent,
    Accepted,
    Booked,
    Rejected,
    Expired,
    Cancelled,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::New => "new",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Booked => "booked",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
            QuoteStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for QuoteStatus {
    fn default() -> Self {
        QuoteStatus::New
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time copy of the service details a booking was made for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceSnapshot {
    pub service_id: Option<i32>,
    pub service_name: Option<String>,
    #[schema(value_type = String)]
    pub area_sqm: Decimal,
    pub duration_minutes: u32,
    pub property_type: PropertyType,
    pub surface_material: SurfaceMaterial,
    pub building_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i32,
    pub quote_number: String,
    pub token: String,
    pub service_id: Option<i32>,
    pub service_name: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub area_sqm: Decimal,
    pub property_type: PropertyType,
    pub surface_material: SurfaceMaterial,
    pub building_height: u32,
    pub total_amount: Decimal,
    pub status: QuoteStatus,
    pub valid_until: NaiveDate,
    pub created_at: NaiveDateTime,
}

impl Quote {
    /// Checks the quote can still be turned into a booking
    pub fn ensure_bookable(&self, today: NaiveDate, token: &str) -> BookingResult<()> {
        if self.token != token {
            return Err(BookingError::field("token", "Invalid quote token"));
        }

        match self.status {
            QuoteStatus::Rejected | QuoteStatus::Cancelled => {
                return Err(BookingError::field(
                    "quote_id",
                    format!("Quote is {} and cannot be booked", self.status),
                ));
            }
            QuoteStatus::Expired => {
                return Err(BookingError::field("quote_id", "Quote has expired"));
            }
            _ => {}
        }

        if self.valid_until < today {
            return Err(BookingError::field("quote_id", "Quote has expired"));
        }

        Ok(())
    }
}

/// Domain model representing a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub booking_number: String,
    pub quote_id: Option<i32>,
    pub service_id: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub service_snapshot: ServiceSnapshot,
    pub booking_date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "11:00")]
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub deposit_amount: Decimal,
    #[schema(value_type = String)]
    pub balance_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub reminder_sent: bool,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Everything needed to insert a booking; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub booking_number: String,
    pub quote_id: Option<i32>,
    pub service_id: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub service_snapshot: ServiceSnapshot,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
    pub balance_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NewBooking {
    pub fn into_booking(self, id: i32) -> Booking {
        Booking {
            id,
            booking_number: self.booking_number,
            quote_id: self.quote_id,
            service_id: self.service_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            address: self.address,
            service_snapshot: self.service_snapshot,
            booking_date: self.booking_date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: BookingStatus::Pending,
            total_amount: self.total_amount,
            deposit_amount: self.deposit_amount,
            balance_amount: self.balance_amount,
            payment_status: PaymentStatus::Unpaid,
            reminder_sent: false,
            notes: self.notes,
            cancellation_reason: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Request DTO for scheduling a quote
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ScheduleRequest {
    #[validate(custom = "validate_date")]
    #[schema(example = "2025-06-10")]
    pub date: String,
    #[validate(custom = "validate_time")]
    #[schema(example = "09:00")]
    pub start_time: String,
    /// Derived from the property size when omitted
    #[validate(custom = "validate_time")]
    pub end_time: Option<String>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Request DTO for creating a booking from a quote
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub quote_id: i32,
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate]
    #[serde(flatten)]
    pub schedule: ScheduleRequest,
}

/// Request DTO for moving a booking
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RescheduleRequest {
    #[validate(custom = "validate_date")]
    pub date: String,
    #[validate(custom = "validate_time")]
    pub start_time: String,
    #[validate(custom = "validate_time")]
    pub end_time: Option<String>,
}

/// Request DTO for cancelling
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Response DTO returned after a booking is created
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingConfirmation {
    pub booking_id: i32,
    pub booking_number: String,
    pub booking_date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(value_type = String)]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(value_type = String)]
    pub end_time: NaiveTime,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub deposit_amount: Decimal,
    #[schema(value_type = String)]
    pub balance_amount: Decimal,
    pub status: BookingStatus,
}

impl From<&Booking> for BookingConfirmation {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            booking_date: booking.booking_date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            total_amount: booking.total_amount,
            deposit_amount: booking.deposit_amount,
            balance_amount: booking.balance_amount,
            status: booking.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote() -> Quote {
        Quote {
            id: 4,
            quote_number: "Q-0004".to_string(),
            token: "secret".to_string(),
            service_id: None,
            service_name: None,
            customer_name: "Sam".to_string(),
            customer_email: "sam@example.com".to_string(),
            customer_phone: None,
            address: None,
            area_sqm: dec!(80),
            property_type: PropertyType::Residential,
            surface_material: SurfaceMaterial::Brick,
            building_height: 1,
            total_amount: dec!(1234.20),
            status: QuoteStatus::New,
            valid_until: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            created_at: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_quote_bookable_states() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        assert!(quote().ensure_bookable(today, "secret").is_ok());
        assert!(Quote { status: QuoteStatus::Booked, ..quote() }
            .ensure_bookable(today, "secret")
            .is_ok());
        assert!(quote().ensure_bookable(today, "wrong").is_err());
        assert!(Quote { status: QuoteStatus::Rejected, ..quote() }
            .ensure_bookable(today, "secret")
            .is_err());
        assert!(quote()
            .ensure_bookable(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), "secret")
            .is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(BookingStatus::Cancelled).unwrap(), "cancelled");
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(BookingStatus::Completed.is_active());
        assert_eq!(QuoteStatus::Booked.to_string(), "booked");
    }
}
