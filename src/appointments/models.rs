use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::validation::{hhmm, validate_date, validate_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Still holds its employee and slot
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Appointment {
    pub id: i32,
    pub appointment_number: String,
    pub service_id: i32,
    pub employee_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    #[schema(value_type = String)]
    pub area_sqm: Decimal,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "12:00")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub appointment_number: String,
    pub service_id: i32,
    pub employee_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub area_sqm: Decimal,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NewAppointment {
    pub fn into_appointment(self, id: i32) -> Appointment {
        Appointment {
            id,
            appointment_number: self.appointment_number,
            service_id: self.service_id,
            employee_id: self.employee_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            area_sqm: self.area_sqm,
            appointment_date: self.appointment_date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: AppointmentStatus::Scheduled,
            notes: self.notes,
            cancellation_reason: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Request DTO for creating an appointment
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AppointmentRequest {
    pub service_id: i32,
    /// Assigned automatically when omitted
    pub employee_id: Option<i32>,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: String,
    pub customer_phone: Option<String>,
    #[schema(value_type = String, example = "120")]
    pub area_sqm: Decimal,
    #[validate(custom = "validate_date")]
    #[schema(example = "2025-06-10")]
    pub date: String,
    #[validate(custom = "validate_time")]
    #[schema(example = "09:00")]
    pub start_time: String,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Query parameters for the employee finder
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeAvailabilityQuery {
    pub service_id: i32,
    #[validate(custom = "validate_date")]
    pub date: String,
    #[validate(custom = "validate_time")]
    pub start_time: String,
    #[validate(custom = "validate_time")]
    pub end_time: String,
}
