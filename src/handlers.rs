// HTTP handlers
//
// Thin adapters: validate the DTO, call the service, wrap the result in the
// success envelope. Failures render through BookingError's IntoResponse.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

use crate::app::AppState;
use crate::appointments::{Appointment, AppointmentRequest, EmployeeAvailabilityQuery};
use crate::availability::{AvailabilityResult, SlotAvailability, TimeSlot};
use crate::bookings::{
    Booking, BookingConfirmation, CancelRequest, CreateBookingRequest, RescheduleRequest,
};
use crate::catalog::Employee;
use crate::error::{BookingError, BookingResult, SuccessResponse};
use crate::metrics::MetricsSummary;
use crate::pricing::{PriceBreakdown, PricingInput, QuoteData};
use crate::validation::{require_date, require_time, validate_date, validate_time};

/// Client key used for submission rate limiting
pub fn client_key(headers: &HeaderMap) -> String {
    // X-Forwarded-For first, then X-Real-IP. The last forwarded hop is the one
    // appended by the proxy; earlier entries are whatever the client sent.
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.rsplit(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityCheckQuery {
    #[validate(custom = "validate_date")]
    pub date: String,
    #[validate(custom = "validate_time")]
    pub start_time: String,
    #[validate(custom = "validate_time")]
    pub end_time: String,
    /// Booking being rescheduled, ignored by the checks
    pub exclude_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlotsQuery {
    #[validate(custom = "validate_date")]
    pub date: String,
    pub service_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextSlotQuery {
    /// Defaults to today
    #[validate(custom = "validate_date")]
    pub from: Option<String>,
    pub service_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SettingValue {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SettingUpdate {
    pub key: String,
    pub updated: bool,
}

/// Handler for POST /api/quotes/calculate
/// Static quote for the submitted property; rate limited per client
#[utoipa::path(
    post,
    path = "/api/quotes/calculate",
    request_body = PricingInput,
    responses(
        (status = 200, description = "Quote calculated", body = QuoteData),
        (status = 400, description = "Invalid input"),
        (status = 429, description = "Too many submissions")
    ),
    tag = "pricing"
)]
pub async fn calculate_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PricingInput>,
) -> BookingResult<SuccessResponse<QuoteData>> {
    let limit = state
        .config_store
        .snapshot()
        .await?
        .booking
        .rate_limit_submissions;
    state
        .rate_limiter
        .check(&client_key(&headers), limit)?;

    let quote = state.quote_calculator.calculate_quote(&input).await?;
    Ok(SuccessResponse::new("Quote calculated", quote))
}

/// Handler for POST /api/pricing/calculate
#[utoipa::path(
    post,
    path = "/api/pricing/calculate",
    request_body = PricingInput,
    responses(
        (status = 200, description = "Price calculated", body = PriceBreakdown),
        (status = 400, description = "Invalid input")
    ),
    tag = "pricing"
)]
pub async fn calculate_price(
    State(state): State<AppState>,
    Json(input): Json<PricingInput>,
) -> BookingResult<SuccessResponse<PriceBreakdown>> {
    let breakdown = state.pricing_engine.calculate_price(&input).await?;
    Ok(SuccessResponse::new("Price calculated", breakdown))
}

/// Handler for GET /api/availability/check
/// An unavailable slot is still a successful check
#[utoipa::path(
    get,
    path = "/api/availability/check",
    params(AvailabilityCheckQuery),
    responses(
        (status = 200, description = "Slot checked", body = AvailabilityResult),
        (status = 400, description = "Malformed date or time")
    ),
    tag = "availability"
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityCheckQuery>,
) -> BookingResult<SuccessResponse<AvailabilityResult>> {
    query.validate()?;
    let date = require_date("date", &query.date)?;
    let start = require_time("start_time", &query.start_time)?;
    let end = require_time("end_time", &query.end_time)?;
    if start >= end {
        return Err(BookingError::field(
            "end_time",
            "End time must be after start time",
        ));
    }

    let result = state
        .availability
        .check_slot_availability(date, start, end, query.exclude_id)
        .await?;
    Ok(SuccessResponse::new(result.message.clone(), result))
}

/// Handler for GET /api/availability/slots
#[utoipa::path(
    get,
    path = "/api/availability/slots",
    params(SlotsQuery),
    responses(
        (status = 200, description = "Generated slots with their availability"),
        (status = 400, description = "Malformed date or unknown service")
    ),
    tag = "availability"
)]
pub async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> BookingResult<SuccessResponse<Vec<SlotAvailability>>> {
    query.validate()?;
    let date = require_date("date", &query.date)?;

    let slots = state.bookings.available_slots(date, query.service_id).await?;
    Ok(SuccessResponse::new(
        format!("{} slots generated", slots.len()),
        slots,
    ))
}

/// Handler for GET /api/availability/next
#[utoipa::path(
    get,
    path = "/api/availability/next",
    params(NextSlotQuery),
    responses(
        (status = 200, description = "First bookable slot, or null within the search horizon"),
        (status = 400, description = "Malformed date or unknown service")
    ),
    tag = "availability"
)]
pub async fn next_available_slot(
    State(state): State<AppState>,
    Query(query): Query<NextSlotQuery>,
) -> BookingResult<SuccessResponse<Option<TimeSlot>>> {
    query.validate()?;
    let from = match query.from.as_deref() {
        Some(raw) => require_date("from", raw)?,
        None => state.availability.clock().today(),
    };

    let slot = state
        .bookings
        .next_available_slot(from, query.service_id)
        .await?;
    let message = if slot.is_some() {
        "Next available slot found"
    } else {
        "No available slot within the search horizon"
    };
    Ok(SuccessResponse::new(message, slot))
}

/// Handler for POST /api/bookings
/// Creates a booking from an accepted quote
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingConfirmation),
        (status = 400, description = "Invalid input, token or expired quote"),
        (status = 404, description = "Quote not found"),
        (status = 409, description = "Slot unavailable or duplicate booking")
    ),
    tag = "bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> BookingResult<(StatusCode, Json<SuccessResponse<BookingConfirmation>>)> {
    tracing::debug!(quote_id = request.quote_id, "Creating booking from quote");
    request.validate()?;

    let booking = state
        .bookings
        .create_booking_from_quote(request.quote_id, &request.token, &request.schedule)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(
            "Booking created",
            BookingConfirmation::from(&booking),
        )),
    ))
}

/// Handler for POST /api/bookings/:id/reschedule
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/reschedule",
    params(("id" = i32, Path, description = "Booking id")),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Booking moved", body = Booking),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Slot unavailable or booking closed")
    ),
    tag = "bookings"
)]
pub async fn reschedule_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<RescheduleRequest>,
) -> BookingResult<SuccessResponse<Booking>> {
    request.validate()?;
    let booking = state.bookings.reschedule_booking(id, &request).await?;
    Ok(SuccessResponse::new("Booking rescheduled", booking))
}

/// Handler for POST /api/bookings/:id/cancel
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    params(("id" = i32, Path, description = "Booking id")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 400, description = "Inside the cancellation window"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already cancelled or completed")
    ),
    tag = "bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<CancelRequest>>,
) -> BookingResult<SuccessResponse<Booking>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let booking = state.bookings.cancel_booking(id, request.reason).await?;
    Ok(SuccessResponse::new("Booking cancelled", booking))
}

/// Handler for POST /api/bookings/:id/confirm
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/confirm",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking confirmed", body = Booking),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Invalid status transition")
    ),
    tag = "bookings"
)]
pub async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> BookingResult<SuccessResponse<Booking>> {
    let booking = state.bookings.confirm_booking(id).await?;
    Ok(SuccessResponse::new("Booking confirmed", booking))
}

/// Handler for POST /api/bookings/:id/complete
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/complete",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking completed", body = Booking),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Invalid status transition")
    ),
    tag = "bookings"
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> BookingResult<SuccessResponse<Booking>> {
    let booking = state.bookings.complete_booking(id).await?;
    Ok(SuccessResponse::new("Booking completed", booking))
}

/// Handler for POST /api/appointments
#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = AppointmentRequest,
    responses(
        (status = 201, description = "Appointment created", body = Appointment),
        (status = 400, description = "Invalid input or inactive service"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "No employee available or capacity reached")
    ),
    tag = "appointments"
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(request): Json<AppointmentRequest>,
) -> BookingResult<(StatusCode, Json<SuccessResponse<Appointment>>)> {
    request.validate()?;
    let appointment = state.appointments.create_appointment(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new("Appointment created", appointment)),
    ))
}

/// Handler for POST /api/appointments/:id/reschedule
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/reschedule",
    params(("id" = i32, Path, description = "Appointment id")),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Appointment moved", body = Appointment),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "No employee available")
    ),
    tag = "appointments"
)]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<RescheduleRequest>,
) -> BookingResult<SuccessResponse<Appointment>> {
    request.validate()?;
    let appointment = state.appointments.reschedule_appointment(id, &request).await?;
    Ok(SuccessResponse::new("Appointment rescheduled", appointment))
}

/// Handler for POST /api/appointments/:id/cancel
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/cancel",
    params(("id" = i32, Path, description = "Appointment id")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Appointment cancelled", body = Appointment),
        (status = 400, description = "Inside the cancellation window"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Appointment already closed")
    ),
    tag = "appointments"
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<CancelRequest>>,
) -> BookingResult<SuccessResponse<Appointment>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let appointment = state
        .appointments
        .cancel_appointment(id, request.reason)
        .await?;
    Ok(SuccessResponse::new("Appointment cancelled", appointment))
}

/// Handler for GET /api/appointments/employees
#[utoipa::path(
    get,
    path = "/api/appointments/employees",
    params(EmployeeAvailabilityQuery),
    responses(
        (status = 200, description = "Employees able to take the slot, ordered by id"),
        (status = 400, description = "Malformed input or inactive service")
    ),
    tag = "appointments"
)]
pub async fn available_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeAvailabilityQuery>,
) -> BookingResult<SuccessResponse<Vec<Employee>>> {
    query.validate()?;
    let date = require_date("date", &query.date)?;
    let start = require_time("start_time", &query.start_time)?;
    let end = require_time("end_time", &query.end_time)?;

    let employees = state
        .appointments
        .find_available_employees(query.service_id, date, start, end)
        .await?;
    Ok(SuccessResponse::new(
        format!("{} employees available", employees.len()),
        employees,
    ))
}

/// Handler for GET /api/settings/:key
#[utoipa::path(
    get,
    path = "/api/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Stored value"),
        (status = 404, description = "Setting not stored")
    ),
    tag = "admin"
)]
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> BookingResult<SuccessResponse<SettingValue>> {
    let value = state
        .config_store
        .get_setting(&key)
        .await?
        .ok_or_else(|| BookingError::not_found("Setting", &key))?;

    Ok(SuccessResponse::new("Setting found", SettingValue { key, value }))
}

/// Handler for PUT /api/settings/:key
/// Writes the value and invalidates the settings cache
#[utoipa::path(
    put,
    path = "/api/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting stored"),
        (status = 400, description = "Value rejected")
    ),
    tag = "admin"
)]
pub async fn update_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> BookingResult<SuccessResponse<SettingUpdate>> {
    let updated = state.config_store.update_setting(&key, value).await?;
    tracing::info!(key = %key, updated, "Setting written");

    Ok(SuccessResponse::new(
        "Setting updated",
        SettingUpdate { key, updated },
    ))
}

/// Handler for GET /api/metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses((status = 200, description = "Operation counts, timings and cache hit rate")),
    tag = "admin"
)]
pub async fn get_metrics(State(state): State<AppState>) -> SuccessResponse<MetricsSummary> {
    SuccessResponse::new("Metrics summary", state.metrics.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_key_prefers_last_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        assert_eq!(client_key(&headers), "10.0.0.1");
    }

    #[test]
    fn test_client_key_ignores_client_supplied_hops() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8, 203.0.113.7"),
        );
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_key_fallbacks() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_key(&headers), "10.0.0.2");
    }
}
