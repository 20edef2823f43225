// In-memory stores
//
// Implement every repository trait over maps behind a tokio RwLock. Used by
// the test suites and for running the service without a database.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use tokio::sync::{Mutex, RwLock};

use crate::appointments::{Appointment, AppointmentRepository, AppointmentStatus, NewAppointment};
use crate::availability::slots::conflicts_with;
use crate::availability::{OccupiedInterval, SlotOccupancy};
use crate::bookings::{
    Booking, BookingRepository, BookingStatus, NewBooking, Quote, QuoteRepository, QuoteStatus,
};
use crate::catalog::{Employee, EmployeeRepository, Service, ServiceRepository};
use crate::error::{BookingError, BookingResult};
use crate::events::{EventEnvelope, EventSink};
use crate::pricing::{PromoCode, PromoCodeRepository};
use crate::settings::SettingsStore;

/// Key-value settings held in memory
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, serde_json::Value>>,
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> BookingResult<Option<serde_json::Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn update(&self, key: &str, value: serde_json::Value) -> BookingResult<bool> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(true)
    }

    async fn all(&self) -> BookingResult<BTreeMap<String, serde_json::Value>> {
        Ok(self.values.read().await.clone())
    }
}

#[derive(Debug, Default)]
struct State {
    services: BTreeMap<i32, Service>,
    employees: BTreeMap<i32, Employee>,
    quotes: BTreeMap<i32, Quote>,
    bookings: BTreeMap<i32, Booking>,
    appointments: BTreeMap<i32, Appointment>,
    promos: BTreeMap<String, PromoCode>,
}

/// Every entity the core reads or writes, held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub async fn add_service(&self, service: Service) {
        self.state.write().await.services.insert(service.id, service);
    }

    pub async fn add_employee(&self, employee: Employee) {
        self.state
            .write()
            .await
            .employees
            .insert(employee.id, employee);
    }

    pub async fn add_quote(&self, quote: Quote) {
        self.state.write().await.quotes.insert(quote.id, quote);
    }

    pub async fn add_booking(&self, booking: Booking) {
        self.state.write().await.bookings.insert(booking.id, booking);
    }

    pub async fn add_promo(&self, promo: PromoCode) {
        let key = PromoCode::normalize(&promo.code);
        self.state.write().await.promos.insert(key, promo);
    }

    pub async fn quote(&self, id: i32) -> Option<Quote> {
        self.state.read().await.quotes.get(&id).cloned()
    }

    pub async fn booking(&self, id: i32) -> Option<Booking> {
        self.state.read().await.bookings.get(&id).cloned()
    }

    fn active_bookings_on(
        state: &State,
        date: NaiveDate,
        exclude_id: Option<i32>,
    ) -> impl Iterator<Item = &Booking> {
        state.bookings.values().filter(move |b| {
            b.booking_date == date && b.status.is_active() && Some(b.id) != exclude_id
        })
    }
}

fn next_id<T>(map: &BTreeMap<i32, T>) -> i32 {
    map.keys().next_back().map(|id| id + 1).unwrap_or(1)
}

fn interval(booking: &Booking) -> OccupiedInterval {
    OccupiedInterval {
        id: booking.id,
        start: booking.start_time,
        end: booking.end_time,
    }
}

#[async_trait]
impl ServiceRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Service>> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }
}

#[async_trait]
impl EmployeeRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Employee>> {
        Ok(self.state.read().await.employees.get(&id).cloned())
    }

    async fn list_active(&self) -> BookingResult<Vec<Employee>> {
        Ok(self
            .state
            .read()
            .await
            .employees
            .values()
            .filter(|e| e.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Quote>> {
        Ok(self.state.read().await.quotes.get(&id).cloned())
    }

    async fn update_status(&self, id: i32, status: QuoteStatus) -> BookingResult<()> {
        let mut state = self.state.write().await;
        let quote = state
            .quotes
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("Quote", id))?;
        quote.status = status;
        Ok(())
    }
}

#[async_trait]
impl PromoCodeRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> BookingResult<Option<PromoCode>> {
        let key = PromoCode::normalize(code);
        Ok(self.state.read().await.promos.get(&key).cloned())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert(&self, booking: NewBooking) -> BookingResult<Booking> {
        let mut state = self.state.write().await;
        let id = next_id(&state.bookings);
        let booking = booking.into_booking(id);
        state.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn find_duplicate(
        &self,
        quote_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> BookingResult<Option<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .find(|b| {
                b.quote_id == Some(quote_id)
                    && b.booking_date == date
                    && b.start_time == start
                    && b.end_time == end
                    && b.status.is_active()
            })
            .cloned())
    }

    async fn update_schedule(
        &self,
        id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Booking> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("Booking", id))?;
        booking.booking_date = date;
        booking.start_time = start;
        booking.end_time = end;
        booking.reminder_sent = false;
        booking.updated_at = updated_at;
        Ok(booking.clone())
    }

    async fn update_status(
        &self,
        id: i32,
        status: BookingStatus,
        cancellation_reason: Option<String>,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Booking> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("Booking", id))?;
        booking.status = status;
        if cancellation_reason.is_some() {
            booking.cancellation_reason = cancellation_reason;
        }
        booking.updated_at = updated_at;
        Ok(booking.clone())
    }

    async fn count_for_service_between(
        &self,
        service_id: Option<i32>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookingResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.status.is_active())
            .filter(|b| b.booking_date >= from && b.booking_date <= to)
            .filter(|b| service_id.is_none() || b.service_id == service_id)
            .count() as u64)
    }

    async fn count_completed_for_email(&self, email: &str) -> BookingResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Completed)
            .filter(|b| b.customer_email.eq_ignore_ascii_case(email.trim()))
            .count() as u64)
    }

    async fn find_due_reminders(&self, date: NaiveDate) -> BookingResult<Vec<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| {
                b.booking_date == date
                    && matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed)
                    && !b.reminder_sent
            })
            .cloned()
            .collect())
    }

    async fn mark_reminder_sent(&self, id: i32) -> BookingResult<()> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("Booking", id))?;
        booking.reminder_sent = true;
        Ok(())
    }
}

/// Bookings as the shared slot timeline
#[async_trait]
impl SlotOccupancy for MemoryStore {
    async fn count_on_date(&self, date: NaiveDate, exclude_id: Option<i32>) -> BookingResult<u64> {
        let state = self.state.read().await;
        Ok(Self::active_bookings_on(&state, date, exclude_id).count() as u64)
    }

    async fn find_conflicting(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        let state = self.state.read().await;
        Ok(Self::active_bookings_on(&state, date, exclude_id)
            .filter(|b| conflicts_with(start, end, b.start_time, b.end_time))
            .map(interval)
            .collect())
    }

    async fn active_on_date(
        &self,
        date: NaiveDate,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        let state = self.state.read().await;
        Ok(Self::active_bookings_on(&state, date, exclude_id)
            .map(interval)
            .collect())
    }
}

#[async_trait]
impl AppointmentRepository for MemoryStore {
    async fn insert(&self, appointment: NewAppointment) -> BookingResult<Appointment> {
        let mut state = self.state.write().await;
        let id = next_id(&state.appointments);
        let appointment = appointment.into_appointment(id);
        state.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Appointment>> {
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn find_for_employee_on_date(
        &self,
        employee_id: i32,
        date: NaiveDate,
    ) -> BookingResult<Vec<Appointment>> {
        let state = self.state.read().await;
        Ok(state
            .appointments
            .values()
            .filter(|a| a.employee_id == employee_id && a.appointment_date == date)
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .cloned()
            .collect())
    }

    async fn find_for_service_on_date(
        &self,
        service_id: i32,
        date: NaiveDate,
    ) -> BookingResult<Vec<Appointment>> {
        let state = self.state.read().await;
        Ok(state
            .appointments
            .values()
            .filter(|a| a.service_id == service_id && a.appointment_date == date)
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .cloned()
            .collect())
    }

    async fn update_schedule(
        &self,
        id: i32,
        employee_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Appointment> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("Appointment", id))?;
        appointment.employee_id = employee_id;
        appointment.appointment_date = date;
        appointment.start_time = start;
        appointment.end_time = end;
        appointment.updated_at = updated_at;
        Ok(appointment.clone())
    }

    async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
        cancellation_reason: Option<String>,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Appointment> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("Appointment", id))?;
        appointment.status = status;
        if cancellation_reason.is_some() {
            appointment.cancellation_reason = cancellation_reason;
        }
        appointment.updated_at = updated_at;
        Ok(appointment.clone())
    }
}

/// Keeps every emitted event, in order
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<EventEnvelope>>,
}

impl RecordingEventSink {
    pub async fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().await.clone()
    }

    pub async fn names(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(|e| e.event).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, envelope: EventEnvelope) {
        self.events.lock().await.push(envelope);
    }
}

/// Pending booking for `customer@example.com` without a quote or service
#[cfg(test)]
pub fn test_booking(id: i32, date: NaiveDate, start: (u32, u32), end: (u32, u32)) -> Booking {
    use crate::bookings::ServiceSnapshot;
    use crate::types::{PropertyType, SurfaceMaterial};
    use rust_decimal::Decimal;

    let time = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).unwrap();
    let created_at = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    NewBooking {
        booking_number: format!("BK-TEST-{:06}", id),
        quote_id: None,
        service_id: None,
        customer_name: "Test Customer".to_string(),
        customer_email: "customer@example.com".to_string(),
        customer_phone: None,
        address: None,
        service_snapshot: ServiceSnapshot {
            service_id: None,
            service_name: None,
            area_sqm: Decimal::from(80),
            duration_minutes: 120,
            property_type: PropertyType::Residential,
            surface_material: SurfaceMaterial::Brick,
            building_height: 1,
        },
        booking_date: date,
        start_time: time(start),
        end_time: time(end),
        total_amount: Decimal::from(1000),
        deposit_amount: Decimal::ZERO,
        balance_amount: Decimal::from(1000),
        notes: None,
        created_at,
    }
    .into_booking(id)
}
