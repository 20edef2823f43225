// Appointment Manager
//
// Schedules services onto employees. Each employee is a separate timeline
// run through the same availability chain as bookings; the service capacity
// caps how many appointments may overlap across employees.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::appointments::duration::appointment_duration;
use crate::appointments::repository::{overlapping_for_service, EmployeeOccupancy};
use crate::appointments::{
    Appointment, AppointmentRepository, AppointmentRequest, AppointmentStatus, NewAppointment,
};
use crate::availability::{
    AvailabilityReason, AvailabilityResult, AvailabilityService, SlotRequest,
};
use crate::bookings::manager::slot_end;
use crate::bookings::{reference_number, RescheduleRequest};
use crate::catalog::{Employee, EmployeeRepository, Service, ServiceRepository};
use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::events::{DomainEvent, EventEnvelope, EventSink};
use crate::settings::ConfigStore;
use crate::validation::{require_date, require_time};

/// A slot being placed, shared by create and reschedule
struct Placement<'a> {
    service: &'a Service,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<i32>,
}

pub struct AppointmentManager {
    appointments: Arc<dyn AppointmentRepository>,
    employees: Arc<dyn EmployeeRepository>,
    services: Arc<dyn ServiceRepository>,
    availability: Arc<AvailabilityService>,
    config_store: Arc<ConfigStore>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl AppointmentManager {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        employees: Arc<dyn EmployeeRepository>,
        services: Arc<dyn ServiceRepository>,
        availability: Arc<AvailabilityService>,
        config_store: Arc<ConfigStore>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            employees,
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

    async fn active_service(&self, service_id: i32) -> BookingResult<Service> {
        let service = self
            .services
            .find_by_id(service_id)
            .await?
            .ok_or_else(|| {
                BookingError::field("service_id", format!("Invalid service: {}", service_id))
            })?;
        if !service.is_active {
            return Err(BookingError::field(
                "service_id",
                "This service is not currently available",
            ));
        }
        Ok(service)
    }

    /// Buffer between two appointments of one employee: the largest of the
    /// global setting and the service's own buffers
    async fn buffer_for(&self, service: &Service) -> BookingResult<u32> {
        let snapshot = self.config_store.snapshot().await?;
        Ok(snapshot
            .booking
            .booking_buffer_time
            .max(service.buffer_before)
            .max(service.buffer_after))
    }

    async fn check_employee(
        &self,
        employee: &Employee,
        placement: &Placement<'_>,
        buffer: u32,
    ) -> BookingResult<AvailabilityResult> {
        if !employee.is_eligible(
            placement.service.id,
            placement.date,
            placement.start,
            placement.end,
        ) {
            return Ok(AvailabilityResult::rejected(
                AvailabilityReason::TimeConflict,
                "Employee is not available for this service at the requested time",
                json!({ "employee_id": employee.id }),
            ));
        }

        let occupancy = EmployeeOccupancy::new(self.appointments.as_ref(), employee.id);
        let request = SlotRequest::new(placement.date, placement.start, placement.end)
            .excluding(placement.exclude_id)
            .with_buffer(buffer);
        self.availability
            .check_slot_with(&occupancy, &request)
            .await
    }

    async fn check_capacity(&self, placement: &Placement<'_>) -> BookingResult<()> {
        let capacity = placement.service.capacity;
        if capacity == 0 {
            return Ok(());
        }

        let overlapping = overlapping_for_service(
            self.appointments.as_ref(),
            placement.service.id,
            placement.date,
            placement.start,
            placement.end,
            placement.exclude_id,
        )
        .await?;

        if overlapping >= capacity as usize {
            return Err(BookingError::Unavailable(AvailabilityResult::rejected(
                AvailabilityReason::TimeConflict,
                "This service is fully booked at the requested time",
                json!({ "capacity": capacity, "current": overlapping }),
            )));
        }
        Ok(())
    }

    /// Picks the first employee (in the given order) whose timeline accepts the slot.
    /// Returns the first rejection when nobody does.
    async fn assign(
        &self,
        candidates: &[Employee],
        placement: &Placement<'_>,
    ) -> BookingResult<Employee> {
        let buffer = self.buffer_for(placement.service).await?;
        let mut first_rejection = None;

        for employee in candidates {
            let check = self.check_employee(employee, placement, buffer).await?;
            if check.available {
                return Ok(employee.clone());
            }
            debug!(employee_id = employee.id, reason = %check.reason, "Employee unavailable");
            first_rejection.get_or_insert(check);
        }

        Err(BookingError::Unavailable(first_rejection.unwrap_or_else(|| {
            AvailabilityResult::rejected(
                AvailabilityReason::TimeConflict,
                "No employee is available for the requested time",
                json!({ "service_id": placement.service.id }),
            )
        })))
    }

    /// Active employees able to take the slot, ordered by id
    pub async fn find_available_employees(
        &self,
        service_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> BookingResult<Vec<Employee>> {
        let service = self.active_service(service_id).await?;
        let placement = Placement {
            service: &service,
            date,
            start,
            end,
            exclude_id: None,
        };
        let buffer = self.buffer_for(&service).await?;

        let mut available = Vec::new();
        for employee in self.employees.list_active().await? {
            if self.check_employee(&employee, &placement, buffer).await?.available {
                available.push(employee);
            }
        }
        Ok(available)
    }

    /// Create an appointment
    ///
    /// Duration comes from the category/size table. With an explicit employee only
    /// that employee is tried; otherwise the first available qualified employee is assigned.
    pub async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> BookingResult<Appointment> {
        let service = self.active_service(request.service_id).await?;
        let date = require_date("date", &request.date)?;
        let start = require_time("start_time", &request.start_time)?;
        let duration =
            appointment_duration(service.category, request.area_sqm, service.duration_minutes);
        let end = slot_end(start, None, duration)?;

        let placement = Placement {
            service: &service,
            date,
            start,
            end,
            exclude_id: None,
        };
        self.check_capacity(&placement).await?;

        let candidates = match request.employee_id {
            Some(employee_id) => vec![self
                .employees
                .find_by_id(employee_id)
                .await?
                .ok_or_else(|| BookingError::not_found("Employee", employee_id))?],
            None => self.employees.list_active().await?,
        };
        let employee = match self.assign(&candidates, &placement).await {
            Ok(employee) => employee,
            Err(err) => {
                warn!(service_id = service.id, "Appointment rejected: {}", err);
                return Err(err);
            }
        };

        let appointment = self
            .appointments
            .insert(NewAppointment {
                appointment_number: reference_number("AP", self.clock.today()),
                service_id: service.id,
                employee_id: employee.id,
                customer_name: request.customer_name.clone(),
                customer_email: request.customer_email.clone(),
                customer_phone: request.customer_phone.clone(),
                area_sqm: request.area_sqm,
                appointment_date: date,
                start_time: start,
                end_time: end,
                notes: request.notes.clone(),
                created_at: self.clock.now(),
            })
            .await?;
        info!(
            appointment_id = appointment.id,
            employee_id = employee.id,
            "Appointment {} created for {} {}-{}",
            appointment.appointment_number,
            date,
            start.format("%H:%M"),
            end.format("%H:%M")
        );

        self.emit(DomainEvent::AppointmentCreated {
            appointment_id: appointment.id,
            appointment_number: appointment.appointment_number.clone(),
            employee_id: employee.id,
        })
        .await;

        Ok(appointment)
    }

    async fn load(&self, id: i32) -> BookingResult<Appointment> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Appointment", id))
    }

    /// Move an appointment, falling back to another employee when the assigned one is busy
    pub async fn reschedule_appointment(
        &self,
        id: i32,
        request: &RescheduleRequest,
    ) -> BookingResult<Appointment> {
        let appointment = self.load(id).await?;
        if !appointment.status.is_open() {
            return Err(BookingError::Conflict(format!(
                "A {} appointment cannot be rescheduled",
                appointment.status
            )));
        }

        let service = self.active_service(appointment.service_id).await?;
        let date = require_date("date", &request.date)?;
        let start = require_time("start_time", &request.start_time)?;
        let length = (appointment.end_time - appointment.start_time).num_minutes();
        let duration = u32::try_from(length).unwrap_or(service.duration_minutes);
        let end = slot_end(start, request.end_time.as_deref(), duration)?;

        let placement = Placement {
            service: &service,
            date,
            start,
            end,
            exclude_id: Some(id),
        };
        self.check_capacity(&placement).await?;

        // Assigned employee first, then everyone else by id
        let mut candidates = Vec::new();
        if let Some(current) = self.employees.find_by_id(appointment.employee_id).await? {
            candidates.push(current);
        }
        candidates.extend(
            self.employees
                .list_active()
                .await?
                .into_iter()
                .filter(|e| e.id != appointment.employee_id),
        );

        let employee = self.assign(&candidates, &placement).await?;
        if employee.id != appointment.employee_id {
            info!(
                appointment_id = id,
                "Reassigned from employee {} to {}", appointment.employee_id, employee.id
            );
        }

        let updated = self
            .appointments
            .update_schedule(id, employee.id, date, start, end, self.clock.now())
            .await?;

        self.emit(DomainEvent::AppointmentRescheduled {
            appointment_id: id,
            employee_id: employee.id,
            date,
            start_time: start,
            end_time: end,
        })
        .await;

        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        id: i32,
        reason: Option<String>,
    ) -> BookingResult<Appointment> {
        let appointment = self.load(id).await?;
        match appointment.status {
            AppointmentStatus::Cancelled => {
                return Err(BookingError::Conflict(
                    "Appointment is already cancelled".to_string(),
                ))
            }
            AppointmentStatus::Completed => {
                return Err(BookingError::Conflict(
                    "A completed appointment cannot be cancelled".to_string(),
                ))
            }
            _ => {}
        }

        let snapshot = self.config_store.snapshot().await?;
        let window_hours = snapshot.booking.appointment_cancellation_hours;
        let starts_at = appointment.appointment_date.and_time(appointment.start_time);
        if starts_at - self.clock.now() < Duration::hours(i64::from(window_hours)) {
            return Err(BookingError::field(
                "appointment_id",
                format!(
                    "Appointments can only be cancelled at least {} hours before the scheduled start",
                    window_hours
                ),
            ));
        }

        let cancelled = self
            .appointments
            .update_status(id, AppointmentStatus::Cancelled, reason.clone(), self.clock.now())
            .await?;
        info!(appointment_id = id, "Appointment cancelled");

        self.emit(DomainEvent::AppointmentCancelled {
            appointment_id: id,
            reason,
        })
        .await;

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::settings::SettingsStore;
    use crate::store::memory::{MemorySettingsStore, MemoryStore, RecordingEventSink};
    use crate::types::ServiceCategory;
    use rust_decimal_macros::dec;

    // Monday 2025-06-02 07:00; appointments go on Wednesday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window_service(capacity: u32) -> Service {
        Service {
            id: 10,
            name: "Window wash".to_string(),
            category: ServiceCategory::Window,
            is_active: true,
            base_rate: None,
            rate_per_sqm: None,
            rate_per_linear_meter: None,
            duration_minutes: 60,
            buffer_before: 0,
            buffer_after: 0,
            capacity,
            custom_fields: Vec::new(),
        }
    }

    fn employee(id: i32) -> Employee {
        Employee {
            id,
            name: format!("Employee {}", id),
            email: format!("e{}@example.com", id),
            is_active: true,
            service_ids: vec![10],
            working_days: vec![1, 2, 3, 4, 5],
            work_start: Some(t(8, 0)),
            work_end: Some(t(17, 0)),
        }
    }

    fn request(start: &str, employee_id: Option<i32>) -> AppointmentRequest {
        AppointmentRequest {
            service_id: 10,
            employee_id,
            customer_name: "Sam".to_string(),
            customer_email: "sam@example.com".to_string(),
            customer_phone: None,
            area_sqm: dec!(150),
            date: "2025-06-04".to_string(),
            start_time: start.to_string(),
            notes: None,
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        events: Arc<RecordingEventSink>,
        manager: AppointmentManager,
    }

    async fn fixture(capacity: u32, employees: &[Employee]) -> Fixture {
        let settings = Arc::new(MemorySettingsStore::default());
        settings
            .update("booking_buffer_time", serde_json::json!(0))
            .await
            .unwrap();
        let store = Arc::new(MemoryStore::default());
        store.add_service(window_service(capacity)).await;
        for e in employees {
            store.add_employee(e.clone()).await;
        }

        let events = Arc::new(RecordingEventSink::default());
        let config = Arc::new(ConfigStore::new(settings));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(monday(), 7, 0).unwrap());
        let availability = Arc::new(AvailabilityService::new(
            config.clone(),
            store.clone(),
            clock.clone(),
        ));
        let manager = AppointmentManager::new(
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

    #[tokio::test]
    async fn test_auto_assigns_first_available_employee() {
        let f = fixture(0, &[employee(2), employee(1)]).await;

        let first = f.manager.create_appointment(&request("09:00", None)).await.unwrap();
        // Window service, 150 sqm: two hours
        assert_eq!(first.end_time, t(11, 0));
        assert_eq!(first.employee_id, 1);
        assert!(first.appointment_number.starts_with("AP-20250602-"));

        let second = f.manager.create_appointment(&request("10:00", None)).await.unwrap();
        assert_eq!(second.employee_id, 2);

        let third = f.manager.create_appointment(&request("10:00", None)).await;
        match third {
            Err(BookingError::Unavailable(check)) => {
                assert_eq!(check.reason, AvailabilityReason::TimeConflict)
            }
            other => panic!("expected time conflict, got {:?}", other),
        }
        assert_eq!(
            f.events.names().await,
            vec!["appointment.created", "appointment.created"]
        );
    }

    #[tokio::test]
    async fn test_service_capacity_limits_overlaps() {
        let f = fixture(1, &[employee(1), employee(2)]).await;

        f.manager.create_appointment(&request("09:00", None)).await.unwrap();
        let second = f.manager.create_appointment(&request("10:00", None)).await;

        match second {
            Err(BookingError::Unavailable(check)) => {
                assert_eq!(check.reason, AvailabilityReason::TimeConflict);
                assert_eq!(check.context["capacity"], serde_json::json!(1));
            }
            other => panic!("expected capacity rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_service_buffer_applies_per_employee() {
        let f = fixture(0, &[employee(1)]).await;
        let mut service = window_service(0);
        service.buffer_after = 30;
        f.store.add_service(service).await;

        f.manager.create_appointment(&request("09:00", Some(1))).await.unwrap();
        let adjacent = f.manager.create_appointment(&request("11:00", Some(1))).await;

        match adjacent {
            Err(BookingError::Unavailable(check)) => {
                assert_eq!(check.reason, AvailabilityReason::InsufficientBuffer)
            }
            other => panic!("expected buffer rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unqualified_employee_is_rejected() {
        let mut roofer = employee(3);
        roofer.service_ids = vec![20];
        let f = fixture(0, &[roofer]).await;

        let result = f.manager.create_appointment(&request("09:00", Some(3))).await;
        assert!(matches!(result, Err(BookingError::Unavailable(_))));

        let missing = f.manager.create_appointment(&request("09:00", Some(99))).await;
        assert!(matches!(missing, Err(BookingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_find_available_employees() {
        let mut part_time = employee(3);
        part_time.work_end = Some(t(12, 0));
        let f = fixture(0, &[employee(1), employee(2), part_time]).await;
        f.manager.create_appointment(&request("09:00", Some(1))).await.unwrap();

        let available = f
            .manager
            .find_available_employees(10, wednesday(), t(10, 0), t(13, 0))
            .await
            .unwrap();
        let ids: Vec<i32> = available.iter().map(|e| e.id).collect();

        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_reschedule_falls_back_to_other_employee() {
        let f = fixture(0, &[employee(1), employee(2)]).await;
        let moving = f.manager.create_appointment(&request("09:00", Some(1))).await.unwrap();
        f.manager.create_appointment(&request("13:00", Some(1))).await.unwrap();

        let moved = f
            .manager
            .reschedule_appointment(
                moving.id,
                &RescheduleRequest {
                    date: "2025-06-04".to_string(),
                    start_time: "12:00".to_string(),
                    end_time: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.employee_id, 2);
        assert_eq!(moved.start_time, t(12, 0));
        assert_eq!(moved.end_time, t(14, 0));
    }

    #[tokio::test]
    async fn test_reschedule_keeps_employee_when_free() {
        let f = fixture(0, &[employee(1), employee(2)]).await;
        let appointment = f.manager.create_appointment(&request("09:00", Some(2))).await.unwrap();

        let moved = f
            .manager
            .reschedule_appointment(
                appointment.id,
                &RescheduleRequest {
                    date: "2025-06-04".to_string(),
                    start_time: "10:00".to_string(),
                    end_time: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.employee_id, 2);
    }

    #[tokio::test]
    async fn test_cancel_window_and_double_cancel() {
        let f = fixture(0, &[employee(1)]).await;
        let mut tomorrow = request("09:00", None);
        tomorrow.date = "2025-06-03".to_string();
        let soon = f.manager.create_appointment(&tomorrow).await.unwrap();
        let later = f.manager.create_appointment(&request("09:00", None)).await.unwrap();

        // 26 hours ahead is outside the 24 hour window
        f.manager.cancel_appointment(soon.id, None).await.unwrap();
        f.manager
            .cancel_appointment(later.id, Some("Rain".to_string()))
            .await
            .unwrap();

        let again = f.manager.cancel_appointment(later.id, None).await;
        assert!(matches!(again, Err(BookingError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_inside_window_is_rejected() {
        let f = fixture(0, &[employee(1)]).await;
        f.manager
            .config_store
            .update_setting("appointment_cancellation_hours", serde_json::json!(72))
            .await
            .unwrap();
        let appointment = f.manager.create_appointment(&request("09:00", None)).await.unwrap();

        let result = f.manager.cancel_appointment(appointment.id, None).await;
        assert!(matches!(result, Err(BookingError::Validation { .. })));
    }
}
