use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::appointments::{Appointment, AppointmentStatus, NewAppointment};
use crate::availability::slots::{conflicts_with, intervals_overlap};
use crate::availability::{OccupiedInterval, SlotOccupancy};
use crate::error::BookingResult;

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: NewAppointment) -> BookingResult<Appointment>;

    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Appointment>>;

    /// Non-cancelled appointments of one employee on a date
    async fn find_for_employee_on_date(
        &self,
        employee_id: i32,
        date: NaiveDate,
    ) -> BookingResult<Vec<Appointment>>;

    /// Non-cancelled appointments of one service on a date
    async fn find_for_service_on_date(
        &self,
        service_id: i32,
        date: NaiveDate,
    ) -> BookingResult<Vec<Appointment>>;

    async fn update_schedule(
        &self,
        id: i32,
        employee_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Appointment>;

    async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
        cancellation_reason: Option<String>,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Appointment>;
}

/// One employee's appointments seen as a slot timeline
pub struct EmployeeOccupancy<'a> {
    appointments: &'a dyn AppointmentRepository,
    employee_id: i32,
}

impl<'a> EmployeeOccupancy<'a> {
    pub fn new(appointments: &'a dyn AppointmentRepository, employee_id: i32) -> Self {
        Self {
            appointments,
            employee_id,
        }
    }

    async fn intervals(
        &self,
        date: NaiveDate,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        let appointments = self
            .appointments
            .find_for_employee_on_date(self.employee_id, date)
            .await?;

        Ok(appointments
            .into_iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .filter(|a| Some(a.id) != exclude_id)
            .map(|a| OccupiedInterval {
                id: a.id,
                start: a.start_time,
                end: a.end_time,
            })
            .collect())
    }
}

#[async_trait]
impl<'a> SlotOccupancy for EmployeeOccupancy<'a> {
    async fn count_on_date(&self, date: NaiveDate, exclude_id: Option<i32>) -> BookingResult<u64> {
        Ok(self.intervals(date, exclude_id).await?.len() as u64)
    }

    async fn find_conflicting(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        Ok(self
            .intervals(date, exclude_id)
            .await?
            .into_iter()
            .filter(|i| conflicts_with(start, end, i.start, i.end))
            .collect())
    }

    async fn active_on_date(
        &self,
        date: NaiveDate,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        self.intervals(date, exclude_id).await
    }
}

/// Appointments of a service overlapping `[start, end)`, ignoring `exclude_id`
pub async fn overlapping_for_service(
    appointments: &dyn AppointmentRepository,
    service_id: i32,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<i32>,
) -> BookingResult<usize> {
    let same_day = appointments
        .find_for_service_on_date(service_id, date)
        .await?;

    Ok(same_day
        .iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .filter(|a| Some(a.id) != exclude_id)
        .filter(|a| intervals_overlap(start, end, a.start_time, a.end_time))
        .count())
}
