// PostgreSQL stores
//
// Runtime-checked sqlx queries against the tables in migrations/. Integer
// columns guarded by CHECK constraints are narrowed to u32 on read.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;

use crate::appointments::{Appointment, AppointmentRepository, AppointmentStatus, NewAppointment};
use crate::availability::{OccupiedInterval, SlotOccupancy};
use crate::bookings::{
    Booking, BookingRepository, BookingStatus, NewBooking, PaymentStatus, Quote, QuoteRepository,
    QuoteStatus, ServiceSnapshot,
};
use crate::catalog::{CustomField, Employee, EmployeeRepository, Service, ServiceRepository};
use crate::error::{BookingError, BookingResult};
use crate::pricing::{PromoCode, PromoCodeRepository};
use crate::settings::SettingsStore;
use crate::types::{DiscountType, PropertyType, ServiceCategory, SurfaceMaterial};

const BOOKING_COLUMNS: &str = "id, booking_number, quote_id, service_id, customer_name, \
    customer_email, customer_phone, address, service_snapshot, booking_date, start_time, \
    end_time, status, total_amount, deposit_amount, balance_amount, payment_status, \
    reminder_sent, notes, cancellation_reason, created_at, updated_at";

const APPOINTMENT_COLUMNS: &str = "id, appointment_number, service_id, employee_id, \
    customer_name, customer_email, customer_phone, area_sqm, appointment_date, start_time, \
    end_time, status, notes, cancellation_reason, created_at, updated_at";

fn unsigned(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: i32,
    name: String,
    category: ServiceCategory,
    is_active: bool,
    base_rate: Option<Decimal>,
    rate_per_sqm: Option<Decimal>,
    rate_per_linear_meter: Option<Decimal>,
    duration_minutes: i32,
    buffer_before: i32,
    buffer_after: i32,
    capacity: i32,
    custom_fields: Json<Vec<CustomField>>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.name,
            category: row.category,
            is_active: row.is_active,
            base_rate: row.base_rate,
            rate_per_sqm: row.rate_per_sqm,
            rate_per_linear_meter: row.rate_per_linear_meter,
            duration_minutes: unsigned(row.duration_minutes),
            buffer_before: unsigned(row.buffer_before),
            buffer_after: unsigned(row.buffer_after),
            capacity: unsigned(row.capacity),
            custom_fields: row.custom_fields.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: i32,
    name: String,
    email: String,
    is_active: bool,
    service_ids: Vec<i32>,
    working_days: Vec<i32>,
    work_start: Option<NaiveTime>,
    work_end: Option<NaiveTime>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            name: row.name,
            email: row.email,
            is_active: row.is_active,
            service_ids: row.service_ids,
            working_days: row.working_days.into_iter().map(unsigned).collect(),
            work_start: row.work_start,
            work_end: row.work_end,
        }
    }
}

#[derive(Debug, FromRow)]
struct QuoteRow {
    id: i32,
    quote_number: String,
    token: String,
    service_id: Option<i32>,
    service_name: Option<String>,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    address: Option<String>,
    area_sqm: Decimal,
    property_type: PropertyType,
    surface_material: SurfaceMaterial,
    building_height: i32,
    total_amount: Decimal,
    status: QuoteStatus,
    valid_until: NaiveDate,
    created_at: NaiveDateTime,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Quote {
            id: row.id,
            quote_number: row.quote_number,
            token: row.token,
            service_id: row.service_id,
            service_name: row.service_name,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            address: row.address,
            area_sqm: row.area_sqm,
            property_type: row.property_type,
            surface_material: row.surface_material,
            building_height: unsigned(row.building_height),
            total_amount: row.total_amount,
            status: row.status,
            valid_until: row.valid_until,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PromoRow {
    code: String,
    discount_type: DiscountType,
    value: Decimal,
    max_discount: Option<Decimal>,
    min_amount: Option<Decimal>,
    valid_from: Option<NaiveDate>,
    expires_at: Option<NaiveDate>,
    usage_limit: Option<i32>,
    times_used: i32,
    is_active: bool,
}

impl From<PromoRow> for PromoCode {
    fn from(row: PromoRow) -> Self {
        PromoCode {
            code: row.code,
            discount_type: row.discount_type,
            value: row.value,
            max_discount: row.max_discount,
            min_amount: row.min_amount,
            valid_from: row.valid_from,
            expires_at: row.expires_at,
            usage_limit: row.usage_limit.map(unsigned),
            times_used: unsigned(row.times_used),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct BookingRow {
    id: i32,
    booking_number: String,
    quote_id: Option<i32>,
    service_id: Option<i32>,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    address: Option<String>,
    service_snapshot: Json<ServiceSnapshot>,
    booking_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: BookingStatus,
    total_amount: Decimal,
    deposit_amount: Decimal,
    balance_amount: Decimal,
    payment_status: PaymentStatus,
    reminder_sent: bool,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            booking_number: row.booking_number,
            quote_id: row.quote_id,
            service_id: row.service_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            address: row.address,
            service_snapshot: row.service_snapshot.0,
            booking_date: row.booking_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            total_amount: row.total_amount,
            deposit_amount: row.deposit_amount,
            balance_amount: row.balance_amount,
            payment_status: row.payment_status,
            reminder_sent: row.reminder_sent,
            notes: row.notes,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct IntervalRow {
    id: i32,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl From<IntervalRow> for OccupiedInterval {
    fn from(row: IntervalRow) -> Self {
        OccupiedInterval {
            id: row.id,
            start: row.start_time,
            end: row.end_time,
        }
    }
}

/// Settings persisted in the `settings` table
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self, key: &str) -> BookingResult<Option<serde_json::Value>> {
        let value = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn update(&self, key: &str, value: serde_json::Value) -> BookingResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            WHERE settings.value IS DISTINCT FROM EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn all(&self) -> BookingResult<BTreeMap<String, serde_json::Value>> {
        let rows = sqlx::query_as::<_, (String, serde_json::Value)>(
            "SELECT key, value FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

/// Catalog, quotes, bookings and appointments in PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_booking(&self, id: i32) -> BookingResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }
}

#[async_trait]
impl ServiceRepository for PgStore {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, name, category, is_active, base_rate, rate_per_sqm,
                   rate_per_linear_meter, duration_minutes, buffer_before,
                   buffer_after, capacity, custom_fields
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Service::from))
    }
}

#[async_trait]
impl EmployeeRepository for PgStore {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, name, email, is_active, service_ids, working_days, work_start, work_end
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    async fn list_active(&self) -> BookingResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, name, email, is_active, service_ids, working_days, work_start, work_end
            FROM employees
            WHERE is_active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }
}

#[async_trait]
impl QuoteRepository for PgStore {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Quote>> {
        let row = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT q.id, q.quote_number, q.token, q.service_id, s.name AS service_name,
                   q.customer_name, q.customer_email, q.customer_phone, q.address,
                   q.area_sqm, q.property_type, q.surface_material, q.building_height,
                   q.total_amount, q.status, q.valid_until, q.created_at
            FROM quotes q
            LEFT JOIN services s ON s.id = q.service_id
            WHERE q.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Quote::from))
    }

    async fn update_status(&self, id: i32, status: QuoteStatus) -> BookingResult<()> {
        let result = sqlx::query("UPDATE quotes SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("Quote", id));
        }
        Ok(())
    }
}

#[async_trait]
impl PromoCodeRepository for PgStore {
    async fn find_by_code(&self, code: &str) -> BookingResult<Option<PromoCode>> {
        let row = sqlx::query_as::<_, PromoRow>(
            r#"
            SELECT code, discount_type, value, max_discount, min_amount, valid_from,
                   expires_at, usage_limit, times_used, is_active
            FROM promo_codes
            WHERE UPPER(code) = $1
            "#,
        )
        .bind(PromoCode::normalize(code))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PromoCode::from))
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn insert(&self, booking: NewBooking) -> BookingResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (
                booking_number, quote_id, service_id, customer_name, customer_email,
                customer_phone, address, service_snapshot, booking_date, start_time,
                end_time, total_amount, deposit_amount, balance_amount, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.booking_number)
        .bind(booking.quote_id)
        .bind(booking.service_id)
        .bind(booking.customer_name)
        .bind(booking.customer_email)
        .bind(booking.customer_phone)
        .bind(booking.address)
        .bind(Json(booking.service_snapshot))
        .bind(booking.booking_date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.total_amount)
        .bind(booking.deposit_amount)
        .bind(booking.balance_amount)
        .bind(booking.notes)
        .bind(booking.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Booking>> {
        self.fetch_booking(id).await
    }

    async fn find_duplicate(
        &self,
        quote_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> BookingResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE quote_id = $1 AND booking_date = $2 AND start_time = $3 AND end_time = $4
              AND status <> 'cancelled'
            LIMIT 1
            "#
        ))
        .bind(quote_id)
        .bind(date)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn update_schedule(
        &self,
        id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET booking_date = $2, start_time = $3, end_time = $4,
                reminder_sent = FALSE, updated_at = $5
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(date)
        .bind(start)
        .bind(end)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::from)
            .ok_or_else(|| BookingError::not_found("Booking", id))
    }

    async fn update_status(
        &self,
        id: i32,
        status: BookingStatus,
        cancellation_reason: Option<String>,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = $2,
                cancellation_reason = COALESCE($3, cancellation_reason),
                updated_at = $4
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(cancellation_reason)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::from)
            .ok_or_else(|| BookingError::not_found("Booking", id))
    }

    async fn count_for_service_between(
        &self,
        service_id: Option<i32>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BookingResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE booking_date BETWEEN $1 AND $2
              AND status <> 'cancelled'
              AND ($3::INTEGER IS NULL OR service_id = $3)
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn count_completed_for_email(&self, email: &str) -> BookingResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE LOWER(customer_email) = LOWER($1) AND status = 'completed'
            "#,
        )
        .bind(email.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn find_due_reminders(&self, date: NaiveDate) -> BookingResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE booking_date = $1
              AND status IN ('pending', 'confirmed')
              AND reminder_sent = FALSE
            ORDER BY start_time
            "#
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn mark_reminder_sent(&self, id: i32) -> BookingResult<()> {
        let result = sqlx::query("UPDATE bookings SET reminder_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("Booking", id));
        }
        Ok(())
    }
}

/// Bookings as the shared slot timeline
#[async_trait]
impl SlotOccupancy for PgStore {
    async fn count_on_date(&self, date: NaiveDate, exclude_id: Option<i32>) -> BookingResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE booking_date = $1
              AND status <> 'cancelled'
              AND ($2::INTEGER IS NULL OR id <> $2)
            "#,
        )
        .bind(date)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn find_conflicting(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        // Same three cases as slots::conflicts_with: starts during, ends during, contains
        let rows = sqlx::query_as::<_, IntervalRow>(
            r#"
            SELECT id, start_time, end_time
            FROM bookings
            WHERE booking_date = $1
              AND status <> 'cancelled'
              AND ($4::INTEGER IS NULL OR id <> $4)
              AND (
                    (start_time <= $2 AND end_time > $2)
                 OR (start_time < $3 AND end_time >= $3)
                 OR (start_time >= $2 AND end_time <= $3)
              )
            ORDER BY start_time
            "#,
        )
        .bind(date)
        .bind(start)
        .bind(end)
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OccupiedInterval::from).collect())
    }

    async fn active_on_date(
        &self,
        date: NaiveDate,
        exclude_id: Option<i32>,
    ) -> BookingResult<Vec<OccupiedInterval>> {
        let rows = sqlx::query_as::<_, IntervalRow>(
            r#"
            SELECT id, start_time, end_time
            FROM bookings
            WHERE booking_date = $1
              AND status <> 'cancelled'
              AND ($2::INTEGER IS NULL OR id <> $2)
            ORDER BY start_time
            "#,
        )
        .bind(date)
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OccupiedInterval::from).collect())
    }
}

#[async_trait]
impl AppointmentRepository for PgStore {
    async fn insert(&self, appointment: NewAppointment) -> BookingResult<Appointment> {
        let created = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            INSERT INTO appointments (
                appointment_number, service_id, employee_id, customer_name, customer_email,
                customer_phone, area_sqm, appointment_date, start_time, end_time, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(appointment.appointment_number)
        .bind(appointment.service_id)
        .bind(appointment.employee_id)
        .bind(appointment.customer_name)
        .bind(appointment.customer_email)
        .bind(appointment.customer_phone)
        .bind(appointment.area_sqm)
        .bind(appointment.appointment_date)
        .bind(appointment.start_time)
        .bind(appointment.end_time)
        .bind(appointment.notes)
        .bind(appointment.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    async fn find_for_employee_on_date(
        &self,
        employee_id: i32,
        date: NaiveDate,
    ) -> BookingResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE employee_id = $1 AND appointment_date = $2 AND status <> 'cancelled'
            ORDER BY start_time
            "#
        ))
        .bind(employee_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    async fn find_for_service_on_date(
        &self,
        service_id: i32,
        date: NaiveDate,
    ) -> BookingResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE service_id = $1 AND appointment_date = $2 AND status <> 'cancelled'
            ORDER BY start_time
            "#
        ))
        .bind(service_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
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
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            UPDATE appointments
            SET employee_id = $2, appointment_date = $3, start_time = $4, end_time = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(employee_id)
        .bind(date)
        .bind(start)
        .bind(end)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        appointment.ok_or_else(|| BookingError::not_found("Appointment", id))
    }

    async fn update_status(
        &self,
        id: i32,
        status: AppointmentStatus,
        cancellation_reason: Option<String>,
        updated_at: NaiveDateTime,
    ) -> BookingResult<Appointment> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            UPDATE appointments
            SET status = $2,
                cancellation_reason = COALESCE($3, cancellation_reason),
                updated_at = $4
            WHERE id = $1
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(cancellation_reason)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        appointment.ok_or_else(|| BookingError::not_found("Appointment", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(unsigned(90), 90);
        assert_eq!(unsigned(-5), 0);
    }
}
