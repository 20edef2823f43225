// Appointments
//
// Employee-assigned service visits. Durations come from a category/size table.

pub mod duration;
pub mod manager;
pub mod models;
pub mod repository;

pub use duration::appointment_duration;
pub use manager::AppointmentManager;
pub use models::{
    Appointment, AppointmentRequest, AppointmentStatus, EmployeeAvailabilityQuery, NewAppointment,
};
pub use repository::{AppointmentRepository, EmployeeOccupancy};
