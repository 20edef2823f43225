// Catalog
//
// Services and employees are owned elsewhere; the core only reads them.

pub mod models;

use async_trait::async_trait;

use crate::error::BookingResult;

pub use models::{CustomField, CustomFieldOption, Employee, Service};

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Service>>;
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> BookingResult<Option<Employee>>;

    /// Active employees ordered by id
    async fn list_active(&self) -> BookingResult<Vec<Employee>>;
}
