// Pricing
//
// Static quotes (QuoteCalculator) and dynamic prices (PricingEngine) share one
// base formula; the engine adds the adjustment pipeline and promo codes.

pub mod adjustments;
pub mod calculation;
pub mod engine;
pub mod models;
pub mod promo;
pub mod quote_calculator;

pub use engine::PricingEngine;
pub use models::{LineItem, LineItemKind, PriceBreakdown, PricingInput, QuoteData};
pub use promo::{PromoCode, PromoCodeRepository};
pub use quote_calculator::QuoteCalculator;

use crate::catalog::{Service, ServiceRepository};
use crate::error::{BookingError, BookingResult};

/// Looks up the referenced service; an unknown id is a validation failure
pub(crate) async fn resolve_service(
    services: &dyn ServiceRepository,
    service_id: Option<i32>,
) -> BookingResult<Option<Service>> {
    match service_id {
        None => Ok(None),
        Some(id) => match services.find_by_id(id).await? {
            Some(service) => Ok(Some(service)),
            None => Err(BookingError::field(
                "service_id",
                format!("Invalid service: {}", id),
            )),
        },
    }
}
