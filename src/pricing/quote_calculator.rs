// Quote Calculator
//
// Static pricing used when a quote is submitted: the shared formula with
// linear meters, no dynamic multipliers and no promo codes.

use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Service, ServiceRepository};
use crate::clock::Clock;
use crate::error::BookingResult;
use crate::metrics::{OperationType, PerformanceMetrics};
use crate::pricing::calculation::{compute_base, validate_area};
use crate::pricing::models::{PriceBreakdown, PricingInput, QuoteData};
use crate::pricing::resolve_service;
use crate::settings::{ConfigStore, PricingRules};

pub struct QuoteCalculator {
    config_store: Arc<ConfigStore>,
    services: Arc<dyn ServiceRepository>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<PerformanceMetrics>>,
}

impl QuoteCalculator {
    pub fn new(
        config_store: Arc<ConfigStore>,
        services: Arc<dyn ServiceRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_store,
            services,
            clock,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PerformanceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Pure computation over an already-resolved service and rules snapshot
    pub fn compute(
        input: &PricingInput,
        service: Option<&Service>,
        rules: &PricingRules,
    ) -> BookingResult<PriceBreakdown> {
        Ok(compute_base(input, service, rules, true)?.finish(rules))
    }

    /// Calculate a quote; no side effects
    ///
    /// 1. Reject non-positive areas
    /// 2. Resolve the service (unknown or inactive is a validation error)
    /// 3. Apply the shared formula and tax
    /// 4. Stamp the validity date
    pub async fn calculate_quote(&self, input: &PricingInput) -> BookingResult<QuoteData> {
        let _timer = self.metrics.as_ref().map(|m| m.start(OperationType::Quote));

        validate_area(input)?;

        let snapshot = self.config_store.snapshot().await?;
        let service = resolve_service(self.services.as_ref(), input.service_id).await?;

        let breakdown = Self::compute(input, service.as_ref(), &snapshot.pricing)?;
        let valid_until = self.clock.today()
            + Duration::days(i64::from(snapshot.booking.quote_validity_days));

        debug!(
            "Quote calculated: area={} total={} valid_until={}",
            input.area_sqm, breakdown.total, valid_until
        );

        Ok(QuoteData {
            total: breakdown.total,
            breakdown,
            valid_until,
        })
    }
}
