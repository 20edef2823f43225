// Pricing Engine
//
// Dynamic pricing: the shared formula followed by demand, seasonal, bulk,
// repeat-customer and urgency multipliers, an optional promo code, and tax.

use chrono::{Datelike, Duration};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bookings::BookingRepository;
use crate::catalog::ServiceRepository;
use crate::clock::Clock;
use crate::error::BookingResult;
use crate::metrics::{OperationType, PerformanceMetrics};
use crate::pricing::adjustments::{apply_stages, AdjustmentContext, PIPELINE};
use crate::pricing::calculation::{compute_base, validate_area, BreakdownBuilder};
use crate::pricing::models::{PriceBreakdown, PricingInput};
use crate::pricing::promo::{PromoCode, PromoCodeRepository, PromoRejection};
use crate::pricing::resolve_service;
use crate::settings::ConfigStore;

/// Working days per week used to turn the daily limit into weekly capacity
const WORKING_DAYS_PER_WEEK: u64 = 6;

pub struct PricingEngine {
    config_store: Arc<ConfigStore>,
    services: Arc<dyn ServiceRepository>,
    bookings: Arc<dyn BookingRepository>,
    promos: Arc<dyn PromoCodeRepository>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<PerformanceMetrics>>,
}

impl PricingEngine {
    pub fn new(
        config_store: Arc<ConfigStore>,
        services: Arc<dyn ServiceRepository>,
        bookings: Arc<dyn BookingRepository>,
        promos: Arc<dyn PromoCodeRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_store,
            services,
            bookings,
            promos,
            clock,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PerformanceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Calculate a dynamic price
    ///
    /// Orchestrates the full pricing flow:
    /// 1. Reject non-positive areas before any lookup
    /// 2. Apply the shared formula (no linear meters)
    /// 3. Gather demand and repeat-customer counts
    /// 4. Run the dynamic adjustment pipeline
    /// 5. Apply the promo code, if valid
    /// 6. Add tax and total
    pub async fn calculate_price(&self, input: &PricingInput) -> BookingResult<PriceBreakdown> {
        let _timer = self.metrics.as_ref().map(|m| m.start(OperationType::Pricing));

        validate_area(input)?;

        let snapshot = self.config_store.snapshot().await?;
        let rules = &snapshot.pricing;
        let service = resolve_service(self.services.as_ref(), input.service_id).await?;

        let mut builder = compute_base(input, service.as_ref(), rules, false)?;

        let ctx = self
            .adjustment_context(input, snapshot.booking.max_bookings_per_day)
            .await?;
        let (subtotal, lines) = apply_stages(&PIPELINE, builder.subtotal, &ctx);
        for line in lines {
            builder.push(line);
        }
        builder.subtotal = subtotal;

        if let Some(code) = input.promo_code.as_deref().filter(|c| !c.trim().is_empty()) {
            self.apply_promo(&mut builder, code, ctx).await?;
        }

        let breakdown = builder.finish(rules);
        debug!(
            "Price calculated: service={:?} subtotal={} total={}",
            input.service_id, breakdown.subtotal, breakdown.total
        );

        Ok(breakdown)
    }

    async fn adjustment_context(
        &self,
        input: &PricingInput,
        max_bookings_per_day: u32,
    ) -> BookingResult<AdjustmentContext> {
        let today = self.clock.today();
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let week_end = week_start + Duration::days(6);

        let weekly_bookings = self
            .bookings
            .count_for_service_between(input.service_id, week_start, week_end)
            .await?;

        let completed_bookings = match input.customer_email.as_deref() {
            Some(email) if !email.trim().is_empty() => {
                self.bookings.count_completed_for_email(email).await?
            }
            _ => 0,
        };

        Ok(AdjustmentContext {
            today,
            service_date: input.service_date,
            area_sqm: input.area_sqm,
            weekly_bookings,
            weekly_capacity: u64::from(max_bookings_per_day) * WORKING_DAYS_PER_WEEK,
            completed_bookings,
        })
    }

    /// Invalid codes leave the price unchanged and add a warning
    async fn apply_promo(
        &self,
        builder: &mut BreakdownBuilder,
        code: &str,
        ctx: AdjustmentContext,
    ) -> BookingResult<()> {
        let normalized = PromoCode::normalize(code);
        let promo = match self.promos.find_by_code(&normalized).await? {
            Some(promo) => promo,
            None => {
                warn!("Unknown promo code: {}", normalized);
                builder.warn(PromoRejection::Unknown.to_string());
                return Ok(());
            }
        };

        if let Err(rejection) = promo.validate(builder.subtotal, ctx.today) {
            warn!("Promo code {} rejected: {}", promo.code, rejection);
            builder.warn(rejection.to_string());
            return Ok(());
        }

        let discount = promo.discount_for(builder.subtotal);
        if !discount.is_zero() {
            builder.apply_discount(promo.label(), discount);
        }
        Ok(())
    }
}
