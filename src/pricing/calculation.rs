// Shared price formula
//
// Base fee, size costs, custom-field modifiers, complexity adjustment and the
// minimum clamp. Both the quote calculator and the pricing engine start here.

use rust_decimal::Decimal;

use crate::catalog::Service;
use crate::error::{BookingError, BookingResult};
use crate::pricing::models::{round_money, LineItem, LineItemKind, PriceBreakdown, PricingInput};
use crate::settings::{PricingRules, RateOverride};

/// Largest area (m2) or linear length (m) accepted
pub const MAX_MEASUREMENT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Largest subtotal the shared formula may produce
pub const MAX_SUBTOTAL: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
pub const MAX_BUILDING_HEIGHT: u32 = 500;

/// Rejects out-of-range measurements before any other work happens
pub fn validate_area(input: &PricingInput) -> BookingResult<()> {
    if input.area_sqm <= Decimal::ZERO {
        return Err(BookingError::field(
            "area_sqm",
            "Area must be greater than zero",
        ));
    }
    if input.area_sqm > MAX_MEASUREMENT {
        return Err(BookingError::field(
            "area_sqm",
            format!("Area must be at most {} m2", MAX_MEASUREMENT),
        ));
    }
    if input.linear_meters < Decimal::ZERO || input.linear_meters > MAX_MEASUREMENT {
        return Err(BookingError::field(
            "linear_meters",
            format!("Linear meters must be between 0 and {}", MAX_MEASUREMENT),
        ));
    }
    if input.building_height > MAX_BUILDING_HEIGHT {
        return Err(BookingError::field(
            "building_height",
            format!("Building height must be at most {} floors", MAX_BUILDING_HEIGHT),
        ));
    }
    Ok(())
}

/// Overflow or a subtotal past `MAX_SUBTOTAL`
fn price_out_of_range() -> BookingError {
    BookingError::field("area_sqm", "Price exceeds the supported maximum")
}

fn checked(value: Option<Decimal>) -> BookingResult<Decimal> {
    value.ok_or_else(price_out_of_range)
}

/// Accumulates breakdown lines while the subtotal is transformed
#[derive(Debug, Clone)]
pub struct BreakdownBuilder {
    lines: Vec<LineItem>,
    warnings: Vec<String>,
    base_fee: Decimal,
    size_cost: Decimal,
    discount: Decimal,
    pub subtotal: Decimal,
}

impl BreakdownBuilder {
    pub fn push(&mut self, line: LineItem) {
        self.lines.push(line);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Subtracts a discount from the running subtotal and records it
    pub fn apply_discount(&mut self, label: impl Into<String>, amount: Decimal) {
        self.discount += amount;
        self.subtotal -= amount;
        self.lines
            .push(LineItem::new(LineItemKind::PromoDiscount, label, -amount));
    }

    /// Appends tax and total lines
    pub fn finish(mut self, rules: &PricingRules) -> PriceBreakdown {
        let tax_amount = if rules.tax_inclusive {
            Decimal::ZERO
        } else {
            round_money(self.subtotal * rules.tax_rate / Decimal::ONE_HUNDRED)
        };
        let total = self.subtotal + tax_amount;

        let tax_label = if rules.tax_inclusive {
            format!("Tax ({}%, included)", rules.tax_rate.normalize())
        } else {
            format!("Tax ({}%)", rules.tax_rate.normalize())
        };
        self.lines
            .push(LineItem::new(LineItemKind::Tax, tax_label, tax_amount));
        self.lines
            .push(LineItem::new(LineItemKind::Total, "Total", total));

        PriceBreakdown {
            lines: self.lines,
            base_fee: self.base_fee,
            size_cost: self.size_cost,
            subtotal: self.subtotal,
            discount: self.discount,
            tax_amount,
            total,
            warnings: self.warnings,
        }
    }
}

/// Steps 1-6 of the price formula, ending with the subtotal line.
///
/// `include_linear_meters` adds the linear-meter cost to the size cost; only
/// the quote calculator prices linear meters.
pub fn compute_base(
    input: &PricingInput,
    service: Option<&Service>,
    rules: &PricingRules,
    include_linear_meters: bool,
) -> BookingResult<BreakdownBuilder> {
    validate_area(input)?;

    if let Some(service) = service {
        if !service.is_active {
            return Err(BookingError::field(
                "service_id",
                format!("Service '{}' is not available", service.name),
            ));
        }
    }

    // 1. Rates: service override, category rates, defaults
    let rates = rules.rates_for(
        service.map(|s| s.category),
        &service.map(Service::rate_override).unwrap_or_else(RateOverride::default),
    );

    let mut builder = BreakdownBuilder {
        lines: Vec::new(),
        warnings: Vec::new(),
        base_fee: rates.base_rate,
        size_cost: Decimal::ZERO,
        discount: Decimal::ZERO,
        subtotal: Decimal::ZERO,
    };
    builder.push(LineItem::new(
        LineItemKind::BaseFee,
        "Service fee",
        rates.base_rate,
    ));

    // 2. Size-based costs
    let area_cost = round_money(checked(input.area_sqm.checked_mul(rates.rate_per_sqm))?);
    builder.push(LineItem::new(
        LineItemKind::SizeCost,
        format!("Area ({} m2)", input.area_sqm.normalize()),
        area_cost,
    ));
    let mut size_cost = area_cost;

    if include_linear_meters && input.linear_meters > Decimal::ZERO {
        let linear_cost = round_money(checked(
            input.linear_meters.checked_mul(rates.rate_per_linear_meter),
        )?);
        builder.push(LineItem::new(
            LineItemKind::LinearMeterCost,
            format!("Linear meters ({} m)", input.linear_meters.normalize()),
            linear_cost,
        ));
        size_cost = checked(size_cost.checked_add(linear_cost))?;
    }
    builder.size_cost = size_cost;

    // 3. Subtotal
    let mut subtotal = checked(rates.base_rate.checked_add(size_cost))?;

    // 4. Custom-field modifiers, exact option value match
    for (field_id, selected) in &input.custom_fields {
        let matched = service
            .and_then(|s| s.custom_field(field_id))
            .and_then(|field| field.option(selected).map(|option| (field, option)));

        match matched {
            Some((field, option)) => {
                if !option.price_modifier.is_zero() {
                    let label = option.label.as_deref().unwrap_or(selected);
                    builder.push(LineItem::new(
                        LineItemKind::CustomField,
                        format!("{}: {}", field.label, label),
                        option.price_modifier,
                    ));
                    subtotal = checked(subtotal.checked_add(option.price_modifier))?;
                }
            }
            None => builder.warn(format!(
                "Ignored unknown option '{}' for field '{}'",
                selected, field_id
            )),
        }
    }

    // 5. Complexity, always scaled by the facade reference rate
    let floors = Decimal::from(input.building_height.max(1) - 1);
    let factor = [
        rules.property_multiplier(input.property_type) - Decimal::ONE,
        rules.material_multiplier(input.surface_material) - Decimal::ONE,
        checked(floors.checked_mul(rules.height_multiplier_per_floor))?,
        rules.complexity_multiplier(input.complexity) - Decimal::ONE,
    ]
    .into_iter()
    .try_fold(Decimal::ZERO, |sum, term| checked(sum.checked_add(term)))?;
    let complexity = round_money(checked(rules.facade_base_rate.checked_mul(factor))?);
    if !complexity.is_zero() {
        builder.push(LineItem::new(
            LineItemKind::Complexity,
            "Complexity adjustment",
            complexity,
        ));
        subtotal = checked(subtotal.checked_add(complexity))?;
    }

    // 6. Minimum clamp
    if subtotal < rules.minimum_quote_value {
        builder.push(LineItem::new(
            LineItemKind::MinimumCharge,
            "Minimum charge",
            rules.minimum_quote_value - subtotal,
        ));
        subtotal = rules.minimum_quote_value;
    }

    // Keeps the dynamic multipliers and tax well inside Decimal and NUMERIC(12, 2)
    if subtotal > MAX_SUBTOTAL {
        return Err(price_out_of_range());
    }

    builder.push(LineItem::new(LineItemKind::Subtotal, "Subtotal", subtotal));
    builder.subtotal = subtotal;

    Ok(builder)
}
