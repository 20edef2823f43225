use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::types::{ComplexityTier, PropertyType, SurfaceMaterial};

/// Rounds a money amount to cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn one_floor() -> u32 {
    1
}

/// Inputs for one price computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricingInput {
    #[serde(default)]
    pub service_id: Option<i32>,
    #[schema(value_type = String, example = "120")]
    pub area_sqm: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub linear_meters: Decimal,
    /// Floor count; 0 is treated as a single floor
    #[serde(default = "one_floor")]
    pub building_height: u32,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub surface_material: SurfaceMaterial,
    #[serde(default)]
    pub complexity: ComplexityTier,
    #[serde(default)]
    pub service_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Field id -> selected option value
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

impl PricingInput {
    pub fn new(area_sqm: Decimal) -> Self {
        Self {
            service_id: None,
            area_sqm,
            linear_meters: Decimal::ZERO,
            building_height: 1,
            property_type: PropertyType::default(),
            surface_material: SurfaceMaterial::default(),
            complexity: ComplexityTier::default(),
            service_date: None,
            customer_email: None,
            promo_code: None,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_service(mut self, service_id: i32) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn on(mut self, service_date: NaiveDate) -> Self {
        self.service_date = Some(service_date);
        self
    }
}

/// Kind of a breakdown line; declaration order is the order lines appear in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    BaseFee,
    SizeCost,
    LinearMeterCost,
    CustomField,
    Complexity,
    MinimumCharge,
    Subtotal,
    Demand,
    Seasonal,
    BulkDiscount,
    RepeatCustomer,
    Urgency,
    PromoDiscount,
    Tax,
    Total,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub label: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

impl LineItem {
    pub fn new(kind: LineItemKind, label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind,
            label: label.into(),
            amount,
        }
    }
}

/// Ordered price breakdown plus the headline figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceBreakdown {
    pub lines: Vec<LineItem>,
    #[schema(value_type = String)]
    pub base_fee: Decimal,
    #[schema(value_type = String)]
    pub size_cost: Decimal,
    /// Subtotal after every adjustment and discount, before tax
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub tax_amount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PriceBreakdown {
    pub fn line(&self, kind: LineItemKind) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.kind == kind)
    }

    pub fn kinds(&self) -> Vec<LineItemKind> {
        self.lines.iter().map(|l| l.kind).collect()
    }
}

/// Static quote returned to the customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteData {
    pub breakdown: PriceBreakdown,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub valid_until: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_money(dec!(843.2)), dec!(843.20));
    }

    #[test]
    fn test_pricing_input_defaults() {
        let input: PricingInput = serde_json::from_str(r#"{"area_sqm": 120}"#).unwrap();

        assert_eq!(input.area_sqm, dec!(120));
        assert_eq!(input.building_height, 1);
        assert_eq!(input.property_type, PropertyType::Residential);
        assert_eq!(input.complexity, ComplexityTier::Standard);
        assert!(input.custom_fields.is_empty());
        assert_eq!(input, PricingInput::new(dec!(120)));
    }

    #[test]
    fn test_line_kind_order() {
        assert!(LineItemKind::Subtotal < LineItemKind::Demand);
        assert!(LineItemKind::Demand < LineItemKind::Seasonal);
        assert!(LineItemKind::Urgency < LineItemKind::PromoDiscount);
        assert!(LineItemKind::Tax < LineItemKind::Total);
        assert_eq!(
            serde_json::to_string(&LineItemKind::BulkDiscount).unwrap(),
            "\"bulk_discount\""
        );
    }
}
