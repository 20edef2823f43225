// Dynamic price adjustments
//
// An ordered pipeline of named stages. Each stage turns the running subtotal
// into a new subtotal plus an optional breakdown line.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::pricing::models::{round_money, LineItem, LineItemKind};

/// Everything the dynamic stages read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentContext {
    pub today: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub area_sqm: Decimal,
    /// Non-cancelled bookings this week for the same service
    pub weekly_bookings: u64,
    /// Daily limit * 6; 0 when the daily limit is unlimited
    pub weekly_capacity: u64,
    /// Completed bookings for the customer's email
    pub completed_bookings: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicAdjustment {
    Demand,
    Seasonal,
    BulkDiscount,
    RepeatCustomer,
    Urgency,
}

/// Evaluation order of the dynamic stages
pub const PIPELINE: [DynamicAdjustment; 5] = [
    DynamicAdjustment::Demand,
    DynamicAdjustment::Seasonal,
    DynamicAdjustment::BulkDiscount,
    DynamicAdjustment::RepeatCustomer,
    DynamicAdjustment::Urgency,
];

impl DynamicAdjustment {
    pub fn kind(&self) -> LineItemKind {
        match self {
            DynamicAdjustment::Demand => LineItemKind::Demand,
            DynamicAdjustment::Seasonal => LineItemKind::Seasonal,
            DynamicAdjustment::BulkDiscount => LineItemKind::BulkDiscount,
            DynamicAdjustment::RepeatCustomer => LineItemKind::RepeatCustomer,
            DynamicAdjustment::Urgency => LineItemKind::Urgency,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DynamicAdjustment::Demand => "Demand adjustment",
            DynamicAdjustment::Seasonal => "Seasonal adjustment",
            DynamicAdjustment::BulkDiscount => "Bulk discount",
            DynamicAdjustment::RepeatCustomer => "Returning customer discount",
            DynamicAdjustment::Urgency => "Urgent service surcharge",
        }
    }

    pub fn multiplier(&self, ctx: &AdjustmentContext) -> Decimal {
        match self {
            DynamicAdjustment::Demand => demand_multiplier(ctx.weekly_bookings, ctx.weekly_capacity),
            DynamicAdjustment::Seasonal => ctx
                .service_date
                .map(|date| seasonal_multiplier(date.month()))
                .unwrap_or(Decimal::ONE),
            DynamicAdjustment::BulkDiscount => bulk_multiplier(ctx.area_sqm),
            DynamicAdjustment::RepeatCustomer => repeat_customer_multiplier(ctx.completed_bookings),
            DynamicAdjustment::Urgency => ctx
                .service_date
                .map(|date| urgency_multiplier((date - ctx.today).num_days()))
                .unwrap_or(Decimal::ONE),
        }
    }

    /// `subtotal += subtotal * (multiplier - 1)`; neutral multipliers emit no line
    pub fn apply(&self, subtotal: Decimal, ctx: &AdjustmentContext) -> (Decimal, Option<LineItem>) {
        let multiplier = self.multiplier(ctx);
        if multiplier == Decimal::ONE {
            return (subtotal, None);
        }

        let adjustment = round_money(subtotal * (multiplier - Decimal::ONE));
        let percent = ((multiplier - Decimal::ONE) * Decimal::ONE_HUNDRED).normalize();
        let sign = if percent > Decimal::ZERO { "+" } else { "" };
        let line = LineItem::new(
            self.kind(),
            format!("{} ({}{}%)", self.label(), sign, percent),
            adjustment,
        );

        (subtotal + adjustment, Some(line))
    }
}

/// Runs `stages` in order over `subtotal`, collecting the emitted lines
pub fn apply_stages(
    stages: &[DynamicAdjustment],
    subtotal: Decimal,
    ctx: &AdjustmentContext,
) -> (Decimal, Vec<LineItem>) {
    stages
        .iter()
        .fold((subtotal, Vec::new()), |(running, mut lines), stage| {
            let (next, line) = stage.apply(running, ctx);
            lines.extend(line);
            (next, lines)
        })
}

pub fn demand_multiplier(weekly_bookings: u64, weekly_capacity: u64) -> Decimal {
    if weekly_capacity == 0 {
        return Decimal::ONE;
    }
    let ratio = Decimal::from(weekly_bookings) / Decimal::from(weekly_capacity);
    if ratio >= Decimal::new(8, 1) {
        Decimal::new(12, 1)
    } else if ratio >= Decimal::new(6, 1) {
        Decimal::new(11, 1)
    } else {
        Decimal::ONE
    }
}

pub fn seasonal_multiplier(month: u32) -> Decimal {
    match month {
        3..=8 => Decimal::new(11, 1),
        12 | 1 | 2 => Decimal::new(9, 1),
        _ => Decimal::ONE,
    }
}

/// Highest threshold met wins
pub fn bulk_multiplier(area_sqm: Decimal) -> Decimal {
    const TIERS: [(i64, i64); 4] = [(5000, 80), (2000, 85), (1000, 90), (500, 95)];

    TIERS
        .iter()
        .find(|(threshold, _)| area_sqm >= Decimal::from(*threshold))
        .map(|(_, pct)| Decimal::new(*pct, 2))
        .unwrap_or(Decimal::ONE)
}

pub fn repeat_customer_multiplier(completed_bookings: u64) -> Decimal {
    match completed_bookings {
        n if n >= 5 => Decimal::new(9, 1),
        n if n >= 2 => Decimal::new(95, 2),
        _ => Decimal::ONE,
    }
}

pub fn urgency_multiplier(days_until: i64) -> Decimal {
    match days_until {
        d if d <= 1 => Decimal::new(15, 1),
        d if d <= 3 => Decimal::new(125, 2),
        d if d <= 7 => Decimal::new(11, 1),
        _ => Decimal::ONE,
    }
}
