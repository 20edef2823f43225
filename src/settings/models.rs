// Typed settings snapshot
// Built from the key/value settings bag; every key has a default so an empty store is valid

use chrono::{NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::availability::blocked::{default_holidays, BlockedDate};
use crate::error::{BookingError, BookingResult};
use crate::types::{ComplexityTier, PropertyType, ServiceCategory, SurfaceMaterial};
use crate::validation::hhmm;

/// Resolved rates for one pricing computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rates {
    pub base_rate: Decimal,
    pub rate_per_sqm: Decimal,
    pub rate_per_linear_meter: Decimal,
}

/// Partial rate override; unset fields fall through to the next level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateOverride {
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    #[serde(default)]
    pub rate_per_sqm: Option<Decimal>,
    #[serde(default)]
    pub rate_per_linear_meter: Option<Decimal>,
}

impl RateOverride {
    fn apply_to(&self, rates: Rates) -> Rates {
        Rates {
            base_rate: self.base_rate.unwrap_or(rates.base_rate),
            rate_per_sqm: self.rate_per_sqm.unwrap_or(rates.rate_per_sqm),
            rate_per_linear_meter: self
                .rate_per_linear_meter
                .unwrap_or(rates.rate_per_linear_meter),
        }
    }
}

/// Pricing configuration, immutable for the duration of one computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingRules {
    pub default_rates: Rates,
    pub category_rates: BTreeMap<ServiceCategory, RateOverride>,
    /// Reference amount for complexity adjustments, whatever the service
    pub facade_base_rate: Decimal,
    pub property_multipliers: BTreeMap<PropertyType, Decimal>,
    pub material_multipliers: BTreeMap<SurfaceMaterial, Decimal>,
    pub height_multiplier_per_floor: Decimal,
    pub complexity_multipliers: BTreeMap<ComplexityTier, Decimal>,
    pub minimum_quote_value: Decimal,
    /// Percent
    pub tax_rate: Decimal,
    pub tax_inclusive: bool,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            default_rates: Rates {
                base_rate: Decimal::new(20, 0),
                rate_per_sqm: Decimal::new(20, 0),
                rate_per_linear_meter: Decimal::new(5, 0),
            },
            category_rates: BTreeMap::new(),
            facade_base_rate: Decimal::new(150, 0),
            property_multipliers: BTreeMap::from([
                (PropertyType::Residential, Decimal::ONE),
                (PropertyType::Commercial, Decimal::new(12, 1)),
                (PropertyType::Industrial, Decimal::new(14, 1)),
            ]),
            material_multipliers: BTreeMap::from([
                (SurfaceMaterial::Brick, Decimal::ONE),
                (SurfaceMaterial::Stone, Decimal::new(115, 2)),
                (SurfaceMaterial::Glass, Decimal::new(125, 2)),
                (SurfaceMaterial::Metal, Decimal::new(11, 1)),
                (SurfaceMaterial::Concrete, Decimal::new(105, 2)),
                (SurfaceMaterial::Composite, Decimal::new(11, 1)),
            ]),
            height_multiplier_per_floor: Decimal::new(1, 1),
            complexity_multipliers: BTreeMap::from([
                (ComplexityTier::Simple, Decimal::new(9, 1)),
                (ComplexityTier::Standard, Decimal::ONE),
                (ComplexityTier::Complex, Decimal::new(13, 1)),
            ]),
            minimum_quote_value: Decimal::new(100, 0),
            tax_rate: Decimal::new(21, 0),
            tax_inclusive: false,
        }
    }
}

impl PricingRules {
    /// Service override, then category rates, then global defaults
    pub fn rates_for(&self, category: Option<ServiceCategory>, service: &RateOverride) -> Rates {
        let category_level = category
            .and_then(|c| self.category_rates.get(&c))
            .map(|o| o.apply_to(self.default_rates))
            .unwrap_or(self.default_rates);

        service.apply_to(category_level)
    }

    pub fn property_multiplier(&self, property: PropertyType) -> Decimal {
        self.property_multipliers
            .get(&property)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    pub fn material_multiplier(&self, material: SurfaceMaterial) -> Decimal {
        self.material_multipliers
            .get(&material)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    pub fn complexity_multiplier(&self, tier: ComplexityTier) -> Decimal {
        self.complexity_multipliers
            .get(&tier)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    fn validate(&self) -> Result<(), String> {
        let rate_sets = std::iter::once(("default", self.default_rates)).chain(
            self.category_rates
                .iter()
                .map(|(_, o)| ("category", o.apply_to(self.default_rates))),
        );
        for (scope, rates) in rate_sets {
            if rates.base_rate < Decimal::ZERO
                || rates.rate_per_sqm < Decimal::ZERO
                || rates.rate_per_linear_meter < Decimal::ZERO
            {
                return Err(format!("Negative {} rate", scope));
            }
        }

        let multipliers = self
            .property_multipliers
            .values()
            .chain(self.material_multipliers.values())
            .chain(self.complexity_multipliers.values());
        for multiplier in multipliers {
            if *multiplier <= Decimal::ZERO {
                return Err(format!("Multiplier must be positive, got {}", multiplier));
            }
        }

        if self.facade_base_rate < Decimal::ZERO
            || self.height_multiplier_per_floor < Decimal::ZERO
            || self.minimum_quote_value < Decimal::ZERO
        {
            return Err("Pricing amounts must not be negative".to_string());
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(format!("Tax rate must be between 0 and 100, got {}", self.tax_rate));
        }
        Ok(())
    }
}

/// Opening window for one weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl DayHours {
    fn open(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or(NaiveTime::MIN),
            enabled: true,
        }
    }

    pub fn closed() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            enabled: false,
        }
    }
}

/// Weekly opening hours; days missing from the stored value are closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(default = "DayHours::closed")]
    pub monday: DayHours,
    #[serde(default = "DayHours::closed")]
    pub tuesday: DayHours,
    #[serde(default = "DayHours::closed")]
    pub wednesday: DayHours,
    #[serde(default = "DayHours::closed")]
    pub thursday: DayHours,
    #[serde(default = "DayHours::closed")]
    pub friday: DayHours,
    #[serde(default = "DayHours::closed")]
    pub saturday: DayHours,
    #[serde(default = "DayHours::closed")]
    pub sunday: DayHours,
}

impl Default for BusinessHours {
    fn default() -> Self {
        let weekday = DayHours::open((8, 0), (17, 0));
        Self {
            monday: weekday,
            tuesday: weekday,
            wednesday: weekday,
            thursday: weekday,
            friday: weekday,
            saturday: DayHours::open((9, 0), (13, 0)),
            sunday: DayHours::closed(),
        }
    }
}

impl BusinessHours {
    fn day(&self, weekday: Weekday) -> &DayHours {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Opening window for `weekday`, `None` when closed
    pub fn for_weekday(&self, weekday: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        let day = self.day(weekday);
        if day.enabled && day.start < day.end {
            Some((day.start, day.end))
        } else {
            None
        }
    }

    fn validate(&self) -> Result<(), String> {
        let week = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        for weekday in week {
            let day = self.day(weekday);
            if day.enabled && day.start >= day.end {
                return Err(format!("Business hours for {:?} start after they end", weekday));
            }
        }
        Ok(())
    }
}

const MINUTES_PER_DAY: u32 = 24 * 60;
const MAX_HORIZON_DAYS: u32 = 366;

/// Scheduling configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSettings {
    pub business_hours: BusinessHours,
    pub blocked_dates: Vec<BlockedDate>,
    /// 0 = unlimited
    pub max_bookings_per_day: u32,
    pub booking_buffer_time: u32,
    pub default_service_duration: u32,
    pub slot_search_horizon_days: u32,
    pub cancellation_window_hours: u32,
    pub appointment_cancellation_hours: u32,
    /// Percent of the total collected up front
    pub deposit_percentage: Decimal,
    pub quote_validity_days: u32,
    /// Per client per hour, 0 = unlimited
    pub rate_limit_submissions: u32,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            business_hours: BusinessHours::default(),
            blocked_dates: default_holidays(),
            max_bookings_per_day: 5,
            booking_buffer_time: 30,
            default_service_duration: 120,
            slot_search_horizon_days: 30,
            cancellation_window_hours: 48,
            appointment_cancellation_hours: 24,
            deposit_percentage: Decimal::ZERO,
            quote_validity_days: 30,
            rate_limit_submissions: 5,
        }
    }
}

impl BookingSettings {
    fn validate(&self) -> Result<(), String> {
        self.business_hours.validate()?;
        for entry in &self.blocked_dates {
            entry.validate()?;
        }
        if self.deposit_percentage < Decimal::ZERO
            || self.deposit_percentage > Decimal::ONE_HUNDRED
        {
            return Err(format!(
                "Deposit percentage must be between 0 and 100, got {}",
                self.deposit_percentage
            ));
        }
        if self.slot_search_horizon_days == 0 || self.slot_search_horizon_days > MAX_HORIZON_DAYS {
            return Err(format!(
                "Slot search horizon must be between 1 and {} days",
                MAX_HORIZON_DAYS
            ));
        }
        for (name, minutes) in [
            ("booking_buffer_time", self.booking_buffer_time),
            ("default_service_duration", self.default_service_duration),
        ] {
            if minutes > MINUTES_PER_DAY {
                return Err(format!("{} must be at most {} minutes", name, MINUTES_PER_DAY));
            }
        }
        Ok(())
    }
}

/// Everything the core reads from the settings store, loaded in one go
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    pub pricing: PricingRules,
    pub booking: BookingSettings,
}

fn read<T: DeserializeOwned>(
    values: &BTreeMap<String, serde_json::Value>,
    key: &str,
    default: T,
) -> BookingResult<T> {
    match values.get(key) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| BookingError::InvalidConfiguration(format!("{}: {}", key, e))),
    }
}

impl SettingsSnapshot {
    /// Build and validate a snapshot from raw settings values
    pub fn from_values(values: &BTreeMap<String, serde_json::Value>) -> BookingResult<Self> {
        let pricing_defaults = PricingRules::default();
        let booking_defaults = BookingSettings::default();

        let pricing = PricingRules {
            default_rates: Rates {
                base_rate: read(values, "base_rate", pricing_defaults.default_rates.base_rate)?,
                rate_per_sqm: read(
                    values,
                    "rate_per_sqm",
                    pricing_defaults.default_rates.rate_per_sqm,
                )?,
                rate_per_linear_meter: read(
                    values,
                    "rate_per_linear_meter",
                    pricing_defaults.default_rates.rate_per_linear_meter,
                )?,
            },
            category_rates: read(values, "category_rates", pricing_defaults.category_rates)?,
            facade_base_rate: read(values, "facade_base_rate", pricing_defaults.facade_base_rate)?,
            property_multipliers: read(
                values,
                "property_multipliers",
                pricing_defaults.property_multipliers,
            )?,
            material_multipliers: read(
                values,
                "material_multipliers",
                pricing_defaults.material_multipliers,
            )?,
            height_multiplier_per_floor: read(
                values,
                "height_multiplier_per_floor",
                pricing_defaults.height_multiplier_per_floor,
            )?,
            complexity_multipliers: read(
                values,
                "complexity_multipliers",
                pricing_defaults.complexity_multipliers,
            )?,
            minimum_quote_value: read(
                values,
                "minimum_quote_value",
                pricing_defaults.minimum_quote_value,
            )?,
            tax_rate: read(values, "tax_rate", pricing_defaults.tax_rate)?,
            tax_inclusive: read(values, "tax_inclusive", pricing_defaults.tax_inclusive)?,
        };

        let daily_limit_fallback = read(
            values,
            "max_daily_bookings",
            booking_defaults.max_bookings_per_day,
        )?;

        let booking = BookingSettings {
            business_hours: read(values, "business_hours", booking_defaults.business_hours)?,
            blocked_dates: read(values, "blocked_dates", booking_defaults.blocked_dates)?,
            max_bookings_per_day: read(values, "max_bookings_per_day", daily_limit_fallback)?,
            booking_buffer_time: read(
                values,
                "booking_buffer_time",
                booking_defaults.booking_buffer_time,
            )?,
            default_service_duration: read(
                values,
                "default_service_duration",
                booking_defaults.default_service_duration,
            )?,
            slot_search_horizon_days: read(
                values,
                "slot_search_horizon_days",
                booking_defaults.slot_search_horizon_days,
            )?,
            cancellation_window_hours: read(
                values,
                "cancellation_window_hours",
                booking_defaults.cancellation_window_hours,
            )?,
            appointment_cancellation_hours: read(
                values,
                "appointment_cancellation_hours",
                booking_defaults.appointment_cancellation_hours,
            )?,
            deposit_percentage: read(
                values,
                "deposit_percentage",
                booking_defaults.deposit_percentage,
            )?,
            quote_validity_days: read(
                values,
                "quote_validity_days",
                booking_defaults.quote_validity_days,
            )?,
            rate_limit_submissions: read(
                values,
                "rate_limit_submissions",
                booking_defaults.rate_limit_submissions,
            )?,
        };

        let snapshot = Self { pricing, booking };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> BookingResult<()> {
        self.pricing
            .validate()
            .and_then(|_| self.booking.validate())
            .map_err(BookingError::InvalidConfiguration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn values(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_store_yields_defaults() {
        let snapshot = SettingsSnapshot::from_values(&BTreeMap::new()).unwrap();

        assert_eq!(snapshot, SettingsSnapshot::default());
        assert_eq!(snapshot.pricing.default_rates.base_rate, dec!(20));
        assert_eq!(snapshot.pricing.material_multiplier(SurfaceMaterial::Glass), dec!(1.25));
        assert_eq!(snapshot.booking.max_bookings_per_day, 5);
        assert!(!snapshot.booking.blocked_dates.is_empty());
    }

    #[test]
    fn test_values_accept_numbers_and_strings() {
        let snapshot = SettingsSnapshot::from_values(&values(&[
            ("base_rate", json!(35)),
            ("rate_per_sqm", json!("12.50")),
            ("tax_rate", json!(6)),
        ]))
        .unwrap();

        assert_eq!(snapshot.pricing.default_rates.base_rate, dec!(35));
        assert_eq!(snapshot.pricing.default_rates.rate_per_sqm, dec!(12.50));
        assert_eq!(snapshot.pricing.tax_rate, dec!(6));
    }

    #[test]
    fn test_daily_limit_fallback_key() {
        let snapshot =
            SettingsSnapshot::from_values(&values(&[("max_daily_bookings", json!(3))])).unwrap();
        assert_eq!(snapshot.booking.max_bookings_per_day, 3);

        let snapshot = SettingsSnapshot::from_values(&values(&[
            ("max_daily_bookings", json!(3)),
            ("max_bookings_per_day", json!(8)),
        ]))
        .unwrap();
        assert_eq!(snapshot.booking.max_bookings_per_day, 8);
    }

    #[test]
    fn test_empty_blocked_dates_clears_default_holidays() {
        let snapshot =
            SettingsSnapshot::from_values(&values(&[("blocked_dates", json!([]))])).unwrap();
        assert!(snapshot.booking.blocked_dates.is_empty());
    }

    #[test]
    fn test_business_hours_missing_days_are_closed() {
        let snapshot = SettingsSnapshot::from_values(&values(&[(
            "business_hours",
            json!({ "monday": { "start": "07:00", "end": "15:00" } }),
        )]))
        .unwrap();
        let hours = &snapshot.booking.business_hours;

        assert_eq!(
            hours.for_weekday(Weekday::Mon),
            Some((
                NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap()
            ))
        );
        assert!(hours.for_weekday(Weekday::Tue).is_none());
    }

    #[test]
    fn test_rate_resolution_order() {
        let mut rules = PricingRules::default();
        rules.category_rates.insert(
            ServiceCategory::Roof,
            RateOverride {
                base_rate: Some(dec!(50)),
                rate_per_sqm: Some(dec!(25)),
                rate_per_linear_meter: None,
            },
        );
        let service = RateOverride {
            base_rate: None,
            rate_per_sqm: Some(dec!(30)),
            rate_per_linear_meter: None,
        };

        let rates = rules.rates_for(Some(ServiceCategory::Roof), &service);
        assert_eq!(rates.base_rate, dec!(50));
        assert_eq!(rates.rate_per_sqm, dec!(30));
        assert_eq!(rates.rate_per_linear_meter, dec!(5));

        let rates = rules.rates_for(Some(ServiceCategory::Window), &RateOverride::default());
        assert_eq!(rates, rules.default_rates);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_type = SettingsSnapshot::from_values(&values(&[("tax_rate", json!("lots"))]));
        assert!(matches!(bad_type, Err(BookingError::InvalidConfiguration(_))));

        let bad_range = SettingsSnapshot::from_values(&values(&[("tax_rate", json!(140))]));
        assert!(matches!(bad_range, Err(BookingError::InvalidConfiguration(_))));

        let bad_multiplier = SettingsSnapshot::from_values(&values(&[(
            "property_multipliers",
            json!({ "commercial": 0 }),
        )]));
        assert!(matches!(bad_multiplier, Err(BookingError::InvalidConfiguration(_))));

        let bad_hours = SettingsSnapshot::from_values(&values(&[(
            "business_hours",
            json!({ "friday": { "start": "17:00", "end": "08:00" } }),
        )]));
        assert!(matches!(bad_hours, Err(BookingError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_scheduling_values_are_bounded() {
        for (key, value) in [
            ("booking_buffer_time", json!(4_000_000_000u32)),
            ("default_service_duration", json!(1441)),
            ("slot_search_horizon_days", json!(367)),
            ("slot_search_horizon_days", json!(0)),
        ] {
            let result = SettingsSnapshot::from_values(&values(&[(key, value)]));
            assert!(
                matches!(result, Err(BookingError::InvalidConfiguration(_))),
                "{} accepted",
                key
            );
        }

        let edge = SettingsSnapshot::from_values(&values(&[
            ("booking_buffer_time", json!(1440)),
            ("slot_search_horizon_days", json!(366)),
        ]))
        .unwrap();
        assert_eq!(edge.booking.slot_search_horizon_days, 366);
    }
}
