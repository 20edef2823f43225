use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::settings::RateOverride;
use crate::types::ServiceCategory;
use crate::validation::hhmm;

/// Selectable option of a custom field, with its signed price modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldOption {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub price_modifier: Decimal,
}

/// Extra question attached to a service (e.g. "gutter cleaning: yes/no")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub options: Vec<CustomFieldOption>,
}

impl CustomField {
    /// Exact value match
    pub fn option(&self, value: &str) -> Option<&CustomFieldOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// Bookable service with optional pricing overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub category: ServiceCategory,
    pub is_active: bool,
    pub base_rate: Option<Decimal>,
    pub rate_per_sqm: Option<Decimal>,
    pub rate_per_linear_meter: Option<Decimal>,
    pub duration_minutes: u32,
    pub buffer_before: u32,
    pub buffer_after: u32,
    /// Concurrent appointments allowed, 0 = unlimited
    pub capacity: u32,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

impl Service {
    pub fn rate_override(&self) -> RateOverride {
        RateOverride {
            base_rate: self.base_rate,
            rate_per_sqm: self.rate_per_sqm,
            rate_per_linear_meter: self.rate_per_linear_meter,
        }
    }

    pub fn custom_field(&self, id: &str) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    /// Services this employee is qualified for
    pub service_ids: Vec<i32>,
    /// 0 = Sunday .. 6 = Saturday
    pub working_days: Vec<u32>,
    #[serde(default, with = "hhmm::option")]
    pub work_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    pub work_end: Option<NaiveTime>,
}

impl Employee {
    pub fn can_perform(&self, service_id: i32) -> bool {
        self.service_ids.contains(&service_id)
    }

    pub fn works_on(&self, date: NaiveDate) -> bool {
        self.working_days
            .contains(&date.weekday().num_days_from_sunday())
    }

    /// Unset bounds do not restrict
    pub fn within_hours(&self, start: NaiveTime, end: NaiveTime) -> bool {
        let after_start = self.work_start.map(|ws| start >= ws).unwrap_or(true);
        let before_end = self.work_end.map(|we| end <= we).unwrap_or(true);
        after_start && before_end
    }

    /// Static part of the availability predicate; overlap with existing
    /// appointments is checked by the appointment manager
    pub fn is_eligible(
        &self,
        service_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> bool {
        self.is_active
            && self.can_perform(service_id)
            && self.works_on(date)
            && self.within_hours(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn employee() -> Employee {
        Employee {
            id: 1,
            name: "Jo".to_string(),
            email: "jo@example.com".to_string(),
            is_active: true,
            service_ids: vec![10, 11],
            working_days: vec![1, 2, 3, 4, 5],
            work_start: Some(t(8, 0)),
            work_end: Some(t(16, 0)),
        }
    }

    #[test]
    fn test_employee_eligibility() {
        let e = employee();
        // Monday
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        // Saturday
        let saturday = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap();

        assert!(e.is_eligible(10, monday, t(9, 0), t(11, 0)));
        assert!(!e.is_eligible(12, monday, t(9, 0), t(11, 0)));
        assert!(!e.is_eligible(10, saturday, t(9, 0), t(11, 0)));
        assert!(!e.is_eligible(10, monday, t(15, 0), t(17, 0)));

        let inactive = Employee {
            is_active: false,
            ..employee()
        };
        assert!(!inactive.is_eligible(10, monday, t(9, 0), t(11, 0)));
    }

    #[test]
    fn test_open_ended_hours() {
        let e = Employee {
            work_start: None,
            work_end: None,
            ..employee()
        };
        assert!(e.within_hours(t(6, 0), t(22, 0)));
    }

    #[test]
    fn test_custom_field_option_lookup() {
        let field: CustomField = serde_json::from_value(serde_json::json!({
            "id": "gutters",
            "label": "Gutter cleaning",
            "options": [
                { "value": "yes", "price_modifier": "45.00" },
                { "value": "no" }
            ]
        }))
        .unwrap();

        assert_eq!(field.option("yes").map(|o| o.price_modifier), Some(dec!(45.00)));
        assert_eq!(field.option("no").map(|o| o.price_modifier), Some(Decimal::ZERO));
        assert!(field.option("Yes").is_none());
    }
}
