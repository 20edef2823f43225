// Promo codes
//
// Validation rules and discount computation. Lookup is case-insensitive.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BookingResult;
use crate::pricing::models::round_money;
use crate::types::DiscountType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    /// Cap for percentage codes
    pub max_discount: Option<Decimal>,
    /// Subtotal required before the code applies
    pub min_amount: Option<Decimal>,
    pub valid_from: Option<NaiveDate>,
    /// Last day the code is usable
    pub expires_at: Option<NaiveDate>,
    pub usage_limit: Option<u32>,
    pub times_used: u32,
    pub is_active: bool,
}

/// Why a promo code was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoRejection {
    Unknown,
    Inactive,
    NotYetValid(NaiveDate),
    Expired(NaiveDate),
    UsageLimitReached,
    MinimumNotMet(Decimal),
}

impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoRejection::Unknown => write!(f, "Promo code not recognised"),
            PromoRejection::Inactive => write!(f, "Promo code is no longer active"),
            PromoRejection::NotYetValid(from) => write!(f, "Promo code is valid from {}", from),
            PromoRejection::Expired(on) => write!(f, "Promo code expired on {}", on),
            PromoRejection::UsageLimitReached => write!(f, "Promo code usage limit reached"),
            PromoRejection::MinimumNotMet(min) => {
                write!(f, "Promo code requires a minimum amount of {}", min)
            }
        }
    }
}

impl PromoCode {
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn validate(&self, subtotal: Decimal, today: NaiveDate) -> Result<(), PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if let Some(from) = self.valid_from {
            if today < from {
                return Err(PromoRejection::NotYetValid(from));
            }
        }
        if let Some(expires) = self.expires_at {
            if today > expires {
                return Err(PromoRejection::Expired(expires));
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.times_used >= limit {
                return Err(PromoRejection::UsageLimitReached);
            }
        }
        if let Some(min) = self.min_amount {
            if subtotal < min {
                return Err(PromoRejection::MinimumNotMet(min));
            }
        }
        Ok(())
    }

    /// Percentage codes are capped by `max_discount`; fixed codes by the subtotal
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let raw = round_money(subtotal * self.value / Decimal::ONE_HUNDRED);
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::FixedAmount => self.value.min(subtotal),
        };
        discount.max(Decimal::ZERO)
    }

    pub fn label(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => {
                format!("Promo code {} (-{}%)", self.code, self.value.normalize())
            }
            DiscountType::FixedAmount => format!("Promo code {}", self.code),
        }
    }
}

#[async_trait]
pub trait PromoCodeRepository: Send + Sync {
    /// Case-insensitive lookup
    async fn find_by_code(&self, code: &str) -> BookingResult<Option<PromoCode>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn percent_code() -> PromoCode {
        PromoCode {
            code: "SPRING10".to_string(),
            discount_type: DiscountType::Percentage,
            value: dec!(10),
            max_discount: Some(dec!(50)),
            min_amount: Some(dec!(200)),
            valid_from: Some(date(3, 1)),
            expires_at: Some(date(5, 31)),
            usage_limit: Some(100),
            times_used: 3,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_discount_capped() {
        let code = percent_code();
        assert_eq!(code.discount_for(dec!(300)), dec!(30));
        assert_eq!(code.discount_for(dec!(900)), dec!(50));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let code = PromoCode {
            discount_type: DiscountType::FixedAmount,
            value: dec!(500),
            ..percent_code()
        };
        assert_eq!(code.discount_for(dec!(320)), dec!(320));
        assert_eq!(code.discount_for(dec!(800)), dec!(500));
    }

    #[test]
    fn test_validation_rules() {
        let code = percent_code();

        assert!(code.validate(dec!(300), date(4, 1)).is_ok());
        assert_eq!(
            code.validate(dec!(300), date(2, 28)),
            Err(PromoRejection::NotYetValid(date(3, 1)))
        );
        assert_eq!(
            code.validate(dec!(300), date(6, 1)),
            Err(PromoRejection::Expired(date(5, 31)))
        );
        assert_eq!(
            code.validate(dec!(150), date(4, 1)),
            Err(PromoRejection::MinimumNotMet(dec!(200)))
        );
        // Last valid day
        assert!(code.validate(dec!(300), date(5, 31)).is_ok());

        let used_up = PromoCode {
            times_used: 100,
            ..percent_code()
        };
        assert_eq!(
            used_up.validate(dec!(300), date(4, 1)),
            Err(PromoRejection::UsageLimitReached)
        );

        let inactive = PromoCode {
            is_active: false,
            ..percent_code()
        };
        assert_eq!(inactive.validate(dec!(300), date(4, 1)), Err(PromoRejection::Inactive));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(PromoCode::normalize("  spring10 "), "SPRING10");
    }
}
