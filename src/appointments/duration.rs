use rust_decimal::Decimal;

use crate::types::ServiceCategory;

/// Appointment length in minutes by service category and size
///
/// | category | < 100 sqm | < 300 sqm | larger |
/// |---|---|---|---|
/// | facade | 180 | 360 | 480 |
/// | roof | 120 | 240 | 480 |
/// | window | 60 | 120 | 240 |
///
/// General services use their own configured duration.
pub fn appointment_duration(
    category: ServiceCategory,
    area_sqm: Decimal,
    service_duration: u32,
) -> u32 {
    let tiers = match category {
        ServiceCategory::Facade => [180, 360, 480],
        ServiceCategory::Roof => [120, 240, 480],
        ServiceCategory::Window => [60, 120, 240],
        ServiceCategory::General => return service_duration,
    };

    if area_sqm < Decimal::from(100) {
        tiers[0]
    } else if area_sqm < Decimal::from(300) {
        tiers[1]
    } else {
        tiers[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_duration_table() {
        assert_eq!(appointment_duration(ServiceCategory::Facade, dec!(50), 90), 180);
        assert_eq!(appointment_duration(ServiceCategory::Facade, dec!(100), 90), 360);
        assert_eq!(appointment_duration(ServiceCategory::Roof, dec!(299.9), 90), 240);
        assert_eq!(appointment_duration(ServiceCategory::Roof, dec!(300), 90), 480);
        assert_eq!(appointment_duration(ServiceCategory::Window, dec!(10), 90), 60);
        assert_eq!(appointment_duration(ServiceCategory::Window, dec!(1000), 90), 240);
        assert_eq!(appointment_duration(ServiceCategory::General, dec!(1000), 90), 90);
    }
}
