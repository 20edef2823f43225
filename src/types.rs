// Domain type definitions shared by pricing, availability and scheduling
// Enums are stored as snake_case text and serialized the same way

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Category of cleaning service
///
/// Selects category rates and the appointment duration table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Facade,
    Roof,
    Window,
    General,
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceCategory::Facade => write!(f, "facade"),
            ServiceCategory::Roof => write!(f, "roof"),
            ServiceCategory::Window => write!(f, "window"),
            ServiceCategory::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facade" => Ok(ServiceCategory::Facade),
            "roof" => Ok(ServiceCategory::Roof),
            "window" => Ok(ServiceCategory::Window),
            "general" => Ok(ServiceCategory::General),
            _ => Err(format!("Invalid service category: {}", s)),
        }
    }
}

/// Type of property being cleaned
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    Residential,
    Commercial,
    Industrial,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Residential => write!(f, "residential"),
            PropertyType::Commercial => write!(f, "commercial"),
            PropertyType::Industrial => write!(f, "industrial"),
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "residential" => Ok(PropertyType::Residential),
            "commercial" => Ok(PropertyType::Commercial),
            "industrial" => Ok(PropertyType::Industrial),
            _ => Err(format!("Invalid property type: {}", s)),
        }
    }
}

/// Surface material of the building
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMaterial {
    #[default]
    Brick,
    Stone,
    Glass,
    Metal,
    Concrete,
    Composite,
}

impl fmt::Display for SurfaceMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SurfaceMaterial::Brick => "brick",
            SurfaceMaterial::Stone => "stone",
            SurfaceMaterial::Glass => "glass",
            SurfaceMaterial::Metal => "metal",
            SurfaceMaterial::Concrete => "concrete",
            SurfaceMaterial::Composite => "composite",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for SurfaceMaterial {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brick" => Ok(SurfaceMaterial::Brick),
            "stone" => Ok(SurfaceMaterial::Stone),
            "glass" => Ok(SurfaceMaterial::Glass),
            "metal" => Ok(SurfaceMaterial::Metal),
            "concrete" => Ok(SurfaceMaterial::Concrete),
            "composite" => Ok(SurfaceMaterial::Composite),
            _ => Err(format!("Invalid surface material: {}", s)),
        }
    }
}

/// Job complexity tier
///
/// `Standard` carries a neutral multiplier, so omitting the tier leaves the
/// complexity adjustment unchanged.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple,
    #[default]
    Standard,
    Complex,
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityTier::Simple => write!(f, "simple"),
            ComplexityTier::Standard => write!(f, "standard"),
            ComplexityTier::Complex => write!(f, "complex"),
        }
    }
}

/// How a promo code's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Value is a percentage of the subtotal (10 = 10% off)
    Percentage,

    /// Value is subtracted from the subtotal as-is
    FixedAmount,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_service_category_serialization() {
        let category = ServiceCategory::Facade;
        let json = serde_json::to_string(&category).unwrap();
        assert_eq!(json, "\"facade\"");

        let deserialized: ServiceCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, category);
    }

    #[test]
    fn test_service_category_from_str() {
        assert_eq!(ServiceCategory::from_str("roof").unwrap(), ServiceCategory::Roof);
        assert!(ServiceCategory::from_str("chimney").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PropertyType::default(), PropertyType::Residential);
        assert_eq!(SurfaceMaterial::default(), SurfaceMaterial::Brick);
        assert_eq!(ComplexityTier::default(), ComplexityTier::Standard);
    }

    #[test]
    fn test_enum_map_keys() {
        let json = r#"{"commercial": "1.2", "industrial": "1.4"}"#;
        let map: std::collections::BTreeMap<PropertyType, String> =
            serde_json::from_str(json).unwrap();

        assert_eq!(map.get(&PropertyType::Commercial).map(String::as_str), Some("1.2"));
        assert!(map.get(&PropertyType::Residential).is_none());
    }

    #[test]
    fn test_display_matches_serde() {
        for material in [
            SurfaceMaterial::Brick,
            SurfaceMaterial::Stone,
            SurfaceMaterial::Glass,
            SurfaceMaterial::Metal,
            SurfaceMaterial::Concrete,
            SurfaceMaterial::Composite,
        ] {
            let json = serde_json::to_string(&material).unwrap();
            assert_eq!(json, format!("\"{}\"", material));
            assert_eq!(SurfaceMaterial::from_str(&material.to_string()).unwrap(), material);
        }
        assert_eq!(DiscountType::FixedAmount.to_string(), "fixed_amount");
    }
}
