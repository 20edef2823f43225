// Settings
//
// Key/value business configuration, typed into a cached snapshot.

pub mod config_store;
pub mod models;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::BookingResult;

pub use config_store::ConfigStore;
pub use models::{
    BookingSettings, BusinessHours, DayHours, PricingRules, RateOverride, Rates, SettingsSnapshot,
};

/// Persistence for business settings, one JSON value per key
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> BookingResult<Option<serde_json::Value>>;

    /// Upsert; returns true when the stored value changed
    async fn update(&self, key: &str, value: serde_json::Value) -> BookingResult<bool>;

    async fn all(&self) -> BookingResult<BTreeMap<String, serde_json::Value>>;
}
