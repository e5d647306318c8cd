//! Domain records exchanged between batch preprocessing and the service

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw category string outside the known closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown waste category: {0:?}")]
pub struct UnknownCategory(pub String);

/// A prediction request field holding a value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid request: {field} must be non-negative, got {value}")]
pub struct InvalidRequest {
    /// Name of the offending field
    pub field: &'static str,
    /// The rejected value
    pub value: f64,
}

/// Closed set of waste categories shared by training and serving.
///
/// `None` is the reference category and contributes no feature column; the
/// remaining variants each map to a fixed flag column. Extending this enum
/// is a schema change and requires retraining before the new value can be
/// served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WasteCategory {
    /// No dominant category recorded
    None,
    /// Grain-based waste
    Grains,
    /// Meat waste
    Meat,
    /// Vegetable waste
    Vegetables,
}

impl WasteCategory {
    /// Variants that contribute a flag column, in schema order.
    pub const ENCODED: [WasteCategory; 3] = [
        WasteCategory::Grains,
        WasteCategory::Meat,
        WasteCategory::Vegetables,
    ];

    /// Parse a raw category string. Matching is case-insensitive and an
    /// empty or whitespace-only string maps to the reference category.
    pub fn parse(raw: &str) -> Result<Self, UnknownCategory> {
        match raw.trim().to_uppercase().as_str() {
            "" | "NONE" => Ok(WasteCategory::None),
            "GRAINS" => Ok(WasteCategory::Grains),
            "MEAT" => Ok(WasteCategory::Meat),
            "VEGETABLES" => Ok(WasteCategory::Vegetables),
            _ => Err(UnknownCategory(raw.trim().to_string())),
        }
    }

    /// The feature column this category sets to 1, if any. The reference
    /// category returns `None`.
    pub fn flag_column(self) -> Option<&'static str> {
        match self {
            WasteCategory::None => None,
            WasteCategory::Grains => Some("category_grains"),
            WasteCategory::Meat => Some("category_meat"),
            WasteCategory::Vegetables => Some("category_vegetables"),
        }
    }
}

/// Current weather at a kitchen's location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Air temperature in degrees Celsius
    pub temperature_c: f64,
    /// Relative humidity in percent
    pub humidity_percent: f64,
}

impl WeatherObservation {
    /// Fixed substitute used whenever the live weather lookup fails.
    pub const FALLBACK: WeatherObservation = WeatherObservation {
        temperature_c: 27.0,
        humidity_percent: 77.0,
    };
}

/// A single prediction request as received by the HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Meals served on the day being predicted
    pub meals_served: f64,
    /// Kitchen staff on duty
    pub kitchen_staff: f64,
    /// Waste recorded for the previous comparable day, in kg
    pub past_waste_kg: f64,
    /// Whether a special event is scheduled
    pub special_event: bool,
    /// Grain-waste category flag
    pub category_grains: bool,
    /// Meat-waste category flag
    pub category_meat: bool,
    /// Vegetable-waste category flag
    pub category_vegetables: bool,
    /// Location used for the weather lookup
    pub city: String,
}

impl PredictionRequest {
    /// Range checks on the numeric fields.
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        for (field, value) in [
            ("meals_served", self.meals_served),
            ("kitchen_staff", self.kitchen_staff),
            ("past_waste_kg", self.past_waste_kg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidRequest { field, value });
            }
        }
        Ok(())
    }

    /// The category flags paired with their closed-set variants, in schema
    /// order.
    pub fn category_flags(&self) -> [(WasteCategory, bool); 3] {
        [
            (WasteCategory::Grains, self.category_grains),
            (WasteCategory::Meat, self.category_meat),
            (WasteCategory::Vegetables, self.category_vegetables),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(WasteCategory::parse("meat"), Ok(WasteCategory::Meat));
        assert_eq!(WasteCategory::parse("GRAINS"), Ok(WasteCategory::Grains));
        assert_eq!(
            WasteCategory::parse(" Vegetables "),
            Ok(WasteCategory::Vegetables)
        );
        assert_eq!(WasteCategory::parse(""), Ok(WasteCategory::None));
        assert_eq!(WasteCategory::parse("none"), Ok(WasteCategory::None));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = WasteCategory::parse("dairy").unwrap_err();
        assert_eq!(err, UnknownCategory("dairy".to_string()));
    }

    #[test]
    fn reference_category_has_no_column() {
        assert_eq!(WasteCategory::None.flag_column(), None);
        for category in WasteCategory::ENCODED {
            assert!(category.flag_column().is_some());
        }
    }

    #[test]
    fn request_validation_rejects_negative_values() {
        let mut request = PredictionRequest {
            meals_served: 120.0,
            kitchen_staff: 8.0,
            past_waste_kg: 14.5,
            special_event: false,
            category_grains: true,
            category_meat: false,
            category_vegetables: false,
            city: "Mumbai".to_string(),
        };
        assert!(request.validate().is_ok());

        request.past_waste_kg = -1.0;
        let err = request.validate().unwrap_err();
        assert_eq!(err.field, "past_waste_kg");
    }
}
