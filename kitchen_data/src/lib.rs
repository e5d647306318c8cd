//! # Kitchen Data
//!
//! `kitchen_data` holds the shared data vocabulary for the food waste
//! forecasting workspace: calendar features derived from a date, the closed
//! set of waste categories, weather observations, and the prediction request
//! accepted by the serving endpoint.
//!
//! Batch preprocessing and online inference run as separate processes at
//! separate times; both build their features through the types here, so
//! the two executions agree on names and encodings by construction rather
//! than by convention.
//!
//! ## Usage Example
//!
//! ```
//! use chrono::NaiveDate;
//! use kitchen_data::{CalendarFeatures, WasteCategory};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
//! let calendar = CalendarFeatures::for_date(date);
//! assert!(calendar.is_month_end);
//!
//! let category = WasteCategory::parse("meat").unwrap();
//! assert_eq!(category.flag_column(), Some("category_meat"));
//! ```

pub mod calendar;
pub mod records;

pub use calendar::{days_in_month, CalendarFeatures};
pub use records::{
    InvalidRequest, PredictionRequest, UnknownCategory, WasteCategory, WeatherObservation,
};
