//! Feature records, the schema and scaling registry, and the assembler
//!
//! Training and inference run as separate processes with no shared memory,
//! so the columns a model was fit on have to travel with the model. This
//! module holds the pieces of that contract: [`FeatureRecord`] (named
//! values built independently by both executions), [`FeatureSchema`] (the
//! ordered column list frozen at training time), [`ScalingProfile`] (the
//! standardization parameters fitted on the training batch), and
//! [`assemble`], the single projection step both executions share.

use indexmap::IndexMap;
use kitchen_data::{CalendarFeatures, WasteCategory, WeatherObservation};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{PipelineError, Result};

/// Canonical feature column names.
///
/// Batch preprocessing and request assembly both build records through
/// these constants (and [`WasteCategory::flag_column`]), so the two
/// executions converge on one key set by construction.
pub mod columns {
    /// Meals served on the observed day
    pub const MEALS_SERVED: &str = "meals_served";
    /// Kitchen staff on duty
    pub const KITCHEN_STAFF: &str = "kitchen_staff";
    /// Air temperature in degrees Celsius
    pub const TEMPERATURE_C: &str = "temperature_c";
    /// Relative humidity in percent
    pub const HUMIDITY_PERCENT: &str = "humidity_percent";
    /// Waste recorded for the previous comparable day
    pub const PAST_WASTE_KG: &str = "past_waste_kg";
    /// Day of the month
    pub const DAY: &str = "day";
    /// Month
    pub const MONTH: &str = "month";
    /// Calendar year
    pub const YEAR: &str = "year";
    /// Day of the week, zero-indexed from Monday
    pub const DAY_OF_WEEK: &str = "day_of_week";
    /// Weekend flag
    pub const IS_WEEKEND: &str = "is_weekend";
    /// ISO week number
    pub const WEEK_OF_YEAR: &str = "week_of_year";
    /// First-day-of-month flag
    pub const IS_MONTH_START: &str = "is_month_start";
    /// Last-day-of-month flag
    pub const IS_MONTH_END: &str = "is_month_end";
    /// Special event flag
    pub const SPECIAL_EVENT: &str = "special_event";
    /// Trailing mean of the last 3 recorded waste values
    pub const PAST_WASTE_3D_AVG: &str = "past_waste_3d_avg";
    /// Trailing mean of the last 7 recorded waste values
    pub const PAST_WASTE_7D_AVG: &str = "past_waste_7d_avg";
    /// The target column; never part of a feature schema
    pub const TARGET: &str = "food_waste_kg";

    /// Numeric columns standardized by the scaling profile when present in
    /// the schema. Flags and calendar ordinals stay unscaled.
    pub const SCALED: &[&str] = &[
        MEALS_SERVED,
        KITCHEN_STAFF,
        TEMPERATURE_C,
        HUMIDITY_PERCENT,
        PAST_WASTE_3D_AVG,
        PAST_WASTE_7D_AVG,
    ];
}

/// A named-field feature collection for one observation.
///
/// Iteration order is insertion order, which is what a schema captured
/// from the first batch record preserves. Boolean flags are stored as
/// 0.0 / 1.0 so a record projects directly into a numeric vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    values: IndexMap<String, f64>,
}

impl FeatureRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a numeric feature.
    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    /// Insert a boolean feature as 0.0 / 1.0.
    pub fn insert_flag(&mut self, name: &str, flag: bool) {
        self.insert(name, if flag { 1.0 } else { 0.0 });
    }

    /// Look up a feature by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Whether the record holds a feature with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of features in the record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Merge calendar features into the record.
    pub fn extend_with_calendar(&mut self, calendar: &CalendarFeatures) {
        self.insert(columns::DAY, f64::from(calendar.day));
        self.insert(columns::MONTH, f64::from(calendar.month));
        self.insert(columns::YEAR, f64::from(calendar.year));
        self.insert(columns::DAY_OF_WEEK, f64::from(calendar.day_of_week));
        self.insert_flag(columns::IS_WEEKEND, calendar.is_weekend);
        self.insert(columns::WEEK_OF_YEAR, f64::from(calendar.week_of_year));
        self.insert_flag(columns::IS_MONTH_START, calendar.is_month_start);
        self.insert_flag(columns::IS_MONTH_END, calendar.is_month_end);
    }

    /// Merge a weather observation into the record.
    pub fn extend_with_weather(&mut self, weather: &WeatherObservation) {
        self.insert(columns::TEMPERATURE_C, weather.temperature_c);
        self.insert(columns::HUMIDITY_PERCENT, weather.humidity_percent);
    }

    /// Set every encoded category flag from a single category value.
    pub fn extend_with_category(&mut self, category: WasteCategory) {
        for variant in WasteCategory::ENCODED {
            if let Some(column) = variant.flag_column() {
                self.insert_flag(column, variant == category);
            }
        }
    }
}

/// The ordered feature column list a trained model expects.
///
/// Fixed when training completes and immutable thereafter; retraining
/// produces a new schema wholesale, never a patched one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from an ordered column list.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PipelineError::ValidationError(
                "A feature schema needs at least one column".to_string(),
            ));
        }
        for (index, column) in columns.iter().enumerate() {
            if columns[..index].contains(column) {
                return Err(PipelineError::ValidationError(format!(
                    "Duplicate column '{}' in feature schema",
                    column
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Capture a schema from a record's insertion order.
    pub fn from_record(record: &FeatureRecord) -> Result<Self> {
        Self::new(record.names().map(str::to_string).collect())
    }

    /// The ordered columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Standardization parameters for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaling {
    /// Mean of the column over the training batch
    pub mean: f64,
    /// Population standard deviation over the training batch
    pub std_dev: f64,
}

/// Per-column standardization parameters fitted once on the training
/// batch. Columns absent from the profile pass through unscaled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingProfile {
    params: IndexMap<String, ColumnScaling>,
}

impl ScalingProfile {
    /// A profile that scales nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a profile from explicit column parameters.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, ColumnScaling)>) -> Self {
        Self {
            params: pairs.into_iter().collect(),
        }
    }

    /// Fit standardization parameters over the listed columns.
    ///
    /// Columns not present in the records are skipped, so a fixed
    /// enumerated list can be passed regardless of which optional columns
    /// the batch produced. Zero-variance columns store a standard
    /// deviation of 1 and therefore pass through centered but unstretched.
    pub fn fit(records: &[FeatureRecord], columns: &[&str]) -> Result<Self> {
        if records.is_empty() {
            return Err(PipelineError::DataError(
                "Cannot fit a scaling profile on an empty batch".to_string(),
            ));
        }

        let mut params = IndexMap::new();
        for &column in columns {
            if !records[0].contains(column) {
                continue;
            }
            let mut values = Vec::with_capacity(records.len());
            for record in records {
                match record.get(column) {
                    Some(value) => values.push(value),
                    None => {
                        return Err(PipelineError::SchemaMismatch {
                            missing: vec![column.to_string()],
                        })
                    }
                }
            }
            let mean = values.iter().mean();
            let std_dev = values.iter().population_std_dev();
            let std_dev = if std_dev > 0.0 { std_dev } else { 1.0 };
            params.insert(column.to_string(), ColumnScaling { mean, std_dev });
        }

        Ok(Self { params })
    }

    /// Parameters for a column, if it is scaled.
    pub fn get(&self, column: &str) -> Option<ColumnScaling> {
        self.params.get(column).copied()
    }

    /// Scaled column names in insertion order.
    pub fn scaled_columns(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Number of scaled columns.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the profile scales nothing.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A batch feature matrix: every row already projected into schema order
/// and scaled, paired with the target vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Ordered feature columns
    pub schema: FeatureSchema,
    /// One positional vector per observation
    pub rows: Vec<Vec<f64>>,
    /// Target values aligned with `rows`
    pub target: Vec<f64>,
}

impl FeatureMatrix {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no observations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Project a feature record into the schema's column order and apply the
/// scaling profile, producing the positional vector a model consumes.
///
/// Every schema column must be present in the record; the error names all
/// absent columns at once. Record fields outside the schema are ignored.
/// Scaling applies only to columns registered in the profile; everything
/// else, including 0/1 flags, passes through untouched.
pub fn assemble(
    record: &FeatureRecord,
    schema: &FeatureSchema,
    scaling: &ScalingProfile,
) -> Result<Vec<f64>> {
    let mut vector = Vec::with_capacity(schema.len());
    let mut missing = Vec::new();

    for column in schema.columns() {
        match record.get(column) {
            Some(value) => {
                let projected = match scaling.get(column) {
                    Some(scale) => (value - scale.mean) / scale.std_dev,
                    None => value,
                };
                vector.push(projected);
            }
            None => missing.push(column.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(PipelineError::SchemaMismatch { missing });
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_from(pairs: &[(&str, f64)]) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        for (name, value) in pairs {
            record.insert(name, *value);
        }
        record
    }

    #[test]
    fn scaling_fit_standardizes_to_zero_mean_unit_variance() {
        let records: Vec<FeatureRecord> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|v| record_from(&[("x", *v), ("flag", 1.0)]))
            .collect();

        let profile = ScalingProfile::fit(&records, &["x", "absent"]).unwrap();
        assert_eq!(profile.len(), 1);

        let scale = profile.get("x").unwrap();
        assert!((scale.mean - 2.5).abs() < 1e-12);
        // population std of [1,2,3,4]
        assert!((scale.std_dev - 1.118033988749895).abs() < 1e-12);
    }

    #[test]
    fn scaling_fit_keeps_zero_variance_columns_passable() {
        let records: Vec<FeatureRecord> =
            (0..5).map(|_| record_from(&[("x", 3.0)])).collect();
        let profile = ScalingProfile::fit(&records, &["x"]).unwrap();
        assert_eq!(profile.get("x").unwrap().std_dev, 1.0);
    }

    #[test]
    fn schema_rejects_duplicates_and_empty() {
        assert!(FeatureSchema::new(vec![]).is_err());
        assert!(
            FeatureSchema::new(vec!["a".to_string(), "a".to_string()]).is_err()
        );
    }

    #[test]
    fn category_flags_are_one_hot_with_reference_dropped() {
        let mut record = FeatureRecord::new();
        record.extend_with_category(WasteCategory::Meat);
        assert_eq!(record.get("category_grains"), Some(0.0));
        assert_eq!(record.get("category_meat"), Some(1.0));
        assert_eq!(record.get("category_vegetables"), Some(0.0));

        let mut none = FeatureRecord::new();
        none.extend_with_category(WasteCategory::None);
        assert_eq!(none.get("category_grains"), Some(0.0));
        assert_eq!(none.get("category_meat"), Some(0.0));
        assert_eq!(none.get("category_vegetables"), Some(0.0));
    }
}
