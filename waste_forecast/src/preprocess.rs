//! Batch preprocessing: raw waste table to feature matrix plus the frozen
//! artifacts the serving path depends on

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use kitchen_data::{CalendarFeatures, WasteCategory};
use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::features::{
    assemble, columns, FeatureMatrix, FeatureRecord, FeatureSchema, ScalingProfile,
};
use crate::temporal::{trailing_means, TemporalSnapshot};

/// Physical range of plausible kitchen temperatures in Celsius. Rows
/// outside it are sensor errors and are dropped before the scaling fit so
/// they never skew the fitted parameters.
pub const TEMPERATURE_RANGE_C: (f64, f64) = (9.0, 40.0);

/// One cleaned historical observation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    /// Date of the observation
    pub date: NaiveDate,
    /// Meals served
    pub meals_served: f64,
    /// Kitchen staff on duty
    pub kitchen_staff: f64,
    /// Air temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity in percent
    pub humidity_percent: f64,
    /// Special event flag
    pub special_event: bool,
    /// Recorded waste category
    pub category: WasteCategory,
    /// Waste recorded for the previous comparable day
    pub past_waste_kg: f64,
    /// Target: waste recorded on this day, in kg
    pub food_waste_kg: f64,
}

/// Result of one batch preprocessing run: the matrix the orchestrator fits
/// on, and the two artifacts the serving path reuses verbatim.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    /// Assembled, scaled feature matrix with target
    pub matrix: FeatureMatrix,
    /// Standardization parameters fitted on this batch
    pub scaling: ScalingProfile,
    /// Trailing waste averages frozen at the end of this batch
    pub snapshot: TemporalSnapshot,
}

/// Run the whole batch preprocessing step over a raw CSV file.
pub fn preprocess(raw_path: &Path) -> Result<PreprocessOutput> {
    let rows = load_batch(raw_path)?;
    build_features(&rows)
}

/// Load and clean the raw waste table, returning rows sorted ascending by
/// date.
pub fn load_batch(path: &Path) -> Result<Vec<BatchRow>> {
    if !path.exists() {
        return Err(PipelineError::DataError(format!(
            "Raw data not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(Some(100))
        .has_header(true)
        .finish()?;

    clean_batch(&df)
}

fn clean_batch(df: &DataFrame) -> Result<Vec<BatchRow>> {
    let dates = column_as_str(df, "date")?;
    let meals = column_as_f64(df, "meals_served")?;
    let staff = column_as_f64(df, "kitchen_staff")?;
    let temperature = column_as_f64(df, "temperature_c")?;
    let humidity = column_as_f64(df, "humidity_percent")?;
    let special = column_as_f64(df, "special_event")?;
    let categories = column_as_str(df, "waste_category")?;
    let past_waste = column_as_f64(df, "past_waste_kg")?;
    let target = column_as_f64(df, "food_waste_kg")?;

    let mut rows = Vec::with_capacity(df.height());
    let mut dropped_unusable = 0usize;
    let mut dropped_temperature = 0usize;

    for i in 0..df.height() {
        let date = dates[i]
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok());
        let (Some(date), Some(food_waste_kg)) = (date, target[i]) else {
            dropped_unusable += 1;
            continue;
        };
        let (Some(kitchen_staff), Some(temperature_c), Some(humidity_percent), Some(past)) =
            (staff[i], temperature[i], humidity[i], past_waste[i])
        else {
            dropped_unusable += 1;
            continue;
        };

        if !(TEMPERATURE_RANGE_C.0..=TEMPERATURE_RANGE_C.1).contains(&temperature_c) {
            dropped_temperature += 1;
            continue;
        }

        let meals_served = match meals[i] {
            Some(value) if value != 0.0 => value,
            // a recorded zero is a placeholder, not an empty kitchen
            Some(_) => 1.0,
            None => {
                dropped_unusable += 1;
                continue;
            }
        };

        let category = WasteCategory::parse(categories[i].as_deref().unwrap_or(""))
            .map_err(|err| PipelineError::DataError(err.to_string()))?;

        rows.push(BatchRow {
            date,
            meals_served,
            kitchen_staff,
            temperature_c,
            humidity_percent,
            special_event: special[i].map(|value| value != 0.0).unwrap_or(false),
            category,
            past_waste_kg: past,
            food_waste_kg,
        });
    }

    if rows.is_empty() {
        return Err(PipelineError::DataError(
            "No usable rows left after cleaning".to_string(),
        ));
    }

    rows.sort_by_key(|row| row.date);
    info!(
        rows = rows.len(),
        dropped_unusable, dropped_temperature, "raw batch cleaned"
    );
    Ok(rows)
}

/// Build the training-time feature pipeline from cleaned, date-ordered
/// rows: calendar features, category and event flags, per-row temporal
/// aggregates, schema capture, scaling fit, and matrix assembly.
pub fn build_features(rows: &[BatchRow]) -> Result<PreprocessOutput> {
    if rows.is_empty() {
        return Err(PipelineError::DataError(
            "Cannot build features from an empty batch".to_string(),
        ));
    }

    let target: Vec<f64> = rows.iter().map(|row| row.food_waste_kg).collect();
    let past_3 = trailing_means(&target, 3)?;
    let past_7 = trailing_means(&target, 7)?;

    let records: Vec<FeatureRecord> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut record = FeatureRecord::new();
            record.insert(columns::MEALS_SERVED, row.meals_served);
            record.insert(columns::KITCHEN_STAFF, row.kitchen_staff);
            record.insert(columns::TEMPERATURE_C, row.temperature_c);
            record.insert(columns::HUMIDITY_PERCENT, row.humidity_percent);
            record.insert(columns::PAST_WASTE_KG, row.past_waste_kg);
            record.extend_with_calendar(&CalendarFeatures::for_date(row.date));
            record.insert_flag(columns::SPECIAL_EVENT, row.special_event);
            record.extend_with_category(row.category);
            record.insert(columns::PAST_WASTE_3D_AVG, past_3[i]);
            record.insert(columns::PAST_WASTE_7D_AVG, past_7[i]);
            record
        })
        .collect();

    let schema = FeatureSchema::from_record(&records[0])?;
    let scaling = ScalingProfile::fit(&records, columns::SCALED)?;
    let matrix_rows = records
        .iter()
        .map(|record| assemble(record, &schema, &scaling))
        .collect::<Result<Vec<_>>>()?;
    let snapshot = TemporalSnapshot::capture(&target)?;

    info!(
        rows = matrix_rows.len(),
        columns = schema.len(),
        scaled = scaling.len(),
        "feature matrix assembled"
    );

    Ok(PreprocessOutput {
        matrix: FeatureMatrix {
            schema,
            rows: matrix_rows,
            target,
        },
        scaling,
        snapshot,
    })
}

/// Export the processed matrix as CSV; the header is the schema followed
/// by the target column.
pub fn export_matrix(matrix: &FeatureMatrix, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = matrix.schema.columns().iter().map(String::as_str).collect();
    header.push(columns::TARGET);
    writer.write_record(&header)?;

    for (row, target) in matrix.rows.iter().zip(matrix.target.iter()) {
        let mut record: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        record.push(target.to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Extract a column as optional f64 values, tolerating the integer and
/// boolean dtypes CSV inference produces.
fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df.column(name).map_err(|e| {
        PipelineError::DataError(format!("Column '{}' not found: {}", name, e))
    })?;

    match col.dtype() {
        DataType::Float64 => Ok(col.f64()?.into_iter().collect()),
        DataType::Float32 => Ok(col
            .f32()?
            .into_iter()
            .map(|v| v.map(f64::from))
            .collect()),
        DataType::Int64 => Ok(col
            .i64()?
            .into_iter()
            .map(|v| v.map(|v| v as f64))
            .collect()),
        DataType::Int32 => Ok(col
            .i32()?
            .into_iter()
            .map(|v| v.map(f64::from))
            .collect()),
        DataType::UInt64 => Ok(col
            .u64()?
            .into_iter()
            .map(|v| v.map(|v| v as f64))
            .collect()),
        DataType::UInt32 => Ok(col
            .u32()?
            .into_iter()
            .map(|v| v.map(f64::from))
            .collect()),
        DataType::Boolean => Ok(col
            .bool()?
            .into_iter()
            .map(|v| v.map(|v| if v { 1.0 } else { 0.0 }))
            .collect()),
        _ => Err(PipelineError::DataError(format!(
            "Column '{}' cannot be read as numeric",
            name
        ))),
    }
}

/// Extract a column as optional strings.
fn column_as_str(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = df.column(name).map_err(|e| {
        PipelineError::DataError(format!("Column '{}' not found: {}", name, e))
    })?;

    match col.dtype() {
        DataType::Utf8 => Ok(col
            .utf8()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        _ => Err(PipelineError::DataError(format!(
            "Column '{}' cannot be read as text",
            name
        ))),
    }
}
