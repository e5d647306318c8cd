use std::io::Write;
use std::path::Path;

use assert_approx_eq::assert_approx_eq;
use tempfile::NamedTempFile;

use waste_forecast::error::PipelineError;
use waste_forecast::features::columns;
use waste_forecast::preprocess::{export_matrix, load_batch, preprocess};

const HEADER: &str = "date,meals_served,kitchen_staff,temperature_c,humidity_percent,special_event,waste_category,past_waste_kg,food_waste_kg";

fn write_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

fn usable_rows() -> Vec<String> {
    // ten days, deliberately out of order
    (0..10)
        .rev()
        .map(|i| {
            format!(
                "2024-03-{:02},{},8,{},60,{},meat,12.5,{}",
                i + 1,
                100 + i * 10,
                18.0 + i as f64,
                i % 2,
                20.0 + i as f64
            )
        })
        .collect()
}

#[test]
fn missing_file_is_a_data_error() {
    let result = load_batch(Path::new("does/not/exist.csv"));
    assert!(matches!(result, Err(PipelineError::DataError(_))));
}

#[test]
fn cleaning_drops_unusable_and_outlier_rows() {
    let mut rows = usable_rows();
    // sensor-impossible temperature
    rows.push("2024-03-11,100,8,55.0,60,0,meat,12.5,20.0".to_string());
    // unparseable date
    rows.push("not-a-date,100,8,20.0,60,0,meat,12.5,20.0".to_string());
    // missing target
    rows.push("2024-03-12,100,8,20.0,60,0,meat,12.5,".to_string());
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = write_csv(&refs);

    let batch = load_batch(file.path()).unwrap();
    assert_eq!(batch.len(), 10);

    // sorted ascending by date
    for pair in batch.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
}

#[test]
fn zero_meals_are_replaced_with_one() {
    let file = write_csv(&[
        "2024-03-01,0,8,20.0,60,0,grains,12.5,20.0",
        "2024-03-02,150,8,21.0,61,0,grains,12.5,21.0",
    ]);

    let batch = load_batch(file.path()).unwrap();
    assert_approx_eq!(batch[0].meals_served, 1.0);
    assert_approx_eq!(batch[1].meals_served, 150.0);
}

#[test]
fn unknown_categories_are_rejected() {
    let file = write_csv(&["2024-03-01,100,8,20.0,60,0,dairy,12.5,20.0"]);
    let result = load_batch(file.path());
    assert!(matches!(result, Err(PipelineError::DataError(_))));
}

#[test]
fn schema_order_is_stable_and_complete() {
    let rows = usable_rows();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = write_csv(&refs);

    let prepared = preprocess(file.path()).unwrap();
    let expected = vec![
        columns::MEALS_SERVED,
        columns::KITCHEN_STAFF,
        columns::TEMPERATURE_C,
        columns::HUMIDITY_PERCENT,
        columns::PAST_WASTE_KG,
        columns::DAY,
        columns::MONTH,
        columns::YEAR,
        columns::DAY_OF_WEEK,
        columns::IS_WEEKEND,
        columns::WEEK_OF_YEAR,
        columns::IS_MONTH_START,
        columns::IS_MONTH_END,
        columns::SPECIAL_EVENT,
        "category_grains",
        "category_meat",
        "category_vegetables",
        columns::PAST_WASTE_3D_AVG,
        columns::PAST_WASTE_7D_AVG,
    ];
    assert_eq!(prepared.matrix.schema.columns(), expected.as_slice());
}

#[test]
fn scaled_columns_are_standardized() {
    let rows = usable_rows();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = write_csv(&refs);

    let prepared = preprocess(file.path()).unwrap();
    let matrix = &prepared.matrix;

    // meals_served is the first schema column and varies across rows
    let mean: f64 =
        matrix.rows.iter().map(|row| row[0]).sum::<f64>() / matrix.rows.len() as f64;
    assert_approx_eq!(mean, 0.0, 1e-9);

    let variance: f64 =
        matrix.rows.iter().map(|row| row[0].powi(2)).sum::<f64>() / matrix.rows.len() as f64;
    assert_approx_eq!(variance, 1.0, 1e-9);
}

#[test]
fn temporal_aggregates_follow_the_sorted_batch() {
    let rows = usable_rows();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = write_csv(&refs);

    let prepared = preprocess(file.path()).unwrap();

    // targets sorted by date are 20..=29
    assert_approx_eq!(prepared.snapshot.past_3d_avg, 28.0);
    assert_approx_eq!(prepared.snapshot.past_7d_avg, 26.0);

    // the first rows have no history and carry zero aggregates
    let past_3_index = prepared
        .matrix
        .schema
        .columns()
        .iter()
        .position(|c| c == columns::PAST_WASTE_3D_AVG)
        .unwrap();
    let scale = prepared.scaling.get(columns::PAST_WASTE_3D_AVG).unwrap();
    let unscaled = prepared.matrix.rows[0][past_3_index] * scale.std_dev + scale.mean;
    assert_approx_eq!(unscaled, 0.0, 1e-9);
}

#[test]
fn export_writes_schema_header_plus_target() {
    let rows = usable_rows();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = write_csv(&refs);
    let prepared = preprocess(file.path()).unwrap();

    let out = NamedTempFile::new().unwrap();
    export_matrix(&prepared.matrix, out.path()).unwrap();

    let contents = std::fs::read_to_string(out.path()).unwrap();
    let mut lines = contents.lines();
    let header = lines.next().unwrap();
    let expected_header = format!(
        "{},{}",
        prepared.matrix.schema.columns().join(","),
        columns::TARGET
    );
    assert_eq!(header, expected_header);
    assert_eq!(lines.count(), prepared.matrix.len());
}
