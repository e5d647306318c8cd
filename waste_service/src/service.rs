//! Single-request inference orchestration

use chrono::Local;
use tracing::warn;

use kitchen_data::{CalendarFeatures, PredictionRequest, WeatherObservation};
use waste_forecast::error::Result;
use waste_forecast::features::{assemble, columns, FeatureRecord};
use waste_forecast::models::TrainedRegressor;
use waste_forecast::temporal::TemporalSnapshot;

use crate::state::ModelHandle;
use crate::weather::WeatherSource;

/// Inference orchestrator; one instance serves all requests.
pub struct InferenceService<W> {
    handle: ModelHandle,
    weather: W,
}

impl<W: WeatherSource> InferenceService<W> {
    /// Create a service over a loaded artifact handle and weather source.
    pub fn new(handle: ModelHandle, weather: W) -> Self {
        Self { handle, weather }
    }

    /// The artifact handle, for reload endpoints and tests.
    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Produce a prediction for one request.
    ///
    /// A failed weather lookup degrades to fixed default conditions and
    /// never fails the request; a request that cannot satisfy the model's
    /// schema is an error the caller must see.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<f64> {
        let artifacts = self.handle.current();

        let weather = match self.weather.current(&request.city).await {
            Ok(observation) => observation,
            Err(error) => {
                warn!(
                    city = %request.city,
                    %error,
                    "weather lookup failed, using fallback conditions"
                );
                WeatherObservation::FALLBACK
            }
        };

        let today = Local::now().date_naive();
        let record = build_record(
            request,
            &CalendarFeatures::for_date(today),
            &weather,
            &artifacts.snapshot,
        );

        let vector = assemble(&record, &artifacts.bundle.schema, &artifacts.bundle.scaling)?;
        artifacts.bundle.model.predict(&vector)
    }
}

/// Merge request fields, calendar features, weather enrichment, and the
/// frozen temporal snapshot into one feature record. Insertion order is
/// irrelevant here; the assembler projects into schema order.
pub fn build_record(
    request: &PredictionRequest,
    calendar: &CalendarFeatures,
    weather: &WeatherObservation,
    snapshot: &TemporalSnapshot,
) -> FeatureRecord {
    let mut record = FeatureRecord::new();
    record.insert(columns::MEALS_SERVED, request.meals_served);
    record.insert(columns::KITCHEN_STAFF, request.kitchen_staff);
    record.insert(columns::PAST_WASTE_KG, request.past_waste_kg);
    record.extend_with_weather(weather);
    record.extend_with_calendar(calendar);
    record.insert_flag(columns::SPECIAL_EVENT, request.special_event);
    for (category, flag) in request.category_flags() {
        if let Some(column) = category.flag_column() {
            record.insert_flag(column, flag);
        }
    }
    record.insert(columns::PAST_WASTE_3D_AVG, snapshot.past_3d_avg);
    record.insert(columns::PAST_WASTE_7D_AVG, snapshot.past_7d_avg);
    record
}
