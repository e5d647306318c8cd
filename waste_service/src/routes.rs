//! HTTP surface: liveness and prediction endpoints

use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use kitchen_data::PredictionRequest;
use waste_forecast::error::PipelineError;

use crate::service::InferenceService;
use crate::weather::WeatherSource;

#[derive(Debug, Serialize)]
struct PredictionResponse {
    prediction: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// All service routes.
pub fn api<W: WeatherSource + 'static>(
    service: Arc<InferenceService<W>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    health().or(predict(service))
}

fn health() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })))
}

fn predict<W: WeatherSource + 'static>(
    service: Arc<InferenceService<W>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("predict")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::any().map(move || service.clone()))
        .and_then(predict_handler)
}

async fn predict_handler<W: WeatherSource>(
    request: PredictionRequest,
    service: Arc<InferenceService<W>>,
) -> Result<impl Reply, Infallible> {
    if let Err(invalid) = request.validate() {
        return Ok(reply_error(StatusCode::BAD_REQUEST, invalid.to_string()));
    }

    match service.predict(&request).await {
        Ok(prediction) => Ok(warp::reply::with_status(
            warp::reply::json(&PredictionResponse { prediction }),
            StatusCode::OK,
        )),
        Err(error @ PipelineError::SchemaMismatch { .. }) => {
            Ok(reply_error(StatusCode::BAD_REQUEST, error.to_string()))
        }
        Err(error) => {
            tracing::error!(%error, "prediction failed");
            Ok(reply_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ))
        }
    }
}

fn reply_error(
    status: StatusCode,
    message: String,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&ErrorResponse { error: message }), status)
}
