use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use flood_engine::occupancy::TelemetryRng;
use flood_engine::{
    Coordinate, EvacuationCenter, FloodEngine, FloodRiskAssessment, RoutePlan, WeatherData,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::overlay;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FloodEngine>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct FloodRiskRequest {
    pub location: Coordinate,
    pub weather: Option<WeatherData>,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub location: Coordinate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub location: Coordinate,
    pub center: EvacuationCenter,
    pub flood_risk: FloodRiskAssessment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    pub location: Coordinate,
    pub flood_risk: FloodRiskAssessment,
    #[serde(default)]
    pub centers: Vec<EvacuationCenter>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub id: Uuid,
    pub weather: WeatherData,
    pub flood_risk: FloodRiskAssessment,
    pub centers: Vec<EvacuationCenter>,
    pub generated_at: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/weather", get(get_weather))
        .route("/flood-risk", post(flood_risk))
        .route("/evacuation-centers", post(evacuation_centers))
        .route("/routes", post(plan_routes))
        .route("/overlay", post(risk_overlay))
        .route("/assessment", post(assessment))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "flood-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn validate(location: &Coordinate) -> Result<(), ApiError> {
    if location.is_valid() {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!(
                    "Invalid coordinate ({}, {}): latitude must be within [-90, 90] and longitude within [-180, 180]",
                    location.latitude, location.longitude
                ),
            }),
        ))
    }
}

pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherData>, ApiError> {
    let location = Coordinate::new(query.lat, query.lon);
    validate(&location)?;
    Ok(Json(state.engine.compute_weather_summary(&location).await))
}

pub async fn flood_risk(
    State(state): State<AppState>,
    Json(request): Json<FloodRiskRequest>,
) -> Result<Json<FloodRiskAssessment>, ApiError> {
    validate(&request.location)?;
    let weather = match request.weather {
        Some(weather) => weather,
        None => state.engine.compute_weather_summary(&request.location).await,
    };
    Ok(Json(state.engine.compute_flood_risk(&request.location, &weather).await))
}

pub async fn evacuation_centers(
    State(state): State<AppState>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<Vec<EvacuationCenter>>, ApiError> {
    validate(&request.location)?;
    Ok(Json(state.engine.rank_evacuation_centers(&request.location).await))
}

pub async fn plan_routes(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RoutePlan>, ApiError> {
    validate(&request.location)?;
    validate(&request.center.coordinate())?;
    let plan = state
        .engine
        .plan_routes(&request.location, &request.center, &request.flood_risk)
        .await;
    Ok(Json(plan))
}

/// Risk polygons followed by center points, one collection
pub async fn risk_overlay(
    State(state): State<AppState>,
    Json(request): Json<OverlayRequest>,
) -> Result<Json<FeatureCollection>, ApiError> {
    validate(&request.location)?;
    let seed = request.seed.or(state.engine.config().occupancy_seed);
    let mut rng = TelemetryRng::new(seed);

    let mut collection = overlay::risk_overlay(
        &request.location,
        &request.flood_risk.flood_prone_areas,
        &mut rng,
    );
    collection
        .features
        .extend(overlay::centers_overlay(&request.centers).features);

    Ok(Json(collection))
}

/// Whole pipeline: weather, risk and ranked centers
pub async fn assessment(
    State(state): State<AppState>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let location = request.location;
    validate(&location)?;

    let (weather, centers) = tokio::join!(
        state.engine.compute_weather_summary(&location),
        state.engine.rank_evacuation_centers(&location)
    );
    let flood_risk = state.engine.compute_flood_risk(&location, &weather).await;

    tracing::info!(
        "Assessment at ({:.4}, {:.4}): risk {:.0}, {} centers",
        location.latitude,
        location.longitude,
        flood_risk.risk_score,
        centers.len()
    );

    Ok(Json(AssessmentResponse {
        id: Uuid::new_v4(),
        weather,
        flood_risk,
        centers,
        generated_at: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use flood_engine::EngineConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let engine = FloodEngine::offline(EngineConfig::default().with_seed(42)).unwrap();
        router(AppState {
            engine: Arc::new(engine),
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn vellore() -> Value {
        json!({"latitude": 12.9165, "longitude": 79.1325})
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_weather_falls_back_offline() {
        let (status, body) = send(get("/api/v1/weather?lat=12.9165&lon=79.1325")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "Fallback");
        assert_eq!(body["historical"]["summary"]["last24Hours"], 35.0);
        assert_eq!(body["forecast"]["hourly"].as_array().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn test_invalid_coordinate_rejected() {
        let (status, body) = send(get("/api/v1/weather?lat=95&lon=79.1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid coordinate"));

        let (status, _) = send(post(
            "/api/v1/evacuation-centers",
            json!({"location": {"latitude": 12.9, "longitude": 200.0}}),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_flood_risk_computes_weather_when_omitted() {
        let (status, body) = send(post("/api/v1/flood-risk", json!({"location": vellore()}))).await;
        assert_eq!(status, StatusCode::OK);
        // Offline defaults: elevation 0 m, water 3 km
        assert_eq!(body["elevation"], 0.0);
        assert_eq!(body["waterProximity"], 3.0);
        assert_eq!(body["recentRainfall"], 35.0);
        assert!(!body["floodProneAreas"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evacuation_centers_offline() {
        let (status, body) = send(post("/api/v1/evacuation-centers", json!({"location": vellore()}))).await;
        assert_eq!(status, StatusCode::OK);
        let centers = body.as_array().unwrap();
        assert_eq!(centers.len(), 3);
        assert!(centers.iter().all(|c| c["elevation"].as_f64().unwrap() > 80.0));
    }

    #[tokio::test]
    async fn test_routes_offline_use_cautionary_route() {
        let engine = FloodEngine::offline(EngineConfig::default().with_seed(42)).unwrap();
        let here = Coordinate::new(12.9165, 79.1325);
        let centers = engine.rank_evacuation_centers(&here).await;
        let weather = engine.compute_weather_summary(&here).await;
        let risk = engine.compute_flood_risk(&here, &weather).await;

        let (status, body) = send(post(
            "/api/v1/routes",
            json!({"location": vellore(), "center": centers[0], "floodRisk": risk}),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["primary"]["safetyScore"], 7);
        assert!(body.get("alternative").is_none());
    }

    #[tokio::test]
    async fn test_overlay_is_feature_collection() {
        let engine = FloodEngine::offline(EngineConfig::default()).unwrap();
        let here = Coordinate::new(12.9165, 79.1325);
        let risk = engine
            .compute_flood_risk(&here, &engine.compute_weather_summary(&here).await)
            .await;
        let areas = risk.flood_prone_areas.len();

        let request = json!({"location": vellore(), "floodRisk": risk, "seed": 9});
        let (status, first) = send(post("/api/v1/overlay", request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["type"], "FeatureCollection");
        assert_eq!(first["features"].as_array().unwrap().len(), areas);
        assert_eq!(first["features"][0]["geometry"]["type"], "Polygon");

        let (_, second) = send(post("/api/v1/overlay", request)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_assessment_runs_whole_pipeline() {
        let (status, body) = send(post("/api/v1/assessment", json!({"location": vellore()}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
        assert_eq!(body["weather"]["source"], "Fallback");
        assert!(body["floodRisk"]["riskScore"].as_f64().unwrap() <= 100.0);
        assert_eq!(body["centers"].as_array().unwrap().len(), 3);
        assert!(body["generatedAt"].is_string());
    }
}
