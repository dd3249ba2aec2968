use super::get_json;
use crate::geo::distance_km;
use crate::provider::{
    DrivingRoute, ElevationSource, Institution, PlaceDiscovery, ProviderError, RoutingService,
    WaterProximitySource,
};
use crate::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;

const API_BASE: &str = "https://api.mapbox.com";
const TERRAIN_TILESET: &str = "mapbox.mapbox-terrain-v2";

#[derive(Debug, Deserialize)]
struct TilequeryResponse {
    #[serde(default)]
    features: Vec<TilequeryFeature>,
}

#[derive(Debug, Deserialize)]
struct TilequeryFeature {
    properties: ContourProperties,
}

#[derive(Debug, Deserialize)]
struct ContourProperties {
    ele: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    id: String,
    text: String,
    #[serde(default)]
    place_name: String,
    /// `[lon, lat]`
    center: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
    geometry: Option<LineGeometry>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    maneuver: Maneuver,
}

#[derive(Debug, Deserialize)]
struct Maneuver {
    #[serde(default)]
    instruction: String,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Mapbox terrain, geocoding and directions behind one access token
pub struct MapboxClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl MapboxClient {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self { client, token }
    }

    fn token(&self) -> Result<&str, ProviderError> {
        self.token.as_deref().ok_or(ProviderError::MissingToken("Mapbox"))
    }

    async fn geocode(
        &self,
        query: &str,
        near: &Coordinate,
        limit: Option<usize>,
    ) -> Result<Vec<PlaceFeature>, ProviderError> {
        let token = self.token()?;
        let url = format!("{}/geocoding/v5/mapbox.places/{}.json", API_BASE, query);

        let mut params = vec![
            ("proximity", format!("{},{}", near.longitude, near.latitude)),
            ("types", "poi".to_string()),
            ("access_token", token.to_string()),
        ];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let response: GeocodingResponse =
            get_json(self.client.get(&url).query(&params), "Mapbox geocoding").await?;
        Ok(response.features)
    }
}

#[async_trait]
impl ElevationSource for MapboxClient {
    async fn fetch_elevation(&self, coordinate: &Coordinate) -> Result<Option<f64>, ProviderError> {
        let token = self.token()?;
        let url = format!(
            "{}/v4/{}/tilequery/{},{}.json",
            API_BASE, TERRAIN_TILESET, coordinate.longitude, coordinate.latitude
        );
        let request = self
            .client
            .get(&url)
            .query(&[("layers", "contour"), ("access_token", token)]);

        let response: TilequeryResponse = get_json(request, "Mapbox tilequery").await?;
        Ok(response.features.first().and_then(|f| f.properties.ele))
    }
}

#[async_trait]
impl WaterProximitySource for MapboxClient {
    async fn fetch_nearest_water_distance(
        &self,
        location: &Coordinate,
    ) -> Result<Option<f64>, ProviderError> {
        let features = self.geocode("water", location, None).await?;
        Ok(features.first().map(|water| {
            let [lon, lat] = water.center;
            distance_km(location, &Coordinate::new(lat, lon))
        }))
    }
}

#[async_trait]
impl PlaceDiscovery for MapboxClient {
    async fn discover_nearby_institutions(
        &self,
        location: &Coordinate,
        limit: usize,
    ) -> Result<Vec<Institution>, ProviderError> {
        let features = self
            .geocode("school%20college%20university", location, Some(limit))
            .await?;

        Ok(features.into_iter().take(limit).map(into_institution).collect())
    }
}

#[async_trait]
impl RoutingService for MapboxClient {
    async fn fetch_driving_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<Option<DrivingRoute>, ProviderError> {
        let token = self.token()?;
        let path = waypoints
            .iter()
            .map(|c| format!("{},{}", c.longitude, c.latitude))
            .collect::<Vec<_>>()
            .join(";");
        let url = format!("{}/directions/v5/mapbox/driving/{}", API_BASE, path);
        let request = self.client.get(&url).query(&[
            ("steps", "true"),
            ("geometries", "geojson"),
            ("access_token", token),
        ]);

        let response: DirectionsResponse = get_json(request, "Mapbox directions").await?;
        Ok(response.routes.into_iter().next().map(into_driving_route))
    }
}

fn into_institution(feature: PlaceFeature) -> Institution {
    let [lon, lat] = feature.center;
    Institution {
        id: feature.id,
        name: feature.text,
        address: feature.place_name,
        coordinate: Coordinate::new(lat, lon),
    }
}

/// Steps from every leg in travel order
fn into_driving_route(route: DirectionsRoute) -> DrivingRoute {
    DrivingRoute {
        distance_meters: route.distance,
        duration_seconds: route.duration,
        step_instructions: route
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(|step| step.maneuver.instruction)
            .collect(),
        geometry: route.geometry.map(|g| g.coordinates).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions_payload_joins_legs() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 6421.7,
                "duration": 812.4,
                "geometry": {"type": "LineString", "coordinates": [[79.1325, 12.9165], [79.156, 12.97]]},
                "legs": [
                    {"steps": [{"maneuver": {"instruction": "Head north on Officer's Line"}}]},
                    {"steps": [
                        {"maneuver": {"instruction": "Turn right onto Katpadi Road"}},
                        {"maneuver": {"instruction": "You have arrived at your destination"}}
                    ]}
                ]
            }]
        }"#;

        let response: DirectionsResponse = serde_json::from_str(body).unwrap();
        let route = response.routes.into_iter().next().map(into_driving_route).unwrap();
        assert_eq!(route.step_instructions.len(), 3);
        assert_eq!(route.step_instructions[1], "Turn right onto Katpadi Road");
        assert_eq!(route.geometry.len(), 2);
        assert_eq!(route.distance_meters, 6421.7);
    }

    #[test]
    fn test_no_route_payload() {
        let response: DirectionsResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "routes": []}"#).unwrap();
        assert!(response.routes.is_empty());
    }

    #[test]
    fn test_place_feature_to_institution() {
        let body = r#"{"features": [{
            "id": "poi.123",
            "text": "Voorhees College",
            "place_name": "Voorhees College, Arcot Road, Vellore, Tamil Nadu",
            "center": [79.1351, 12.9289]
        }]}"#;
        let response: GeocodingResponse = serde_json::from_str(body).unwrap();
        let institution = into_institution(response.features.into_iter().next().unwrap());
        assert_eq!(institution.name, "Voorhees College");
        assert_eq!(institution.coordinate.latitude, 12.9289);
        assert_eq!(institution.coordinate.longitude, 79.1351);
    }

    #[test]
    fn test_contour_without_elevation() {
        let response: TilequeryResponse =
            serde_json::from_str(r#"{"features": [{"properties": {"index": 5}}]}"#).unwrap();
        assert_eq!(response.features.first().and_then(|f| f.properties.ele), None);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let mapbox = MapboxClient::new(reqwest::Client::new(), None);
        let here = Coordinate::new(12.9165, 79.1325);
        assert_eq!(
            mapbox.fetch_elevation(&here).await,
            Err(ProviderError::MissingToken("Mapbox"))
        );
        assert!(mapbox.discover_nearby_institutions(&here, 10).await.is_err());
    }
}
