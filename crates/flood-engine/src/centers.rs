//! Evacuation center ranking
//!
//! Candidates are filtered by a proximity/safety rule, annotated with travel
//! time and occupancy, then ordered safe-first and nearest-first.
//!
//! A candidate is **safe** when its elevation exceeds 80 m. A candidate closer
//! than 1 km that is not safe sits inside the same flood zone as the caller
//! and is discarded.

use crate::geo::distance_km;
use crate::occupancy::{TelemetryRng, SYNTHETIC_OCCUPANCY_MAX};
use crate::provider::Institution;
use crate::Coordinate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Elevation above which a center counts as safe (m)
pub const SAFE_ELEVATION_M: f64 = 80.0;

/// Unsafe candidates nearer than this are discarded (km)
pub const MIN_UNSAFE_DISTANCE_KM: f64 = 1.0;

/// Travel-time heuristic for discovered centers
pub const MINUTES_PER_KM: f64 = 4.0;

/// Average urban speed assumed for the curated fallback list
pub const FALLBACK_SPEED_KMH: f64 = 30.0;

/// Occupancy fraction at which a center reports Full
pub const FULL_OCCUPANCY_RATIO: f64 = 0.9;

/// Occupancy ceiling for the curated fallback list, as a fraction of capacity
pub const FALLBACK_OCCUPANCY_MAX: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CenterStatus {
    Open,
    Full,
    Closed,
}

impl CenterStatus {
    /// `Full` iff occupancy reaches 90% of capacity
    pub fn from_occupancy(current_occupancy: u32, capacity: u32) -> Self {
        if current_occupancy as f64 >= capacity as f64 * FULL_OCCUPANCY_RATIO {
            CenterStatus::Full
        } else {
            CenterStatus::Open
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvacuationCenter {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    /// km from the query location
    pub distance: f64,
    /// minutes
    pub estimated_time: u32,
    pub capacity: u32,
    pub current_occupancy: u32,
    pub status: CenterStatus,
}

impl EvacuationCenter {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude).with_elevation(self.elevation)
    }

    pub fn is_safe(&self) -> bool {
        is_safe(self.elevation)
    }
}

/// A discovered institution with its resolved elevation
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyedSite {
    pub institution: Institution,
    pub elevation: f64,
}

pub fn is_safe(elevation: f64) -> bool {
    elevation > SAFE_ELEVATION_M
}

/// Discard predicate: too close to matter and not elevated enough
pub fn is_discarded(distance: f64, elevation: f64) -> bool {
    distance < MIN_UNSAFE_DISTANCE_KM && !is_safe(elevation)
}

/// Safe before unsafe, then ascending distance
pub fn compare_centers(a: &EvacuationCenter, b: &EvacuationCenter) -> Ordering {
    b.is_safe()
        .cmp(&a.is_safe())
        .then_with(|| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
}

/// Filter, annotate and order discovered sites; at most `max_centers` returned.
///
/// An empty result is a valid answer (nothing suitable nearby).
pub fn rank(
    origin: &Coordinate,
    sites: Vec<SurveyedSite>,
    max_centers: usize,
    rng: &mut TelemetryRng,
) -> Vec<EvacuationCenter> {
    let surveyed = sites.len();

    let mut centers: Vec<EvacuationCenter> = sites
        .into_iter()
        .filter_map(|site| {
            let coordinate = site.institution.coordinate;
            let distance = distance_km(origin, &coordinate);

            if is_discarded(distance, site.elevation) {
                debug!(
                    "Discarding {} ({:.2} km, {:.0} m): too close and not elevated",
                    site.institution.name, distance, site.elevation
                );
                return None;
            }

            let capacity = rng.capacity();
            let current_occupancy = rng.occupancy(capacity, SYNTHETIC_OCCUPANCY_MAX);

            Some(EvacuationCenter {
                id: site.institution.id,
                name: site.institution.name,
                address: site.institution.address,
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
                elevation: site.elevation,
                distance,
                estimated_time: (distance * MINUTES_PER_KM).round() as u32,
                capacity,
                current_occupancy,
                status: CenterStatus::from_occupancy(current_occupancy, capacity),
            })
        })
        .collect();

    centers.sort_by(compare_centers);
    centers.truncate(max_centers);

    debug!("Ranked {} of {} surveyed sites", centers.len(), surveyed);

    centers
}

struct CuratedShelter {
    id: &'static str,
    name: &'static str,
    address: &'static str,
    latitude: f64,
    longitude: f64,
    elevation: f64,
    capacity: u32,
}

/// Known-safe institutions used when discovery yields nothing
const CURATED_SHELTERS: [CuratedShelter; 3] = [
    CuratedShelter {
        id: "ec1",
        name: "Vellore Institute of Technology",
        address: "VIT Campus, Katpadi, Vellore, Tamil Nadu 632014",
        latitude: 12.970068697520778,
        longitude: 79.15598789173693,
        elevation: 220.0,
        capacity: 2000,
    },
    CuratedShelter {
        id: "ec2",
        name: "Vellore Municipality Office",
        address: "Municipality Office, Vellore, Tamil Nadu 632001",
        latitude: 12.91677812125299,
        longitude: 79.13245568067919,
        elevation: 180.0,
        capacity: 800,
    },
    CuratedShelter {
        id: "ec3",
        name: "Christian Medical College",
        address: "Ida Scudder Rd, Vellore, Tamil Nadu 632004",
        latitude: 12.924684798908551,
        longitude: 79.13524470951494,
        elevation: 190.0,
        capacity: 1500,
    },
];

/// Curated shelter list annotated against `origin`.
///
/// Distances are rounded to 2 decimals and travel time assumes 30 km/h.
pub fn fallback_centers(origin: &Coordinate, max_centers: usize, rng: &mut TelemetryRng) -> Vec<EvacuationCenter> {
    let mut centers: Vec<EvacuationCenter> = CURATED_SHELTERS
        .iter()
        .map(|shelter| {
            let coordinate = Coordinate::new(shelter.latitude, shelter.longitude);
            let distance = (distance_km(origin, &coordinate) * 100.0).round() / 100.0;
            let current_occupancy = rng.occupancy(shelter.capacity, FALLBACK_OCCUPANCY_MAX);

            EvacuationCenter {
                id: shelter.id.to_string(),
                name: shelter.name.to_string(),
                address: shelter.address.to_string(),
                latitude: shelter.latitude,
                longitude: shelter.longitude,
                elevation: shelter.elevation,
                distance,
                estimated_time: (distance / FALLBACK_SPEED_KMH * 60.0).round() as u32,
                capacity: shelter.capacity,
                current_occupancy,
                status: CenterStatus::from_occupancy(current_occupancy, shelter.capacity),
            }
        })
        .collect();

    centers.sort_by(compare_centers);
    centers.truncate(max_centers);
    centers
}
