//! Pure Google Maps REST client.
//!
//! Covers the five endpoints the enrichment pipeline needs:
//! - Geocoding API: address -> coordinates
//! - Distance Matrix API: batched walking times (one round trip)
//! - Routes API computeRouteMatrix: batched transit times
//! - Directions API: single transit route (per-destination fallback)
//! - Places API (New) searchNearby + legacy nearbysearch
//!
//! Error policy: transport and HTTP-level failures surface as
//! [`MapsError`]; service-level "nothing found" conditions (zero
//! results, `ROUTE_NOT_FOUND`, non-OK element status, unrecognized
//! response shapes) decode to `None`/empty, never to an error.

pub mod error;
pub mod schedule;
pub mod types;

pub use error::{MapsError, Result};
pub use types::{Coordinates, Place, RouteLeg};

use std::time::Duration;

use tracing::debug;

use types::{
    parse_proto_duration, DirectionsResponse, DistanceMatrixResponse, GeocodeResponse,
    LegacyPlacesResponse, PlacesSearchResponse, RouteMatrixElement, StreamBody,
};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const ROUTE_MATRIX_URL: &str = "https://routes.googleapis.com/distanceMatrix/v2:computeRouteMatrix";
const PLACES_SEARCH_URL: &str = "https://places.googleapis.com/v1/places:searchNearby";
const LEGACY_PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Service-side radius cap for both Places APIs.
const MAX_RADIUS_M: u32 = 50_000;

/// Per-category result cap on the legacy endpoint.
const LEGACY_RESULTS_PER_CATEGORY: usize = 10;

/// Read-only lookups get a short timeout, multi-part POST submissions a
/// longer one. Nothing is retried.
const READ_TIMEOUT: Duration = Duration::from_secs(15);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MapsClient {
    http: reqwest::Client,
    api_key: String,
}

impl MapsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Resolve an address to its single best coordinate pair.
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        if address.trim().is_empty() {
            return Ok(None);
        }

        let response = self
            .http
            .get(GEOCODE_URL)
            .timeout(READ_TIMEOUT)
            .query(&[("address", address.trim()), ("key", &self.api_key)])
            .send()
            .await?;
        let data: GeocodeResponse = check_status(response).await?.json().await?;

        if data.status != "OK" {
            debug!(status = %data.status, "Geocoding returned no result");
            return Ok(None);
        }
        Ok(data.results.first().map(|r| r.geometry.location))
    }

    /// Batched walking times from one origin to each destination, in
    /// destination order, from a single round trip. Walking mode only.
    pub async fn walking_matrix(
        &self,
        origin: &str,
        destinations: &[&str],
    ) -> Result<Vec<Option<RouteLeg>>> {
        if origin.trim().is_empty() || destinations.is_empty() {
            return Ok(vec![None; destinations.len()]);
        }

        let joined = destinations
            .iter()
            .map(|d| d.trim())
            .collect::<Vec<_>>()
            .join("|");
        let response = self
            .http
            .get(DISTANCE_MATRIX_URL)
            .timeout(READ_TIMEOUT)
            .query(&[
                ("origins", origin.trim()),
                ("destinations", joined.as_str()),
                ("mode", "walking"),
                ("key", &self.api_key),
            ])
            .send()
            .await?;
        let data: DistanceMatrixResponse = check_status(response).await?.json().await?;

        if data.status != "OK" {
            debug!(status = %data.status, "Distance Matrix returned no result");
            return Ok(vec![None; destinations.len()]);
        }

        let mut out = vec![None; destinations.len()];
        if let Some(row) = data.rows.first() {
            for (i, el) in row.elements.iter().enumerate().take(destinations.len()) {
                if el.status != "OK" {
                    continue;
                }
                if let (Some(dur), Some(dist)) = (&el.duration, &el.distance) {
                    out[i] = Some(RouteLeg {
                        minutes: dur.value / 60.0,
                        km: dist.value / 1000.0,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Batched transit times via computeRouteMatrix: one request, one
    /// result slot per destination. An explicit `ROUTE_NOT_FOUND`
    /// condition or non-zero element status yields `None` in that slot.
    pub async fn transit_route_matrix(
        &self,
        origin: &str,
        destinations: &[&str],
        departure_rfc3339: &str,
    ) -> Result<Vec<Option<RouteLeg>>> {
        if origin.trim().is_empty() || destinations.is_empty() {
            return Ok(vec![None; destinations.len()]);
        }

        let body = serde_json::json!({
            "origins": [{"waypoint": {"address": origin.trim()}}],
            "destinations": destinations
                .iter()
                .map(|d| serde_json::json!({"waypoint": {"address": d.trim()}}))
                .collect::<Vec<_>>(),
            "travelMode": "TRANSIT",
            "departureTime": departure_rfc3339,
        });

        let response = self
            .http
            .post(ROUTE_MATRIX_URL)
            .timeout(SUBMIT_TIMEOUT)
            .header("X-Goog-Api-Key", &self.api_key)
            .header(
                "X-Goog-FieldMask",
                "originIndex,destinationIndex,status,condition,distanceMeters,duration",
            )
            .json(&body)
            .send()
            .await?;
        let raw = check_status(response).await?.text().await?;

        let mut out = vec![None; destinations.len()];
        for value in StreamBody::decode(&raw).into_elements() {
            let Ok(el) = serde_json::from_value::<RouteMatrixElement>(value) else {
                continue;
            };
            if el.destination_index >= destinations.len() {
                continue;
            }
            if let Some(code) = el.status.as_ref().and_then(|s| s.code) {
                if code != 0 {
                    continue;
                }
            }
            if el.condition.as_deref().is_some_and(|c| c.contains("ROUTE_NOT_FOUND")) {
                continue;
            }
            let seconds = el.duration.as_deref().map(parse_proto_duration).unwrap_or(0.0);
            let meters = el.distance_meters.unwrap_or(0.0);
            out[el.destination_index] = Some(RouteLeg {
                minutes: seconds / 60.0,
                km: meters / 1000.0,
            });
        }
        Ok(out)
    }

    /// One transit route via the Directions API. Used per destination
    /// when the route matrix produced nothing at all.
    pub async fn transit_directions(
        &self,
        origin: &str,
        destination: &str,
        departure_unix: i64,
    ) -> Result<Option<RouteLeg>> {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Ok(None);
        }

        let departure = departure_unix.to_string();
        let response = self
            .http
            .get(DIRECTIONS_URL)
            .timeout(READ_TIMEOUT)
            .query(&[
                ("origin", origin.trim()),
                ("destination", destination.trim()),
                ("mode", "transit"),
                ("departure_time", departure.as_str()),
                ("key", &self.api_key),
            ])
            .send()
            .await?;
        let data: DirectionsResponse = check_status(response).await?.json().await?;

        if data.status != "OK" {
            debug!(status = %data.status, "Directions returned no route");
            return Ok(None);
        }

        let leg = data.routes.first().and_then(|r| r.legs.first());
        Ok(leg.map(|l| RouteLeg {
            minutes: l.duration.as_ref().map_or(0.0, |d| d.value) / 60.0,
            km: l.distance.as_ref().map_or(0.0, |d| d.value) / 1000.0,
        }))
    }

    /// Places API (New) searchNearby. `included_types = None` means an
    /// unfiltered search across all categories.
    pub async fn places_nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
        included_types: Option<&[&str]>,
    ) -> Result<Vec<Place>> {
        let mut body = serde_json::json!({
            "maxResultCount": 20,
            "locationRestriction": {
                "circle": {
                    "center": {"latitude": center.lat, "longitude": center.lng},
                    "radius": f64::from(clamp_radius(radius_m)),
                }
            },
        });
        if let Some(types) = included_types {
            body["includedTypes"] = serde_json::json!(types);
        }

        let response = self
            .http
            .post(PLACES_SEARCH_URL)
            .timeout(SUBMIT_TIMEOUT)
            .header("X-Goog-Api-Key", &self.api_key)
            .header(
                "X-Goog-FieldMask",
                "places.displayName,places.types,places.formattedAddress",
            )
            .json(&body)
            .send()
            .await?;
        let raw = check_status(response).await?.text().await?;

        let places = match StreamBody::decode(&raw) {
            StreamBody::Single(value) => {
                serde_json::from_value::<PlacesSearchResponse>(value)
                    .unwrap_or_default()
                    .places
            }
            // Some deployments stream the places list directly.
            StreamBody::Array(items) | StreamBody::Lines(items) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            StreamBody::Unusable => Vec::new(),
        };

        Ok(places
            .into_iter()
            .filter_map(|p| {
                let name = p
                    .display_name
                    .and_then(|d| d.text)
                    .map(|t| t.trim().to_string())?;
                if name.is_empty() {
                    return None;
                }
                Some(Place {
                    name,
                    categories: p.types,
                    address: p.formatted_address.unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Legacy Places API nearbysearch, one category per call.
    pub async fn places_nearby_legacy(
        &self,
        center: Coordinates,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<Place>> {
        let location = format!("{},{}", center.lat, center.lng);
        let radius = clamp_radius(radius_m).to_string();
        let response = self
            .http
            .get(LEGACY_PLACES_URL)
            .timeout(READ_TIMEOUT)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", category),
                ("key", &self.api_key),
                ("language", "en"),
            ])
            .send()
            .await?;
        let data: LegacyPlacesResponse = check_status(response).await?.json().await?;

        if data.status != "OK" {
            debug!(status = %data.status, category, "Legacy nearbysearch returned no result");
            return Ok(Vec::new());
        }

        Ok(data
            .results
            .into_iter()
            .take(LEGACY_RESULTS_PER_CATEGORY)
            .filter_map(|r| {
                let name = r.name.map(|n| n.trim().to_string())?;
                if name.is_empty() {
                    return None;
                }
                Some(Place {
                    name,
                    categories: r.types,
                    address: r.vicinity.unwrap_or_default(),
                })
            })
            .collect())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MapsError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

fn clamp_radius(radius_m: u32) -> u32 {
    radius_m.min(MAX_RADIUS_M)
}
