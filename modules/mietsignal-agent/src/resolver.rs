//! Tiered travel-metric resolution for one listing address.
//!
//! Order matters: geocoding first (the coordinate feeds the place
//! search), then one batched walking call, then transit. Transit is
//! two-tiered: a single route-matrix request for all destinations, and
//! only when that yields nothing for every destination, one Directions
//! call per destination at the same canonical departure instant. Every
//! upstream failure folds to "no data" right here; nothing inside this
//! module raises past it.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use maps_client::schedule;
use maps_client::{Coordinates, RouteLeg};
use mietsignal_common::types::{Destination, TravelLeg, TravelSummary};

use crate::traits::TravelApi;

/// Coarse city-level fallback when the listing has no address.
pub const DEFAULT_ORIGIN: &str = "Bremen, Germany";

pub struct EnrichmentResolver<'a> {
    travel: &'a dyn TravelApi,
}

impl<'a> EnrichmentResolver<'a> {
    pub fn new(travel: &'a dyn TravelApi) -> Self {
        Self { travel }
    }

    /// Resolve origin coordinates and travel metrics for one listing.
    /// `now` anchors the canonical departure time (next Tuesday 08:00
    /// UTC); the same instant feeds both transit tiers.
    pub async fn resolve(
        &self,
        address: Option<&str>,
        now: DateTime<Utc>,
    ) -> (Option<Coordinates>, TravelSummary) {
        let origin = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_ORIGIN);
        let destinations: Vec<&str> = Destination::ALL.iter().map(|d| d.address()).collect();

        // 1) Geocode. Ambiguity, quota, and network failures all fold
        //    to "no coordinate".
        let coords = match self.travel.geocode(origin).await {
            Ok(c) => c,
            Err(e) => {
                warn!(origin, error = %e, "Geocoding failed");
                None
            }
        };

        // 2) Walking metrics, one batched call.
        let walk = match self.travel.walking_matrix(origin, &destinations).await {
            Ok(legs) => legs,
            Err(e) => {
                warn!(origin, error = %e, "Walking matrix failed");
                vec![None; destinations.len()]
            }
        };

        // 3) Transit tier 1: batched route matrix.
        let departure = schedule::departure_rfc3339(now);
        let mut transit = match self
            .travel
            .transit_route_matrix(origin, &destinations, &departure)
            .await
        {
            Ok(legs) => legs,
            Err(e) => {
                warn!(origin, error = %e, "Transit route matrix failed");
                vec![None; destinations.len()]
            }
        };

        // 4) Transit tier 2, only when tier 1 produced nothing at all.
        //    A partial tier-1 result stands as-is.
        if transit.iter().all(Option::is_none) {
            debug!(origin, "Route matrix empty, falling back to per-destination directions");
            let departure_unix = schedule::departure_unix(now);
            for (i, dest) in destinations.iter().enumerate() {
                transit[i] = match self
                    .travel
                    .transit_directions(origin, dest, departure_unix)
                    .await
                {
                    Ok(leg) => leg,
                    Err(e) => {
                        warn!(origin, dest, error = %e, "Transit directions failed");
                        None
                    }
                };
            }
        }

        let summary = TravelSummary {
            walk: walk.into_iter().map(|l| l.map(to_travel_leg)).collect(),
            transit: transit.into_iter().map(|l| l.map(to_travel_leg)).collect(),
        };
        (coords, summary)
    }
}

fn to_travel_leg(leg: RouteLeg) -> TravelLeg {
    TravelLeg {
        minutes: leg.minutes,
        km: leg.km,
    }
}
