//! Tiered nearby-place resolution around a resolved coordinate.
//!
//! Three tiers, later ones only when everything before came back empty:
//! 1. Places API (New), unfiltered, for maximum coverage.
//! 2. Places API (New) again with an explicit category allow-list.
//! 3. Legacy nearbysearch, one request per category with a pacing
//!    delay between requests.
//!
//! One seen-set spans all tiers, so the final list never contains two
//! entries with the same name.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use maps_client::{Coordinates, Place};
use mietsignal_common::types::NearbyPlace;

use crate::traits::PlacesApi;

/// ~15 min walk.
pub const NEARBY_RADIUS_M: u32 = 1200;

/// Allow-list for the category-filtered retry on the new API.
const CATEGORY_ALLOW_LIST: [&str; 5] = [
    "restaurant",
    "cafe",
    "park",
    "supermarket",
    "grocery_store",
];

/// Category list for the legacy endpoint, which uses its own naming.
const LEGACY_CATEGORIES: [&str; 5] = [
    "restaurant",
    "cafe",
    "park",
    "supermarket",
    "grocery_or_supermarket",
];

/// Pause between legacy requests to respect rate limits.
const LEGACY_PACING: Duration = Duration::from_millis(150);

pub struct PlaceFinder<'a> {
    places: &'a dyn PlacesApi,
}

impl<'a> PlaceFinder<'a> {
    pub fn new(places: &'a dyn PlacesApi) -> Self {
        Self { places }
    }

    pub async fn find(&self, center: Coordinates, radius_m: u32) -> Vec<NearbyPlace> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut results: Vec<NearbyPlace> = Vec::new();

        // Tier 1: unfiltered search.
        match self.places.search_nearby(center, radius_m, None).await {
            Ok(found) => collect_deduped(found, &mut seen, &mut results),
            Err(e) => warn!(error = %e, "Unfiltered nearby search failed"),
        }

        // Tier 2: retry once with the category allow-list.
        if results.is_empty() {
            debug!("Unfiltered search empty, retrying with category allow-list");
            match self
                .places
                .search_nearby(center, radius_m, Some(&CATEGORY_ALLOW_LIST))
                .await
            {
                Ok(found) => collect_deduped(found, &mut seen, &mut results),
                Err(e) => warn!(error = %e, "Filtered nearby search failed"),
            }
        }

        // Tier 3: legacy endpoint, one request per category.
        if results.is_empty() {
            debug!("New Places API yielded nothing, falling back to legacy nearbysearch");
            for category in LEGACY_CATEGORIES {
                match self
                    .places
                    .search_nearby_legacy(center, radius_m, category)
                    .await
                {
                    Ok(found) => collect_deduped(found, &mut seen, &mut results),
                    Err(e) => warn!(category, error = %e, "Legacy nearby search failed"),
                }
                tokio::time::sleep(LEGACY_PACING).await;
            }
        }

        results
    }
}

fn collect_deduped(found: Vec<Place>, seen: &mut HashSet<String>, out: &mut Vec<NearbyPlace>) {
    for place in found {
        if place.name.is_empty() || !seen.insert(place.name.clone()) {
            continue;
        }
        out.push(NearbyPlace {
            name: place.name,
            categories: place.categories,
            address: place.address,
        });
    }
}
