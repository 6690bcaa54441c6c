use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use mietsignal_common::types::{Enrichment, StageName};

use crate::places::{PlaceFinder, NEARBY_RADIUS_M};
use crate::resolver::EnrichmentResolver;
use crate::state::{ListingRecord, StageOutcome};
use crate::traits::{ListingStore, NarrativeWriter, PlacesApi, TravelApi};

/// Geo and narrative enrichment. Internally tiered (resolver and place
/// finder fold their own failures to "no data"); the narrative call
/// always runs, even over an entirely empty travel summary.
pub struct EnrichStage {
    travel: Arc<dyn TravelApi>,
    places: Arc<dyn PlacesApi>,
    narrator: Arc<dyn NarrativeWriter>,
    store: Arc<dyn ListingStore>,
}

impl EnrichStage {
    pub fn new(
        travel: Arc<dyn TravelApi>,
        places: Arc<dyn PlacesApi>,
        narrator: Arc<dyn NarrativeWriter>,
        store: Arc<dyn ListingStore>,
    ) -> Self {
        Self {
            travel,
            places,
            narrator,
            store,
        }
    }

    pub async fn run(&self, record: &mut ListingRecord) -> StageOutcome {
        let listing = record.extracted.clone().unwrap_or_default();

        let resolver = EnrichmentResolver::new(self.travel.as_ref());
        let (coords, travel) = resolver.resolve(listing.address.as_deref(), Utc::now()).await;

        // Place search needs a coordinate; without one there is nothing
        // to search around.
        let nearby_places = match coords {
            Some(center) => {
                PlaceFinder::new(self.places.as_ref())
                    .find(center, NEARBY_RADIUS_M)
                    .await
            }
            None => Vec::new(),
        };

        let narrative = match self.narrator.write(&listing, &travel).await {
            Ok(narrative) => Some(narrative),
            Err(e) => {
                warn!(url = %record.url, error = %e, "Narrative synthesis failed");
                record.record_soft_error(StageName::Enrich, format!("narrative failed: {e}"));
                None
            }
        };

        let enrichment = Enrichment {
            travel,
            description_en: narrative.as_ref().and_then(|n| n.description_en.clone()),
            neighbourhood: narrative.as_ref().and_then(|n| n.neighbourhood.clone()),
            value_score: narrative.as_ref().map(|n| n.value_score),
            nearby_places,
        };

        if let Err(e) = self
            .store
            .update_enrichment(&record.key(), &enrichment)
            .await
        {
            warn!(url = %record.url, error = %e, "Storing enrichment failed");
            record.record_soft_error(StageName::Enrich, format!("storing enrichment failed: {e}"));
        }

        record.enrichment = Some(enrichment);
        StageOutcome::Advanced
    }
}
