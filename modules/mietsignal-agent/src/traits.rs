// Trait abstractions for the pipeline's collaborators.
//
// Every external service sits behind one narrow trait: the LLM calls
// (extract / assess / narrate), the travel and places lookups, the
// embedded store, and the notification channel. Real implementations
// live next to the traits; the mocks in `testing` make the whole
// pipeline runnable without network, API keys, or a database file.

use anyhow::Result;
use async_trait::async_trait;

use maps_client::{Coordinates, MapsClient, Place, RouteLeg};
use mietsignal_common::types::{
    Enrichment, ExtractedListing, ListingKey, ListingPage, ScamAssessment, TravelSummary,
};
use telegram_client::TelegramClient;

// ---------------------------------------------------------------------------
// LLM collaborators
// ---------------------------------------------------------------------------

/// Structured extraction of listing fields from raw page text.
#[async_trait]
pub trait ListingExtractor: Send + Sync {
    async fn extract(&self, page: &ListingPage) -> Result<ExtractedListing>;
}

/// Scam assessment of an extracted listing.
#[async_trait]
pub trait ScamAssessor: Send + Sync {
    async fn assess(&self, listing: &ExtractedListing) -> Result<ScamAssessment>;
}

/// What the narrative collaborator produces: translation, neighbourhood
/// summary, value-for-money score.
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub description_en: Option<String>,
    pub neighbourhood: Option<String>,
    pub value_score: f64,
}

/// Narrative synthesis over the listing plus whatever travel metrics
/// were resolved. Missing metrics are passed through as "n/a", never
/// used to skip the call.
#[async_trait]
pub trait NarrativeWriter: Send + Sync {
    async fn write(&self, listing: &ExtractedListing, travel: &TravelSummary) -> Result<Narrative>;
}

// ---------------------------------------------------------------------------
// Travel / places lookups
// ---------------------------------------------------------------------------

/// Geocoding plus the three travel-time calls the resolver tiers over.
#[async_trait]
pub trait TravelApi: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>>;

    /// Batched walking metrics, one round trip, parallel to `destinations`.
    async fn walking_matrix(
        &self,
        origin: &str,
        destinations: &[&str],
    ) -> Result<Vec<Option<RouteLeg>>>;

    /// Batched transit metrics (tier 1), parallel to `destinations`.
    async fn transit_route_matrix(
        &self,
        origin: &str,
        destinations: &[&str],
        departure_rfc3339: &str,
    ) -> Result<Vec<Option<RouteLeg>>>;

    /// Single transit route (tier 2), one call per destination.
    async fn transit_directions(
        &self,
        origin: &str,
        destination: &str,
        departure_unix: i64,
    ) -> Result<Option<RouteLeg>>;
}

/// The two nearby-place search generations the finder tiers over.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    async fn search_nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
        included_types: Option<&[&str]>,
    ) -> Result<Vec<Place>>;

    async fn search_nearby_legacy(
        &self,
        center: Coordinates,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<Place>>;
}

// ---------------------------------------------------------------------------
// Persistence / delivery
// ---------------------------------------------------------------------------

/// Upsert-by-key persistence. Each method is one atomic write; no
/// transaction spans more than one stage.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert or fully replace the extraction column set for this key.
    async fn upsert_listing(
        &self,
        source: &str,
        url: &str,
        external_id: &str,
        extracted: &ExtractedListing,
    ) -> Result<()>;

    /// Update exactly the three assessment columns for this key.
    async fn update_scam(&self, key: &ListingKey, scam: &ScamAssessment) -> Result<()>;

    /// Update the travel/narrative columns for this key.
    async fn update_enrichment(&self, key: &ListingKey, enrichment: &Enrichment) -> Result<()>;
}

/// Two-part delivery to one logical recipient, message before document.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
    async fn send_document(&self, filename: &str, content: String) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Real-client implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl TravelApi for MapsClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        Ok(MapsClient::geocode(self, address).await?)
    }

    async fn walking_matrix(
        &self,
        origin: &str,
        destinations: &[&str],
    ) -> Result<Vec<Option<RouteLeg>>> {
        Ok(MapsClient::walking_matrix(self, origin, destinations).await?)
    }

    async fn transit_route_matrix(
        &self,
        origin: &str,
        destinations: &[&str],
        departure_rfc3339: &str,
    ) -> Result<Vec<Option<RouteLeg>>> {
        Ok(MapsClient::transit_route_matrix(self, origin, destinations, departure_rfc3339).await?)
    }

    async fn transit_directions(
        &self,
        origin: &str,
        destination: &str,
        departure_unix: i64,
    ) -> Result<Option<RouteLeg>> {
        Ok(MapsClient::transit_directions(self, origin, destination, departure_unix).await?)
    }
}

#[async_trait]
impl PlacesApi for MapsClient {
    async fn search_nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
        included_types: Option<&[&str]>,
    ) -> Result<Vec<Place>> {
        Ok(MapsClient::places_nearby(self, center, radius_m, included_types).await?)
    }

    async fn search_nearby_legacy(
        &self,
        center: Coordinates,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<Place>> {
        Ok(MapsClient::places_nearby_legacy(self, center, radius_m, category).await?)
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_message(&self, text: &str) -> Result<()> {
        Ok(TelegramClient::send_message(self, text).await?)
    }

    async fn send_document(&self, filename: &str, content: String) -> Result<()> {
        Ok(TelegramClient::send_document(self, filename, content).await?)
    }
}
