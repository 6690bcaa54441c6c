// Test mocks for the pipeline.
//
// One mock per trait boundary:
// - MockExtractor / MockAssessor / MockNarrator — fixed LLM results
// - MockTravelApi — per-method results plus call recording, so tests
//   can pin which tier ran and with which departure time
// - MockPlacesApi — per-tier results plus call counters
// - MemoryStore — in-memory ListingStore with per-method fail toggles
// - MockNotifier — records every sent part
//
// Builder pattern throughout; recordings sit behind Mutex so mocks can
// be shared through Arc.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use maps_client::{Coordinates, Place, RouteLeg};
use mietsignal_common::types::{
    Enrichment, ExtractedListing, ListingKey, ListingPage, ScamAssessment, TravelSummary,
};

use crate::traits::{
    ListingExtractor, ListingStore, Narrative, NarrativeWriter, Notifier, PlacesApi, ScamAssessor,
    TravelApi,
};

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Bremen Hauptbahnhof forecourt.
pub const BAHNHOFSPLATZ: Coordinates = Coordinates {
    lat: 53.0830,
    lng: 8.8130,
};

pub fn leg(minutes: f64, km: f64) -> RouteLeg {
    RouteLeg { minutes, km }
}

pub fn sample_page(content: Option<&str>) -> ListingPage {
    ListingPage {
        source: "kleinanzeigen".to_string(),
        url: "https://example.test/listing/1".to_string(),
        external_id: "k-1".to_string(),
        content: content.map(String::from),
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Returns one fixed extraction for every page, or fails.
pub struct MockExtractor {
    result: ExtractedListing,
    fail: bool,
    calls: Mutex<usize>,
}

impl MockExtractor {
    pub fn returning(result: ExtractedListing) -> Self {
        Self {
            result,
            fail: false,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: ExtractedListing::default(),
            fail: true,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ListingExtractor for MockExtractor {
    async fn extract(&self, _page: &ListingPage) -> Result<ExtractedListing> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            bail!("extractor offline");
        }
        Ok(self.result.clone())
    }
}

// ---------------------------------------------------------------------------
// MockAssessor
// ---------------------------------------------------------------------------

pub struct MockAssessor {
    result: ScamAssessment,
    fail: bool,
}

impl MockAssessor {
    pub fn returning(result: ScamAssessment) -> Self {
        Self {
            result,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            result: ScamAssessment {
                score: 0.0,
                flags: Vec::new(),
                reasoning: String::new(),
            },
            fail: true,
        }
    }
}

#[async_trait]
impl ScamAssessor for MockAssessor {
    async fn assess(&self, _listing: &ExtractedListing) -> Result<ScamAssessment> {
        if self.fail {
            bail!("assessment timed out");
        }
        Ok(self.result.clone())
    }
}

// ---------------------------------------------------------------------------
// MockNarrator
// ---------------------------------------------------------------------------

/// Records the travel summary it was handed, so tests can assert the
/// narrative call runs even when every metric is missing.
pub struct MockNarrator {
    result: Narrative,
    fail: bool,
    seen_travel: Mutex<Vec<TravelSummary>>,
}

impl MockNarrator {
    pub fn returning(result: Narrative) -> Self {
        Self {
            result,
            fail: false,
            seen_travel: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Narrative {
                description_en: None,
                neighbourhood: None,
                value_score: 0.0,
            },
            fail: true,
            seen_travel: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_travel(&self) -> Vec<TravelSummary> {
        self.seen_travel.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeWriter for MockNarrator {
    async fn write(&self, _listing: &ExtractedListing, travel: &TravelSummary) -> Result<Narrative> {
        self.seen_travel.lock().unwrap().push(travel.clone());
        if self.fail {
            bail!("narrative model overloaded");
        }
        Ok(self.result.clone())
    }
}

// ---------------------------------------------------------------------------
// MockTravelApi
// ---------------------------------------------------------------------------

/// Per-method canned results. Departure parameters are recorded so
/// tier tests can check both tiers saw the same canonical instant.
pub struct MockTravelApi {
    geocode: HashMap<String, Coordinates>,
    walking: Vec<Option<RouteLeg>>,
    matrix: Vec<Option<RouteLeg>>,
    directions: HashMap<String, RouteLeg>,
    fail_geocode: bool,
    fail_walking: bool,
    fail_matrix: bool,
    fail_directions: bool,
    matrix_departures: Mutex<Vec<String>>,
    directions_calls: Mutex<Vec<(String, i64)>>,
}

impl MockTravelApi {
    pub fn new() -> Self {
        Self {
            geocode: HashMap::new(),
            walking: vec![None, None],
            matrix: vec![None, None],
            directions: HashMap::new(),
            fail_geocode: false,
            fail_walking: false,
            fail_matrix: false,
            fail_directions: false,
            matrix_departures: Mutex::new(Vec::new()),
            directions_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_geocode(mut self, address: &str, coords: Coordinates) -> Self {
        self.geocode.insert(address.to_string(), coords);
        self
    }

    pub fn with_walking(mut self, legs: Vec<Option<RouteLeg>>) -> Self {
        self.walking = legs;
        self
    }

    pub fn with_matrix(mut self, legs: Vec<Option<RouteLeg>>) -> Self {
        self.matrix = legs;
        self
    }

    pub fn on_directions(mut self, destination: &str, leg: RouteLeg) -> Self {
        self.directions.insert(destination.to_string(), leg);
        self
    }

    pub fn fail_geocode(mut self) -> Self {
        self.fail_geocode = true;
        self
    }

    pub fn fail_walking(mut self) -> Self {
        self.fail_walking = true;
        self
    }

    pub fn fail_matrix(mut self) -> Self {
        self.fail_matrix = true;
        self
    }

    pub fn fail_directions(mut self) -> Self {
        self.fail_directions = true;
        self
    }

    /// RFC 3339 departure strings seen by the route-matrix call.
    pub fn matrix_departures(&self) -> Vec<String> {
        self.matrix_departures.lock().unwrap().clone()
    }

    /// (destination, epoch seconds) pairs seen by the directions call.
    pub fn directions_calls(&self) -> Vec<(String, i64)> {
        self.directions_calls.lock().unwrap().clone()
    }
}

impl Default for MockTravelApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TravelApi for MockTravelApi {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        if self.fail_geocode {
            bail!("geocode quota exceeded");
        }
        Ok(self.geocode.get(address).copied())
    }

    async fn walking_matrix(
        &self,
        _origin: &str,
        destinations: &[&str],
    ) -> Result<Vec<Option<RouteLeg>>> {
        if self.fail_walking {
            bail!("distance matrix unavailable");
        }
        let mut legs = self.walking.clone();
        legs.resize(destinations.len(), None);
        Ok(legs)
    }

    async fn transit_route_matrix(
        &self,
        _origin: &str,
        destinations: &[&str],
        departure_rfc3339: &str,
    ) -> Result<Vec<Option<RouteLeg>>> {
        self.matrix_departures
            .lock()
            .unwrap()
            .push(departure_rfc3339.to_string());
        if self.fail_matrix {
            bail!("route matrix unavailable");
        }
        let mut legs = self.matrix.clone();
        legs.resize(destinations.len(), None);
        Ok(legs)
    }

    async fn transit_directions(
        &self,
        _origin: &str,
        destination: &str,
        departure_unix: i64,
    ) -> Result<Option<RouteLeg>> {
        self.directions_calls
            .lock()
            .unwrap()
            .push((destination.to_string(), departure_unix));
        if self.fail_directions {
            bail!("directions unavailable");
        }
        Ok(self.directions.get(destination).copied())
    }
}

// ---------------------------------------------------------------------------
// MockPlacesApi
// ---------------------------------------------------------------------------

/// Canned results per tier. `included_types: None` hits the unfiltered
/// result set, `Some(..)` the filtered one.
pub struct MockPlacesApi {
    unfiltered: Vec<Place>,
    filtered: Vec<Place>,
    legacy: HashMap<String, Vec<Place>>,
    fail_new_api: bool,
    unfiltered_calls: Mutex<usize>,
    filtered_calls: Mutex<usize>,
    legacy_calls: Mutex<Vec<String>>,
}

impl MockPlacesApi {
    pub fn new() -> Self {
        Self {
            unfiltered: Vec::new(),
            filtered: Vec::new(),
            legacy: HashMap::new(),
            fail_new_api: false,
            unfiltered_calls: Mutex::new(0),
            filtered_calls: Mutex::new(0),
            legacy_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_unfiltered(mut self, places: Vec<Place>) -> Self {
        self.unfiltered = places;
        self
    }

    pub fn with_filtered(mut self, places: Vec<Place>) -> Self {
        self.filtered = places;
        self
    }

    pub fn on_legacy(mut self, category: &str, places: Vec<Place>) -> Self {
        self.legacy.insert(category.to_string(), places);
        self
    }

    pub fn fail_new_api(mut self) -> Self {
        self.fail_new_api = true;
        self
    }

    pub fn unfiltered_calls(&self) -> usize {
        *self.unfiltered_calls.lock().unwrap()
    }

    pub fn filtered_calls(&self) -> usize {
        *self.filtered_calls.lock().unwrap()
    }

    pub fn legacy_calls(&self) -> Vec<String> {
        self.legacy_calls.lock().unwrap().clone()
    }
}

impl Default for MockPlacesApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlacesApi for MockPlacesApi {
    async fn search_nearby(
        &self,
        _center: Coordinates,
        _radius_m: u32,
        included_types: Option<&[&str]>,
    ) -> Result<Vec<Place>> {
        let result = match included_types {
            None => {
                *self.unfiltered_calls.lock().unwrap() += 1;
                &self.unfiltered
            }
            Some(_) => {
                *self.filtered_calls.lock().unwrap() += 1;
                &self.filtered
            }
        };
        if self.fail_new_api {
            bail!("places api permission denied");
        }
        Ok(result.clone())
    }

    async fn search_nearby_legacy(
        &self,
        _center: Coordinates,
        _radius_m: u32,
        category: &str,
    ) -> Result<Vec<Place>> {
        self.legacy_calls.lock().unwrap().push(category.to_string());
        Ok(self.legacy.get(category).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryRow {
    pub url: String,
    pub extracted: ExtractedListing,
    pub scam: Option<ScamAssessment>,
    pub enrichment: Option<Enrichment>,
}

/// In-memory ListingStore. Each write method can be toggled to fail.
pub struct MemoryStore {
    rows: Mutex<HashMap<ListingKey, MemoryRow>>,
    fail_upsert: bool,
    fail_scam: bool,
    fail_enrichment: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            fail_upsert: false,
            fail_scam: false,
            fail_enrichment: false,
        }
    }

    pub fn fail_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    pub fn fail_scam(mut self) -> Self {
        self.fail_scam = true;
        self
    }

    pub fn fail_enrichment(mut self) -> Self {
        self.fail_enrichment = true;
        self
    }

    pub fn row(&self, key: &ListingKey) -> Option<MemoryRow> {
        self.rows.lock().unwrap().get(key).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn upsert_listing(
        &self,
        source: &str,
        url: &str,
        external_id: &str,
        extracted: &ExtractedListing,
    ) -> Result<()> {
        if self.fail_upsert {
            bail!("database locked");
        }
        let key = ListingKey::new(source, external_id);
        self.rows.lock().unwrap().insert(
            key,
            MemoryRow {
                url: url.to_string(),
                extracted: extracted.clone(),
                scam: None,
                enrichment: None,
            },
        );
        Ok(())
    }

    async fn update_scam(&self, key: &ListingKey, scam: &ScamAssessment) -> Result<()> {
        if self.fail_scam {
            bail!("database locked");
        }
        if let Some(row) = self.rows.lock().unwrap().get_mut(key) {
            row.scam = Some(scam.clone());
        }
        Ok(())
    }

    async fn update_enrichment(&self, key: &ListingKey, enrichment: &Enrichment) -> Result<()> {
        if self.fail_enrichment {
            bail!("database locked");
        }
        if let Some(row) = self.rows.lock().unwrap().get_mut(key) {
            row.enrichment = Some(enrichment.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockNotifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SentPart {
    Message(String),
    Document { filename: String, content: String },
}

/// Records every delivery attempt in order.
pub struct MockNotifier {
    sent: Mutex<Vec<SentPart>>,
    fail_message: bool,
    fail_document: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_message: false,
            fail_document: false,
        }
    }

    pub fn fail_message(mut self) -> Self {
        self.fail_message = true;
        self
    }

    pub fn fail_document(mut self) -> Self {
        self.fail_document = true;
        self
    }

    pub fn sent(&self) -> Vec<SentPart> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        if self.fail_message {
            bail!("telegram 429");
        }
        self.sent
            .lock()
            .unwrap()
            .push(SentPart::Message(text.to_string()));
        Ok(())
    }

    async fn send_document(&self, filename: &str, content: String) -> Result<()> {
        if self.fail_document {
            bail!("telegram 429");
        }
        self.sent.lock().unwrap().push(SentPart::Document {
            filename: filename.to_string(),
            content,
        });
        Ok(())
    }
}
