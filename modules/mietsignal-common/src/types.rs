use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage key for one listing: globally unique across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingKey {
    pub source: String,
    pub external_id: String,
}

impl ListingKey {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.external_id)
    }
}

/// One scraped listing page as handed to the pipeline. `content` is the
/// raw page text; `None` or empty means the scraper got nothing usable,
/// which is still a valid input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    pub source: String,
    pub url: String,
    pub external_id: String,
    pub content: Option<String>,
}

impl ListingPage {
    pub fn key(&self) -> ListingKey {
        ListingKey::new(self.source.clone(), self.external_id.clone())
    }
}

/// Structured fields pulled out of a listing page. Every field is
/// independently nullable; an all-null extraction is a valid result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedListing {
    pub address: Option<String>,
    /// Monthly cold rent (Kaltmiete) in EUR.
    pub price_cold: Option<f64>,
    /// Monthly warm rent (Warmmiete) in EUR.
    pub price_warm: Option<f64>,
    pub rooms: Option<f64>,
    pub description: Option<String>,
    /// Short summary of extra details (area, heating, deposit, pets, ...).
    pub details: Option<String>,
}

/// Scam check result. Score orientation: 0.0 = scam-like, 1.0 = legit-like.
/// The pipeline transports the score verbatim and never thresholds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamAssessment {
    pub score: f64,
    pub flags: Vec<String>,
    pub reasoning: String,
}

/// One travel measurement: duration in minutes, distance in kilometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelLeg {
    pub minutes: f64,
    pub km: f64,
}

/// The fixed destination set every listing is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    University,
    MainStation,
}

impl Destination {
    pub const ALL: [Destination; 2] = [Destination::University, Destination::MainStation];

    pub fn address(&self) -> &'static str {
        match self {
            Destination::University => {
                "Constructor University, Campus Ring 1, 28759 Bremen, Germany"
            }
            Destination::MainStation => "Bremen Hauptbahnhof, Germany",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Destination::University => "Constructor University",
            Destination::MainStation => "Bremen Hbf",
        }
    }

    fn index(&self) -> usize {
        match self {
            Destination::University => 0,
            Destination::MainStation => 1,
        }
    }
}

/// Walking and transit legs to each destination, parallel to
/// [`Destination::ALL`]. `None` means the metric could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelSummary {
    pub walk: Vec<Option<TravelLeg>>,
    pub transit: Vec<Option<TravelLeg>>,
}

impl TravelSummary {
    pub fn empty() -> Self {
        Self {
            walk: vec![None; Destination::ALL.len()],
            transit: vec![None; Destination::ALL.len()],
        }
    }

    pub fn walk_to(&self, dest: Destination) -> Option<TravelLeg> {
        self.walk.get(dest.index()).copied().flatten()
    }

    pub fn transit_to(&self, dest: Destination) -> Option<TravelLeg> {
        self.transit.get(dest.index()).copied().flatten()
    }
}

/// One nearby point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,
    pub categories: Vec<String>,
    pub address: String,
}

/// Everything the enrichment stage produced. Each sub-field is
/// independently nullable; an all-empty enrichment is still persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enrichment {
    pub travel: TravelSummary,
    pub description_en: Option<String>,
    pub neighbourhood: Option<String>,
    pub value_score: Option<f64>,
    pub nearby_places: Vec<NearbyPlace>,
}

/// Pipeline stage names, used to namespace soft errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    Extract,
    ScamCheck,
    Enrich,
    Notify,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Extract => "extract",
            StageName::ScamCheck => "scam_check",
            StageName::Enrich => "enrich",
            StageName::Notify => "notify",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure scoped to one stage. Never halts later stages.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftError {
    pub stage: StageName,
    pub message: String,
}

impl fmt::Display for SoftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}
