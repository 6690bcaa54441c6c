//! Claude-backed collaborators: extraction, scam assessment, narrative
//! synthesis. Each wraps one structured-output call with a fixed schema.

use ai_client::Claude;
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use mietsignal_common::types::{ExtractedListing, ListingPage, ScamAssessment, TravelSummary};

use crate::prompts;
use crate::traits::{ListingExtractor, Narrative, NarrativeWriter, ScamAssessor};

const MODEL: &str = "claude-sonnet-4-5-20250929";

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// What the LLM returns for one listing page.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct ExtractionOutput {
    /// Full address if given (street, number, postal code, city).
    address: Option<String>,
    /// Monthly cold rent (Kaltmiete) in EUR.
    price_eur: Option<f64>,
    /// Monthly warm rent (Warmmiete) in EUR.
    price_warm_eur: Option<f64>,
    /// Number of rooms, possibly decimal (e.g. 2.5).
    rooms: Option<f64>,
    /// Main listing description text, cleaned.
    description: Option<String>,
    /// Short summary of important extra details. Empty if nothing.
    details: Option<String>,
}

pub struct ClaudeExtractor {
    claude: Claude,
}

impl ClaudeExtractor {
    pub fn new(anthropic_api_key: &str) -> Self {
        Self {
            claude: Claude::new(anthropic_api_key, MODEL),
        }
    }
}

#[async_trait]
impl ListingExtractor for ClaudeExtractor {
    async fn extract(&self, page: &ListingPage) -> Result<ExtractedListing> {
        let content = page.content.as_deref().unwrap_or("");
        let out: ExtractionOutput = self
            .claude
            .extract(
                prompts::EXTRACT_SYSTEM,
                prompts::extract_user(&page.source, &page.url, content),
            )
            .await?;

        Ok(listing_from(out))
    }
}

fn listing_from(out: ExtractionOutput) -> ExtractedListing {
    ExtractedListing {
        address: none_if_empty(out.address),
        price_cold: out.price_eur,
        price_warm: out.price_warm_eur,
        rooms: out.rooms,
        description: none_if_empty(out.description),
        details: none_if_empty(out.details),
    }
}

// ---------------------------------------------------------------------------
// Scam assessment
// ---------------------------------------------------------------------------

/// Scam check result (0 = likely scam, 1 = likely legit).
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct ScamOutput {
    /// 0.0 = likely scam, 1.0 = likely legitimate.
    score: f64,
    /// Short flag strings for issues found.
    #[serde(default)]
    flags: Vec<String>,
    /// Brief explanation of the assessment.
    #[serde(default)]
    reasoning: String,
}

pub struct ClaudeAssessor {
    claude: Claude,
}

impl ClaudeAssessor {
    pub fn new(anthropic_api_key: &str) -> Self {
        Self {
            claude: Claude::new(anthropic_api_key, MODEL),
        }
    }
}

#[async_trait]
impl ScamAssessor for ClaudeAssessor {
    async fn assess(&self, listing: &ExtractedListing) -> Result<ScamAssessment> {
        let out: ScamOutput = self
            .claude
            .extract(prompts::SCAM_SYSTEM, prompts::scam_user(listing))
            .await?;

        Ok(assessment_from(out))
    }
}

fn assessment_from(out: ScamOutput) -> ScamAssessment {
    ScamAssessment {
        score: out.score.clamp(0.0, 1.0),
        flags: out.flags,
        reasoning: out.reasoning,
    }
}

// ---------------------------------------------------------------------------
// Narrative synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct NarrativeOutput {
    /// Description translated to English. Empty string if none.
    #[serde(default)]
    description_en: String,
    /// Short neighbourhood summary in English.
    #[serde(default)]
    neighbourhood_vibe: String,
    /// Value for money, 0.0 to 1.0.
    value_score: f64,
}

pub struct ClaudeNarrator {
    claude: Claude,
}

impl ClaudeNarrator {
    pub fn new(anthropic_api_key: &str) -> Self {
        Self {
            claude: Claude::new(anthropic_api_key, MODEL),
        }
    }
}

#[async_trait]
impl NarrativeWriter for ClaudeNarrator {
    async fn write(&self, listing: &ExtractedListing, travel: &TravelSummary) -> Result<Narrative> {
        let out: NarrativeOutput = self
            .claude
            .extract(
                prompts::NARRATIVE_SYSTEM,
                prompts::narrative_user(listing, travel),
            )
            .await?;

        Ok(narrative_from(out))
    }
}

fn narrative_from(out: NarrativeOutput) -> Narrative {
    Narrative {
        description_en: none_if_empty(Some(out.description_en)),
        neighbourhood: none_if_empty(Some(out.neighbourhood_vibe)),
        value_score: out.value_score.clamp(0.0, 1.0),
    }
}

fn none_if_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_if_empty_drops_blank_strings() {
        assert_eq!(none_if_empty(Some("  ".to_string())), None);
        assert_eq!(none_if_empty(Some(String::new())), None);
        assert_eq!(
            none_if_empty(Some("text".to_string())),
            Some("text".to_string())
        );
        assert_eq!(none_if_empty(None), None);
    }

    #[test]
    fn scam_output_defaults_missing_flags() {
        let out: ScamOutput = serde_json::from_str(r#"{"score": 0.3}"#).unwrap();
        assert!(out.flags.is_empty());
        assert!(out.reasoning.is_empty());
    }

    #[test]
    fn out_of_range_scores_are_clamped_to_unit_interval() {
        let high = assessment_from(ScamOutput {
            score: 1.7,
            flags: vec!["price_below_market".to_string()],
            reasoning: "suspicious".to_string(),
        });
        assert_eq!(high.score, 1.0);
        assert_eq!(high.flags, vec!["price_below_market".to_string()]);

        let low = assessment_from(ScamOutput {
            score: -0.2,
            flags: Vec::new(),
            reasoning: String::new(),
        });
        assert_eq!(low.score, 0.0);

        let narrative = narrative_from(NarrativeOutput {
            description_en: "Nice flat".to_string(),
            neighbourhood_vibe: String::new(),
            value_score: 1.7,
        });
        assert_eq!(narrative.value_score, 1.0);
        assert_eq!(narrative.neighbourhood, None);

        let narrative = narrative_from(NarrativeOutput {
            description_en: String::new(),
            neighbourhood_vibe: "Quiet".to_string(),
            value_score: -0.2,
        });
        assert_eq!(narrative.value_score, 0.0);
    }

    #[test]
    fn extraction_output_maps_onto_listing_fields() {
        let out = ExtractionOutput {
            address: Some("  ".to_string()),
            price_eur: Some(650.0),
            price_warm_eur: None,
            rooms: Some(2.5),
            description: Some("Schöne Wohnung".to_string()),
            details: None,
        };
        let listing = listing_from(out);
        assert_eq!(listing.address, None);
        assert_eq!(listing.price_cold, Some(650.0));
        assert_eq!(listing.rooms, Some(2.5));
        assert_eq!(listing.description.as_deref(), Some("Schöne Wohnung"));
    }
}
