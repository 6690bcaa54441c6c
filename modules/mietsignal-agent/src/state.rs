//! Per-listing working context and the pipeline state machine.

use mietsignal_common::types::{
    Enrichment, ExtractedListing, ListingKey, ScamAssessment, SoftError, StageName,
};

/// The mutable per-listing context threaded through all stages.
///
/// Identity is immutable; each stage only adds its own fields. A record
/// with a fatal error never acquires assessment or enrichment data and
/// never reaches the notify stage.
#[derive(Debug, Clone)]
pub struct ListingRecord {
    pub source: String,
    pub url: String,
    pub external_id: String,

    pub extracted: Option<ExtractedListing>,
    pub scam: Option<ScamAssessment>,
    pub enrichment: Option<Enrichment>,

    pub fatal: Option<String>,
    pub soft_errors: Vec<SoftError>,
}

impl ListingRecord {
    pub fn new(
        source: impl Into<String>,
        url: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
            external_id: external_id.into(),
            extracted: None,
            scam: None,
            enrichment: None,
            fatal: None,
            soft_errors: Vec::new(),
        }
    }

    pub fn key(&self) -> ListingKey {
        ListingKey::new(self.source.clone(), self.external_id.clone())
    }

    pub fn record_soft_error(&mut self, stage: StageName, message: impl Into<String>) {
        self.soft_errors.push(SoftError {
            stage,
            message: message.into(),
        });
    }

    pub fn soft_errors_for(&self, stage: StageName) -> Vec<&SoftError> {
        self.soft_errors.iter().filter(|e| e.stage == stage).collect()
    }
}

/// Pipeline states. One listing moves strictly forward through these;
/// there is no retry-and-resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Extract,
    ScamCheck,
    Enrich,
    Notify,
    End,
}

/// What a stage reports back to the engine. Only Extract may halt;
/// every other stage advances regardless of its own soft failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Advanced,
    Halted,
}

/// The exhaustive transition function. Unhandled combinations do not
/// exist: every (state, outcome) pair maps to exactly one next state.
pub fn next_state(state: PipelineState, outcome: StageOutcome) -> PipelineState {
    match (state, outcome) {
        (PipelineState::Start, _) => PipelineState::Extract,
        (PipelineState::Extract, StageOutcome::Advanced) => PipelineState::ScamCheck,
        (PipelineState::Extract, StageOutcome::Halted) => PipelineState::End,
        // Soft failures in later stages never stop the pipeline.
        (PipelineState::ScamCheck, _) => PipelineState::Enrich,
        (PipelineState::Enrich, _) => PipelineState::Notify,
        (PipelineState::Notify, _) => PipelineState::End,
        (PipelineState::End, _) => PipelineState::End,
    }
}
