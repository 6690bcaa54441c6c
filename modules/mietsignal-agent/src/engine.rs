//! The pipeline engine: wires the four stages together and drives one
//! listing through the state machine.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use mietsignal_common::types::ListingPage;

use crate::stages::{EnrichStage, ExtractStage, NotifyStage, ScamCheckStage};
use crate::state::{next_state, ListingRecord, PipelineState, StageOutcome};
use crate::traits::{
    ListingExtractor, ListingStore, NarrativeWriter, Notifier, PlacesApi, ScamAssessor, TravelApi,
};

/// Everything the pipeline talks to, behind trait objects so tests can
/// swap any of it out.
#[derive(Clone)]
pub struct PipelineDeps {
    pub extractor: Arc<dyn ListingExtractor>,
    pub assessor: Arc<dyn ScamAssessor>,
    pub narrator: Arc<dyn NarrativeWriter>,
    pub travel: Arc<dyn TravelApi>,
    pub places: Arc<dyn PlacesApi>,
    pub store: Arc<dyn ListingStore>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Pipeline {
    extract: ExtractStage,
    scam_check: ScamCheckStage,
    enrich: EnrichStage,
    notify: NotifyStage,
}

pub fn build_pipeline(deps: PipelineDeps) -> Pipeline {
    Pipeline {
        extract: ExtractStage::new(deps.extractor, deps.store.clone()),
        scam_check: ScamCheckStage::new(deps.assessor, deps.store.clone()),
        enrich: EnrichStage::new(deps.travel, deps.places, deps.narrator, deps.store),
        notify: NotifyStage::new(deps.notifier),
    }
}

impl Pipeline {
    /// Run one listing page through all stages. Never returns an error:
    /// every failure ends up on the record, fatal or soft.
    pub async fn run_listing(&self, page: &ListingPage) -> ListingRecord {
        let mut record = ListingRecord::new(&page.source, &page.url, &page.external_id);
        let mut state = next_state(PipelineState::Start, StageOutcome::Advanced);

        while state != PipelineState::End {
            let outcome = match state {
                PipelineState::Extract => self.extract.run(page, &mut record).await,
                PipelineState::ScamCheck => self.scam_check.run(&mut record).await,
                PipelineState::Enrich => self.enrich.run(&mut record).await,
                PipelineState::Notify => self.notify.run(&mut record).await,
                PipelineState::Start | PipelineState::End => break,
            };
            state = next_state(state, outcome);
        }

        info!(
            url = %page.url,
            fatal = record.fatal.is_some(),
            soft_errors = record.soft_errors.len(),
            "Listing pipeline finished"
        );
        record
    }
}

/// Batch counters, printed once at the end of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub processed: usize,
    pub notified: usize,
    pub halted: usize,
    pub soft_errors: usize,
}

impl RunStats {
    pub fn observe(&mut self, record: &ListingRecord) {
        self.processed += 1;
        if record.fatal.is_some() {
            self.halted += 1;
        } else {
            self.notified += 1;
        }
        self.soft_errors += record.soft_errors.len();
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} notified, {} halted, {} soft errors",
            self.processed, self.notified, self.halted, self.soft_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_halted_and_soft_errors() {
        let mut stats = RunStats::default();

        let ok = ListingRecord::new("kleinanzeigen", "https://x/1", "k-1");
        let mut halted = ListingRecord::new("kleinanzeigen", "https://x/2", "k-2");
        halted.fatal = Some("extraction failed".to_string());
        let mut bumpy = ListingRecord::new("kleinanzeigen", "https://x/3", "k-3");
        bumpy.record_soft_error(mietsignal_common::types::StageName::Enrich, "quota");

        stats.observe(&ok);
        stats.observe(&halted);
        stats.observe(&bumpy);

        assert_eq!(stats.processed, 3);
        assert_eq!(stats.notified, 2);
        assert_eq!(stats.halted, 1);
        assert_eq!(stats.soft_errors, 1);
        assert_eq!(stats.to_string(), "3 processed, 2 notified, 1 halted, 1 soft errors");
    }
}
