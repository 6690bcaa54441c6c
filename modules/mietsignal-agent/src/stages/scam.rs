use std::sync::Arc;

use tracing::warn;

use mietsignal_common::types::StageName;

use crate::state::{ListingRecord, StageOutcome};
use crate::traits::{ListingStore, ScamAssessor};

/// Scam assessment. Failures here are soft: a listing without a score
/// still gets enriched and delivered, the notification just omits the
/// assessment.
pub struct ScamCheckStage {
    assessor: Arc<dyn ScamAssessor>,
    store: Arc<dyn ListingStore>,
}

impl ScamCheckStage {
    pub fn new(assessor: Arc<dyn ScamAssessor>, store: Arc<dyn ListingStore>) -> Self {
        Self { assessor, store }
    }

    pub async fn run(&self, record: &mut ListingRecord) -> StageOutcome {
        let listing = match &record.extracted {
            Some(listing) => listing.clone(),
            None => {
                record.record_soft_error(StageName::ScamCheck, "no extracted listing");
                return StageOutcome::Advanced;
            }
        };

        let scam = match self.assessor.assess(&listing).await {
            Ok(scam) => scam,
            Err(e) => {
                warn!(url = %record.url, error = %e, "Scam assessment failed");
                record.record_soft_error(StageName::ScamCheck, format!("assessment failed: {e}"));
                return StageOutcome::Advanced;
            }
        };

        // The in-memory assessment survives a failed persist; the
        // notification still carries it.
        if let Err(e) = self.store.update_scam(&record.key(), &scam).await {
            warn!(url = %record.url, error = %e, "Storing scam assessment failed");
            record.record_soft_error(StageName::ScamCheck, format!("storing assessment failed: {e}"));
        }

        record.scam = Some(scam);
        StageOutcome::Advanced
    }
}
