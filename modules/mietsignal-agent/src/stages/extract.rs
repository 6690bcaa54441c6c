use std::sync::Arc;

use tracing::{error, info};

use mietsignal_common::types::{ExtractedListing, ListingPage};

use crate::state::{ListingRecord, StageOutcome};
use crate::traits::{ListingExtractor, ListingStore};

/// Structured extraction plus the row upsert. The only stage whose
/// failure is fatal: without extracted fields every later stage would
/// be working on nothing.
pub struct ExtractStage {
    extractor: Arc<dyn ListingExtractor>,
    store: Arc<dyn ListingStore>,
}

impl ExtractStage {
    pub fn new(extractor: Arc<dyn ListingExtractor>, store: Arc<dyn ListingStore>) -> Self {
        Self { extractor, store }
    }

    pub async fn run(&self, page: &ListingPage, record: &mut ListingRecord) -> StageOutcome {
        let has_content = page
            .content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false);

        // A page with no scraped text still gets a row, so the listing
        // is not re-queued forever. No LLM call for it.
        let extracted = if has_content {
            match self.extractor.extract(page).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    error!(url = %page.url, error = %e, "Extraction failed");
                    record.fatal = Some(format!("extraction failed: {e}"));
                    return StageOutcome::Halted;
                }
            }
        } else {
            info!(url = %page.url, "No page content, storing empty extraction");
            ExtractedListing::default()
        };

        if let Err(e) = self
            .store
            .upsert_listing(&page.source, &page.url, &page.external_id, &extracted)
            .await
        {
            error!(url = %page.url, error = %e, "Storing extraction failed");
            record.fatal = Some(format!("storing extraction failed: {e}"));
            return StageOutcome::Halted;
        }

        record.extracted = Some(extracted);
        StageOutcome::Advanced
    }
}
