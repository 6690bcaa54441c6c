use std::sync::Arc;

use tracing::warn;

use mietsignal_common::types::StageName;
use telegram_client::format::{build_details_document, build_message, ListingDigest};

use crate::state::{ListingRecord, StageOutcome};
use crate::traits::Notifier;

/// Two-part Telegram delivery: compact message first, full details as
/// an attached text document. Both are attempted even if the first
/// fails; each failure is its own soft error.
pub struct NotifyStage {
    notifier: Arc<dyn Notifier>,
}

impl NotifyStage {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn run(&self, record: &mut ListingRecord) -> StageOutcome {
        let extracted = record.extracted.clone().unwrap_or_default();
        let digest = ListingDigest {
            url: &record.url,
            extracted: &extracted,
            scam: record.scam.as_ref(),
            enrichment: record.enrichment.as_ref(),
        };

        let message = build_message(&digest);
        let document = build_details_document(&digest);

        if let Err(e) = self.notifier.send_message(&message).await {
            warn!(url = %record.url, error = %e, "Sending notification message failed");
            record.record_soft_error(StageName::Notify, format!("message failed: {e}"));
        }

        let filename = format!("listing-{}.txt", record.external_id);
        if let Err(e) = self.notifier.send_document(&filename, document).await {
            warn!(url = %record.url, error = %e, "Sending details document failed");
            record.record_soft_error(StageName::Notify, format!("document failed: {e}"));
        }

        StageOutcome::Advanced
    }
}
