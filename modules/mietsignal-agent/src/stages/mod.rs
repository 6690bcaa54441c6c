//! The four pipeline stages. Each stage mutates the listing record,
//! persists its own slice of it, and reports whether the pipeline
//! advances. Only extraction may halt a listing.

mod enrich;
mod extract;
mod notify;
mod scam;

pub use enrich::EnrichStage;
pub use extract::ExtractStage;
pub use notify::NotifyStage;
pub use scam::ScamCheckStage;
