pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::MietsignalError;
pub use types::{
    Destination, Enrichment, ExtractedListing, ListingKey, ListingPage, NearbyPlace,
    ScamAssessment, SoftError, StageName, TravelLeg, TravelSummary,
};
