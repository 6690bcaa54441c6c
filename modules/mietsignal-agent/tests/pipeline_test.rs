//! End-to-end pipeline runs against mocks: routing, failure isolation,
//! and the notification payload.

use std::sync::Arc;

use mietsignal_agent::engine::{build_pipeline, Pipeline, PipelineDeps};
use mietsignal_agent::testing::{
    leg, sample_page, MemoryStore, MockAssessor, MockExtractor, MockNarrator, MockNotifier,
    MockPlacesApi, MockTravelApi, SentPart, BAHNHOFSPLATZ,
};
use mietsignal_agent::traits::Narrative;
use mietsignal_common::types::{ExtractedListing, ListingKey, ScamAssessment, StageName};

fn sample_extraction() -> ExtractedListing {
    ExtractedListing {
        address: Some("Bahnhofsplatz 1, 28195 Bremen, Germany".to_string()),
        price_cold: Some(700.0),
        price_warm: Some(870.0),
        rooms: Some(2.0),
        description: Some("Helle Wohnung direkt am Bahnhof".to_string()),
        details: Some("55 sqm, balcony, available now".to_string()),
    }
}

fn sample_assessment() -> ScamAssessment {
    ScamAssessment {
        score: 0.9,
        flags: Vec::new(),
        reasoning: "Plausible price and complete details".to_string(),
    }
}

fn sample_narrative() -> Narrative {
    Narrative {
        description_en: Some("Bright flat right at the station".to_string()),
        neighbourhood: Some("Busy central district, everything in reach".to_string()),
        value_score: 0.7,
    }
}

struct Harness {
    pipeline: Pipeline,
    extractor: Arc<MockExtractor>,
    travel: Arc<MockTravelApi>,
    narrator: Arc<MockNarrator>,
    store: Arc<MemoryStore>,
    notifier: Arc<MockNotifier>,
}

fn harness(
    extractor: MockExtractor,
    assessor: MockAssessor,
    narrator: MockNarrator,
    travel: MockTravelApi,
    places: MockPlacesApi,
    store: MemoryStore,
    notifier: MockNotifier,
) -> Harness {
    let extractor = Arc::new(extractor);
    let travel = Arc::new(travel);
    let narrator = Arc::new(narrator);
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let pipeline = build_pipeline(PipelineDeps {
        extractor: extractor.clone(),
        assessor: Arc::new(assessor),
        narrator: narrator.clone(),
        travel: travel.clone(),
        places: Arc::new(places),
        store: store.clone(),
        notifier: notifier.clone(),
    });
    Harness {
        pipeline,
        extractor,
        travel,
        narrator,
        store,
        notifier,
    }
}

fn happy_harness() -> Harness {
    harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new()
            .on_geocode("Bahnhofsplatz 1, 28195 Bremen, Germany", BAHNHOFSPLATZ)
            .with_walking(vec![None, Some(leg(6.0, 0.4))])
            .with_matrix(vec![Some(leg(38.0, 16.0)), Some(leg(2.0, 0.3))]),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new(),
    )
}

#[tokio::test]
async fn happy_path_persists_everything_and_delivers_both_parts() {
    let h = happy_harness();
    let page = sample_page(Some("Helle 2-Zimmer-Wohnung, 700 EUR kalt..."));

    let record = h.pipeline.run_listing(&page).await;

    assert!(record.fatal.is_none());
    assert!(record.soft_errors.is_empty());

    let row = h.store.row(&ListingKey::new("kleinanzeigen", "k-1")).unwrap();
    assert_eq!(row.extracted, sample_extraction());
    assert_eq!(row.scam.unwrap().score, 0.9);
    let enrichment = row.enrichment.unwrap();
    assert_eq!(enrichment.value_score, Some(0.7));
    assert_eq!(
        enrichment.description_en.as_deref(),
        Some("Bright flat right at the station")
    );

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0], SentPart::Message(_)));
    assert!(matches!(sent[1], SentPart::Document { .. }));
    if let SentPart::Document { filename, content } = &sent[1] {
        assert_eq!(filename, "listing-k-1.txt");
        assert!(content.contains("Bahnhofsplatz 1"));
    }
}

#[tokio::test]
async fn empty_page_content_skips_the_llm_but_still_stores_and_notifies() {
    let h = happy_harness();
    let page = sample_page(None);

    let record = h.pipeline.run_listing(&page).await;

    assert!(record.fatal.is_none());
    assert_eq!(h.extractor.call_count(), 0);
    let row = h.store.row(&ListingKey::new("kleinanzeigen", "k-1")).unwrap();
    assert_eq!(row.extracted, ExtractedListing::default());
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn whitespace_only_content_counts_as_empty() {
    let h = happy_harness();
    let page = sample_page(Some("   \n\t  "));

    h.pipeline.run_listing(&page).await;

    assert_eq!(h.extractor.call_count(), 0);
}

#[tokio::test]
async fn extraction_failure_is_fatal_and_skips_everything_downstream() {
    let h = harness(
        MockExtractor::failing(),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new(),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new(),
    );
    let page = sample_page(Some("some ad text"));

    let record = h.pipeline.run_listing(&page).await;

    assert!(record.fatal.is_some());
    assert!(record.scam.is_none());
    assert!(record.enrichment.is_none());
    assert_eq!(h.store.row_count(), 0);
    assert!(h.notifier.sent().is_empty());
    assert!(h.narrator.seen_travel().is_empty());
}

#[tokio::test]
async fn failed_upsert_is_also_fatal() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new(),
        MockPlacesApi::new(),
        MemoryStore::new().fail_upsert(),
        MockNotifier::new(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    assert!(record.fatal.is_some());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn scam_assessment_timeout_still_enriches_and_notifies() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::failing(),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new()
            .on_geocode("Bahnhofsplatz 1, 28195 Bremen, Germany", BAHNHOFSPLATZ),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    assert!(record.fatal.is_none());
    assert!(record.scam.is_none());
    assert_eq!(record.soft_errors_for(StageName::ScamCheck).len(), 1);
    assert!(record.enrichment.is_some());
    assert_eq!(h.notifier.sent().len(), 2);
    if let SentPart::Document { content, .. } = &h.notifier.sent()[1] {
        assert!(content.contains("Score: n/a"));
    }
}

#[tokio::test]
async fn failed_scam_persist_keeps_the_assessment_on_the_record() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new(),
        MockPlacesApi::new(),
        MemoryStore::new().fail_scam(),
        MockNotifier::new(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    assert_eq!(record.scam.as_ref().map(|s| s.score), Some(0.9));
    assert_eq!(record.soft_errors_for(StageName::ScamCheck).len(), 1);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn narrative_runs_even_when_all_travel_lookups_fail() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new()
            .fail_geocode()
            .fail_walking()
            .fail_matrix()
            .fail_directions(),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    let seen = h.narrator.seen_travel();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].walk.iter().all(Option::is_none));
    assert!(seen[0].transit.iter().all(Option::is_none));

    let enrichment = record.enrichment.as_ref().unwrap();
    assert_eq!(enrichment.value_score, Some(0.7));
    assert!(enrichment.nearby_places.is_empty());
    assert!(record.soft_errors_for(StageName::Enrich).is_empty());
}

#[tokio::test]
async fn failed_narrative_is_soft_and_travel_metrics_survive() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::failing(),
        MockTravelApi::new().with_matrix(vec![Some(leg(38.0, 16.0)), None]),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    assert_eq!(record.soft_errors_for(StageName::Enrich).len(), 1);
    let enrichment = record.enrichment.unwrap();
    assert_eq!(enrichment.value_score, None);
    assert!(enrichment.travel.transit[0].is_some());
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn both_notification_parts_are_attempted_independently() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new(),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new().fail_message(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    assert!(record.fatal.is_none());
    assert_eq!(record.soft_errors_for(StageName::Notify).len(), 1);
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0], SentPart::Document { .. }));
}

#[tokio::test]
async fn route_matrix_dead_end_uses_directions_at_the_same_instant() {
    let h = harness(
        MockExtractor::returning(sample_extraction()),
        MockAssessor::returning(sample_assessment()),
        MockNarrator::returning(sample_narrative()),
        MockTravelApi::new()
            .on_geocode("Bahnhofsplatz 1, 28195 Bremen, Germany", BAHNHOFSPLATZ)
            .with_matrix(vec![None, None])
            .on_directions(
                "Constructor University, Campus Ring 1, 28759 Bremen, Germany",
                leg(42.0, 18.5),
            )
            .on_directions("Bremen Hauptbahnhof, Germany", leg(5.0, 0.8)),
        MockPlacesApi::new(),
        MemoryStore::new(),
        MockNotifier::new(),
    );

    let record = h.pipeline.run_listing(&sample_page(Some("text"))).await;

    let directions = h.travel.directions_calls();
    assert_eq!(directions.len(), 2);
    let tier1 = chrono::DateTime::parse_from_rfc3339(&h.travel.matrix_departures()[0])
        .unwrap()
        .timestamp();
    assert!(directions.iter().all(|(_, epoch)| *epoch == tier1));

    let travel = &record.enrichment.unwrap().travel;
    assert_eq!(travel.transit[0].map(|l| l.minutes), Some(42.0));
    assert_eq!(travel.transit[1].map(|l| l.km), Some(0.8));
}
