//! SQLite persistence.
//!
//! Single-writer embedded store. Every operation opens its own
//! connection, performs one atomic write, and closes — no transaction
//! ever spans more than one pipeline stage, so a crash mid-pipeline
//! leaves a valid partially-populated row.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use mietsignal_common::types::{
    Enrichment, ExtractedListing, ListingKey, ListingPage, NearbyPlace, ScamAssessment,
    TravelLeg, TravelSummary,
};
use mietsignal_common::MietsignalError;

use crate::traits::ListingStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    external_id TEXT NOT NULL,
    address TEXT,
    price_eur REAL,
    price_warm_eur REAL,
    rooms REAL,
    description TEXT,
    details TEXT,
    scam_score REAL,
    scam_flags TEXT,
    scam_reasoning TEXT,
    dist_university_walk_mins REAL,
    dist_university_walk_km REAL,
    dist_university_transit_mins REAL,
    dist_university_transit_km REAL,
    dist_hbf_walk_mins REAL,
    dist_hbf_walk_km REAL,
    dist_hbf_transit_mins REAL,
    dist_hbf_transit_km REAL,
    description_en TEXT,
    neighbourhood_vibe TEXT,
    nearby_places TEXT,
    value_score REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_listings_external
ON listings (source, external_id);

CREATE TABLE IF NOT EXISTS listing_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    external_id TEXT NOT NULL,
    content TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_listing_pages_external
ON listing_pages (source, external_id);
";

/// Columns added after the first schema version. Applied to existing
/// databases on init.
const LATER_COLUMNS: [(&str, &str); 2] = [
    ("price_warm_eur", "REAL"),
    ("value_score", "REAL"),
];

/// One row read back from the listings table, flattened for callers.
#[derive(Debug, Clone)]
pub struct StoredListing {
    pub url: String,
    pub extracted: ExtractedListing,
    pub scam: Option<ScamAssessment>,
    pub travel: TravelSummary,
    pub description_en: Option<String>,
    pub neighbourhood: Option<String>,
    pub value_score: Option<f64>,
    pub nearby_places: Vec<NearbyPlace>,
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the database file, tables, and any missing columns.
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.open()?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        for (name, decl) in LATER_COLUMNS {
            add_column_if_missing(&conn, "listings", name, decl)?;
        }
        debug!(path = %self.path.display(), "Database initialized");
        Ok(())
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(db_err)
    }

    /// Listing pages that have no extracted listing row yet, latest first.
    pub fn pending_pages(&self, limit: Option<u32>) -> Result<Vec<ListingPage>> {
        let conn = self.open()?;
        let mut sql = String::from(
            "SELECT p.source, p.url, p.external_id, p.content
             FROM listing_pages p
             LEFT JOIN listings l
               ON l.source = p.source AND l.external_id = p.external_id
             WHERE l.id IS NULL
             ORDER BY p.created_at DESC",
        );
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ListingPage {
                    source: row.get(0)?,
                    url: row.get(1)?,
                    external_id: row.get(2)?,
                    content: row.get(3)?,
                })
            })
            .map_err(db_err)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(db_err)?);
        }
        Ok(out)
    }

    /// Store one raw listing page (upsert by key).
    pub fn upsert_page(&self, page: &ListingPage) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT OR REPLACE INTO listing_pages (source, url, external_id, content)
             VALUES (?1, ?2, ?3, ?4)",
            params![page.source, page.url, page.external_id, page.content],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Read one listing row back, if present.
    pub fn get_listing(&self, key: &ListingKey) -> Result<Option<StoredListing>> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT url, address, price_eur, price_warm_eur, rooms, description, details,
                    scam_score, scam_flags, scam_reasoning,
                    dist_university_walk_mins, dist_university_walk_km,
                    dist_university_transit_mins, dist_university_transit_km,
                    dist_hbf_walk_mins, dist_hbf_walk_km,
                    dist_hbf_transit_mins, dist_hbf_transit_km,
                    description_en, neighbourhood_vibe, nearby_places, value_score
             FROM listings WHERE source = ?1 AND external_id = ?2",
            params![key.source, key.external_id],
            |row| {
                let scam_score: Option<f64> = row.get(7)?;
                let scam_flags: Option<String> = row.get(8)?;
                let scam_reasoning: Option<String> = row.get(9)?;
                let nearby_json: Option<String> = row.get(20)?;
                Ok(StoredListing {
                    url: row.get(0)?,
                    extracted: ExtractedListing {
                        address: row.get(1)?,
                        price_cold: row.get(2)?,
                        price_warm: row.get(3)?,
                        rooms: row.get(4)?,
                        description: row.get(5)?,
                        details: row.get(6)?,
                    },
                    scam: scam_score.map(|score| ScamAssessment {
                        score,
                        flags: scam_flags
                            .as_deref()
                            .and_then(|s| serde_json::from_str(s).ok())
                            .unwrap_or_default(),
                        reasoning: scam_reasoning.unwrap_or_default(),
                    }),
                    travel: TravelSummary {
                        walk: vec![
                            leg(row.get(10)?, row.get(11)?),
                            leg(row.get(14)?, row.get(15)?),
                        ],
                        transit: vec![
                            leg(row.get(12)?, row.get(13)?),
                            leg(row.get(16)?, row.get(17)?),
                        ],
                    },
                    description_en: row.get(18)?,
                    neighbourhood: row.get(19)?,
                    value_score: row.get(21)?,
                    nearby_places: nearby_json
                        .as_deref()
                        .and_then(|s| serde_json::from_str(s).ok())
                        .unwrap_or_default(),
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    /// Number of rows stored for one key. Always 0 or 1 given the
    /// unique index; exposed so tests can pin the upsert contract.
    pub fn listing_row_count(&self, key: &ListingKey) -> Result<i64> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT COUNT(*) FROM listings WHERE source = ?1 AND external_id = ?2",
            params![key.source, key.external_id],
            |row| row.get(0),
        )
        .map_err(db_err)
    }
}

#[async_trait]
impl ListingStore for SqliteStore {
    async fn upsert_listing(
        &self,
        source: &str,
        url: &str,
        external_id: &str,
        extracted: &ExtractedListing,
    ) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT OR REPLACE INTO listings
             (source, url, external_id, address, price_eur, price_warm_eur, rooms, description, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                source,
                url,
                external_id,
                extracted.address,
                extracted.price_cold,
                extracted.price_warm,
                extracted.rooms,
                extracted.description,
                extracted.details,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_scam(&self, key: &ListingKey, scam: &ScamAssessment) -> Result<()> {
        let flags_json = serde_json::to_string(&scam.flags)?;
        let conn = self.open()?;
        conn.execute(
            "UPDATE listings SET scam_score = ?1, scam_flags = ?2, scam_reasoning = ?3
             WHERE source = ?4 AND external_id = ?5",
            params![
                scam.score,
                flags_json,
                scam.reasoning,
                key.source,
                key.external_id
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_enrichment(&self, key: &ListingKey, enrichment: &Enrichment) -> Result<()> {
        let places_json = serde_json::to_string(&enrichment.nearby_places)?;
        let t = &enrichment.travel;
        let conn = self.open()?;
        conn.execute(
            "UPDATE listings SET
                dist_university_walk_mins = ?1, dist_university_walk_km = ?2,
                dist_university_transit_mins = ?3, dist_university_transit_km = ?4,
                dist_hbf_walk_mins = ?5, dist_hbf_walk_km = ?6,
                dist_hbf_transit_mins = ?7, dist_hbf_transit_km = ?8,
                description_en = ?9, neighbourhood_vibe = ?10,
                nearby_places = ?11, value_score = ?12
             WHERE source = ?13 AND external_id = ?14",
            params![
                t.walk.first().copied().flatten().map(|l| l.minutes),
                t.walk.first().copied().flatten().map(|l| l.km),
                t.transit.first().copied().flatten().map(|l| l.minutes),
                t.transit.first().copied().flatten().map(|l| l.km),
                t.walk.get(1).copied().flatten().map(|l| l.minutes),
                t.walk.get(1).copied().flatten().map(|l| l.km),
                t.transit.get(1).copied().flatten().map(|l| l.minutes),
                t.transit.get(1).copied().flatten().map(|l| l.km),
                enrichment.description_en,
                enrichment.neighbourhood,
                places_json,
                enrichment.value_score,
                key.source,
                key.external_id,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

fn leg(minutes: Option<f64>, km: Option<f64>) -> Option<TravelLeg> {
    match (minutes, km) {
        (Some(minutes), Some(km)) => Some(TravelLeg { minutes, km }),
        _ => None,
    }
}

fn add_column_if_missing(conn: &Connection, table: &str, name: &str, decl: &str) -> Result<()> {
    let present: Option<String> = conn
        .query_row(
            "SELECT name FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, name],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    if present.is_none() {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {name} {decl}"))
            .map_err(db_err)?;
    }
    Ok(())
}

fn db_err(e: rusqlite::Error) -> anyhow::Error {
    MietsignalError::Database(e.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mietsignal_common::types::ListingKey;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("listings.db"));
        store.init().unwrap();
        (dir, store)
    }

    fn sample_extraction() -> ExtractedListing {
        ExtractedListing {
            address: Some("Bahnhofsplatz 1, 28195 Bremen, Germany".to_string()),
            price_cold: Some(700.0),
            price_warm: Some(870.0),
            rooms: Some(2.0),
            description: Some("Zentrale Wohnung".to_string()),
            details: Some("55 sqm, balcony".to_string()),
        }
    }

    #[tokio::test]
    async fn upsert_twice_leaves_one_row_with_latest_values() {
        let (_dir, store) = temp_store();
        let key = ListingKey::new("kleinanzeigen", "k-123");

        store
            .upsert_listing("kleinanzeigen", "https://x/1", "k-123", &sample_extraction())
            .await
            .unwrap();

        let updated = ExtractedListing {
            price_cold: Some(750.0),
            ..sample_extraction()
        };
        store
            .upsert_listing("kleinanzeigen", "https://x/1", "k-123", &updated)
            .await
            .unwrap();

        assert_eq!(store.listing_row_count(&key).unwrap(), 1);
        let row = store.get_listing(&key).unwrap().unwrap();
        assert_eq!(row.extracted.price_cold, Some(750.0));
    }

    #[tokio::test]
    async fn scam_update_touches_only_assessment_columns() {
        let (_dir, store) = temp_store();
        let key = ListingKey::new("immoscout", "i-9");

        store
            .upsert_listing("immoscout", "https://x/9", "i-9", &sample_extraction())
            .await
            .unwrap();
        store
            .update_scam(
                &key,
                &ScamAssessment {
                    score: 0.85,
                    flags: vec!["price_plausible".to_string()],
                    reasoning: "Looks ordinary".to_string(),
                },
            )
            .await
            .unwrap();

        let row = store.get_listing(&key).unwrap().unwrap();
        assert_eq!(row.extracted, sample_extraction());
        let scam = row.scam.unwrap();
        assert_eq!(scam.score, 0.85);
        assert_eq!(scam.flags, vec!["price_plausible".to_string()]);
    }

    #[tokio::test]
    async fn enrichment_round_trips_travel_and_places() {
        let (_dir, store) = temp_store();
        let key = ListingKey::new("immoscout", "i-10");

        store
            .upsert_listing("immoscout", "https://x/10", "i-10", &sample_extraction())
            .await
            .unwrap();

        let mut travel = TravelSummary::empty();
        travel.walk[1] = Some(TravelLeg {
            minutes: 6.5,
            km: 0.5,
        });
        travel.transit[0] = Some(TravelLeg {
            minutes: 31.0,
            km: 14.2,
        });
        let enrichment = Enrichment {
            travel,
            description_en: Some("Central flat".to_string()),
            neighbourhood: Some("Busy station district".to_string()),
            value_score: Some(0.6),
            nearby_places: vec![NearbyPlace {
                name: "Knigge".to_string(),
                categories: vec!["bakery".to_string()],
                address: "Sögestraße 42".to_string(),
            }],
        };
        store.update_enrichment(&key, &enrichment).await.unwrap();

        let row = store.get_listing(&key).unwrap().unwrap();
        assert_eq!(
            row.travel.walk[1],
            Some(TravelLeg {
                minutes: 6.5,
                km: 0.5
            })
        );
        assert_eq!(row.travel.walk[0], None);
        assert_eq!(row.description_en.as_deref(), Some("Central flat"));
        assert_eq!(row.nearby_places.len(), 1);
        assert_eq!(row.nearby_places[0].name, "Knigge");
    }

    #[tokio::test]
    async fn pending_pages_excludes_already_extracted() {
        let (_dir, store) = temp_store();

        store
            .upsert_page(&ListingPage {
                source: "kleinanzeigen".to_string(),
                url: "https://x/1".to_string(),
                external_id: "k-1".to_string(),
                content: Some("text".to_string()),
            })
            .unwrap();
        store
            .upsert_page(&ListingPage {
                source: "kleinanzeigen".to_string(),
                url: "https://x/2".to_string(),
                external_id: "k-2".to_string(),
                content: None,
            })
            .unwrap();

        store
            .upsert_listing(
                "kleinanzeigen",
                "https://x/1",
                "k-1",
                &ExtractedListing::default(),
            )
            .await
            .unwrap();

        let pending = store.pending_pages(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].external_id, "k-2");
    }

    #[test]
    fn init_is_idempotent_and_migrates_old_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.db");

        // First-version schema without the later columns.
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                url TEXT NOT NULL,
                external_id TEXT NOT NULL,
                address TEXT,
                price_eur REAL,
                rooms REAL,
                description TEXT,
                details TEXT
            );",
        )
        .unwrap();
        drop(conn);

        let store = SqliteStore::new(&path);
        store.init().unwrap();
        store.init().unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('listings')
                 WHERE name IN ('price_warm_eur', 'value_score')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
