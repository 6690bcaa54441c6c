use mietsignal_common::types::{Destination, Enrichment, ExtractedListing, ScamAssessment};

/// Everything the two notification parts are rendered from. Missing
/// fields render as "n/a" or an em-free placeholder, never disappear.
pub struct ListingDigest<'a> {
    pub url: &'a str,
    pub extracted: &'a ExtractedListing,
    pub scam: Option<&'a ScamAssessment>,
    pub enrichment: Option<&'a Enrichment>,
}

/// Short highlight for the chat: headline facts plus the link.
pub fn build_message(digest: &ListingDigest<'_>) -> String {
    let ex = digest.extracted;
    let address = ex.address.as_deref().unwrap_or("(no address)");

    let mut parts = vec![
        format!("\u{1F3E0} <b>{}</b>", escape_html(address)),
        String::new(),
        match ex.price_cold {
            Some(p) => format!("\u{1F4B0} Cold: {p:.0} \u{20AC}"),
            None => "\u{1F4B0} Cold: n/a".to_string(),
        },
        match ex.price_warm {
            Some(p) => format!("   Warm: {p:.0} \u{20AC}"),
            None => "   Warm: n/a".to_string(),
        },
        match ex.rooms {
            Some(r) => format!("\u{1F6CF} Rooms: {r}"),
            None => "\u{1F6CF} Rooms: n/a".to_string(),
        },
        String::new(),
    ];

    for dest in Destination::ALL {
        let (walk, transit) = match digest.enrichment {
            Some(e) => (e.travel.walk_to(dest), e.travel.transit_to(dest)),
            None => (None, None),
        };
        parts.push(format!(
            "\u{1F4CD} {}: walk {} \u{00B7} transit {}",
            dest.label(),
            mins(walk.map(|l| l.minutes)),
            mins(transit.map(|l| l.minutes)),
        ));
    }

    if let Some(value) = digest.enrichment.and_then(|e| e.value_score) {
        parts.push(String::new());
        parts.push(format!("\u{2B50} Value score: {value:.1}/1.0"));
    }
    if !digest.url.is_empty() {
        parts.push(String::new());
        parts.push(digest.url.to_string());
    }

    parts.join("\n").trim().to_string()
}

/// Full-detail plain-text companion document: descriptions, travel
/// metrics, scam assessment, nearby places.
pub fn build_details_document(digest: &ListingDigest<'_>) -> String {
    let ex = digest.extracted;
    let mut lines = vec![
        "LISTING DETAILS".to_string(),
        "===============".to_string(),
        String::new(),
        format!("Address: {}", ex.address.as_deref().unwrap_or("n/a")),
        format!(
            "Cold rent (EUR/month): {}",
            ex.price_cold.map_or("n/a".to_string(), |p| format!("{p:.0}"))
        ),
        format!(
            "Warm rent (EUR/month): {}",
            ex.price_warm.map_or("n/a".to_string(), |p| format!("{p:.0}"))
        ),
        format!(
            "Rooms: {}",
            ex.rooms.map_or("n/a".to_string(), |r| r.to_string())
        ),
        String::new(),
        "Travel times".to_string(),
        "------------".to_string(),
    ];

    for dest in Destination::ALL {
        let (walk, transit) = match digest.enrichment {
            Some(e) => (e.travel.walk_to(dest), e.travel.transit_to(dest)),
            None => (None, None),
        };
        lines.push(format!(
            "To {}: walk {}, transit {}",
            dest.label(),
            mins(walk.map(|l| l.minutes)),
            mins(transit.map(|l| l.minutes)),
        ));
    }

    lines.push(String::new());
    lines.push("Details (summary)".to_string());
    lines.push("-----------------".to_string());
    lines.push(ex.details.clone().unwrap_or_else(|| "(none)".to_string()));

    lines.push(String::new());
    lines.push("Description (English)".to_string());
    lines.push("---------------------".to_string());
    let description_en = digest
        .enrichment
        .and_then(|e| e.description_en.clone())
        .or_else(|| ex.description.clone());
    lines.push(description_en.unwrap_or_else(|| "(none)".to_string()));

    lines.push(String::new());
    lines.push("Neighbourhood".to_string());
    lines.push("-------------".to_string());
    lines.push(
        digest
            .enrichment
            .and_then(|e| e.neighbourhood.clone())
            .unwrap_or_else(|| "(none)".to_string()),
    );

    if let Some(e) = digest.enrichment {
        if !e.nearby_places.is_empty() {
            lines.push(String::new());
            lines.push("Nearby places".to_string());
            lines.push("-------------".to_string());
            for place in &e.nearby_places {
                if place.address.is_empty() {
                    lines.push(format!("- {}", place.name));
                } else {
                    lines.push(format!("- {} ({})", place.name, place.address));
                }
            }
        }
    }

    lines.push(String::new());
    lines.push("Scam assessment".to_string());
    lines.push("---------------".to_string());
    match digest.scam {
        Some(scam) => {
            lines.push(format!("Score: {:.2}", scam.score));
            lines.push(format!("Flags: {:?}", scam.flags));
            lines.push(format!("Reasoning: {}", scam.reasoning));
        }
        None => {
            lines.push("Score: n/a".to_string());
            lines.push("Flags: []".to_string());
            lines.push("Reasoning: n/a".to_string());
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Value score: {}",
        digest
            .enrichment
            .and_then(|e| e.value_score)
            .map_or("n/a".to_string(), |v| format!("{v:.2}/1.0"))
    ));
    lines.push(String::new());
    lines.push(format!("Link: {}", digest.url));

    lines.join("\n")
}

fn mins(val: Option<f64>) -> String {
    match val {
        Some(v) => format!("{} min", v.round() as i64),
        None => "n/a".to_string(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mietsignal_common::types::{TravelLeg, TravelSummary};

    fn extracted() -> ExtractedListing {
        ExtractedListing {
            address: Some("Bahnhofsplatz 1, 28195 Bremen".to_string()),
            price_cold: Some(750.0),
            price_warm: Some(920.0),
            rooms: Some(2.5),
            description: Some("Schöne Wohnung im Zentrum".to_string()),
            details: Some("60 sqm, deposit 2 months".to_string()),
        }
    }

    #[test]
    fn message_escapes_html_and_keeps_link() {
        let ex = ExtractedListing {
            address: Some("Haus <Eck> & Co".to_string()),
            ..extracted()
        };
        let digest = ListingDigest {
            url: "https://example.org/listing/1",
            extracted: &ex,
            scam: None,
            enrichment: None,
        };
        let msg = build_message(&digest);
        assert!(msg.contains("Haus &lt;Eck&gt; &amp; Co"));
        assert!(msg.ends_with("https://example.org/listing/1"));
    }

    #[test]
    fn missing_metrics_render_as_na_not_omitted() {
        let ex = extracted();
        let digest = ListingDigest {
            url: "https://example.org/listing/1",
            extracted: &ex,
            scam: None,
            enrichment: None,
        };
        let msg = build_message(&digest);
        assert!(msg.contains("Constructor University: walk n/a \u{00B7} transit n/a"));
        let doc = build_details_document(&digest);
        assert!(doc.contains("Score: n/a"));
    }

    #[test]
    fn document_prefers_translated_description() {
        let ex = extracted();
        let mut travel = TravelSummary::empty();
        travel.walk[1] = Some(TravelLeg {
            minutes: 7.2,
            km: 0.6,
        });
        let enrichment = Enrichment {
            travel,
            description_en: Some("Nice flat in the center".to_string()),
            neighbourhood: Some("Lively station quarter".to_string()),
            value_score: Some(0.72),
            nearby_places: vec![],
        };
        let digest = ListingDigest {
            url: "https://example.org/listing/1",
            extracted: &ex,
            scam: None,
            enrichment: Some(&enrichment),
        };
        let doc = build_details_document(&digest);
        assert!(doc.contains("Nice flat in the center"));
        assert!(!doc.contains("Schöne Wohnung"));
        assert!(doc.contains("To Bremen Hbf: walk 7 min"));
        assert!(doc.contains("Value score: 0.72/1.0"));
    }
}
