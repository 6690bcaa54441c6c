//! All LLM prompts (system and user), centralized so they can be tuned
//! in one place.

use mietsignal_common::types::{Destination, ExtractedListing, TravelSummary};

// ---------------------------------------------------------------------------
// Listing extraction
// ---------------------------------------------------------------------------

pub const EXTRACT_SYSTEM: &str = "\
You are an expert at extracting structured rental listing data from German real estate ad text.
The input is plain text scraped from a listing page (ImmobilienScout24, Kleinanzeigen, or similar German sites).

Rules:
- address: Full address if given (street, number, postal code, city). Otherwise null.
- price_eur: Monthly cold rent (Kaltmiete) in EUR as a number. null only if truly not stated.
- price_warm_eur: Monthly warm/total rent (Warmmiete, Gesamtmiete) in EUR as a number. null only if not stated.
- rooms: Number of rooms (Zimmer). Can be decimal e.g. 2.5. null if not found.
- description: The main listing description text, cleaned (no repeated headers or \"read more\"). Empty string if none.
- details: A short, human-readable summary of the most important extra details a renter would care about \
(area in sqm, heating, condition, availability date, deposit, pets, balcony, energy class, furnished). \
One or two clear sentences or a few bullet-style phrases; no JSON. Empty string if nothing useful.";

pub fn extract_user(source: &str, url: &str, content: &str) -> String {
    let content = if content.is_empty() {
        "(no content)"
    } else {
        content
    };
    format!(
        "Extract the rental listing data from this ad text.\n\n\
         Source: {source}\n\
         URL: {url}\n\n\
         --- Ad text ---\n\
         {content}\n\
         --- End ---"
    )
}

// ---------------------------------------------------------------------------
// Scam check
// ---------------------------------------------------------------------------

pub const SCAM_SYSTEM: &str = "\
You assess German rental listings for scam likelihood.
Score from 0.0 (almost certainly a scam) to 1.0 (almost certainly legitimate).

Watch for the usual patterns: price far below market for the area, landlord abroad or unreachable, \
payment or deposit requested before viewing, pressure to act fast, stock-photo interiors, \
vague or copied description text, contact pushed off-platform immediately.

Return short flag strings for each issue found (e.g. \"price_below_market\", \"landlord_abroad\") \
and a brief reasoning. A listing with missing fields is not automatically a scam.";

pub fn scam_user(listing: &ExtractedListing) -> String {
    format!(
        "Assess this extracted rental listing.\n\n\
         Address: {}\n\
         Cold rent (EUR): {}\n\
         Warm rent (EUR): {}\n\
         Rooms: {}\n\
         Details: {}\n\n\
         Description:\n{}",
        opt_str(listing.address.as_deref()),
        opt_num(listing.price_cold),
        opt_num(listing.price_warm),
        opt_num(listing.rooms),
        opt_str(listing.details.as_deref()),
        opt_str(listing.description.as_deref()),
    )
}

// ---------------------------------------------------------------------------
// Narrative synthesis
// ---------------------------------------------------------------------------

pub const NARRATIVE_SYSTEM: &str = "\
You enrich German rental listings for an English-speaking reader.

- description_en: Translate the listing description to clear, natural English. Empty string if there is no description.
- neighbourhood_vibe: Two or three sentences on what living at this address in Bremen is like, \
grounded in the address and the travel times provided. If the address is unknown, say so briefly.
- value_score: Value for money from 0.0 (terrible) to 1.0 (excellent), considering rent, rooms, \
details, and location. Travel times marked n/a were simply unavailable; do not penalize them.";

pub fn narrative_user(listing: &ExtractedListing, travel: &TravelSummary) -> String {
    let mut lines = vec![
        format!("Address: {}", opt_str(listing.address.as_deref())),
        format!("Cold rent (EUR): {}", opt_num(listing.price_cold)),
        format!("Warm rent (EUR): {}", opt_num(listing.price_warm)),
        format!("Rooms: {}", opt_num(listing.rooms)),
        format!("Details: {}", opt_str(listing.details.as_deref())),
        String::new(),
        "Travel times:".to_string(),
    ];
    for dest in Destination::ALL {
        lines.push(format!(
            "- {}: walk {}, transit {}",
            dest.label(),
            opt_num(travel.walk_to(dest).map(|l| l.minutes.round())),
            opt_num(travel.transit_to(dest).map(|l| l.minutes.round())),
        ));
    }
    lines.push(String::new());
    lines.push("Description:".to_string());
    lines.push(opt_str(listing.description.as_deref()).to_string());
    lines.join("\n")
}

fn opt_str(v: Option<&str>) -> &str {
    match v {
        Some(s) if !s.is_empty() => s,
        _ => "n/a",
    }
}

fn opt_num(v: Option<f64>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mietsignal_common::types::{TravelLeg, TravelSummary};

    #[test]
    fn missing_metrics_are_marked_not_available() {
        let listing = ExtractedListing {
            address: None,
            price_cold: Some(600.0),
            ..Default::default()
        };
        let mut travel = TravelSummary::empty();
        travel.transit[0] = Some(TravelLeg {
            minutes: 24.6,
            km: 11.0,
        });

        let prompt = narrative_user(&listing, &travel);
        assert!(prompt.contains("Address: n/a"));
        assert!(prompt.contains("Constructor University: walk n/a, transit 25"));
        assert!(prompt.contains("Bremen Hbf: walk n/a, transit n/a"));
    }
}
