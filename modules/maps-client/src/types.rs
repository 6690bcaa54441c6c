use serde::Deserialize;

/// A resolved coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Travel duration in minutes and distance in kilometers for one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub minutes: f64,
    pub km: f64,
}

/// One nearby point of interest as reported by either Places API.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub categories: Vec<String>,
    pub address: String,
}

// =============================================================================
// Geocoding API
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: Coordinates,
}

// =============================================================================
// Distance Matrix API (walking)
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatrixElement {
    pub status: String,
    pub duration: Option<ValueField>,
    pub distance: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValueField {
    pub value: f64,
}

// =============================================================================
// Directions API (transit, one route per call)
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsRoute {
    #[serde(default)]
    pub legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsLeg {
    pub duration: Option<ValueField>,
    pub distance: Option<ValueField>,
}

// =============================================================================
// Routes API computeRouteMatrix (transit)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RouteMatrixElement {
    #[serde(default)]
    pub destination_index: usize,
    pub status: Option<RpcStatus>,
    pub condition: Option<String>,
    pub distance_meters: Option<f64>,
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcStatus {
    pub code: Option<i64>,
}

/// Parse a protobuf duration string like `"123s"` or `"90.5s"` to seconds.
pub(crate) fn parse_proto_duration(s: &str) -> f64 {
    s.trim()
        .strip_suffix('s')
        .and_then(|n| n.parse::<f64>().ok())
        .unwrap_or(0.0)
}

// =============================================================================
// Places API (New) searchNearby
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlacesSearchResponse {
    #[serde(default)]
    pub places: Vec<PlaceWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaceWire {
    pub display_name: Option<DisplayName>,
    #[serde(default)]
    pub types: Vec<String>,
    pub formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DisplayName {
    pub text: Option<String>,
}

// =============================================================================
// Legacy Places API nearbysearch
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyPlacesResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<LegacyPlace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyPlace {
    pub name: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub vicinity: Option<String>,
}

// =============================================================================
// POST body decoder
// =============================================================================

/// Everything a Routes/Places POST endpoint has been observed to return:
/// one JSON object, a JSON array, newline-delimited JSON objects, or a
/// bare error string. Unknown shapes decode to `Unusable`, never to an
/// error that could escape into stage logic.
#[derive(Debug)]
pub(crate) enum StreamBody {
    Single(serde_json::Value),
    Array(Vec<serde_json::Value>),
    Lines(Vec<serde_json::Value>),
    Unusable,
}

impl StreamBody {
    pub fn decode(raw: &str) -> Self {
        // Whole-body parse first: covers single objects (pretty-printed
        // or not) and proper JSON arrays.
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
            return match value {
                serde_json::Value::Array(items) => StreamBody::Array(items),
                serde_json::Value::Object(_) => StreamBody::Single(value),
                _ => StreamBody::Unusable,
            };
        }

        // NDJSON stream: one object per line.
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect();
        if !lines.is_empty() {
            return StreamBody::Lines(lines);
        }

        StreamBody::Unusable
    }

    /// Flatten to a list of element objects regardless of shape.
    pub fn into_elements(self) -> Vec<serde_json::Value> {
        match self {
            StreamBody::Single(value) => vec![value],
            StreamBody::Array(items) => items,
            StreamBody::Lines(items) => items,
            StreamBody::Unusable => Vec::new(),
        }
    }
}
