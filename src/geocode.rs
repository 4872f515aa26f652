//! # Geocoding Module
//!
//! Resolves a free-text place name to coordinates through the Nominatim
//! search API. The geocoder itself is an external collaborator; this module
//! only shapes the request, types the response and makes ambiguity visible
//! instead of silently trusting the top match.

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const MAX_CANDIDATES: usize = 5;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoder returned HTTP status {0}")]
    Status(u16),

    #[error("Geocoder returned unparseable coordinates '{lat}, {lon}'")]
    BadCoordinates { lat: String, lon: String },

    #[error("No match for place '{0}'")]
    NoMatch(String),
}

/// A geocoder candidate for a place query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Raw Nominatim response row; coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimRow {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimRow {
    fn into_place(self) -> Result<GeocodedPlace, GeocodeError> {
        let lat = self.lat.parse::<f64>();
        let lon = self.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(GeocodedPlace {
                lat,
                lon,
                display_name: self.display_name,
            }),
            _ => Err(GeocodeError::BadCoordinates {
                lat: self.lat,
                lon: self.lon,
            }),
        }
    }
}

/// Nominatim search client.
pub struct Geocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl Geocoder {
    /// Creates a client against the public Nominatim endpoint.
    ///
    /// Nominatim's usage policy requires an identifying User-Agent, so one
    /// is always set.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Creates a client against a custom endpoint (self-hosted instances,
    /// test servers).
    pub fn with_endpoint(endpoint: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("summerdays/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Geocoder {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// Returns all candidates the geocoder offers for the query, best first.
    pub async fn search(&self, place: &str) -> Result<Vec<GeocodedPlace>, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", place),
                ("format", "json"),
                ("limit", &MAX_CANDIDATES.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let rows: Vec<NominatimRow> = response.json().await?;
        debug!("Geocoder returned {} candidate(s) for '{}'", rows.len(), place);

        rows.into_iter().map(NominatimRow::into_place).collect()
    }

    /// Resolves a place to its best candidate.
    ///
    /// The top match is returned, but when the geocoder offers more than
    /// one candidate the alternates are logged so an ambiguous query never
    /// resolves silently. An empty candidate list is a typed error.
    pub async fn resolve(&self, place: &str) -> Result<GeocodedPlace, GeocodeError> {
        let candidates = self.search(place).await?;
        resolve_candidates(place, candidates)
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidate-selection policy, split from the HTTP call for testability.
fn resolve_candidates(
    place: &str,
    candidates: Vec<GeocodedPlace>,
) -> Result<GeocodedPlace, GeocodeError> {
    let mut iter = candidates.into_iter();
    let best = iter.next().ok_or_else(|| GeocodeError::NoMatch(place.to_string()))?;

    let alternates: Vec<String> = iter.take(3).map(|c| c.display_name).collect();
    if !alternates.is_empty() {
        warn!(
            "Place '{}' is ambiguous; using '{}' (alternates: {})",
            place,
            best.display_name,
            alternates.join("; ")
        );
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(lat: f64, lon: f64, name: &str) -> GeocodedPlace {
        GeocodedPlace {
            lat,
            lon,
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_resolve_takes_top_candidate() {
        let candidates = vec![
            place(53.55, 9.99, "Hamburg, Deutschland"),
            place(42.72, -78.83, "Hamburg, New York, United States"),
        ];

        let best = resolve_candidates("Hamburg", candidates).unwrap();
        assert_eq!(best.display_name, "Hamburg, Deutschland");
        assert_eq!(best.lat, 53.55);
    }

    #[test]
    fn test_resolve_empty_is_no_match() {
        let err = resolve_candidates("Atlantis", Vec::new()).unwrap_err();
        assert!(matches!(err, GeocodeError::NoMatch(p) if p == "Atlantis"));
    }

    #[test]
    fn test_nominatim_row_parsing() {
        let json = r#"[
            {"lat": "53.550341", "lon": "10.000654", "display_name": "Hamburg, Deutschland"},
            {"lat": "42.715646", "lon": "-78.829468", "display_name": "Hamburg, New York"}
        ]"#;

        let rows: Vec<NominatimRow> = serde_json::from_str(json).unwrap();
        let places: Result<Vec<GeocodedPlace>, _> =
            rows.into_iter().map(NominatimRow::into_place).collect();
        let places = places.unwrap();

        assert_eq!(places.len(), 2);
        assert!((places[0].lat - 53.550341).abs() < 1e-9);
        assert!((places[1].lon - -78.829468).abs() < 1e-9);
    }

    async fn serve_once(status_line: &'static str, body: &'static str) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_resolve_against_local_endpoint() {
        let addr = serve_once(
            "200 OK",
            r#"[{"lat": "53.55", "lon": "9.99", "display_name": "Hamburg, Deutschland"}]"#,
        )
        .await;

        let geocoder = Geocoder::with_endpoint(&format!("http://{}/search", addr));
        let best = geocoder.resolve("Hamburg").await.unwrap();

        assert_eq!(best.display_name, "Hamburg, Deutschland");
        assert!((best.lat - 53.55).abs() < 1e-9);
        assert!((best.lon - 9.99).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_search_surfaces_endpoint_status() {
        let addr = serve_once("503 Service Unavailable", "").await;

        let geocoder = Geocoder::with_endpoint(&format!("http://{}/search", addr));
        let err = geocoder.search("Hamburg").await.unwrap_err();

        assert!(matches!(err, GeocodeError::Status(503)));
    }

    #[test]
    fn test_nominatim_row_bad_coordinates() {
        let row = NominatimRow {
            lat: "not-a-number".to_string(),
            lon: "10.0".to_string(),
            display_name: "Nowhere".to_string(),
        };
        assert!(matches!(
            row.into_place(),
            Err(GeocodeError::BadCoordinates { .. })
        ));
    }
}
