//! HTTP client for the Nominatim search / reverse / lookup endpoints.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::normalize::RawPlace;
use crate::config::GeocoderConfig;
use crate::error::{GeoError, Result};
use crate::models::FeatureId;

/// Parameters sent with every request
const DEFAULT_PARAMETERS: &[(&str, &str)] = &[
    ("accept-language", "en"),
    ("format", "jsonv2"),
    ("polygon_geojson", "1"),
    ("addressdetails", "1"),
    ("namedetails", "0"),
    ("extratags", "0"),
];

/// One outbound gazetteer operation
#[derive(Debug, Clone, PartialEq)]
pub enum NominatimRequest {
    /// Free-text search
    Search {
        query: String,
        country_codes: Vec<String>,
        limit: u32,
    },
    /// Reverse geocoding of a coordinate pair
    Reverse {
        latitude: f64,
        longitude: f64,
        zoom: u8,
    },
    /// Lookup by feature id
    Lookup { ids: Vec<FeatureId> },
}

impl NominatimRequest {
    pub fn search(query: impl Into<String>, limit: u32) -> Self {
        NominatimRequest::Search {
            query: query.into(),
            country_codes: Vec::new(),
            limit,
        }
    }

    /// Endpoint path under the base URL
    pub fn method(&self) -> &'static str {
        match self {
            NominatimRequest::Search { .. } => "search",
            NominatimRequest::Reverse { .. } => "reverse",
            NominatimRequest::Lookup { .. } => "lookup",
        }
    }

    /// Operation-specific query parameters
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            NominatimRequest::Search {
                query,
                country_codes,
                limit,
            } => {
                let mut params = vec![("q", query.clone()), ("limit", limit.to_string())];
                if !country_codes.is_empty() {
                    params.push(("countrycodes", country_codes.join(",")));
                }
                params
            }
            NominatimRequest::Reverse {
                latitude,
                longitude,
                zoom,
            } => vec![
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", zoom.to_string()),
            ],
            NominatimRequest::Lookup { ids } => vec![(
                "osm_ids",
                ids.iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            )],
        }
    }

    /// Short human-readable form, e.g. `search "Buon Ho, Viet Nam"`
    pub fn describe(&self) -> String {
        match self {
            NominatimRequest::Search { query, .. } => format!("search \"{}\"", query),
            NominatimRequest::Reverse {
                latitude,
                longitude,
                ..
            } => format!("reverse \"{}, {}\"", latitude, longitude),
            NominatimRequest::Lookup { ids } => format!(
                "lookup \"{}\"",
                ids.iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

/// Remote gazetteer operations.
///
/// Implemented over HTTP by [`NominatimClient`]; tests substitute an
/// in-process implementation.
#[allow(async_fn_in_trait)]
pub trait NominatimApi {
    /// Issue exactly one outbound request and return its places in
    /// provider order (empty when nothing matched).
    async fn execute(&self, request: &NominatimRequest) -> Result<Vec<RawPlace>>;
}

/// Nominatim HTTP client
pub struct NominatimClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }

    /// Free-text search
    pub async fn search(
        &self,
        query: &str,
        country_codes: &[String],
        limit: u32,
    ) -> Result<Vec<RawPlace>> {
        self.execute(&NominatimRequest::Search {
            query: query.to_string(),
            country_codes: country_codes.to_vec(),
            limit,
        })
        .await
    }

    /// Reverse geocode a coordinate pair
    pub async fn reverse(&self, latitude: f64, longitude: f64, zoom: u8) -> Result<Vec<RawPlace>> {
        self.execute(&NominatimRequest::Reverse {
            latitude,
            longitude,
            zoom,
        })
        .await
    }

    /// Look up features by id
    pub async fn lookup(&self, ids: &[FeatureId]) -> Result<Vec<RawPlace>> {
        self.execute(&NominatimRequest::Lookup { ids: ids.to_vec() })
            .await
    }

    /// Full request URL, baseline parameters first
    pub fn request_url(&self, request: &NominatimRequest) -> Result<Url> {
        let endpoint = format!("{}/{}", self.base_url, request.method());
        let mut url = Url::parse(&endpoint)
            .map_err(|e| GeoError::Config(format!("invalid gazetteer URL {}: {}", endpoint, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in DEFAULT_PARAMETERS {
                pairs.append_pair(key, value);
            }
            for (key, value) in request.params() {
                pairs.append_pair(key, &value);
            }
        }

        Ok(url)
    }

    /// User agent carrying a per-request timestamp
    fn user_agent_header(&self) -> String {
        format!("{} #{}", self.user_agent, chrono::Utc::now().timestamp())
    }
}

impl NominatimApi for NominatimClient {
    async fn execute(&self, request: &NominatimRequest) -> Result<Vec<RawPlace>> {
        let url = self.request_url(request)?;
        info!("Requesting data from {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, self.user_agent_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::RemoteService {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = response.json().await?;
        parse_places(body)
    }
}

/// Interpret a response body: a list of places, a single place, or an
/// error object (Nominatim answers "Unable to geocode" with HTTP 200).
pub fn parse_places(body: Value) -> Result<Vec<RawPlace>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(GeoError::from))
            .collect(),
        Value::Object(map) => {
            if let Some(error) = map.get("error") {
                debug!("Gazetteer returned no match: {}", error);
                return Ok(Vec::new());
            }
            Ok(vec![serde_json::from_value(Value::Object(map))?])
        }
        Value::Null => Ok(Vec::new()),
        other => Err(GeoError::InvalidFeature(format!(
            "unexpected response body: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OsmType;
    use serde_json::json;

    fn client() -> NominatimClient {
        NominatimClient::new(&GeocoderConfig::default()).unwrap()
    }

    #[test]
    fn test_search_url_carries_baseline_parameters() {
        let request = NominatimRequest::Search {
            query: "Buon Ho, Viet Nam".to_string(),
            country_codes: vec!["vn".to_string()],
            limit: 1,
        };
        let url = client().request_url(&request).unwrap();

        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("accept-language".to_string(), "en".to_string())));
        assert!(pairs.contains(&("format".to_string(), "jsonv2".to_string())));
        assert!(pairs.contains(&("polygon_geojson".to_string(), "1".to_string())));
        assert!(pairs.contains(&("addressdetails".to_string(), "1".to_string())));
        assert!(pairs.contains(&("q".to_string(), "Buon Ho, Viet Nam".to_string())));
        assert!(pairs.contains(&("countrycodes".to_string(), "vn".to_string())));
    }

    #[test]
    fn test_reverse_and_lookup_params() {
        let reverse = NominatimRequest::Reverse {
            latitude: 51.5,
            longitude: -0.12,
            zoom: 10,
        };
        assert_eq!(
            reverse.params(),
            vec![
                ("lat", "51.5".to_string()),
                ("lon", "-0.12".to_string()),
                ("zoom", "10".to_string())
            ]
        );

        let lookup = NominatimRequest::Lookup {
            ids: vec![
                FeatureId::new(OsmType::Relation, 1),
                FeatureId::new(OsmType::Node, 2),
            ],
        };
        assert_eq!(lookup.params(), vec![("osm_ids", "R1,N2".to_string())]);
    }

    #[test]
    fn test_user_agent_has_timestamp() {
        let header = client().user_agent_header();
        assert!(header.starts_with("MOOD Geocoder #"));
    }

    #[test]
    fn test_parse_places_shapes() {
        let list = json!([{"osm_type": "node", "osm_id": 1}, {"osm_type": "way", "osm_id": 2}]);
        assert_eq!(parse_places(list).unwrap().len(), 2);

        let single = json!({"osm_type": "relation", "osm_id": 3});
        assert_eq!(parse_places(single).unwrap().len(), 1);

        let error = json!({"error": "Unable to geocode"});
        assert!(parse_places(error).unwrap().is_empty());

        assert!(parse_places(json!([])).unwrap().is_empty());
        assert!(parse_places(json!("nonsense")).is_err());
    }
}
