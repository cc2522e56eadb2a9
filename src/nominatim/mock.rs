//! In-process stand-in for the remote service, keyed by request.

use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;

use super::api::{parse_places, NominatimApi, NominatimRequest};
use super::normalize::RawPlace;
use crate::error::Result;
use crate::models::FeatureId;

#[derive(Default)]
pub struct MockApi {
    responses: HashMap<String, Value>,
    calls: RefCell<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: &str, place: Value) -> Self {
        let key = NominatimRequest::search(query, 1).describe();
        self.responses.insert(key, json!([place]));
        self
    }

    pub fn with_reverse(mut self, latitude: f64, longitude: f64, place: Value) -> Self {
        let key = NominatimRequest::Reverse {
            latitude,
            longitude,
            zoom: 10,
        }
        .describe();
        self.responses.insert(key, place);
        self
    }

    pub fn with_lookup(mut self, id: &FeatureId, place: Value) -> Self {
        let key = NominatimRequest::Lookup {
            ids: vec![id.clone()],
        }
        .describe();
        self.responses.insert(key, json!([place]));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Requests received so far, as `describe()` strings
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl NominatimApi for MockApi {
    async fn execute(&self, request: &NominatimRequest) -> Result<Vec<RawPlace>> {
        let key = request.describe();
        self.calls.borrow_mut().push(key.clone());
        match self.responses.get(&key) {
            Some(body) => parse_places(body.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// A jsonv2 place with a flat address object
pub fn place(osm_type: &str, osm_id: i64, name: &str, address: Value) -> Value {
    json!({
        "osm_type": osm_type,
        "osm_id": osm_id,
        "display_name": name,
        "name": name,
        "type": "administrative",
        "lat": "12.5",
        "lon": "108.5",
        "boundingbox": ["12.0", "13.0", "108.0", "109.0"],
        "address": address,
        "geojson": {"type": "Point", "coordinates": [108.5, 12.5]}
    })
}
