//! Canonical geographic feature, as stored in the feature cache.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GeoError;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    /// Parse the provider's element type name ("node", "way", "relation").
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "node" => Some(OsmType::Node),
            "way" => Some(OsmType::Way),
            "relation" => Some(OsmType::Relation),
            _ => None,
        }
    }

    /// One-letter prefix used in feature ids.
    pub fn code(&self) -> char {
        match self {
            OsmType::Node => 'N',
            OsmType::Way => 'W',
            OsmType::Relation => 'R',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(OsmType::Node),
            'W' => Some(OsmType::Way),
            'R' => Some(OsmType::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for OsmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// Feature identifier: element type letter followed by the OSM id, e.g. `R49915`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(osm_type: OsmType, osm_id: i64) -> Self {
        Self(format!("{}{}", osm_type.code(), osm_id))
    }

    /// Parse and validate an id such as `N240109189`.
    pub fn parse(raw: &str) -> Result<Self, GeoError> {
        let (osm_type, osm_id) = Self::split(raw)?;
        Ok(Self::new(osm_type, osm_id))
    }

    /// Split an id back into its element type and numeric id.
    pub fn split(raw: &str) -> Result<(OsmType, i64), GeoError> {
        let mut chars = raw.chars();
        let invalid = || GeoError::InvalidFeatureId(raw.to_string());

        let prefix = chars.next().ok_or_else(invalid)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let osm_type = OsmType::from_code(prefix).ok_or_else(invalid)?;
        let osm_id = digits.parse::<i64>().map_err(|_| invalid())?;
        Ok((osm_type, osm_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding box as reported by the gazetteer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// One level of a feature's address hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    /// Local name of the component
    pub name: String,

    /// Semantic type: "country", "state", "county", "city", ...
    pub kind: String,

    /// OSM admin_level of the boundary, when the component is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<u8>,

    /// Nominatim address rank (4 = country ... 30 = POI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_address: Option<u8>,

    /// Id of the component's own feature, when the provider supplies it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<FeatureId>,
}

impl AddressComponent {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            admin_level: None,
            rank_address: None,
            feature_id: None,
        }
    }

    pub fn with_admin_level(mut self, level: u8) -> Self {
        self.admin_level = Some(level);
        self
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.rank_address = Some(rank);
        self
    }

    pub fn with_feature_id(mut self, id: FeatureId) -> Self {
        self.feature_id = Some(id);
        self
    }
}

/// Ordered address hierarchy, finest component first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    pub components: Vec<AddressComponent>,
}

impl Address {
    pub fn new(components: Vec<AddressComponent>) -> Self {
        Self { components }
    }

    /// Name of the first component of the given semantic type
    pub fn get(&self, kind: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AddressComponent> {
        self.components.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// A geographic entity returned by the gazetteer, normalized.
///
/// Features are immutable once cached: the id identifies exactly one entity
/// and a second save of the same id is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub osm_type: OsmType,
    pub osm_id: i64,

    /// Provider display name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_rank: Option<i64>,

    pub latitude: f64,
    pub longitude: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// GeoJSON geometry, kept opaque
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<serde_json::Value>,
}

impl Feature {
    /// Address hierarchy, or an empty one when the provider sent none
    pub fn address_or_empty(&self) -> Address {
        self.address.clone().unwrap_or_default()
    }

    /// "<id> - <name>", used in log lines
    pub fn label(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}
