//! Mapping of raw Nominatim records onto canonical features.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{GeoError, Result};
use crate::models::{Address, AddressComponent, BoundingBox, Feature, FeatureId, OsmType};

/// Place types that never describe a surveillance location.
pub const EXCLUDED_PLACE_TYPES: &[&str] = &["mountain_range"];

/// Nominatim address rank and OSM admin_level for keys of the flat
/// `address` object. Keys not listed carry neither.
/// See: https://nominatim.org/release-docs/latest/customize/Ranking/
/// and https://wiki.openstreetmap.org/wiki/Tag:boundary%3Dadministrative
const FLAT_ADDRESS_LEVELS: &[(&str, u8, Option<u8>)] = &[
    ("country", 4, Some(2)),
    ("region", 6, Some(3)),
    ("state", 8, Some(4)),
    ("province", 8, Some(4)),
    ("state_district", 10, Some(5)),
    ("county", 12, Some(6)),
    ("municipality", 14, Some(7)),
    ("city", 16, Some(8)),
    ("town", 16, Some(8)),
    ("village", 16, Some(8)),
    ("city_district", 18, Some(9)),
    ("borough", 18, Some(9)),
    ("suburb", 20, Some(10)),
    ("hamlet", 20, None),
    ("isolated_dwelling", 20, None),
    ("neighbourhood", 22, None),
    ("quarter", 22, None),
    ("road", 26, None),
];

/// Flat address keys that are codes rather than names
const FLAT_ADDRESS_SKIPPED: &[&str] = &["country_code", "postcode"];

/// A place as returned by search, reverse or lookup (`format=jsonv2`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub osm_type: Option<String>,
    #[serde(default)]
    pub osm_id: Option<Value>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub place_type: Option<String>,
    #[serde(default)]
    pub addresstype: Option<String>,
    #[serde(default)]
    pub address: Option<RawAddress>,
    #[serde(default)]
    pub place_rank: Option<i64>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
    #[serde(default)]
    pub boundingbox: Option<Vec<Value>>,
    #[serde(default)]
    pub geojson: Option<Value>,
}

/// Address breakdown: either the detailed component list or the flat
/// `{ "city": ..., "country": ... }` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    Components(Vec<RawAddressComponent>),
    Flat(Map<String, Value>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAddressComponent {
    pub localname: String,
    #[serde(default)]
    pub place_type: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub admin_level: Option<u8>,
    #[serde(default)]
    pub rank_address: Option<u8>,
    #[serde(default)]
    pub osm_type: Option<String>,
    #[serde(default)]
    pub osm_id: Option<i64>,
    #[serde(default)]
    pub isaddress: Option<bool>,
}

/// Type that excludes the place from resolution, if any
pub fn excluded_type(raw: &RawPlace) -> Option<&str> {
    [raw.place_type.as_deref(), raw.addresstype.as_deref()]
        .into_iter()
        .flatten()
        .find(|t| EXCLUDED_PLACE_TYPES.contains(t))
}

/// Derive the feature id from the provider's element type and numeric id.
pub fn create_feature_id(osm_type: Option<&str>, osm_id: Option<&Value>) -> Result<FeatureId> {
    let element = osm_type.unwrap_or_default();
    let osm_type = OsmType::from_name(element)
        .ok_or_else(|| GeoError::InvalidFeature(format!("invalid OSM element type: '{}'", element)))?;

    let osm_id = osm_id
        .and_then(Value::as_i64)
        .ok_or_else(|| GeoError::InvalidFeature(format!("invalid OSM id: {:?}", osm_id)))?;

    Ok(FeatureId::new(osm_type, osm_id))
}

/// Map a raw provider record onto the canonical [`Feature`] shape.
pub fn normalize_feature(raw: &RawPlace) -> Result<Feature> {
    let id = create_feature_id(raw.osm_type.as_deref(), raw.osm_id.as_ref())?;
    let (osm_type, osm_id) = FeatureId::split(id.as_str())?;

    let name = raw
        .display_name
        .clone()
        .or_else(|| raw.name.clone())
        .unwrap_or_default();

    let latitude = coordinate(raw.lat.as_ref())
        .ok_or_else(|| GeoError::InvalidFeature(format!("{} has no latitude", id)))?;
    let longitude = coordinate(raw.lon.as_ref())
        .ok_or_else(|| GeoError::InvalidFeature(format!("{} has no longitude", id)))?;

    Ok(Feature {
        id,
        osm_type,
        osm_id,
        name,
        address: raw.address.as_ref().map(normalize_address),
        place_rank: raw.place_rank,
        latitude,
        longitude,
        bounding_box: raw.boundingbox.as_deref().and_then(bounding_box),
        polygon: raw.geojson.clone(),
    })
}

fn normalize_address(raw: &RawAddress) -> Address {
    match raw {
        RawAddress::Components(components) => Address::new(
            components
                .iter()
                .filter(|c| c.isaddress != Some(false))
                .map(normalize_component)
                .collect(),
        ),
        RawAddress::Flat(map) => Address::new(
            map.iter()
                .filter(|(key, _)| !is_skipped_flat_key(key))
                .filter_map(|(key, value)| {
                    let name = value.as_str()?;
                    let mut component = AddressComponent::new(name, key.as_str());
                    if let Some((_, rank, level)) =
                        FLAT_ADDRESS_LEVELS.iter().find(|(k, _, _)| *k == key.as_str())
                    {
                        component.rank_address = Some(*rank);
                        component.admin_level = *level;
                    }
                    Some(component)
                })
                .collect(),
        ),
    }
}

fn is_skipped_flat_key(key: &str) -> bool {
    FLAT_ADDRESS_SKIPPED.contains(&key) || key.starts_with("ISO3166")
}

fn normalize_component(raw: &RawAddressComponent) -> AddressComponent {
    let kind = raw
        .place_type
        .clone()
        .or_else(|| raw.kind.clone())
        .unwrap_or_default();

    let feature_id = match (raw.osm_type.as_deref(), raw.osm_id) {
        (Some(t), Some(id)) => {
            let osm_type = if t.len() == 1 {
                t.chars().next().and_then(OsmType::from_code)
            } else {
                OsmType::from_name(t)
            };
            osm_type.map(|osm_type| FeatureId::new(osm_type, id))
        }
        _ => None,
    };

    AddressComponent {
        name: raw.localname.clone(),
        kind,
        // Nominatim reports 15 for "not an administrative boundary"
        admin_level: raw.admin_level.filter(|level| *level < 15),
        rank_address: raw.rank_address.filter(|rank| *rank > 0),
        feature_id,
    }
}

/// Nominatim sends coordinates as strings; accept numbers as well
fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// `[min_lat, max_lat, min_lon, max_lon]`
fn bounding_box(values: &[Value]) -> Option<BoundingBox> {
    if values.len() != 4 {
        return None;
    }
    Some(BoundingBox {
        min_lat: coordinate(Some(&values[0]))?,
        max_lat: coordinate(Some(&values[1]))?,
        min_lon: coordinate(Some(&values[2]))?,
        max_lon: coordinate(Some(&values[3]))?,
    })
}
