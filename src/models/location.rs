//! Resolution results attached to each output record.

use serde::{Deserialize, Serialize};

use super::{AddressComponent, Feature, FeatureId, GazetteerEntry};

/// A resolved geographic entity: its name and, when known, its feature id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
}

impl ResolvedPlace {
    pub fn new(name: impl Into<String>, id: Option<FeatureId>) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    pub fn from_feature(feature: &Feature) -> Self {
        Self::new(feature.name.clone(), Some(feature.id.clone()))
    }

    pub fn from_component(component: &AddressComponent) -> Self {
        Self::new(component.name.clone(), component.feature_id.clone())
    }

    pub fn from_entry(entry: &GazetteerEntry) -> Self {
        Self::new(entry.name.clone(), Some(entry.osm_id.clone()))
    }
}

/// Country / admin-level-1 / locality triple for one record.
///
/// Every slot is optional: ambiguous input legitimately resolves partially.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodedLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<ResolvedPlace>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_level_1: Option<ResolvedPlace>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<ResolvedPlace>,
}

impl GeocodedLocation {
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.admin_level_1.is_none() && self.locality.is_none()
    }

    /// Ids of every resolved slot, coarsest last
    pub fn feature_ids(&self) -> impl Iterator<Item = &FeatureId> {
        [&self.locality, &self.admin_level_1, &self.country]
            .into_iter()
            .filter_map(|slot| slot.as_ref().and_then(|p| p.id.as_ref()))
    }
}
