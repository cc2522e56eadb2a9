//! Per-source location resolution.
//!
//! Each input format carries location in a different shape (free text,
//! coordinates, NUTS codes). [`DataSource`] picks the matching
//! [`LocationResolver`]; all of them fill the same [`GeocodedLocation`]
//! triple through one [`Geocoder`].

pub mod coordinate;
pub mod freetext;
pub mod nuts;
pub mod permute;
pub mod tokens;

use clap::ValueEnum;
use std::fmt;

use crate::error::Result;
use crate::gazetteer::Gazetteer;
use crate::models::{AddressComponent, Feature, GeocodedLocation, ResolvedPlace};
use crate::nominatim::{get_locality, Geocoder, NominatimApi};
use crate::reference::ReferenceData;

pub use coordinate::{Coordinate, CoordinateResolver};
pub use freetext::{FreeTextLocation, FreeTextResolver};
pub use nuts::{truncate_nuts_code, NutsResolver};
pub use permute::permutation_queries;
pub use tokens::{clean_token, parse_location, strain_location, ParsedLocation, Token, TokenBag};

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DataSource {
    /// EMPRES-i outbreak exports (coordinates)
    Empresi,
    /// GenBank sequence metadata (free-text location)
    Genbank,
    /// ECDC surveillance exports (NUTS codes)
    Ecdc,
}

impl DataSource {
    /// Directory / file-name form
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Empresi => "empresi",
            DataSource::Genbank => "genbank",
            DataSource::Ecdc => "ecdc",
        }
    }

    /// Value written to the `source` output column
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Empresi => "EMPRES-i",
            DataSource::Genbank => "GenBank",
            DataSource::Ecdc => "ECDC",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only tables shared by every resolver during a run
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub reference: &'a ReferenceData,
    pub gazetteer: &'a Gazetteer,
    /// Largest token bag still searched by permutation
    pub max_permutation_tokens: usize,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        reference: &'a ReferenceData,
        gazetteer: &'a Gazetteer,
        max_permutation_tokens: usize,
    ) -> Self {
        Self {
            reference,
            gazetteer,
            max_permutation_tokens,
        }
    }
}

/// Turns one record's location field into a country / admin-level-1 /
/// locality triple.
///
/// Ambiguity is never an error: unresolved slots stay empty and a warning
/// is logged. Errors are reserved for cache and transport failures.
#[allow(async_fn_in_trait)]
pub trait LocationResolver {
    type Input;

    async fn resolve<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        input: &Self::Input,
    ) -> Result<GeocodedLocation>;
}

/// Place for an address component.
///
/// Flat addresses carry no ids, so the component is searched by name
/// within its country to find one.
pub(crate) async fn identify_component<A: NominatimApi>(
    geocoder: &mut Geocoder<'_, A>,
    component: &AddressComponent,
    country_name: &str,
) -> Result<ResolvedPlace> {
    if component.feature_id.is_some() {
        return Ok(ResolvedPlace::from_component(component));
    }
    let query = format!("{}, {}", component.name, country_name);
    let id = geocoder.search(&query).await?.map(|feature| feature.id);
    Ok(ResolvedPlace::new(component.name.clone(), id))
}

/// Locality from a feature's address.
///
/// When the feature itself sits at the locality's rank it is the locality.
pub(crate) async fn locality_of<A: NominatimApi>(
    geocoder: &mut Geocoder<'_, A>,
    feature: &Feature,
    country_name: &str,
) -> Result<Option<ResolvedPlace>> {
    let address = feature.address_or_empty();
    let Some(component) = get_locality(&address) else {
        return Ok(None);
    };

    let is_feature_itself = component.feature_id.is_none()
        && feature.place_rank.is_some()
        && feature.place_rank == component.rank_address.map(i64::from);
    if is_feature_itself {
        return Ok(Some(ResolvedPlace::new(
            component.name.clone(),
            Some(feature.id.clone()),
        )));
    }

    identify_component(geocoder, component, country_name)
        .await
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FeatureCache;
    use crate::config::GeocoderConfig;
    use crate::nominatim::mock::{place, MockApi};
    use crate::nominatim::normalize::{normalize_feature, RawPlace};
    use serde_json::json;

    #[test]
    fn test_data_source_names() {
        assert_eq!(DataSource::Empresi.as_str(), "empresi");
        assert_eq!(DataSource::Genbank.label(), "GenBank");
        assert_eq!(DataSource::Ecdc.to_string(), "ecdc");
        assert_eq!(
            DataSource::from_str("genbank", true).unwrap(),
            DataSource::Genbank
        );
    }

    #[tokio::test]
    async fn test_locality_is_feature_itself_at_same_rank() {
        let cache = FeatureCache::open_in_memory().unwrap();
        let config = GeocoderConfig {
            request_delay_ms: 0,
            ..GeocoderConfig::default()
        };
        let mut geocoder = Geocoder::new(MockApi::new(), &cache, &config);

        let mut raw = place(
            "node",
            42,
            "Buon Ho",
            json!({"town": "Buon Ho", "state": "Dak Lak Province", "country": "Viet Nam"}),
        );
        raw["place_rank"] = json!(16);
        let feature = normalize_feature(&serde_json::from_value::<RawPlace>(raw).unwrap()).unwrap();

        let locality = locality_of(&mut geocoder, &feature, "Viet Nam")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locality.name, "Buon Ho");
        assert_eq!(locality.id.unwrap().as_str(), "N42");
        assert_eq!(geocoder.api().call_count(), 0);
    }

    #[tokio::test]
    async fn test_component_without_id_is_searched() {
        let cache = FeatureCache::open_in_memory().unwrap();
        let config = GeocoderConfig {
            request_delay_ms: 0,
            ..GeocoderConfig::default()
        };
        let api = MockApi::new().with_search(
            "England, United Kingdom",
            place("relation", 58447, "England", json!({"state": "England"})),
        );
        let mut geocoder = Geocoder::new(api, &cache, &config);

        let component = AddressComponent::new("England", "state").with_admin_level(4);
        let found = identify_component(&mut geocoder, &component, "United Kingdom")
            .await
            .unwrap();
        assert_eq!(found.id.unwrap().as_str(), "R58447");

        let unknown = AddressComponent::new("Nowhere", "state");
        let found = identify_component(&mut geocoder, &unknown, "United Kingdom")
            .await
            .unwrap();
        assert_eq!(found.name, "Nowhere");
        assert!(found.id.is_none());
    }
}
