//! Resolution of latitude / longitude pairs (EMPRES-i).

use tracing::warn;

use super::{identify_component, locality_of, LocationResolver, ResolutionContext};
use crate::error::Result;
use crate::models::{GeocodedLocation, ResolvedPlace};
use crate::nominatim::{get_admin_level_1, get_country_name, Geocoder, NominatimApi};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

pub struct CoordinateResolver<'a> {
    context: ResolutionContext<'a>,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(context: ResolutionContext<'a>) -> Self {
        Self { context }
    }
}

impl LocationResolver for CoordinateResolver<'_> {
    type Input = Coordinate;

    async fn resolve<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        input: &Coordinate,
    ) -> Result<GeocodedLocation> {
        let mut location = GeocodedLocation::default();

        let Some(feature) = geocoder.reverse(input.latitude, input.longitude).await? else {
            warn!(
                "Nothing found at ({}, {})",
                input.latitude, input.longitude
            );
            return Ok(location);
        };

        let address = feature.address_or_empty();
        let Some(country_name) = get_country_name(&address) else {
            warn!("No country in address of {}", feature.label());
            return Ok(location);
        };

        let Some(country_feature) = geocoder.search(country_name).await? else {
            warn!("Couldn't resolve country '{}'", country_name);
            return Ok(location);
        };
        location.country = Some(ResolvedPlace::new(
            country_name,
            Some(country_feature.id.clone()),
        ));

        location.locality = locality_of(geocoder, &feature, country_name).await?;
        if location.locality.is_none() {
            warn!("Locality not found in {}", feature.label());
        }

        let reference = self.context.reference;
        let Some(country_code) = reference.countries.code_for(country_name) else {
            warn!("No country code for '{}'", country_name);
            return Ok(location);
        };
        let target_level = reference.policy.admin_level(country_code);

        match get_admin_level_1(&address, target_level) {
            Some(component) => {
                location.admin_level_1 =
                    Some(identify_component(geocoder, component, country_name).await?);
            }
            None => warn!("Admin level 1 not found in {}", feature.label()),
        }

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FeatureCache;
    use crate::config::GeocoderConfig;
    use crate::gazetteer::Gazetteer;
    use crate::nominatim::mock::{place, MockApi};
    use crate::reference::{fixtures, ReferenceData};
    use serde_json::json;

    fn config() -> GeocoderConfig {
        GeocoderConfig {
            request_delay_ms: 0,
            ..GeocoderConfig::default()
        }
    }

    fn reference() -> ReferenceData {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_reference_dir(dir.path());
        ReferenceData::load(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_reverse_fills_all_slots() {
        let reference = reference();
        let gazetteer = Gazetteer::default();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let mut town = place(
            "node",
            2390001,
            "Buon Ho",
            json!({"town": "Buon Ho", "state": "Dak Lak Province", "country": "Viet Nam"}),
        );
        town["place_rank"] = json!(16);
        let api = MockApi::new()
            .with_reverse(12.92, 108.27, town)
            .with_search(
                "Viet Nam",
                place("relation", 49915, "Viet Nam", json!({"country": "Viet Nam"})),
            )
            .with_search(
                "Dak Lak Province, Viet Nam",
                place("relation", 1902793, "Dak Lak Province", json!({"state": "Dak Lak Province"})),
            );

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());
        let location = CoordinateResolver::new(context)
            .resolve(&mut geocoder, &Coordinate::new(12.92, 108.27))
            .await
            .unwrap();

        assert_eq!(location.country.unwrap().id.unwrap().as_str(), "R49915");
        assert_eq!(location.locality.unwrap().id.unwrap().as_str(), "N2390001");
        let admin = location.admin_level_1.unwrap();
        assert_eq!(admin.name, "Dak Lak Province");
        assert_eq!(admin.id.unwrap().as_str(), "R1902793");
    }

    #[tokio::test]
    async fn test_county_only_address() {
        let reference = reference();
        let gazetteer = Gazetteer::default();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let api = MockApi::new()
            .with_reverse(
                51.5,
                -0.12,
                place(
                    "relation",
                    175342,
                    "Greater London",
                    json!({
                        "county": "Greater London",
                        "state": "England",
                        "country": "United Kingdom of Great Britain and Northern Ireland"
                    }),
                ),
            )
            .with_search(
                "United Kingdom of Great Britain and Northern Ireland",
                place("relation", 62149, "United Kingdom", json!({"country": "United Kingdom"})),
            );

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());
        let location = CoordinateResolver::new(context)
            .resolve(&mut geocoder, &Coordinate::new(51.5, -0.12))
            .await
            .unwrap();

        assert!(location.country.is_some());
        assert!(location.locality.is_none());
        // GB policy targets admin level 4
        assert_eq!(location.admin_level_1.unwrap().name, "England");
    }

    #[tokio::test]
    async fn test_nothing_at_coordinate() {
        let reference = reference();
        let gazetteer = Gazetteer::default();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(MockApi::new(), &cache, &config());
        let location = CoordinateResolver::new(context)
            .resolve(&mut geocoder, &Coordinate::new(0.0, -30.0))
            .await
            .unwrap();

        assert!(location.is_empty());
        assert_eq!(geocoder.api().call_count(), 1);
    }
}
