//! Resolution of `country[:area,...]` free text (GenBank `country` field).

use tracing::{debug, warn};

use super::permute::permutation_queries;
use super::tokens::{parse_location, strain_location, TokenBag};
use super::{identify_component, locality_of, LocationResolver, ResolutionContext};
use crate::error::Result;
use crate::models::{Feature, GazetteerEntry, GeocodedLocation, ResolvedPlace};
use crate::nominatim::{get_admin_level_1, Geocoder, NominatimApi};

/// Location text of one record, plus the strain name it may borrow a
/// place from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeTextLocation {
    pub text: String,
    pub strain: Option<String>,
}

impl FreeTextLocation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            strain: None,
        }
    }

    pub fn with_strain(mut self, strain: impl Into<String>) -> Self {
        self.strain = Some(strain.into());
        self
    }
}

/// Match area tokens against the country's gazetteer entries.
///
/// Each entry consumes at most one token. Returns the leftover bag and
/// the matched entries in gazetteer order.
pub fn match_entries<'g>(
    bag: TokenBag,
    entries: &'g [GazetteerEntry],
) -> (TokenBag, Vec<&'g GazetteerEntry>) {
    let mut bag = bag;
    let mut matched = Vec::new();
    for entry in entries {
        let (rest, taken) = bag.take(&entry.match_key());
        bag = rest;
        if taken.is_some() {
            matched.push(entry);
        }
    }
    (bag, matched)
}

pub struct FreeTextResolver<'a> {
    context: ResolutionContext<'a>,
}

impl<'a> FreeTextResolver<'a> {
    pub fn new(context: ResolutionContext<'a>) -> Self {
        Self { context }
    }

    /// First permutation query with a result
    async fn search_permutations<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        bag: &TokenBag,
        fixed_text: &str,
    ) -> Result<Option<Feature>> {
        let tokens = bag.texts_reversed();
        let queries =
            permutation_queries(&tokens, fixed_text, self.context.max_permutation_tokens);
        if tokens.len() > self.context.max_permutation_tokens {
            debug!(
                "{} tokens exceed the permutation limit, searching them as one query",
                tokens.len()
            );
        }

        for query in queries {
            if let Some(feature) = geocoder.search(&query).await? {
                return Ok(Some(feature));
            }
        }
        Ok(None)
    }

    /// Fill whichever of locality / admin-level-1 is still empty from the
    /// best permutation hit
    async fn fill_from_search<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        location: &mut GeocodedLocation,
        bag: &TokenBag,
        fixed_text: &str,
        country_name: &str,
        target_level: Option<u8>,
    ) -> Result<()> {
        let Some(feature) = self.search_permutations(geocoder, bag, fixed_text).await? else {
            warn!("No match for remaining areas near '{}'", fixed_text);
            return Ok(());
        };
        debug!("Permutation search matched {}", feature.label());

        if location.locality.is_none() {
            location.locality = locality_of(geocoder, &feature, country_name).await?;
        }
        if location.admin_level_1.is_none() {
            let address = feature.address_or_empty();
            if let Some(component) = get_admin_level_1(&address, target_level) {
                location.admin_level_1 =
                    Some(identify_component(geocoder, component, country_name).await?);
            }
        }

        match (&location.admin_level_1, &location.locality) {
            (None, None) => warn!(
                "Neither admin level 1 nor locality found in {}",
                feature.label()
            ),
            (None, Some(_)) => warn!("Admin level 1 not found in {}", feature.label()),
            (Some(_), None) => warn!("Locality not found in {}", feature.label()),
            (Some(_), Some(_)) => {}
        }
        Ok(())
    }
}

impl LocationResolver for FreeTextResolver<'_> {
    type Input = FreeTextLocation;

    async fn resolve<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        input: &FreeTextLocation,
    ) -> Result<GeocodedLocation> {
        let mut location = GeocodedLocation::default();

        let strain_token = input.strain.as_deref().and_then(strain_location);
        let parsed = parse_location(&input.text, strain_token.as_deref());
        let Some(country) = parsed.country else {
            warn!("Empty location '{}'", input.text);
            return Ok(location);
        };

        let Some(country_feature) = geocoder.search(&country.text).await? else {
            warn!("Couldn't resolve country '{}'", country.text);
            return Ok(location);
        };
        let country_name = country_feature.name.clone();
        location.country = Some(ResolvedPlace::from_feature(&country_feature));

        let bag = parsed.areas;
        if bag.is_empty() {
            return Ok(location);
        }

        let reference = self.context.reference;
        let Some(country_code) = reference.countries.code_for(&country_name) else {
            warn!("No country code for '{}'", country_name);
            return Ok(location);
        };
        let target_level = reference.policy.admin_level(country_code);
        if target_level.is_none() {
            warn!(
                "No admin level 1 policy for {}, taking the highest level found",
                country_code
            );
        }

        let entries = self.context.gazetteer.entries_for_code(country_code);
        let (bag, mut matched) = match_entries(bag, entries);
        debug!(
            "{} gazetteer matches, {} tokens left for '{}'",
            matched.len(),
            bag.len(),
            input.text
        );

        if matched.is_empty() {
            self.fill_from_search(
                geocoder,
                &mut location,
                &bag,
                &country_name,
                &country_name,
                target_level,
            )
            .await?;
            return Ok(location);
        }

        if let Some(idx) = matched
            .iter()
            .position(|e| Some(e.admin_level) == target_level)
        {
            let entry = matched.remove(idx);
            location.admin_level_1 = Some(ResolvedPlace::from_entry(entry));

            // with no tokens left, a deeper match can only be the locality
            if bag.is_empty() && !matched.is_empty() {
                let entry = matched.remove(0);
                location.locality = Some(ResolvedPlace::from_entry(entry));
            }
        }

        if !bag.is_empty() || !matched.is_empty() {
            // finer units first, then admin level 1, then the country
            matched.sort_by(|a, b| b.admin_level.cmp(&a.admin_level));
            let mut fixed: Vec<&str> = matched.iter().map(|e| e.name.as_str()).collect();
            if let Some(admin) = &location.admin_level_1 {
                fixed.push(&admin.name);
            }
            fixed.push(&country_name);
            let fixed_text = fixed.join(", ");

            self.fill_from_search(
                geocoder,
                &mut location,
                &bag,
                &fixed_text,
                &country_name,
                target_level,
            )
            .await?;
        }

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FeatureCache;
    use crate::config::GeocoderConfig;
    use crate::models::{AdminUnit, FeatureId};
    use crate::nominatim::mock::{place, MockApi};
    use crate::reference::{fixtures, ReferenceData};
    use crate::resolve::tokens::Token;
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

    fn viet_nam() -> serde_json::Value {
        place("relation", 49915, "Viet Nam", json!({"country": "Viet Nam"}))
    }

    fn entry(name: &str, admin_level: u8, id: &str) -> GazetteerEntry {
        GazetteerEntry {
            country_code: "VN".to_string(),
            name: name.to_string(),
            admin_level,
            osm_id: FeatureId::parse(id).unwrap(),
        }
    }

    /// Fixture reference with extra Vietnamese units below the province
    fn reference_with(units: &[(&str, u8, &str)]) -> ReferenceData {
        let mut reference = reference();
        for (name, admin_level, id) in units {
            reference.admin_units.push(AdminUnit {
                country_code: "VN".to_string(),
                exonym: Some(name.to_string()),
                endonym: None,
                nuts_codes: Vec::new(),
                admin_level: *admin_level,
                osm_id: FeatureId::parse(id).unwrap(),
            });
        }
        reference
    }

    fn buon_ho_town() -> serde_json::Value {
        let mut buon_ho = place(
            "node",
            2390001,
            "Buon Ho",
            json!({"town": "Buon Ho", "state": "Dak Lak Province", "country": "Viet Nam"}),
        );
        buon_ho["place_rank"] = json!(16);
        buon_ho
    }

    fn dak_lak() -> serde_json::Value {
        place(
            "relation",
            1902793,
            "Dak Lak Province",
            json!({"state": "Dak Lak Province", "country": "Viet Nam"}),
        )
    }

    #[test]
    fn test_match_entries_consumes_one_token_each() {
        let bag = TokenBag::new(vec![
            Token::new("Dak Lak Province"),
            Token::new("Buon Ho"),
        ]);
        let entries = vec![
            entry("Dak Lak Province", 4, "R1902793"),
            entry("dak lak province", 4, "R1902793"),
            entry("Ha Noi", 4, "R1903516"),
        ];

        let (rest, matched) = match_entries(bag, &entries);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Dak Lak Province");
        assert_eq!(rest.len(), 1);
        assert!(rest.contains("buon ho"));
    }

    #[tokio::test]
    async fn test_gazetteer_match_then_locality_search() {
        let reference = reference();
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let mut buon_ho = place(
            "node",
            2390001,
            "Buon Ho",
            json!({"town": "Buon Ho", "state": "Dak Lak Province", "country": "Viet Nam"}),
        );
        buon_ho["place_rank"] = json!(16);
        let api = MockApi::new()
            .with_search("Viet Nam", viet_nam())
            .with_search("Buon Ho, Dak Lak Province, Viet Nam", buon_ho);

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());
        let resolver = FreeTextResolver::new(context);

        let location = resolver
            .resolve(
                &mut geocoder,
                &FreeTextLocation::new("Viet Nam: Dak Lak Province, Buon Ho"),
            )
            .await
            .unwrap();

        let country = location.country.unwrap();
        assert_eq!(country.name, "Viet Nam");
        assert_eq!(country.id.unwrap().as_str(), "R49915");

        let admin = location.admin_level_1.unwrap();
        assert_eq!(admin.name, "Dak Lak Province");
        assert_eq!(admin.id.unwrap().as_str(), "R1902793");

        let locality = location.locality.unwrap();
        assert_eq!(locality.name, "Buon Ho");
        assert_eq!(locality.id.unwrap().as_str(), "N2390001");

        assert_eq!(
            geocoder.api().calls(),
            vec![
                crate::nominatim::NominatimRequest::search("Viet Nam", 1).describe(),
                crate::nominatim::NominatimRequest::search("Buon Ho, Dak Lak Province, Viet Nam", 1)
                    .describe(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_country_leaves_everything_empty() {
        let reference = reference();
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(MockApi::new(), &cache, &config());
        let resolver = FreeTextResolver::new(context);

        let location = resolver
            .resolve(&mut geocoder, &FreeTextLocation::new("Atlantis: Poseidonia"))
            .await
            .unwrap();

        assert!(location.is_empty());
        assert_eq!(geocoder.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_country_only() {
        let reference = reference();
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let api = MockApi::new().with_search("Viet Nam", viet_nam());
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(&mut geocoder, &FreeTextLocation::new("Viet Nam"))
            .await
            .unwrap();

        assert_eq!(location.country.unwrap().name, "Viet Nam");
        assert!(location.admin_level_1.is_none());
        assert!(location.locality.is_none());
    }

    #[tokio::test]
    async fn test_unmatched_tokens_use_permutation_search() {
        let reference = reference();
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        // only the single-token query hits; the two-token orders miss
        let mut buon_ho = place(
            "node",
            2390001,
            "Buon Ho",
            json!({"town": "Buon Ho", "province": "Dak Lak Province", "country": "Viet Nam"}),
        );
        buon_ho["place_rank"] = json!(16);
        let api = MockApi::new()
            .with_search("Viet Nam", viet_nam())
            .with_search("Buon Ho, Viet Nam", buon_ho)
            .with_search(
                "Dak Lak Province, Viet Nam",
                place("relation", 1902793, "Dak Lak Province", json!({"province": "Dak Lak Province"})),
            );

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(
                &mut geocoder,
                &FreeTextLocation::new("Viet Nam: Buon Ho, Xa Ea Drong"),
            )
            .await
            .unwrap();

        assert_eq!(location.locality.unwrap().name, "Buon Ho");
        let admin = location.admin_level_1.unwrap();
        assert_eq!(admin.name, "Dak Lak Province");
        assert_eq!(admin.id.unwrap().as_str(), "R1902793");

        let calls = geocoder.api().calls();
        let search = |q: &str| crate::nominatim::NominatimRequest::search(q, 1).describe();
        // reversed token order: "Xa Ea Drong" before "Buon Ho"
        assert_eq!(calls[1], search("Xa Ea Drong, Buon Ho, Viet Nam"));
        assert_eq!(calls[2], search("Buon Ho, Xa Ea Drong, Viet Nam"));
        assert_eq!(calls[3], search("Xa Ea Drong, Viet Nam"));
        assert_eq!(calls[4], search("Buon Ho, Viet Nam"));
    }

    #[tokio::test]
    async fn test_strain_supplies_extra_area() {
        let reference = reference();
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let api = MockApi::new().with_search("Viet Nam", viet_nam());
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let input = FreeTextLocation::new("Viet Nam").with_strain("A/duck/Daklak/14/2015");
        let location = FreeTextResolver::new(context)
            .resolve(&mut geocoder, &input)
            .await
            .unwrap();

        assert_eq!(location.country.unwrap().name, "Viet Nam");
        assert!(geocoder
            .api()
            .calls()
            .contains(&crate::nominatim::NominatimRequest::search("Daklak, Viet Nam", 1).describe()));
    }

    #[tokio::test]
    async fn test_deeper_match_alone_still_searches_for_admin_level() {
        let reference = reference_with(&[("Buon Ho", 6, "R999")]);
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let api = MockApi::new()
            .with_search("Viet Nam", viet_nam())
            .with_search("Buon Ho, Viet Nam", buon_ho_town())
            .with_search("Dak Lak Province, Viet Nam", dak_lak());
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(&mut geocoder, &FreeTextLocation::new("Viet Nam: Buon Ho"))
            .await
            .unwrap();

        let admin = location.admin_level_1.unwrap();
        assert_eq!(admin.name, "Dak Lak Province");
        assert_eq!(admin.id.unwrap().as_str(), "R1902793");
        let locality = location.locality.unwrap();
        assert_eq!(locality.name, "Buon Ho");
        assert_eq!(locality.id.unwrap().as_str(), "N2390001");

        let search = |q: &str| crate::nominatim::NominatimRequest::search(q, 1).describe();
        assert_eq!(geocoder.api().calls()[1], search("Buon Ho, Viet Nam"));
    }

    #[tokio::test]
    async fn test_admin_match_and_deeper_match_fill_both_locally() {
        let reference = reference_with(&[("Buon Ho", 6, "R999")]);
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let api = MockApi::new().with_search("Viet Nam", viet_nam());
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(
                &mut geocoder,
                &FreeTextLocation::new("Viet Nam: Dak Lak Province, Buon Ho"),
            )
            .await
            .unwrap();

        let admin = location.admin_level_1.unwrap();
        assert_eq!(admin.name, "Dak Lak Province");
        assert_eq!(admin.id.unwrap().as_str(), "R1902793");
        let locality = location.locality.unwrap();
        assert_eq!(locality.name, "Buon Ho");
        assert_eq!(locality.id.unwrap().as_str(), "R999");

        // everything came from the gazetteer
        assert_eq!(geocoder.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_matches_below_admin_level_join_the_search() {
        let reference = reference_with(&[("Buon Ho", 8, "R999"), ("Krong Buk", 6, "R998")]);
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let api = MockApi::new()
            .with_search("Viet Nam", viet_nam())
            .with_search("Buon Ho, Krong Buk, Viet Nam", buon_ho_town())
            .with_search("Dak Lak Province, Viet Nam", dak_lak());
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(
                &mut geocoder,
                &FreeTextLocation::new("Viet Nam: Krong Buk, Buon Ho"),
            )
            .await
            .unwrap();

        assert_eq!(location.admin_level_1.unwrap().name, "Dak Lak Province");
        assert_eq!(location.locality.unwrap().id.unwrap().as_str(), "N2390001");

        // finer matched units first, then the country
        let search = |q: &str| crate::nominatim::NominatimRequest::search(q, 1).describe();
        assert_eq!(geocoder.api().calls()[1], search("Buon Ho, Krong Buk, Viet Nam"));
    }

    #[tokio::test]
    async fn test_admin_match_with_leftover_match_and_token() {
        let reference = reference_with(&[("Krong Buk", 6, "R998")]);
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let mut ea_drong = place(
            "node",
            2390002,
            "Xa Ea Drong",
            json!({"village": "Xa Ea Drong", "state": "Dak Lak Province", "country": "Viet Nam"}),
        );
        ea_drong["place_rank"] = json!(16);
        let api = MockApi::new()
            .with_search("Viet Nam", viet_nam())
            .with_search("Xa Ea Drong, Krong Buk, Dak Lak Province, Viet Nam", ea_drong);
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(
                &mut geocoder,
                &FreeTextLocation::new("Viet Nam: Dak Lak Province, Krong Buk, Xa Ea Drong"),
            )
            .await
            .unwrap();

        assert_eq!(location.admin_level_1.unwrap().id.unwrap().as_str(), "R1902793");
        let locality = location.locality.unwrap();
        assert_eq!(locality.name, "Xa Ea Drong");
        assert_eq!(locality.id.unwrap().as_str(), "N2390002");
        assert_eq!(geocoder.api().call_count(), 2);
    }

    #[tokio::test]
    async fn test_country_without_policy_takes_highest_level() {
        let reference = reference();
        assert_eq!(reference.policy.admin_level("GR"), None);
        let gazetteer = reference.gazetteer();
        let context = ResolutionContext::new(&reference, &gazetteer, 5);

        let mut athens = place(
            "node",
            1370736,
            "Athens",
            json!({
                "city": "Athens",
                "county": "Regional Unit of Central Athens",
                "state": "Attica",
                "country": "Greece"
            }),
        );
        athens["place_rank"] = json!(16);
        let api = MockApi::new()
            .with_search("Greece", place("relation", 192307, "Greece", json!({"country": "Greece"})))
            .with_search("Athens, Greece", athens)
            .with_search(
                "Attica, Greece",
                place("relation", 3535716, "Attica", json!({"state": "Attica"})),
            );
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let location = FreeTextResolver::new(context)
            .resolve(&mut geocoder, &FreeTextLocation::new("Greece: Athens"))
            .await
            .unwrap();

        assert_eq!(location.locality.unwrap().name, "Athens");
        let admin = location.admin_level_1.unwrap();
        assert_eq!(admin.name, "Attica");
        assert_eq!(admin.id.unwrap().as_str(), "R3535716");
    }
}
