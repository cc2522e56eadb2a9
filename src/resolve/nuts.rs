//! Resolution of NUTS region codes (ECDC).
//!
//! A NUTS code does not always start with its country's ISO code, so the
//! country is found by reverse geocoding the region's label point. The code
//! is then cut to the depth the country's policy asks for and looked up in
//! the unit table; the reverse address is the fallback.

use tracing::{debug, warn};

use super::{identify_component, LocationResolver, ResolutionContext};
use crate::error::Result;
use crate::gazetteer::nuts_country_code;
use crate::models::{GeocodedLocation, ResolvedPlace};
use crate::nominatim::{get_admin_level_1, get_country_name, Geocoder, NominatimApi};

/// Length of the country prefix of a NUTS code
const NUTS_PREFIX_LEN: usize = 2;

/// Cut `code` to NUTS `level`, or `None` when it is too coarse for it.
pub fn truncate_nuts_code(code: &str, level: u8) -> Option<&str> {
    code.get(..NUTS_PREFIX_LEN + usize::from(level))
}

pub struct NutsResolver<'a> {
    context: ResolutionContext<'a>,
}

impl<'a> NutsResolver<'a> {
    pub fn new(context: ResolutionContext<'a>) -> Self {
        Self { context }
    }

    /// Country-level code: map the prefix to ISO and search the country name
    async fn resolve_country_code<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        code: &str,
    ) -> Result<GeocodedLocation> {
        let mut location = GeocodedLocation::default();
        let iso = nuts_country_code(code);
        let Some(name) = self.context.reference.countries.name_for(iso) else {
            warn!("No country for NUTS code {}", code);
            return Ok(location);
        };
        match geocoder.search(name).await? {
            Some(feature) => location.country = Some(ResolvedPlace::from_feature(&feature)),
            None => warn!("Couldn't resolve country '{}'", name),
        }
        Ok(location)
    }
}

impl LocationResolver for NutsResolver<'_> {
    type Input = String;

    async fn resolve<A: NominatimApi>(
        &self,
        geocoder: &mut Geocoder<'_, A>,
        input: &String,
    ) -> Result<GeocodedLocation> {
        let code = input.trim();
        let reference = self.context.reference;

        let Some(point) = reference.nuts_points.get(code) else {
            if code.len() == NUTS_PREFIX_LEN {
                return self.resolve_country_code(geocoder, code).await;
            }
            warn!("No label point for NUTS code '{}'", code);
            return Ok(GeocodedLocation::default());
        };

        let mut location = GeocodedLocation::default();
        let Some(feature) = geocoder.reverse(point.latitude, point.longitude).await? else {
            warn!("Nothing found at label point of {}", code);
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

        let Some(country_code) = reference.countries.code_for(country_name) else {
            warn!("No country code for '{}'", country_name);
            return Ok(location);
        };

        let region_code = match reference.policy.nuts_level(country_code) {
            Some(level) => match truncate_nuts_code(code, level) {
                Some(truncated) => truncated,
                None => {
                    warn!(
                        "NUTS code {} is too coarse for level {} in {}",
                        code, level, country_code
                    );
                    return Ok(location);
                }
            },
            None => {
                warn!("No NUTS level for {}, using {} as is", country_code, code);
                code
            }
        };
        debug!("NUTS code {} resolved as {}", code, region_code);

        if let Some(unit) = reference.nuts_index.get(region_code) {
            location.admin_level_1 = Some(unit.clone());
            return Ok(location);
        }

        let target_level = reference.policy.admin_level(country_code);
        match get_admin_level_1(&address, target_level) {
            Some(component) => {
                location.admin_level_1 =
                    Some(identify_component(geocoder, component, country_name).await?);
            }
            None => warn!("Admin level 1 not found for NUTS code {}", region_code),
        }

        Ok(location)
    }
}
