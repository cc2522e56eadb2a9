//! Nominatim gazetteer: HTTP client, response normalization, address
//! helpers and the cache-first geocoder.

pub mod address;
pub mod api;
pub mod geocoder;
pub mod normalize;

#[cfg(test)]
pub(crate) mod mock;

pub use address::{get_admin_level_1, get_country_name, get_locality, get_locality_name};
pub use api::{NominatimApi, NominatimClient, NominatimRequest};
pub use geocoder::{coordinate_term, CacheKey, Geocoder, TermType};
pub use normalize::{create_feature_id, normalize_feature, RawPlace};
