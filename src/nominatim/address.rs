//! Extraction of country, admin-level-1 and locality from an address hierarchy.

use crate::models::{Address, AddressComponent};

/// Semantic types accepted as a locality name, in priority order
pub const LOCALITY_KINDS: &[&str] = &["city", "town", "village", "hamlet"];

/// Nominatim's "locality-like" address rank band
const LOCALITY_RANKS: std::ops::RangeInclusive<u8> = 13..=25;

/// OSM admin_level of a country boundary
const COUNTRY_ADMIN_LEVEL: u8 = 2;

/// First present name among city, town, village, hamlet.
pub fn get_locality_name(address: &Address) -> Option<&str> {
    LOCALITY_KINDS.iter().find_map(|kind| address.get(kind))
}

pub fn get_country_name(address: &Address) -> Option<&str> {
    address.get("country")
}

/// Admin-level-1 component of an address.
///
/// With a target level, only a component at exactly that admin_level
/// qualifies. Without one, the coarsest sub-national boundary is taken.
pub fn get_admin_level_1(address: &Address, target: Option<u8>) -> Option<&AddressComponent> {
    match target {
        Some(level) => address.iter().find(|c| c.admin_level == Some(level)),
        None => address
            .iter()
            .filter(|c| matches!(c.admin_level, Some(level) if level > COUNTRY_ADMIN_LEVEL))
            .min_by_key(|c| c.admin_level),
    }
}

/// Least precise component inside the locality rank band.
///
/// Ties keep the first component in address order.
pub fn get_locality(address: &Address) -> Option<&AddressComponent> {
    address
        .iter()
        .filter(|c| matches!(c.rank_address, Some(rank) if LOCALITY_RANKS.contains(&rank)))
        .min_by_key(|c| c.rank_address)
}
