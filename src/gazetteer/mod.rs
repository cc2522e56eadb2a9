//! Local administrative-unit gazetteer and admin-level-1 policy table.

pub mod builder;
pub mod policy;
pub mod synonyms;
pub mod transliterate;

pub use builder::{candidate_entries, Gazetteer};
pub use policy::{is_nuts_country, nuts_country_code, PolicyTable};
pub use synonyms::SynonymExpander;
pub use transliterate::{transliterate, Transliteration};
