//! Country → candidate administrative-unit names.

use std::collections::HashMap;
use tracing::{debug, info};

use super::synonyms::SynonymExpander;
use super::transliterate::{transliterate, Transliteration};
use crate::models::{AdminUnit, GazetteerEntry};
use crate::reference::CountryTable;

/// Locally built gazetteer of administrative units.
///
/// Built once per run and read-only afterwards. Entries are grouped by
/// country code; country names resolve to codes through the country table
/// (overrides included).
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: HashMap<String, Vec<GazetteerEntry>>,
    country_codes: HashMap<String, String>,
}

impl Gazetteer {
    pub fn build(countries: &CountryTable, units: &[AdminUnit], synonyms: &SynonymExpander) -> Self {
        let mut entries: HashMap<String, Vec<GazetteerEntry>> = HashMap::new();
        for unit in units {
            entries
                .entry(unit.country_code.clone())
                .or_default()
                .extend(candidate_entries(unit, synonyms));
        }

        let country_codes = countries
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect();

        let gazetteer = Self {
            entries,
            country_codes,
        };
        info!(
            "Built gazetteer with {} entries for {} countries",
            gazetteer.entry_count(),
            gazetteer.entries.len()
        );
        gazetteer
    }

    /// Candidate entries for a country code; empty when unknown
    pub fn entries_for_code(&self, country_code: &str) -> &[GazetteerEntry] {
        self.entries
            .get(country_code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Candidate entries for a country name as spelled by the provider
    pub fn entries_for_country(&self, country_name: &str) -> &[GazetteerEntry] {
        self.country_codes
            .get(country_name)
            .map(|code| self.entries_for_code(code))
            .unwrap_or_default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Every candidate name for one unit: exonym, endonym, transliterated
/// endonym, then synonym variants of each.
pub fn candidate_entries(unit: &AdminUnit, synonyms: &SynonymExpander) -> Vec<GazetteerEntry> {
    let mut names: Vec<String> = Vec::new();

    if let Some(exonym) = unit.exonym.as_deref().filter(|s| !s.is_empty()) {
        names.push(exonym.to_string());
    }

    if let Some(endonym) = unit.endonym.as_deref().filter(|s| !s.is_empty()) {
        names.push(endonym.to_string());

        match transliterate(endonym) {
            Transliteration::Latin(latin) => names.push(latin),
            Transliteration::AlreadyLatin => {}
            Transliteration::UnsupportedScript { name } => {
                debug!("No transliteration for \"{}\" ({})", name, unit.osm_id);
            }
        }
    }

    let variants: Vec<String> = names
        .iter()
        .flat_map(|name| synonyms.expand(name))
        .collect();
    names.extend(variants);

    names
        .into_iter()
        .map(|name| GazetteerEntry {
            country_code: unit.country_code.clone(),
            name,
            admin_level: unit.admin_level,
            osm_id: unit.osm_id.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureId;

    fn unit(code: &str, exonym: Option<&str>, endonym: Option<&str>, level: u8, id: &str) -> AdminUnit {
        AdminUnit {
            country_code: code.to_string(),
            exonym: exonym.map(str::to_string),
            endonym: endonym.map(str::to_string),
            nuts_codes: Vec::new(),
            admin_level: level,
            osm_id: FeatureId::parse(id).unwrap(),
        }
    }

    #[test]
    fn test_candidates_include_synonym_variant() {
        let synonyms = SynonymExpander::with_defaults().unwrap();
        let amur = unit("RU", Some("Amur Oblast"), Some("Амурская область"), 4, "R147166");

        let names: Vec<String> = candidate_entries(&amur, &synonyms)
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(names[0], "Amur Oblast");
        assert_eq!(names[1], "Амурская область");
        assert!(names[2].starts_with("Amursk"));
        assert!(names.contains(&"Amur Region".to_string()));
    }

    #[test]
    fn test_no_variant_inside_longer_word() {
        let synonyms = SynonymExpander::with_defaults().unwrap();
        let town = unit("US", Some("Oblastville"), None, 8, "R1");
        let names: Vec<String> = candidate_entries(&town, &synonyms)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Oblastville"]);
    }

    #[test]
    fn test_unsupported_script_yields_no_transliteration() {
        let synonyms = SynonymExpander::new();
        let bangkok = unit("TH", Some("Bangkok"), Some("กรุงเทพมหานคร"), 4, "R92277");
        let entries = candidate_entries(&bangkok, &synonyms);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.admin_level == 4 && e.osm_id.as_str() == "R92277"));
    }

    #[test]
    fn test_lookup_by_country_name_and_override() {
        let countries = CountryTable::from_pairs([("Viet Nam", "VN"), ("Russian Federation", "RU")]);
        let units = vec![
            unit("VN", Some("Dak Lak Province"), Some("Tỉnh Đắk Lắk"), 4, "R1902793"),
            unit("RU", Some("Amur Oblast"), None, 4, "R147166"),
        ];
        let gazetteer = Gazetteer::build(&countries, &units, &SynonymExpander::new());

        assert_eq!(gazetteer.entries_for_country("Viet Nam").len(), 2);
        // "Vietnam" and "Russia" come from the override list
        assert_eq!(gazetteer.entries_for_country("Vietnam").len(), 2);
        assert_eq!(gazetteer.entries_for_country("Russia").len(), 1);
        assert!(gazetteer.entries_for_country("Atlantis").is_empty());
        assert_eq!(gazetteer.entry_count(), 3);
    }
}
