//! Static reference tables shipped next to the binary.
//!
//! All tables are read once per run and never modified. File names are
//! fixed; the directory comes from `paths.reference_dir`.

pub mod admin_units;
pub mod countries;
pub mod nuts;
pub mod species;

use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{GeoError, Result};
use crate::gazetteer::{Gazetteer, PolicyTable, SynonymExpander};
use crate::models::AdminUnit;

pub use admin_units::{load_admin_units, NutsIndex};
pub use countries::{CountryTable, COUNTRY_NAME_OVERRIDES};
pub use nuts::{LabelPoint, NutsLabelPoints};
pub use species::{
    HostSpecies, HostSpeciesTable, PathogenSpecies, PathogenSpeciesTable, SpeciesTable,
};

pub const COUNTRIES_FILE: &str = "countries.csv";
pub const ADMIN_UNITS_FILE: &str = "administrative_units.tsv";
pub const ADMIN_LEVEL_1_FILE: &str = "admin_level_1.csv";
pub const NUTS_LABEL_POINTS_FILE: &str = "NUTS_LB_2021_4326.geojson";
pub const HOST_SPECIES_FILE: &str = "host_species.csv";
pub const PATHOGEN_SPECIES_FILE: &str = "pathogen_species.csv";
/// Optional extra synonym rules
pub const SYNONYMS_FILE: &str = "synonyms.txt";

/// Position of a named column, or a reference-data error naming the file
pub(crate) fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| GeoError::ReferenceData {
            path: path.to_path_buf(),
            message: format!("column '{}' not found", name),
        })
}

/// Every reference table a normalization run needs
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub countries: CountryTable,
    pub admin_units: Vec<AdminUnit>,
    pub policy: PolicyTable,
    pub nuts_points: NutsLabelPoints,
    pub nuts_index: NutsIndex,
    pub host_species: HostSpeciesTable,
    pub pathogen_species: PathogenSpeciesTable,
    pub synonyms: SynonymExpander,
}

impl ReferenceData {
    /// Load all tables from `dir`.
    ///
    /// The admin-level-1 policy is read from `admin_level_1.csv` when
    /// present and computed from the unit table otherwise.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(GeoError::Config(format!(
                "reference data directory '{}' does not exist",
                dir.display()
            )));
        }
        info!("Loading reference data from {}", dir.display());

        let countries = CountryTable::load(require(dir, COUNTRIES_FILE)?)?;
        let admin_units = load_admin_units(require(dir, ADMIN_UNITS_FILE)?)?;

        let policy_path = dir.join(ADMIN_LEVEL_1_FILE);
        let policy = if policy_path.is_file() {
            PolicyTable::load_csv(&policy_path)?
        } else {
            info!("{} not found, computing policy", policy_path.display());
            PolicyTable::build(countries.codes(), &admin_units)
        };

        let nuts_points = NutsLabelPoints::load(require(dir, NUTS_LABEL_POINTS_FILE)?)?;
        let nuts_index = NutsIndex::build(&admin_units);
        let host_species = HostSpeciesTable::load(require(dir, HOST_SPECIES_FILE)?)?;
        let pathogen_species = PathogenSpeciesTable::load(require(dir, PATHOGEN_SPECIES_FILE)?)?;

        let mut synonyms = SynonymExpander::with_defaults()?;
        let synonyms_path = dir.join(SYNONYMS_FILE);
        if synonyms_path.is_file() {
            synonyms.load_file(&synonyms_path)?;
        }

        Ok(Self {
            countries,
            admin_units,
            policy,
            nuts_points,
            nuts_index,
            host_species,
            pathogen_species,
            synonyms,
        })
    }

    /// Build the local gazetteer from the loaded tables
    pub fn gazetteer(&self) -> Gazetteer {
        Gazetteer::build(&self.countries, &self.admin_units, &self.synonyms)
    }
}

fn require(dir: &Path, file: &str) -> Result<PathBuf> {
    let path = dir.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(GeoError::ReferenceData {
            path,
            message: "file not found".to_string(),
        })
    }
}
