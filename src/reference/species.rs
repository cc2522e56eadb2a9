use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Host species resolved from a synonym
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSpecies {
    pub ncbi_id: Option<String>,
    pub name: Option<String>,
    pub common_name: Option<String>,
}

/// Pathogen species resolved from a synonym
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathogenSpecies {
    pub ncbi_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostSpeciesRecord {
    host_species_synonym: String,
    host_species_ncbi_id: Option<String>,
    host_species_name: Option<String>,
    host_species_common_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathogenSpeciesRecord {
    pathogen_species_synonym: String,
    pathogen_species_ncbi_id: Option<String>,
    pathogen_species_name: Option<String>,
}

/// Synonym → species. The first row for a synonym wins.
#[derive(Debug, Clone)]
pub struct SpeciesTable<T> {
    by_synonym: HashMap<String, T>,
}

impl<T> Default for SpeciesTable<T> {
    fn default() -> Self {
        Self {
            by_synonym: HashMap::new(),
        }
    }
}

impl<T> SpeciesTable<T> {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, T)>,
    {
        let mut by_synonym = HashMap::new();
        for (synonym, species) in entries {
            by_synonym.entry(synonym).or_insert(species);
        }
        Self { by_synonym }
    }

    pub fn get(&self, synonym: &str) -> Option<&T> {
        self.by_synonym.get(synonym)
    }

    pub fn len(&self) -> usize {
        self.by_synonym.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_synonym.is_empty()
    }
}

pub type HostSpeciesTable = SpeciesTable<HostSpecies>;
pub type PathogenSpeciesTable = SpeciesTable<PathogenSpecies>;

fn load_entries<R, T>(path: &Path, split: impl Fn(R) -> (String, T)) -> Result<SpeciesTable<T>>
where
    R: DeserializeOwned,
{
    let mut reader = csv::Reader::from_path(path)?;
    let mut entries = Vec::new();
    for record in reader.deserialize::<R>() {
        entries.push(split(record?));
    }
    let table = SpeciesTable::from_entries(entries);
    info!("Loaded {} species synonyms from {}", table.len(), path.display());
    Ok(table)
}

impl HostSpeciesTable {
    /// Load `host_species.csv`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_entries(path.as_ref(), |r: HostSpeciesRecord| {
            let species = HostSpecies {
                ncbi_id: r.host_species_ncbi_id,
                name: r.host_species_name,
                common_name: r.host_species_common_name,
            };
            (r.host_species_synonym, species)
        })
    }
}

impl PathogenSpeciesTable {
    /// Load `pathogen_species.csv`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_entries(path.as_ref(), |r: PathogenSpeciesRecord| {
            let species = PathogenSpecies {
                ncbi_id: r.pathogen_species_ncbi_id,
                name: r.pathogen_species_name,
            };
            (r.pathogen_species_synonym, species)
        })
    }
}
