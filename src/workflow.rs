//! Top-level operations behind the `epigeo` subcommands.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};

use crate::cache::FeatureCache;
use crate::config::Config;
use crate::error::{GeoError, Result};
use crate::gazetteer::Gazetteer;
use crate::models::{Feature, FeatureId, GeocodedLocation};
use crate::nominatim::{Geocoder, NominatimApi};
use crate::records::sampling::DRY_RUN_ROWS;
use crate::records::{
    read_source, sample_rows, write_geometries, write_records, LocationQuery, NormalizedRecord,
    SamplingMode, SourceRecord,
};
use crate::reference::ReferenceData;
use crate::resolve::{
    CoordinateResolver, DataSource, FreeTextResolver, LocationResolver, NutsResolver,
    ResolutionContext,
};

/// Directory created under the output directory
pub const OUTPUT_DIR_NAME: &str = "epigeo_output";
const GEOMETRY_DIR_NAME: &str = "geometries";

/// Arguments of one `normalize` run
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub source: DataSource,
    pub input: PathBuf,
    /// Output file name; `<input stem>_normalized.tsv` by default
    pub output_file: Option<String>,
    /// Parent of the output tree; the working directory by default
    pub output_dir: Option<PathBuf>,
    pub write_geometries: bool,
    pub dry_run: bool,
    pub sample_mode: SamplingMode,
}

impl NormalizeOptions {
    pub fn new(source: DataSource, input: impl Into<PathBuf>) -> Self {
        Self {
            source,
            input: input.into(),
            output_file: None,
            output_dir: None,
            write_geometries: false,
            dry_run: false,
            sample_mode: SamplingMode::Top,
        }
    }

    /// `<output_dir>/epigeo_output/<source>`
    pub fn target_dir(&self) -> Result<PathBuf> {
        let base = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| GeoError::io(".", e))?,
        };
        Ok(base.join(OUTPUT_DIR_NAME).join(self.source.as_str()))
    }

    pub fn output_file_name(&self) -> String {
        match &self.output_file {
            Some(name) => name.clone(),
            None => {
                let stem = self
                    .input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.source.as_str().to_string());
                format!("{}_normalized.tsv", stem)
            }
        }
    }
}

/// What a `normalize` run produced
#[derive(Debug, Clone)]
pub struct NormalizeSummary {
    pub output_file: PathBuf,
    pub geometry_files: Vec<PathBuf>,
    pub records: usize,
    pub remote_calls: usize,
}

/// Read, resolve and write one source export.
pub async fn normalize_data<A: NominatimApi>(
    options: &NormalizeOptions,
    reference: &ReferenceData,
    geocoder: &mut Geocoder<'_, A>,
    max_permutation_tokens: usize,
) -> Result<NormalizeSummary> {
    info!(
        "Normalizing {} data from {}",
        options.source.label(),
        options.input.display()
    );

    // output location is checked before any remote call
    let target_dir = options.target_dir()?;
    fs::create_dir_all(&target_dir).map_err(|_| {
        GeoError::Config(format!(
            "output directory '{}' appears to be non-writable",
            target_dir.display()
        ))
    })?;

    let mut rows = read_source(options.source, &options.input, reference)?;
    if options.dry_run {
        info!("Dry run: keeping {} rows ({:?})", DRY_RUN_ROWS, options.sample_mode);
        rows = sample_rows(rows, options.sample_mode, DRY_RUN_ROWS);
    }

    let gazetteer = match options.source {
        DataSource::Genbank => reference.gazetteer(),
        DataSource::Empresi | DataSource::Ecdc => Gazetteer::default(),
    };
    let context = ResolutionContext::new(reference, &gazetteer, max_permutation_tokens);

    let mut records = resolve_records(rows, context, geocoder).await?;
    if options.source == DataSource::Ecdc {
        let before = records.len();
        records.retain(|record| record.location.country.is_some());
        if records.len() < before {
            info!("Dropped {} rows without a country", before - records.len());
        }
    }

    let output_file = target_dir.join(options.output_file_name());
    write_records(&output_file, &records)?;

    let geometry_files = if options.write_geometries {
        let features = collect_features(geocoder, &records).await?;
        write_geometries(target_dir.join(GEOMETRY_DIR_NAME), &features)?
    } else {
        Vec::new()
    };

    info!(
        "Normalization complete: {} records, {} remote requests",
        records.len(),
        geocoder.remote_calls()
    );

    Ok(NormalizeSummary {
        output_file,
        geometry_files,
        records: records.len(),
        remote_calls: geocoder.remote_calls(),
    })
}

/// Resolve every record's location, one row at a time
pub async fn resolve_records<A: NominatimApi>(
    rows: Vec<SourceRecord>,
    context: ResolutionContext<'_>,
    geocoder: &mut Geocoder<'_, A>,
) -> Result<Vec<NormalizedRecord>> {
    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut records = Vec::with_capacity(rows.len());
    for (index, SourceRecord { mut record, query }) in rows.into_iter().enumerate() {
        record.location = resolve_query(context, geocoder, &query)
            .instrument(info_span!("row", index))
            .await?;
        records.push(record);
        pb.inc(1);
    }

    pb.finish_with_message("Geocoding complete");
    Ok(records)
}

async fn resolve_query<A: NominatimApi>(
    context: ResolutionContext<'_>,
    geocoder: &mut Geocoder<'_, A>,
    query: &LocationQuery,
) -> Result<GeocodedLocation> {
    match query {
        LocationQuery::Coordinate(coordinate) => {
            CoordinateResolver::new(context)
                .resolve(geocoder, coordinate)
                .await
        }
        LocationQuery::FreeText(text) => FreeTextResolver::new(context).resolve(geocoder, text).await,
        LocationQuery::Nuts(code) => NutsResolver::new(context).resolve(geocoder, code).await,
        LocationQuery::Missing => {
            warn!("No location information");
            Ok(GeocodedLocation::default())
        }
    }
}

/// Features referenced by the records.
///
/// Ids taken from the local gazetteer are not cached yet and are fetched
/// by id lookup.
pub async fn collect_features<A: NominatimApi>(
    geocoder: &mut Geocoder<'_, A>,
    records: &[NormalizedRecord],
) -> Result<Vec<Feature>> {
    let mut seen = HashSet::new();
    let ids: Vec<FeatureId> = records
        .iter()
        .flat_map(|record| record.feature_ids())
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect();

    let mut features = geocoder.cache().get_by_ids(&ids)?;
    let cached: HashSet<FeatureId> = features.iter().map(|f| f.id.clone()).collect();

    for id in ids.iter().filter(|id| !cached.contains(*id)) {
        match geocoder.lookup(id).await? {
            Some(feature) => features.push(feature),
            None => warn!("No geometry found for {}", id),
        }
    }
    Ok(features)
}

/// Delete the feature cache file. Returns whether one existed.
pub fn clear_cache(config: &Config) -> Result<bool> {
    let path = config.cache_path()?;
    let removed = FeatureCache::delete_store(&path)?;
    if removed {
        info!("Deleted feature cache {}", path.display());
    } else {
        info!("No feature cache at {}", path.display());
    }
    Ok(removed)
}

/// Merging normalized files is not implemented.
pub fn merge_data() -> Result<()> {
    warn!("merge is not implemented yet, nothing to do");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocoderConfig;
    use crate::nominatim::mock::{place, MockApi};
    use crate::reference::fixtures;
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

    #[test]
    fn test_output_paths() {
        let mut options = NormalizeOptions::new(DataSource::Genbank, "/data/sequences.csv");
        options.output_dir = Some(PathBuf::from("/tmp/out"));
        assert_eq!(
            options.target_dir().unwrap(),
            PathBuf::from("/tmp/out/epigeo_output/genbank")
        );
        assert_eq!(options.output_file_name(), "sequences_normalized.tsv");

        options.output_file = Some("custom.tsv".to_string());
        assert_eq!(options.output_file_name(), "custom.tsv");
    }

    #[tokio::test]
    async fn test_normalize_genbank_file() {
        let reference = reference();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sequences.csv");
        fs::write(
            &input,
            "Pathogen NCBI taxonomy ID,Pathogen species,Pathogen isolate or strain,Date observed,Geo text original\n\
             102793,Influenza A virus,A/duck/Vietnam/1/2015,2015-03-02,\"Viet Nam: Dak Lak Province, Buon Ho\"\n\
             102793,Influenza A virus,,2016,\n",
        )
        .unwrap();

        let mut buon_ho = place(
            "node",
            2390001,
            "Buon Ho",
            json!({"town": "Buon Ho", "state": "Dak Lak Province", "country": "Viet Nam"}),
        );
        buon_ho["place_rank"] = json!(16);
        let api = MockApi::new()
            .with_search(
                "Viet Nam",
                place("relation", 49915, "Viet Nam", json!({"country": "Viet Nam"})),
            )
            .with_search("Vietnam, Buon Ho, Dak Lak Province, Viet Nam", buon_ho);

        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let mut options = NormalizeOptions::new(DataSource::Genbank, &input);
        options.output_dir = Some(dir.path().to_path_buf());
        let summary = normalize_data(&options, &reference, &mut geocoder, 5)
            .await
            .unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(
            summary.output_file,
            dir.path()
                .join("epigeo_output/genbank/sequences_normalized.tsv")
        );

        let content = fs::read_to_string(&summary.output_file).unwrap();
        let rows: Vec<Vec<&str>> = content
            .lines()
            .skip(1)
            .map(|line| line.split('\t').collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2015-03-02");
        assert_eq!(rows[0][11], "Viet Nam");
        assert_eq!(rows[0][12], "Dak Lak Province");
        assert_eq!(rows[0][13], "Buon Ho");
        assert_eq!(rows[0][16], "N2390001");
        assert_eq!(rows[1][0], "2016-01-01");
        assert_eq!(rows[1][11], "");
    }

    #[tokio::test]
    async fn test_normalize_ecdc_drops_unresolved_countries() {
        let reference = reference();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ecdc.csv");
        fs::write(
            &input,
            "Subject,Classification,DateOfNotificationISOdate,Imported,PlaceOfInfection,ReportingCountry\n\
             WNF,CONF,2021-08-20,N,,EL\n\
             WNF,CONF,2021-08-21,N,ZZ999,EL\n\
             WNF,PROB,2021-08-22,N,,EL\n",
        )
        .unwrap();

        let api = MockApi::new().with_search(
            "Greece",
            place("relation", 192307, "Greece", json!({"country": "Greece"})),
        );
        let cache = FeatureCache::open_in_memory().unwrap();
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let mut options = NormalizeOptions::new(DataSource::Ecdc, &input);
        options.output_dir = Some(dir.path().to_path_buf());
        let summary = normalize_data(&options, &reference, &mut geocoder, 5)
            .await
            .unwrap();

        assert_eq!(summary.records, 1);
        let content = fs::read_to_string(&summary.output_file).unwrap();
        assert!(content.contains("Greece"));
        assert!(content.contains("West Nile virus"));
    }

    #[tokio::test]
    async fn test_geometries_for_uncached_ids_are_looked_up() {
        let cache = FeatureCache::open_in_memory().unwrap();
        let id = FeatureId::parse("R1902793").unwrap();
        let api = MockApi::new().with_lookup(
            &id,
            place("relation", 1902793, "Dak Lak Province", json!({"state": "Dak Lak Province"})),
        );
        let mut geocoder = Geocoder::new(api, &cache, &config());

        let record = NormalizedRecord {
            location: GeocodedLocation {
                admin_level_1: Some(crate::models::ResolvedPlace::new(
                    "Dak Lak Province",
                    Some(id.clone()),
                )),
                ..GeocodedLocation::default()
            },
            ..NormalizedRecord::default()
        };

        let features = collect_features(&mut geocoder, &[record.clone(), record])
            .await
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, id);
        assert_eq!(geocoder.api().call_count(), 1);
    }

    #[test]
    fn test_clear_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.work_dir = Some(dir.path().to_path_buf());

        let cache = FeatureCache::open(config.cache_path().unwrap()).unwrap();
        drop(cache);
        assert!(clear_cache(&config).unwrap());
        assert!(!clear_cache(&config).unwrap());
    }
}
