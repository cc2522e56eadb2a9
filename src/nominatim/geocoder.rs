//! Cache-first feature retrieval.
//!
//! Every lookup goes through [`Geocoder::get_feature`]: the cache is asked
//! first, and only on a miss is one request sent to the remote service.
//! Found features are stored together with the term that found them, so a
//! given id or (term, term type) pair costs at most one remote call for the
//! lifetime of the cache. Terms that found nothing are remembered for the
//! rest of the run.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::api::{NominatimApi, NominatimRequest};
use super::normalize::{excluded_type, normalize_feature};
use crate::cache::FeatureCache;
use crate::config::GeocoderConfig;
use crate::error::Result;
use crate::models::{Feature, FeatureId};

/// Discriminator stored next to each cached lookup term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermType {
    Coordinate,
    Query,
    Id,
}

impl TermType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermType::Coordinate => "coordinate",
            TermType::Query => "query",
            TermType::Id => "id",
        }
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a feature is looked up in the cache before going remote
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Id(FeatureId),
    Term { term: String, term_type: TermType },
}

impl CacheKey {
    fn miss_key(&self) -> (String, TermType) {
        match self {
            CacheKey::Id(id) => (id.as_str().to_string(), TermType::Id),
            CacheKey::Term { term, term_type } => (term.clone(), *term_type),
        }
    }

    fn term(&self) -> &str {
        match self {
            CacheKey::Id(id) => id.as_str(),
            CacheKey::Term { term, .. } => term,
        }
    }
}

/// Cache-backed gazetteer client.
///
/// Borrows the run's [`FeatureCache`]; the remote side is any
/// [`NominatimApi`] implementation.
pub struct Geocoder<'c, A> {
    api: A,
    cache: &'c FeatureCache,
    request_delay: Duration,
    search_limit: u32,
    reverse_zoom: u8,
    misses: HashSet<(String, TermType)>,
    remote_calls: usize,
}

impl<'c, A: NominatimApi> Geocoder<'c, A> {
    pub fn new(api: A, cache: &'c FeatureCache, config: &GeocoderConfig) -> Self {
        Self {
            api,
            cache,
            request_delay: config.request_delay(),
            search_limit: config.search_limit,
            reverse_zoom: config.reverse_zoom,
            misses: HashSet::new(),
            remote_calls: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &FeatureCache {
        self.cache
    }

    /// Outbound requests issued so far in this run
    pub fn remote_calls(&self) -> usize {
        self.remote_calls
    }

    /// Fetch a feature from the cache, or from the remote service on a miss.
    ///
    /// `Ok(None)` means the service found nothing usable: an empty answer,
    /// a first result of an excluded place type, or a malformed record.
    pub async fn get_feature(
        &mut self,
        request: NominatimRequest,
        key: CacheKey,
    ) -> Result<Option<Feature>> {
        let cached = match &key {
            CacheKey::Id(id) => self.cache.get_by_id(id)?,
            CacheKey::Term { term, .. } => self.cache.find_by_term(term)?,
        };
        if let Some(feature) = cached {
            info!("Fetched \"{}\" from cache", feature.label());
            return Ok(Some(feature));
        }

        let miss_key = key.miss_key();
        if self.misses.contains(&miss_key) {
            debug!("Skipping \"{}\", no result earlier in this run", key.term());
            return Ok(None);
        }

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        self.remote_calls += 1;
        let results = self.api.execute(&request).await?;

        let Some(raw) = results.first() else {
            info!("No results found for \"{}\"", key.term());
            self.misses.insert(miss_key);
            return Ok(None);
        };

        if let Some(place_type) = excluded_type(raw) {
            info!(
                "Ignoring result of type \"{}\" for \"{}\"",
                place_type,
                key.term()
            );
            self.misses.insert(miss_key);
            return Ok(None);
        }

        let feature = match normalize_feature(raw) {
            Ok(feature) => feature,
            Err(e) => {
                warn!("Unusable result for \"{}\": {}", key.term(), e);
                self.misses.insert(miss_key);
                return Ok(None);
            }
        };

        match &key {
            CacheKey::Id(_) => self.cache.save(&feature, None)?,
            CacheKey::Term { term, term_type } => {
                self.cache.save(&feature, Some((term.as_str(), *term_type)))?
            }
        }

        info!("Fetched \"{}\" from remote source", feature.label());
        Ok(Some(feature))
    }

    /// Free-text search, cached under the query text
    pub async fn search(&mut self, query: &str) -> Result<Option<Feature>> {
        let request = NominatimRequest::search(query, self.search_limit);
        self.get_feature(
            request,
            CacheKey::Term {
                term: query.to_string(),
                term_type: TermType::Query,
            },
        )
        .await
    }

    /// Reverse geocode, cached under `"<lat>, <lon>"`
    pub async fn reverse(&mut self, latitude: f64, longitude: f64) -> Result<Option<Feature>> {
        let request = NominatimRequest::Reverse {
            latitude,
            longitude,
            zoom: self.reverse_zoom,
        };
        self.get_feature(
            request,
            CacheKey::Term {
                term: coordinate_term(latitude, longitude),
                term_type: TermType::Coordinate,
            },
        )
        .await
    }

    /// Feature by id
    pub async fn lookup(&mut self, id: &FeatureId) -> Result<Option<Feature>> {
        let request = NominatimRequest::Lookup {
            ids: vec![id.clone()],
        };
        self.get_feature(request, CacheKey::Id(id.clone())).await
    }
}

pub fn coordinate_term(latitude: f64, longitude: f64) -> String {
    format!("{}, {}", latitude, longitude)
}
