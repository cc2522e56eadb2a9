//! epigeo - geocoding and normalization of epidemiological surveillance data
//!
//! This library provides the feature cache, the Nominatim client, the local
//! administrative-unit gazetteer and the per-source resolvers used by the
//! `epigeo` binary.

pub mod cache;
pub mod config;
pub mod error;
pub mod gazetteer;
pub mod models;
pub mod nominatim;
pub mod records;
pub mod reference;
pub mod resolve;
pub mod workflow;

pub use cache::FeatureCache;
pub use error::{GeoError, Result};
pub use models::{Feature, FeatureId, GeocodedLocation, OsmType, ResolvedPlace};
pub use resolve::DataSource;
