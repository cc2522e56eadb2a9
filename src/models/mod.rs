//! Core data models for the geocoding engine.

pub mod admin;
pub mod feature;
pub mod location;

pub use admin::{AdminLevelPolicy, AdminUnit, GazetteerEntry};
pub use feature::{Address, AddressComponent, BoundingBox, Feature, FeatureId, OsmType};
pub use location::{GeocodedLocation, ResolvedPlace};
