use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::error::{GeoError, Result};

#[derive(Debug, Deserialize)]
struct LabelPointCollection {
    features: Vec<LabelPointFeature>,
}

#[derive(Debug, Deserialize)]
struct LabelPointFeature {
    properties: LabelPointProperties,
    geometry: PointGeometry,
}

#[derive(Debug, Deserialize)]
struct LabelPointProperties {
    #[serde(rename = "NUTS_ID")]
    nuts_id: String,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    /// `[longitude, latitude]`
    coordinates: Vec<f64>,
}

/// Representative point of a NUTS region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// NUTS code → label point, from the Eurostat `NUTS_LB` GeoJSON
#[derive(Debug, Clone, Default)]
pub struct NutsLabelPoints {
    points: HashMap<String, LabelPoint>,
}

impl NutsLabelPoints {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading NUTS label points from {}", path.display());

        let file = File::open(path).map_err(|e| GeoError::io(path, e))?;
        let collection: LabelPointCollection = serde_json::from_reader(BufReader::new(file))?;

        let mut points = HashMap::with_capacity(collection.features.len());
        for feature in collection.features {
            let [longitude, latitude] = *feature.geometry.coordinates.as_slice() else {
                return Err(GeoError::ReferenceData {
                    path: path.to_path_buf(),
                    message: format!("{} is not a point", feature.properties.nuts_id),
                });
            };
            points.insert(
                feature.properties.nuts_id,
                LabelPoint {
                    latitude,
                    longitude,
                },
            );
        }

        info!("Loaded {} NUTS label points", points.len());
        Ok(Self { points })
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (String, LabelPoint)>,
    {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn get(&self, nuts_code: &str) -> Option<LabelPoint> {
        self.points.get(nuts_code).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
