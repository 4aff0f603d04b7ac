use geo::Point;
use geojson::JsonObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct PointFeature {
    pub id: usize,
    // None for features whose geometry is missing or not a point
    pub location: Option<Point<f64>>,
    // Declaration order is preserved (serde_json preserve_order)
    pub properties: JsonObject,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<PointFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<PointFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features that carry a point and therefore get a symbol.
    pub fn points(&self) -> impl Iterator<Item = (&PointFeature, Point<f64>)> {
        self.features
            .iter()
            .filter_map(|f| f.location.map(|p| (f, p)))
    }

    pub fn get(&self, id: usize) -> Option<&PointFeature> {
        self.features.get(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}
