use crate::projection::world_pixel;
use crate::scene::{MarkerId, Scene};
use rstar::{RTree, RTreeObject, AABB};

// Circle of one symbol in world pixels at the indexed zoom
pub struct SymbolCircle {
    marker: MarkerId,
    center: [f64; 2],
    radius: f64,
}

impl RTreeObject for SymbolCircle {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.center[0] - self.radius, self.center[1] - self.radius],
            [self.center[0] + self.radius, self.center[1] + self.radius],
        )
    }
}

/// Hit testing for hover and click positions given as coordinates.
pub struct SymbolIndex {
    tree: RTree<SymbolCircle>,
    zoom: u8,
}

impl SymbolIndex {
    pub fn build(scene: &Scene, zoom: u8) -> Self {
        let circles: Vec<SymbolCircle> = scene
            .markers
            .iter()
            .filter(|m| m.style.radius.is_finite() && m.style.radius >= 0.0)
            .map(|m| {
                let (x, y) = world_pixel(m.lat, m.lon, zoom);
                SymbolCircle { marker: m.id, center: [x, y], radius: m.style.radius }
            })
            .collect();

        Self { tree: RTree::bulk_load(circles), zoom }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Topmost symbol under the point; later markers are drawn above
    /// earlier ones.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<MarkerId> {
        let (x, y) = world_pixel(lat, lon, self.zoom);
        let envelope = AABB::from_point([x, y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|c| {
                let dx = c.center[0] - x;
                let dy = c.center[1] - y;
                (dx * dx + dy * dy).sqrt() <= c.radius
            })
            .map(|c| c.marker)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SymbolConfig;
    use crate::scene::{MarkerStyle, RenderAdapter};
    use geo::Point;

    fn scene(markers: &[(f64, f64, f64)]) -> Scene {
        let mut scene = Scene::new();
        for (i, &(lat, lon, r)) in markers.iter().enumerate() {
            scene.add_circle_marker(i, Point::new(lon, lat), MarkerStyle::from_config(&SymbolConfig::default(), r));
        }
        scene
    }

    #[test]
    fn finds_symbol_under_point() {
        let index = SymbolIndex::build(&scene(&[(38.0, -95.0, 10.0), (20.0, 0.0, 10.0)]), 4);
        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(38.0, -95.0), Some(MarkerId(0)));
        assert_eq!(index.locate(20.0, 0.0), Some(MarkerId(1)));
        assert_eq!(index.locate(-40.0, 120.0), None);
    }

    #[test]
    fn corner_of_envelope_is_not_a_hit() {
        let index = SymbolIndex::build(&scene(&[(0.0, 0.0, 10.0)]), 0);
        // 9 px right and 9 px down is inside the box but outside the circle
        let (x, y) = world_pixel(0.0, 0.0, 0);
        let lon = (x + 9.0) / 256.0 * 360.0 - 180.0;
        assert_eq!(index.locate(0.0, lon), Some(MarkerId(0)));
        let lat = -((y + 9.0 - 128.0) / 256.0 * 360.0);
        assert_eq!(index.locate(lat, lon), None);
    }

    #[test]
    fn overlapping_symbols_pick_the_topmost() {
        let index = SymbolIndex::build(&scene(&[(10.0, 10.0, 30.0), (10.0, 10.0, 5.0)]), 3);
        assert_eq!(index.locate(10.0, 10.0), Some(MarkerId(1)));
    }

    #[test]
    fn nan_radius_is_not_indexed() {
        let index = SymbolIndex::build(&scene(&[(0.0, 0.0, f64::NAN)]), 2);
        assert!(index.is_empty());
    }
}
