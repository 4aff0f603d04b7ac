use crate::attributes::AttributeDescriptor;
use crate::config::SymbolConfig;
use crate::popup::PopupBuilder;
use crate::scene::{MarkerId, MarkerStyle, Popup, RenderAdapter};
use crate::stats::{coerce_number, is_truthy, SummaryStats};
use crate::types::FeatureCollection;
use serde::Serialize;
use std::f64::consts::PI;
use tracing::debug;

/// Treats a value as a circle area and returns the matching radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadiusScaler {
    scale_factor: f64,
}

impl RadiusScaler {
    pub fn new(scale_factor: f64) -> Self {
        Self { scale_factor }
    }

    /// `sqrt(value * scale_factor / PI)`; NaN for negative values.
    pub fn radius(&self, value: f64) -> f64 {
        let area = value * self.scale_factor;
        (area / PI).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub marker: MarkerId,
    pub feature: usize,
    pub radius: f64,
}

#[derive(Debug, Clone)]
pub struct SymbolLayer {
    symbols: Vec<Symbol>,
    scaler: RadiusScaler,
    popups: PopupBuilder,
}

impl SymbolLayer {
    pub fn create<R: RenderAdapter>(
        collection: &FeatureCollection,
        attribute: &AttributeDescriptor,
        config: &SymbolConfig,
        popups: PopupBuilder,
        adapter: &mut R,
    ) -> Self {
        let scaler = RadiusScaler::new(config.scale_factor);
        let mut symbols = Vec::new();

        for (feature, location) in collection.points() {
            let value = coerce_number(feature.properties.get(&attribute.key));
            let radius = scaler.radius(value);

            let marker = adapter.add_circle_marker(feature.id, location, MarkerStyle::from_config(config, radius));
            adapter.bind_popup(marker, popup_for(&popups, &feature.properties, attribute, radius));

            symbols.push(Symbol { marker, feature: feature.id, radius });
        }

        debug!("Created {} symbols for {}", symbols.len(), attribute.key);
        Self { symbols, scaler, popups }
    }

    /// Resizes to a new attribute. Symbols without a usable value for it
    /// keep their previous size and popup.
    pub fn update<R: RenderAdapter>(
        &mut self,
        collection: &FeatureCollection,
        attribute: &AttributeDescriptor,
        adapter: &mut R,
    ) -> usize {
        let mut updated = 0;

        for symbol in &mut self.symbols {
            let properties = match collection.get(symbol.feature) {
                Some(f) => &f.properties,
                None => continue,
            };
            let raw = properties.get(&attribute.key);
            if !is_truthy(raw) {
                continue;
            }

            let radius = self.scaler.radius(coerce_number(raw));
            symbol.radius = radius;
            adapter.set_radius(symbol.marker, radius);
            adapter.bind_popup(symbol.marker, popup_for(&self.popups, properties, attribute, radius));
            updated += 1;
        }

        debug!("Resized {}/{} symbols for {}", updated, self.symbols.len(), attribute.key);
        updated
    }

    /// Statistics over every rendered symbol.
    pub fn stats(&self, collection: &FeatureCollection, attribute: &AttributeDescriptor) -> SummaryStats {
        SummaryStats::for_attribute(
            self.symbols
                .iter()
                .filter_map(|s| collection.get(s.feature))
                .map(|f| &f.properties),
            &attribute.key,
        )
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbol(&self, marker: MarkerId) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.marker == marker)
    }

    pub fn scaler(&self) -> &RadiusScaler {
        &self.scaler
    }

    pub fn popups(&self) -> &PopupBuilder {
        &self.popups
    }
}

fn popup_for(
    popups: &PopupBuilder,
    properties: &geojson::JsonObject,
    attribute: &AttributeDescriptor,
    radius: f64,
) -> Popup {
    Popup {
        content: popups.popup(properties, attribute),
        offset: [0.0, -radius],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PopupConfig;
    use crate::scene::Scene;
    use crate::types::fixtures::{collection, three_cities, time_series};
    use serde_json::json;

    fn layer(fc: &FeatureCollection, key: &str, scene: &mut Scene) -> SymbolLayer {
        SymbolLayer::create(
            fc,
            &AttributeDescriptor::from_key(key),
            &SymbolConfig::default(),
            PopupBuilder::from_config(&PopupConfig::default()),
            scene,
        )
    }

    #[test]
    fn radius_of_zero_is_zero() {
        assert_eq!(RadiusScaler::new(1.5).radius(0.0), 0.0);
        assert_eq!(RadiusScaler::new(20.0).radius(0.0), 0.0);
    }

    #[test]
    fn radius_matches_area_formula() {
        let scaler = RadiusScaler::new(1.5);
        let r = scaler.radius(30.0);
        assert!((r - (45.0 / PI).sqrt()).abs() < 1e-12);
        assert!((r - 3.78).abs() < 0.01);

        for v in [0.5, 2.0, 1000.0] {
            let r20 = RadiusScaler::new(20.0).radius(v);
            assert!((r20 - (v * 20.0 / PI).sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn radius_is_monotonic_for_non_negative_values() {
        let scaler = RadiusScaler::new(1.5);
        let radii: Vec<f64> = (0..200).map(|i| scaler.radius(i as f64 * 0.75)).collect();
        assert!(radii.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn negative_values_give_nan() {
        assert!(RadiusScaler::new(1.5).radius(-1.0).is_nan());
    }

    #[test]
    fn one_marker_per_point_with_offset_popup() {
        let mut fc = three_cities();
        fc.features[1].location = None;
        let mut scene = Scene::new();
        let layer = layer(&fc, "Pop_1990", &mut scene);

        assert_eq!(layer.symbols().len(), 2);
        assert_eq!(scene.markers.len(), 2);
        let third = scene.marker(layer.symbols()[1].marker).unwrap();
        assert_eq!(third.feature, 2);
        let popup = third.popup.as_ref().unwrap();
        assert_eq!(popup.offset, [0.0, -third.style.radius]);
        assert!(popup.content.contains("<p>City: C</p>"));
    }

    #[test]
    fn update_skips_falsy_values() {
        let fc = time_series();
        let mut scene = Scene::new();
        let mut layer = layer(&fc, "Pop_2000", &mut scene);
        let before = layer.symbols()[0].radius;

        // City A has Pop_2010 = 0 and keeps its Pop_2000 radius
        let updated = layer.update(&fc, &AttributeDescriptor::from_key("Pop_2010"), &mut scene);
        assert_eq!(updated, 2);
        assert_eq!(layer.symbols()[0].radius, before);
        assert_eq!(scene.markers[0].style.radius, before);
        assert!((scene.markers[2].style.radius - layer.scaler().radius(40.0)).abs() < 1e-12);
    }

    #[test]
    fn stats_cover_rendered_symbols_only() {
        let mut fc = collection(vec![
            json!({"Pop_1990": 10}),
            json!({"Pop_1990": 500}),
            json!({"Pop_1990": 30}),
        ]);
        fc.features[1].location = None;
        let mut scene = Scene::new();
        let layer = layer(&fc, "Pop_1990", &mut scene);
        let stats = layer.stats(&fc, &AttributeDescriptor::from_key("Pop_1990"));
        assert_eq!(stats, SummaryStats { min: 10.0, max: 30.0, mean: 20.0 });
    }
}
