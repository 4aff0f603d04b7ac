use crate::config::{BasemapConfig, SymbolConfig};
use crate::legend::LegendView;
use crate::sequence::SliderState;
use crate::stats::serialize_number;
use geo::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ControlId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub basemaps: Vec<BasemapConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    #[serde(serialize_with = "serialize_number")]
    pub radius: f64,
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl MarkerStyle {
    pub fn from_config(config: &SymbolConfig, radius: f64) -> Self {
        Self {
            radius,
            fill_color: config.fill_color.clone(),
            color: config.stroke_color.clone(),
            weight: config.weight,
            opacity: config.opacity,
            fill_opacity: config.fill_opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub content: String,
    /// Pixel offset from the marker centre, [x, y].
    pub offset: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Control {
    Sequence(SliderState),
    Legend(LegendView),
}

pub trait RenderAdapter {
    fn create_canvas(&mut self, view: MapView);

    fn add_circle_marker(&mut self, feature: usize, location: Point<f64>, style: MarkerStyle) -> MarkerId;

    fn set_radius(&mut self, marker: MarkerId, radius: f64);

    fn set_fill(&mut self, marker: MarkerId, color: &str);

    fn bind_popup(&mut self, marker: MarkerId, popup: Popup);

    fn open_popup(&mut self, marker: MarkerId);

    fn close_popup(&mut self, marker: MarkerId);

    fn add_control(&mut self, corner: Corner, control: Control) -> ControlId;

    fn update_control(&mut self, id: ControlId, control: Control);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: MarkerId,
    pub feature: usize,
    pub lat: f64,
    pub lon: f64,
    pub style: MarkerStyle,
    pub popup: Option<Popup>,
    pub popup_open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedControl {
    pub id: ControlId,
    pub corner: Corner,
    pub control: Control,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub view: Option<MapView>,
    pub markers: Vec<Marker>,
    pub controls: Vec<PlacedControl>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }

    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.controls.get(id.0).map(|c| &c.control)
    }

    fn marker_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.get_mut(id.0)
    }
}

impl RenderAdapter for Scene {
    fn create_canvas(&mut self, view: MapView) {
        self.view = Some(view);
    }

    fn add_circle_marker(&mut self, feature: usize, location: Point<f64>, style: MarkerStyle) -> MarkerId {
        let id = MarkerId(self.markers.len());
        self.markers.push(Marker {
            id,
            feature,
            lat: location.y(),
            lon: location.x(),
            style,
            popup: None,
            popup_open: false,
        });
        id
    }

    fn set_radius(&mut self, marker: MarkerId, radius: f64) {
        if let Some(m) = self.marker_mut(marker) {
            m.style.radius = radius;
        }
    }

    fn set_fill(&mut self, marker: MarkerId, color: &str) {
        if let Some(m) = self.marker_mut(marker) {
            m.style.fill_color = color.to_string();
        }
    }

    fn bind_popup(&mut self, marker: MarkerId, popup: Popup) {
        if let Some(m) = self.marker_mut(marker) {
            m.popup = Some(popup);
        }
    }

    fn open_popup(&mut self, marker: MarkerId) {
        if let Some(m) = self.marker_mut(marker) {
            m.popup_open = m.popup.is_some();
        }
    }

    fn close_popup(&mut self, marker: MarkerId) {
        if let Some(m) = self.marker_mut(marker) {
            m.popup_open = false;
        }
    }

    fn add_control(&mut self, corner: Corner, control: Control) -> ControlId {
        let id = ControlId(self.controls.len());
        self.controls.push(PlacedControl { id, corner, control });
        id
    }

    fn update_control(&mut self, id: ControlId, control: Control) {
        if let Some(placed) = self.controls.get_mut(id.0) {
            placed.control = control;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(radius: f64) -> MarkerStyle {
        MarkerStyle::from_config(&SymbolConfig::default(), radius)
    }

    #[test]
    fn markers_get_sequential_ids_and_lat_lon() {
        let mut scene = Scene::new();
        let a = scene.add_circle_marker(0, Point::new(-95.0, 38.0), style(2.0));
        let b = scene.add_circle_marker(4, Point::new(0.0, 20.0), style(3.0));
        assert_eq!((a, b), (MarkerId(0), MarkerId(1)));

        let marker = scene.marker(a).unwrap();
        assert_eq!((marker.lat, marker.lon), (38.0, -95.0));
        assert_eq!(scene.marker(b).unwrap().feature, 4);
    }

    #[test]
    fn popup_opens_only_when_bound() {
        let mut scene = Scene::new();
        let id = scene.add_circle_marker(0, Point::new(0.0, 0.0), style(1.0));
        scene.open_popup(id);
        assert!(!scene.marker(id).unwrap().popup_open);

        scene.bind_popup(id, Popup { content: "<p>x</p>".to_string(), offset: [0.0, -1.0] });
        scene.open_popup(id);
        assert!(scene.marker(id).unwrap().popup_open);
        scene.close_popup(id);
        assert!(!scene.marker(id).unwrap().popup_open);
    }

    #[test]
    fn nan_radius_reaches_json_as_a_string() {
        let mut scene = Scene::new();
        scene.add_circle_marker(0, Point::new(0.0, 0.0), style(f64::NAN));
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["markers"][0]["style"]["radius"], "NaN");
    }

    #[test]
    fn unknown_markers_are_ignored() {
        let mut scene = Scene::new();
        scene.set_radius(MarkerId(3), 10.0);
        scene.set_fill(MarkerId(3), "#008000");
        assert!(scene.markers.is_empty());
    }
}
