use crate::attributes::{AttributeDescriptor, AttributeSchema};
use crate::config::{AppConfig, LegendConfig};
use crate::error::SequenceError;
use crate::legend::LegendView;
use crate::popup::PopupBuilder;
use crate::scene::{Control, ControlId, Corner, MapView, MarkerId, RenderAdapter, Scene};
use crate::sequence::{SequenceController, SliderState};
use crate::stats::SummaryStats;
use crate::symbols::SymbolLayer;
use crate::types::{Direction, FeatureCollection};
use serde::Serialize;
use tracing::{debug, info};

pub struct MapViewer<R: RenderAdapter> {
    collection: FeatureCollection,
    adapter: R,
    symbols: SymbolLayer,
    sequence: SequenceController,
    legend: LegendView,
    legend_config: LegendConfig,
    sequence_control: ControlId,
    legend_control: ControlId,
    fill_color: String,
    highlight_color: Option<String>,
    panel: Option<String>,
}

impl<R: RenderAdapter> MapViewer<R> {
    pub fn build(
        collection: FeatureCollection,
        schema: &AttributeSchema,
        config: &AppConfig,
        mut adapter: R,
    ) -> Result<Self, SequenceError> {
        let sequence = SequenceController::new(schema.attributes().to_vec())?;
        let first = sequence.current_attribute().clone();

        adapter.create_canvas(MapView {
            center: config.map.center,
            zoom: config.map.zoom,
            basemaps: config.map.basemaps.clone(),
        });

        let symbols = SymbolLayer::create(
            &collection,
            &first,
            &config.symbols,
            PopupBuilder::from_config(&config.popup),
            &mut adapter,
        );

        let sequence_control = adapter.add_control(Corner::BottomLeft, Control::Sequence(sequence.slider()));

        let stats = symbols.stats(&collection, &first);
        let legend = LegendView::build(&first, &stats, symbols.scaler(), &config.legend);
        let legend_control = adapter.add_control(Corner::BottomRight, Control::Legend(legend.clone()));

        info!(
            "Map ready: {} symbols, {} attributes starting at {}",
            symbols.symbols().len(),
            sequence.len(),
            first.key
        );

        Ok(Self {
            collection,
            adapter,
            symbols,
            sequence,
            legend,
            legend_config: config.legend.clone(),
            sequence_control,
            legend_control,
            fill_color: config.symbols.fill_color.clone(),
            highlight_color: config.symbols.highlight_color.clone(),
            panel: None,
        })
    }

    /// Skip button.
    pub fn step(&mut self, direction: Direction) -> &AttributeDescriptor {
        self.sequence.step(direction);
        self.refresh();
        self.sequence.current_attribute()
    }

    /// Slider input.
    pub fn set_index(&mut self, index: usize) -> Result<&AttributeDescriptor, SequenceError> {
        self.sequence.set_index(index)?;
        self.refresh();
        Ok(self.sequence.current_attribute())
    }

    fn refresh(&mut self) {
        let attribute = self.sequence.current_attribute().clone();
        debug!("Showing {} (index {})", attribute.key, self.sequence.index());

        self.symbols.update(&self.collection, &attribute, &mut self.adapter);

        let stats = self.symbols.stats(&self.collection, &attribute);
        self.legend = LegendView::build(&attribute, &stats, self.symbols.scaler(), &self.legend_config);
        self.adapter
            .update_control(self.legend_control, Control::Legend(self.legend.clone()));
        self.adapter
            .update_control(self.sequence_control, Control::Sequence(self.sequence.slider()));
    }

    /// Pointer entering or leaving a symbol.
    pub fn hover(&mut self, marker: MarkerId, entered: bool) -> bool {
        if self.symbols.symbol(marker).is_none() {
            return false;
        }

        if entered {
            self.adapter.open_popup(marker);
            if let Some(color) = &self.highlight_color {
                self.adapter.set_fill(marker, color);
            }
        } else {
            self.adapter.close_popup(marker);
            if self.highlight_color.is_some() {
                self.adapter.set_fill(marker, &self.fill_color);
            }
        }
        true
    }

    pub fn select(&mut self, marker: MarkerId) -> bool {
        let feature = match self.symbols.symbol(marker).and_then(|s| self.collection.get(s.feature)) {
            Some(f) => f,
            None => return false,
        };
        if let Some(content) = self.symbols.popups().panel(&feature.properties) {
            self.panel = Some(content);
        }
        true
    }

    pub fn current_attribute(&self) -> &AttributeDescriptor {
        self.sequence.current_attribute()
    }

    pub fn current_stats(&self) -> SummaryStats {
        self.symbols.stats(&self.collection, self.sequence.current_attribute())
    }

    pub fn sequence(&self) -> &SequenceController {
        &self.sequence
    }

    pub fn slider(&self) -> SliderState {
        self.sequence.slider()
    }

    pub fn legend(&self) -> &LegendView {
        &self.legend
    }

    pub fn panel(&self) -> Option<&str> {
        self.panel.as_deref()
    }

    pub fn symbols(&self) -> &SymbolLayer {
        &self.symbols
    }

    pub fn adapter(&self) -> &R {
        &self.adapter
    }
}

/// Everything a client needs to draw the current state.
#[derive(Debug, Serialize)]
pub struct ViewerSnapshot<'a> {
    pub attribute: &'a AttributeDescriptor,
    pub index: usize,
    pub stats: SummaryStats,
    pub slider: SliderState,
    pub legend: &'a LegendView,
    pub panel: Option<&'a str>,
    pub scene: &'a Scene,
}

impl MapViewer<Scene> {
    pub fn snapshot(&self) -> ViewerSnapshot<'_> {
        ViewerSnapshot {
            attribute: self.current_attribute(),
            index: self.sequence.index(),
            stats: self.current_stats(),
            slider: self.slider(),
            legend: &self.legend,
            panel: self.panel(),
            scene: &self.adapter,
        }
    }
}
