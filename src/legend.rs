use crate::attributes::AttributeDescriptor;
use crate::config::{LabelFormat, LegendConfig};
use crate::popup::format_number;
use crate::stats::{serialize_number, StatKind, SummaryStats};
use crate::symbols::RadiusScaler;
use serde::Serialize;
use svg::node::element::{Circle, Text};
use svg::Document;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendCircle {
    pub kind: StatKind,
    #[serde(serialize_with = "serialize_number")]
    pub value: f64,
    pub cx: f64,
    #[serde(serialize_with = "serialize_number")]
    pub cy: f64,
    #[serde(serialize_with = "serialize_number")]
    pub r: f64,
    pub text_x: f64,
    pub text_y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendView {
    pub title: String,
    pub caption: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub circles: Vec<LegendCircle>,
}

impl LegendView {
    pub fn build(
        attribute: &AttributeDescriptor,
        stats: &SummaryStats,
        scaler: &RadiusScaler,
        config: &LegendConfig,
    ) -> Self {
        let year = attribute.year.as_deref().unwrap_or("undefined");
        let circles = stats
            .ordered()
            .iter()
            .zip(config.rows.iter())
            .map(|(&(kind, value), &row)| {
                let r = scaler.radius(value);
                LegendCircle {
                    kind,
                    value,
                    cx: config.circle_x,
                    cy: config.baseline - r,
                    r,
                    text_x: config.text_x,
                    text_y: row,
                    label: format_label(value, &config.label),
                }
            })
            .collect();

        Self {
            title: config.title_template.replace("{year}", year),
            caption: config.caption.clone(),
            width: config.width,
            height: config.height,
            fill_color: config.fill_color.clone(),
            fill_opacity: config.fill_opacity,
            stroke_color: config.stroke_color.clone(),
            circles,
        }
    }

    /// Attribute legend markup. Circles without a finite radius (no
    /// numeric data) are left out; their labels are still written.
    pub fn to_svg(&self) -> String {
        let mut doc = Document::new()
            .set("id", "attribute-legend")
            .set("width", format!("{}px", self.width))
            .set("height", format!("{}px", self.height));

        for circle in &self.circles {
            if circle.r.is_finite() {
                doc = doc.add(
                    Circle::new()
                        .set("class", "legend-circle")
                        .set("id", circle.kind.as_str())
                        .set("fill", self.fill_color.as_str())
                        .set("fill-opacity", self.fill_opacity)
                        .set("stroke", self.stroke_color.as_str())
                        .set("cx", circle.cx)
                        .set("cy", circle.cy)
                        .set("r", circle.r),
                );
            }
            doc = doc.add(
                Text::new(circle.label.clone())
                    .set("id", format!("{}-text", circle.kind.as_str()))
                    .set("x", circle.text_x)
                    .set("y", circle.text_y),
            );
        }

        doc.to_string()
    }
}

/// `round(value * scale) * factor / divisor` with half-up rounding,
/// printed like any other number, plus the suffix.
pub fn format_label(value: f64, format: &LabelFormat) -> String {
    let rounded = round_half_up(value * format.scale) * format.factor / format.divisor;
    let mut text = format_number(rounded);
    text.push_str(&format.suffix);
    text
}

// Ties go toward +inf, so -2.5 rounds to -2
fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}
