use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub attributes: AttributeConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub symbols: SymbolConfig,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub legend: LegendConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// File path or http(s) URL of the GeoJSON feature collection.
    pub source: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttributeConfig {
    /// Substring a property name must contain to join the sequence.
    pub pattern: String,
}

impl Default for AttributeConfig {
    fn default() -> Self {
        Self { pattern: "Pop".to_string() }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BasemapConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub attribution: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub basemaps: Vec<BasemapConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [38.0, -95.0],
            zoom: 4,
            basemaps: vec![BasemapConfig {
                name: "Light".to_string(),
                url: "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                attribution: "&copy; OpenStreetMap contributors".to_string(),
            }],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SymbolConfig {
    pub scale_factor: f64,
    pub fill_color: String,
    /// Fill used while a symbol is hovered; None keeps the fill unchanged.
    pub highlight_color: Option<String>,
    pub stroke_color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.5,
            fill_color: "#ff7800".to_string(),
            highlight_color: Some("#008000".to_string()),
            stroke_color: "#000000".to_string(),
            weight: 1.0,
            opacity: 1.0,
            fill_opacity: 0.4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PopupConfig {
    /// Placeholders: {year}, {value} and {<property name>}.
    pub template: Option<String>,
    #[serde(default = "default_multiplier")]
    pub value_multiplier: f64,
    pub panel_template: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self { template: None, value_multiplier: default_multiplier(), panel_template: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LegendConfig {
    pub title_template: String,
    pub caption: Option<String>,
    pub width: u32,
    pub height: u32,
    pub circle_x: f64,
    pub text_x: f64,
    /// Bottom edge shared by the nested legend circles.
    pub baseline: f64,
    /// Text rows for max, mean and min.
    pub rows: [f64; 3],
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub label: LabelFormat,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            title_template: "Population in {year}".to_string(),
            caption: Some("max / mean / min".to_string()),
            width: 280,
            height: 125,
            circle_x: 40.0,
            text_x: 95.0,
            baseline: 80.0,
            rows: [40.0, 60.0, 80.0],
            fill_color: "#ff7800".to_string(),
            fill_opacity: 0.8,
            stroke_color: "#000000".to_string(),
            label: LabelFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelFormat {
    /// Applied before rounding to an integer.
    pub scale: f64,
    #[serde(default = "default_one")]
    pub factor: f64,
    #[serde(default = "default_one")]
    pub divisor: f64,
    #[serde(default)]
    pub suffix: String,
}

fn default_one() -> f64 {
    1.0
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self { scale: 100.0, factor: 10.0, divisor: 1.0, suffix: String::new() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub frame_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub background: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_dir: PathBuf::from("output/frames"),
            width: 1024,
            height: 640,
            background: "#262626".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000, static_dir: PathBuf::from("static") }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.attributes.pattern.is_empty(), "attributes.pattern must not be empty");
        ensure!(
            self.symbols.scale_factor.is_finite() && self.symbols.scale_factor > 0.0,
            "symbols.scale_factor must be a positive number"
        );
        let label = &self.legend.label;
        ensure!(
            [label.scale, label.factor, label.divisor].iter().all(|v| v.is_finite() && *v > 0.0),
            "legend.label scale, factor and divisor must be positive numbers"
        );
        ensure!(self.output.width > 0 && self.output.height > 0, "output size must be non-zero");

        let colors = [
            ("symbols.fill_color", Some(&self.symbols.fill_color)),
            ("symbols.highlight_color", self.symbols.highlight_color.as_ref()),
            ("symbols.stroke_color", Some(&self.symbols.stroke_color)),
            ("output.background", Some(&self.output.background)),
        ];
        for (name, color) in colors {
            if let Some(color) = color {
                crate::render::parse_hex_color(color)
                    .ok_or_else(|| anyhow!("{} is not a hex color: {}", name, color))?;
            }
        }
        Ok(())
    }
}
