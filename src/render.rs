use crate::config::{AppConfig, OutputConfig};
use crate::projection::world_pixel;
use crate::scene::{Marker, Scene};
use crate::viewer::MapViewer;
use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

struct Frame {
    index: usize,
    label: String,
    scene: Scene,
    legend_svg: String,
    snapshot_json: String,
}

/// Writes one PNG, legend SVG and scene JSON per attribute, then leaves
/// the viewer on its first attribute.
pub fn generate_frames(config: &AppConfig, viewer: &mut MapViewer<Scene>) -> Result<Vec<PathBuf>> {
    let count = viewer.sequence().len();
    println!("Generating {} frames into {:?}...", count, config.output.frame_dir);

    let mut frames = Vec::with_capacity(count);
    for index in 0..count {
        let attribute = viewer.set_index(index)?.clone();
        let snapshot_json = serde_json::to_string_pretty(&viewer.snapshot())
            .context("Failed to serialise scene snapshot")?;
        frames.push(Frame {
            index,
            label: file_label(&attribute.label),
            scene: viewer.adapter().clone(),
            legend_svg: viewer.legend().to_svg(),
            snapshot_json,
        });
    }
    viewer.set_index(0)?;

    let dir = &config.output.frame_dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create frame directory {:?}", dir))?;

    let written: Vec<PathBuf> = frames
        .par_iter()
        .map(|frame| write_frame(dir, frame, &config.output))
        .collect::<Result<_>>()?;

    info!("Wrote {} frames", written.len());
    Ok(written)
}

fn write_frame(dir: &Path, frame: &Frame, output: &OutputConfig) -> Result<PathBuf> {
    let stem = format!("{:02}_{}", frame.index, frame.label);

    let img = render_frame(&frame.scene, output)?;
    let png = dir.join(format!("frame_{}.png", stem));
    img.save(&png).with_context(|| format!("Failed to save frame {:?}", png))?;

    let legend = dir.join(format!("legend_{}.svg", stem));
    fs::write(&legend, &frame.legend_svg).with_context(|| format!("Failed to write {:?}", legend))?;

    let scene = dir.join(format!("scene_{}.json", stem));
    fs::write(&scene, &frame.snapshot_json).with_context(|| format!("Failed to write {:?}", scene))?;

    Ok(png)
}

/// Rasterises the symbols of a scene around its canvas centre.
pub fn render_frame(scene: &Scene, output: &OutputConfig) -> Result<RgbaImage> {
    let view = scene.view.as_ref().ok_or_else(|| anyhow!("Scene has no canvas"))?;
    let background = parse_hex_color(&output.background)
        .ok_or_else(|| anyhow!("Invalid background color: {}", output.background))?;

    let mut img: RgbaImage = ImageBuffer::from_pixel(output.width, output.height, background);

    let (cx, cy) = world_pixel(view.center[0], view.center[1], view.zoom);
    let origin = (cx - output.width as f64 / 2.0, cy - output.height as f64 / 2.0);

    for marker in &scene.markers {
        let (wx, wy) = world_pixel(marker.lat, marker.lon, view.zoom);
        draw_marker(&mut img, marker, wx - origin.0, wy - origin.1);
    }

    Ok(img)
}

fn draw_marker(img: &mut RgbaImage, marker: &Marker, x: f64, y: f64) {
    let style = &marker.style;
    let r = style.radius;
    if !r.is_finite() || r < 0.0 {
        return;
    }

    let half_stroke = style.weight / 2.0;
    let reach = r + half_stroke + 1.0;
    let (w, h) = (img.width() as f64, img.height() as f64);
    if x + reach < 0.0 || y + reach < 0.0 || x - reach >= w || y - reach >= h {
        return;
    }

    let fill = parse_hex_color(&style.fill_color);
    let stroke = parse_hex_color(&style.color);

    let x0 = (x - reach).floor().max(0.0) as u32;
    let y0 = (y - reach).floor().max(0.0) as u32;
    let x1 = (x + reach).ceil().min(w - 1.0) as u32;
    let y1 = (y + reach).ceil().min(h - 1.0) as u32;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let dx = px as f64 + 0.5 - x;
            let dy = py as f64 + 0.5 - y;
            let d = (dx * dx + dy * dy).sqrt();

            if d <= r {
                if let Some(color) = fill {
                    blend(img.get_pixel_mut(px, py), color, style.fill_opacity);
                }
            }
            if style.weight > 0.0 && (d - r).abs() <= half_stroke {
                if let Some(color) = stroke {
                    blend(img.get_pixel_mut(px, py), color, style.opacity);
                }
            }
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, alpha: f64) {
    let a = alpha.clamp(0.0, 1.0);
    for c in 0..3 {
        let mixed = src[c] as f64 * a + dst[c] as f64 * (1.0 - a);
        dst[c] = mixed.round() as u8;
    }
    dst[3] = 255;
}

/// `#rgb` or `#rrggbb`.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let hex = hex.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Some(Rgba([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255])),
        _ => None,
    }
}

fn file_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SymbolConfig;
    use crate::scene::{MapView, MarkerStyle, RenderAdapter};
    use geo::Point;
    use tempfile::TempDir;

    fn output() -> OutputConfig {
        OutputConfig {
            frame_dir: PathBuf::from("unused"),
            width: 64,
            height: 64,
            background: "#000000".to_string(),
        }
    }

    fn scene_with(radius: f64) -> Scene {
        let mut scene = Scene::new();
        scene.create_canvas(MapView { center: [0.0, 0.0], zoom: 2, basemaps: Vec::new() });
        let mut style = MarkerStyle::from_config(&SymbolConfig::default(), radius);
        style.fill_opacity = 1.0;
        style.weight = 0.0;
        scene.add_circle_marker(0, Point::new(0.0, 0.0), style);
        scene
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ff7800"), Some(Rgba([255, 120, 0, 255])));
        assert_eq!(parse_hex_color("#000"), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(parse_hex_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_hex_color("green"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn marker_at_centre_is_filled() {
        let img = render_frame(&scene_with(5.0), &output()).unwrap();
        assert_eq!(*img.get_pixel(32, 32), Rgba([255, 120, 0, 255]));
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(32, 40), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn non_finite_radius_is_not_drawn() {
        let img = render_frame(&scene_with(f64::NAN), &output()).unwrap();
        assert!(img.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn scene_without_canvas_is_an_error() {
        assert!(render_frame(&Scene::new(), &output()).is_err());
    }

    #[test]
    fn half_opacity_blends_with_background() {
        let mut scene = scene_with(5.0);
        scene.markers[0].style.fill_opacity = 0.5;
        let img = render_frame(&scene, &output()).unwrap();
        assert_eq!(*img.get_pixel(32, 32), Rgba([128, 60, 0, 255]));
    }

    #[test]
    fn generates_every_frame_and_rewinds() {
        use crate::attributes::AttributeSchema;
        use crate::types::fixtures::time_series;

        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::from_toml("[input]\nsource = \"unused.geojson\"\n").unwrap();
        config.output = OutputConfig { frame_dir: temp_dir.path().join("frames"), ..output() };

        let collection = time_series();
        let schema = AttributeSchema::derive(&collection, &config.attributes).unwrap();
        let mut viewer = MapViewer::build(collection, &schema, &config, Scene::new()).unwrap();
        viewer.set_index(2).unwrap();

        let written = generate_frames(&config, &mut viewer).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(viewer.sequence().index(), 0);

        let dir = &config.output.frame_dir;
        for (i, year) in ["1990", "2000", "2010"].iter().enumerate() {
            let stem = format!("{:02}_{}", i, year);
            assert!(dir.join(format!("frame_{}.png", stem)).is_file());
            let legend = fs::read_to_string(dir.join(format!("legend_{}.svg", stem))).unwrap();
            assert!(legend.contains("attribute-legend"));

            let scene = fs::read_to_string(dir.join(format!("scene_{}.json", stem))).unwrap();
            let json: serde_json::Value = serde_json::from_str(&scene).unwrap();
            assert_eq!(json["index"], i);
            assert_eq!(json["attribute"]["key"], format!("Pop_{}", year));
        }
        assert_eq!(fs::read_dir(dir).unwrap().count(), 9);
    }

    #[test]
    fn labels_are_safe_file_names() {
        assert_eq!(file_label("1990"), "1990");
        assert_eq!(file_label("Total Pop/1990"), "Total_Pop_1990");
    }
}
