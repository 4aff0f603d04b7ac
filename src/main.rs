pub mod types;
pub mod config;
pub mod error;
pub mod data;
pub mod attributes;
pub mod stats;
pub mod sequence;
pub mod popup;
pub mod symbols;
pub mod legend;
pub mod scene;
pub mod viewer;
pub mod projection;
pub mod render;
pub mod query;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one frame per attribute (PNG symbols, SVG legend, JSON scene)
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the interactive map API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the attribute sequence and per-attribute statistics
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

async fn load_viewer(app_config: &config::AppConfig) -> anyhow::Result<viewer::MapViewer<scene::Scene>> {
    let source = data::DataSource::parse(&app_config.input.source);
    let collection = data::load_collection(&source)
        .await
        .with_context(|| format!("Failed to load {}", source))?;

    let schema = attributes::AttributeSchema::derive(&collection, &app_config.attributes)
        .with_context(|| format!("Unusable attribute schema in {}", source))?;
    println!(
        "Attribute sequence: {}",
        schema.attributes().iter().map(|a| a.key.as_str()).collect::<Vec<_>>().join(", ")
    );

    let viewer = viewer::MapViewer::build(collection, &schema, app_config, scene::Scene::new())?;
    Ok(viewer)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            println!("Generating frames with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let mut map = load_viewer(&app_config).await?;
            let frames = render::generate_frames(&app_config, &mut map)?;

            println!("Generation complete! {} frames written.", frames.len());
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // A failed load still starts the server so clients can show the error
            let map = match load_viewer(&app_config).await {
                Ok(viewer) => server::MapState::ready(viewer, app_config.map.zoom),
                Err(e) => {
                    warn!("Map unavailable: {:#}", e);
                    server::MapState::Failed(format!("{:#}", e))
                }
            };

            server::start_server(app_config, map).await?;
        }
        Commands::Inspect { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let mut map = load_viewer(&app_config).await?;

            println!("{} symbols", map.symbols().symbols().len());
            for index in 0..map.sequence().len() {
                let key = map.set_index(index)?.key.clone();
                let stats = map.current_stats();
                println!(
                    "{:>3}  {:<16} min {:<12} mean {:<12} max {}",
                    index,
                    key,
                    popup::format_number(stats.min),
                    popup::format_number(stats.mean),
                    popup::format_number(stats.max)
                );
            }
        }
    }

    Ok(())
}
