use crate::error::{FetchError, LoadError, SchemaError};
use crate::types::{FeatureCollection, PointFeature};
use geojson::GeoJson;
use std::convert::TryInto;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Url(source.to_string())
        } else {
            DataSource::File(PathBuf::from(source))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

pub async fn load_collection(source: &DataSource) -> Result<FeatureCollection, LoadError> {
    info!("Loading feature collection from {}", source);
    let text = fetch_text(source).await?;
    let collection = parse_collection(&text)?;
    info!("Loaded {} features ({} points)", collection.len(), collection.points().count());
    Ok(collection)
}

async fn fetch_text(source: &DataSource) -> Result<String, FetchError> {
    match source {
        DataSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FetchError::Io { path: path.clone(), source }),
        DataSource::Url(url) => {
            let response = reqwest::get(url)
                .await
                .map_err(|source| FetchError::Http { url: url.clone(), source })?;
            if !response.status().is_success() {
                return Err(FetchError::Status {
                    url: url.clone(),
                    status: response.status().as_u16(),
                });
            }
            response
                .text()
                .await
                .map_err(|source| FetchError::Http { url: url.clone(), source })
        }
    }
}

pub fn parse_collection(text: &str) -> Result<FeatureCollection, SchemaError> {
    let geojson: GeoJson = text.parse()?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(SchemaError::NotFeatureCollection),
    };

    let mut features = Vec::with_capacity(collection.features.len());

    for (id, feature) in collection.features.into_iter().enumerate() {
        let location = match feature.geometry {
            Some(geom) => {
                let converted: Result<geo::Geometry<f64>, _> = geom.value.try_into();
                match converted {
                    Ok(geo::Geometry::Point(p)) => Some(p),
                    Ok(_) => {
                        debug!("Feature {} is not a point, it will not be drawn", id);
                        None
                    }
                    Err(e) => {
                        warn!("Feature {} has an unreadable geometry: {}", id, e);
                        None
                    }
                }
            }
            None => None,
        };

        features.push(PointFeature {
            id,
            location,
            properties: feature.properties.unwrap_or_default(),
        });
    }

    Ok(FeatureCollection::new(features))
}
