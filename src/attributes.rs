use crate::config::AttributeConfig;
use crate::error::SchemaError;
use crate::types::FeatureCollection;
use serde::Serialize;

/// Keys of the first feature containing `pattern`, in declaration order.
pub fn extract_attribute_keys(collection: &FeatureCollection, pattern: &str) -> Vec<String> {
    let first = match collection.features.first() {
        Some(f) => f,
        None => return Vec::new(),
    };

    first
        .properties
        .keys()
        .filter(|key| key.contains(pattern))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
    pub key: String,
    pub year: Option<String>,
    pub label: String,
}

impl AttributeDescriptor {
    pub fn from_key(key: &str) -> Self {
        let year = key.split('_').nth(1).map(str::to_string);
        let label = year.clone().unwrap_or_else(|| key.to_string());
        Self { key: key.to_string(), year, label }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeSchema {
    attributes: Vec<AttributeDescriptor>,
}

impl AttributeSchema {
    /// Derives the sequence once and checks that every feature carries it.
    pub fn derive(collection: &FeatureCollection, config: &AttributeConfig) -> Result<Self, SchemaError> {
        if collection.is_empty() {
            return Err(SchemaError::NoFeatures);
        }

        let keys = extract_attribute_keys(collection, &config.pattern);
        if keys.is_empty() {
            return Err(SchemaError::NoAttributes { pattern: config.pattern.clone() });
        }

        for feature in &collection.features {
            if let Some(key) = keys.iter().find(|k| !feature.properties.contains_key(k.as_str())) {
                return Err(SchemaError::MissingAttribute { feature: feature.id, key: key.clone() });
            }
        }

        Ok(Self {
            attributes: keys.iter().map(|k| AttributeDescriptor::from_key(k)).collect(),
        })
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
