use crate::popup::format_number;
use serde::{Serialize, Serializer};
use serde_json::Value;

// mean is the midpoint of max and min, not the arithmetic mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    #[serde(serialize_with = "serialize_number")]
    pub min: f64,
    #[serde(serialize_with = "serialize_number")]
    pub max: f64,
    #[serde(serialize_with = "serialize_number")]
    pub mean: f64,
}

impl SummaryStats {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for value in values {
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }

        Self { min, max, mean: (max + min) / 2.0 }
    }

    pub fn for_attribute<'a, I>(properties: I, key: &str) -> Self
    where
        I: IntoIterator<Item = &'a geojson::JsonObject>,
    {
        Self::from_values(properties.into_iter().map(|p| coerce_number(p.get(key))))
    }

    /// Values in legend order.
    pub fn ordered(&self) -> [(StatKind, f64); 3] {
        [
            (StatKind::Max, self.max),
            (StatKind::Mean, self.mean),
            (StatKind::Min, self.min),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Max,
    Mean,
    Min,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Max => "max",
            StatKind::Mean => "mean",
            StatKind::Min => "min",
        }
    }
}

/// Numeric conversion of a property value; missing values and anything
/// unparsable become NaN.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => coerce_str(s),
        Some(Value::Array(items)) => match items.as_slice() {
            [] => 0.0,
            [Value::Bool(_)] | [Value::Object(_)] => f64::NAN,
            [item] => coerce_number(Some(item)),
            _ => f64::NAN,
        },
        Some(Value::Object(_)) => f64::NAN,
    }
}

fn coerce_str(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&trimmed[2..], radix);
    }

    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings that should stay NaN here
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse().unwrap_or(f64::NAN),
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| c.to_digit(radix).map(|d| acc * radix as f64 + d as f64))
        .unwrap_or(f64::NAN)
}

/// JSON has no literal for infinities or NaN; those go out as the
/// strings `"Infinity"`, `"-Infinity"` and `"NaN"`.
pub fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str(&format_number(*value))
    }
}

/// Whether a value counts as present for a symbol resize.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
