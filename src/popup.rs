use crate::attributes::AttributeDescriptor;
use crate::config::PopupConfig;
use crate::stats::coerce_number;
use geojson::JsonObject;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct PopupBuilder {
    template: Option<String>,
    panel_template: Option<String>,
    value_multiplier: f64,
}

impl PopupBuilder {
    pub fn from_config(config: &PopupConfig) -> Self {
        Self {
            template: config.template.clone(),
            panel_template: config.panel_template.clone(),
            value_multiplier: config.value_multiplier,
        }
    }

    /// Popup for one feature at the given attribute. Without a template
    /// every property is listed.
    pub fn popup(&self, properties: &JsonObject, attribute: &AttributeDescriptor) -> String {
        match &self.template {
            Some(template) => {
                let raw = properties.get(&attribute.key);
                // An unscaled value is shown exactly as stored
                let value = if self.value_multiplier == 1.0 {
                    display_value(raw)
                } else {
                    format_number(coerce_number(raw) * self.value_multiplier)
                };
                render_template(template, |name| match name {
                    "year" => Some(attribute.year.clone().unwrap_or_else(|| "undefined".to_string())),
                    "value" => Some(value.clone()),
                    _ => None,
                }, properties)
            }
            None => all_properties(properties),
        }
    }

    pub fn panel(&self, properties: &JsonObject) -> Option<String> {
        self.panel_template
            .as_ref()
            .map(|template| render_template(template, |_| None, properties))
    }
}

pub fn all_properties(properties: &JsonObject) -> String {
    properties
        .iter()
        .map(|(name, value)| format!("<p>{}: {}</p>", name, display_value(Some(value))))
        .collect()
}

/// Substitutes placeholders, asking `special` first and falling back to
/// the feature's properties.
pub fn render_template<F>(template: &str, special: F, properties: &JsonObject) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(['{', '}']) {
            Some(end) if after.as_bytes()[end] == b'}' => {
                let name = &after[..end];
                let text = special(name).unwrap_or_else(|| display_value(properties.get(name)));
                out.push_str(&text);
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(other) => other.to_string(),
    }
}

/// Shortest round-trip text for a number, spelled the way a browser
/// prints it (`30000`, `37.73`, `Infinity`, `NaN`, `1e+21`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 1e21 || value.abs() < 1e-6 {
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn census() -> PopupBuilder {
        PopupBuilder::from_config(&PopupConfig {
            template: Some("<p><b>The Black population in {City}</p><p>in {year} was: {value} </b></p>".to_string()),
            value_multiplier: 1000.0,
            panel_template: Some("<p> {City}: {location}</p>{detail}<p>Source: {source}".to_string()),
        })
    }

    #[test]
    fn census_popup_scales_value() {
        let p = props(json!({"City": "Chicago", "Pop_1990": 1087.7}));
        let text = census().popup(&p, &AttributeDescriptor::from_key("Pop_1990"));
        assert_eq!(text, "<p><b>The Black population in Chicago</p><p>in 1990 was: 1087700 </b></p>");
    }

    #[test]
    fn megacities_popup_keeps_raw_value() {
        let builder = PopupBuilder::from_config(&PopupConfig {
            template: Some("<p><b>City:</b> {City}</p><p><b>Population in {year}:</b> {value} million</p>".to_string()),
            value_multiplier: 1.0,
            panel_template: None,
        });
        let p = props(json!({"City": "Tokyo", "Pop_2015": 37.73}));
        assert_eq!(
            builder.popup(&p, &AttributeDescriptor::from_key("Pop_2015")),
            "<p><b>City:</b> Tokyo</p><p><b>Population in 2015:</b> 37.73 million</p>"
        );
        assert_eq!(builder.panel(&p), None);
    }

    #[test]
    fn panel_uses_properties_and_undefined_for_missing() {
        let p = props(json!({"City": "Detroit", "location": "MI", "source": "Census"}));
        assert_eq!(
            census().panel(&p).unwrap(),
            "<p> Detroit: MI</p>undefined<p>Source: Census"
        );
    }

    #[test]
    fn no_template_lists_every_property() {
        let builder = PopupBuilder::from_config(&PopupConfig::default());
        let p = props(json!({"City": "A", "Pop_1990": 10, "Capital": true}));
        assert_eq!(
            builder.popup(&p, &AttributeDescriptor::from_key("Pop_1990")),
            "<p>City: A</p><p>Pop_1990: 10</p><p>Capital: true</p>"
        );
    }

    #[test]
    fn stray_braces_are_copied() {
        let p = props(json!({"a": 1}));
        assert_eq!(render_template("x { {a} }", |_| None, &p), "x { 1 }");
        assert_eq!(render_template("open {a", |_| None, &p), "open {a");
    }

    #[test]
    fn numbers_print_like_a_browser() {
        assert_eq!(format_number(30000.0), "30000");
        assert_eq!(format_number(37.73), "37.73");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn extreme_magnitudes_use_exponents() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e22), "1.5e+22");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-2.5e-8), "-2.5e-8");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn unscaled_value_is_shown_as_stored() {
        let builder = PopupBuilder::from_config(&PopupConfig {
            template: Some("{City} {value}".to_string()),
            value_multiplier: 1.0,
            panel_template: None,
        });
        let attribute = AttributeDescriptor::from_key("Pop_2015");
        assert_eq!(builder.popup(&props(json!({"City": "Lagos", "Pop_2015": "12.50"})), &attribute), "Lagos 12.50");
        assert_eq!(builder.popup(&props(json!({"City": "Lagos"})), &attribute), "Lagos undefined");

        // scaled values are still coerced
        let p = props(json!({"City": "Gary", "Pop_1990": "12.50"}));
        assert!(census().popup(&p, &AttributeDescriptor::from_key("Pop_1990")).contains("was: 12500 "));
    }
}
