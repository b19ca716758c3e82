//! Widget and submission configuration for form model builds.

use serde::{Deserialize, Serialize};

/// Widget used for numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberWidget {
    #[default]
    Slider,
    Input,
}

/// Widget used for boolean fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanWidget {
    #[default]
    Switch,
    Checkbox,
}

/// Controls how schema fields map to widgets and which key is the primary
/// identifier.
///
/// Deserializes from partial documents; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormConfig {
    pub number_widget: NumberWidget,
    pub boolean_widget: BooleanWidget,
    /// String fields whose `maxLength` exceeds this become textareas.
    pub textarea_threshold: u64,
    /// Slider minimum when the schema declares none.
    pub default_min: f64,
    /// Slider maximum when the schema declares none.
    pub default_max: f64,
    /// Slider step when the schema declares none.
    pub default_step: f64,
    /// Primary identifier key dropped from create and clone payloads.
    pub id_field: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            number_widget: NumberWidget::Slider,
            boolean_widget: BooleanWidget::Switch,
            textarea_threshold: 256,
            default_min: 0.0,
            default_max: 100.0,
            default_step: 0.01,
            id_field: "_id".to_string(),
        }
    }
}
