//! Theme settings: declared schemas and resolved values
//!
//! Every theme declares an ordered schema. A [`ThemeConfig`] starts from the
//! schema defaults, layers a persisted override on top, and answers lookups
//! with a single fallback: the schema default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::persistence::SettingsError;

/// Kind of a settings field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKind {
    /// Section heading; carries no value
    Header,
    Number,
    Range,
    Checkbox,
    Text,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::Header => "header",
            SettingKind::Number => "number",
            SettingKind::Range => "range",
            SettingKind::Checkbox => "checkbox",
            SettingKind::Text => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SettingKind::Number | SettingKind::Range)
    }
}

/// A setting value as stored in the flat document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    fn matches(&self, kind: SettingKind) -> bool {
        matches!(
            (self, kind),
            (SettingValue::Number(_), SettingKind::Number | SettingKind::Range)
                | (SettingValue::Bool(_), SettingKind::Checkbox)
                | (SettingValue::Text(_), SettingKind::Text)
        )
    }
}

/// One entry of a theme's settings schema
#[derive(Debug, Clone, PartialEq)]
pub struct SettingField {
    /// Empty for headers
    pub id: &'static str,
    pub label: &'static str,
    pub kind: SettingKind,
    pub default: Option<SettingValue>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl SettingField {
    pub fn header(label: &'static str) -> Self {
        Self {
            id: "",
            label,
            kind: SettingKind::Header,
            default: None,
            min: None,
            max: None,
            step: None,
        }
    }

    pub fn number(id: &'static str, label: &'static str, default: f64) -> Self {
        Self {
            id,
            label,
            kind: SettingKind::Number,
            default: Some(SettingValue::Number(default)),
            min: Some(0.0),
            max: None,
            step: None,
        }
    }

    pub fn range(
        id: &'static str,
        label: &'static str,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Self {
        Self {
            id,
            label,
            kind: SettingKind::Range,
            default: Some(SettingValue::Number(default)),
            min: Some(min),
            max: Some(max),
            step: Some(step),
        }
    }

    pub fn checkbox(id: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            id,
            label,
            kind: SettingKind::Checkbox,
            default: Some(SettingValue::Bool(default)),
            min: None,
            max: None,
            step: None,
        }
    }

    pub fn text(id: &'static str, label: &'static str, default: &str) -> Self {
        Self {
            id,
            label,
            kind: SettingKind::Text,
            default: Some(SettingValue::Text(default.to_string())),
            min: None,
            max: None,
            step: None,
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        let value = match self.min {
            Some(min) => value.max(min),
            None => value,
        };
        match self.max {
            Some(max) => value.min(max),
            None => value,
        }
    }
}

/// Resolved settings for one theme
#[derive(Debug, Clone)]
pub struct ThemeConfig {
    schema: Vec<SettingField>,
    values: BTreeMap<String, SettingValue>,
}

impl ThemeConfig {
    /// Schema defaults only
    pub fn from_schema(schema: Vec<SettingField>) -> Self {
        let values = schema
            .iter()
            .filter(|f| f.kind != SettingKind::Header && !f.id.is_empty())
            .filter_map(|f| f.default.clone().map(|d| (f.id.to_string(), d)))
            .collect();
        Self { schema, values }
    }

    /// Schema defaults with a persisted override layered on top
    pub fn with_overrides(
        schema: Vec<SettingField>,
        overrides: BTreeMap<String, SettingValue>,
    ) -> Self {
        let mut config = Self::from_schema(schema);
        config.merge(overrides);
        config
    }

    pub fn schema(&self) -> &[SettingField] {
        &self.schema
    }

    /// Flat key-value view (includes unknown keys carried from imports)
    pub fn values(&self) -> &BTreeMap<String, SettingValue> {
        &self.values
    }

    pub fn set(&mut self, id: &str, value: SettingValue) {
        self.values.insert(id.to_string(), value);
    }

    /// Overlay values; unknown keys are kept but never consulted
    pub fn merge(&mut self, overrides: BTreeMap<String, SettingValue>) {
        for (id, value) in overrides {
            if self.field(&id).is_none() {
                log::debug!("Keeping unknown setting '{}'", id);
            }
            self.values.insert(id, value);
        }
    }

    fn field(&self, id: &str) -> Option<&SettingField> {
        self.schema
            .iter()
            .find(|f| f.kind != SettingKind::Header && f.id == id)
    }

    /// Stored value if it has the schema's type, otherwise the schema default
    fn resolve(&self, id: &str) -> Option<(&SettingField, SettingValue)> {
        let Some(field) = self.field(id) else {
            log::warn!("Setting '{}' is not in the schema", id);
            return None;
        };
        let value = match self.values.get(id) {
            Some(v) if v.matches(field.kind) => Some(v.clone()),
            Some(v) => {
                log::warn!("Setting '{}' has wrong type ({:?}), using default", id, v);
                field.default.clone()
            }
            None => field.default.clone(),
        };
        value.map(|v| (field, v))
    }

    /// Numeric setting, clamped to declared bounds
    pub fn number(&self, id: &str) -> f64 {
        match self.resolve(id) {
            Some((field, SettingValue::Number(n))) if n.is_finite() => field.clamp(n),
            Some((field, _)) => match field.default {
                Some(SettingValue::Number(d)) => d,
                _ => 0.0,
            },
            None => 0.0,
        }
    }

    pub fn flag(&self, id: &str) -> bool {
        matches!(self.resolve(id), Some((_, SettingValue::Bool(true))))
    }

    pub fn text(&self, id: &str) -> String {
        match self.resolve(id) {
            Some((_, SettingValue::Text(s))) => s,
            _ => String::new(),
        }
    }

    /// Export as a pretty JSON object
    pub fn export_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(&self.values)?)
    }

    /// Merge a JSON object document over the current values
    pub fn import_json(&mut self, json: &str) -> Result<(), SettingsError> {
        let doc: serde_json::Value = serde_json::from_str(json)?;
        if !doc.is_object() {
            return Err(SettingsError::NotAnObject);
        }
        let overrides: BTreeMap<String, SettingValue> = serde_json::from_value(doc)?;
        self.merge(overrides);
        Ok(())
    }
}
