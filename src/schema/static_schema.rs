//! In-memory schema provider, optionally loaded from a JSON or YAML dump.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use super::{FieldDescriptor, FieldKind, RelationKind, SchemaProvider};
use crate::error::{ModelGraphError, Result, SchemaError};

/// Field as it appears in a `fields_get`-style dump
#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    relation: Option<String>,
    #[serde(default)]
    relation_field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    models: BTreeMap<String, Vec<RawField>>,
}

impl RawField {
    fn into_descriptor(self, model: &str) -> std::result::Result<FieldDescriptor, SchemaError> {
        let kind = match self.field_type.parse::<RelationKind>() {
            Err(_) => FieldKind::Scalar,
            Ok(relation_kind) => {
                let target = self.relation.ok_or_else(|| SchemaError::Invalid {
                    model: model.to_string(),
                    field: self.name.clone(),
                    reason: format!("{} field without a 'relation' target", relation_kind),
                })?;
                match relation_kind {
                    RelationKind::ManyToOne => FieldKind::ManyToOne { target },
                    RelationKind::OneToMany => FieldKind::OneToMany {
                        target,
                        inverse: self.relation_field.filter(|f| !f.is_empty()),
                    },
                    RelationKind::ManyToMany => FieldKind::ManyToMany { target },
                }
            }
        };
        Ok(FieldDescriptor {
            name: self.name,
            field_type: self.field_type,
            required: self.required,
            kind,
        })
    }
}

/// Schema held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    models: HashMap<String, Vec<FieldDescriptor>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a model and its ordered fields
    pub fn with_model(mut self, name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        self.models.insert(name.into(), fields);
        self
    }

    /// Load a schema document. `.yaml`/`.yml` files are read as YAML,
    /// anything else as JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ModelGraphError::Io)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let raw: RawSchema = match extension.as_str() {
            "yaml" | "yml" => serde_yaml_ng::from_str(&content).map_err(|e| {
                ModelGraphError::Parse(format!("YAML parse error in {}: {}", path.display(), e))
            })?,
            _ => serde_json::from_str(&content).map_err(|e| {
                ModelGraphError::Parse(format!("JSON parse error in {}: {}", path.display(), e))
            })?,
        };

        let schema = Self::from_raw(raw)?;
        log::info!("Loaded {} models from {}", schema.models.len(), path.display());
        Ok(schema)
    }

    /// Parse a JSON schema document from a string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawSchema = serde_json::from_str(content)
            .map_err(|e| ModelGraphError::Parse(format!("JSON parse error: {}", e)))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSchema) -> Result<Self> {
        let mut models = HashMap::with_capacity(raw.models.len());
        for (model, raw_fields) in raw.models {
            let fields = raw_fields
                .into_iter()
                .map(|f| f.into_descriptor(&model))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ModelGraphError::Parse(e.to_string()))?;
            models.insert(model, fields);
        }
        Ok(Self { models })
    }

    /// Known model names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }
}

impl SchemaProvider for StaticSchema {
    fn fields(&self, model: &str) -> std::result::Result<Vec<FieldDescriptor>, SchemaError> {
        self.models
            .get(model)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(model.to_string()))
    }
}
