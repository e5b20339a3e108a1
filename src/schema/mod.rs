//! Schema access: typed field descriptors and the providers that return them.
//!
//! The graph builder only sees the `SchemaProvider` trait. `StaticSchema`
//! serves models from memory or from a `fields_get`-style JSON/YAML dump, and
//! `CachedProvider` puts an LRU in front of any other provider.

mod cached;
mod static_schema;

pub use cached::CachedProvider;
pub use static_schema::StaticSchema;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Kind of a relational field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "many2one", alias = "many_to_one")]
    ManyToOne,
    #[serde(rename = "one2many", alias = "one_to_many")]
    OneToMany,
    #[serde(rename = "many2many", alias = "many_to_many")]
    ManyToMany,
}

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [
        RelationKind::ManyToOne,
        RelationKind::OneToMany,
        RelationKind::ManyToMany,
    ];

    /// Name used by schema services (`many2one`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::ManyToOne => "many2one",
            RelationKind::OneToMany => "one2many",
            RelationKind::ManyToMany => "many2many",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "many2one" | "many_to_one" | "m2o" => Ok(RelationKind::ManyToOne),
            "one2many" | "one_to_many" | "o2m" => Ok(RelationKind::OneToMany),
            "many2many" | "many_to_many" | "m2m" => Ok(RelationKind::ManyToMany),
            other => Err(format!("unknown relation kind: {}", other)),
        }
    }
}

/// What a field is, with the data each kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    ManyToOne {
        target: String,
    },
    /// `inverse` names the many-to-one field on `target` this field mirrors.
    OneToMany {
        target: String,
        inverse: Option<String>,
    },
    ManyToMany {
        target: String,
    },
}

/// One field as reported by a schema provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Raw type name (`char`, `integer`, `many2one`, ...)
    pub field_type: String,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn scalar(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            kind: FieldKind::Scalar,
        }
    }

    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::relational(name, FieldKind::ManyToOne { target: target.into() })
    }

    pub fn one_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        inverse: Option<&str>,
    ) -> Self {
        Self::relational(
            name,
            FieldKind::OneToMany {
                target: target.into(),
                inverse: inverse.map(str::to_string),
            },
        )
    }

    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::relational(name, FieldKind::ManyToMany { target: target.into() })
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn relational(name: impl Into<String>, kind: FieldKind) -> Self {
        let mut field = Self {
            name: name.into(),
            field_type: String::new(),
            required: false,
            kind,
        };
        if let Some(k) = field.relation_kind() {
            field.field_type = k.as_str().to_string();
        }
        field
    }

    /// Relation kind, or None for scalar fields
    pub fn relation_kind(&self) -> Option<RelationKind> {
        match self.kind {
            FieldKind::Scalar => None,
            FieldKind::ManyToOne { .. } => Some(RelationKind::ManyToOne),
            FieldKind::OneToMany { .. } => Some(RelationKind::OneToMany),
            FieldKind::ManyToMany { .. } => Some(RelationKind::ManyToMany),
        }
    }

    /// Target model of a relational field
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Scalar => None,
            FieldKind::ManyToOne { target }
            | FieldKind::OneToMany { target, .. }
            | FieldKind::ManyToMany { target } => Some(target),
        }
    }
}

/// Source of field metadata, keyed by model name.
///
/// Implementations should be idempotent: asking twice for the same model
/// returns the same descriptors in the same order.
pub trait SchemaProvider {
    /// Return the ordered field descriptors of `model`
    fn fields(&self, model: &str) -> std::result::Result<Vec<FieldDescriptor>, SchemaError>;
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for &P {
    fn fields(&self, model: &str) -> std::result::Result<Vec<FieldDescriptor>, SchemaError> {
        (**self).fields(model)
    }
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for Box<P> {
    fn fields(&self, model: &str) -> std::result::Result<Vec<FieldDescriptor>, SchemaError> {
        (**self).fields(model)
    }
}
