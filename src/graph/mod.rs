//! Relation graph: data model, deferred one2many bindings and the builder.
//!
//! A `RelationGraph` is produced by exactly one `RelationGraphBuilder::build`
//! call and is read-only afterwards.

mod builder;
mod pending;

pub use builder::{
    build_relation_graph, BuildOptions, EntityFilter, RelationGraphBuilder, RelationTypes,
};
pub use pending::PendingBindings;

use std::collections::HashMap;

use serde::Serialize;

use crate::schema::RelationKind;

/// Non-relational field kept verbatim on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
}

/// A relational field attached to its source entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationField {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    pub required: bool,
    /// one2many fields of `target` merged into this many2one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub o2m_fields: Vec<String>,
}

/// A registered model with its scalar and relation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<ScalarField>,
    pub relations: Vec<RelationField>,
}

impl Entity {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Relation field by name
    pub fn relation(&self, name: &str) -> Option<&RelationField> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub(crate) fn relation_mut(&mut self, name: &str) -> Option<&mut RelationField> {
        self.relations.iter_mut().find(|r| r.name == name)
    }
}

/// Finished graph of entities in discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct RelationGraph {
    root: String,
    max_depth: usize,
    entities: Vec<Entity>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl RelationGraph {
    pub(crate) fn new(root: &str, max_depth: usize, entities: Vec<Entity>) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self {
            root: root.to_string(),
            max_depth,
            entities,
            index,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// All entities, in first-discovery order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// Relation fields of `name`; empty when the entity is not in the graph
    pub fn relations_of(&self, name: &str) -> &[RelationField] {
        self.entity(name)
            .map(|e| e.relations.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Relation fields whose target is registered, as `(source, field)`.
    ///
    /// Fields pointing outside the graph (depth cutoff, filtered targets) stay
    /// on their entity but are not edges.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &RelationField)> + '_ {
        self.entities.iter().flat_map(move |e| {
            e.relations
                .iter()
                .filter(move |r| self.contains(&r.target))
                .map(move |r| (e.name.as_str(), r))
        })
    }

    /// many2many fields recorded without pairing them with the mirror field
    /// on the other model.
    pub fn one_sided_relations(&self) -> Vec<(&str, &RelationField)> {
        self.entities
            .iter()
            .flat_map(|e| {
                e.relations
                    .iter()
                    .filter(|r| r.kind == RelationKind::ManyToMany)
                    .map(move |r| (e.name.as_str(), r))
            })
            .collect()
    }

    /// True when some relations are only known from one side
    pub fn is_partial(&self) -> bool {
        self.entities
            .iter()
            .any(|e| e.relations.iter().any(|r| r.kind == RelationKind::ManyToMany))
    }
}
