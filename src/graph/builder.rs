//! Depth-bounded DFS over model relations.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{Entity, PendingBindings, RelationField, RelationGraph, ScalarField};
use crate::error::{ModelGraphError, Result};
use crate::schema::{FieldDescriptor, FieldKind, RelationKind, SchemaProvider};

/// Which models (other than the root) may enter the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityFilter {
    #[default]
    None,
    /// Whitelist: only these models
    Allow(HashSet<String>),
    /// Blacklist: every model except these
    Deny(HashSet<String>),
}

impl EntityFilter {
    /// Build a filter from optional black/white lists.
    ///
    /// Fails with `ModelGraphError::Config` when both lists are non-empty.
    pub fn from_lists<B, W>(blacklist: B, whitelist: W) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        let blacklist: HashSet<String> = blacklist.into_iter().map(Into::into).collect();
        let whitelist: HashSet<String> = whitelist.into_iter().map(Into::into).collect();
        match (blacklist.is_empty(), whitelist.is_empty()) {
            (false, false) => Err(ModelGraphError::Config(
                "'blacklist' and 'whitelist' can not be set simultaneously".to_string(),
            )),
            (false, true) => Ok(EntityFilter::Deny(blacklist)),
            (true, false) => Ok(EntityFilter::Allow(whitelist)),
            (true, true) => Ok(EntityFilter::None),
        }
    }

    pub fn allows(&self, model: &str) -> bool {
        match self {
            EntityFilter::None => true,
            EntityFilter::Allow(models) => models.contains(model),
            EntityFilter::Deny(models) => !models.contains(model),
        }
    }
}

/// Relation kinds the traversal follows. Defaults to all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTypes(BTreeSet<RelationKind>);

impl RelationTypes {
    pub fn all() -> Self {
        Self(RelationKind::ALL.into_iter().collect())
    }

    pub fn contains(&self, kind: RelationKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = RelationKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for RelationTypes {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<RelationKind> for RelationTypes {
    fn from_iter<I: IntoIterator<Item = RelationKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Knobs for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Root is depth 0; each followed relation adds 1
    pub max_depth: usize,
    pub filter: EntityFilter,
    pub relation_types: RelationTypes,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            filter: EntityFilter::None,
            relation_types: RelationTypes::all(),
        }
    }
}

impl BuildOptions {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_relation_types(mut self, relation_types: RelationTypes) -> Self {
        self.relation_types = relation_types;
        self
    }
}

/// Builds a `RelationGraph` by walking a schema from a root model.
pub struct RelationGraphBuilder<P> {
    provider: P,
    options: BuildOptions,
}

impl<P: SchemaProvider> RelationGraphBuilder<P> {
    pub fn new(provider: P, options: BuildOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Walk the schema from `root` and return the finished graph.
    ///
    /// Any provider failure aborts the build with `ModelGraphError::Fetch`.
    pub fn build(&self, root: &str) -> Result<RelationGraph> {
        log::info!(
            "Building relation graph from '{}' (max depth {})",
            root,
            self.options.max_depth
        );

        let mut walk = Traversal {
            provider: &self.provider,
            options: &self.options,
            root,
            entities: Vec::new(),
            links: Vec::new(),
            index: HashMap::new(),
            depths: HashMap::new(),
            pending: PendingBindings::new(),
        };
        walk.visit(root, 0)?;

        for (target, source, field, names) in walk.pending.iter() {
            log::debug!(
                "Unresolved one2many {}.{:?}: {}.{} was never reached",
                source,
                names,
                target,
                field
            );
        }

        let graph = RelationGraph::new(root, self.options.max_depth, walk.entities);
        for (source, rel) in graph.one_sided_relations() {
            log::warn!(
                "many2many {}.{} -> {} is recorded one-sided (no reciprocal merge)",
                source,
                rel.name,
                rel.target
            );
        }
        log::info!("Relation graph built: {} models", graph.len());
        Ok(graph)
    }
}

/// State owned by a single `build` call.
struct Traversal<'a, P> {
    provider: &'a P,
    options: &'a BuildOptions,
    root: &'a str,
    entities: Vec<Entity>,
    /// Targets followed from each entity, parallel to `entities`
    links: Vec<Vec<String>>,
    index: HashMap<String, usize>,
    /// Shallowest depth each registered entity was walked at
    depths: HashMap<String, usize>,
    pending: PendingBindings,
}

impl<P: SchemaProvider> Traversal<'_, P> {
    fn visit(&mut self, model: &str, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Ok(());
        }

        if let Some(idx) = self.index.get(model).copied() {
            if self.depths.get(model).is_some_and(|&seen| depth < seen) {
                // Reached by a shorter path: fields stay as they are, only
                // the reachable neighbourhood grows.
                self.depths.insert(model.to_string(), depth);
                let links = self.links[idx].clone();
                for target in &links {
                    self.visit(target, depth + 1)?;
                }
            }
            return Ok(());
        }

        if model != self.root && !self.options.filter.allows(model) {
            log::debug!("Skipping filtered model {}", model);
            return Ok(());
        }

        log::debug!("Visiting {} at depth {}", model, depth);
        let idx = self.entities.len();
        self.entities.push(Entity::new(model));
        self.links.push(Vec::new());
        self.index.insert(model.to_string(), idx);
        self.depths.insert(model.to_string(), depth);

        let fields = self.provider.fields(model).map_err(|source| {
            log::error!("Failed to fetch fields of {}: {}", model, source);
            ModelGraphError::Fetch {
                model: model.to_string(),
                source,
            }
        })?;

        for field in fields {
            self.process_field(idx, model, field, depth)?;
        }
        Ok(())
    }

    fn process_field(
        &mut self,
        idx: usize,
        model: &str,
        field: FieldDescriptor,
        depth: usize,
    ) -> Result<()> {
        if let Some(kind) = field.relation_kind() {
            if !self.options.relation_types.contains(kind) {
                return Ok(());
            }
        }

        let target = match field.kind {
            FieldKind::Scalar => {
                self.entities[idx].fields.push(ScalarField {
                    name: field.name,
                    field_type: field.field_type,
                    required: field.required,
                });
                return Ok(());
            }
            FieldKind::ManyToOne { target } => {
                // one2many fields of `target` seen before this many2one
                let o2m_fields = self.pending.drain(model, &target, &field.name);
                self.entities[idx].relations.push(RelationField {
                    name: field.name,
                    kind: RelationKind::ManyToOne,
                    target: target.clone(),
                    required: field.required,
                    o2m_fields,
                });
                target
            }
            FieldKind::OneToMany { target, inverse } => {
                match inverse {
                    Some(inverse) => self.bind_one2many(model, &field.name, &target, &inverse),
                    None => log::debug!(
                        "Dropping one2many {}.{}: no inverse field declared",
                        model,
                        field.name
                    ),
                }
                target
            }
            FieldKind::ManyToMany { target } => {
                self.entities[idx].relations.push(RelationField {
                    name: field.name,
                    kind: RelationKind::ManyToMany,
                    target: target.clone(),
                    required: field.required,
                    o2m_fields: Vec::new(),
                });
                target
            }
        };

        self.links[idx].push(target.clone());
        self.visit(&target, depth + 1)
    }

    /// Merge `source.o2m_field` into `target.inverse`, now or once it shows up.
    fn bind_one2many(&mut self, source: &str, o2m_field: &str, target: &str, inverse: &str) {
        let existing = self
            .index
            .get(target)
            .copied()
            .and_then(|t| self.entities[t].relation_mut(inverse));

        match existing {
            Some(rel) if rel.kind == RelationKind::ManyToOne && rel.target == source => {
                if !rel.o2m_fields.iter().any(|n| n == o2m_field) {
                    rel.o2m_fields.push(o2m_field.to_string());
                }
            }
            Some(rel) => log::debug!(
                "Inverse {}.{} of one2many {}.{} is a {} to {}, not bound",
                target,
                inverse,
                source,
                o2m_field,
                rel.kind,
                rel.target
            ),
            None => self.pending.insert(target, source, inverse, o2m_field),
        }
    }
}

/// Build a relation graph from plain black/white lists.
///
/// Fails with `ModelGraphError::Config` before any schema lookup when both
/// lists are non-empty.
pub fn build_relation_graph<P, B, W>(
    provider: P,
    root: &str,
    max_depth: usize,
    blacklist: B,
    whitelist: W,
    relation_types: RelationTypes,
) -> Result<RelationGraph>
where
    P: SchemaProvider,
    B: IntoIterator,
    B::Item: Into<String>,
    W: IntoIterator,
    W::Item: Into<String>,
{
    let options = BuildOptions::new(max_depth)
        .with_filter(EntityFilter::from_lists(blacklist, whitelist)?)
        .with_relation_types(relation_types);
    RelationGraphBuilder::new(provider, options).build(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::StaticSchema;
    use std::cell::RefCell;

    /// A.b -> B ; B.a_list (one2many, inverse b) -> A ; B.name scalar
    fn ab_schema() -> StaticSchema {
        StaticSchema::new()
            .with_model("A", vec![FieldDescriptor::many_to_one("b", "B")])
            .with_model(
                "B",
                vec![
                    FieldDescriptor::one_to_many("a_list", "A", Some("b")),
                    FieldDescriptor::scalar("name", "char"),
                ],
            )
    }

    fn names(graph: &RelationGraph) -> Vec<&str> {
        graph.entities().iter().map(|e| e.name.as_str()).collect()
    }

    fn o2m_of<'g>(graph: &'g RelationGraph, model: &str, field: &str) -> &'g [String] {
        &graph.entity(model).unwrap().relation(field).unwrap().o2m_fields
    }

    /// Records every lookup so tests can check memoization
    struct RecordingProvider {
        inner: StaticSchema,
        calls: RefCell<Vec<String>>,
    }

    impl SchemaProvider for RecordingProvider {
        fn fields(&self, model: &str) -> std::result::Result<Vec<FieldDescriptor>, SchemaError> {
            self.calls.borrow_mut().push(model.to_string());
            self.inner.fields(model)
        }
    }

    #[test]
    fn test_forward_order_merges_immediately() {
        let graph = RelationGraphBuilder::new(ab_schema(), BuildOptions::new(2))
            .build("A")
            .unwrap();

        assert_eq!(names(&graph), vec!["A", "B"]);
        assert_eq!(o2m_of(&graph, "A", "b"), ["a_list"]);
        // The one2many never stands alone
        assert!(graph.relations_of("B").is_empty());
        assert_eq!(graph.entity("B").unwrap().fields[0].name, "name");
    }

    #[test]
    fn test_reverse_order_merges_through_pending() {
        let graph = RelationGraphBuilder::new(ab_schema(), BuildOptions::new(2))
            .build("B")
            .unwrap();

        assert_eq!(names(&graph), vec!["B", "A"]);
        assert_eq!(o2m_of(&graph, "A", "b"), ["a_list"]);
        assert!(graph.relations_of("B").is_empty());
    }

    #[test]
    fn test_depth_zero_keeps_edge_metadata_only() {
        let graph = RelationGraphBuilder::new(ab_schema(), BuildOptions::new(0))
            .build("A")
            .unwrap();

        assert_eq!(names(&graph), vec!["A"]);
        let b = graph.entity("A").unwrap().relation("b").unwrap();
        assert_eq!(b.target, "B");
        assert!(b.o2m_fields.is_empty());
        assert_eq!(graph.edges().count(), 0);
    }

    #[test]
    fn test_type_filter_excludes_one2many() {
        let types: RelationTypes = [RelationKind::ManyToOne].into_iter().collect();
        let options = BuildOptions::new(2).with_relation_types(types);
        for root in ["A", "B"] {
            let graph = RelationGraphBuilder::new(ab_schema(), options.clone())
                .build(root)
                .unwrap();
            if let Some(a) = graph.entity("A") {
                assert!(a.relation("b").unwrap().o2m_fields.is_empty());
            }
        }

        // From B nothing is followed at all
        let graph = RelationGraphBuilder::new(ab_schema(), options).build("B").unwrap();
        assert_eq!(names(&graph), vec!["B"]);
    }

    #[test]
    fn test_merge_is_order_independent_across_deeper_cycles() {
        // order.partner_id -> partner, partner.order_ids (o2m, inverse partner_id),
        // order.line_ids (o2m, inverse order_id), line.order_id -> order
        let schema = StaticSchema::new()
            .with_model(
                "order",
                vec![
                    FieldDescriptor::many_to_one("partner_id", "partner").required(),
                    FieldDescriptor::one_to_many("line_ids", "line", Some("order_id")),
                ],
            )
            .with_model(
                "partner",
                vec![FieldDescriptor::one_to_many("order_ids", "order", Some("partner_id"))],
            )
            .with_model(
                "line",
                vec![FieldDescriptor::many_to_one("order_id", "order")],
            );

        for root in ["order", "partner", "line"] {
            let graph = RelationGraphBuilder::new(&schema, BuildOptions::new(3))
                .build(root)
                .unwrap();
            assert_eq!(graph.len(), 3, "root {}", root);
            assert_eq!(o2m_of(&graph, "order", "partner_id"), ["order_ids"], "root {}", root);
            assert_eq!(o2m_of(&graph, "line", "order_id"), ["line_ids"], "root {}", root);
            assert!(graph.entity("order").unwrap().relation("partner_id").unwrap().required);
        }
    }

    #[test]
    fn test_self_referencing_model() {
        let schema = StaticSchema::new().with_model(
            "res.partner",
            vec![
                FieldDescriptor::one_to_many("child_ids", "res.partner", Some("parent_id")),
                FieldDescriptor::many_to_one("parent_id", "res.partner"),
            ],
        );
        let graph = RelationGraphBuilder::new(schema, BuildOptions::new(5))
            .build("res.partner")
            .unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(o2m_of(&graph, "res.partner", "parent_id"), ["child_ids"]);
        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn test_one2many_without_inverse_is_dropped_but_followed() {
        let schema = StaticSchema::new()
            .with_model(
                "A",
                vec![FieldDescriptor::one_to_many("log_ids", "B", None)],
            )
            .with_model("B", vec![FieldDescriptor::scalar("name", "char")]);
        let graph = RelationGraphBuilder::new(schema, BuildOptions::new(1))
            .build("A")
            .unwrap();

        assert_eq!(names(&graph), vec!["A", "B"]);
        assert!(graph.relations_of("A").is_empty());
    }

    #[test]
    fn test_inverse_pointing_elsewhere_is_not_merged() {
        let schema = StaticSchema::new()
            .with_model("A", vec![FieldDescriptor::many_to_one("b", "C")])
            .with_model(
                "B",
                vec![FieldDescriptor::one_to_many("a_list", "A", Some("b"))],
            )
            .with_model("C", vec![]);
        for root in ["A", "B"] {
            let graph = RelationGraphBuilder::new(&schema, BuildOptions::new(3))
                .build(root)
                .unwrap();
            assert!(o2m_of(&graph, "A", "b").is_empty(), "root {}", root);
        }
    }

    #[test]
    fn test_many2many_recorded_one_sided() {
        let schema = StaticSchema::new()
            .with_model("A", vec![FieldDescriptor::many_to_many("tag_ids", "T")])
            .with_model("T", vec![FieldDescriptor::many_to_many("a_ids", "A")]);
        let graph = RelationGraphBuilder::new(schema, BuildOptions::new(1))
            .build("A")
            .unwrap();

        assert_eq!(names(&graph), vec!["A", "T"]);
        assert_eq!(graph.relations_of("A")[0].kind, RelationKind::ManyToMany);
        assert_eq!(graph.relations_of("T")[0].kind, RelationKind::ManyToMany);
        assert!(graph.is_partial());
        assert_eq!(graph.one_sided_relations().len(), 2);
    }

    #[test]
    fn test_root_exempt_from_filters() {
        let deny = EntityFilter::from_lists(vec!["A", "B"], Vec::<String>::new()).unwrap();
        let graph = RelationGraphBuilder::new(ab_schema(), BuildOptions::new(2).with_filter(deny))
            .build("A")
            .unwrap();
        assert_eq!(names(&graph), vec!["A"]);

        let allow = EntityFilter::from_lists(Vec::<String>::new(), vec!["B"]).unwrap();
        let graph = RelationGraphBuilder::new(ab_schema(), BuildOptions::new(2).with_filter(allow))
            .build("A")
            .unwrap();
        assert_eq!(names(&graph), vec!["A", "B"]);
        assert_eq!(o2m_of(&graph, "A", "b"), ["a_list"]);

        let allow = EntityFilter::from_lists(Vec::<String>::new(), vec!["C"]).unwrap();
        let graph = RelationGraphBuilder::new(ab_schema(), BuildOptions::new(2).with_filter(allow))
            .build("A")
            .unwrap();
        assert_eq!(names(&graph), vec!["A"]);
    }

    #[test]
    fn test_filtered_model_never_fetched() {
        let provider = RecordingProvider {
            inner: ab_schema(),
            calls: RefCell::new(Vec::new()),
        };
        let deny = EntityFilter::from_lists(vec!["B"], Vec::<String>::new()).unwrap();
        let graph = RelationGraphBuilder::new(&provider, BuildOptions::new(3).with_filter(deny))
            .build("A")
            .unwrap();

        assert_eq!(names(&graph), vec!["A"]);
        assert_eq!(*provider.calls.borrow(), vec!["A".to_string()]);
        // The edge metadata survives, the edge itself does not
        assert!(graph.entity("A").unwrap().relation("b").is_some());
        assert_eq!(graph.edges().count(), 0);
    }

    #[test]
    fn test_blacklist_and_whitelist_conflict() {
        let err = EntityFilter::from_lists(vec!["A"], vec!["B"]).unwrap_err();
        assert!(matches!(err, ModelGraphError::Config(_)));

        let err = build_relation_graph(
            ab_schema(),
            "A",
            0,
            vec!["x"],
            vec!["y"],
            RelationTypes::all(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelGraphError::Config(_)));
    }

    #[test]
    fn test_conflict_detected_before_any_fetch() {
        let provider = RecordingProvider {
            inner: ab_schema(),
            calls: RefCell::new(Vec::new()),
        };
        let result = build_relation_graph(
            &provider,
            "A",
            3,
            vec!["B"],
            vec!["A"],
            RelationTypes::all(),
        );
        assert!(result.is_err());
        assert!(provider.calls.borrow().is_empty());
    }

    #[test]
    fn test_fetch_error_aborts_build() {
        let schema = StaticSchema::new()
            .with_model("A", vec![FieldDescriptor::many_to_one("b", "Missing")]);
        let err = RelationGraphBuilder::new(schema, BuildOptions::new(2))
            .build("A")
            .unwrap_err();
        match err {
            ModelGraphError::Fetch { model, source } => {
                assert_eq!(model, "Missing");
                assert_eq!(source, SchemaError::NotFound("Missing".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_root_fails() {
        let err = RelationGraphBuilder::new(StaticSchema::new(), BuildOptions::default())
            .build("nowhere")
            .unwrap_err();
        assert!(matches!(err, ModelGraphError::Fetch { .. }));
    }

    #[test]
    fn test_each_model_fetched_once_in_cycles() {
        let schema = StaticSchema::new()
            .with_model(
                "A",
                vec![
                    FieldDescriptor::many_to_one("b", "B"),
                    FieldDescriptor::many_to_one("c", "C"),
                ],
            )
            .with_model("B", vec![FieldDescriptor::many_to_one("c", "C")])
            .with_model("C", vec![FieldDescriptor::many_to_one("a", "A")]);
        let provider = RecordingProvider {
            inner: schema,
            calls: RefCell::new(Vec::new()),
        };
        let graph = RelationGraphBuilder::new(&provider, BuildOptions::new(10))
            .build("A")
            .unwrap();

        assert_eq!(names(&graph), vec!["A", "B", "C"]);
        let mut calls = provider.calls.borrow().clone();
        calls.sort();
        calls.dedup();
        assert_eq!(calls.len(), provider.calls.borrow().len());
    }

    /// R.a -> A -> B -> Y and R.y -> Y -> Z: Y is first registered through
    /// the long path, then reached again at depth 1.
    fn detour_schema() -> StaticSchema {
        StaticSchema::new()
            .with_model(
                "R",
                vec![
                    FieldDescriptor::many_to_one("a", "A"),
                    FieldDescriptor::many_to_one("y", "Y"),
                ],
            )
            .with_model("A", vec![FieldDescriptor::many_to_one("b", "B")])
            .with_model("B", vec![FieldDescriptor::many_to_one("y", "Y")])
            .with_model("Y", vec![FieldDescriptor::many_to_one("z", "Z")])
            .with_model("Z", vec![FieldDescriptor::scalar("name", "char")])
    }

    #[test]
    fn test_shorter_path_expands_registered_model() {
        let graph = RelationGraphBuilder::new(detour_schema(), BuildOptions::new(3))
            .build("R")
            .unwrap();
        assert_eq!(names(&graph), vec!["R", "A", "B", "Y", "Z"]);
    }

    #[test]
    fn test_depth_monotonic() {
        for (schema, root) in [(detour_schema(), "R"), (ab_schema(), "B")] {
            let mut previous: Vec<String> = Vec::new();
            for depth in 0..6 {
                let graph = RelationGraphBuilder::new(&schema, BuildOptions::new(depth))
                    .build(root)
                    .unwrap();
                let current: Vec<String> =
                    graph.entities().iter().map(|e| e.name.clone()).collect();
                for name in &previous {
                    assert!(current.contains(name), "{} lost at depth {}", name, depth);
                }
                let unique: HashSet<_> = current.iter().collect();
                assert_eq!(unique.len(), current.len());
                previous = current;
            }
        }
    }

    #[test]
    fn test_free_function_builds() {
        let graph = build_relation_graph(
            ab_schema(),
            "B",
            2,
            Vec::<String>::new(),
            Vec::<String>::new(),
            RelationTypes::default(),
        )
        .unwrap();
        assert_eq!(graph.root(), "B");
        assert_eq!(graph.max_depth(), 2);
        assert_eq!(o2m_of(&graph, "A", "b"), ["a_list"]);
    }
}
