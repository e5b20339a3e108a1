pub mod config;
pub mod error;
pub mod graph;
pub mod render;
pub mod schema;

pub use config::Config;
pub use error::{ModelGraphError, Result, SchemaError};
pub use graph::{
    build_relation_graph, BuildOptions, Entity, EntityFilter, RelationField, RelationGraph,
    RelationGraphBuilder, RelationTypes, ScalarField,
};
pub use render::{DotRenderer, GraphRenderer, JsonRenderer, OutputFormat};
pub use schema::{
    CachedProvider, FieldDescriptor, FieldKind, RelationKind, SchemaProvider, StaticSchema,
};
