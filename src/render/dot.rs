//! Graphviz DOT output with HTML-table node labels.

use std::fmt::Write as _;

use super::GraphRenderer;
use crate::error::{ModelGraphError, Result};
use crate::graph::{Entity, RelationField, RelationGraph};
use crate::schema::RelationKind;

const COLOR_MANY2ONE: &str = "#0E2548";
const COLOR_X2MANY: &str = "#008200";
const COLOR_REQUIRED: &str = "blue";
const COLOR_NORMAL: &str = "black";
const COLOR_HEADER: &str = "#64629C";

fn kind_color(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::ManyToOne => COLOR_MANY2ONE,
        RelationKind::OneToMany | RelationKind::ManyToMany => COLOR_X2MANY,
    }
}

/// Renders one node per model and one edge per relation whose target is in
/// the graph.
pub struct DotRenderer;

impl GraphRenderer for DotRenderer {
    fn render(&self, graph: &RelationGraph) -> Result<String> {
        let mut out = String::new();
        write_graph(&mut out, graph).map_err(|e| ModelGraphError::Render(e.to_string()))?;
        Ok(out)
    }
}

fn write_graph(out: &mut String, graph: &RelationGraph) -> std::fmt::Result {
    writeln!(out, "digraph {{")?;
    writeln!(out, "  overlap=\"scalexy\";")?;
    writeln!(out, "  splines=\"true\";")?;
    for entity in graph.entities() {
        write_node(out, entity)?;
    }
    for (source, rel) in graph.edges() {
        write_edge(out, source, rel)?;
    }
    writeln!(out, "}}")
}

fn write_node(out: &mut String, entity: &Entity) -> std::fmt::Result {
    let mut rows = String::new();
    for field in &entity.fields {
        let color = if field.required { COLOR_REQUIRED } else { COLOR_NORMAL };
        write!(
            rows,
            "<tr><td align=\"left\" border=\"0\">- <font color=\"{color}\">{name}</font></td>\
             <td align=\"left\" border=\"0\"><font color=\"{color}\">{ty}</font></td></tr>",
            color = color,
            name = escape_html(&field.name),
            ty = escape_html(&field.field_type),
        )?;
    }
    writeln!(
        out,
        "  \"{id}\" [margin=\"0\", shape=\"none\", label=<<table cellborder=\"0\" cellpadding=\"0\" \
         cellspacing=\"0\" border=\"1\" bgcolor=\"white\"><tr><td border=\"0\" bgcolor=\"{header}\" \
         align=\"center\" colspan=\"2\"><font color=\"white\">{name}</font></td></tr>{rows}</table>>];",
        id = escape_id(&entity.name),
        header = COLOR_HEADER,
        name = escape_html(&entity.name),
        rows = rows,
    )
}

fn write_edge(out: &mut String, source: &str, rel: &RelationField) -> std::fmt::Result {
    let name_color = if rel.required { COLOR_REQUIRED } else { kind_color(rel.kind) };
    let mut label = format!(
        "<font color=\"{}\">{}</font>",
        name_color,
        escape_html(&rel.name)
    );
    if rel.kind == RelationKind::ManyToOne && !rel.o2m_fields.is_empty() {
        let o2m: Vec<String> = rel.o2m_fields.iter().map(|f| escape_html(f)).collect();
        write!(
            label,
            " <font color=\"{}\">({})</font>",
            COLOR_X2MANY,
            o2m.join(", ")
        )?;
    }
    let arrowhead = if rel.kind == RelationKind::ManyToMany { "none" } else { "normal" };
    writeln!(
        out,
        "  \"{}\" -> \"{}\" [label=<{}>, color=\"{color}\", fontcolor=\"{color}\", arrowhead=\"{}\"];",
        escape_id(source),
        escape_id(&rel.target),
        label,
        arrowhead,
        color = kind_color(rel.kind),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_id(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
