//! Turning a `RelationGraph` into something to look at.
//!
//! The graph carries every resolved relation already; renderers only format.

mod dot;

pub use dot::DotRenderer;

use std::fmt;
use std::str::FromStr;

use crate::error::{ModelGraphError, Result};
use crate::graph::RelationGraph;

/// Formats a finished relation graph
pub trait GraphRenderer {
    fn render(&self, graph: &RelationGraph) -> Result<String>;
}

/// Pretty-printed JSON dump of the graph
pub struct JsonRenderer;

impl GraphRenderer for JsonRenderer {
    fn render(&self, graph: &RelationGraph) -> Result<String> {
        serde_json::to_string_pretty(graph).map_err(|e| ModelGraphError::Render(e.to_string()))
    }
}

/// Output formats the CLI knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Dot,
    Json,
}

impl OutputFormat {
    pub fn renderer(&self) -> Box<dyn GraphRenderer> {
        match self {
            OutputFormat::Dot => Box::new(DotRenderer),
            OutputFormat::Json => Box::new(JsonRenderer),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ModelGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dot" | "graphviz" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            other => Err(ModelGraphError::Config(format!(
                "unknown output format '{}' (expected dot or json)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Dot => f.write_str("dot"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}
