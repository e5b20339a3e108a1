use anyhow::{Context, Result};
use clap::Parser;
use modelgraph::{
    BuildOptions, Config, EntityFilter, OutputFormat, RelationGraph, RelationGraphBuilder,
    RelationKind, RelationTypes, StaticSchema,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "modelgraph")]
#[command(about = "Draw the relation graph of a data model starting from one model")]
struct Args {
    /// Config file (defaults to $MODELGRAPH_CONFIG or ./modelgraph.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema dump (.json, .yaml or .yml)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Model to start from
    #[arg(short, long)]
    root: Option<String>,

    /// Maximum number of relations followed from the root
    #[arg(short, long)]
    depth: Option<usize>,

    /// Models to leave out (comma separated)
    #[arg(long, value_delimiter = ',')]
    blacklist: Vec<String>,

    /// Only include these models besides the root (comma separated)
    #[arg(long, value_delimiter = ',')]
    whitelist: Vec<String>,

    /// Relation kinds to follow: many2one, one2many, many2many
    #[arg(long, value_delimiter = ',')]
    relation_types: Vec<RelationKind>,

    /// Output format: dot or json
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Everything a run needs once CLI and config file are merged
struct RunSettings {
    schema: PathBuf,
    root: String,
    options: BuildOptions,
    format: OutputFormat,
    output: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Option<Config>> {
    if let Some(path) = &args.config {
        return Config::load_from(path).map(Some);
    }
    let _ = dotenv::dotenv();
    let explicit = std::env::var_os("MODELGRAPH_CONFIG").is_some();
    if explicit || PathBuf::from("modelgraph.toml").is_file() {
        return Config::load().map(Some);
    }
    Ok(None)
}

fn resolve_settings(args: Args, config: Option<&Config>) -> Result<RunSettings> {
    let schema = args
        .schema
        .or_else(|| config.map(|c| c.schema_path().to_path_buf()))
        .context("No schema given: pass --schema or set [schema] path in the config file")?;
    let root = args
        .root
        .or_else(|| config.map(|c| c.graph.root.clone()))
        .context("No root model given: pass --root or set [graph] root in the config file")?;

    let mut options = match config {
        Some(c) => c.build_options()?,
        None => BuildOptions::default(),
    };
    if let Some(depth) = args.depth {
        options.max_depth = depth;
    }
    if !args.blacklist.is_empty() || !args.whitelist.is_empty() {
        options.filter = EntityFilter::from_lists(args.blacklist, args.whitelist)?;
    }
    if !args.relation_types.is_empty() {
        options.relation_types = args.relation_types.into_iter().collect::<RelationTypes>();
    }

    let format = match (args.format, config) {
        (Some(format), _) => format,
        (None, Some(c)) => c.output_format()?,
        (None, None) => OutputFormat::default(),
    };
    let output = args
        .output
        .or_else(|| config.and_then(|c| c.output.path.clone()));

    Ok(RunSettings {
        schema,
        root,
        options,
        format,
        output,
    })
}

fn print_summary(graph: &RelationGraph, elapsed: std::time::Duration) {
    eprintln!(
        "{} models, {} edges from '{}' (max depth {}) in {:?}",
        graph.len(),
        graph.edges().count(),
        graph.root(),
        graph.max_depth(),
        elapsed
    );
    let one_sided = graph.one_sided_relations();
    if !one_sided.is_empty() {
        eprintln!(
            "Warning: {} many2many relation(s) drawn from one side only",
            one_sided.len()
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let log_level = config
        .as_ref()
        .map(|c| c.modelgraph.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let settings = resolve_settings(args, config.as_ref())?;
    log::info!("Starting ModelGraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Schema: {}", settings.schema.display());

    let schema = StaticSchema::from_path(&settings.schema)?;

    let start = Instant::now();
    let graph = RelationGraphBuilder::new(&schema, settings.options).build(&settings.root)?;
    let elapsed = start.elapsed();

    let rendered = settings.format.renderer().render(&graph)?;
    match &settings.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {} graph to {}", settings.format, path.display());
        }
        None => println!("{}", rendered),
    }

    print_summary(&graph, elapsed);
    Ok(())
}
