//! Shader graph compiler CLI.
//!
//! Provides the `shadergraph` binary. `compile` loads a JSON graph
//! description, runs the pipeline through `shadergraph_compile::compile()`
//! and prints the result; `hash` prints the displacement hash of the graph
//! as authored.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

mod description;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use shadergraph_compile::{CompileOptions, CompileReport, Stage};
use shadergraph_core::{AovKind, SceneContext};

use description::{DescriptionError, GraphDescription};

/// Shader graph compiler and tools.
#[derive(Parser)]
#[command(name = "shadergraph", about = "Shader graph compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Simplify or finalize a graph description.
    Compile {
        /// Path to the JSON graph description.
        #[arg(short, long)]
        graph: PathBuf,

        /// Keep displacement as is instead of deriving a bumped normal.
        #[arg(long)]
        no_bump: bool,

        /// Evaluate the derived bump in object space.
        #[arg(long)]
        object_space_bump: bool,

        /// Register an AOV pass; append `:color` for colour passes.
        #[arg(long = "aov", value_name = "NAME[:color]")]
        aovs: Vec<String>,

        /// Last pipeline stage to run.
        #[arg(long, value_enum, default_value_t = StageArg::Finalize)]
        stage: StageArg,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Print the displacement hash of a graph description.
    Hash {
        /// Path to the JSON graph description.
        #[arg(short, long)]
        graph: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    Simplify,
    Finalize,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Simplify => Stage::Simplify,
            StageArg::Finalize => Stage::Finalize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Compile report plus the node and link listing, as JSON.
    Json,
    /// Node and link listing.
    Text,
    /// Graphviz source.
    Dot,
}

/// What `compile --format json` prints.
#[derive(Serialize)]
struct CompileOutput {
    #[serde(flatten)]
    report: CompileReport,
    dump: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Compile {
            graph,
            no_bump,
            object_space_bump,
            aovs,
            stage,
            format,
        } => {
            let options = CompileOptions {
                stage: stage.into(),
                do_bump: !no_bump,
                bump_in_object_space: object_space_bump,
            };
            run_compile(&graph, &aovs, &options, format)
        }
        Commands::Hash { graph } => run_hash(&graph),
    };
    process::exit(exit_code);
}

/// Execute the compile subcommand.
///
/// Returns exit code: 0 = success, 1 = invalid description or compilation
/// error, 3 = I/O error.
fn run_compile(path: &Path, aovs: &[String], options: &CompileOptions, format: Format) -> i32 {
    match compile_description(path, aovs, options, format) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => report_error(e),
    }
}

fn compile_description(
    path: &Path,
    aovs: &[String],
    options: &CompileOptions,
    format: Format,
) -> Result<String, DescriptionError> {
    let description = GraphDescription::load(path)?;
    let ctx = scene_context(description.scene.clone(), aovs)?;
    let mut graph = description.build()?;

    // diagnostics are already logged at warn level as they are recorded
    let report = shadergraph_compile::compile(&mut graph, &ctx, options)?;

    let output = match format {
        Format::Text => shadergraph_compile::dump_graph(&graph)?,
        Format::Dot => shadergraph_compile::to_dot(&graph)?,
        Format::Json => {
            let dump = shadergraph_compile::dump_graph(&graph)?
                .lines()
                .map(str::to_string)
                .collect();
            serde_json::to_string_pretty(&CompileOutput { report, dump })?
        }
    };
    Ok(output)
}

/// Execute the hash subcommand. Exit codes match `compile`.
fn run_hash(path: &Path) -> i32 {
    let result = GraphDescription::load(path)
        .and_then(|description| description.build())
        .and_then(|graph| Ok(shadergraph_compile::compute_displacement_hash(&graph)?));
    match result {
        Ok(hash) => {
            println!("{}", hash);
            0
        }
        Err(e) => report_error(e),
    }
}

fn report_error(error: DescriptionError) -> i32 {
    match error {
        DescriptionError::Io(e) => {
            eprintln!("I/O error: {}", e);
            3
        }
        e => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Adds `--aov NAME[:color|:value]` registrations to the description's scene.
fn scene_context(mut ctx: SceneContext, aovs: &[String]) -> Result<SceneContext, DescriptionError> {
    for aov in aovs {
        let (name, kind) = parse_aov(aov)?;
        ctx.aovs.insert(name.to_string(), kind);
    }
    Ok(ctx)
}

fn parse_aov(arg: &str) -> Result<(&str, AovKind), DescriptionError> {
    match arg.split_once(':') {
        None => Ok((arg, AovKind::Value)),
        Some((name, "value")) => Ok((name, AovKind::Value)),
        Some((name, "color")) => Ok((name, AovKind::Color)),
        Some(_) => Err(DescriptionError::BadAov(arg.to_string())),
    }
}
