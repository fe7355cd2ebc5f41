//! Command-line interface orchestration for the engawa reordering pipeline.
//!
//! The CLI offers a `reorder` command that loads a JSON document holding a
//! cluster tree plus a pairwise source, runs the reordering engine, and
//! renders a before/after summary.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use engawa_core::{
    ExecutionStrategy, Objective, ReorderError, ReorderMetrics, Reorderer, ReordererBuilder,
    SimilarityProvider,
};

use crate::input::{InputError, InputSource, LoadedInput, load_input};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "engawa", about = "Reorder dendrogram leaves by similarity.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Reorder the leaves of a cluster tree.
    Reorder(ReorderCommand),
}

/// Options accepted by the `reorder` command.
#[derive(Debug, Args, Clone)]
pub struct ReorderCommand {
    /// Path to the JSON input document.
    pub input: PathBuf,

    /// Optimization direction. Defaults to `similarity` for matrix inputs
    /// and `distance` for vector inputs.
    #[arg(long, value_enum)]
    pub objective: Option<ObjectiveArg>,

    /// Reject runs whose estimated table memory exceeds this many bytes.
    #[arg(long)]
    pub memory_budget_bytes: Option<u64>,

    /// Force sequential recursion.
    #[arg(long)]
    pub serial: bool,
}

/// Optimization directions selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ObjectiveArg {
    /// Treat pairwise values as similarities and maximize adjacency.
    Similarity,
    /// Treat pairwise values as distances and minimize adjacency.
    Distance,
}

impl From<ObjectiveArg> for Objective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::Similarity => Self::MaximizeSimilarity,
            ObjectiveArg::Distance => Self::MinimizeDistance,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while loading the input document.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Input parsing or validation failed.
    #[error(transparent)]
    Input(#[from] InputError),
    /// Core reordering failed.
    #[error(transparent)]
    Core(#[from] ReorderError),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Name reported by the pairwise source.
    pub data_source: String,
    /// Objective the run was executed with.
    pub objective: Objective,
    /// Leaf labels in input order.
    pub order_before: Vec<String>,
    /// Leaf labels in reordered order.
    pub order_after: Vec<String>,
    /// Before/after adjacency sums.
    pub metrics: ReorderMetrics,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading, parsing, or execution fails.
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Reorder(reorder) => run_reorder(reorder),
    }
}

fn run_reorder(command: ReorderCommand) -> Result<ExecutionSummary, CliError> {
    let reader = open_input_reader(&command.input)?;
    let input = load_input(reader)?;

    let objective = command.objective.map_or_else(
        || match &input.source {
            InputSource::Matrix(_) => Objective::MaximizeSimilarity,
            InputSource::Vectors(_) => Objective::MinimizeDistance,
        },
        Objective::from,
    );

    let strategy = if command.serial {
        ExecutionStrategy::Serial
    } else {
        ExecutionStrategy::Auto
    };

    let reorderer = ReordererBuilder::new()
        .with_objective(objective)
        .with_execution_strategy(strategy)
        .with_memory_budget(command.memory_budget_bytes)
        .build()?;

    match &input.source {
        InputSource::Matrix(provider) => execute(&reorderer, &input, provider, objective),
        InputSource::Vectors(provider) => execute(&reorderer, &input, provider, objective),
    }
}

fn execute<P>(
    reorderer: &Reorderer,
    input: &LoadedInput,
    provider: &P,
    objective: Objective,
) -> Result<ExecutionSummary, CliError>
where
    P: SimilarityProvider + Sync,
{
    let result = reorderer.run(&input.tree, provider)?;
    Ok(ExecutionSummary {
        data_source: provider.name().to_owned(),
        objective,
        order_before: input.labels_for(&input.tree.leaf_order()),
        order_after: input.labels_for(result.leaf_order()),
        metrics: result.metrics(),
    })
}

fn open_input_reader(path: &Path) -> Result<BufReader<File>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let objective = match summary.objective {
        Objective::MaximizeSimilarity => "maximize similarity",
        Objective::MinimizeDistance => "minimize distance",
    };
    writeln!(writer, "data source: {}", summary.data_source)?;
    writeln!(writer, "objective: {objective}")?;
    writeln!(
        writer,
        "order before: {} (adjacency {})",
        summary.order_before.join(" "),
        summary.metrics.adjacency_before()
    )?;
    writeln!(
        writer,
        "order after: {} (adjacency {})",
        summary.order_after.join(" "),
        summary.metrics.adjacency_after()
    )?;
    Ok(())
}
