//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    corpus::CorpusCommands, design::DesignCommands, query::QueryArgs, study::StudyArgs,
};

#[derive(Parser)]
#[command(name = "adg")]
#[command(author, version, about = "Airframe Design Graph")]
#[command(long_about = "Build parameterized airframe design graphs, keep them in a design store, query them with templates and generate study tables for batch runs.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Design store database (default: .adg/designs.db in the project)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Component corpus: validate the catalog, show models
    #[command(subcommand)]
    Corpus(CorpusCommands),

    /// Designs in the store: list, export, import, delete
    #[command(subcommand)]
    Design(DesignCommands),

    /// Run a query template against the store
    Query(QueryArgs),

    /// Generate a study parameter table
    Study(StudyArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tables on a terminal, JSON for documents
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// YAML format
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
}
