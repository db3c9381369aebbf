use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gitgo",
    about = "gitgo -- staging index with merge stages",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with index settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Index file location (overrides the config file)
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    /// Format version for a newly created index (2, 3 or 4)
    #[arg(long, global = true)]
    pub index_version: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty index
    Init(InitArgs),
    /// Stage files or directories at stage 0
    Add(AddArgs),
    /// Stage a file's content at an address such as `<oid>` or `2:<oid>`
    Update(UpdateArgs),
    /// Remove entries at an address
    Rm(RmArgs),
    /// Show the entries at an address
    Show(ShowArgs),
    /// List staged paths
    LsFiles(LsFilesArgs),
    /// Count entries per stage
    Count(CountArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Replace an existing index with an empty one
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub address: String,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct RmArgs {
    pub address: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub address: String,
}

#[derive(Args)]
pub struct LsFilesArgs {
    /// Include paths from conflict stages 1-3
    #[arg(short, long)]
    pub unmerged: bool,
    /// Show mode, object id and stage for each entry
    #[arg(short, long)]
    pub stage: bool,
}

#[derive(Args)]
pub struct CountArgs {}
