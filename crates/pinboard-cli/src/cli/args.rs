use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pinboard", version, about = "Manage pins from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Set the board to use for subcommands
    SetBoard(SetBoardArgs),
    /// List all pins
    List(ListArgs),
    /// Get metadata for a pin
    Meta(MetaArgs),
    /// List the versions of a pin, oldest first
    Versions(PinArgs),
    /// Write data to a pin
    Write(WriteArgs),
    /// Download the files of a pin and print their local paths
    Download(DownloadArgs),
    /// Search pins by name or title
    Search(SearchArgs),
    /// Delete pins with all their versions
    Delete(DeleteArgs),
    /// Delete old versions of a pin
    Prune(PruneArgs),
    /// Inspect or prune the local cache
    Cache(CacheArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct SetBoardArgs {
    /// Board location (folder path or remote root)
    pub board: String,

    /// Storage protocol: file, memory or remote
    #[arg(short, long)]
    pub protocol: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// Regex matched against pin names
    #[arg(short, long, default_value = ".*")]
    pub pattern: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetaFormat {
    Json,
    Yaml,
}

#[derive(clap::Args, Debug, Clone)]
pub struct MetaArgs {
    /// The name of the pin
    pub pin: String,

    /// Pin metadata output format
    #[arg(short, long, value_enum, default_value_t = MetaFormat::Json)]
    pub format: MetaFormat,

    /// Version to describe (default: latest)
    #[arg(long)]
    pub version: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PinArgs {
    /// The name of the pin
    pub pin: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WriteType {
    File,
    Json,
    Yaml,
    Csv,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WriteArgs {
    /// The name of the pin
    pub pin: String,

    /// Path to the data to write
    pub data: PathBuf,

    /// Pin data format
    #[arg(short = 't', long = "type", value_enum, default_value_t = WriteType::File)]
    pub pin_type: WriteType,

    /// Pin title
    #[arg(short = 'T', long)]
    pub title: Option<String>,

    /// Pin description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Write even if the content matches the latest version
    #[arg(long)]
    pub force_identical_write: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DownloadArgs {
    /// The name of the pin
    pub pin: String,

    /// Version to download (default: latest)
    #[arg(long)]
    pub version: Option<String>,

    /// Expected pin hash (full or first 5 characters)
    #[arg(long)]
    pub hash: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Regex matched against pin names and titles
    pub query: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Pins to delete
    #[arg(required = true)]
    pub pins: Vec<String>,
}

#[derive(clap::Args, Debug, Clone)]
#[command(group(clap::ArgGroup::new("rule").required(true).args(["keep", "days"])))]
pub struct PruneArgs {
    /// The name of the pin
    pub pin: String,

    /// Keep the newest N versions
    #[arg(long)]
    pub keep: Option<u32>,

    /// Keep versions created in the last N days
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub cmd: CacheSub,
}

#[derive(Subcommand, Debug)]
pub enum CacheSub {
    /// Show disk usage per cached board
    Info,
    /// Delete cached versions not accessed recently
    Prune(CachePruneArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CachePruneArgs {
    /// Age in days since last access
    #[arg(long, default_value_t = 30)]
    pub days: u64,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}
