use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Terminal reader for the Florecillas library")]
pub struct Cli {
    /// Path to the TOML configuration.
    #[arg(long, default_value = "conf/config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the books in the catalog.
    Books,
    /// Open a book and read it interactively.
    Read(ReadArgs),
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Catalog identifier of the book.
    pub book_id: String,

    /// Keep progress, bookmarks and preferences in memory only.
    #[arg(long)]
    pub ephemeral: bool,
}
