pub mod get;
pub mod info;
pub mod put;
pub mod rm;
pub mod write;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Show which storage backend is active
    Info,
    /// Read a stored file
    Get(get::GetArgs),
    /// Import a local file into storage
    Put(put::PutArgs),
    /// Replace a stored file's content with stdin
    Write(write::WriteArgs),
    /// Delete a stored file
    Rm(rm::RmArgs),
}
