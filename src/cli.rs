use bannr_library::Source;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Sync, rename, upload and log batches of banner images")]
pub struct Opts {
    /// Settings file to use instead of the discovered one.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// More log output (-v, -vv).
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Less log output (-q, -qq).
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Opts {
    /// Net verbosity; 0 is the default level.
    pub fn verbosity(&self) -> i8 {
        self.verbose.min(3) as i8 - self.quiet.min(3) as i8
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process new files: sync, rename, upload and log them.
    Run {
        #[arg(long, value_enum, default_value_t = SourceArg::Remote)]
        source: SourceArg,
        #[arg(long, value_enum, default_value_t = NamingArg::Interactive)]
        naming: NamingArg,
        /// Base name for sequential naming.
        #[arg(long, required_if_eq("naming", "sequential"))]
        base: Option<String>,
        /// Skip the upload stage; files are logged without a URL.
        #[arg(long)]
        no_upload: bool,
    },
    /// Rename every exported file to BASE1, BASE2, ... in ledger order.
    RenameAll {
        #[arg(long)]
        base: String,
    },
    /// Rename the exported files of some originals to BASE1, BASE2, ...
    RenameSelected {
        #[arg(long)]
        base: String,
        #[arg(required = true)]
        originals: Vec<String>,
    },
    /// Upload every exported file that has no URL yet.
    UploadAll,
    /// Remove ledger rows, and optionally their exported files.
    Delete {
        #[arg(required = true)]
        originals: Vec<String>,
        /// Also delete the exported files.
        #[arg(long)]
        files: bool,
    },
    /// Delete exported files, keeping their ledger rows.
    DeleteExports {
        #[arg(required = true)]
        originals: Vec<String>,
    },
    /// Change a single ledger entry.
    #[command(subcommand)]
    Edit(EditCommand),
    /// Print the ledger.
    Show,
    /// Count ledger rows, present files and URLs.
    Stats,
    /// List ledger rows whose files or URL are missing, and unlisted imports.
    Check,
    /// Restore missing files, fill empty names and upload files without a URL.
    Repair,
}

#[derive(Debug, Subcommand)]
pub enum EditCommand {
    /// Give an exported file a new base name; the extension is kept.
    Rename {
        original: String,
        new_base: String,
        /// Upload the file again under its new name.
        #[arg(long)]
        upload: bool,
    },
    /// Upload an exported file again.
    Upload { original: String },
    /// Set the URL by hand; omit it to clear.
    Url { original: String, url: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Sync the configured remote folder first.
    Remote,
    /// Only look at the import folder.
    Local,
}

impl From<SourceArg> for Source {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Remote => Source::Remote,
            SourceArg::Local => Source::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingArg {
    /// Ask for a name for every file.
    Interactive,
    /// BASE followed by a number.
    Sequential,
}
