use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Timelock encryption against a randomness beacon
///
/// Messages are locked to a future beacon round and can be unlocked by
/// anyone once the network publishes that round's signature.
///
/// REMOTE is a beacon remote URL including the chain hash path segment,
/// e.g. https://api.drand.sh/8990e7a9aaed2fed70eadca66e1cfcf55e3a296ea4ab1d4de2a2dcfbb7bbd1f3
#[derive(Parser)]
#[command(author, version, about, verbatim_doc_comment)]
#[command(propagate_version = true)]
pub struct Options {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encrypt INPUT until a beacon round is reached
    Lock(LockArgs),
    /// Decrypt INPUT once its round has been published
    Unlock(UnlockArgs),
}

#[derive(Args)]
pub struct LockArgs {
    /// Beacon remote URL
    #[arg(short, long)]
    pub remote: String,
    /// Round number to lock to
    #[arg(short = 'R', long, conflicts_with = "duration")]
    pub round_number: Option<u64>,
    /// How long from now the message should stay locked (e.g. 30s, 2h)
    #[arg(short, long)]
    pub duration: Option<humantime::Duration>,
    /// Armor the output so it is ASCII printable
    #[arg(short, long, default_value_t = false)]
    pub armor: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Args)]
pub struct UnlockArgs {
    /// Beacon remote URL
    #[arg(short, long)]
    pub remote: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

pub fn build() -> Options {
    Options::parse()
}
