use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use emptydirs_core::action::Action;

#[derive(Parser, Debug)]
#[command(
    name = "emptydirs",
    about = "Find and process empty directories",
    after_help = "Trash moves go to the Recycle Bin on Windows and the Trash on macOS and Linux.",
    version
)]
pub struct Cli {
    /// Root path to search for empty directories
    pub path: PathBuf,

    /// Action to perform on empty directories
    #[arg(long, value_enum, default_value_t = ActionArg::List)]
    pub action: ActionArg,

    /// Number of directories to process in each batch [default: 1000]
    #[arg(long, allow_negative_numbers = true)]
    pub batch_size: Option<i64>,

    /// Suppress progress messages
    #[arg(long, short)]
    pub quiet: bool,

    /// Log every directory visited
    #[arg(long, short, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Read settings from this file instead of the user config
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    List,
    Count,
    Trash,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::List => Action::List,
            ActionArg::Count => Action::Count,
            ActionArg::Trash => Action::Trash,
        }
    }
}
