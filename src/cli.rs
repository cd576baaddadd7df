use clap::Parser;
use std::path::PathBuf;

/// Convert Jupyter notebooks, or directories containing notebooks, to HTML
#[derive(Parser, Debug)]
#[command(name = "nb2html", version, about)]
pub struct Cli {
    /// Paths to one or more notebook files (.ipynb) or directories.
    /// Output is written to an `html` directory next to each notebook.
    #[arg(required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,
}
