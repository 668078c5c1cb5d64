use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dct",
    version,
    about = "Dead Code Tracker CLI",
    long_about = "Joins a static function census with live call-count telemetry to surface dead code."
)]
pub struct DctCli {
    #[command(subcommand)]
    pub command: Commands,
}

impl DctCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the platform server
    Serve {
        /// Port to bind (defaults to the preferred port, or a random free one)
        #[arg(long)]
        port: Option<u16>,

        /// Data directory (defaults to ~/.dct)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Log to stderr in addition to the rotating log file
        #[arg(long, default_value_t = false)]
        foreground: bool,

        /// Enable verbose logging
        #[arg(long)]
        verbose: bool,
    },
    /// Rewrite JS/TS sources so every function reports its calls
    Instrument {
        /// Project directory to instrument
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Mirror instrumented output into this directory instead of
        /// rewriting in place
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Module specifier the tracking import is taken from
        #[arg(long, value_name = "SPEC")]
        runtime_module: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Census every function in a project and build its inventory
    Analyze {
        /// Project directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Project identifier the inventory is recorded under
        #[arg(long)]
        project_id: String,

        /// Write the inventory JSON to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Upload the inventory to a running platform server at this base URL
        #[arg(long, value_name = "URL")]
        upload: Option<String>,

        /// Skip git blame contributor attribution
        #[arg(long, default_value_t = false)]
        no_blame: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Remove all stored platform data
    Clean {
        /// Data directory (defaults to ~/.dct)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}
