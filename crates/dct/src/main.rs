mod cli;
mod commands;
mod utils;

use crate::cli::{Commands, DctCli};
use anyhow::Result;
use logging::LogMode;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DctCli::parse_args();

    match cli.command {
        Commands::Serve {
            port,
            data_dir,
            foreground,
            verbose,
        } => {
            let mode = if foreground {
                LogMode::ServerForeground
            } else {
                LogMode::ServerBackground
            };
            let _guards = logging::init(mode, verbose)?;
            commands::serve::run(port, data_dir).await
        }
        Commands::Instrument {
            path,
            out,
            runtime_module,
            verbose,
        } => {
            let _guards = logging::init(LogMode::Cli, verbose)?;
            commands::instrument::run(path, out, runtime_module)
        }
        Commands::Analyze {
            path,
            project_id,
            output,
            upload,
            no_blame,
            verbose,
        } => {
            let _guards = logging::init(LogMode::Cli, verbose)?;
            commands::analyze::run(path, project_id, output, upload, no_blame).await
        }
        Commands::Clean { data_dir } => {
            let _guards = logging::init(LogMode::Cli, false)?;
            commands::clean::run(data_dir)
        }
    }
}
