use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::LevelFilter;

mod extractxlsx;
mod serve;

/// Extracts article tables from e-VD movement document PDFs.
#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Logging level.
    #[arg(long, default_value = "Warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    ExtractXlsx(extractxlsx::Command),
    Serve(serve::Command),
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())
        .with_context(|| "configuring logging")?;

    use Command::*;
    match &args.command {
        ExtractXlsx(cmd) => extractxlsx::run(cmd),
        Serve(cmd) => serve::run(cmd),
    }
}
