use anyhow::Result;

mod cli;
mod extraction;
mod report;
mod server;
mod table;

fn main() -> Result<()> {
    cli::run()
}
