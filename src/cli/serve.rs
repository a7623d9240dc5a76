use anyhow::Result;
use clap::Args;

use crate::extraction::pdf::TableReaderArgs;
use crate::server;

/// Serves an authenticated upload form that returns extracted XLSX
/// workbooks.
#[derive(Args)]
pub struct Command {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Username required by HTTP basic auth.
    #[arg(long)]
    username: String,

    /// Password required by HTTP basic auth.
    #[arg(long)]
    password: String,

    #[command(flatten)]
    table_reader: TableReaderArgs,
}

pub fn run(cmd: &Command) -> Result<()> {
    let reader = cmd.table_reader.build()?;
    let credentials = server::Credentials {
        username: cmd.username.clone(),
        password: cmd.password.clone(),
    };

    let result = server::run(&cmd.addr, &credentials, reader.as_ref());

    if let Err(err) = reader.close() {
        log::warn!("Failed to shut down table reader: {err}");
    }

    result
}
