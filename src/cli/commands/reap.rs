//! `forge reap`: sweep stale sessions whose heartbeat has expired.

use serde::Serialize;

use crate::app::ForgeApp;
use crate::cli::error::CliResult;
use crate::cli::output::{output, CommandOutput};

#[derive(Debug, Serialize)]
struct ReapOutput {
    reaped: usize,
}

impl CommandOutput for ReapOutput {
    fn to_human(&self) -> String {
        format!("reaped {} stale session(s)", self.reaped)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn run(app: &ForgeApp, json: bool) -> CliResult<()> {
    let reaped = app.heartbeat_reaper.sweep().await?;
    output(&ReapOutput { reaped }, json);
    Ok(())
}
