use anyhow::{Context, Result};
use bangle_workspace::ws_path::resolve_path;

/// Print the parts of a file wsPath as JSON
pub fn resolve_ws_path(ws_path: &str) -> Result<()> {
    let resolved = resolve_path(ws_path)?;
    let json = serde_json::to_string_pretty(&resolved).context("Failed to serialize path")?;
    println!("{json}");
    Ok(())
}
