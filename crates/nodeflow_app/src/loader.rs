// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading and saving graphs and settings.
//!
//! Snapshots are read as JSON when the file ends in `.json` and as RON
//! otherwise. Settings are always RON.

use anyhow::{bail, Context, Result};
use nodeflow_graph::{GraphSnapshot, NodeId, Settings, Value};
use std::path::Path;

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a graph snapshot
pub fn load_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let snapshot = if is_json(path) {
        GraphSnapshot::from_json(&content)
    } else {
        GraphSnapshot::from_ron(&content)
    };
    snapshot.with_context(|| format!("Failed to parse graph file {}", path.display()))
}

/// Save a graph snapshot
pub fn save_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    let content = if is_json(path) {
        snapshot.to_json()?
    } else {
        snapshot.to_ron()?
    };
    std::fs::write(path, content).with_context(|| format!("Failed to write graph file {}", path.display()))
}

/// Load engine settings, or the defaults when no file is given
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    Settings::from_ron(&content).with_context(|| format!("Failed to parse settings file {}", path.display()))
}

/// Parse a `<node>.<property>=<value>` assignment.
///
/// The value becomes a float, a boolean or else a string.
pub fn parse_assignment(text: &str) -> Result<(NodeId, String, Value)> {
    let Some((target, raw)) = text.split_once('=') else {
        bail!("Expected <node>.<property>=<value>, got '{text}'");
    };
    let Some((node, property)) = target.split_once('.') else {
        bail!("Expected <node>.<property>, got '{target}'");
    };
    let node: u32 = node.trim().parse().with_context(|| format!("Invalid node ID '{node}'"))?;
    let property = property.trim();
    if property.is_empty() {
        bail!("Empty property name in '{text}'");
    }

    let raw = raw.trim();
    let value = if let Ok(number) = raw.parse::<f32>() {
        Value::Float(number)
    } else if let Ok(flag) = raw.parse::<bool>() {
        Value::Bool(flag)
    } else {
        Value::String(raw.to_string())
    };
    Ok((NodeId(node), property.to_string(), value))
}
