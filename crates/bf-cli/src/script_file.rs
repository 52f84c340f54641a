use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use bf_core::{FlowError, Variable, VariableStore};
use bf_engine::{Block, Command, Engine, EngineOptions};

/// On-disk flowchart document: declared variables plus named blocks of
/// commands. Runtime-only command state is never part of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlowchartFile {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) variables: Vec<Variable>,
    #[serde(default)]
    pub(crate) blocks: Vec<BlockSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlockSpec {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) commands: Vec<Command>,
}

pub(crate) fn load_flowchart(path: &Path) -> anyhow::Result<FlowchartFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading flowchart file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing flowchart file {}", path.display()))
}

/// Builds one engine instance from a loaded document. Duplicate variable
/// names are rejected here rather than silently shadowed.
pub(crate) fn build_engine(
    file: &FlowchartFile,
    options: EngineOptions,
) -> Result<Engine, FlowError> {
    let mut store = VariableStore::new();
    for variable in &file.variables {
        store.declare(variable.clone())?;
    }

    let blocks = file
        .blocks
        .iter()
        .map(|spec| Block::new(spec.name.clone(), spec.commands.clone()))
        .collect();

    Ok(Engine::new(store, blocks, options))
}
