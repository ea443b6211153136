//! TOML defaults file.

use anyhow::Context;
use proto_schema::CompilerKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Defaults loaded from `--config`. Every key is optional.
///
/// ```toml
/// include = ["protos", "third_party"]
/// compiler = "pure"
/// protoc_path = "/opt/protobuf/bin/protoc"
/// max_recursion = 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub include: Vec<PathBuf>,
    pub compiler: Option<String>,
    pub protoc_path: Option<PathBuf>,
    pub max_recursion: Option<usize>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {path:?}"))
    }

    pub fn compiler_kind(&self) -> anyhow::Result<Option<CompilerKind>> {
        self.compiler
            .as_deref()
            .map(|name| name.parse::<CompilerKind>().map_err(anyhow::Error::msg))
            .transpose()
    }
}
