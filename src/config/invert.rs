use crate::invert::InvertOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct InvertToolConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Output level; the input level when absent.
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub options: InvertOptions,
    #[serde(default)]
    pub report_json: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<InvertToolConfig, String> {
    super::read_json(path)
}
