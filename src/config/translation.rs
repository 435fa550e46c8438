use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct TranslationToolConfig {
    pub input: PathBuf,
    /// Where to write the 2x2 translation map, if anywhere.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<TranslationToolConfig, String> {
    super::read_json(path)
}
