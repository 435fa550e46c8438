use crate::compose::{ComposeMode, ComposeParams};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ComposeToolConfig {
    pub map1: PathBuf,
    pub map2: PathBuf,
    /// Shorthand for `params.mode = "inverse"`.
    #[serde(default)]
    pub inverse: bool,
    #[serde(default)]
    pub params: ComposeParams,
    pub output: ComposeOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct ComposeOutputConfig {
    pub map: PathBuf,
    /// Confidence PNG and JSON report are written here when set.
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

impl ComposeToolConfig {
    pub fn resolved_params(&self) -> ComposeParams {
        let mut params = self.params.clone();
        if self.inverse {
            params.mode = ComposeMode::Inverse;
        }
        params
    }
}

pub fn load_config(path: &Path) -> Result<ComposeToolConfig, String> {
    super::read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_flag_overrides_mode() {
        let json = r#"{
            "map1": "a.json",
            "map2": "b.json",
            "inverse": true,
            "params": { "confidence_clamp": 0.5 },
            "output": { "map": "out.json" }
        }"#;
        let cfg: ComposeToolConfig = serde_json::from_str(json).unwrap();
        let params = cfg.resolved_params();
        assert_eq!(params.mode, ComposeMode::Inverse);
        assert_eq!(params.confidence_clamp, 0.5);
        assert_eq!(params.extrapolation_distance, 0.0);
        assert!(cfg.output.debug_dir.is_none());
    }
}
