use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct CopilotConfig {
    /// Fence tags that mark a file-edit block, e.g. ```` ```csharp:Assets/A.cs ````.
    #[serde(default = "CopilotConfig::default_file_edit_languages")]
    pub file_edit_languages: Vec<String>,
    #[serde(default = "CopilotConfig::default_min_asset_score")]
    pub min_asset_score: i32,
    #[serde(default = "CopilotConfig::default_max_autowire_depth")]
    pub max_autowire_depth: usize,
    #[serde(default = "CopilotConfig::default_undo_capacity")]
    pub undo_capacity: usize,
    /// Reported messages kept until the host drains them.
    #[serde(default = "CopilotConfig::default_message_capacity")]
    pub message_capacity: usize,
    #[serde(default)]
    pub partial_merge: bool,
    #[serde(default = "CopilotConfig::default_common_components")]
    pub common_components: bool,
    #[serde(default = "CopilotConfig::default_asset_root")]
    pub asset_root: String,
    /// Turns off every kind of auto-wiring, not only the common components.
    #[serde(default = "CopilotConfig::default_autowire")]
    pub autowire: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CopilotConfigOverrides {
    pub autowire: Option<bool>,
    pub partial_merge: Option<bool>,
    pub asset_root: Option<String>,
}

impl CopilotConfig {
    fn default_file_edit_languages() -> Vec<String> {
        vec!["csharp".to_string(), "cs".to_string()]
    }

    const fn default_min_asset_score() -> i32 {
        30
    }

    const fn default_max_autowire_depth() -> usize {
        8
    }

    const fn default_undo_capacity() -> usize {
        256
    }

    const fn default_message_capacity() -> usize {
        crate::events::DEFAULT_MESSAGE_CAPACITY
    }

    const fn default_common_components() -> bool {
        true
    }

    fn default_asset_root() -> String {
        "Assets".to_string()
    }

    const fn default_autowire() -> bool {
        true
    }
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            file_edit_languages: Self::default_file_edit_languages(),
            min_asset_score: Self::default_min_asset_score(),
            max_autowire_depth: Self::default_max_autowire_depth(),
            undo_capacity: Self::default_undo_capacity(),
            message_capacity: Self::default_message_capacity(),
            partial_merge: false,
            common_components: Self::default_common_components(),
            asset_root: Self::default_asset_root(),
            autowire: Self::default_autowire(),
        }
    }
}

impl CopilotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(target: "copilot::config", "Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &CopilotConfigOverrides) {
        if let Some(autowire) = overrides.autowire {
            self.autowire = autowire;
        }
        if let Some(partial_merge) = overrides.partial_merge {
            self.partial_merge = partial_merge;
        }
        if let Some(asset_root) = &overrides.asset_root {
            self.asset_root = asset_root.clone();
        }
    }
}

impl CopilotConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.autowire.is_none() && self.partial_merge.is_none() && self.asset_root.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.autowire.is_some() {
            fields.push("autowire");
        }
        if self.partial_merge.is_some() {
            fields.push("partial_merge");
        }
        if self.asset_root.is_some() {
            fields.push("asset_root");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: CopilotConfig = serde_json::from_str(r#"{ "min_asset_score": 50 }"#).expect("parse config");
        assert_eq!(cfg.min_asset_score, 50);
        assert_eq!(cfg.file_edit_languages, vec!["csharp", "cs"]);
        assert_eq!(cfg.undo_capacity, 256);
        assert_eq!(cfg.message_capacity, 512);
        assert!(cfg.common_components);
        assert!(!cfg.partial_merge);
    }

    #[test]
    fn load_or_default_survives_bad_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("copilot.json");
        fs::write(&path, "{ not json").expect("write config");
        let cfg = CopilotConfig::load_or_default(&path);
        assert_eq!(cfg.max_autowire_depth, 8);
        assert!(CopilotConfig::load(&path).is_err());
    }

    #[test]
    fn overrides_only_touch_set_fields() {
        let mut cfg = CopilotConfig::default();
        let overrides = CopilotConfigOverrides { autowire: Some(false), ..Default::default() };
        cfg.apply_overrides(&overrides);
        assert!(!cfg.autowire);
        assert_eq!(cfg.asset_root, "Assets");
        assert_eq!(overrides.applied_fields(), vec!["autowire"]);
    }
}
