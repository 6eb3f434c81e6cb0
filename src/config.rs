//! Declared configuration - the document that drives reconciliation.

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::MIN_CONFIG_VERSION;

/// One generated-artifact destination family: a platform adapter id plus an
/// output path template with a `{name}` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraTarget {
    pub target_id: String,
    pub output_path: String,
}

impl ExtraTarget {
    /// Resolve the template for a concrete icon key.
    pub fn resolved_path(&self, icon_key: &str) -> String {
        self.output_path.replace("{name}", icon_key)
    }
}

/// Where canonical SVG markup physically lives: inline in the lock, or in
/// per-icon files under `folder`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgStorage {
    pub folder: Option<String>,
    pub in_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    pub svg_storage: SvgStorage,
    #[serde(default)]
    pub extra_targets: Vec<ExtraTarget>,
    #[serde(default)]
    pub color_variables: Vec<String>,
    #[serde(default = "default_optimizer")]
    pub optimizer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name_format: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_optimizer() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Config {
    /// A minimal in-lock config with no targets; callers add targets before
    /// writing (an in-lock catalog with zero targets is rejected by
    /// [`Config::validate`]).
    pub fn new_in_lock() -> Self {
        Self {
            version: default_version(),
            svg_storage: SvgStorage { folder: None, in_lock: true },
            extra_targets: vec![],
            color_variables: vec![],
            optimizer: default_optimizer(),
            component_name_format: None,
        }
    }

    pub fn new_file_backed(folder: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            svg_storage: SvgStorage { folder: Some(folder.into()), in_lock: false },
            extra_targets: vec![],
            color_variables: vec![],
            optimizer: default_optimizer(),
            component_name_format: None,
        }
    }

    /// Trim color variables and drop blank entries. Applied before every
    /// persist so the stored document is already clean.
    pub fn normalized(mut self) -> Self {
        self.color_variables = self
            .color_variables
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        self
    }

    /// Enforce the structural invariants of the document.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.check_version()?;

        if !self.svg_storage.in_lock
            && self.svg_storage.folder.as_deref().map_or(true, |f| f.trim().is_empty())
        {
            return Err(CoreError::Validation(
                "an svg folder must be provided when svg-in-lock is disabled".to_string(),
            ));
        }

        if self.svg_storage.in_lock && self.extra_targets.is_empty() {
            // An in-lock icon with zero targets is unobservable by any
            // external artifact.
            return Err(CoreError::Validation(
                "at least one extra target is required when svg-in-lock is enabled".to_string(),
            ));
        }

        for target in &self.extra_targets {
            if target.target_id.trim().is_empty() {
                return Err(CoreError::Validation("target id must not be empty".to_string()));
            }
            if target.output_path.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "output path for target {} must not be empty",
                    target.target_id
                )));
            }
            if !target.output_path.contains("{name}") {
                return Err(CoreError::Validation(format!(
                    "output path for target {} must contain the {{name}} placeholder",
                    target.target_id
                )));
            }
        }

        if !self.optimizer.is_object() {
            return Err(CoreError::Validation("optimizer config must be an object".to_string()));
        }

        // The color engine owns currentColor conversion; an optimizer rule
        // doing the same would fight the configured color variables.
        let current_color = self
            .optimizer
            .get("convertColors")
            .and_then(|v| v.get("currentColor"))
            .and_then(Value::as_bool);
        if current_color == Some(true) {
            return Err(CoreError::Validation(
                "set convertColors.currentColor to false; colors are converted via the configured color variables".to_string(),
            ));
        }

        Ok(())
    }

    fn check_version(&self) -> Result<(), CoreError> {
        let version = Version::parse(&self.version).map_err(|_| {
            CoreError::Validation(format!("invalid config version: {}", self.version))
        })?;
        let min = Version::parse(MIN_CONFIG_VERSION).map_err(|_| {
            CoreError::Validation("invalid engine minimum config version".to_string())
        })?;
        if version < min {
            return Err(CoreError::Validation(format!(
                "config version {} is older than the supported minimum {}",
                version, min
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Config {
        let mut config = Config::new_in_lock();
        config.extra_targets.push(ExtraTarget {
            target_id: "svg".to_string(),
            output_path: "./out/{name}.svg".to_string(),
        });
        config
    }

    #[test]
    fn valid_config_passes() {
        base().validate().unwrap();
    }

    #[test]
    fn file_backed_without_folder_rejected() {
        let mut config = base();
        config.svg_storage = SvgStorage { folder: None, in_lock: false };
        assert!(config.validate().is_err());
    }

    #[test]
    fn in_lock_without_targets_rejected() {
        let mut config = base();
        config.extra_targets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_path_requires_placeholder() {
        let mut config = base();
        config.extra_targets[0].output_path = "./out/icon.svg".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn current_color_optimizer_rule_rejected() {
        let mut config = base();
        config.optimizer = json!({"convertColors": {"currentColor": true}});
        assert!(config.validate().is_err());
    }

    #[test]
    fn stale_version_rejected() {
        let mut config = base();
        config.version = "0.9.0".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn normalized_drops_blank_color_variables() {
        let mut config = base();
        config.color_variables =
            vec!["--primary ".to_string(), "  ".to_string(), String::new()];
        let config = config.normalized();
        assert_eq!(config.color_variables, vec!["--primary".to_string()]);
    }

    #[test]
    fn camel_case_round_trip() {
        let config = base();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("svgStorage"));
        assert!(json.contains("inLock"));
        assert!(json.contains("extraTargets"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
