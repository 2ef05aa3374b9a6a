use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

/// Locations relative to the run root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub image_names: Vec<String>,
    pub tile_meta: PathBuf,
    pub inference_result: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Identifiers the external inference call needs; all must be set.
    pub required_env: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub fallback_marker: bool,
    pub pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub base64_min_len: usize,
    pub extract_annotated: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("inputs"),
            output_dir: PathBuf::from("data/latest"),
            image_names: vec!["test.jpg".into(), "test.jpeg".into(), "test.png".into()],
            tile_meta: PathBuf::from("data/latest/ingest_meta.json"),
            inference_result: PathBuf::from("data/latest/inference_result.json"),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            required_env: vec![
                "ROBOFLOW_API_KEY".into(),
                "ROBOFLOW_WORKSPACE".into(),
                "ROBOFLOW_WORKFLOW_ID".into(),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fallback_marker: true,
            pretty: true,
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base64_min_len: 5000,
            extract_annotated: true,
        }
    }
}

impl GeoConfig {
    /// Load from `path`, or the user config file, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_file_path(),
        };
        if let Some(config_path) = path
            && let Ok(content) = std::fs::read_to_string(&config_path)
        {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => log::warn!(
                    "ignoring invalid config {}: {}",
                    config_path.display(),
                    e
                ),
            }
        }
        Self::default()
    }

    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("geodetect");
            path.push("config.toml");
            path
        })
    }

    /// Required variables that are unset or blank in `env`.
    pub fn missing_env(&self, env: &HashMap<String, String>) -> Vec<String> {
        self.inference
            .required_env
            .iter()
            .filter(|key| env.get(*key).is_none_or(|v| v.trim().is_empty()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeoConfig::default();
        assert_eq!(config.paths.input_dir, PathBuf::from("inputs"));
        assert_eq!(config.paths.output_dir, PathBuf::from("data/latest"));
        assert_eq!(config.paths.image_names.len(), 3);
        assert_eq!(config.inference.required_env.len(), 3);
        assert!(config.output.fallback_marker);
        assert!(config.output.pretty);
        assert_eq!(config.artifacts.base64_min_len, 5000);
        assert!(config.artifacts.extract_annotated);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&GeoConfig::default()).unwrap();

        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[inference]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[artifacts]"));
        assert!(toml_str.contains("fallback_marker = true"));
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
[output]
fallback_marker = false

[inference]
required_env = []
"#;

        let config: GeoConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.output.fallback_marker);
        // Missing keys and sections keep their defaults
        assert!(config.output.pretty);
        assert!(config.inference.required_env.is_empty());
        assert_eq!(config.paths.image_names[0], "test.jpg");
    }

    #[test]
    fn test_load_explicit_path_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = GeoConfig::default();
        config.artifacts.base64_min_len = 10;
        config.save(&path).unwrap();

        let loaded = GeoConfig::load(Some(&path));
        assert_eq!(loaded.artifacts.base64_min_len, 10);
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "paths = 3").unwrap();
        let loaded = GeoConfig::load(Some(&path));
        assert_eq!(loaded.paths.input_dir, PathBuf::from("inputs"));
    }

    #[test]
    fn test_missing_env() {
        let config = GeoConfig::default();
        let env = HashMap::from([
            ("ROBOFLOW_API_KEY".to_string(), "k".to_string()),
            ("ROBOFLOW_WORKSPACE".to_string(), "  ".to_string()),
        ]);
        assert_eq!(
            config.missing_env(&env),
            vec!["ROBOFLOW_WORKSPACE", "ROBOFLOW_WORKFLOW_ID"]
        );
    }
}
