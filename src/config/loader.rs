//! Configuration loading with multi-layer merge

use super::{AgentPromptConfig, CompletionConfig, RetrievalConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level cardflow configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CardflowConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub agent: AgentPromptConfig,
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Pause before each card executes, in milliseconds
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_ms: u64,
}

fn default_pacing_delay() -> u64 {
    200
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            pacing_delay_ms: default_pacing_delay(),
        }
    }
}

impl CardflowConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/cardflow/config.toml
    /// 3. .cardflow/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".cardflow/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".cardflow/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/cardflow/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cardflow/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.pacing_delay_ms != default_pacing_delay() {
            self.defaults.pacing_delay_ms = other.defaults.pacing_delay_ms;
        }

        self.completion.merge(other.completion);
        self.retrieval.merge(other.retrieval);
        self.agent.merge(other.agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CardflowConfig::default();
        assert_eq!(config.defaults.pacing_delay_ms, 200);
        assert!(config.completion.url.is_none());
        assert!(config.retrieval.database.is_none());
        assert!(config.agent.tools_clause.is_none());
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
            [defaults]
            pacing_delay_ms = 0

            [completion]
            url = "https://api.siliconflow.cn/v1"
            api_key_env = "SILICONFLOW_API_KEY"
            temperature = 0.7

            [retrieval]
            database = "/tmp/cardflow.db"

            [agent]
            answer_clause = "\n\nOtherwise answer directly."
        "#
        )
        .unwrap();

        let config = CardflowConfig::load_file(&config_path).unwrap();
        assert_eq!(config.defaults.pacing_delay_ms, 0);
        assert_eq!(
            config.completion.url.as_deref(),
            Some("https://api.siliconflow.cn/v1")
        );
        assert_eq!(config.completion.temperature, 0.7);
        assert_eq!(config.retrieval.database.as_deref(), Some("/tmp/cardflow.db"));
        assert!(config.agent.answer_clause.is_some());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[backends.claude]\ncommand = \"claude\"\n").unwrap();

        assert!(CardflowConfig::load_file(&config_path).is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base = CardflowConfig::default();
        base.completion.url = Some("https://user.example/v1".into());
        base.defaults.pacing_delay_ms = 50;

        let mut project = CardflowConfig::default();
        project.completion.model = "Qwen/Qwen3-8B".into();
        project.retrieval.database = Some("./docs.db".into());

        base.merge(project);

        // Unset layers leave earlier values alone
        assert_eq!(base.completion.url.as_deref(), Some("https://user.example/v1"));
        assert_eq!(base.defaults.pacing_delay_ms, 50);

        assert_eq!(base.completion.model, "Qwen/Qwen3-8B");
        assert_eq!(base.retrieval.database.as_deref(), Some("./docs.db"));
    }

    #[test]
    fn test_load_project_layer() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".cardflow")).unwrap();
        std::fs::write(
            dir.path().join(".cardflow/config.toml"),
            "[completion]\nurl = \"http://localhost:8000/v1\"\n",
        )
        .unwrap();

        let config = CardflowConfig::load(Some(dir.path())).unwrap();
        assert_eq!(
            config.completion.url.as_deref(),
            Some("http://localhost:8000/v1")
        );
    }
}
