// ⚙️ Configuration
// Defaults → optional TOML file → environment overrides

use crate::catalog::DEFAULT_CATEGORIES;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "EXPENSE_TRACKER_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Fixed keyword table, no network
    Keyword,
    /// Categories chosen by the text-generation provider
    RemoteLlm,
}

impl ClassifierKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "keyword" => Ok(ClassifierKind::Keyword),
            "remote-llm" | "remote_llm" | "llm" => Ok(ClassifierKind::RemoteLlm),
            other => bail!("unknown classifier '{}' (expected keyword or remote-llm)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub classifier: ClassifierKind,
    /// JSON keyword rules replacing the built-in table
    pub rules_path: Option<PathBuf>,
    pub seed_categories: Vec<String>,
    pub budget: f64,
    pub llm: LlmSection,
    pub ocr: OcrSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSection {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub json: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            classifier: ClassifierKind::Keyword,
            rules_path: None,
            seed_categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            budget: 120_000.0,
            llm: LlmSection::default(),
            ocr: OcrSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            base_url: "https://vision.googleapis.com".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from `path` (or `$EXPENSE_TRACKER_CONFIG`), then apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(from_env);

        let mut cfg = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Apply environment overrides through `lookup` (injected so tests avoid global state).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().with_context(|| format!("invalid PORT '{}'", port))?;
        }
        if let Some(host) = lookup("EXPENSE_BIND") {
            self.server.host = host;
        }
        if let Some(kind) = lookup("EXPENSE_CLASSIFIER") {
            self.classifier = ClassifierKind::parse(&kind)?;
        }
        if let Some(rules) = lookup("EXPENSE_RULES") {
            self.rules_path = Some(PathBuf::from(rules));
        }
        if let Some(budget) = lookup("EXPENSE_BUDGET") {
            self.budget = budget
                .trim()
                .parse()
                .with_context(|| format!("invalid EXPENSE_BUDGET '{}'", budget))?;
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("VISION_API_KEY") {
            self.ocr.api_key = Some(key);
        }
        if let Some(json) = lookup("EXPENSE_LOG_JSON") {
            self.logging.json = matches!(json.trim(), "1" | "true" | "TRUE" | "yes" | "YES");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.classifier == ClassifierKind::RemoteLlm && self.llm_api_key().is_none() {
            bail!("classifier 'remote-llm' needs an LLM API key (set GEMINI_API_KEY)");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn llm_api_key(&self) -> Option<&str> {
        self.llm.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn ocr_api_key(&self) -> Option<&str> {
        self.ocr.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.classifier, ClassifierKind::Keyword);
        assert_eq!(cfg.seed_categories.len(), 5);
        assert_eq!(cfg.budget, 120_000.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let cfg = AppConfig::from_toml(
            r#"
            classifier = "remote-llm"
            budget = 5000.0

            [server]
            port = 8080

            [llm]
            api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.classifier, ClassifierKind::RemoteLlm);
        assert_eq!(cfg.llm.model, "gemini-1.5-flash");
        assert_eq!(cfg.llm_api_key(), Some("abc"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(env(&[
            ("PORT", "4000"),
            ("EXPENSE_CLASSIFIER", "LLM"),
            ("GEMINI_API_KEY", "g"),
            ("VISION_API_KEY", "v"),
            ("EXPENSE_LOG_JSON", "true"),
        ]))
        .unwrap();

        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.classifier, ClassifierKind::RemoteLlm);
        assert_eq!(cfg.ocr_api_key(), Some("v"));
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_env(env(&[("PORT", "http")])).is_err());
        assert!(cfg.apply_env(env(&[("EXPENSE_CLASSIFIER", "magic")])).is_err());
        assert!(cfg.apply_env(env(&[("EXPENSE_BUDGET", "lots")])).is_err());
    }

    #[test]
    fn test_remote_llm_requires_key() {
        let mut cfg = AppConfig::default();
        cfg.classifier = ClassifierKind::RemoteLlm;
        assert!(cfg.validate().is_err());

        cfg.llm.api_key = Some("   ".to_string());
        assert!(cfg.validate().is_err());

        cfg.llm.api_key = Some("key".to_string());
        assert!(cfg.validate().is_ok());
    }
}
