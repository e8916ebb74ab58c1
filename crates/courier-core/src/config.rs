//! Courier configuration system.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CourierError, Result};
use crate::types::Recipient;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
}

impl CourierConfig {
    /// Load config from the default path (~/.courier/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CourierError::Config(format!("Failed to read config {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CourierError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Courier home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".courier")
    }

    /// Check that the configured pipeline can be wired: at least one
    /// producer, at least one notifier, and every section self-consistent.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() && !self.webhook.enabled {
            return Err(CourierError::config(
                "no producers: define at least one [[jobs]] entry or enable [webhook]",
            ));
        }
        if self.notifiers.is_empty() {
            return Err(CourierError::config("no notifiers: define at least one [[notifiers]] entry"));
        }

        let mut names = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !names.insert(job.name.as_str()) {
                return Err(CourierError::Config(format!("duplicate job name '{}'", job.name)));
            }
        }
        self.content.validate()?;
        for notifier in &self.notifiers {
            notifier.validate()?;
        }
        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run every producer on its own worker thread with a private runtime.
    #[serde(default)]
    pub isolated_producers: bool,
}

/// A periodic job: on each trigger, one request per recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// 5-field cron expression (MIN HOUR DOM MON DOW).
    #[serde(default)]
    pub cron: Option<String>,
    /// Fixed interval in seconds.
    #[serde(default)]
    pub every_secs: Option<u64>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    /// Added to the emission time to get the due date.
    #[serde(default)]
    pub delay_secs: u64,
}

impl JobConfig {
    fn validate(&self) -> Result<()> {
        match (&self.cron, self.every_secs) {
            (Some(_), Some(_)) => Err(CourierError::Config(format!(
                "job '{}': set either `cron` or `every_secs`, not both",
                self.name
            ))),
            (None, None) => Err(CourierError::Config(format!(
                "job '{}': missing trigger, set `cron` or `every_secs`",
                self.name
            ))),
            (None, Some(0)) => Err(CourierError::Config(format!(
                "job '{}': `every_secs` must be greater than 0",
                self.name
            ))),
            _ if self.recipients.is_empty() => Err(CourierError::Config(format!(
                "job '{}': no recipients",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

/// Inbound webhook producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 3000 }

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Content source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// "template", "file" or "fetch".
    #[serde(default = "default_content_kind")]
    pub kind: String,
    /// Used by "template": `{name}` and `{channel}` are substituted.
    #[serde(default = "default_template")]
    pub template: String,
    /// Used by "file".
    #[serde(default)]
    pub path: Option<String>,
    /// Used by "fetch".
    #[serde(default)]
    pub url: Option<String>,
}

fn default_content_kind() -> String { "template".into() }
fn default_template() -> String { "Hello, {name}".into() }

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            kind: default_content_kind(),
            template: default_template(),
            path: None,
            url: None,
        }
    }
}

impl ContentConfig {
    fn validate(&self) -> Result<()> {
        match self.kind.as_str() {
            "template" => Ok(()),
            "file" if self.path.is_none() => Err(CourierError::config("content kind 'file' requires `path`")),
            "fetch" if self.url.is_none() => Err(CourierError::config("content kind 'fetch' requires `url`")),
            "file" | "fetch" => Ok(()),
            other => Err(CourierError::Config(format!("unknown content kind '{other}'"))),
        }
    }
}

/// A delivery sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// "log" or "webhook".
    pub kind: String,
    /// Only deliver to recipients on this channel.
    #[serde(default)]
    pub channel: Option<String>,
    /// Used by "webhook".
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 10 }

impl NotifierConfig {
    fn validate(&self) -> Result<()> {
        match self.kind.as_str() {
            "log" => Ok(()),
            "webhook" if self.url.is_none() => Err(CourierError::config("notifier kind 'webhook' requires `url`")),
            "webhook" => Ok(()),
            other => Err(CourierError::Config(format!("unknown notifier kind '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[engine]
isolated_producers = true

[[jobs]]
name = "morning"
cron = "0 8 * * *"
recipients = [{ name = "alice", channel = "1" }, { name = "bob" }]

[[jobs]]
name = "heartbeat"
every_secs = 30
delay_secs = 5
recipients = [{ name = "ops" }]

[webhook]
enabled = true
port = 3100

[content]
kind = "template"
template = "Good morning, {name}"

[[notifiers]]
kind = "log"

[[notifiers]]
kind = "webhook"
channel = "1"
url = "http://localhost:9000/hook"
headers = [["X-Token", "secret"]]
"#;

    #[test]
    fn test_parse_full_config() {
        let config = CourierConfig::parse(SAMPLE).unwrap();
        assert!(config.engine.isolated_producers);
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].recipients[0], Recipient::on_channel("alice", "1"));
        assert_eq!(config.jobs[1].every_secs, Some(30));
        assert_eq!(config.jobs[1].delay_secs, 5);
        assert!(config.webhook.enabled);
        assert_eq!(config.webhook.port, 3100);
        assert_eq!(config.webhook.host, "127.0.0.1");
        assert_eq!(config.notifiers[1].headers[0].0, "X-Token");
        assert_eq!(config.notifiers[1].timeout_secs, 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = CourierConfig::parse("").unwrap();
        assert!(!config.engine.isolated_producers);
        assert_eq!(config.content.kind, "template");
        assert_eq!(config.content.template, "Hello, {name}");
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_validate_requires_producer_and_notifier() {
        let err = CourierConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("no producers"));

        let config = CourierConfig::parse("[webhook]\nenabled = true").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no notifiers"));
    }

    #[test]
    fn test_validate_job_trigger() {
        let both = r#"
[[jobs]]
name = "x"
cron = "* * * * *"
every_secs = 5
recipients = [{ name = "a" }]
[[notifiers]]
kind = "log"
"#;
        let err = CourierConfig::parse(both).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("not both"));

        let neither = both.replace("cron = \"* * * * *\"\nevery_secs = 5\n", "");
        let err = CourierConfig::parse(&neither).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("missing trigger"));
    }

    #[test]
    fn test_validate_unknown_kinds() {
        let config = CourierConfig::parse(
            "[webhook]\nenabled = true\n[[notifiers]]\nkind = \"pigeon\"",
        )
        .unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("pigeon"));

        let config = CourierConfig::parse(
            "[webhook]\nenabled = true\n[content]\nkind = \"fetch\"\n[[notifiers]]\nkind = \"log\"",
        )
        .unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("requires `url`"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = CourierConfig::load_from(&path).unwrap();
        assert_eq!(config.jobs[0].name, "morning");

        let err = CourierConfig::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, CourierError::Config(_)));
    }
}
