use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod endpoints;
pub mod validator;
pub mod watcher;

use crate::cli::{Cli, Command};
use crate::schema::{ExtraFields, FallbackPolicy, FieldDescriptor};

/// Directory (relative to the config root) holding receiver endpoint files
pub const RECEIVER_ENDPOINT_DIR: &str = "config/receiver";
/// Directory (relative to the config root) holding sender endpoint files
pub const SENDER_ENDPOINT_DIR: &str = "config/sender";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub receiver: ReceiverSettings,
    pub sender: SenderSettings,
    /// Degrade-or-fail switches for schema imperfections
    #[serde(default)]
    pub engine: FallbackPolicy,
    /// Loaded from `config/receiver/*`
    #[serde(skip)]
    pub receiver_endpoints: Vec<EndpointConfig>,
    /// Loaded from `config/sender/*`, in file name order
    #[serde(skip)]
    pub sender_endpoints: Vec<EndpointConfig>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReceiverSettings {
    pub host: String,
    pub port: u16,
    pub title: String,
    pub version: String,
    /// OpenAPI document whose operations become additional routes
    #[serde(default)]
    pub openapi: Option<PathBuf>,
    #[serde(default)]
    pub extra_fields: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SenderSettings {
    pub host: String,
    pub port: u16,
    pub target_host: String,
    pub target_port: u16,
    pub timeout_seconds: u64,
    /// OpenAPI document whose operations become additional sendable endpoints
    #[serde(default)]
    pub openapi: Option<PathBuf>,
}

/// One endpoint document: `{url, method, description?, bodyFields}`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub body_fields: Vec<FieldDescriptor>,
}

/// An endpoint file holds either one endpoint or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointFile {
    One(EndpointConfig),
    Many(Vec<EndpointConfig>),
}

/// Command line values that beat the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub receiver_host: Option<String>,
    pub receiver_port: Option<u16>,
    pub sender_host: Option<String>,
    pub sender_port: Option<u16>,
    pub target_host: Option<String>,
    pub target_port: Option<u16>,
}

impl Overrides {
    pub fn from_cli(cli: &Cli) -> Self {
        match &cli.command {
            Command::Receive(args) => Self {
                receiver_host: args.host.clone(),
                receiver_port: args.port,
                ..Self::default()
            },
            Command::Sender(args) => Self {
                sender_host: args.server.host.clone(),
                sender_port: args.server.port,
                target_host: args.target.target_host.clone(),
                target_port: args.target.target_port,
                ..Self::default()
            },
            Command::Send { target, .. } => Self {
                target_host: target.target_host.clone(),
                target_port: target.target_port,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

/// Everything needed to (re)load settings from disk
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub overrides: Overrides,
}

impl ConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: Overrides::default(),
        }
    }

    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            path: cli.config.clone(),
            overrides: Overrides::from_cli(cli),
        }
    }

    pub fn load(&self) -> Result<Settings, anyhow::Error> {
        Settings::load(&self.path, &self.overrides)
    }

    /// Paths a watcher should observe for this source
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let root = config_root(&self.path);
        vec![
            self.path.clone(),
            root.join(RECEIVER_ENDPOINT_DIR),
            root.join(SENDER_ENDPOINT_DIR),
        ]
    }
}

fn config_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Load `hermes.{toml,yaml,json}` and endpoint files under `root`
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let root = root.as_ref();
        Self::build(
            File::from(root.join("hermes")).required(false),
            root,
            &Overrides::default(),
        )
    }

    /// Load an explicit config file, then apply command line overrides
    pub fn load(config_path: &Path, overrides: &Overrides) -> Result<Self, anyhow::Error> {
        Self::build(
            File::from(config_path.to_path_buf()).required(false),
            &config_root(config_path),
            overrides,
        )
    }

    fn build<S>(source: S, root: &Path, overrides: &Overrides) -> Result<Self, anyhow::Error>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let s = Config::builder()
            .add_source(source)
            .set_default("receiver.host", "127.0.0.1")?
            .set_default("receiver.port", 8000)?
            .set_default("receiver.title", "Hermes Receiver")?
            .set_default("receiver.version", "1.0.0")?
            .set_default("sender.host", "127.0.0.1")?
            .set_default("sender.port", 5000)?
            .set_default("sender.target_host", "127.0.0.1")?
            .set_default("sender.target_port", 8000)?
            .set_default("sender.timeout_seconds", 10)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.root = root.to_path_buf();

        // CLI > env vars > config file
        settings.apply_overrides(overrides);

        settings.receiver_endpoints = load_endpoints_from_dir(&root.join(RECEIVER_ENDPOINT_DIR))?;
        settings.sender_endpoints = load_endpoints_from_dir(&root.join(SENDER_ENDPOINT_DIR))?;

        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })?;

        Ok(settings)
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.receiver_host {
            self.receiver.host = host.clone();
        }
        if let Some(port) = overrides.receiver_port {
            self.receiver.port = port;
        }
        if let Some(host) = &overrides.sender_host {
            self.sender.host = host.clone();
        }
        if let Some(port) = overrides.sender_port {
            self.sender.port = port;
        }
        if let Some(host) = &overrides.target_host {
            self.sender.target_host = host.clone();
        }
        if let Some(port) = overrides.target_port {
            self.sender.target_port = port;
        }
    }

    /// Resolve a configured path against the config root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Every `.json`, `.yaml` or `.yml` endpoint file in `dir`, in file name order.
/// A missing directory yields no endpoints.
pub fn load_endpoints_from_dir(dir: &Path) -> Result<Vec<EndpointConfig>, anyhow::Error> {
    let pattern = format!("{}/*", dir.display());
    let mut endpoints = Vec::new();

    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) => {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    if matches!(ext, "json" | "yaml" | "yml") {
                        let content = std::fs::read_to_string(&path)?;
                        let file: EndpointFile = if ext == "json" {
                            serde_json::from_str(&content).map_err(|e| {
                                anyhow::anyhow!("Invalid endpoint file {}: {}", path.display(), e)
                            })?
                        } else {
                            serde_yaml::from_str(&content).map_err(|e| {
                                anyhow::anyhow!("Invalid endpoint file {}: {}", path.display(), e)
                            })?
                        };
                        match file {
                            EndpointFile::One(endpoint) => endpoints.push(endpoint),
                            EndpointFile::Many(list) => endpoints.extend(list),
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
        }
    }

    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::from_root(dir.path()).unwrap();
        assert_eq!(settings.receiver.host, "127.0.0.1");
        assert_eq!(settings.receiver.port, 8000);
        assert_eq!(settings.sender.port, 5000);
        assert_eq!(settings.sender.timeout_seconds, 10);
        assert_eq!(settings.receiver.extra_fields, ExtraFields::Drop);
        assert_eq!(settings.engine, FallbackPolicy::default());
        assert!(settings.receiver_endpoints.is_empty());
    }

    #[test]
    fn test_file_values_and_engine_policy() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "hermes.toml",
            r#"
[receiver]
port = 9100
extra_fields = "reject"

[sender]
target_host = "ebs.internal"
target_port = 9100

[engine]
max_depth = 8
on_cycle = "fail"
"#,
        );

        let settings = Settings::from_root(dir.path()).unwrap();
        assert_eq!(settings.receiver.port, 9100);
        assert_eq!(settings.receiver.extra_fields, ExtraFields::Reject);
        assert_eq!(settings.sender.target_host, "ebs.internal");
        assert_eq!(settings.engine.max_depth, 8);
        assert_eq!(settings.engine.on_cycle, crate::schema::Fallback::Fail);
    }

    #[test]
    fn test_overrides_beat_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "hermes.toml", "[sender]\ntarget_port = 7000\n");

        let overrides = Overrides {
            target_port: Some(7100),
            receiver_host: Some("0.0.0.0".to_string()),
            ..Overrides::default()
        };
        let settings = Settings::load(&dir.path().join("hermes.toml"), &overrides).unwrap();
        assert_eq!(settings.sender.target_port, 7100);
        assert_eq!(settings.receiver.host, "0.0.0.0");
    }

    #[test]
    fn test_endpoint_files_loaded_in_name_order() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "config/sender/b_orders.yaml",
            concat!(
                "url: /orders\nmethod: POST\nbodyFields:\n",
                "  - name: id\n    dataType: string\n    required: true\n",
            ),
        );
        write(
            dir.path(),
            "config/sender/a_status.json",
            r#"{"url": "/status", "method": "GET"}"#,
        );
        write(dir.path(), "config/sender/notes.txt", "ignored");

        let settings = Settings::from_root(dir.path()).unwrap();
        let urls: Vec<_> = settings.sender_endpoints.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["/status", "/orders"]);
        assert_eq!(settings.sender_endpoints[1].body_fields[0].name, "id");
    }

    #[test]
    fn test_endpoint_file_with_list() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "config/receiver/all.json",
            r#"[{"url": "/a", "method": "POST"}, {"url": "/b", "method": "PUT"}]"#,
        );
        let settings = Settings::from_root(dir.path()).unwrap();
        assert_eq!(settings.receiver_endpoints.len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/receiver/bad.json", r#"{"url": "", "method": "FETCH"}"#);
        let err = Settings::from_root(dir.path()).unwrap_err().to_string();
        assert!(err.contains("Configuration validation failed"));
        assert!(err.contains("FETCH"));
    }

    #[test]
    fn test_resolve_path_against_root() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::from_root(dir.path()).unwrap();
        assert_eq!(
            settings.resolve_path(Path::new("specs/api.yaml")),
            dir.path().join("specs/api.yaml")
        );
    }
}
