// ABOUTME: Configuration for op-agent: directories, agent.toml settings, and environment.
// ABOUTME: Resolves where the allow-list and audit log live and how the agent is reached.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Port the agent tries first when nothing overrides it.
pub const STANDARD_PORT: u16 = 48484;

/// Environment variable overriding the agent port (agent and client).
pub const AGENT_PORT_ENV: &str = "OP_AGENT_PORT";

/// Environment variable overriding the host the client connects to.
pub const AGENT_HOST_ENV: &str = "OP_AGENT_HOST";

const APP_DIR: &str = "op-agent";

/// Variables whose presence means nobody is sitting at the terminal.
const NON_INTERACTIVE_ENV: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_ID",
    "BUILD_NUMBER",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "JENKINS_URL",
    "TEAMCITY_VERSION",
    "TF_BUILD",
    "BUILDKITE",
    "CIRCLECI",
    "TRAVIS",
    "DRONE",
];

/// Files that container runtimes drop at the filesystem root.
const CONTAINER_MARKERS: &[&str] = &["/.dockerenv", "/run/.containerenv"];

/// Agent settings read from `agent.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// First port to try.
    pub port: u16,
    /// Address to bind on.
    pub bind: String,
    /// The secrets CLI to run for approved commands.
    pub binary: String,
    /// How many successive ports to probe when `port` is taken.
    pub port_search: u16,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            port: STANDARD_PORT,
            bind: "0.0.0.0".to_string(),
            binary: "op".to_string(),
            port_search: 100,
        }
    }
}

impl AgentSettings {
    /// Load settings from a TOML file, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(settings)
    }

    /// Apply `OP_AGENT_PORT` on top of the file value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = port_from_env() {
            self.port = port;
        }
        self
    }
}

/// On-disk locations used by the agent.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AgentPaths {
    /// Resolve the platform directories and make sure both exist.
    pub fn discover() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("could not determine the home directory")?;
        let (config_dir, data_dir) = if cfg!(windows) {
            let app_data =
                dirs::config_dir().context("could not determine the app data directory")?;
            (app_data.join(APP_DIR), app_data.join(APP_DIR))
        } else {
            (
                home.join(".config").join(APP_DIR),
                home.join(".local").join("share").join(APP_DIR),
            )
        };
        let paths = Self {
            config_dir,
            data_dir,
        };
        paths.ensure()?;
        Ok(paths)
    }

    /// Use a single root for everything (tests and portable installs).
    pub fn in_dir(root: &Path) -> Self {
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }

    /// Create both directories with owner-only permissions.
    pub fn ensure(&self) -> anyhow::Result<()> {
        create_private_dir(&self.config_dir)?;
        create_private_dir(&self.data_dir)?;
        Ok(())
    }

    /// Path to the allow-list file.
    pub fn allowlist_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Path to the agent settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("agent.toml")
    }

    /// Path to the JSONL audit log.
    pub fn audit_log_path(&self) -> PathBuf {
        self.data_dir.join("commands.log")
    }
}

fn create_private_dir(dir: &Path) -> anyhow::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))
}

/// Port from `OP_AGENT_PORT`, ignoring unparseable values.
pub fn port_from_env() -> Option<u16> {
    parse_port(std::env::var(AGENT_PORT_ENV).ok().as_deref())
}

fn parse_port(value: Option<&str>) -> Option<u16> {
    value.and_then(|v| v.trim().parse().ok())
}

/// The port the client should connect to.
pub fn agent_port() -> u16 {
    port_from_env().unwrap_or(STANDARD_PORT)
}

/// The host the client should connect to.
pub fn agent_host(in_container: bool) -> String {
    resolve_host(std::env::var(AGENT_HOST_ENV).ok(), in_container)
}

fn resolve_host(env_value: Option<String>, in_container: bool) -> String {
    match env_value {
        Some(host) if !host.is_empty() => host,
        _ if in_container => "host.docker.internal".to_string(),
        _ => "localhost".to_string(),
    }
}

/// True when a container runtime marker file exists.
pub fn in_container() -> bool {
    any_marker_exists(CONTAINER_MARKERS.iter().map(Path::new))
}

fn any_marker_exists<'a>(mut markers: impl Iterator<Item = &'a Path>) -> bool {
    markers.any(Path::exists)
}

/// True when a CI-style environment variable is set.
pub fn ci_environment() -> bool {
    ci_markers_set(|name| std::env::var_os(name))
}

fn ci_markers_set(lookup: impl Fn(&str) -> Option<std::ffi::OsString>) -> bool {
    NON_INTERACTIVE_ENV
        .iter()
        .any(|name| lookup(name).is_some_and(|v| !v.is_empty()))
}
