//! Configuration management for stup
//!
//! Shell session settings, deployment policy and the project list. Loaded
//! from TOML or JSON by [`loader::ConfigLoader`]; the JSON form accepts the
//! legacy `stup_config.json` layout, which only has `projects`.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::Project;
use crate::shell::{FramingMode, DEFAULT_MAX_LINE_BYTES};

pub use loader::{ConfigFormat, ConfigLoader};

/// Main configuration structure for stup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Shell session configuration
    #[serde(default)]
    pub shell: ShellConfig,

    /// Deployment behaviour
    #[serde(default)]
    pub deploy: DeploySettings,

    /// Deployable projects by id
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
}

impl Config {
    /// Look up a project by id
    pub fn project(&self, project_id: &str) -> Result<&Project> {
        self.projects
            .get(project_id)
            .ok_or_else(|| Error::ProjectNotFound {
                project_id: project_id.to_string(),
            })
    }

    /// Project ids in display order
    pub fn project_ids(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }
}

/// Shell session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell program
    pub program: String,

    /// Shell arguments
    pub args: Vec<String>,

    /// Working directory the shell starts in
    pub working_directory: Option<PathBuf>,

    /// Extra environment variables
    pub env: HashMap<String, String>,

    /// Upper bound for any awaited response
    pub response_timeout_secs: u64,

    /// How long shutdown waits for the shell to exit before killing it
    pub shutdown_timeout_secs: u64,

    /// How output chunks are split into lines
    pub framing: FramingMode,

    /// Lines longer than this are cut
    pub max_line_bytes: usize,

    /// Read buffer size per output pipe
    pub read_buffer_size: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "bash".to_string(),
            args: Vec::new(),
            working_directory: None,
            env: HashMap::new(),
            // Uploads of large trees can take a while
            response_timeout_secs: 600,
            shutdown_timeout_secs: 10,
            framing: FramingMode::Lines,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            read_buffer_size: 4096,
        }
    }
}

/// What to do when the remote has no git-ftp state yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Fail and print the init command
    Never,
    /// Ask the operator (assume-yes counts as yes)
    #[default]
    Ask,
    /// Initialize without asking
    Always,
}

impl std::str::FromStr for InitPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(InitPolicy::Never),
            "ask" => Ok(InitPolicy::Ask),
            "always" => Ok(InitPolicy::Always),
            other => Err(Error::ConfigValidationFailed {
                field: "deploy.init_policy".to_string(),
                reason: format!("unknown policy '{}', expected never, ask or always", other),
            }),
        }
    }
}

/// Deployment behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    /// Remote initialization policy
    pub init_policy: InitPolicy,

    /// File the short commit hash is written to (stubegru projects)
    pub version_file: String,

    /// Prefix of commit message hints, as in `[stup|note]`
    pub hint_prefix: String,

    /// Branches accepted without asking when no branch is configured
    pub default_branches: Vec<String>,

    /// Auxiliary repository folder of stubegru projects
    pub custom_folder: String,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            init_policy: InitPolicy::Ask,
            version_file: ".version".to_string(),
            hint_prefix: "stup".to_string(),
            default_branches: vec!["main".to_string(), "master".to_string()],
            custom_folder: "custom".to_string(),
        }
    }
}
