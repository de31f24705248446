//! Project, target and repository models
//!
//! A project is a local checkout with one or more deployment targets. A
//! [`Repo`] pairs one working directory with the target it is deployed to;
//! a stubegru project yields two of them (the main tree and its custom
//! folder), a plain git repository yields one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Kind of project, decides which repositories a deployment touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    /// Main tree plus an independently versioned custom folder and a version stamp
    Stubegru,
    /// A single git repository
    GitRepo,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::Stubegru => write!(f, "stubegru"),
            ProjectType::GitRepo => write!(f, "git_repo"),
        }
    }
}

/// Remote credentials for git-ftp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote url, e.g. `sftp://example.org/var/www`
    pub url: String,
    /// Remote user
    pub user: String,
    /// Path to the private key
    pub key: String,
}

/// A deployment destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Free-form description shown during selection
    #[serde(default)]
    pub description: String,

    /// Branch the repository must be on; `None` falls back to the default branch check
    #[serde(default, alias = "customBranch")]
    pub branch: Option<String>,

    /// Tag moved to the deployed commit after each successful run
    pub tag: String,

    /// Remote credentials
    pub ssh: SshConfig,

    /// Requires an explicit confirmation before deploying
    #[serde(default)]
    pub protected: bool,
}

/// A deployable project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Local working directory
    pub path: PathBuf,

    /// Project kind
    #[serde(rename = "type")]
    pub project_type: ProjectType,

    /// Deployment targets by id
    #[serde(default)]
    pub targets: BTreeMap<String, Target>,
}

impl Project {
    /// Look up a target by id
    pub fn target(&self, target_id: &str) -> Option<&Target> {
        self.targets.get(target_id)
    }

    /// Target ids in display order
    pub fn target_ids(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }
}

/// How a repository's current branch is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchRule {
    /// Must be exactly this branch
    Exact(String),
    /// Should be one of the conventional default branches; anything else asks first
    Default,
}

/// One working directory bound to the remote it is uploaded to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    /// Display name
    pub name: String,
    /// Local working directory
    pub path: PathBuf,
    /// Target with the remote url adjusted for this repository
    pub target: Target,
    /// Branch rule applied during preflight
    pub branch_rule: BranchRule,
}

impl Repo {
    /// Build a repository rooted at `project.path`, optionally descending into `relative_path`.
    /// The remote url is extended by the same relative path.
    pub fn new(name: &str, project: &Project, target: &Target, relative_path: &str) -> Self {
        let relative = relative_path.trim_matches('/');
        let mut target = target.clone();

        let path = if relative.is_empty() {
            project.path.clone()
        } else {
            target.ssh.url = format!("{}/{}", target.ssh.url.trim_end_matches('/'), relative);
            project.path.join(relative)
        };

        let branch_rule = match &target.branch {
            Some(branch) if !branch.trim().is_empty() => BranchRule::Exact(branch.clone()),
            _ => BranchRule::Default,
        };

        Self {
            name: name.to_string(),
            path,
            target,
            branch_rule,
        }
    }

    /// Use the default branch check regardless of the target's branch
    pub fn with_default_branch_rule(mut self) -> Self {
        self.branch_rule = BranchRule::Default;
        self
    }

    /// Working directory as a path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Repositories deployed for `project` to `target`, in deployment order
pub fn repos_for(
    project_id: &str,
    project: &Project,
    target: &Target,
    custom_folder: &str,
) -> Vec<Repo> {
    match project.project_type {
        ProjectType::Stubegru => vec![
            // The configured branch pins the custom folder; the main tree follows the default branch
            Repo::new("stubegru", project, target, "").with_default_branch_rule(),
            Repo::new("custom-folder", project, target, custom_folder),
        ],
        ProjectType::GitRepo => vec![Repo::new(project_id, project, target, "")],
    }
}
