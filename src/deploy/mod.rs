//! Deployment pipeline
//!
//! Sequences the deployment steps over one [`crate::shell::CommandChannel`]:
//! preflight checks for every repository, the protection gate, key loading,
//! the version stamp, then upload, history and tag update per repository.
//! The first unrecoverable failure ends the run.

pub mod commands;
pub mod history;
pub mod pipeline;
pub mod steps;
pub mod upload;

use serde::Serialize;

use crate::config::DeploySettings;

pub use history::{CommitEntry, Hint, HintExtractor, RepoHistory};
pub use pipeline::{DeployPlan, Deployment};
pub use steps::{evaluate_branch, BranchVerdict, TagUpdate};
pub use upload::{
    classify_upload_line, parse_deployment_range, parse_file_count, DeploymentRange,
    UploadClass, UploadOutcome,
};

/// Run-wide options
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Answer yes to every confirmation
    pub assume_yes: bool,
    /// Deployment policy from the configuration
    pub settings: DeploySettings,
}

impl DeployOptions {
    pub fn new(settings: DeploySettings, assume_yes: bool) -> Self {
        Self {
            assume_yes,
            settings,
        }
    }
}

/// Named pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    CleanCheck,
    BranchCheck,
    ProtectionGate,
    KeyLoad,
    VersionStamp,
    Upload,
    History,
    TagUpdate,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::CleanCheck => "clean_check",
            PipelineStep::BranchCheck => "branch_check",
            PipelineStep::ProtectionGate => "protection_gate",
            PipelineStep::KeyLoad => "key_load",
            PipelineStep::VersionStamp => "version_stamp",
            PipelineStep::Upload => "upload",
            PipelineStep::History => "history",
            PipelineStep::TagUpdate => "tag_update",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished step, optionally bound to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedStep {
    pub step: PipelineStep,
    pub repo: Option<String>,
}

/// Upload result of one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoUpload {
    pub repo: String,
    pub outcome: UploadOutcome,
}

/// Everything a successful run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub project_id: String,
    pub target_id: String,
    pub version: Option<String>,
    pub uploads: Vec<RepoUpload>,
    pub histories: Vec<RepoHistory>,
    pub tags: Vec<TagUpdate>,
    pub completed: Vec<CompletedStep>,
}

impl DeployReport {
    /// Hints of all repositories, in deployment order
    pub fn hints(&self) -> Vec<&Hint> {
        self.histories.iter().flat_map(|h| h.hints.iter()).collect()
    }

    /// Was `step` completed (for any repository)?
    pub fn completed(&self, step: PipelineStep) -> bool {
        self.completed.iter().any(|c| c.step == step)
    }

    fn record(&mut self, step: PipelineStep, repo: Option<&str>) {
        self.completed.push(CompletedStep {
            step,
            repo: repo.map(str::to_string),
        });
    }
}
