//! Deployment sequencing

use tracing::Instrument;

use super::history::{collect_history, HintExtractor};
use super::steps::{
    check_branch, check_clean, load_key, protection_gate, stamp_version, stop_agent, update_tag,
};
use super::upload::upload_repo;
use super::commands::kill_agent;
use super::{DeployOptions, DeployReport, PipelineStep, RepoUpload};
use crate::error::{Error, ErrorKind, Result};
use crate::models::{repos_for, Project, ProjectType, Repo, Target};
use crate::prompt::Prompt;
use crate::shell::CommandChannel;

/// What to deploy where
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub project_id: String,
    pub project_type: ProjectType,
    pub target_id: String,
    pub target: Target,
    /// Repositories in deployment order; the first is the main one
    pub repos: Vec<Repo>,
}

impl DeployPlan {
    pub fn new(
        project_id: &str,
        project: &Project,
        target_id: &str,
        target: &Target,
        custom_folder: &str,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            project_type: project.project_type,
            target_id: target_id.to_string(),
            target: target.clone(),
            repos: repos_for(project_id, project, target, custom_folder),
        }
    }
}

/// One deployment run over a command channel
pub struct Deployment<'a, C: CommandChannel + ?Sized> {
    channel: &'a C,
    prompt: &'a dyn Prompt,
    options: DeployOptions,
    agent_started: bool,
}

impl<'a, C: CommandChannel + ?Sized> Deployment<'a, C> {
    pub fn new(channel: &'a C, prompt: &'a dyn Prompt, options: DeployOptions) -> Self {
        Self {
            channel,
            prompt,
            options,
            agent_started: false,
        }
    }

    /// Run the pipeline, then tear down whatever it started, on success and failure alike.
    ///
    /// When the shell stopped answering, nothing more is run through it;
    /// the agent kill is left to [`Deployment::cleanup_command`].
    pub async fn execute(&mut self, plan: &DeployPlan) -> Result<DeployReport> {
        let result = self.run(plan).await;
        match &result {
            Err(e) if shell_unresponsive(e) => {
                if self.agent_started {
                    warn!("Shell is not answering, ssh-agent is stopped on shutdown instead");
                }
            }
            _ => {
                if let Err(e) = self.teardown().await {
                    warn!("Teardown failed: {}", e);
                }
            }
        }
        result
    }

    /// Cleanup still owed to the shell, to be sent as its final command
    /// before stdin is closed
    pub fn cleanup_command(&self) -> Option<String> {
        self.agent_started.then(kill_agent)
    }

    /// Run every step; the first failure aborts the run
    pub async fn run(&mut self, plan: &DeployPlan) -> Result<DeployReport> {
        let channel = self.channel;
        let prompt = self.prompt;
        let hints = HintExtractor::new(&self.options.settings.hint_prefix)?;
        let mut report = DeployReport {
            project_id: plan.project_id.clone(),
            target_id: plan.target_id.clone(),
            ..DeployReport::default()
        };

        info!(
            "🔵 Deploy project {} to target {}",
            plan.project_id, plan.target_id
        );

        // Preflight every repository before anything leaves the machine
        for repo in &plan.repos {
            check_clean(channel, repo)
                .instrument(step_span(PipelineStep::CleanCheck, &repo.name))
                .await?;
            report.record(PipelineStep::CleanCheck, Some(&repo.name));

            check_branch(channel, repo, &self.options, prompt)
                .instrument(step_span(PipelineStep::BranchCheck, &repo.name))
                .await?;
            report.record(PipelineStep::BranchCheck, Some(&repo.name));
        }

        {
            let _span = step_span(PipelineStep::ProtectionGate, &plan.target_id).entered();
            protection_gate(&plan.target_id, &plan.target, &self.options, prompt)?;
        }
        report.record(PipelineStep::ProtectionGate, None);

        self.agent_started = true;
        load_key(channel, &plan.target.ssh.key)
            .instrument(step_span(PipelineStep::KeyLoad, &plan.target_id))
            .await?;
        report.record(PipelineStep::KeyLoad, None);

        if plan.project_type == ProjectType::Stubegru {
            if let Some(main) = plan.repos.first() {
                let hash = stamp_version(channel, main, &self.options.settings.version_file)
                    .instrument(step_span(PipelineStep::VersionStamp, &main.name))
                    .await?;
                report.version = Some(hash);
                report.record(PipelineStep::VersionStamp, Some(&main.name));
            }
        }

        for repo in &plan.repos {
            let outcome = upload_repo(channel, repo, &self.options, prompt)
                .instrument(step_span(PipelineStep::Upload, &repo.name))
                .await?;
            report.uploads.push(RepoUpload {
                repo: repo.name.clone(),
                outcome,
            });
            report.record(PipelineStep::Upload, Some(&repo.name));
        }

        for (repo, upload) in plan.repos.iter().zip(&report.uploads) {
            let history = collect_history(channel, repo, upload.outcome.range(), &hints)
                .instrument(step_span(PipelineStep::History, &repo.name))
                .await?;
            if let Some(history) = history {
                report.histories.push(history);
            }
        }
        for repo in &plan.repos {
            report.record(PipelineStep::History, Some(&repo.name));
        }

        for repo in &plan.repos {
            let tag = update_tag(channel, repo)
                .instrument(step_span(PipelineStep::TagUpdate, &repo.name))
                .await?;
            report.tags.push(tag);
            report.record(PipelineStep::TagUpdate, Some(&repo.name));
        }

        Ok(report)
    }

    /// Stop the ssh-agent if this run started one
    pub async fn teardown(&mut self) -> Result<()> {
        if !self.agent_started {
            return Ok(());
        }
        stop_agent(self.channel).await?;
        self.agent_started = false;
        Ok(())
    }
}

/// A timed-out command still occupies the shell; anything queued behind it
/// would only wait out another timeout
fn shell_unresponsive(err: &Error) -> bool {
    matches!(err.kind(), ErrorKind::Timeout | ErrorKind::Channel)
}

fn step_span(step: PipelineStep, subject: &str) -> tracing::Span {
    info_span!("step", step = step.as_str(), subject = subject)
}
