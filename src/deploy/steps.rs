//! Pipeline steps
//!
//! Plain async functions over a [`CommandChannel`]. Each one either
//! returns what later steps need or fails the run.

use serde::Serialize;

use super::commands::{
    add_key, create_tag, delete_tag, git_current_branch, git_short_head, git_status, in_repo,
    kill_agent, start_agent, write_version,
};
use super::DeployOptions;
use crate::error::{Error, Result};
use crate::models::{BranchRule, Repo, Target};
use crate::prompt::Prompt;
use crate::shell::CommandChannel;

/// ssh-add prints this once the key is loaded
pub const IDENTITY_ADDED_PHRASE: &str = "Identity added";

/// Result of comparing the current branch with the branch rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchVerdict {
    /// Branch is acceptable
    Accepted,
    /// Exact rule violated; fatal
    Mismatch { expected: String },
    /// Not a default branch; the operator decides
    Unusual,
}

/// Pure branch decision
pub fn evaluate_branch(rule: &BranchRule, actual: &str, default_branches: &[String]) -> BranchVerdict {
    match rule {
        BranchRule::Exact(expected) if expected == actual => BranchVerdict::Accepted,
        BranchRule::Exact(expected) => BranchVerdict::Mismatch {
            expected: expected.clone(),
        },
        BranchRule::Default if default_branches.iter().any(|b| b == actual) => {
            BranchVerdict::Accepted
        }
        BranchRule::Default => BranchVerdict::Unusual,
    }
}

/// Fail unless `git status --porcelain` prints nothing
pub async fn check_clean<C>(channel: &C, repo: &Repo) -> Result<()>
where
    C: CommandChannel + ?Sized,
{
    let output = channel
        .run(&in_repo(repo, &git_status()))
        .await?
        .require_success()?;

    let changes: Vec<String> = output
        .lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();

    if !changes.is_empty() {
        error!("🔴 The {} repository is not clean", repo.name);
        for change in &changes {
            error!("  {}", change);
        }
        return Err(Error::DirtyWorkingTree {
            repo: repo.name.clone(),
            changes,
        });
    }

    info!("🟢 {} repository is clean", repo.name);
    Ok(())
}

/// Name of the checked out branch
pub async fn current_branch<C>(channel: &C, repo: &Repo) -> Result<String>
where
    C: CommandChannel + ?Sized,
{
    let command = git_current_branch();
    let output = channel
        .run(&in_repo(repo, &command))
        .await?
        .require_success()?;

    output
        .first_line()
        .map(|line| line.trim().to_string())
        .filter(|branch| !branch.is_empty())
        .ok_or_else(|| Error::MalformedResponse {
            command,
            reason: "no branch name printed".to_string(),
        })
}

/// Apply the repository's branch rule, asking when the branch is unusual
pub async fn check_branch<C>(
    channel: &C,
    repo: &Repo,
    options: &DeployOptions,
    prompt: &dyn Prompt,
) -> Result<String>
where
    C: CommandChannel + ?Sized,
{
    let actual = current_branch(channel, repo).await?;

    match evaluate_branch(&repo.branch_rule, &actual, &options.settings.default_branches) {
        BranchVerdict::Accepted => {
            info!("🟢 {} is on branch {}", repo.name, actual);
            Ok(actual)
        }
        BranchVerdict::Mismatch { expected } => {
            error!(
                "🔴 {} is currently on branch {}, but target wants branch {}",
                repo.name, actual, expected
            );
            Err(Error::BranchMismatch {
                repo: repo.name.clone(),
                actual,
                expected,
            })
        }
        BranchVerdict::Unusual => {
            let defaults = options.settings.default_branches.join(" or ");
            if options.assume_yes {
                warn!(
                    "🟡 {} is on branch {}, not {}; continuing because of --yes",
                    repo.name, actual, defaults
                );
                return Ok(actual);
            }

            let question = format!(
                "{} is on branch '{}', not on {}. Deploy anyway?",
                repo.name, actual, defaults
            );
            if prompt.confirm(&question)? {
                Ok(actual)
            } else {
                Err(Error::DeploymentCanceled {
                    reason: format!("{} is on branch '{}'", repo.name, actual),
                })
            }
        }
    }
}

/// Ask before deploying to a protected target
pub fn protection_gate(
    target_id: &str,
    target: &Target,
    options: &DeployOptions,
    prompt: &dyn Prompt,
) -> Result<()> {
    if !target.protected || options.assume_yes {
        return Ok(());
    }

    let question = format!(
        "Target '{}' is protected ({}). Do you really want to deploy?",
        target_id, target.description
    );
    if prompt.confirm(&question)? {
        Ok(())
    } else {
        Err(Error::DeploymentCanceled {
            reason: format!("target '{}' is protected", target_id),
        })
    }
}

/// Start an ssh-agent in the session and add the target's key
pub async fn load_key<C>(channel: &C, key: &str) -> Result<()>
where
    C: CommandChannel + ?Sized,
{
    info!("⏳ Loading ssh private key");
    channel.run(&start_agent()).await?.require_success()?;

    let output = channel.run(&add_key(key)).await?;
    if !output.text().contains(IDENTITY_ADDED_PHRASE) {
        return Err(Error::KeyLoadFailed {
            key: key.to_string(),
            output: output.text(),
        });
    }

    info!("🟢 Loaded private key {}", key);
    Ok(())
}

/// Write the short HEAD hash into the version file of `repo`
pub async fn stamp_version<C>(channel: &C, repo: &Repo, version_file: &str) -> Result<String>
where
    C: CommandChannel + ?Sized,
{
    let hash = short_head(channel, repo).await?;
    channel
        .run(&in_repo(repo, &write_version(version_file, &hash)))
        .await?
        .require_success()?;

    info!(
        "🟢 Updating {} file for {} to {}",
        version_file, repo.name, hash
    );
    Ok(hash)
}

async fn short_head<C>(channel: &C, repo: &Repo) -> Result<String>
where
    C: CommandChannel + ?Sized,
{
    let command = git_short_head();
    let output = channel
        .run(&in_repo(repo, &command))
        .await?
        .require_success()?;

    output
        .last_line()
        .map(|line| line.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .ok_or_else(|| Error::MalformedResponse {
            command,
            reason: "no commit hash printed".to_string(),
        })
}

/// A moved tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagUpdate {
    pub repo: String,
    pub tag: String,
    pub commit: String,
}

/// Move the target's tag to HEAD. Delete and create are not awaited.
pub async fn update_tag<C>(channel: &C, repo: &Repo) -> Result<TagUpdate>
where
    C: CommandChannel + ?Sized,
{
    let tag = &repo.target.tag;
    channel.send(&in_repo(repo, &delete_tag(tag)))?;
    channel.send(&in_repo(repo, &create_tag(tag)))?;

    let commit = short_head(channel, repo).await?;
    info!(
        "🟢 Added git tag {} to current commit {} in {} repo",
        tag, commit, repo.name
    );
    Ok(TagUpdate {
        repo: repo.name.clone(),
        tag: tag.clone(),
        commit,
    })
}

/// Stop the agent started by [`load_key`]
pub async fn stop_agent<C>(channel: &C) -> Result<()>
where
    C: CommandChannel + ?Sized,
{
    let output = channel.run(&kill_agent()).await?;
    if output.success() {
        debug!("ssh-agent stopped");
    } else {
        warn!("Could not stop ssh-agent: {}", output.text());
    }
    Ok(())
}
