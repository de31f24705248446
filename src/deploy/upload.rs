//! git-ftp upload step
//!
//! The first line git-ftp prints decides what happened. Classification
//! order matters: a line that mentions several phrases resolves to the
//! earliest class in [`UploadClass`].

use serde::Serialize;

use super::commands::{git_ftp, in_repo};
use super::DeployOptions;
use crate::config::InitPolicy;
use crate::error::{Error, Result};
use crate::models::Repo;
use crate::prompt::Prompt;
use crate::shell::{CommandChannel, CommandOutput};

/// Printed when the remote already has the current commit
pub const UP_TO_DATE_PHRASE: &str = "Everything up-to-date";
/// Printed when the remote has never been initialized
pub const NOT_INITIALIZED_PHRASE: &str = "The resource does not exist";
/// Any fatal git-ftp error
pub const FATAL_PHRASE: &str = "fatal";
/// Introduces the uploaded commit range
pub const RANGE_PHRASE: &str = "changed from";

/// Classification of the first line of git-ftp output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadClass {
    UpToDate,
    NeedsInit,
    Fatal,
    Success,
}

/// Classify the first output line. Total: every line maps to exactly one class.
pub fn classify_upload_line(line: &str) -> UploadClass {
    if line.contains(UP_TO_DATE_PHRASE) {
        UploadClass::UpToDate
    } else if line.contains(NOT_INITIALIZED_PHRASE) {
        UploadClass::NeedsInit
    } else if line.contains(FATAL_PHRASE) {
        UploadClass::Fatal
    } else {
        UploadClass::Success
    }
}

/// Remote commit before and after an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRange {
    pub pre: String,
    pub post: String,
}

/// Parse `... changed from <pre> to <post>.`
pub fn parse_deployment_range(line: &str) -> Option<DeploymentRange> {
    let (_, rest) = line.split_once(RANGE_PHRASE)?;
    let mut tokens = rest.split_whitespace();

    let pre = tokens.next()?;
    if tokens.next()? != "to" {
        return None;
    }
    let post = tokens
        .next()?
        .trim_end_matches(|c: char| c.is_ascii_punctuation());

    if pre.is_empty() || post.is_empty() {
        return None;
    }
    Some(DeploymentRange {
        pre: pre.to_string(),
        post: post.to_string(),
    })
}

/// Leading number of the first output line, e.g. `3 files to sync:`
pub fn parse_file_count(line: &str) -> Option<u64> {
    line.split_whitespace().next()?.parse().ok()
}

/// What an upload achieved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UploadOutcome {
    /// Nothing to upload
    UpToDate,
    /// Remote was initialized with a full upload
    Initialized { files: Option<u64> },
    /// Changed files were uploaded
    Uploaded {
        files: Option<u64>,
        range: Option<DeploymentRange>,
        log: Vec<String>,
    },
}

impl UploadOutcome {
    /// Range to extract history for, if the upload produced one
    pub fn range(&self) -> Option<&DeploymentRange> {
        match self {
            UploadOutcome::Uploaded { range, .. } => range.as_ref(),
            _ => None,
        }
    }
}

/// Upload one repository, initializing the remote if policy allows
pub async fn upload_repo<C>(
    channel: &C,
    repo: &Repo,
    options: &DeployOptions,
    prompt: &dyn Prompt,
) -> Result<UploadOutcome>
where
    C: CommandChannel + ?Sized,
{
    info!("⏳ Uploading files for repo {} using git-ftp", repo.name);
    let output = channel
        .run(&in_repo(repo, &git_ftp("push", &repo.target.ssh)))
        .await?;
    let first = output.first_line().unwrap_or_default().to_string();

    match classify_upload_line(&first) {
        UploadClass::UpToDate => {
            info!(
                "🟡 Files for repo {} are already up-to-date. Uploaded no files here",
                repo.name
            );
            Ok(UploadOutcome::UpToDate)
        }
        UploadClass::NeedsInit => initialize_remote(channel, repo, options, prompt).await,
        UploadClass::Fatal => {
            error!("🔴 git-ftp ran into a fatal error on repo {}", repo.name);
            for line in &output.lines {
                error!("  {}", line);
            }
            Err(Error::UploadFailed {
                repo: repo.name.clone(),
                line: first,
            })
        }
        UploadClass::Success => uploaded(repo, output, &first),
    }
}

fn uploaded(repo: &Repo, output: CommandOutput, first: &str) -> Result<UploadOutcome> {
    let files = parse_file_count(first);
    let range = output
        .lines
        .iter()
        .find_map(|line| parse_deployment_range(line));

    if range.is_none() && !output.success() {
        return Err(Error::UploadFailed {
            repo: repo.name.clone(),
            line: output.last_line().unwrap_or(first).to_string(),
        });
    }

    match files {
        Some(count) => info!(
            "🟢 Uploaded {} files from {} repo, git-ftp said:",
            count, repo.name
        ),
        None => info!("🟢 Uploaded files from {} repo, git-ftp said:", repo.name),
    }
    for line in &output.lines {
        info!("  {}", line);
    }
    if range.is_none() {
        warn!(
            "git-ftp did not report a deployment range for {}, history will be skipped",
            repo.name
        );
    }

    Ok(UploadOutcome::Uploaded {
        files,
        range,
        log: output.lines,
    })
}

async fn initialize_remote<C>(
    channel: &C,
    repo: &Repo,
    options: &DeployOptions,
    prompt: &dyn Prompt,
) -> Result<UploadOutcome>
where
    C: CommandChannel + ?Sized,
{
    let init_command = git_ftp("init", &repo.target.ssh);
    info!("🔵 git-ftp seems to be not initialized for repo {}", repo.name);

    let proceed = match options.settings.init_policy {
        InitPolicy::Never => false,
        InitPolicy::Always => true,
        InitPolicy::Ask => {
            options.assume_yes
                || prompt.confirm(&format!(
                    "Initialize git-ftp for {} at {}?",
                    repo.name, repo.target.ssh.url
                ))?
        }
    };

    if !proceed {
        return Err(Error::RemoteNotInitialized {
            repo: repo.name.clone(),
            init_command: in_repo(repo, &init_command),
        });
    }

    info!("⏳ Initializing git-ftp for repo {}", repo.name);
    let output = channel.run(&in_repo(repo, &init_command)).await?;
    let first = output.first_line().unwrap_or_default().to_string();

    let failed = matches!(
        classify_upload_line(&first),
        UploadClass::Fatal | UploadClass::NeedsInit
    ) || !output.success();
    if failed {
        return Err(Error::InitializationFailed {
            repo: repo.name.clone(),
            line: if first.is_empty() { output.text() } else { first },
        });
    }

    let files = parse_file_count(&first);
    info!("🟢 Initialized git-ftp for repo {}", repo.name);
    Ok(UploadOutcome::Initialized { files })
}
