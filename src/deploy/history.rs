//! Commit history and hints
//!
//! After an upload the commits in the deployed range are listed, and
//! bracketed hints like `[stup|release-note-1]` are pulled out of their
//! subjects so the operator sees them at the end of the run.

use regex::Regex;
use serde::Serialize;

use super::commands::{git_log_range, in_repo, LOG_DELIMITER};
use super::upload::DeploymentRange;
use crate::error::Result;
use crate::models::Repo;
use crate::shell::CommandChannel;

/// One commit of the deployed range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitEntry {
    pub message: String,
    pub hash: String,
}

/// An operator note embedded in a commit message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hint {
    pub repo: String,
    pub commit: String,
    pub text: String,
}

/// Commits deployed to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoHistory {
    pub repo: String,
    pub range: DeploymentRange,
    pub commits: Vec<CommitEntry>,
    pub hints: Vec<Hint>,
}

/// Split a `git log` line into subject and short hash.
/// The last delimiter wins, so subjects may contain it.
pub fn parse_log_line(line: &str) -> Option<CommitEntry> {
    let (message, hash) = line.rsplit_once(LOG_DELIMITER)?;
    let hash = hash.trim();
    if hash.is_empty() {
        return None;
    }
    Some(CommitEntry {
        message: message.to_string(),
        hash: hash.to_string(),
    })
}

/// Finds `[<prefix>|text]` markers
#[derive(Debug, Clone)]
pub struct HintExtractor {
    regex: Regex,
}

impl HintExtractor {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = format!(r"\[{}\|([^\[\]]+)\]", regex::escape(prefix));
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    /// Every hint in `message`, in order
    pub fn extract(&self, message: &str) -> Vec<String> {
        self.regex
            .captures_iter(message)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|hint| !hint.is_empty())
            .collect()
    }
}

/// Build the history of one repository from raw `git log` lines
pub fn build_history(
    repo: &str,
    range: &DeploymentRange,
    lines: &[String],
    hints: &HintExtractor,
) -> RepoHistory {
    let mut commits = Vec::new();
    let mut found = Vec::new();

    for line in lines {
        let Some(entry) = parse_log_line(line) else {
            if !line.trim().is_empty() {
                debug!("Skipping unparsable log line: {}", line);
            }
            continue;
        };
        for text in hints.extract(&entry.message) {
            found.push(Hint {
                repo: repo.to_string(),
                commit: entry.hash.clone(),
                text,
            });
        }
        commits.push(entry);
    }

    RepoHistory {
        repo: repo.to_string(),
        range: range.clone(),
        commits,
        hints: found,
    }
}

/// List the commits of an upload. Repositories without a range are skipped,
/// and a failing `git log` only warns: history is informational.
pub async fn collect_history<C>(
    channel: &C,
    repo: &Repo,
    range: Option<&DeploymentRange>,
    hints: &HintExtractor,
) -> Result<Option<RepoHistory>>
where
    C: CommandChannel + ?Sized,
{
    let Some(range) = range else {
        info!("No deployment range for {}, skipping commit history", repo.name);
        return Ok(None);
    };

    let output = channel
        .run(&in_repo(repo, &git_log_range(&range.pre, &range.post)))
        .await?;
    if !output.success() {
        warn!(
            "Could not list commits {}..{} for {} (exit {}): {}",
            range.pre,
            range.post,
            repo.name,
            output.status,
            output.text()
        );
        return Ok(None);
    }

    let history = build_history(&repo.name, range, &output.lines, hints);
    info!("🟢 Updated changes made by these commits in {}:", repo.name);
    for commit in &history.commits {
        info!("  - [{}] {} ({})", repo.name, commit.message, commit.hash);
    }
    Ok(Some(history))
}
