//! Shell command builders
//!
//! Every command the pipeline sends is assembled here, with arguments
//! quoted for a POSIX shell.

use std::path::Path;

use crate::models::{Repo, SshConfig};

/// Separates subject and short hash in `git log` output
pub const LOG_DELIMITER: &str = "<|stup|>";

/// Escape a value for use inside single quotes
fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument, leaving plain words untouched
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote a path. A leading `~/` still expands to the home directory.
pub fn quote_path(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("\"$HOME\"/'{}'", escape_single_quote_content(rest)),
        None => format!("'{}'", escape_single_quote_content(path)),
    }
}

/// Run `command` inside the repository directory
pub fn in_repo(repo: &Repo, command: &str) -> String {
    in_dir(repo.path(), command)
}

pub fn in_dir(dir: &Path, command: &str) -> String {
    format!("cd {} && {}", quote_path(&dir.to_string_lossy()), command)
}

pub fn git_status() -> String {
    "git status --porcelain".to_string()
}

pub fn git_current_branch() -> String {
    "git rev-parse --abbrev-ref HEAD".to_string()
}

pub fn git_short_head() -> String {
    "git rev-parse --short HEAD".to_string()
}

pub fn start_agent() -> String {
    "eval \"$(ssh-agent -s)\"".to_string()
}

pub fn add_key(key: &str) -> String {
    format!("ssh-add {}", quote_path(key))
}

pub fn kill_agent() -> String {
    "ssh-agent -k".to_string()
}

/// Write `hash` to `file` without a trailing newline
pub fn write_version(file: &str, hash: &str) -> String {
    format!("printf '%s' {} > {}", quote_arg(hash), quote_path(file))
}

/// `git-ftp <action>` against the target's remote
pub fn git_ftp(action: &str, ssh: &SshConfig) -> String {
    format!(
        "git-ftp {} --user {} --key {} {}",
        action,
        quote_arg(&ssh.user),
        quote_path(&ssh.key),
        quote_arg(&ssh.url)
    )
}

/// Subjects and short hashes of the commits in `pre..post`
pub fn git_log_range(pre: &str, post: &str) -> String {
    format!(
        "git log --pretty=tformat:'%s{}%h' {}",
        LOG_DELIMITER,
        quote_arg(&format!("{}..{}", pre, post))
    )
}

pub fn delete_tag(tag: &str) -> String {
    format!("git tag -d {}", quote_arg(tag))
}

pub fn create_tag(tag: &str) -> String {
    format!("git tag {}", quote_arg(tag))
}
