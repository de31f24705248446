//! Unit Tests for Commit History and Hints

use stup::deploy::commands::{git_log_range, LOG_DELIMITER};
use stup::deploy::history::{build_history, parse_log_line};
use stup::deploy::{CommitEntry, DeploymentRange, HintExtractor};

fn range() -> DeploymentRange {
    DeploymentRange {
        pre: "abc123".to_string(),
        post: "def456".to_string(),
    }
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|l| l.to_string()).collect()
}

#[test]
fn test_log_command_uses_delimiter() {
    let command = git_log_range("abc123", "def456");
    assert!(command.contains(LOG_DELIMITER));
    assert!(command.ends_with("abc123..def456"));
}

#[test]
fn test_subject_may_contain_delimiter() {
    assert_eq!(
        parse_log_line("Explain the <|stup|> delimiter<|stup|>a1b2c3d"),
        Some(CommitEntry {
            message: "Explain the <|stup|> delimiter".to_string(),
            hash: "a1b2c3d".to_string(),
        })
    );
}

#[test]
fn test_lines_without_hash_are_skipped() {
    assert_eq!(parse_log_line("plain text"), None);
    assert_eq!(parse_log_line("Subject<|stup|>   "), None);
}

#[test]
fn test_history_collects_hints_in_commit_order() {
    let hints = HintExtractor::new("stup").unwrap();
    let history = build_history(
        "stubegru",
        &range(),
        &lines(&[
            "Add survey module [stup|run migration 12] [stup|clear cache]<|stup|>def456",
            "",
            "warning: something unrelated",
            "Fix typo<|stup|>bcd234",
            "Mention [other|ignored] hint<|stup|>abc999",
        ]),
        &hints,
    );

    assert_eq!(history.repo, "stubegru");
    assert_eq!(history.range, range());
    assert_eq!(history.commits.len(), 3);
    let texts: Vec<&str> = history.hints.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, vec!["run migration 12", "clear cache"]);
    assert!(history.hints.iter().all(|h| h.commit == "def456"));
}

#[test]
fn test_custom_hint_prefix() {
    let hints = HintExtractor::new("deploy.note").unwrap();
    assert_eq!(
        hints.extract("Release [deploy.note|restart workers] [deployXnote|nope]"),
        vec!["restart workers"]
    );
}

#[test]
fn test_empty_hint_is_ignored() {
    let hints = HintExtractor::new("stup").unwrap();
    assert!(hints.extract("Broken [stup| ] marker").is_empty());
    assert!(hints.extract("Nested [stup|a [b] c]").is_empty());
}
