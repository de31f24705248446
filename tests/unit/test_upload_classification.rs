//! Unit Tests for git-ftp Output Classification
//!
//! Real git-ftp output lines and what the upload step makes of them.

use stup::deploy::{
    classify_upload_line, parse_deployment_range, parse_file_count, DeploymentRange, UploadClass,
};

#[test]
fn test_up_to_date_line() {
    assert_eq!(
        classify_upload_line("Everything up-to-date."),
        UploadClass::UpToDate
    );
}

#[test]
fn test_missing_remote_state() {
    let line = "fatal: Could not get last commit. Network down? Wrong URL? The resource does not exist";
    assert_eq!(classify_upload_line(line), UploadClass::NeedsInit);
}

#[test]
fn test_fatal_lines() {
    for line in [
        "fatal: Remote locked, exiting...",
        "fatal: Not a git repository (or any of the parent directories): .git",
        "git-ftp: fatal error while connecting",
    ] {
        assert_eq!(classify_upload_line(line), UploadClass::Fatal, "{}", line);
    }
}

#[test]
fn test_anything_else_is_success() {
    for line in ["3 files to sync:", "", "Uploading ...", "FATAL in caps is not matched"] {
        assert_eq!(classify_upload_line(line), UploadClass::Success, "{}", line);
    }
}

#[test]
fn test_up_to_date_wins_over_everything() {
    let line = "fatal: Everything up-to-date although The resource does not exist";
    assert_eq!(classify_upload_line(line), UploadClass::UpToDate);
}

#[test]
fn test_range_from_git_ftp_summary() {
    assert_eq!(
        parse_deployment_range("Last deployment changed from abc123 to def456."),
        Some(DeploymentRange {
            pre: "abc123".to_string(),
            post: "def456".to_string(),
        })
    );
    assert_eq!(
        parse_deployment_range("Last deployment changed from 4a1f9e2c0d to 9b7c3e1f22"),
        Some(DeploymentRange {
            pre: "4a1f9e2c0d".to_string(),
            post: "9b7c3e1f22".to_string(),
        })
    );
}

#[test]
fn test_range_needs_both_hashes() {
    assert_eq!(parse_deployment_range("Last deployment changed from abc123"), None);
    assert_eq!(parse_deployment_range("Last deployment changed from abc123 onto def456"), None);
    assert_eq!(parse_deployment_range("Last deployment changed from abc123 to ."), None);
    assert_eq!(parse_deployment_range("3 files to sync:"), None);
}

#[test]
fn test_file_count() {
    assert_eq!(parse_file_count("3 files to sync:"), Some(3));
    assert_eq!(parse_file_count("  120 files to sync:"), Some(120));
    assert_eq!(parse_file_count("Everything up-to-date."), None);
    assert_eq!(parse_file_count(""), None);
}
