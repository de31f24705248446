//! Property-based tests for upload classification and range extraction

use proptest::prelude::*;
use stup::deploy::{classify_upload_line, parse_deployment_range, UploadClass};

proptest! {
    #[test]
    fn test_classification_is_total(line in "\\PC{0,200}") {
        let class = classify_upload_line(&line);
        let expected = if line.contains("Everything up-to-date") {
            UploadClass::UpToDate
        } else if line.contains("The resource does not exist") {
            UploadClass::NeedsInit
        } else if line.contains("fatal") {
            UploadClass::Fatal
        } else {
            UploadClass::Success
        };
        prop_assert_eq!(class, expected);
    }

    #[test]
    fn test_up_to_date_dominates(prefix in "[a-z :]{0,30}", suffix in "[a-z :]{0,30}") {
        let line = format!("{}fatal The resource does not exist Everything up-to-date{}", prefix, suffix);
        prop_assert_eq!(classify_upload_line(&line), UploadClass::UpToDate);
    }

    #[test]
    fn test_not_initialized_dominates_fatal(prefix in "[a-z :]{0,30}") {
        let line = format!("{}fatal: The resource does not exist", prefix);
        prop_assert_eq!(classify_upload_line(&line), UploadClass::NeedsInit);
    }

    #[test]
    fn test_range_extraction(
        pre in "[0-9a-f]{4,40}",
        post in "[0-9a-f]{4,40}",
        lead in "[A-Za-z ]{0,30}",
        punct in "[.!]?",
    ) {
        let line = format!("{}changed from {} to {}{}", lead, pre, post, punct);
        let range = parse_deployment_range(&line).unwrap();
        prop_assert_eq!(range.pre, pre);
        prop_assert_eq!(range.post, post);
    }

    #[test]
    fn test_no_phrase_no_range(line in "[A-Za-z0-9 .]{0,80}") {
        prop_assume!(!line.contains("changed from"));
        prop_assert!(parse_deployment_range(&line).is_none());
    }
}
