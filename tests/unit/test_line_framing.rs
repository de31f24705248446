//! Unit Tests for Output Framing and Correlation
//!
//! Chunks go through the framer and the correlator the same way the
//! session's output pump feeds them.

use stup::shell::{
    CommandMarker, Correlator, FramingMode, LineFramer, OutputChunk, Response, ResponseMode,
    ResponsePattern,
};
use stup::Error;

fn feed_all(framer: &mut LineFramer, correlator: &mut Correlator, chunks: &[OutputChunk]) {
    for chunk in chunks {
        for line in framer.push(chunk) {
            correlator.feed(&line);
        }
    }
}

#[test]
fn test_marker_split_across_chunks() {
    let marker = CommandMarker::with_id("t1");
    let mut framer = LineFramer::new(FramingMode::Lines, 1024);
    let mut correlator = Correlator::new();
    let mut registration = correlator
        .register(marker.end_pattern(), ResponseMode::Collect)
        .unwrap();

    feed_all(
        &mut framer,
        &mut correlator,
        &[
            OutputChunk::stdout("__STUP_BEG"),
            OutputChunk::stdout("IN_t1__\nhel"),
            OutputChunk::stdout("lo\n__STUP_END_t1"),
            OutputChunk::stdout("__ 0\n"),
        ],
    );

    let response = registration.receiver.try_recv().unwrap().unwrap();
    let output = marker.parse("echo hello", response.into_lines()).unwrap();
    assert_eq!(output.lines, vec!["hello"]);
    assert_eq!(output.status, 0);
    assert!(!correlator.has_pending());
}

#[test]
fn test_output_before_begin_is_stale() {
    let marker = CommandMarker::with_id("t2");
    let lines = vec![
        "left over from an earlier command".to_string(),
        "__STUP_BEGIN_t2__".to_string(),
        "fresh".to_string(),
        "__STUP_END_t2__ 1".to_string(),
    ];
    let output = marker.parse("false", lines).unwrap();
    assert_eq!(output.lines, vec!["fresh"]);
    assert_eq!(output.status, 1);
}

#[test]
fn test_missing_begin_is_malformed() {
    let marker = CommandMarker::with_id("t3");
    let err = marker
        .parse("true", vec!["__STUP_END_t3__ 0".to_string()])
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[test]
fn test_idle_lines_are_counted_not_kept() {
    let mut framer = LineFramer::new(FramingMode::Lines, 1024);
    let mut correlator = Correlator::new();

    feed_all(
        &mut framer,
        &mut correlator,
        &[OutputChunk::stdout("one\ntwo\n")],
    );
    assert_eq!(correlator.discarded(), 2);

    let mut registration = correlator
        .register(ResponsePattern::any(), ResponseMode::Single)
        .unwrap();
    feed_all(&mut framer, &mut correlator, &[OutputChunk::stderr("three\n")]);
    assert_eq!(
        registration.receiver.try_recv().unwrap().unwrap(),
        Response::Line("three".to_string())
    );
}

#[test]
fn test_stderr_and_stdout_partials_do_not_mix() {
    let mut framer = LineFramer::new(FramingMode::Lines, 1024);
    assert!(framer.push(&OutputChunk::stdout("ab")).is_empty());
    assert!(framer.push(&OutputChunk::stderr("xy")).is_empty());
    assert_eq!(framer.push(&OutputChunk::stdout("c\n")), vec!["abc"]);
    assert_eq!(framer.finish(), vec!["xy"]);
}

#[test]
fn test_overlong_line_is_cut() {
    let mut framer = LineFramer::new(FramingMode::Lines, 4);
    let lines = framer.push(&OutputChunk::stdout("abcdefghij\n"));
    assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
}

#[test]
fn test_closed_correlator_fails_pending_and_new_requests() {
    let mut correlator = Correlator::new();
    let mut registration = correlator
        .register(ResponsePattern::literal("never"), ResponseMode::Single)
        .unwrap();

    correlator.close();

    assert!(matches!(
        registration.receiver.try_recv().unwrap(),
        Err(Error::SessionClosed { .. })
    ));
    assert!(matches!(
        correlator.register(ResponsePattern::any(), ResponseMode::Single),
        Err(Error::SessionClosed { .. })
    ));
}
