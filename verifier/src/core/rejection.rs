//! Leaked promise rejection markers in runtime output.

use crate::core::types::{PromiseRejectionVerdict, RejectionTag};

/// Fixed markers, each tested independently. The uncaught marker includes the
/// trailing colon so it does not also match the unhandled warning name.
const MARKERS: [(&str, RejectionTag); 3] = [
    (
        "PromiseRejectionHandledWarning",
        RejectionTag::HandledWarning,
    ),
    (
        "UnhandledPromiseRejectionWarning",
        RejectionTag::UnhandledWarning,
    ),
    ("UnhandledPromiseRejection:", RejectionTag::UncaughtRejection),
];

/// Return every rejection marker present in `output`.
pub fn classify_promise_rejections(output: &str) -> PromiseRejectionVerdict {
    let matched_tags = MARKERS
        .iter()
        .filter(|(marker, _)| output.contains(marker))
        .map(|(_, tag)| *tag)
        .collect();
    PromiseRejectionVerdict { matched_tags }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_output_matches_nothing() {
        assert!(classify_promise_rejections("all good").matched_tags.is_empty());
        assert!(classify_promise_rejections("").matched_tags.is_empty());
    }

    #[test]
    fn unhandled_warning_alone() {
        let verdict = classify_promise_rejections(
            "(node:1234) UnhandledPromiseRejectionWarning: Error: boom",
        );
        assert_eq!(
            verdict.matched_tags.into_iter().collect::<Vec<_>>(),
            vec![RejectionTag::UnhandledWarning]
        );
    }

    #[test]
    fn all_three_markers_co_occur() {
        let output = "\
(node:1) PromiseRejectionHandledWarning: Promise rejection was handled asynchronously
(node:1) UnhandledPromiseRejectionWarning: Error: late
[UnhandledPromiseRejection: This error originated either by throwing inside of an async function]";
        let verdict = classify_promise_rejections(output);
        assert_eq!(verdict.matched_tags.len(), 3);
    }

    #[test]
    fn uncaught_rejection_alone() {
        let verdict = classify_promise_rejections(
            "[UnhandledPromiseRejection: This error originated either by throwing",
        );
        assert_eq!(
            verdict.matched_tags.into_iter().collect::<Vec<_>>(),
            vec![RejectionTag::UncaughtRejection]
        );
    }
}
