//! Orchestration tests driven by a scripted process runner.
//!
//! No real children are spawned; each test queues the terminal results the
//! runner should hand back and then inspects which invocations were made.

use std::path::Path;

use verifier::core::registry::{ClassifierKind, ClassifierRegistry};
use verifier::core::run_context::{NestedExecution, RunContext};
use verifier::io::config::VerifierConfig;
use verifier::test_support::{ScriptedRunner, exited, exited_with_stderr};
use verifier::verify::Verifier;
use verifier::verify::pipeline::Stage;
use verifier::verify::resolution::ResolutionCheck;
use verifier::verify::suite::SingleTestOutcome;

/// The full suite is invoked for exactly one of the four upstream
/// combinations.
#[tokio::test]
async fn gate_law_holds_for_every_combination() {
    for success in [true, false] {
        for has_memory_error in [true, false] {
            let verifier = Verifier::new(
                ScriptedRunner::new(vec![exited(0, "ok")]),
                VerifierConfig::default(),
            );
            let upstream = SingleTestOutcome {
                success,
                has_memory_error,
                output: String::new(),
                exit_code: Some(0),
            };
            let outcome = verifier.run_full_suite(&upstream).await;
            let expected_calls = usize::from(success && !has_memory_error);
            assert_eq!(
                verifier.runner().call_count(),
                expected_calls,
                "success={success} hasMemoryError={has_memory_error}"
            );
            assert_eq!(outcome.completed, expected_calls == 1);
        }
    }
}

#[tokio::test]
async fn pipeline_aggregates_every_stage() {
    let config = VerifierConfig {
        script_runner: "pnpm".to_string(),
        ..VerifierConfig::default()
    };
    let verifier = Verifier::new(
        ScriptedRunner::new(vec![
            exited(0, "Usage: app [options]\nOptions:\n  -h\n"),
            exited_with_stderr(
                2,
                "",
                "src/x.ts(1,1): error TS2307: Cannot find module 'zod' or its corresponding type declarations.\n",
            ),
        ]),
        config,
    )
    .with_cwd("/work");
    let stages = vec![
        Stage::CliHelp {
            script: "cli".to_string(),
            flags: vec!["--help".to_string()],
        },
        Stage::Typecheck,
        Stage::Resolution {
            checks: vec![ResolutionCheck {
                name: "rejections".to_string(),
                label: "unhandled promise rejections".to_string(),
                upstream_resolved: true,
                output: "(node:1) UnhandledPromiseRejectionWarning: nope".to_string(),
                exit_code: Some(0),
                classifier: ClassifierKind::PromiseRejection,
            }],
        },
    ];

    let report = verifier
        .run_pipeline(&stages, &ClassifierRegistry::with_defaults())
        .await
        .expect("pipeline");

    let requests = verifier.runner().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].display(), "pnpm run cli -- --help");
    assert_eq!(requests[1].display(), "npx tsc --noEmit --pretty false");
    assert!(
        requests
            .iter()
            .all(|r| r.cwd.as_deref() == Some(Path::new("/work")))
    );

    assert!(!report.status.all_resolved);
    assert_eq!(
        report.status.remaining_issues,
        vec![
            "typecheck: type errors",
            "resolution: issues remain",
        ]
    );
    assert_eq!(
        report.status.error_details["resolution"],
        vec!["rejections: unhandled promise rejections"]
    );
}

#[tokio::test]
async fn nested_pipeline_requires_bugfix_capability() {
    let running = RunContext::root().enter().expect("enter");

    let refused = Verifier::new(ScriptedRunner::default(), VerifierConfig::default())
        .with_context(running);
    let err = refused
        .run_pipeline(&[Stage::Typecheck], &ClassifierRegistry::new())
        .await
        .unwrap_err();
    assert_eq!(err, NestedExecution);
    assert_eq!(refused.runner().call_count(), 0);

    let allowed = Verifier::new(
        ScriptedRunner::new(vec![exited(0, "")]),
        VerifierConfig::default(),
    )
    .with_context(running.allow_bugfix_recursion());
    let report = allowed
        .run_pipeline(&[Stage::Typecheck], &ClassifierRegistry::new())
        .await
        .expect("bug-fix recursion allowed");
    assert!(report.status.all_resolved);
}
