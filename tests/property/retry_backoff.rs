//! Backoff delays and attempt counts of the retry policy

use augur::chain::{with_retry, RetryPolicy};
use augur::error::ServiceError;
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[test]
fn test_delay_grows_geometrically() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0u64..5_000, 1u32..6, 0u32..8), |(initial_ms, factor, k)| {
            let policy = RetryPolicy::new(10, Duration::from_millis(initial_ms), factor);
            let expected = Duration::from_millis(initial_ms * u64::from(factor).pow(k));
            prop_assert_eq!(policy.delay_after(k), expected);
            Ok(())
        })
        .unwrap();
}

/// An operation failing its first `failures` calls succeeds iff the policy allows more
/// attempts than that, and the virtual time slept is the sum of the backoff delays.
#[test]
fn test_attempts_and_sleep_follow_policy() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(1u32..6, 0u32..8, 1u64..500, 1u32..4),
            |(max_attempts, failures, initial_ms, factor)| {
                let policy = RetryPolicy::new(max_attempts, Duration::from_millis(initial_ms), factor);
                let calls = AtomicU32::new(0);

                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .start_paused(true)
                    .build()
                    .unwrap();
                let (outcome, slept) = rt.block_on(async {
                    let started = tokio::time::Instant::now();
                    let outcome = with_retry(&policy, "property", || {
                        let call = calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            if call < failures {
                                Err(ServiceError::GenerationFailed("flaky".to_string()))
                            } else {
                                Ok(call)
                            }
                        }
                    })
                    .await;
                    (outcome, started.elapsed())
                });

                let made = calls.load(Ordering::SeqCst);
                prop_assert_eq!(made, (failures + 1).min(max_attempts));
                prop_assert_eq!(outcome.is_ok(), failures < max_attempts);

                let expected: Duration = (0..made - 1).map(|k| policy.delay_after(k)).sum();
                // timer wheel resolution is one millisecond per sleep
                prop_assert!(slept >= expected);
                prop_assert!(slept <= expected + Duration::from_millis(u64::from(made)));
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn test_auth_failures_are_never_retried() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1u32..10), |max_attempts| {
            let policy = RetryPolicy::new(max_attempts, Duration::from_millis(100), 2);
            let calls = AtomicU32::new(0);
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let outcome: Result<(), ServiceError> = rt.block_on(with_retry(&policy, "property", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::AuthFailed("bad key".to_string())) }
            }));

            prop_assert!(matches!(outcome, Err(ServiceError::AuthFailed(_))));
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            Ok(())
        })
        .unwrap();
}
