//! Integration tests for the scheduler manager

use backplane::scheduler::{
    JobOptions, SchedulerConfigBuilder, SchedulerError, SchedulerManager,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn scheduler() -> SchedulerManager {
    SchedulerManager::new(SchedulerConfigBuilder::new().build())
}

fn counting_task(
    counter: Arc<AtomicUsize>,
) -> impl Fn() -> futures::future::Ready<Result<(), String>> {
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(()))
    }
}

#[tokio::test]
async fn test_cron_job_fires_every_second() {
    let manager = scheduler();
    let fired = Arc::new(AtomicUsize::new(0));

    manager
        .add_job(
            "tick",
            "* * * * * *",
            JobOptions {
                start_now: true,
                ..JobOptions::default()
            },
            counting_task(fired.clone()),
        )
        .expect("Failed to register job");

    assert!(manager.is_job_running("tick"));

    sleep(Duration::from_millis(2200)).await;

    assert!(
        fired.load(Ordering::SeqCst) >= 2,
        "Should fire at least twice in 2.2s, fired {}",
        fired.load(Ordering::SeqCst)
    );

    let status = manager.job_status("tick").expect("Should know the job");
    assert!(status.execution_count >= 2);
    assert!(status.last_run.is_some(), "Should record the last success");
    assert!(status.next_fire_time.is_some(), "Should expose the next fire");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_slow_execution_never_overlaps_itself() {
    let manager = scheduler();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    let (in_flight_t, max_t, runs_t) = (in_flight.clone(), max_in_flight.clone(), runs.clone());
    manager
        .add_job(
            "slow",
            "* * * * * *",
            JobOptions {
                start_now: true,
                ..JobOptions::default()
            },
            move || {
                let in_flight = in_flight_t.clone();
                let max_seen = max_t.clone();
                let runs = runs_t.clone();
                async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(current, Ordering::SeqCst);
                    sleep(Duration::from_millis(1200)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .expect("Failed to register job");

    // The task outlasts its one-second schedule, so fires that pass while
    // it runs must be skipped rather than stacked.
    sleep(Duration::from_millis(4500)).await;
    manager.shutdown().await;

    assert!(
        runs.load(Ordering::SeqCst) >= 2,
        "Should complete at least two runs, got {}",
        runs.load(Ordering::SeqCst)
    );
    assert_eq!(
        max_in_flight.load(Ordering::SeqCst),
        1,
        "Should never run two executions of the same job at once"
    );
}

#[tokio::test]
async fn test_run_job_now_records_success() {
    let manager = scheduler();
    let fired = Arc::new(AtomicUsize::new(0));

    manager
        .add_job(
            "report",
            "0 0 * * *",
            JobOptions::default(),
            counting_task(fired.clone()),
        )
        .expect("Failed to register job");
    assert!(
        !manager.is_job_running("report"),
        "Should stay stopped without start_now"
    );

    manager
        .run_job_now("report")
        .await
        .expect("Manual trigger should succeed");

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    let status = manager.job_status("report").expect("Should know the job");
    assert_eq!(status.execution_count, 1);
    assert!(status.last_run.is_some());
    assert_eq!(status.last_error, None);
    assert!(!status.running, "Manual trigger should not start the schedule");
}

#[tokio::test(start_paused = true)]
async fn test_run_job_now_retries_until_success() {
    let manager = scheduler();
    let attempts = Arc::new(AtomicUsize::new(0));

    let attempts_t = attempts.clone();
    manager
        .add_job("flaky", "0 0 * * *", JobOptions::default(), move || {
            let attempts = attempts_t.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("connection refused".to_string())
                } else {
                    Ok(())
                }
            }
        })
        .expect("Failed to register job");

    manager
        .run_job_now("flaky")
        .await
        .expect("Should succeed on the third attempt");

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let status = manager.job_status("flaky").expect("Should know the job");
    assert_eq!(
        status.execution_count, 1,
        "Retried attempts should count as one execution"
    );
    assert_eq!(status.last_error, None, "Success should clear the error");
}

#[tokio::test(start_paused = true)]
async fn test_run_job_now_surfaces_exhausted_retries() {
    let manager = scheduler();

    manager
        .add_job(
            "doomed",
            "0 0 * * *",
            JobOptions {
                max_retries: 1,
                ..JobOptions::default()
            },
            || async { Err("disk full".to_string()) },
        )
        .expect("Failed to register job");

    let result = manager.run_job_now("doomed").await;
    match result {
        Err(SchedulerError::ExecutionFailed(message)) => {
            assert_eq!(message, "disk full");
        }
        other => panic!("Expected ExecutionFailed, got {:?}", other),
    }

    let status = manager.job_status("doomed").expect("Should know the job");
    assert_eq!(status.execution_count, 0, "Failures should not count");
    assert_eq!(status.last_error.as_deref(), Some("disk full"));
    assert!(status.last_fire_time.is_some(), "The attempt should be stamped");
}

#[tokio::test]
async fn test_run_job_now_rejects_unknown_name() {
    let manager = scheduler();

    match manager.run_job_now("ghost").await {
        Err(SchedulerError::JobNotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("Expected JobNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_cron_expression_rejected() {
    let manager = scheduler();

    let result = manager.add_job("bad", "not a cron", JobOptions::default(), || async {
        Ok(())
    });
    assert!(
        matches!(result, Err(SchedulerError::InvalidCronExpression(_))),
        "Should reject a malformed expression"
    );
    assert!(manager.job_status("bad").is_none(), "Should register nothing");
}

#[tokio::test]
async fn test_invalid_timezone_rejected() {
    let manager = scheduler();

    let result = manager.add_job(
        "tz",
        "0 0 * * *",
        JobOptions {
            timezone: Some("Mars/Olympus".to_string()),
            ..JobOptions::default()
        },
        || async { Ok(()) },
    );
    assert!(matches!(result, Err(SchedulerError::InvalidTimezone(_))));
}

#[tokio::test]
async fn test_start_stop_remove_lifecycle() {
    let manager = scheduler();

    manager
        .add_job("sync", "* * * * * *", JobOptions::default(), || async {
            Ok(())
        })
        .expect("Failed to register job");

    let status = manager.job_status("sync").expect("Should know the job");
    assert!(!status.running);
    assert_eq!(status.next_fire_time, None);

    assert!(manager.start_job("sync"), "Should start a registered job");
    assert!(manager.start_job("sync"), "Starting twice should be idempotent");
    assert!(manager.is_job_running("sync"));

    // Let the freshly spawned ticker compute its first fire time.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(
        manager
            .job_status("sync")
            .expect("Should know the job")
            .next_fire_time
            .is_some(),
        "A running job should expose its next fire time"
    );

    assert!(manager.stop_job("sync"));
    assert!(!manager.is_job_running("sync"));
    assert_eq!(
        manager
            .job_status("sync")
            .expect("Should know the job")
            .next_fire_time,
        None,
        "Stopping should clear the next fire time"
    );

    assert!(!manager.start_job("ghost"), "Unknown names should report false");
    assert!(!manager.stop_job("ghost"));

    assert!(manager.remove_job("sync"));
    assert!(manager.job_status("sync").is_none());
    assert!(!manager.remove_job("sync"), "Removing twice should report false");
}

#[tokio::test]
async fn test_restart_after_stop_keeps_reporting_running() {
    let manager = scheduler();

    manager
        .add_job("relay", "* * * * * *", JobOptions::default(), || async {
            Ok(())
        })
        .expect("Failed to register job");

    assert!(manager.start_job("relay"));
    assert!(manager.stop_job("relay"));
    assert!(manager.start_job("relay"));

    // Give the superseded ticker time to observe its stop signal and exit.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert!(
        manager.is_job_running("relay"),
        "A job restarted after a stop should report running"
    );
    let status = manager.job_status("relay").expect("Should know the job");
    assert!(status.running);
    assert!(
        status.next_fire_time.is_some(),
        "The restarted ticker should schedule the next fire"
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn test_replacing_a_job_resets_its_history() {
    let manager = scheduler();
    let fired = Arc::new(AtomicUsize::new(0));

    manager
        .add_job(
            "sync",
            "0 0 * * *",
            JobOptions::default(),
            counting_task(fired.clone()),
        )
        .expect("Failed to register job");
    manager
        .run_job_now("sync")
        .await
        .expect("Manual trigger should succeed");

    manager
        .add_job(
            "sync",
            "0 12 * * *",
            JobOptions::default(),
            counting_task(fired.clone()),
        )
        .expect("Failed to replace job");

    assert_eq!(manager.job_names().len(), 1, "Replacement should not duplicate");
    let status = manager.job_status("sync").expect("Should know the job");
    assert_eq!(status.pattern, "0 12 * * *");
    assert_eq!(status.execution_count, 0, "Replacement should reset history");
}

#[tokio::test]
async fn test_disabled_scheduler_registers_nothing() {
    let manager = SchedulerManager::new(SchedulerConfigBuilder::new().enabled(false).build());

    manager.initialize().await.expect("Failed to initialize");
    manager
        .add_job("tick", "* * * * * *", JobOptions::default(), || async {
            Ok(())
        })
        .expect("Disabled registration should be a no-op, not an error");

    assert!(manager.job_names().is_empty());
    assert!(matches!(
        manager.run_job_now("tick").await,
        Err(SchedulerError::JobNotFound(_))
    ));

    let metrics = manager.metrics();
    assert!(!metrics.enabled);
    assert_eq!(metrics.total_jobs, 0);
}

#[tokio::test]
async fn test_initialize_starts_defaults_and_shutdown_clears() {
    let manager = scheduler();
    manager.initialize().await.expect("Failed to initialize");

    assert_eq!(manager.job_names(), vec!["health_check".to_string()]);
    assert!(manager.is_job_running("health_check"));

    let metrics = manager.metrics();
    assert!(metrics.enabled);
    assert_eq!(metrics.total_jobs, 1);
    assert_eq!(metrics.running_jobs, 1);
    assert_eq!(metrics.jobs[0].name, "health_check");

    manager.shutdown().await;
    assert!(manager.job_names().is_empty(), "Shutdown should clear the registry");
}

#[tokio::test]
async fn test_statuses_and_metrics_sorted_by_name() {
    let manager = scheduler();
    for name in ["charlie", "alpha", "bravo"] {
        manager
            .add_job(name, "0 0 * * *", JobOptions::default(), || async { Ok(()) })
            .expect("Failed to register job");
    }

    let names: Vec<String> = manager
        .all_job_statuses()
        .into_iter()
        .map(|status| status.name)
        .collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);

    manager
        .run_job_now("bravo")
        .await
        .expect("Manual trigger should succeed");
    let metrics = manager.metrics();
    assert_eq!(metrics.total_jobs, 3);
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.jobs[1].name, "bravo");
    assert_eq!(metrics.jobs[1].executions, 1);
}
