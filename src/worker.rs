use std::{any::Any, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::time;
use tracing::{debug, error, info};

use crate::{tracker::JobTracker, work::JobContext};

/// Spawns the progress routine for one job. The routine itself runs in an
/// inner task so a panic in the work surfaces as a `JoinError` here and is
/// recorded as a failure instead of tearing anything else down.
pub fn spawn_progress_routine(tracker: Arc<JobTracker>, job: JobContext) {
    tokio::spawn(async move {
        let job_id = job.job_id.clone();
        let outcome = tokio::spawn(run_progress(Arc::clone(&tracker), job)).await;

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => format!("{err:#}"),
            Err(err) if err.is_panic() => panic_message(err.into_panic()),
            Err(err) => err.to_string(),
        };

        error!(job_id = %job_id, "Report job failed: {failure}");
        if tracker.record_failure(&job_id, failure).is_none() {
            debug!(job_id = %job_id, "Failed job was already evicted");
        }
    });
}

async fn run_progress(tracker: Arc<JobTracker>, job: JobContext) -> Result<()> {
    let step_interval = tracker.config().step_interval;
    let increment = tracker.config().progress_increment();
    let work = tracker.work();

    for step in 1..=job.step_count {
        time::sleep(step_interval).await;
        work.step(&job, step)?;

        // The last increment lands together with completion below.
        if step == job.step_count {
            break;
        }

        let progress = (step * u32::from(increment)).min(99) as u8;
        match tracker.record_progress(&job.job_id, progress) {
            Some(_) => debug!(job_id = %job.job_id, progress, "Report job progress"),
            None => {
                debug!(job_id = %job.job_id, "Job evicted mid-run; stopping");
                return Ok(());
            }
        }
    }

    let result = work.finish(&job)?;
    match tracker.record_completion(&job.job_id, result) {
        Some(true) => info!(job_id = %job.job_id, "Report job completed"),
        Some(false) => debug!(job_id = %job.job_id, "Job already terminal; completion ignored"),
        None => debug!(job_id = %job.job_id, "Job evicted before completion"),
    }
    Ok(())
}

pub fn spawn_cleanup_worker(tracker: Arc<JobTracker>, every: Duration, max_age: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        loop {
            interval.tick().await;
            let removed = tracker.cleanup(max_age);
            debug!(removed, "Cleanup sweep finished");
        }
    });
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Report job panicked".to_string()
    }
}
