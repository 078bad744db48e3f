use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::TrackerConfig,
    error::TrackerError,
    models::{JobRecord, JobState, JobStatus},
    work::{JobContext, JobWork, SimulatedReport},
    worker::spawn_progress_routine,
};

const JOB_ID_LEN: usize = 8;

/// Owns every job record. Readers get snapshots; only progress routines
/// mutate records, and only through the `record_*` methods.
///
/// The map lock is a plain `std` lock: no critical section spans an await.
pub struct JobTracker {
    config: TrackerConfig,
    work: Arc<dyn JobWork>,
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobTracker {
    pub fn new(config: TrackerConfig, work: Arc<dyn JobWork>) -> Self {
        Self {
            config,
            work,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_simulated_work(config: TrackerConfig) -> Self {
        let work = SimulatedReport::new(config.fail_keyword.clone());
        Self::new(config, Arc::new(work))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub(crate) fn work(&self) -> Arc<dyn JobWork> {
        Arc::clone(&self.work)
    }

    /// Registers a running job and spawns its progress routine. Must be called
    /// from within a Tokio runtime.
    pub fn start(self: &Arc<Self>, label: Option<String>) -> Result<JobStatus, TrackerError> {
        let label = label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());

        let status = {
            let mut jobs = self.write();
            let limit = self.config.max_active_jobs;
            if limit > 0 {
                let active = count_active(&jobs);
                if active >= limit {
                    warn!(active, limit, "Rejecting job start: tracker at capacity");
                    return Err(TrackerError::AtCapacity { limit });
                }
            }

            let job_id = loop {
                let candidate = new_job_id();
                if !jobs.contains_key(&candidate) {
                    break candidate;
                }
            };

            let record = JobRecord::running(job_id.clone(), label.clone(), Utc::now());
            let status = record.to_status();
            jobs.insert(job_id, record);
            status
        };

        info!(job_id = %status.id, label = ?status.label, "Report job started");

        spawn_progress_routine(
            Arc::clone(self),
            JobContext {
                job_id: status.id.clone(),
                label,
                step_count: self.config.step_count.clamp(1, 100),
            },
        );

        Ok(status)
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.read().get(job_id).map(JobRecord::to_status)
    }

    /// Evicts every record started at or before `now - max_age`, whatever its
    /// state. Returns how many were removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let Some(cutoff) = cutoff_for(Utc::now(), max_age) else {
            return 0;
        };

        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| job.started_at > cutoff);
        let removed = before - jobs.len();

        if removed > 0 {
            info!(removed, remaining = jobs.len(), "Evicted old report jobs");
        }
        removed
    }

    pub fn active_jobs(&self) -> usize {
        count_active(&self.read())
    }

    pub fn tracked_jobs(&self) -> usize {
        self.read().len()
    }

    /// `None` when the record is gone (evicted).
    pub(crate) fn record_progress(&self, job_id: &str, progress: u8) -> Option<bool> {
        self.write()
            .get_mut(job_id)
            .map(|job| job.advance(progress))
    }

    pub(crate) fn record_completion(&self, job_id: &str, result: String) -> Option<bool> {
        self.write()
            .get_mut(job_id)
            .map(|job| job.complete(result, Utc::now()))
    }

    pub(crate) fn record_failure(&self, job_id: &str, error: String) -> Option<bool> {
        self.write()
            .get_mut(job_id)
            .map(|job| job.fail(error, Utc::now()))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn count_active(jobs: &HashMap<String, JobRecord>) -> usize {
    jobs.values()
        .filter(|job| matches!(job.state, JobState::Pending | JobState::Running))
        .count()
}

fn new_job_id() -> String {
    Uuid::new_v4().simple().to_string()[..JOB_ID_LEN].to_string()
}

fn cutoff_for(now: DateTime<Utc>, max_age: Duration) -> Option<DateTime<Utc>> {
    let max_age = chrono::Duration::from_std(max_age).ok()?;
    now.checked_sub_signed(max_age)
}
