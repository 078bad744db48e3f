use anyhow::Result;
use chrono::Utc;

/// What a progress routine knows about the job it is driving.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    pub label: Option<String>,
    pub step_count: u32,
}

/// The unit of work behind a job. `step` runs once per progress tick and
/// `finish` produces the result text. Any error (or panic) fails the job.
pub trait JobWork: Send + Sync + 'static {
    fn step(&self, job: &JobContext, step: u32) -> Result<()>;

    fn finish(&self, job: &JobContext) -> Result<String>;
}

/// Stand-in for report generation: every step succeeds unless the job's label
/// matches the configured failure keyword, in which case it fails half-way.
#[derive(Debug, Clone, Default)]
pub struct SimulatedReport {
    fail_keyword: Option<String>,
}

impl SimulatedReport {
    pub fn new(fail_keyword: Option<String>) -> Self {
        Self {
            fail_keyword: fail_keyword
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }

    fn should_fail(&self, job: &JobContext) -> bool {
        match (&self.fail_keyword, &job.label) {
            (Some(keyword), Some(label)) => label.trim().eq_ignore_ascii_case(keyword),
            _ => false,
        }
    }
}

impl JobWork for SimulatedReport {
    fn step(&self, job: &JobContext, step: u32) -> Result<()> {
        if self.should_fail(job) && step >= (job.step_count / 2).max(1) {
            anyhow::bail!("Simulated report failure");
        }
        Ok(())
    }

    fn finish(&self, _job: &JobContext) -> Result<String> {
        Ok(format!(
            "Report generated successfully at {}",
            Utc::now().format("%H:%M:%S")
        ))
    }
}
