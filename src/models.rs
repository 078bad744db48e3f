use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobRequest {
    #[serde(default)]
    pub label: Option<String>,
}

/// Point-in-time copy of a job record. Never aliases tracker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl JobNotice {
    pub fn for_status(status: &JobStatus) -> Option<Self> {
        match status.state {
            JobState::Completed => Some(Self {
                level: NoticeLevel::Success,
                message: "Report generation completed successfully!".to_string(),
            }),
            JobState::Failed => Some(Self {
                level: NoticeLevel::Danger,
                message: format!(
                    "Report generation failed: {}",
                    status.error.as_deref().unwrap_or("unknown error")
                ),
            }),
            JobState::Pending | JobState::Running => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    #[serde(flatten)]
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<JobNotice>,
}

impl From<JobStatus> for JobStatusResponse {
    fn from(status: JobStatus) -> Self {
        let notice = JobNotice::for_status(&status);
        Self { status, notice }
    }
}

/// Mutable record owned by the tracker. Every transition goes through the
/// methods below so the state machine only ever moves forward.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub label: Option<String>,
    pub state: JobState,
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn running(job_id: String, label: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            label,
            state: JobState::Running,
            progress: 0,
            result: None,
            error: None,
            started_at,
            completed_at: None,
        }
    }

    /// Raises progress while running. Caps at 99: only completion reaches 100.
    pub fn advance(&mut self, progress: u8) -> bool {
        if self.state != JobState::Running {
            return false;
        }
        let next = progress.min(99);
        if next > self.progress {
            self.progress = next;
        }
        true
    }

    pub fn complete(&mut self, result: String, at: DateTime<Utc>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Completed;
        self.progress = 100;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(at);
        true
    }

    pub fn fail(&mut self, error: String, at: DateTime<Utc>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Failed;
        self.result = None;
        self.error = Some(error);
        self.completed_at = Some(at);
        true
    }

    pub fn to_status(&self) -> JobStatus {
        JobStatus {
            id: self.job_id.clone(),
            state: self.state,
            progress: self.progress,
            label: self.label.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
