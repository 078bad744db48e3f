use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{
    error::TrackerError,
    models::{JobStatusResponse, StartJobRequest},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub id: Option<String>,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "timestamp": Utc::now(),
        "activeJobs": state.tracker.active_jobs(),
        "trackedJobs": state.tracker.tracked_jobs(),
    }))
}

/// The body is optional: an empty POST starts an unlabeled job.
pub async fn start_job(State(state): State<AppState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartJobRequest::default()
    } else {
        match serde_json::from_slice::<StartJobRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                warn!("Rejecting start request with bad body: {err}");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": {
                            "code": "INVALID_START_REQUEST",
                            "message": format!("Request body must be JSON like {{\"label\": \"...\"}}: {err}")
                        }
                    })),
                )
                    .into_response();
            }
        }
    };

    match state.tracker.start(request.label) {
        Ok(status) => (StatusCode::ACCEPTED, Json(status)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn job_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<JobStatusResponse>, TrackerError> {
    let job_id = query
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(TrackerError::MissingJobId)?;
    lookup(&state, job_id)
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, TrackerError> {
    lookup(&state, job_id)
}

fn lookup(state: &AppState, job_id: String) -> Result<Json<JobStatusResponse>, TrackerError> {
    let status = state
        .tracker
        .status(&job_id)
        .ok_or(TrackerError::NotFound(job_id))?;
    Ok(Json(status.into()))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;
    use crate::{config::TrackerConfig, tracker::JobTracker};

    fn state(config: TrackerConfig) -> AppState {
        AppState {
            tracker: Arc::new(JobTracker::with_simulated_work(config)),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn status_query(id: Option<&str>) -> Query<StatusQuery> {
        Query(StatusQuery {
            id: id.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn start_then_poll_status() {
        let state = state(TrackerConfig::default());

        let response = start_job(State(state.clone()), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let started = body_json(response).await;
        assert_eq!(started["state"], "running");
        assert_eq!(started["progress"], 0);
        let id = started["id"].as_str().expect("id").to_string();

        let response = job_status(State(state.clone()), status_query(Some(id.as_str())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let polled = body_json(response).await;
        assert_eq!(polled["id"], id.as_str());
        assert_eq!(polled["state"], "running");
        assert!(polled.get("notice").is_none());

        let response = get_job(State(state), Path(id.clone())).await.into_response();
        assert_eq!(body_json(response).await["id"], id.as_str());
    }

    #[tokio::test]
    async fn start_accepts_label_and_rejects_garbage() {
        let state = state(TrackerConfig::default());

        let response = start_job(
            State(state.clone()),
            Bytes::from_static(br#"{"label": "Quarterly"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["label"], "Quarterly");

        let response = start_job(State(state), Bytes::from_static(b"{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["code"],
            "INVALID_START_REQUEST"
        );
    }

    #[tokio::test]
    async fn unknown_and_missing_ids() {
        let state = state(TrackerConfig::default());

        let response = job_status(State(state.clone()), status_query(Some("feedface")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "JOB_NOT_FOUND");

        for id in [None, Some("  ")] {
            let response = job_status(State(state.clone()), status_query(id))
                .await
                .into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"]["code"], "MISSING_JOB_ID");
        }
    }

    #[tokio::test]
    async fn capacity_maps_to_service_unavailable() {
        let state = state(TrackerConfig {
            max_active_jobs: 1,
            ..TrackerConfig::default()
        });
        start_job(State(state.clone()), Bytes::new()).await;

        let response = start_job(State(state), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"]["code"], "JOBS_AT_CAPACITY");
    }

    #[tokio::test]
    async fn terminal_status_carries_notice() {
        let state = state(TrackerConfig {
            step_interval: Duration::from_millis(2),
            fail_keyword: Some("boom".to_string()),
            ..TrackerConfig::default()
        });
        let ok = state.tracker.start(None).expect("start").id;
        let bad = state
            .tracker
            .start(Some("boom".to_string()))
            .expect("start")
            .id;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while [&ok, &bad].iter().any(|id| {
            !state
                .tracker
                .status(id)
                .is_some_and(|s| s.state.is_terminal())
        }) {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let done = body_json(
            get_job(State(state.clone()), Path(ok))
                .await
                .into_response(),
        )
        .await;
        assert_eq!(done["state"], "completed");
        assert_eq!(done["progress"], 100);
        assert_eq!(done["notice"]["level"], "success");

        let failed = body_json(get_job(State(state), Path(bad)).await.into_response()).await;
        assert_eq!(failed["state"], "failed");
        assert_eq!(failed["notice"]["level"], "danger");
        assert_eq!(
            failed["notice"]["message"],
            "Report generation failed: Simulated report failure"
        );
    }

    #[tokio::test]
    async fn healthz_counts_jobs() {
        let state = state(TrackerConfig::default());
        state.tracker.start(None).expect("start");

        let health = body_json(healthz(State(state)).await.into_response()).await;
        assert_eq!(health["ok"], true);
        assert_eq!(health["activeJobs"], 1);
        assert_eq!(health["trackedJobs"], 1);
    }
}
