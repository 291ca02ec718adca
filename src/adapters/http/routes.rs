use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::adapters::http::state::HttpState;
use crate::application::dto::{ProcessRequest, ProcessResponse, StopResponse};

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    check_process: Option<String>,
}

impl StatusQuery {
    fn check_process(&self) -> bool {
        self.check_process
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

/// `POST /process`. Siempre 200; el resultado va en `success`.
pub async fn process(
    State(st): State<HttpState>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("rejected /process body: {rejection}");
            return Json(ProcessResponse::rejected(
                format!("Invalid request body: {}", rejection.body_text()),
                None,
            ));
        }
    };

    let job = match request.into_job(&st.jobs.settings().default_output_dir) {
        Ok(job) => job,
        Err(e) => return Json(ProcessResponse::rejected(e.to_string(), None)),
    };

    match st.jobs.submit(job).await {
        Ok(admission) => Json(ProcessResponse::accepted(admission)),
        Err(e) => {
            info!("job rejected: {e}");
            Json(ProcessResponse::rejected(e.to_string(), Some(st.jobs.snapshot())))
        }
    }
}

/// `GET /status?check_process=true|false`.
pub async fn status(State(st): State<HttpState>, Query(query): Query<StatusQuery>) -> impl IntoResponse {
    Json(st.jobs.status(query.check_process()).await)
}

/// `POST /stop`.
pub async fn stop(State(st): State<HttpState>) -> impl IntoResponse {
    let response = match st.jobs.stop().await {
        Ok(status) => StopResponse {
            success: true,
            message: "Processing stopped".into(),
            status: Some(status),
        },
        Err(e) => StopResponse {
            success: false,
            message: e.to_string(),
            status: None,
        },
    };
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_process_accepts_true_and_one() {
        let q = |v: &str| StatusQuery { check_process: Some(v.to_string()) }.check_process();
        assert!(q("true"));
        assert!(q("True"));
        assert!(q("1"));
        assert!(!q("false"));
        assert!(!q("yes"));
        assert!(!StatusQuery::default().check_process());
    }
}
