use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::{AdminState, UserState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub qdrant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversations: Option<String>,
}

type Readiness = Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)>;

const CONNECTED: &str = "connected";

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

fn probe<E: std::fmt::Display>(name: &str, result: Result<impl Sized, E>) -> &'static str {
    match result {
        Ok(_) => CONNECTED,
        Err(e) => {
            tracing::warn!(dependency = name, error = %e, "readiness probe failed");
            "disconnected"
        }
    }
}

fn readiness(qdrant: &str, s3: Option<&str>, conversations: Option<&str>) -> Readiness {
    let healthy = [Some(qdrant), s3, conversations]
        .into_iter()
        .flatten()
        .all(|status| status == CONNECTED);
    let response = ReadinessResponse {
        status: if healthy { "ready" } else { "not_ready" }.into(),
        qdrant: qdrant.into(),
        s3: s3.map(Into::into),
        conversations: conversations.map(Into::into),
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

pub async fn admin_readiness(State(state): State<AdminState>) -> Readiness {
    let qdrant = probe("qdrant", state.rag.vector_store().list_collections().await);
    let s3 = match state.ingestion.default_bucket_exists().await {
        None => None,
        Some(Ok(true)) => Some(CONNECTED),
        Some(Ok(false)) => {
            tracing::warn!("configured S3 bucket does not exist");
            Some("missing_bucket")
        }
        Some(Err(e)) => Some(probe("s3", Err::<(), _>(e))),
    };
    readiness(qdrant, s3, None)
}

pub async fn user_readiness(State(state): State<UserState>) -> Readiness {
    let qdrant = probe("qdrant", state.rag.vector_store().list_collections().await);
    let conversations = probe("conversation_store", state.memory.ping().await);
    readiness(qdrant, None, Some(conversations))
}
