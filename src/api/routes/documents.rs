use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, state::AdminState};
use crate::domain::{resolve_collection_name, DomainError, IngestReport, IngestRequest};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultResponse {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: usize,
    pub file_name: Option<String>,
    pub content: String,
    pub score: f32,
}

#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Vec<u8>,
    bucket: Option<String>,
    collection: Option<String>,
    existing_collection: Option<String>,
    overwrite: bool,
}

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::warn!(error = %e, "malformed upload");
    DomainError::validation(e.body_text()).into()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
            }
            "bucket" => form.bucket = Some(field.text().await.map_err(multipart_error)?),
            "collection" => form.collection = Some(field.text().await.map_err(multipart_error)?),
            "existing_collection" => {
                form.existing_collection = Some(field.text().await.map_err(multipart_error)?)
            }
            "overwrite" => form.overwrite = is_truthy(&field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Multipart PDF upload that runs the whole ingestion pipeline.
pub async fn upload_document(
    State(state): State<AdminState>,
    multipart: Multipart,
) -> Result<Json<IngestReport>, ApiError> {
    let form = read_form(multipart).await?;

    let collection = resolve_collection_name(
        form.collection.as_deref(),
        form.existing_collection.as_deref(),
    );
    let mut request = IngestRequest::new(form.file_name.unwrap_or_default(), form.bytes, collection)
        .with_overwrite(form.overwrite);
    if let Some(bucket) = form.bucket {
        request = request.with_bucket(bucket);
    }

    let report = state.ingestion.ingest(request).await?;
    tracing::info!(
        collection = %report.collection,
        vectors = report.vectors_stored,
        "{} collection",
        report.action.verb()
    );
    Ok(Json(report))
}

pub async fn search_documents(
    State(state): State<AdminState>,
    Path(collection): Path<String>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResultResponse>>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(DomainError::validation("query must not be empty").into());
    }

    let results = match request.limit {
        Some(limit) => {
            state
                .rag
                .retrieve_top_k(&collection, &request.query, limit)
                .await?
        }
        None => state.rag.retrieve(&collection, &request.query).await?,
    };

    Ok(Json(
        results
            .into_iter()
            .map(|r| SearchResultResponse {
                chunk_id: r.chunk.id,
                document_id: r.chunk.document_id,
                chunk_index: r.chunk.chunk_index,
                file_name: r.chunk.metadata.file_name,
                content: r.chunk.content,
                score: r.score,
            })
            .collect(),
    ))
}

pub async fn delete_document(
    State(state): State<AdminState>,
    Path((collection, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.rag.delete_document(&collection, id).await?;
    state.collections.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}
