use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, state::AdminState};

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub collection: String,
    pub count: u64,
}

pub async fn list_collections(
    State(state): State<AdminState>,
) -> Result<Json<CollectionsResponse>, ApiError> {
    let collections = state.collections.list().await?;
    Ok(Json(CollectionsResponse { collections }))
}

pub async fn count_vectors(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.collections.count(&name).await?;
    Ok(Json(CountResponse {
        collection: name.trim().to_string(),
        count,
    }))
}
