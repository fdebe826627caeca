pub mod chat;
pub mod collections;
pub mod documents;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::{AdminState, UserState};

pub fn create_admin_router(state: AdminState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let body_limit = state.config.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::admin_readiness))
        .nest("/api/v1", admin_v1_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

pub fn create_user_router(state: UserState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::user_readiness))
        .nest("/api/v1", user_v1_routes())
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn admin_v1_routes() -> Router<AdminState> {
    Router::new()
        .route("/collections", get(collections::list_collections))
        .route("/collections/{name}/count", get(collections::count_vectors))
        .route("/collections/{name}/search", post(documents::search_documents))
        .route(
            "/collections/{name}/documents/{id}",
            delete(documents::delete_document),
        )
        .route("/documents", post(documents::upload_document))
}

fn user_v1_routes() -> Router<UserState> {
    Router::new()
        .route("/chat", post(chat::chat_handler))
        .route(
            "/chat/{id}",
            get(chat::get_conversation).delete(chat::clear_conversation),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::application::{
        ChatPrompts, ChatService, CollectionService, IngestionService, MemoryService,
        MemorySettings, RagService,
    };
    use crate::infrastructure::{
        AppConfig, InMemoryConversationStore, InMemoryObjectStore, InMemoryVectorStore,
    };
    use crate::test_support::{HashEmbedding, ScriptedLlm, StaticTextExtractor};

    const BOUNDARY: &str = "X-PDF-RAG-BOUNDARY";

    fn admin_app() -> Router {
        admin_app_with_default_bucket("docs")
    }

    fn admin_app_with_default_bucket(bucket: &str) -> Router {
        let vectors = Arc::new(InMemoryVectorStore::new());
        let rag = Arc::new(RagService::new(
            Arc::new(HashEmbedding::new()),
            vectors.clone(),
            7,
        ));
        let collections = Arc::new(CollectionService::new(vectors, Duration::from_secs(600)));
        let ingestion = IngestionService::new(
            Arc::new(InMemoryObjectStore::new().with_bucket("docs")),
            Arc::new(StaticTextExtractor::new(
                "Gradient descent minimizes the loss function.",
            )),
            rag.clone(),
        )
        .with_default_bucket(Some(bucket.into()))
        .with_collection_cache(collections.clone());

        create_admin_router(AdminState::new(
            Arc::new(ingestion),
            collections,
            rag,
            Arc::new(AppConfig::default()),
        ))
    }

    fn user_app() -> Router {
        let llm = Arc::new(ScriptedLlm::new().with_reply("It minimizes loss."));
        let rag = Arc::new(RagService::new(
            Arc::new(HashEmbedding::new()),
            Arc::new(InMemoryVectorStore::new()),
            7,
        ));
        let memory = Arc::new(MemoryService::new(
            Arc::new(InMemoryConversationStore::new()),
            llm.clone(),
            MemorySettings::default(),
        ));
        let chat = ChatService::new(rag.clone(), memory.clone(), llm, ChatPrompts::default())
            .with_default_collection(Some("kb".into()));

        create_user_router(UserState::new(
            Arc::new(chat),
            memory,
            rag,
            Arc::new(AppConfig::default()),
        ))
    }

    fn multipart(fields: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, file_name, value) in fields {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = admin_app()
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_admin_ready_checks_bucket() {
        let response = admin_app()
            .oneshot(empty_request("GET", "/ready"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["qdrant"], "connected");
        assert_eq!(body["s3"], "connected");

        let response = admin_app_with_default_bucket("archive")
            .oneshot(empty_request("GET", "/ready"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = read_json(response).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["s3"], "missing_bucket");
    }

    #[tokio::test]
    async fn test_upload_then_list_count_and_search() {
        let app = admin_app();

        let response = app
            .clone()
            .oneshot(multipart(&[
                ("file", Some("gd.pdf"), b"%PDF-1.7 body".as_slice()),
                ("existing_collection", None, b"ignored".as_slice()),
                ("collection", None, b"optim".as_slice()),
                ("overwrite", None, b"false".as_slice()),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = read_json(response).await;
        assert_eq!(report["collection"], "optim");
        assert_eq!(report["action"], "created");
        assert_eq!(report["vectors_stored"], 1);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/v1/collections"))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["collections"], json!(["optim"]));

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/v1/collections/optim/count"))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["count"], 1);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/collections/optim/search",
                json!({ "query": "gradient descent", "limit": 1 }),
            ))
            .await
            .unwrap();
        let hits = read_json(response).await;
        assert_eq!(hits[0]["file_name"], "gd.pdf");
    }

    #[tokio::test]
    async fn test_upload_rejects_renamed_non_pdf() {
        let response = admin_app()
            .oneshot(multipart(&[
                ("file", Some("slides.pdf"), b"PK\x03\x04".as_slice()),
                ("collection", None, b"optim".as_slice()),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await["error"],
            "Uploaded file is not a valid PDF"
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let response = admin_app()
            .oneshot(multipart(&[
                ("file", Some("notes.txt"), b"plain".as_slice()),
                ("collection", None, b"optim".as_slice()),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await["error"],
            "Only PDF files are accepted."
        );
    }

    #[tokio::test]
    async fn test_count_of_missing_collection_is_not_found() {
        let response = admin_app()
            .oneshot(empty_request("GET", "/api/v1/collections/nope/count"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_user_ready() {
        let response = user_app()
            .oneshot(empty_request("GET", "/ready"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["conversations"], "connected");
    }

    #[tokio::test]
    async fn test_blank_chat_message() {
        let response = user_app()
            .oneshot(json_request("POST", "/api/v1/chat", json!({ "message": "  " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await["answer"],
            "Please enter a valid question."
        );
    }

    #[tokio::test]
    async fn test_chat_history_and_clear() {
        let app = user_app();

        // "kb" does not exist in the store, so retrieval fails and the
        // fallback answer is returned
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/chat",
                json!({ "message": "What is gradient descent?" }),
            ))
            .await
            .unwrap();
        let reply = read_json(response).await;
        assert_eq!(reply["fallback"], true);
        let id = reply["conversation_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/v1/chat/{id}")))
            .await
            .unwrap();
        let conversation = read_json(response).await;
        assert_eq!(conversation["message_count"], 1);
        assert_eq!(conversation["transcript"].as_array().unwrap().len(), 2);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/v1/chat/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(read_json(response).await["transcript"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let response = user_app()
            .oneshot(empty_request(
                "GET",
                &format!("/api/v1/chat/{}", uuid::Uuid::new_v4()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
