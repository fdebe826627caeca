use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pdf_rag::api::{create_admin_router, AdminState};
use pdf_rag::application::{CollectionService, IngestionService, RagService};
use pdf_rag::domain::RecursiveTextSplitter;
use pdf_rag::infrastructure::{
    aws, embedding, logging, AppConfig, PdfTextExtractor, QdrantVectorStore, S3ObjectStore,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load().context("failed to load configuration")?;
    logging::init("admin", &app_config.config.logging)?;
    let config = &app_config.config;

    let sdk_config = aws::load_sdk_config(&config.aws).await;
    let vector_store = Arc::new(
        QdrantVectorStore::connect(&config.qdrant)
            .await
            .context("Qdrant is unreachable")?,
    );
    info!(url = %config.qdrant.url, "connected to Qdrant");

    let embedding = embedding::build(&config.embedding, &sdk_config)?;
    let rag = Arc::new(
        RagService::new(embedding, vector_store.clone(), config.rag.top_k)
            .with_batching(config.embedding.batch_size, config.embedding.retry.clone()),
    );
    let collections = Arc::new(CollectionService::new(
        vector_store,
        Duration::from_secs(config.qdrant.collections_cache_ttl_seconds),
    ));

    let splitter = RecursiveTextSplitter::new(
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    )?
    .with_separators(config.chunking.separators.clone());
    let ingestion = IngestionService::new(
        Arc::new(S3ObjectStore::new(&sdk_config)),
        Arc::new(PdfTextExtractor::new()),
        rag.clone(),
    )
    .with_splitter(splitter)
    .with_default_bucket(config.aws.s3_bucket.clone())
    .with_upload_prefix(config.aws.upload_prefix.clone())
    .with_upload_retry(config.aws.upload_retry.clone())
    .with_collection_cache(collections.clone());

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.admin_port);
    let state = AdminState::new(
        Arc::new(ingestion),
        collections,
        rag,
        Arc::new(app_config.clone()),
    );
    let app = create_admin_router(state);

    info!("admin API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
