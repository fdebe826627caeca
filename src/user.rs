use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pdf_rag::api::{create_user_router, UserState};
use pdf_rag::application::{ChatService, MemoryService, MemorySettings, RagService};
use pdf_rag::infrastructure::{
    aws, embedding, llm, logging, memory, AppConfig, QdrantVectorStore,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load().context("failed to load configuration")?;
    logging::init("user", &app_config.config.logging)?;
    let config = &app_config.config;

    let sdk_config = aws::load_sdk_config(&config.aws).await;
    let vector_store = Arc::new(
        QdrantVectorStore::connect(&config.qdrant)
            .await
            .context("Qdrant is unreachable")?,
    );
    info!(url = %config.qdrant.url, "connected to Qdrant");

    let embedding = embedding::build(&config.embedding, &sdk_config)?;
    let llm = llm::build(&config.llm, &sdk_config)?;
    let rag = Arc::new(RagService::new(embedding, vector_store, config.rag.top_k));

    let store = memory::build(&config.memory).context("failed to set up conversation store")?;
    let memory = Arc::new(MemoryService::new(
        store,
        llm.clone(),
        MemorySettings {
            history_window: config.memory.history_window,
            summarize_every: config.memory.summarize_every,
            prompts: app_config.prompts.summary.clone(),
        },
    ));

    if config.qdrant.collection.is_none() {
        tracing::warn!("QDRANT_COLLECTION not set, chat requests must name a collection");
    }
    let chat = ChatService::new(
        rag.clone(),
        memory.clone(),
        llm,
        app_config.prompts.chat.clone(),
    )
    .with_default_collection(config.qdrant.collection.clone())
    .with_llm_timeout(Duration::from_secs(config.llm.timeout_seconds));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.user_port);
    let state = UserState::new(Arc::new(chat), memory, rag, Arc::new(app_config.clone()));
    let app = create_user_router(state);

    info!("user API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
