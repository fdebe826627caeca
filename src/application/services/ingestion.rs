use std::sync::Arc;
use tracing::instrument;

use crate::application::{CollectionService, RagService};
use crate::domain::{
    has_pdf_signature, is_pdf_file_name,
    ports::{ObjectStore, TextExtractor},
    sanitize_text, Document, DomainError, IngestReport, IngestRequest, RecursiveTextSplitter,
};
use crate::retry::{self, RetryPolicy};

/// Upload → extract → chunk → embed → store, for one PDF at a time.
pub struct IngestionService {
    object_store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn TextExtractor>,
    rag: Arc<RagService>,
    splitter: RecursiveTextSplitter,
    default_bucket: Option<String>,
    upload_prefix: String,
    upload_retry: RetryPolicy,
    collections: Option<Arc<CollectionService>>,
}

impl IngestionService {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        rag: Arc<RagService>,
    ) -> Self {
        Self {
            object_store,
            extractor,
            rag,
            splitter: RecursiveTextSplitter::default(),
            default_bucket: None,
            upload_prefix: "uploads".to_string(),
            upload_retry: RetryPolicy::exponential(3),
            collections: None,
        }
    }

    pub fn with_splitter(mut self, splitter: RecursiveTextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_default_bucket(mut self, bucket: Option<String>) -> Self {
        self.default_bucket = bucket;
        self
    }

    pub fn with_upload_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.upload_prefix = prefix.into();
        self
    }

    pub fn with_upload_retry(mut self, policy: RetryPolicy) -> Self {
        self.upload_retry = policy;
        self
    }

    /// Invalidated after every successful ingestion.
    pub fn with_collection_cache(mut self, collections: Arc<CollectionService>) -> Self {
        self.collections = Some(collections);
        self
    }

    /// Checks the configured default bucket. `None` when there is none.
    pub async fn default_bucket_exists(&self) -> Option<Result<bool, DomainError>> {
        let bucket = self.default_bucket.as_deref()?;
        Some(self.object_store.bucket_exists(bucket).await)
    }

    fn validate(&self, request: &IngestRequest) -> Result<(String, String), DomainError> {
        if request.bytes.is_empty() || request.file_name.trim().is_empty() {
            tracing::warn!("upload attempt without file");
            return Err(DomainError::validation("Please upload a PDF file."));
        }
        if !is_pdf_file_name(&request.file_name) {
            tracing::warn!(file_name = %request.file_name, "file does not have a .pdf extension");
            return Err(DomainError::validation("Only PDF files are accepted."));
        }
        if !has_pdf_signature(&request.bytes) {
            tracing::warn!(file_name = %request.file_name, "file is missing the PDF header");
            return Err(DomainError::validation("Uploaded file is not a valid PDF"));
        }

        let bucket = request
            .bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .or_else(|| self.default_bucket.as_deref())
            .map(str::to_string)
            .ok_or_else(|| {
                tracing::warn!("no S3 bucket name provided");
                DomainError::validation("Please enter a valid S3 bucket name.")
            })?;

        let collection = request.collection.trim();
        if collection.is_empty() {
            tracing::warn!("no Qdrant collection name provided");
            return Err(DomainError::validation(
                "Please specify a Qdrant collection name.",
            ));
        }

        Ok((bucket, collection.to_string()))
    }

    #[instrument(skip(self, request), fields(file_name = %request.file_name, collection = %request.collection))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport, DomainError> {
        let (bucket, collection) = self.validate(&request)?;
        let IngestRequest {
            file_name,
            bytes,
            overwrite,
            ..
        } = request;

        let document = Document::new(&file_name, &bucket, &self.upload_prefix);
        tracing::info!(document_id = %document.id, original = %file_name, key = %document.object_key, "processing upload");

        retry::with_backoff(&self.upload_retry, "s3_upload", || {
            let bytes = bytes.clone();
            let document = &document;
            async move {
                self.object_store
                    .put(
                        &document.bucket,
                        &document.object_key,
                        bytes,
                        &document.content_type,
                    )
                    .await
            }
        })
        .await?;
        tracing::info!(bucket = %document.bucket, key = %document.object_key, "uploaded to S3");

        let raw_text = self.extractor.extract(&bytes).await?;
        let (text, sanitized) = sanitize_text(&raw_text);
        if sanitized {
            tracing::warn!("removed invalid characters from extracted text");
        }

        let chunks: Vec<_> = self
            .splitter
            .split_document(document.id, &text)
            .into_iter()
            .map(|chunk| chunk.with_file_name(file_name.clone()))
            .collect();
        if chunks.is_empty() {
            tracing::error!("text extraction returned 0 chunks");
            return Err(DomainError::unprocessable("No text extracted from the PDF."));
        }
        let chunks_extracted = chunks.len();
        tracing::info!(chunks = chunks_extracted, "extracted text chunks");

        let embedded = self.rag.embed_chunks(chunks).await?;
        if embedded.is_empty() {
            tracing::error!("embedding generation returned empty");
            return Err(DomainError::external("Failed to generate embeddings."));
        }
        let embeddings_generated = embedded.len();

        let dimension = embedded[0].1.dimension();
        let pairs: Vec<_> = embedded
            .into_iter()
            .filter(|(chunk, embedding)| {
                !chunk.content.trim().is_empty() && embedding.dimension() == dimension
            })
            .collect();
        let dropped = chunks_extracted - pairs.len();
        if dropped > 0 {
            tracing::warn!(dropped, "dropped invalid or mismatched chunks");
        }
        if pairs.is_empty() || dimension == 0 {
            return Err(DomainError::external("Failed to generate embeddings."));
        }

        let action = self
            .rag
            .prepare_collection(&collection, dimension, overwrite)
            .await?;
        let ids = self.rag.index(&collection, &pairs).await?;
        tracing::info!(
            action = action.verb(),
            stored = ids.len(),
            collection = %collection,
            "embeddings stored"
        );

        if let Some(collections) = &self.collections {
            collections.invalidate().await;
        }

        let total_vectors = match self.rag.count(&collection).await {
            Ok(total) => {
                tracing::info!(total, collection = %collection, "total vectors");
                Some(total)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch total vector count");
                None
            }
        };

        Ok(IngestReport {
            document_id: document.id,
            file_name,
            bucket: document.bucket,
            object_key: document.object_key,
            collection,
            action,
            chunks_extracted,
            embeddings_generated,
            vectors_stored: ids.len(),
            dropped,
            total_vectors,
        })
    }
}
