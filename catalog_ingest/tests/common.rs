// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Shared harness for integration tests: a fully wired service stack over a
//! temp blob directory and an in-memory SQLite database, plus fixture
//! builders for images, chunks, and checksums.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use tempfile::TempDir;

use catalog_ingest::application::services::{
    Assembler, AssemblyOutcome, AttachmentResolver, ChunkCoordinator, ChunkRequest, UploadProcessor,
};
use catalog_ingest::infrastructure::blob::FilesystemBlobStore;
use catalog_ingest::infrastructure::jobs::SqliteJobQueue;
use catalog_ingest::infrastructure::metrics::MetricsService;
use catalog_ingest::infrastructure::processing::ImageVariantService;
use catalog_ingest::infrastructure::repositories::schema::in_memory_pool;
use catalog_ingest::infrastructure::repositories::{
    SqliteImageRepository, SqliteProductRepository, SqliteUploadRepository,
};
use catalog_ingest::infrastructure::runtime::UploadLockRegistry;
use catalog_ingest::presentation::http::{build_router, AppState};
use catalog_ingest_domain::{
    BlobStore, ImageRepository, IngestError, JobHandler, JobQueue, ProductRepository, Sku, UploadId, UploadRepository,
    VariantTag,
};
use image::{DynamicImage, ImageFormat, RgbImage};

/// Fully wired service stack for driving end-to-end flows in-process.
pub struct TestHarness {
    pub blob_dir: TempDir,
    pub uploads: Arc<dyn UploadRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<dyn JobQueue>,
    pub coordinator: Arc<ChunkCoordinator>,
    pub assembler: Arc<Assembler>,
    pub resolver: Arc<AttachmentResolver>,
    pub processor: Arc<dyn JobHandler>,
    pub metrics: Arc<MetricsService>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_ready_wait(30).await
    }

    pub async fn with_ready_wait(ready_wait_s: u64) -> Self {
        let pool = in_memory_pool().await.unwrap();
        let blob_dir = TempDir::new().unwrap();

        let uploads: Arc<dyn UploadRepository> = Arc::new(SqliteUploadRepository::new(pool.clone()));
        let images: Arc<dyn ImageRepository> = Arc::new(SqliteImageRepository::new(pool.clone()));
        let products: Arc<dyn ProductRepository> = Arc::new(SqliteProductRepository::new(pool.clone()));
        let blobs: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(blob_dir.path()));
        let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(pool));
        let locks = Arc::new(UploadLockRegistry::new());
        let metrics = Arc::new(MetricsService::new().unwrap());
        let codec = Arc::new(ImageVariantService::new(90));

        let coordinator = Arc::new(ChunkCoordinator::new(uploads.clone(), blobs.clone(), metrics.clone()));
        let assembler = Arc::new(Assembler::new(
            uploads.clone(),
            blobs.clone(),
            queue.clone(),
            locks.clone(),
            metrics.clone(),
        ));
        let processor: Arc<dyn JobHandler> = Arc::new(UploadProcessor::new(
            uploads.clone(),
            images.clone(),
            blobs.clone(),
            codec,
            vec![VariantTag::Sized(256), VariantTag::Sized(512), VariantTag::Sized(1024)],
            metrics.clone(),
        ));
        let resolver = Arc::new(AttachmentResolver::new(
            uploads.clone(),
            images.clone(),
            products.clone(),
            blobs.clone(),
            queue.clone(),
            locks,
            metrics.clone(),
            ready_wait_s,
        ));

        Self {
            blob_dir,
            uploads,
            images,
            products,
            blobs,
            queue,
            coordinator,
            assembler,
            resolver,
            processor,
            metrics,
        }
    }

    /// Submits one chunk through the coordinator.
    pub async fn send_chunk(
        &self,
        upload_id: UploadId,
        index: u32,
        total: u32,
        bytes: &[u8],
    ) -> Result<u32, IngestError> {
        self.coordinator
            .receive_chunk(ChunkRequest {
                upload_id: upload_id.to_string(),
                chunk_index: index,
                total_chunks: total,
                chunk_checksum: md5_hex(bytes),
                chunk: bytes.to_vec(),
                file_name: Some("photo.png".to_string()),
                file_size: None,
                mime_type: Some("image/png".to_string()),
            })
            .await
    }

    /// Completes an upload with the checksum of `whole`.
    pub async fn complete(&self, upload_id: UploadId, whole: &[u8]) -> Result<AssemblyOutcome, IngestError> {
        self.assembler
            .complete_upload(&upload_id.to_string(), &md5_hex(whole))
            .await
    }

    /// Drains the queue synchronously, running the processor for each job
    /// the way a worker would (without timeouts). Returns how many jobs ran.
    pub async fn process_pending_jobs(&self) -> usize {
        let mut processed = 0;
        while let Some(job) = self.queue.claim_next().await.unwrap() {
            match self.processor.handle(&job).await {
                Ok(()) => self.queue.mark_done(job.id).await.unwrap(),
                Err(e) => {
                    self.queue.mark_failed_or_retry(job.id, &e.to_string(), 3).await.unwrap();
                }
            }
            processed += 1;
        }
        processed
    }

    /// Seeds a catalog product.
    pub async fn seed_product(&self, sku: &str, name: &str) -> i64 {
        self.products.create(&Sku::parse(sku).unwrap(), name).await.unwrap().id()
    }

    /// Uploads `bytes` in `chunk_count` chunks (submission order given by
    /// `order` as indices into the chunk list) and completes the upload.
    pub async fn upload_and_complete(&self, bytes: &[u8], chunk_count: usize, order: &[usize]) -> UploadId {
        let upload_id = UploadId::generate();
        let chunks = split_chunks(bytes, chunk_count);
        for &position in order {
            self.send_chunk(upload_id, position as u32, chunks.len() as u32, &chunks[position])
                .await
                .unwrap();
        }
        self.complete(upload_id, bytes).await.unwrap();
        upload_id
    }

    /// Builds the HTTP router over this harness's services.
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            coordinator: self.coordinator.clone(),
            assembler: self.assembler.clone(),
            resolver: self.resolver.clone(),
            uploads: self.uploads.clone(),
            images: self.images.clone(),
            metrics: self.metrics.clone(),
        })
    }
}

/// Lowercase hex MD5 of data.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Encodes a solid-color PNG of the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([90, 120, 180]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Splits bytes into `count` contiguous chunks (last takes the remainder).
pub fn split_chunks(bytes: &[u8], count: usize) -> Vec<Vec<u8>> {
    assert!(count > 0);
    let size = bytes.len().div_ceil(count).max(1);
    let mut chunks: Vec<Vec<u8>> = bytes.chunks(size).map(<[u8]>::to_vec).collect();
    while chunks.len() < count {
        chunks.push(Vec::new());
    }
    chunks
}
