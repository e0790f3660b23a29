// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Ingest Server Binary
//!
//! Composition root: parse arguments, load configuration, build the
//! infrastructure adapters and application services, then run the HTTP
//! server and the job worker pool until a shutdown signal drains both.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use catalog_ingest::application::services::{Assembler, AttachmentResolver, ChunkCoordinator, UploadProcessor};
use catalog_ingest::infrastructure::blob::FilesystemBlobStore;
use catalog_ingest::infrastructure::config::IngestConfig;
use catalog_ingest::infrastructure::jobs::{JobRunner, SqliteJobQueue};
use catalog_ingest::infrastructure::metrics::MetricsService;
use catalog_ingest::infrastructure::processing::ImageVariantService;
use catalog_ingest::infrastructure::repositories::schema;
use catalog_ingest::infrastructure::repositories::{
    SqliteImageRepository, SqliteProductRepository, SqliteUploadRepository,
};
use catalog_ingest::infrastructure::runtime::UploadLockRegistry;
use catalog_ingest::presentation::http::{build_router, serve, AppState};
use catalog_ingest_bootstrap::{
    install_signal_handlers, result_to_exit_code, BootstrapLogger, ConsoleLogger, ServerArgs, ShutdownCoordinator,
};
use catalog_ingest_domain::{BlobStore, ImageRepository, JobHandler, JobQueue, ProductRepository, UploadRepository};

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = run(args).await;
    if let Err(error) = &result {
        tracing::error!("fatal: {:#}", error);
    }
    result_to_exit_code(&result).exit();
}

async fn run(args: ServerArgs) -> anyhow::Result<()> {
    let logger = ConsoleLogger::new();
    logger.info("starting catalog ingest server");

    let config = IngestConfig::load(&args).context("loading configuration")?;

    tokio::fs::create_dir_all(&config.blob.root)
        .await
        .with_context(|| format!("creating blob root {}", config.blob.root.display()))?;

    let pool = schema::initialize_database(&config.database.url)
        .await
        .context("initializing database")?;

    // Infrastructure adapters
    let blobs: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(config.blob.root.clone()));
    let uploads: Arc<dyn UploadRepository> = Arc::new(SqliteUploadRepository::new(pool.clone()));
    let images: Arc<dyn ImageRepository> = Arc::new(SqliteImageRepository::new(pool.clone()));
    let products: Arc<dyn ProductRepository> = Arc::new(SqliteProductRepository::new(pool.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(pool));
    let locks = Arc::new(UploadLockRegistry::new());
    let metrics = Arc::new(MetricsService::new().context("creating metrics registry")?);
    let codec = Arc::new(ImageVariantService::new(config.image.jpeg_quality));

    // Application services
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
        config.variant_tags(),
        metrics.clone(),
    ));
    let resolver = Arc::new(AttachmentResolver::new(
        uploads.clone(),
        images.clone(),
        products,
        blobs.clone(),
        queue.clone(),
        locks.clone(),
        metrics.clone(),
        config.attach.ready_wait_s,
    ));

    // Background workers
    let runner = Arc::new(JobRunner::new(
        queue,
        processor,
        uploads.clone(),
        locks,
        metrics.clone(),
        config.job.clone(),
    ));
    let recovered = runner.recover().await.context("recovering orphaned jobs")?;
    if recovered > 0 {
        logger.warn(&format!("requeued {} orphaned processing jobs", recovered));
    }

    let shutdown = ShutdownCoordinator::new(Duration::from_secs(30));
    install_signal_handlers(shutdown.clone());

    let workers = runner.spawn_workers(shutdown.token());
    logger.info(&format!("spawned {} job workers", config.job.workers));

    let state = AppState {
        coordinator,
        assembler,
        resolver,
        uploads,
        images,
        metrics,
    };
    let router = build_router(state);

    let serve_result = serve(&config.server.addr, router, shutdown.token()).await;

    // Whether the server exited by signal or by error, drain the workers
    shutdown.initiate_shutdown();
    for handle in workers {
        if let Err(e) = handle.await {
            tracing::warn!("worker task join error: {}", e);
        }
    }
    shutdown.complete_shutdown();
    logger.info("shutdown complete");

    serve_result.context("http server")?;
    Ok(())
}
