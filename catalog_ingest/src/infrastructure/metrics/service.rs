// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service
//!
//! Prometheus metrics for the ingest flows, exposed at `GET /metrics`.
//! Counters cover the externally observable events of the pipeline: chunk
//! reception, assemblies, processing outcomes, and attachments; the active
//! jobs gauge and processing histogram make queue backlogs visible.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

use catalog_ingest_domain::IngestError;

/// Prometheus metrics for the ingest service.
pub struct MetricsService {
    registry: Arc<Registry>,

    chunks_received_total: IntCounter,
    chunk_bytes_received_total: IntCounter,
    uploads_assembled_total: IntCounter,
    uploads_failed_total: IntCounter,
    jobs_processed_total: IntCounter,
    jobs_failed_total: IntCounter,
    variants_produced_total: IntCounter,
    attachments_total: IntCounter,

    active_jobs: IntGauge,
    processing_duration: Histogram,
}

impl MetricsService {
    pub fn new() -> Result<Self, IngestError> {
        let registry = Registry::new();

        let chunks_received_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_chunks_received_total",
            "Total verified chunks written to the blob store",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let chunk_bytes_received_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_chunk_bytes_received_total",
            "Total verified chunk bytes written to the blob store",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let uploads_assembled_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_uploads_assembled_total",
            "Total uploads assembled into a canonical blob",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let uploads_failed_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_uploads_failed_total",
            "Total uploads transitioned to the failed state",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let jobs_processed_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_jobs_processed_total",
            "Total processing jobs completed successfully",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let jobs_failed_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_jobs_failed_total",
            "Total processing job attempts that failed",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let variants_produced_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_variants_produced_total",
            "Total image variant records written",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let attachments_total = IntCounter::with_opts(Opts::new(
            "catalog_ingest_attachments_total",
            "Total product-image attachments resolved",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let active_jobs = IntGauge::with_opts(Opts::new(
            "catalog_ingest_active_jobs",
            "Processing jobs currently executing",
        ))
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        let processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "catalog_ingest_processing_duration_seconds",
                "Wall-clock duration of processing job attempts",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )
        .map_err(|e| IngestError::internal_error(format!("failed to create metric: {}", e)))?;

        registry
            .register(Box::new(chunks_received_total.clone()))
            .and_then(|_| registry.register(Box::new(chunk_bytes_received_total.clone())))
            .and_then(|_| registry.register(Box::new(uploads_assembled_total.clone())))
            .and_then(|_| registry.register(Box::new(uploads_failed_total.clone())))
            .and_then(|_| registry.register(Box::new(jobs_processed_total.clone())))
            .and_then(|_| registry.register(Box::new(jobs_failed_total.clone())))
            .and_then(|_| registry.register(Box::new(variants_produced_total.clone())))
            .and_then(|_| registry.register(Box::new(attachments_total.clone())))
            .and_then(|_| registry.register(Box::new(active_jobs.clone())))
            .and_then(|_| registry.register(Box::new(processing_duration.clone())))
            .map_err(|e| IngestError::internal_error(format!("failed to register metrics: {}", e)))?;

        Ok(Self {
            registry: Arc::new(registry),
            chunks_received_total,
            chunk_bytes_received_total,
            uploads_assembled_total,
            uploads_failed_total,
            jobs_processed_total,
            jobs_failed_total,
            variants_produced_total,
            attachments_total,
            active_jobs,
            processing_duration,
        })
    }

    pub fn record_chunk_received(&self, bytes: u64) {
        self.chunks_received_total.inc();
        self.chunk_bytes_received_total.inc_by(bytes);
    }

    pub fn record_upload_assembled(&self) {
        self.uploads_assembled_total.inc();
    }

    pub fn record_upload_failed(&self) {
        self.uploads_failed_total.inc();
    }

    pub fn record_job_success(&self, duration: std::time::Duration) {
        self.jobs_processed_total.inc();
        self.processing_duration.observe(duration.as_secs_f64());
    }

    pub fn record_job_failure(&self, duration: std::time::Duration) {
        self.jobs_failed_total.inc();
        self.processing_duration.observe(duration.as_secs_f64());
    }

    pub fn record_variant_produced(&self) {
        self.variants_produced_total.inc();
    }

    pub fn record_attachment(&self) {
        self.attachments_total.inc();
    }

    pub fn job_started(&self) {
        self.active_jobs.inc();
    }

    pub fn job_finished(&self) {
        self.active_jobs.dec();
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn get_metrics(&self) -> Result<String, IngestError> {
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        encoder
            .encode_to_string(&families)
            .map_err(|e| IngestError::internal_error(format!("failed to encode metrics: {}", e)))
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}
