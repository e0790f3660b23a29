// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Flow Integration Tests
//!
//! The chunk-to-complete pipeline end to end: out-of-order reception,
//! corruption handling, duplicate tolerance, assembly verification, and
//! variant production.

use proptest::prelude::*;

use crate::common::{md5_hex, png_bytes, split_chunks, TestHarness};
use catalog_ingest_domain::{
    BlobStore, ImageRepository, IngestError, JobHandler, Md5Checksum, UploadId, UploadRepository, UploadStatus,
    VariantTag,
};

/// Scenario: chunks submitted in order 2, 0, 1; after completion and
/// processing, the upload is complete with all four variant rows.
#[tokio::test]
async fn happy_path_out_of_order_chunks() {
    let h = TestHarness::new().await;
    let source = png_bytes(1600, 1200);

    let upload_id = h.upload_and_complete(&source, 3, &[2, 0, 1]).await;

    // Canonical blob equals the source byte-for-byte
    let blob = h.blobs.read_blob(upload_id, "original.png").await.unwrap();
    assert_eq!(blob, source);

    // Not ready until the processing job runs
    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    assert_eq!(session.status(), UploadStatus::Assembling);

    assert_eq!(h.process_pending_jobs().await, 1);

    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    assert_eq!(session.status(), UploadStatus::Complete);
    assert_eq!(session.file_checksum().unwrap().as_str(), md5_hex(&source));
    assert_eq!(session.file_size(), Some(source.len() as u64));

    let assets = h.images.list_for_upload(session.id().unwrap()).await.unwrap();
    let tags: Vec<String> = assets.iter().map(|a| a.variant().as_str()).collect();
    assert_eq!(tags, vec!["original", "256", "512", "1024"]);

    // Original keeps source dimensions; sized variants respect their caps
    assert_eq!(assets[0].width(), 1600);
    assert_eq!(assets[0].height(), 1200);
    for (asset, cap) in assets[1..].iter().zip([256u32, 512, 1024]) {
        assert!(asset.longest_side() <= cap);
        let blob = h
            .blobs
            .read_blob(upload_id, &asset.variant().blob_name(None))
            .await
            .unwrap();
        assert_eq!(&Md5Checksum::of(&blob), asset.checksum());
    }
}

/// Scenario: a chunk whose declared checksum disagrees with its bytes is
/// rejected without side effects.
#[tokio::test]
async fn corrupted_chunk_is_rejected_without_state() {
    let h = TestHarness::new().await;
    let upload_id = UploadId::generate();

    h.send_chunk(upload_id, 0, 2, b"good chunk").await.unwrap();

    let result = h
        .coordinator
        .receive_chunk(catalog_ingest::application::services::ChunkRequest {
            upload_id: upload_id.to_string(),
            chunk_index: 1,
            total_chunks: 2,
            chunk_checksum: md5_hex(b"what the bytes should have been"),
            chunk: b"corrupted transfer".to_vec(),
            file_name: None,
            file_size: None,
            mime_type: None,
        })
        .await;
    assert!(matches!(result, Err(IngestError::ChunkChecksumMismatch(_))));

    // Chunk 1 was not written; the session is still uploading
    let manifest = h.blobs.list_chunks(upload_id).await.unwrap();
    assert_eq!(manifest.indices(), &[0]);
    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    assert_eq!(session.status(), UploadStatus::Uploading);

    // Retrying the same chunk with matching bytes succeeds
    h.send_chunk(upload_id, 1, 2, b"corrupted transfer").await.unwrap();
    assert_eq!(h.blobs.list_chunks(upload_id).await.unwrap().count(), 2);
}

/// Scenario: completion with a wrong whole-file checksum fails the upload
/// but keeps the chunks; completion is not retryable from `failed`.
#[tokio::test]
async fn whole_file_mismatch_fails_and_retains_chunks() {
    let h = TestHarness::new().await;
    let upload_id = UploadId::generate();
    let source = png_bytes(300, 200);
    let chunks = split_chunks(&source, 2);
    for (index, chunk) in chunks.iter().enumerate() {
        h.send_chunk(upload_id, index as u32, 2, chunk).await.unwrap();
    }

    let result = h
        .assembler
        .complete_upload(&upload_id.to_string(), &md5_hex(b"some other file"))
        .await;
    assert!(matches!(result, Err(IngestError::FileChecksumMismatch(_))));

    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    assert_eq!(session.status(), UploadStatus::Failed);
    assert_eq!(h.blobs.list_chunks(upload_id).await.unwrap().count(), 2);

    // No canonical blob, no queued work
    assert!(!h
        .blobs
        .exists(&format!("{}/original.png", upload_id))
        .await
        .unwrap());
    assert_eq!(h.process_pending_jobs().await, 0);

    // The failed state rejects a repeated completion, even a correct one
    let retry = h.complete(upload_id, &source).await;
    assert!(matches!(retry, Err(IngestError::NotAcceptingChunks(_))));
}

/// Scenario: the same chunk sent twice with identical bytes; both succeed
/// and assembly proceeds normally.
#[tokio::test]
async fn duplicate_chunk_submissions_are_idempotent() {
    let h = TestHarness::new().await;
    let upload_id = UploadId::generate();
    let source = png_bytes(400, 300);
    let chunks = split_chunks(&source, 2);

    assert_eq!(h.send_chunk(upload_id, 0, 2, &chunks[0]).await.unwrap(), 0);
    assert_eq!(h.send_chunk(upload_id, 0, 2, &chunks[0]).await.unwrap(), 0);
    h.send_chunk(upload_id, 1, 2, &chunks[1]).await.unwrap();

    assert_eq!(h.blobs.list_chunks(upload_id).await.unwrap().count(), 2);

    h.complete(upload_id, &source).await.unwrap();
    h.process_pending_jobs().await;

    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    assert_eq!(session.status(), UploadStatus::Complete);
}

/// Repeated completion after `complete` succeeds idempotently and does not
/// produce duplicate variants.
#[tokio::test]
async fn completion_is_idempotent_when_complete() {
    let h = TestHarness::new().await;
    let source = png_bytes(500, 500);
    let upload_id = h.upload_and_complete(&source, 2, &[0, 1]).await;
    h.process_pending_jobs().await;

    let outcome = h.complete(upload_id, &source).await.unwrap();
    assert!(outcome.already_complete);

    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    assert_eq!(h.images.list_for_upload(session.id().unwrap()).await.unwrap().len(), 4);
    // No new job was queued by the repeat
    assert_eq!(h.process_pending_jobs().await, 0);
}

/// A re-delivered processing job for a complete upload is a no-op that
/// converges to the same image rows.
#[tokio::test]
async fn reprocessing_converges() {
    let h = TestHarness::new().await;
    let source = png_bytes(900, 600);
    let upload_id = h.upload_and_complete(&source, 3, &[0, 1, 2]).await;
    h.process_pending_jobs().await;

    let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    let before = h.images.list_for_upload(session.id().unwrap()).await.unwrap();

    // Simulate at-least-once redelivery
    let job = catalog_ingest_domain::ProcessingJob {
        id: 777,
        upload_row_id: session.id().unwrap(),
        source_path: h
            .blobs
            .blob_path(upload_id, "original.png")
            .to_str()
            .unwrap()
            .to_string(),
        attempts: 2,
    };
    h.processor.handle(&job).await.unwrap();

    let after = h.images.list_for_upload(session.id().unwrap()).await.unwrap();
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.checksum(), b.checksum());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Assemble law: any partitioning of a byte sequence into chunks and
    /// any submission order reproduces the sequence byte-for-byte.
    #[test]
    fn prop_assembly_reproduces_source(
        len in 1usize..4096,
        chunk_count in 1usize..9,
        seed in any::<u64>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let h = TestHarness::new().await;
            // Deterministic pseudo-random payload from the seed
            let source: Vec<u8> = (0..len)
                .map(|i| (seed.wrapping_mul(6364136223846793005).wrapping_add(i as u64) >> 32) as u8)
                .collect();

            let chunk_count = chunk_count.min(source.len());
            let chunks = split_chunks(&source, chunk_count);

            // Submission order rotated by the seed
            let rotation = (seed as usize) % chunks.len();
            let order: Vec<usize> = (0..chunks.len()).map(|i| (i + rotation) % chunks.len()).collect();

            let upload_id = UploadId::generate();
            for &position in &order {
                h.send_chunk(upload_id, position as u32, chunks.len() as u32, &chunks[position])
                    .await
                    .unwrap();
            }
            h.complete(upload_id, &source).await.unwrap();

            let session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
            let blob = h
                .blobs
                .read_blob(upload_id, &VariantTag::Original.blob_name(session.original_extension().as_deref()))
                .await
                .unwrap();
            assert_eq!(blob, source);
        });
    }
}
