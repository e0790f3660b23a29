// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attachment Integration Tests
//!
//! The attach-to-product flow against the full stack: the processing race,
//! primary-image toggling, and the failed-upload recovery path.

use crate::common::{png_bytes, TestHarness};
use catalog_ingest::application::services::{AttachOutcome, AttachResponse};
use catalog_ingest_domain::{
    IngestError, JobQueue, ProductRepository, Sku, UploadId, UploadRepository, UploadStatus,
};

/// Scenario: attach while the upload is still `assembling` returns the
/// pending signal; once processing lands, attach succeeds with a link.
#[tokio::test]
async fn attach_race_resolves_after_processing() {
    let h = TestHarness::new().await;
    h.seed_product("RACE-1", "Racing Widget").await;
    let source = png_bytes(640, 480);
    let upload_id = h.upload_and_complete(&source, 2, &[1, 0]).await;

    // Still assembling: the processing job has not run
    let response = h.resolver.attach(&upload_id.to_string(), "RACE-1", false).await.unwrap();
    match response {
        AttachResponse::Pending { status, processing_time } => {
            assert_eq!(status, "uploading");
            assert!(processing_time >= 0);
        }
        other => panic!("expected Pending, got {:?}", other),
    }

    h.process_pending_jobs().await;

    let response = h.resolver.attach(&upload_id.to_string(), "RACE-1", false).await.unwrap();
    let AttachResponse::Attached(AttachOutcome { image_id, product_id, is_primary }) = response else {
        panic!("expected Attached");
    };
    assert!(!is_primary);

    let links = h.products.links_for_product(product_id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].image_id, image_id);
}

/// Scenario: attach image A primary, then image B primary on the same
/// product; both links exist, only B is primary, the denormalized column
/// follows.
#[tokio::test]
async fn primary_toggle_between_two_uploads() {
    let h = TestHarness::new().await;
    let product_id = h.seed_product("TOGGLE-1", "Toggled Widget").await;

    let upload_a = h.upload_and_complete(&png_bytes(300, 300), 1, &[0]).await;
    let upload_b = h.upload_and_complete(&png_bytes(400, 400), 1, &[0]).await;
    h.process_pending_jobs().await;

    let AttachResponse::Attached(a) = h
        .resolver
        .attach(&upload_a.to_string(), "TOGGLE-1", true)
        .await
        .unwrap()
    else {
        panic!("expected Attached");
    };
    let AttachResponse::Attached(b) = h
        .resolver
        .attach(&upload_b.to_string(), "TOGGLE-1", true)
        .await
        .unwrap()
    else {
        panic!("expected Attached");
    };

    let links = h.products.links_for_product(product_id).await.unwrap();
    assert_eq!(links.len(), 2);
    for link in &links {
        assert_eq!(link.is_primary, link.image_id == b.image_id);
    }

    let product = h
        .products
        .find_by_sku(&Sku::parse("TOGGLE-1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.primary_image_id(), Some(b.image_id));
    assert_ne!(a.image_id, b.image_id);
}

/// Scenario: a failed upload whose assembled blob survived is resurrected
/// by the attach endpoint and processes to completion.
#[tokio::test]
async fn failed_upload_recovers_through_attach() {
    let h = TestHarness::new().await;
    h.seed_product("RESCUE-1", "Rescued Widget").await;
    let source = png_bytes(800, 500);
    let upload_id = h.upload_and_complete(&source, 2, &[0, 1]).await;

    // Drop the queued job and force the session into failed, as a crashed
    // processing run would leave it
    drop_all_jobs(&h).await;
    let mut session = h.uploads.find_by_upload_id(upload_id).await.unwrap().unwrap();
    if session.status() != UploadStatus::Failed {
        session.mark_failed().unwrap();
        h.uploads.update(&session).await.unwrap();
    }

    let response = h.resolver.attach(&upload_id.to_string(), "RESCUE-1", true).await.unwrap();
    assert_eq!(
        response,
        AttachResponse::Pending {
            status: "processing",
            processing_time: 0
        }
    );

    // The re-enqueued job completes the upload
    assert_eq!(h.process_pending_jobs().await, 1);
    let response = h.resolver.attach(&upload_id.to_string(), "RESCUE-1", true).await.unwrap();
    assert!(matches!(response, AttachResponse::Attached(_)));
}

/// Attaching an unknown upload or unknown SKU is a client error.
#[tokio::test]
async fn unknown_identifiers_are_not_found() {
    let h = TestHarness::new().await;
    h.seed_product("KNOWN-1", "Known Widget").await;
    let upload_id = h.upload_and_complete(&png_bytes(200, 200), 1, &[0]).await;
    h.process_pending_jobs().await;

    let missing_upload = h
        .resolver
        .attach(&UploadId::generate().to_string(), "KNOWN-1", false)
        .await;
    assert!(matches!(missing_upload, Err(IngestError::NotFound(_))));

    let missing_product = h.resolver.attach(&upload_id.to_string(), "UNKNOWN-9", false).await;
    assert!(matches!(missing_product, Err(IngestError::NotFound(_))));
}

/// Claims and discards every queued job, simulating a worker crash after
/// claim.
async fn drop_all_jobs(h: &TestHarness) {
    while let Some(_job) = h.queue.claim_next().await.unwrap() {}
}
