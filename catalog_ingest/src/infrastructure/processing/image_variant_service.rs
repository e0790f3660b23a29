// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Variant Service
//!
//! Decodes uploaded source images and encodes the sized JPEG variants.
//!
//! ## Behavior
//!
//! - **Decode**: format is sniffed from the bytes (never trusted from the
//!   client's advisory mime type); dimensions and the detected mime are
//!   captured for the `original` record
//! - **Resize**: aspect-preserving fit of the longest side to the target,
//!   Lanczos3 filtering, `upsize = false` - a source smaller than the
//!   target is re-encoded at its own size, never enlarged
//! - **Encode**: JPEG at the configured quality; alpha is flattened by the
//!   RGB conversion before encoding since JPEG has no alpha channel
//!
//! Decoding and resizing are CPU-bound; callers run this service inside
//! `spawn_blocking` (the job worker does) to keep the async executor
//! responsive.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use catalog_ingest_domain::IngestError;

/// A decoded source image with its detected properties.
pub struct DecodedImage {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
    /// Mime type detected from the byte stream, e.g. `image/png`.
    pub mime_type: String,
}

/// One encoded sized variant.
pub struct EncodedVariant {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decoder/encoder for the variant pipeline.
pub struct ImageVariantService {
    jpeg_quality: u8,
}

impl ImageVariantService {
    /// Creates a service encoding JPEG variants at the given quality (1-100).
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }

    /// Decodes a source image, sniffing the format from its bytes.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ProcessingFailed` (retryable) when the bytes
    /// are not a decodable image.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, IngestError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| IngestError::processing_failed(format!("failed to sniff image format: {}", e)))?;

        let format = reader
            .format()
            .ok_or_else(|| IngestError::processing_failed("unrecognized image format".to_string()))?;

        let image = reader
            .decode()
            .map_err(|e| IngestError::processing_failed(format!("failed to decode image: {}", e)))?;

        Ok(DecodedImage {
            width: image.width(),
            height: image.height(),
            mime_type: format.to_mime_type().to_string(),
            image,
        })
    }

    /// Produces one sized variant: longest side fit to `target`, aspect
    /// preserved, never enlarged, JPEG-encoded.
    pub fn encode_variant(&self, source: &DecodedImage, target: u32) -> Result<EncodedVariant, IngestError> {
        let longest = source.width.max(source.height);
        let resized: DynamicImage = if longest <= target {
            source.image.clone()
        } else {
            source.image.resize(target, target, FilterType::Lanczos3)
        };

        let bytes = self.encode_jpeg(&resized)?;
        Ok(EncodedVariant {
            width: resized.width(),
            height: resized.height(),
            bytes,
        })
    }

    fn encode_jpeg(&self, image: &DynamicImage) -> Result<Vec<u8>, IngestError> {
        // JPEG has no alpha; flatten to RGB first
        let rgb = image.to_rgb8();
        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, self.jpeg_quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| IngestError::processing_failed(format!("failed to encode jpeg: {}", e)))?;
        Ok(bytes)
    }
}
