// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Image decoding and variant encoding.

pub mod image_variant_service;

pub use image_variant_service::{DecodedImage, EncodedVariant, ImageVariantService};
