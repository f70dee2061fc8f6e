//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Tu.
//! The Tu project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//!
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Tu Core Tests - Image Primitives
//!
//! Tests for deterministic resizing and border-clamped patch cropping.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test image
//! ```

use tu::{TuDims, TuImage};

/// A (-1, -1) target keeps the image dimensions unchanged.
#[test]
fn resize_noop_target_keeps_dimensions() {
    let img = TuImage::filled(3, 30, 40, 10);
    let out = img.resize((-1, -1)).unwrap();
    assert_eq!(out.dims(), TuDims::new(3, 30, 40));
    assert_eq!(out.data(), img.data());
}

/// Any explicit target yields exactly that size, whatever the source
/// aspect ratio.
#[test]
fn resize_stretches_to_exact_target() {
    for (rows, cols) in [(30, 40), (100, 100), (7, 200)] {
        let img = TuImage::filled(1, rows, cols, 77);
        let out = img.resize((100, 100)).unwrap();
        assert_eq!(out.dims(), TuDims::new(1, 100, 100));
    }

    let color = TuImage::filled(3, 12, 60, 5);
    let out = color.resize((24, 48)).unwrap();
    // Target is (width, height) = (cols, rows).
    assert_eq!(out.dims(), TuDims::new(3, 48, 24));
}

/// A uniform image stays uniform through interpolation.
#[test]
fn resize_preserves_constant_content() {
    let img = TuImage::filled(1, 16, 16, 200);
    let out = img.resize((4, 4)).unwrap();
    assert!(out.data().iter().all(|&v| v == 200));
}

/// Degenerate targets are rejected.
#[test]
fn resize_rejects_invalid_targets() {
    let img = TuImage::filled(1, 8, 8, 0);
    assert!(img.resize((0, 4)).is_err());
    assert!(img.resize((-2, -2)).is_err());
}

/// Crops centered in the interior copy the expected pixels.
#[test]
fn crop_copies_the_centered_window() {
    let data: Vec<u8> = (0..64).map(|i| i as u8).collect();
    let img = TuImage::new(1, 8, 8, data).unwrap();

    let patch = img.crop_square(4.0, 4.0, 2).unwrap();
    assert_eq!(patch.dims(), TuDims::new(1, 2, 2));
    // Window starts at (3, 3): rows 3..5, cols 3..5.
    assert_eq!(patch.data(), &[27, 28, 35, 36]);
}

/// Windows around border keypoints are shifted fully inside the frame.
#[test]
fn crop_clamps_to_frame_borders() {
    let img = TuImage::filled(3, 10, 10, 50);

    for (cx, cy) in [(0.0, 0.0), (9.5, 0.0), (0.0, 9.5), (9.5, 9.5)] {
        let patch = img.crop_square(cx, cy, 6).unwrap();
        assert_eq!(patch.dims(), TuDims::new(3, 6, 6));
    }
}

/// A frame smaller than the patch cannot be cropped.
#[test]
fn crop_rejects_undersized_frames() {
    let img = TuImage::filled(1, 4, 4, 0);
    assert!(img.crop_square(2.0, 2.0, 8).is_err());
}

/// The zero-row sentinel marks failed retrievals.
#[test]
fn empty_sentinel_is_detected() {
    assert!(TuImage::empty().is_empty());
    assert!(!TuImage::filled(1, 1, 1, 0).is_empty());
}
