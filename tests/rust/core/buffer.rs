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

//! # Tu Core Tests - Sample Buffer
//!
//! Tests for same-shape enforcement, lock-step keypoint lists, and the
//! split/output-path policy of the sample buffer.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test buffer
//! ```

use std::path::Path;

use tu::{TuImage, TuKeypoint, TuSampleBuffer};

fn sample(channels: u32, rows: u32, cols: u32) -> TuImage {
    TuImage::filled(channels, rows, cols, 128)
}

/// N successful adds of same-shaped samples yield size() == N.
#[test]
fn add_accumulates_same_shaped_samples() {
    let mut buffer = TuSampleBuffer::new("/tmp/out", 0, ".tuc");
    for i in 0..5 {
        buffer.add(sample(3, 8, 8), Vec::new()).unwrap();
        assert_eq!(buffer.size(), i + 1);
    }
    assert_eq!(buffer.dims().unwrap(), tu::TuDims::new(3, 8, 8));
}

/// The first sample records the shape unconditionally.
#[test]
fn first_sample_establishes_dims() {
    let mut buffer = TuSampleBuffer::new("/tmp/out", 0, ".tuc");
    assert!(buffer.dims().is_none());
    buffer.add(sample(1, 32, 16), Vec::new()).unwrap();
    assert_eq!(buffer.dims().unwrap(), tu::TuDims::new(1, 32, 16));
}

/// A mismatch in any dimension is rejected and the buffer is unchanged.
#[test]
fn mismatched_shapes_are_rejected_without_partial_append() {
    let mut buffer = TuSampleBuffer::new("/tmp/out", 0, ".tuc");
    buffer.add(sample(3, 8, 8), Vec::new()).unwrap();

    for bad in [sample(1, 8, 8), sample(3, 4, 8), sample(3, 8, 4)] {
        let err = buffer.add(bad, Vec::new()).unwrap_err();
        assert_eq!(err.code(), "dimension_mismatch");
        assert_eq!(buffer.size(), 1);
        assert_eq!(buffer.keypoint_lists().len(), 1);
    }
}

/// Samples and keypoint lists stay in lock-step, empty lists included.
#[test]
fn keypoint_lists_track_samples() {
    let mut buffer = TuSampleBuffer::new("/tmp/out", 0, ".tuc");
    buffer.add(sample(1, 4, 4), Vec::new()).unwrap();
    buffer
        .add(sample(1, 4, 4), vec![TuKeypoint::new(1.0, 2.0, 1.0, 0.0, 0.5)])
        .unwrap();

    assert_eq!(buffer.size(), 2);
    assert_eq!(buffer.keypoint_lists().len(), 2);
    assert!(buffer.keypoint_lists()[0].is_empty());
    assert_eq!(buffer.keypoint_lists()[1].len(), 1);
    assert!(buffer.has_keypoints());
}

/// With split_size <= 0 the output path is a constant filename.
#[test]
fn non_splitting_buffer_targets_fixed_path() {
    let mut buffer = TuSampleBuffer::new("/data/run", 0, ".tuc");
    assert_eq!(
        buffer.current_output_path(),
        Path::new("/data/run/dataset.tuc")
    );
    buffer.reset();
    buffer.reset();
    assert_eq!(
        buffer.current_output_path(),
        Path::new("/data/run/dataset.tuc")
    );
}

/// With split_size > 0 every reset advances the file index, so no two
/// flushes share a path.
#[test]
fn splitting_buffer_advances_file_index_on_reset() {
    let mut buffer = TuSampleBuffer::new("/data/run", 16, ".tuc");
    assert_eq!(
        buffer.current_output_path(),
        Path::new("/data/run/dataset_0.tuc")
    );
    buffer.reset();
    assert_eq!(buffer.file_counter(), 1);
    assert_eq!(
        buffer.current_output_path(),
        Path::new("/data/run/dataset_1.tuc")
    );
    buffer.reset();
    assert_eq!(
        buffer.current_output_path(),
        Path::new("/data/run/dataset_2.tuc")
    );
}

/// reset() clears contents but keeps the recorded shape.
#[test]
fn reset_clears_contents_and_keeps_dims() {
    let mut buffer = TuSampleBuffer::new("/tmp/out", 4, ".tuc");
    buffer.add(sample(3, 8, 8), Vec::new()).unwrap();
    buffer.reset();

    assert_eq!(buffer.size(), 0);
    assert!(buffer.is_empty());
    assert_eq!(buffer.dims().unwrap(), tu::TuDims::new(3, 8, 8));

    let err = buffer.add(sample(3, 16, 16), Vec::new()).unwrap_err();
    assert_eq!(err.code(), "dimension_mismatch");
}
