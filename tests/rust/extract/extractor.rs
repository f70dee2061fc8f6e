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

//! # Tu Extract Tests - Strategies
//!
//! Tests for the plain-file and container extraction strategies: skip and
//! drop recovery, gapless file numbering, batch-cap truncation, and patch
//! cropping.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test extractor
//! ```

use tu::{
    TuContainerExtractor, TuContainerReader, TuDims, TuExtractContext, TuExtractor,
    TuGridDetector, TuImage, TuMemoryMap, TuNullDetector, TuObservation, TuPlainFileExtractor,
    TuSampleKind,
};

fn frame(channels: u32, rows: u32, cols: u32, value: u8) -> TuImage {
    TuImage::filled(channels, rows, cols, value)
}

fn map_with_vertices(shapes: &[(u32, u32, u32)]) -> (TuMemoryMap, Vec<String>) {
    let mut map = TuMemoryMap::new();
    let mut ids = Vec::new();
    for (i, &(channels, rows, cols)) in shapes.iter().enumerate() {
        let id = format!("v{}", i);
        map.insert_vertex(
            id.clone(),
            Some(frame(1, rows, cols, i as u8)),
            Some(frame(channels.max(3), rows, cols, i as u8)),
        );
        ids.push(id);
    }
    (map, ids)
}

/// Skipped vertices leave no gaps in the plain-file sequence numbers.
#[test]
fn plain_extractor_numbers_files_gaplessly() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = TuMemoryMap::new();
    map.insert_vertex("v0", Some(frame(1, 8, 8, 0)), Some(frame(3, 8, 8, 0)));
    map.insert_vertex("missing", None, None);
    map.insert_vertex("v2", Some(frame(1, 8, 8, 2)), Some(frame(3, 8, 8, 2)));

    let detector = TuNullDetector;
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };
    let selection = vec![
        "v0".to_string(),
        "missing".to_string(),
        "v2".to_string(),
    ];

    let mut extractor = TuPlainFileExtractor::new(false, (-1, -1));
    let stats = extractor.extract(&ctx, &selection, dir.path()).unwrap();

    assert_eq!(stats.written, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.files_created, 2);
    assert!(dir.path().join("img_0.jpg").exists());
    assert!(dir.path().join("img_1.jpg").exists());
    assert!(!dir.path().join("img_2.jpg").exists());
}

/// The capability set reports composed names and file endings.
#[test]
fn strategies_report_names_and_endings() {
    let plain = TuPlainFileExtractor::new(false, (-1, -1));
    assert_eq!(plain.name(), "image_extraction_plain_");
    assert_eq!(plain.file_ending(), ".jpg");

    let container =
        TuContainerExtractor::new(true, (-1, -1), 16, TuSampleKind::Frames, 0);
    assert_eq!(container.name(), "image_extraction_container_");
    assert_eq!(container.file_ending(), ".tuc");
}

/// The resize capability stretches to the requested size.
#[test]
fn extractor_resize_honors_target() {
    let plain = TuPlainFileExtractor::new(false, (-1, -1));
    let img = frame(3, 20, 10, 1);

    let same = plain.resize(&img, (-1, -1)).unwrap();
    assert_eq!(same.dims(), TuDims::new(3, 20, 10));

    let resized = plain.resize(&img, (32, 32)).unwrap();
    assert_eq!(resized.dims(), TuDims::new(3, 32, 32));
}

/// A frame whose shape disagrees with the batch is dropped, not fatal.
#[test]
fn container_extractor_drops_mismatched_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (map, ids) = map_with_vertices(&[(1, 8, 8), (1, 16, 16), (1, 8, 8)]);
    let detector = TuNullDetector;
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };

    let mut extractor =
        TuContainerExtractor::new(true, (-1, -1), 16, TuSampleKind::Frames, 0);
    let stats = extractor.extract(&ctx, &ids, dir.path()).unwrap();

    assert_eq!(stats.written, 2);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.files_created, 1);

    let container = TuContainerReader::new()
        .read(&dir.path().join("dataset.tuc"))
        .unwrap();
    assert_eq!(container.num_data(), 2);
    assert_eq!(container.dims(), TuDims::new(1, 8, 8));
}

/// Selection items beyond the batch cap are reported as truncated.
#[test]
fn container_extractor_reports_cap_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let (map, ids) =
        map_with_vertices(&[(1, 4, 4), (1, 4, 4), (1, 4, 4), (1, 4, 4), (1, 4, 4)]);
    let detector = TuNullDetector;
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };

    let mut extractor =
        TuContainerExtractor::new(true, (-1, -1), 2, TuSampleKind::Frames, 0);
    let stats = extractor.extract(&ctx, &ids, dir.path()).unwrap();

    assert_eq!(stats.written, 2);
    assert_eq!(stats.truncated, 3);

    let container = TuContainerReader::new()
        .read(&dir.path().join("dataset.tuc"))
        .unwrap();
    assert_eq!(container.num_data(), 2);
}

/// Detected keypoints ride along with their samples into the container.
#[test]
fn container_extractor_records_detections() {
    let dir = tempfile::tempdir().unwrap();
    let (map, ids) = map_with_vertices(&[(1, 16, 16)]);
    let detector = TuGridDetector::new(8, 4);
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };

    let mut extractor =
        TuContainerExtractor::new(true, (-1, -1), 16, TuSampleKind::Frames, 0);
    extractor.extract(&ctx, &ids, dir.path()).unwrap();

    let container = TuContainerReader::new()
        .read(&dir.path().join("dataset.tuc"))
        .unwrap();
    assert_eq!(container.keypoint_indices(), vec![0]);
    let keypoints = container.keypoints_for(0).unwrap();
    assert!(!keypoints.is_empty());
    assert_eq!(keypoints[0].x, 8.0);
    assert_eq!(keypoints[0].y, 8.0);
}

/// Patch mode crops patch_size windows around landmark observations.
#[test]
fn container_extractor_crops_landmark_patches() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = TuMemoryMap::new();
    map.insert_vertex("v0", Some(frame(1, 16, 16, 1)), None);
    map.insert_vertex("v1", Some(frame(1, 16, 16, 2)), None);
    map.insert_landmark(
        "l0",
        vec![
            TuObservation::new("v0", 8.0, 8.0),
            TuObservation::new("v1", 1.0, 14.0),
            TuObservation::new("v0", 3.0, 3.0),
        ],
    );

    let detector = TuNullDetector;
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };
    let kind = TuSampleKind::Patches {
        patch_size: 6,
        samples_per_landmark: 2,
    };
    let mut extractor = TuContainerExtractor::new(true, (-1, -1), 16, kind, 0);
    let stats = extractor
        .extract(&ctx, &["l0".to_string()], dir.path())
        .unwrap();

    // Only the first two observations are sampled.
    assert_eq!(stats.written, 2);

    let container = TuContainerReader::new()
        .read(&dir.path().join("dataset.tuc"))
        .unwrap();
    assert_eq!(container.num_data(), 2);
    assert_eq!(container.dims(), TuDims::new(1, 6, 6));
}

/// A landmark without observations is skipped with a warning.
#[test]
fn container_extractor_skips_unobserved_landmarks() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = TuMemoryMap::new();
    map.insert_vertex("v0", Some(frame(1, 16, 16, 1)), None);
    map.insert_landmark("l0", vec![TuObservation::new("v0", 8.0, 8.0)]);
    map.insert_landmark("l1", Vec::new());

    let detector = TuNullDetector;
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };
    let kind = TuSampleKind::Patches {
        patch_size: 4,
        samples_per_landmark: 4,
    };
    let mut extractor = TuContainerExtractor::new(true, (-1, -1), 16, kind, 0);
    let stats = extractor
        .extract(&ctx, &["l0".to_string(), "l1".to_string()], dir.path())
        .unwrap();

    assert_eq!(stats.written, 1);
    assert_eq!(stats.skipped, 1);
}

/// A selection whose every item is skipped flushes nothing.
#[test]
fn empty_batches_produce_no_container() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = TuMemoryMap::new();
    map.insert_vertex("missing", None, None);

    let detector = TuNullDetector;
    let ctx = TuExtractContext {
        map: &map,
        detector: &detector,
    };
    let mut extractor =
        TuContainerExtractor::new(true, (-1, -1), 16, TuSampleKind::Frames, 0);
    let stats = extractor
        .extract(&ctx, &["missing".to_string()], dir.path())
        .unwrap();

    assert_eq!(stats.written, 0);
    assert_eq!(stats.skipped, 1);
    assert!(!dir.path().join("dataset.tuc").exists());
}
