//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Tu.
//! The Tu project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Tu Core Library
//!
//! Tu exports training/validation image datasets (raw frames and keyed
//! point patches) harvested from a 3D vision map into on-disk artifacts
//! consumable by downstream learning pipelines. The core is a batched
//! dataset serialization engine: same-shaped samples (and optional
//! per-sample keypoint sets) accumulate in memory, shape consistency is
//! enforced, output splits across container files by policy, and each
//! flush writes a self-describing binary layout a reader reconstructs
//! losslessly.
//!
//! ## Module Overview
//!
//! - **errors**: TuError taxonomy with stable per-category codes
//! - **keys**: shared string constants of the container/workspace layout
//! - **image**: raw 8-bit image tensors, deterministic resize and crop
//! - **keypoint**: detected feature records and their wire encoding
//! - **map**: capability traits for map access and keypoint detection,
//!   plus in-memory reference implementations
//! - **buffer**: same-shape sample accumulation and split/path policy
//! - **container**: the binary container format, writer and reader
//! - **extractor**: plain-file and container persistence strategies
//! - **config**: the explicit run configuration and workspace layout
//! - **pipeline**: selection, train/validation split, run state machine
//!
//! ## Quick Start
//!
//! ```rust
//! use tu::{TuExtractionConfig, TuExtractionPipeline, TuGridDetector, TuMemoryMap};
//!
//! let map = build_map(); // any TuMapSource implementation
//! let detector = TuGridDetector::new(8, 32);
//!
//! let config = TuExtractionConfig {
//!     output_dir: "/tmp/datasets".into(),
//!     trainval_ratio: 0.8,
//!     ..Default::default()
//! };
//!
//! let mut pipeline = TuExtractionPipeline::new(config);
//! let report = pipeline.run(&map, &detector)?;
//! println!("wrote {} samples", report.total_written());
//! ```
//!
//! ## Concurrency Model
//!
//! Single-threaded, synchronous, run-to-completion per invocation. One
//! pipeline instance drives one strategy at a time; a container file is
//! exclusively owned by its writer for the duration of a flush.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, TuError>`. Missing resources and
//! shape mismatches are recovered per item and reported in the run
//! statistics; everything else is fatal for the run and carries a stable
//! error code separating user mistakes from runtime failures.

#![allow(non_snake_case)]

pub mod errors;
pub mod keys;
pub mod image;
pub mod keypoint;
pub mod map;
pub mod buffer;
pub mod container;
pub mod extractor;
pub mod config;
pub mod pipeline;

pub use errors::{Result, TuError};
// `crate::` disambiguates the module from the image crate itself.
pub use crate::image::{TuDims, TuImage};
pub use keypoint::{TuKeypoint, KEYPOINT_WIRE_SIZE};
pub use map::{
    TuGridDetector, TuKeypointDetector, TuLandmarkId, TuMapSource, TuMemoryMap, TuNullDetector,
    TuObservation, TuVertexId, REFERENCE_FRAME,
};
pub use buffer::TuSampleBuffer;
pub use container::{TuContainer, TuContainerReader, TuDatasetWriter, TuWriteStats};
pub use extractor::{
    extractor_factory, TuContainerExtractor, TuExtractContext, TuExtractStats, TuExtractor,
    TuPlainFileExtractor, TuSampleKind,
};
pub use config::{
    TuExtractionConfig, TuExtractionMode, TuStrategyKind, TuWorkspace, DEFAULT_BATCH_CAP,
};
pub use pipeline::{
    select_image_ids, select_landmark_ids, split_train_validation, TuExtractionPipeline,
    TuPipelineState, TuRunReport,
};
