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

//! # Shared String Keys
//!
//! Every string constant used by the container layout, the extractor
//! strategies, and the workspace layout lives here so readers and writers
//! agree byte-for-byte on entry names and directory names.

/// Magic bytes opening every container file.
pub const CONTAINER_MAGIC: &[u8; 4] = b"TUDS";

/// Container format version written after the magic.
pub const CONTAINER_VERSION: u16 = 1;

/// Header entry holding `(channels, rows, cols)`.
pub const DIMS: &str = "dims";

/// Header entry holding the sample count.
pub const NUM_DATA: &str = "num_data";

/// Entry holding the 4-D data block.
pub const DATA: &str = "data/data";

/// Prefix of per-sample keypoint entries; the sample index is appended.
pub const KEYPOINTS_PREFIX: &str = "keypoints/keypoints";

/// Trailing integrity entry holding the xxh3-64 of all preceding bytes.
pub const CHECKSUM: &str = "checksum";

/// Strategy mode name for one-file-per-sample extraction.
pub const MODE_PLAIN: &str = "plain";

/// Strategy mode name for buffered container extraction.
pub const MODE_CONTAINER: &str = "container";

/// Base component every extractor name starts with.
pub const EXTRACTION_NAME: &str = "image_extraction_";

/// File stem of container files inside a dataset directory.
pub const DATASET_STEM: &str = "dataset";

/// Training subdirectory of a run-scoped work directory.
pub const TRAINING_DIR: &str = "training_dataset";

/// Validation subdirectory of a run-scoped work directory.
pub const VALIDATION_DIR: &str = "validation_dataset";
