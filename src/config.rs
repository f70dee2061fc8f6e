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

//! # Configuration Module
//!
//! The explicit configuration surface of an extraction run and the
//! run-scoped workspace layout.
//!
//! All range checks live in [`TuExtractionConfig::validate`] and run before
//! any I/O; a violation names the offending field and its valid range.
//! Population-dependent limits (`num_images` against the vertex count,
//! `num_landmarks_per_map` against the landmark count) are enforced later,
//! during selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TuError};
use crate::keys;
use crate::map::TuMapSource;

/// What the run extracts: whole vertex frames or landmark patches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuExtractionMode {
    Images,
    Patches,
}

impl TuExtractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            TuExtractionMode::Images => "images",
            TuExtractionMode::Patches => "patches",
        }
    }
}

/// How extracted samples are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuStrategyKind {
    /// One standalone image file per sample.
    Plain,
    /// Buffered samples flushed into container files.
    Container,
}

impl TuStrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            TuStrategyKind::Plain => keys::MODE_PLAIN,
            TuStrategyKind::Container => keys::MODE_CONTAINER,
        }
    }
}

/// Default per-batch sample cap of the container strategy.
///
/// Buffered samples are held in memory until the flush, so one batch is
/// bounded. The cap is an explicit configuration value; hitting it is
/// reported in the run statistics, never silent.
pub const DEFAULT_BATCH_CAP: usize = 256;

/// Configuration of one extraction run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TuExtractionConfig {
    /// Extraction mode: vertex frames or landmark patches.
    pub mode: TuExtractionMode,
    /// Persistence strategy. Patch mode requires `container`.
    pub strategy: TuStrategyKind,
    /// Output directory root. Empty means: derive from the source map
    /// location.
    pub output_dir: String,
    /// Extract greyscale frames instead of color.
    pub greyscale: bool,
    /// Training vs validation ratio in `[0.0, 1.0]`; 1.0 sends every
    /// sample to the training set.
    pub trainval_ratio: f64,
    /// Square resize target in pixels; -1 keeps the original size.
    pub image_size: i32,
    /// Number of images to extract; -1 extracts one per vertex.
    pub num_images: i32,
    /// Patch edge length in pixels, `[1, 1024]`.
    pub patch_size: i32,
    /// Number of landmarks to sample per map.
    pub num_landmarks_per_map: u64,
    /// Maximum patches taken per observed landmark.
    pub num_samples_per_landmark: i32,
    /// Per-batch sample cap of the container strategy; see
    /// [`DEFAULT_BATCH_CAP`].
    pub batch_cap: usize,
    /// Split policy forwarded to the sample buffer; <= 0 never splits.
    pub split_size: i64,
    /// Shuffle seed; `None` draws from OS entropy. Tests inject a fixed
    /// seed for reproducible selection.
    pub seed: Option<u64>,
}

impl Default for TuExtractionConfig {
    fn default() -> Self {
        TuExtractionConfig {
            mode: TuExtractionMode::Images,
            strategy: TuStrategyKind::Plain,
            output_dir: String::new(),
            greyscale: false,
            trainval_ratio: 1.0,
            image_size: -1,
            num_images: -1,
            patch_size: 64,
            num_landmarks_per_map: 100,
            num_samples_per_landmark: 8,
            batch_cap: DEFAULT_BATCH_CAP,
            split_size: 0,
            seed: None,
        }
    }
}

impl TuExtractionConfig {
    /// Loads a configuration from a JSON document.
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Loads a configuration from a YAML document.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(document: &str) -> Result<Self> {
        serde_yaml::from_str(document).map_err(|e| TuError::Serde(e.to_string()))
    }

    /// Range-checks every field. No I/O is performed; the first violation
    /// is returned with the offending field named.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.trainval_ratio) {
            return Err(TuError::config(
                "trainval_ratio",
                "supported range: [0.0, 1.0]",
            ));
        }
        if self.image_size != -1 && self.image_size < 1 {
            return Err(TuError::config(
                "image_size",
                "use -1 to keep the original size, or a value in [1, i32::MAX]",
            ));
        }
        if self.num_images != -1 && self.num_images < 1 {
            return Err(TuError::config(
                "num_images",
                "use -1 to extract all images, or a value in [1, <vertex count>]",
            ));
        }
        if !(1..=1024).contains(&self.patch_size) {
            return Err(TuError::config("patch_size", "supported range: [1, 1024]"));
        }
        if self.num_landmarks_per_map < 1 {
            return Err(TuError::config(
                "num_landmarks_per_map",
                "supported range: [1, <landmark count>]",
            ));
        }
        if self.num_samples_per_landmark < 1 {
            return Err(TuError::config(
                "num_samples_per_landmark",
                "supported range: [1, i32::MAX]",
            ));
        }
        if self.batch_cap < 1 {
            return Err(TuError::config("batch_cap", "must be at least 1"));
        }
        if self.mode == TuExtractionMode::Patches && self.strategy == TuStrategyKind::Plain {
            return Err(TuError::config(
                "strategy",
                "patch extraction requires the container strategy",
            ));
        }
        Ok(())
    }

    /// Output root for this run: the configured directory, or the source
    /// map's own location when the directory is left empty.
    pub fn resolve_output_root(&self, map: &dyn TuMapSource) -> Result<PathBuf> {
        if !self.output_dir.is_empty() {
            return Ok(PathBuf::from(&self.output_dir));
        }
        map.location().ok_or_else(|| {
            TuError::config(
                "output_dir",
                "empty, and the source map has no on-disk location to derive from",
            )
        })
    }

    /// Resize target tuple handed to the extractors.
    pub fn resize_target(&self) -> (i32, i32) {
        (self.image_size, self.image_size)
    }
}

/// Run-scoped output directory layout.
///
/// Each run creates a timestamp-named work directory inside the output
/// root, holding a training and a validation dataset directory that the
/// extractor strategies populate independently.
#[derive(Clone, Debug)]
pub struct TuWorkspace {
    work: PathBuf,
    training: PathBuf,
    validation: PathBuf,
}

impl TuWorkspace {
    /// Creates the work directory and its two dataset subdirectories.
    pub fn init(output_root: &Path) -> Result<Self> {
        let work = output_root.join(generate_work_dir_name());
        let training = work.join(keys::TRAINING_DIR);
        let validation = work.join(keys::VALIDATION_DIR);
        std::fs::create_dir_all(&training)?;
        std::fs::create_dir_all(&validation)?;
        Ok(TuWorkspace {
            work,
            training,
            validation,
        })
    }

    pub fn work_path(&self) -> &Path {
        &self.work
    }

    pub fn training_path(&self) -> &Path {
        &self.training
    }

    pub fn validation_path(&self) -> &Path {
        &self.validation
    }
}

/// Timestamp-based work directory name, e.g. `7-Aug-2026_14-3-52`.
fn generate_work_dir_name() -> String {
    chrono::Local::now()
        .format("%-d-%b-%Y_%-H-%-M-%-S")
        .to_string()
}
