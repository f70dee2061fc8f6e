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

//! # Extraction Pipeline Module
//!
//! Drives one extraction run end to end:
//!
//! `Idle -> Validating -> Selecting -> Extracting -> Flushing -> Done`,
//! with `Failed(reason)` reachable from `Validating` (bad configuration)
//! and `Selecting` (insufficient population).
//!
//! Validation range-checks the configuration before any I/O. Selection
//! picks the candidate ID set (vertices in map order for image mode,
//! uniformly shuffled landmarks for patch mode) and applies the
//! train/validation ratio split at `floor(r * N)`. Extraction drives the
//! configured strategy over each partition independently; the container
//! strategy flushes its batch before the run completes.
//!
//! The whole run is single-threaded, blocking, and run-to-completion;
//! there is no mid-run cancellation.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{TuExtractionConfig, TuExtractionMode, TuWorkspace};
use crate::errors::{Result, TuError};
use crate::extractor::{extractor_factory, TuExtractContext, TuExtractStats};
use crate::map::{TuKeypointDetector, TuMapSource};

/// Observable state of a pipeline instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuPipelineState {
    Idle,
    Validating,
    Selecting,
    Extracting,
    Flushing,
    Done,
    Failed(String),
}

/// Result of a completed run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TuRunReport {
    /// Extraction mode name (`images` / `patches`).
    pub mode: String,
    /// Strategy name (`plain` / `container`).
    pub strategy: String,
    /// Run-scoped work directory holding both dataset directories.
    pub work_dir: PathBuf,
    /// Outcomes of the training partition.
    pub training: TuExtractStats,
    /// Outcomes of the validation partition.
    pub validation: TuExtractStats,
}

impl TuRunReport {
    /// Combined outcomes of both partitions.
    pub fn combined(&self) -> TuExtractStats {
        let mut stats = self.training.clone();
        stats.merge(&self.validation);
        stats
    }

    /// Total samples persisted across both partitions.
    pub fn total_written(&self) -> usize {
        self.combined().written
    }
}

/// Selects the image-mode candidate set: all vertex IDs in map iteration
/// order, truncated to the first `num_images` (`-1` keeps all).
pub fn select_image_ids(map: &dyn TuMapSource, num_images: i32) -> Result<Vec<String>> {
    let mut ids = map.vertex_ids();
    let total = ids.len();
    let requested = if num_images == -1 {
        total
    } else {
        num_images as usize
    };
    if requested > total {
        return Err(TuError::selection(format!(
            "num_images: requested {} images but the map has {} vertices",
            requested, total
        )));
    }
    ids.truncate(requested);
    Ok(ids)
}

/// Selects the patch-mode candidate set: all landmark IDs, uniformly
/// shuffled with `seed` (OS entropy when `None`), truncated to `count`.
pub fn select_landmark_ids(
    map: &dyn TuMapSource,
    count: u64,
    seed: Option<u64>,
) -> Result<Vec<String>> {
    let mut ids = map.landmark_ids();
    let total = ids.len();
    let requested = count as usize;
    if requested > total {
        return Err(TuError::selection(format!(
            "num_landmarks_per_map: requested {} landmarks but the map has {}",
            requested, total
        )));
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    ids.shuffle(&mut rng);
    ids.truncate(requested);
    Ok(ids)
}

/// Splits an ordered (or already shuffled) ID sequence at
/// `floor(ratio * N)`: the first part is the training subset, the
/// remainder the validation subset.
pub fn split_train_validation(mut ids: Vec<String>, ratio: f64) -> (Vec<String>, Vec<String>) {
    let split_pos = (ratio * ids.len() as f64).floor() as usize;
    let split_pos = split_pos.min(ids.len());
    let validation = ids.split_off(split_pos);
    (ids, validation)
}

/// One extraction run over one map with one strategy.
pub struct TuExtractionPipeline {
    config: TuExtractionConfig,
    state: TuPipelineState,
}

impl TuExtractionPipeline {
    pub fn new(config: TuExtractionConfig) -> Self {
        TuExtractionPipeline {
            config,
            state: TuPipelineState::Idle,
        }
    }

    pub fn state(&self) -> &TuPipelineState {
        &self.state
    }

    pub fn config(&self) -> &TuExtractionConfig {
        &self.config
    }

    /// Runs the pipeline to completion.
    ///
    /// Fatal errors (configuration, selection, write failures) move the
    /// pipeline into `Failed` and propagate; per-item failures are
    /// recovered inside the extractors and surface only in the report.
    pub fn run(
        &mut self,
        map: &dyn TuMapSource,
        detector: &dyn TuKeypointDetector,
    ) -> Result<TuRunReport> {
        self.state = TuPipelineState::Validating;
        self.fallible(self.config.validate())?;
        log::info!(
            "extraction run: mode={} strategy={} greyscale={} trainval_ratio={}",
            self.config.mode.name(),
            self.config.strategy.name(),
            self.config.greyscale,
            self.config.trainval_ratio
        );

        self.state = TuPipelineState::Selecting;
        let selected = self.fallible(self.select(map))?;
        let (training_ids, validation_ids) =
            split_train_validation(selected, self.config.trainval_ratio);
        log::info!(
            "selected {} training and {} validation samples",
            training_ids.len(),
            validation_ids.len()
        );

        self.state = TuPipelineState::Extracting;
        let output_root = self.fallible(self.config.resolve_output_root(map))?;
        let workspace = self.fallible(TuWorkspace::init(&output_root))?;
        let ctx = TuExtractContext { map, detector };

        let training = self.fallible(self.run_partition(
            &ctx,
            &training_ids,
            workspace.training_path().to_path_buf(),
        ))?;
        let validation = self.fallible(self.run_partition(
            &ctx,
            &validation_ids,
            workspace.validation_path().to_path_buf(),
        ))?;

        // The strategies flush their final batches inside extract().
        self.state = TuPipelineState::Flushing;
        let report = TuRunReport {
            mode: self.config.mode.name().to_string(),
            strategy: self.config.strategy.name().to_string(),
            work_dir: workspace.work_path().to_path_buf(),
            training,
            validation,
        };

        self.state = TuPipelineState::Done;
        Ok(report)
    }

    /// Drives a fresh strategy instance over one partition. An empty
    /// partition produces empty stats and touches nothing on disk.
    fn run_partition(
        &self,
        ctx: &TuExtractContext<'_>,
        ids: &[String],
        out_dir: PathBuf,
    ) -> Result<TuExtractStats> {
        if ids.is_empty() {
            return Ok(TuExtractStats::default());
        }
        let mut extractor = extractor_factory(&self.config);
        extractor.extract(ctx, ids, &out_dir)
    }

    fn select(&self, map: &dyn TuMapSource) -> Result<Vec<String>> {
        match self.config.mode {
            TuExtractionMode::Images => select_image_ids(map, self.config.num_images),
            TuExtractionMode::Patches => select_landmark_ids(
                map,
                self.config.num_landmarks_per_map,
                self.config.seed,
            ),
        }
    }

    /// Records the failure reason in the state before propagating.
    fn fallible<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.state = TuPipelineState::Failed(e.to_string());
            log::error!("extraction failed ({}): {}", e.code(), e);
        }
        result
    }
}
