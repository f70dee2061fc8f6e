//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Tu.
//! The Tu project belongs to the Dunimd project team.
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

//! # Extractor Module
//!
//! The two persistence strategies an extraction run can drive.
//!
//! [`TuPlainFileExtractor`] writes one standalone image file per sample.
//! [`TuContainerExtractor`] buffers samples and their detected keypoints
//! into a [`TuSampleBuffer`] and flushes the batch into a container file.
//! Both share the same capability set: `extract`, `file_ending`, `name`,
//! and `resize`, expressed as the [`TuExtractor`] trait.
//!
//! Per-item failures never abort a run. A vertex whose image cannot be
//! retrieved is skipped with a warning; a sample whose shape disagrees
//! with the batch is dropped with a warning. Both outcomes are counted in
//! [`TuExtractStats`] instead of being silently swallowed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::TuSampleBuffer;
use crate::config::{TuExtractionConfig, TuExtractionMode, TuStrategyKind};
use crate::container::TuDatasetWriter;
use crate::errors::{Result, TuError};
use crate::image::TuImage;
use crate::keys;
use crate::map::{TuKeypointDetector, TuMapSource, REFERENCE_FRAME};

/// Capabilities an extractor needs from its collaborators.
pub struct TuExtractContext<'a> {
    pub map: &'a dyn TuMapSource,
    pub detector: &'a dyn TuKeypointDetector,
}

/// Per-item outcomes accumulated over one `extract` call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuExtractStats {
    /// Samples successfully persisted.
    pub written: usize,
    /// Selection items skipped because their image could not be retrieved.
    pub skipped: usize,
    /// Samples dropped because their shape disagreed with the batch.
    pub dropped: usize,
    /// Selection items left unprocessed because the batch cap was reached.
    pub truncated: usize,
    /// Files created on disk.
    pub files_created: usize,
}

impl TuExtractStats {
    /// Folds another stats block into this one.
    pub fn merge(&mut self, other: &TuExtractStats) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.dropped += other.dropped;
        self.truncated += other.truncated;
        self.files_created += other.files_created;
    }
}

/// Strategy interface shared by the two extractor variants.
pub trait TuExtractor {
    /// Human-readable strategy name, composed from the extraction base
    /// name and the variant suffix.
    fn name(&self) -> String;

    /// File ending of the artifacts this strategy produces.
    fn file_ending(&self) -> &'static str;

    /// Resizes a sample according to a `(width, height)` target;
    /// `(-1, -1)` keeps the original dimensions.
    fn resize(&self, image: &TuImage, target: (i32, i32)) -> Result<TuImage> {
        image.resize(target)
    }

    /// Drives the strategy over `selection`, persisting into `out_dir`.
    fn extract(
        &mut self,
        ctx: &TuExtractContext<'_>,
        selection: &[String],
        out_dir: &Path,
    ) -> Result<TuExtractStats>;
}

/// Fetches the reference frame of `vertex`, treating retrieval errors and
/// the zero-row sentinel alike as a missing resource.
fn fetch_reference_frame(map: &dyn TuMapSource, vertex: &str, greyscale: bool) -> Option<TuImage> {
    let fetched = if greyscale {
        map.raw_image(vertex, REFERENCE_FRAME)
    } else {
        map.raw_color_image(vertex, REFERENCE_FRAME)
    };
    match fetched {
        Ok(image) if !image.is_empty() => Some(image),
        _ => None,
    }
}

/// Writes each sample as an individually named image file.
#[derive(Debug)]
pub struct TuPlainFileExtractor {
    greyscale: bool,
    target_size: (i32, i32),
    sequence: usize,
}

impl TuPlainFileExtractor {
    pub fn new(greyscale: bool, target_size: (i32, i32)) -> Self {
        TuPlainFileExtractor {
            greyscale,
            target_size,
            sequence: 0,
        }
    }
}

impl TuExtractor for TuPlainFileExtractor {
    fn name(&self) -> String {
        format!("{}plain_", keys::EXTRACTION_NAME)
    }

    fn file_ending(&self) -> &'static str {
        ".jpg"
    }

    /// Writes `img_<seq><ext>` files into `out_dir`, one per selection
    /// item whose image could be retrieved. The sequence number advances
    /// only on successful writes, so skipped items leave no gaps in the
    /// file names.
    fn extract(
        &mut self,
        ctx: &TuExtractContext<'_>,
        selection: &[String],
        out_dir: &Path,
    ) -> Result<TuExtractStats> {
        let mut stats = TuExtractStats::default();
        std::fs::create_dir_all(out_dir)?;

        for id in selection {
            let Some(image) = fetch_reference_frame(ctx.map, id, self.greyscale) else {
                log::warn!(
                    "could not extract image of vertex '{}', resources missing?",
                    id
                );
                stats.skipped += 1;
                continue;
            };
            let image = self.resize(&image, self.target_size)?;
            let path = out_dir.join(format!("img_{}{}", self.sequence, self.file_ending()));
            image
                .save(&path)
                .map_err(|e| TuError::write(path.display().to_string(), e.to_string()))?;
            self.sequence += 1;
            stats.written += 1;
            stats.files_created += 1;
        }

        log::info!(
            "extracted {} images to {} ({} skipped)",
            stats.written,
            out_dir.display(),
            stats.skipped
        );
        Ok(stats)
    }
}

/// Which samples the container strategy buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuSampleKind {
    /// One sample per vertex: its resized reference frame.
    Frames,
    /// Patch samples cropped around landmark observations.
    Patches {
        patch_size: u32,
        samples_per_landmark: usize,
    },
}

/// Buffers samples plus detected keypoints and flushes them as container
/// files.
pub struct TuContainerExtractor {
    greyscale: bool,
    target_size: (i32, i32),
    batch_cap: usize,
    kind: TuSampleKind,
    split_size: i64,
    buffer: Option<TuSampleBuffer>,
    writer: TuDatasetWriter,
}

impl TuContainerExtractor {
    pub fn new(
        greyscale: bool,
        target_size: (i32, i32),
        batch_cap: usize,
        kind: TuSampleKind,
        split_size: i64,
    ) -> Self {
        TuContainerExtractor {
            greyscale,
            target_size,
            batch_cap,
            kind,
            split_size,
            buffer: None,
            writer: TuDatasetWriter::new(),
        }
    }

    /// Buffers one vertex frame, counting skips and drops in `stats`.
    fn buffer_frame(
        &mut self,
        ctx: &TuExtractContext<'_>,
        id: &str,
        stats: &mut TuExtractStats,
    ) -> Result<()> {
        let Some(image) = fetch_reference_frame(ctx.map, id, self.greyscale) else {
            log::warn!(
                "could not extract image of vertex '{}', resources missing?",
                id
            );
            stats.skipped += 1;
            return Ok(());
        };
        let image = image.resize(self.target_size)?;
        let keypoints = ctx.detector.detect(&image);
        let buffer = self.buffer.as_mut().expect("buffer initialized");
        match buffer.add(image, keypoints) {
            Ok(()) => {}
            Err(TuError::DimensionMismatch { expected, actual }) => {
                log::warn!(
                    "dropping sample of vertex '{}': shape {} does not match batch shape {}",
                    id,
                    actual,
                    expected
                );
                stats.dropped += 1;
            }
            Err(other) => return Err(other),
        }
        Ok(())
    }

    /// Buffers up to `samples_per_landmark` patches for one landmark.
    fn buffer_patches(
        &mut self,
        ctx: &TuExtractContext<'_>,
        id: &str,
        patch_size: u32,
        samples_per_landmark: usize,
        stats: &mut TuExtractStats,
    ) -> Result<()> {
        let observations = ctx.map.observations(id);
        if observations.is_empty() {
            log::warn!("landmark '{}' has no observations, skipping", id);
            stats.skipped += 1;
            return Ok(());
        }
        for observation in observations.iter().take(samples_per_landmark) {
            if self.buffered() >= self.batch_cap {
                break;
            }
            let Some(frame) = fetch_reference_frame(ctx.map, &observation.vertex, self.greyscale)
            else {
                log::warn!(
                    "could not extract image of vertex '{}' observing landmark '{}'",
                    observation.vertex,
                    id
                );
                stats.skipped += 1;
                continue;
            };
            let patch = match frame.crop_square(observation.x, observation.y, patch_size) {
                Ok(patch) => patch,
                Err(e) => {
                    log::warn!("cannot crop patch for landmark '{}': {}", id, e);
                    stats.skipped += 1;
                    continue;
                }
            };
            let keypoints = ctx.detector.detect(&patch);
            let buffer = self.buffer.as_mut().expect("buffer initialized");
            match buffer.add(patch, keypoints) {
                Ok(()) => {}
                Err(TuError::DimensionMismatch { expected, actual }) => {
                    log::warn!(
                        "dropping patch of landmark '{}': shape {} does not match batch shape {}",
                        id,
                        actual,
                        expected
                    );
                    stats.dropped += 1;
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn buffered(&self) -> usize {
        self.buffer.as_ref().map(TuSampleBuffer::size).unwrap_or(0)
    }
}

impl TuExtractor for TuContainerExtractor {
    fn name(&self) -> String {
        format!("{}container_", keys::EXTRACTION_NAME)
    }

    fn file_ending(&self) -> &'static str {
        ".tuc"
    }

    /// Buffers samples for `selection` up to the batch cap, then flushes
    /// the batch exactly once.
    ///
    /// Selection items left unprocessed when the cap is reached are
    /// reported via `truncated`. A call whose batch ends up empty (every
    /// item skipped) performs no flush and creates no file.
    fn extract(
        &mut self,
        ctx: &TuExtractContext<'_>,
        selection: &[String],
        out_dir: &Path,
    ) -> Result<TuExtractStats> {
        let split_size = self.split_size;
        let ending = self.file_ending();
        self.buffer
            .get_or_insert_with(|| TuSampleBuffer::new(out_dir, split_size, ending));

        let mut stats = TuExtractStats::default();
        for (position, id) in selection.iter().enumerate() {
            if self.buffered() >= self.batch_cap {
                stats.truncated = selection.len() - position;
                log::warn!(
                    "batch cap of {} samples reached, {} selection items not processed",
                    self.batch_cap,
                    stats.truncated
                );
                break;
            }
            match self.kind {
                TuSampleKind::Frames => self.buffer_frame(ctx, id, &mut stats)?,
                TuSampleKind::Patches {
                    patch_size,
                    samples_per_landmark,
                } => self.buffer_patches(
                    ctx,
                    id,
                    patch_size,
                    samples_per_landmark,
                    &mut stats,
                )?,
            }
        }

        let buffer = self.buffer.as_mut().expect("buffer initialized");
        if buffer.is_empty() {
            log::warn!("no samples buffered for {}, skipping flush", out_dir.display());
            return Ok(stats);
        }
        let write_stats = self.writer.write(buffer)?;
        stats.written = write_stats.samples_written;
        stats.files_created += 1;
        buffer.reset();
        Ok(stats)
    }
}

/// Builds the strategy the configuration selects.
pub fn extractor_factory(config: &TuExtractionConfig) -> Box<dyn TuExtractor> {
    match config.strategy {
        TuStrategyKind::Plain => Box::new(TuPlainFileExtractor::new(
            config.greyscale,
            config.resize_target(),
        )),
        TuStrategyKind::Container => {
            let kind = match config.mode {
                TuExtractionMode::Images => TuSampleKind::Frames,
                TuExtractionMode::Patches => TuSampleKind::Patches {
                    patch_size: config.patch_size as u32,
                    samples_per_landmark: config.num_samples_per_landmark as usize,
                },
            };
            Box::new(TuContainerExtractor::new(
                config.greyscale,
                config.resize_target(),
                config.batch_cap,
                kind,
                config.split_size,
            ))
        }
    }
}
