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

//! # Sample Buffer Module
//!
//! In-memory accumulation of same-shaped samples ahead of a container
//! flush.
//!
//! The first sample added to a buffer establishes its `(channels, rows,
//! cols)` shape; every later sample must match exactly or the add is
//! rejected with no partial append. Samples and their keypoint lists are
//! kept in lock-step so the serialized sample index is the insertion
//! index. The buffer also owns the split policy: `reset()` clears the
//! contents, bumps the file counter, and recomputes the output path for
//! the next container file. The recorded shape survives `reset()`, so
//! shape enforcement spans every split of one logical dataset.

use std::path::{Path, PathBuf};

use crate::errors::{Result, TuError};
use crate::image::{TuDims, TuImage};
use crate::keypoint::TuKeypoint;
use crate::keys;

/// Accumulates same-shaped samples and their keypoint lists between
/// container flushes.
#[derive(Debug)]
pub struct TuSampleBuffer {
    dir_path: PathBuf,
    file_ending: String,
    split_size: i64,
    file_counter: u32,
    current_output_path: PathBuf,
    dims: Option<TuDims>,
    samples: Vec<TuImage>,
    keypoint_lists: Vec<Vec<TuKeypoint>>,
}

impl TuSampleBuffer {
    /// Creates a buffer writing into `dir_path`.
    ///
    /// `split_size <= 0` means the dataset never splits and every flush
    /// targets the same fixed filename; a positive value means the caller
    /// will `reset()` between flushes and each file gets an increasing
    /// counter suffix.
    pub fn new(dir_path: impl Into<PathBuf>, split_size: i64, file_ending: &str) -> Self {
        let dir_path = dir_path.into();
        let file_ending = file_ending.to_string();
        let current_output_path = Self::output_path(&dir_path, split_size, 0, &file_ending);
        TuSampleBuffer {
            dir_path,
            file_ending,
            split_size,
            file_counter: 0,
            current_output_path,
            dims: None,
            samples: Vec::new(),
            keypoint_lists: Vec::new(),
        }
    }

    /// Appends a sample and its keypoint list in lock-step.
    ///
    /// The first sample records the buffer shape unconditionally. Any
    /// later sample whose shape differs is rejected with
    /// [`TuError::DimensionMismatch`] and the buffer is left unchanged.
    pub fn add(&mut self, sample: TuImage, keypoints: Vec<TuKeypoint>) -> Result<()> {
        let dims = sample.dims();
        match self.dims {
            None => self.dims = Some(dims),
            Some(expected) if expected != dims => {
                return Err(TuError::DimensionMismatch {
                    expected,
                    actual: dims,
                });
            }
            Some(_) => {}
        }
        self.samples.push(sample);
        self.keypoint_lists.push(keypoints);
        Ok(())
    }

    /// Clears the contents and advances the split state.
    ///
    /// Bumps `file_counter` and recomputes the output path for the next
    /// file. The recorded shape is kept.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.keypoint_lists.clear();
        self.file_counter += 1;
        self.current_output_path = Self::output_path(
            &self.dir_path,
            self.split_size,
            self.file_counter,
            &self.file_ending,
        );
    }

    /// Current sample count.
    pub fn size(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Shape established by the first added sample, if any.
    pub fn dims(&self) -> Option<TuDims> {
        self.dims
    }

    pub fn split_size(&self) -> i64 {
        self.split_size
    }

    pub fn file_counter(&self) -> u32 {
        self.file_counter
    }

    /// Path the next `write()` will target.
    pub fn current_output_path(&self) -> &Path {
        &self.current_output_path
    }

    pub fn samples(&self) -> &[TuImage] {
        &self.samples
    }

    pub fn keypoint_lists(&self) -> &[Vec<TuKeypoint>] {
        &self.keypoint_lists
    }

    /// Whether any buffered sample carries a non-empty keypoint list.
    pub fn has_keypoints(&self) -> bool {
        self.keypoint_lists.iter().any(|list| !list.is_empty())
    }

    fn output_path(dir: &Path, split_size: i64, counter: u32, ending: &str) -> PathBuf {
        if split_size <= 0 {
            dir.join(format!("{}{}", keys::DATASET_STEM, ending))
        } else {
            dir.join(format!("{}_{}{}", keys::DATASET_STEM, counter, ending))
        }
    }
}
