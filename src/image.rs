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

//! # Image Module
//!
//! Raw 8-bit image tensors as they flow through the extraction pipeline.
//!
//! A [`TuImage`] is a row-major, channel-interleaved pixel block with a
//! fixed `(channels, rows, cols)` shape. Greyscale frames use one channel,
//! color frames three. An image with zero rows is the sentinel for a failed
//! retrieval from the map backend and is skipped by every extractor.
//!
//! Resizing stretches to the exact target dimensions regardless of the
//! source aspect ratio (no letterboxing); cropping clamps the window so a
//! patch around a border keypoint still lies fully inside the frame.

use image::imageops::{self, FilterType};
use image::{ExtendedColorType, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::errors::{Result, TuError};

/// Fixed shape of a sample: channel count, pixel rows, pixel columns.
///
/// The first sample added to a buffer establishes the dims for the whole
/// dataset; every later sample must match exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuDims {
    pub channels: u32,
    pub rows: u32,
    pub cols: u32,
}

impl TuDims {
    pub fn new(channels: u32, rows: u32, cols: u32) -> Self {
        TuDims {
            channels,
            rows,
            cols,
        }
    }

    /// Number of u8 elements a single sample of this shape occupies.
    pub fn element_count(&self) -> usize {
        self.channels as usize * self.rows as usize * self.cols as usize
    }
}

impl fmt::Display for TuDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.rows, self.cols)
    }
}

/// Raw image tensor with interleaved 8-bit pixel data.
///
/// Data layout is row-major, `[row][col][channel]`, matching the per-sample
/// layout of the container data block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuImage {
    channels: u32,
    rows: u32,
    cols: u32,
    data: Vec<u8>,
}

impl TuImage {
    /// Constructs an image, validating that the data length matches the shape.
    pub fn new(channels: u32, rows: u32, cols: u32, data: Vec<u8>) -> Result<Self> {
        let expected = channels as usize * rows as usize * cols as usize;
        if data.len() != expected {
            return Err(TuError::image(format!(
                "pixel data length {} does not match shape {}x{}x{}",
                data.len(),
                channels,
                rows,
                cols
            )));
        }
        Ok(TuImage {
            channels,
            rows,
            cols,
            data,
        })
    }

    /// Constructs an image with every byte set to `value`. Test fixtures
    /// and reference map sources use this to fabricate frames.
    pub fn filled(channels: u32, rows: u32, cols: u32, value: u8) -> Self {
        TuImage {
            channels,
            rows,
            cols,
            data: vec![value; channels as usize * rows as usize * cols as usize],
        }
    }

    /// The zero-row sentinel representing a failed retrieval.
    pub fn empty() -> Self {
        TuImage {
            channels: 0,
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }

    /// Whether this image is the failed-retrieval sentinel.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn dims(&self) -> TuDims {
        TuDims::new(self.channels, self.rows, self.cols)
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Interleaved channel values of the pixel at `(row, col)`.
    pub fn pixel(&self, row: u32, col: u32) -> &[u8] {
        let c = self.channels as usize;
        let offset = (row as usize * self.cols as usize + col as usize) * c;
        &self.data[offset..offset + c]
    }

    /// Resizes according to a `(width, height)` target.
    ///
    /// A target of `(-1, -1)` keeps the original dimensions. Any other
    /// target stretches to exactly `width x height` pixels regardless of
    /// the source aspect ratio.
    pub fn resize(&self, target: (i32, i32)) -> Result<TuImage> {
        if target == (-1, -1) {
            return Ok(self.clone());
        }
        let (width, height) = target;
        if width < 1 || height < 1 {
            return Err(TuError::image(format!(
                "invalid resize target {}x{}",
                width, height
            )));
        }
        self.resized(width as u32, height as u32)
    }

    /// Stretches to exactly `width x height` pixels.
    pub fn resized(&self, width: u32, height: u32) -> Result<TuImage> {
        if self.is_empty() {
            return Err(TuError::image("cannot resize an empty image"));
        }
        if width == self.cols && height == self.rows {
            return Ok(self.clone());
        }
        match self.channels {
            1 => {
                let img = GrayImage::from_raw(self.cols, self.rows, self.data.clone())
                    .ok_or_else(|| TuError::image("greyscale buffer shape mismatch"))?;
                let out = imageops::resize(&img, width, height, FilterType::Triangle);
                TuImage::new(1, height, width, out.into_raw())
            }
            3 => {
                let img = RgbImage::from_raw(self.cols, self.rows, self.data.clone())
                    .ok_or_else(|| TuError::image("color buffer shape mismatch"))?;
                let out = imageops::resize(&img, width, height, FilterType::Triangle);
                TuImage::new(3, height, width, out.into_raw())
            }
            other => Err(TuError::image(format!(
                "unsupported channel count {} for resize",
                other
            ))),
        }
    }

    /// Crops a `size x size` window centered on `(cx, cy)`.
    ///
    /// The window is shifted as needed so it lies fully inside the frame;
    /// keypoints near a border therefore still yield a full-size patch.
    /// Fails if the frame itself is smaller than `size` in either axis.
    pub fn crop_square(&self, cx: f32, cy: f32, size: u32) -> Result<TuImage> {
        if size == 0 {
            return Err(TuError::image("crop size must be positive"));
        }
        if self.cols < size || self.rows < size {
            return Err(TuError::image(format!(
                "frame {}x{} smaller than crop size {}",
                self.cols, self.rows, size
            )));
        }
        let half = (size / 2) as i64;
        let x0 = (cx.round() as i64 - half).clamp(0, (self.cols - size) as i64) as u32;
        let y0 = (cy.round() as i64 - half).clamp(0, (self.rows - size) as i64) as u32;

        let c = self.channels as usize;
        let row_bytes = size as usize * c;
        let mut data = Vec::with_capacity(row_bytes * size as usize);
        for row in y0..y0 + size {
            let start = (row as usize * self.cols as usize + x0 as usize) * c;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        TuImage::new(self.channels, size, size, data)
    }

    /// Encodes the image to `path`; the format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        if self.is_empty() {
            return Err(TuError::image("cannot save an empty image"));
        }
        let color = match self.channels {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            other => {
                return Err(TuError::image(format!(
                    "unsupported channel count {} for encoding",
                    other
                )))
            }
        };
        image::save_buffer(path, &self.data, self.cols, self.rows, color)?;
        Ok(())
    }
}
