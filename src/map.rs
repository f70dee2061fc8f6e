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

//! # Map Source Module
//!
//! Capability traits the extraction pipeline consumes, plus in-memory
//! reference implementations.
//!
//! The pipeline never talks to a concrete map backend; it sees a
//! [`TuMapSource`] for vertex/landmark enumeration and raw image retrieval
//! and a [`TuKeypointDetector`] for feature detection. Backends adapt their
//! own storage behind these traits. [`TuMemoryMap`] and [`TuGridDetector`]
//! are the reference implementations used by the test suite and by callers
//! who want to exercise the pipeline without a real map.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TuError};
use crate::image::TuImage;
use crate::keypoint::TuKeypoint;

/// Identifier of a pose/observation node in the source map.
pub type TuVertexId = String;

/// Identifier of a triangulated 3-D point in the source map.
pub type TuLandmarkId = String;

/// Camera frame index used as the reference view for every vertex.
pub const REFERENCE_FRAME: u32 = 0;

/// One observation of a landmark: the observing vertex and the pixel
/// location of the landmark in that vertex's reference frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuObservation {
    pub vertex: TuVertexId,
    pub x: f32,
    pub y: f32,
}

impl TuObservation {
    pub fn new(vertex: impl Into<TuVertexId>, x: f32, y: f32) -> Self {
        TuObservation {
            vertex: vertex.into(),
            x,
            y,
        }
    }
}

/// Read access to a loaded vision map.
///
/// `vertex_ids` and `landmark_ids` must return IDs in the map's stable
/// iteration order; image-mode selection truncates that order directly.
pub trait TuMapSource {
    fn vertex_ids(&self) -> Vec<TuVertexId>;

    fn landmark_ids(&self) -> Vec<TuLandmarkId>;

    /// Greyscale frame of `vertex` at `frame`.
    fn raw_image(&self, vertex: &str, frame: u32) -> Result<TuImage>;

    /// Color frame of `vertex` at `frame`.
    fn raw_color_image(&self, vertex: &str, frame: u32) -> Result<TuImage>;

    /// Observations of `landmark`, one per observing vertex.
    fn observations(&self, landmark: &str) -> Vec<TuObservation>;

    /// On-disk folder of the source map, when it has one. Used as the
    /// default output location when no `output_dir` is configured.
    fn location(&self) -> Option<PathBuf> {
        None
    }
}

/// Feature detection over a single image.
pub trait TuKeypointDetector {
    fn detect(&self, image: &TuImage) -> Vec<TuKeypoint>;
}

struct MemoryVertex {
    grey: Option<TuImage>,
    color: Option<TuImage>,
}

/// In-memory [`TuMapSource`] reference implementation.
///
/// Vertices and landmarks enumerate in insertion order. A vertex inserted
/// without frames models a missing resource: retrieval returns
/// [`TuError::ResourceMissing`], which extractors recover from by skipping.
#[derive(Default)]
pub struct TuMemoryMap {
    order: Vec<TuVertexId>,
    vertices: HashMap<TuVertexId, MemoryVertex>,
    landmark_order: Vec<TuLandmarkId>,
    landmarks: HashMap<TuLandmarkId, Vec<TuObservation>>,
    location: Option<PathBuf>,
}

impl TuMemoryMap {
    pub fn new() -> Self {
        TuMemoryMap::default()
    }

    /// Registers a vertex with its greyscale and color reference frames.
    pub fn insert_vertex(
        &mut self,
        id: impl Into<TuVertexId>,
        grey: Option<TuImage>,
        color: Option<TuImage>,
    ) {
        let id = id.into();
        self.order.push(id.clone());
        self.vertices.insert(id, MemoryVertex { grey, color });
    }

    /// Registers a landmark with its observations.
    pub fn insert_landmark(&mut self, id: impl Into<TuLandmarkId>, observations: Vec<TuObservation>) {
        let id = id.into();
        self.landmark_order.push(id.clone());
        self.landmarks.insert(id, observations);
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    fn frame(&self, vertex: &str, frame: u32, color: bool) -> Result<TuImage> {
        if frame != REFERENCE_FRAME {
            return Err(TuError::resource_missing(format!("{}#{}", vertex, frame)));
        }
        let slot = self
            .vertices
            .get(vertex)
            .ok_or_else(|| TuError::resource_missing(vertex))?;
        let img = if color { &slot.color } else { &slot.grey };
        img.clone().ok_or_else(|| TuError::resource_missing(vertex))
    }
}

impl TuMapSource for TuMemoryMap {
    fn vertex_ids(&self) -> Vec<TuVertexId> {
        self.order.clone()
    }

    fn landmark_ids(&self) -> Vec<TuLandmarkId> {
        self.landmark_order.clone()
    }

    fn raw_image(&self, vertex: &str, frame: u32) -> Result<TuImage> {
        self.frame(vertex, frame, false)
    }

    fn raw_color_image(&self, vertex: &str, frame: u32) -> Result<TuImage> {
        self.frame(vertex, frame, true)
    }

    fn observations(&self, landmark: &str) -> Vec<TuObservation> {
        self.landmarks.get(landmark).cloned().unwrap_or_default()
    }

    fn location(&self) -> Option<PathBuf> {
        self.location.clone()
    }
}

/// Deterministic [`TuKeypointDetector`] reference implementation.
///
/// Emits one keypoint every `step` pixels on a regular grid, up to `max`
/// detections per image. Deterministic output makes container keypoint
/// entries reproducible in tests.
pub struct TuGridDetector {
    step: u32,
    max: usize,
}

impl TuGridDetector {
    pub fn new(step: u32, max: usize) -> Self {
        TuGridDetector {
            step: step.max(1),
            max,
        }
    }
}

impl TuKeypointDetector for TuGridDetector {
    fn detect(&self, image: &TuImage) -> Vec<TuKeypoint> {
        let mut found = Vec::new();
        let mut y = self.step;
        while y < image.rows() {
            let mut x = self.step;
            while x < image.cols() {
                if found.len() >= self.max {
                    return found;
                }
                found.push(TuKeypoint::new(
                    x as f32,
                    y as f32,
                    self.step as f32,
                    0.0,
                    1.0,
                ));
                x += self.step;
            }
            y += self.step;
        }
        found
    }
}

/// Detector that never reports a keypoint. Plain image datasets use it to
/// keep containers free of keypoint entries.
pub struct TuNullDetector;

impl TuKeypointDetector for TuNullDetector {
    fn detect(&self, _image: &TuImage) -> Vec<TuKeypoint> {
        Vec::new()
    }
}
