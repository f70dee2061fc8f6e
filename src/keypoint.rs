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

//! # Keypoint Module
//!
//! Detected 2-D feature locations attached to samples. Field conventions
//! follow the usual detector output: pixel coordinates with +x right and
//! +y down, a scale in pixel units, an orientation angle, and the detector
//! response magnitude.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TuError};

/// A detected feature location associated with exactly one sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuKeypoint {
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate.
    pub y: f32,
    /// Extent of the keypoint in pixel units.
    pub scale: f32,
    /// Orientation angle.
    pub orientation: f32,
    /// Magnitude of response from the detector.
    pub response: f32,
}

/// Bytes one keypoint occupies in the container wire format (5 x f32 LE).
pub const KEYPOINT_WIRE_SIZE: usize = 20;

impl TuKeypoint {
    pub fn new(x: f32, y: f32, scale: f32, orientation: f32, response: f32) -> Self {
        TuKeypoint {
            x,
            y,
            scale,
            orientation,
            response,
        }
    }

    /// Appends the little-endian wire encoding to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.scale.to_le_bytes());
        out.extend_from_slice(&self.orientation.to_le_bytes());
        out.extend_from_slice(&self.response.to_le_bytes());
    }

    /// Decodes one keypoint from a [`KEYPOINT_WIRE_SIZE`]-byte slice.
    pub fn decode(bytes: &[u8]) -> Result<TuKeypoint> {
        if bytes.len() != KEYPOINT_WIRE_SIZE {
            return Err(TuError::internal(format!(
                "keypoint record must be {} bytes, got {}",
                KEYPOINT_WIRE_SIZE,
                bytes.len()
            )));
        }
        let field = |i: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            f32::from_le_bytes(buf)
        };
        Ok(TuKeypoint {
            x: field(0),
            y: field(1),
            scale: field(2),
            orientation: field(3),
            response: field(4),
        })
    }
}
