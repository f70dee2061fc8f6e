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

//! # Tu Error Module
//!
//! This module defines the error types and utilities used throughout the Tu
//! framework for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Tu uses a structured error approach with the following principles:
//!
//! - **Explicit Error Types**: Each error variant represents a specific
//!   category of failure, making it easier to handle errors appropriately
//! - **Recoverable vs. Fatal**: `ResourceMissing` and `DimensionMismatch`
//!   are recovered locally (skip the item, keep the run alive); everything
//!   else propagates to the top-level run result
//! - **Stable Codes**: every variant maps to a stable string code so
//!   callers can distinguish user-configuration mistakes from runtime I/O
//!   failures without matching on the enum
//! - **Serde Support**: errors can be serialized for logging, persistence,
//!   and run reports
//!
//! ## Error Categories
//!
//! - **Config**: out-of-range configuration values, caught before any I/O
//! - **Selection**: requested sample/landmark count exceeds the population
//! - **ResourceMissing**: a vertex image could not be retrieved
//! - **DimensionMismatch**: a sample's shape disagrees with the buffer
//! - **EmptyDataset / Reshape / Write**: container serialization failures
//! - **Io / Serde / Image**: wrapped lower-level failures
//! - **Internal**: unexpected internal failures

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::TuDims;

/// Convenience result type used throughout Tu.
///
/// This is a type alias for `std::result::Result<T, TuError>` that provides
/// a more concise way to write function signatures that return Tu errors.
pub type Result<T> = std::result::Result<T, TuError>;

/// Canonical error enumeration for Tu.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum TuError {
    /// A configuration value is outside its documented range.
    ///
    /// Raised during validation, before any I/O is performed. The field
    /// name and the valid range are part of the message.
    #[error("invalid configuration field '{field}': {message}")]
    Config { field: String, message: String },

    /// The requested sample or landmark count exceeds the population.
    #[error("selection error: {message}")]
    Selection { message: String },

    /// A specific vertex's image could not be retrieved.
    ///
    /// Recovered locally by skipping the item; never fatal for a run.
    #[error("could not retrieve image resource for '{id}'")]
    ResourceMissing { id: String },

    /// A sample's shape disagrees with the buffer's established shape.
    ///
    /// Recovered locally by dropping the sample; never fatal for a run.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: TuDims, actual: TuDims },

    /// `write()` was invoked on a buffer holding zero samples.
    #[error("refusing to serialize an empty dataset")]
    EmptyDataset,

    /// The concatenated sample data does not form the expected 4-D array.
    #[error("reshape error: expected {expected} elements, found {actual}")]
    Reshape { expected: usize, actual: usize },

    /// Container serialization failed for the current flush.
    #[error("write error for '{path}': {message}")]
    Write { path: String, message: String },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Errors originating from pixel buffer handling or encoding.
    #[error("image error: {0}")]
    Image(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for TuError {
    fn from(err: io::Error) -> Self {
        TuError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TuError {
    fn from(err: serde_json::Error) -> Self {
        TuError::Serde(err.to_string())
    }
}

impl From<image::ImageError> for TuError {
    fn from(err: image::ImageError) -> Self {
        TuError::Image(err.to_string())
    }
}

impl TuError {
    /// Helper to construct configuration errors naming the offending field.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        TuError::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Helper to construct selection errors.
    pub fn selection<T: Into<String>>(message: T) -> Self {
        TuError::Selection {
            message: message.into(),
        }
    }

    /// Helper to construct missing-resource errors.
    pub fn resource_missing<T: Into<String>>(id: T) -> Self {
        TuError::ResourceMissing { id: id.into() }
    }

    /// Helper to construct write errors carrying the target path.
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        TuError::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Helper to construct image errors.
    pub fn image<T: Into<String>>(message: T) -> Self {
        TuError::Image(message.into())
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        TuError::Internal(message.into())
    }

    /// Stable string code identifying the error category.
    pub fn code(&self) -> &'static str {
        match self {
            TuError::Config { .. } => "config",
            TuError::Selection { .. } => "selection",
            TuError::ResourceMissing { .. } => "resource_missing",
            TuError::DimensionMismatch { .. } => "dimension_mismatch",
            TuError::EmptyDataset => "empty_dataset",
            TuError::Reshape { .. } => "reshape",
            TuError::Write { .. } => "write",
            TuError::Io(_) => "io",
            TuError::Serde(_) => "serde",
            TuError::Image(_) => "image",
            TuError::Internal(_) => "internal",
        }
    }

    /// Whether the error is a user mistake rather than a runtime failure.
    pub fn is_user_error(&self) -> bool {
        matches!(self, TuError::Config { .. } | TuError::Selection { .. })
    }
}
