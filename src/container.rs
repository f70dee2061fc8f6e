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

//! # Container Module
//!
//! The self-describing binary container format and its writer/reader.
//!
//! ## Layout
//!
//! Little-endian throughout. A container file is the 4-byte magic `TUDS`,
//! a `u16` format version, and a sequence of named entries. Each entry is
//! `name_len: u16`, the UTF-8 name, `payload_len: u64`, and the payload
//! bytes. Entries appear in a fixed order:
//!
//! | entry                    | payload                                       |
//! |--------------------------|-----------------------------------------------|
//! | `dims`                   | 3 x u32: channels, rows, cols                 |
//! | `num_data`               | u64 sample count                              |
//! | `data/data`              | `num_data * rows * cols * channels` bytes, sample-major `[n][row][col][channel]` |
//! | `keypoints/keypoints<i>` | u64 count, then count x 5 x f32 records; one entry per sample index with detections, ascending |
//! | `checksum`               | u64 xxh3-64 of every preceding byte           |
//!
//! ## Write discipline
//!
//! A flush is always a full rewrite of the buffer's current contents,
//! never an append. Bytes are assembled in memory, written to a hidden
//! temp file next to the target, and renamed into place only after a
//! successful flush, so a failed write never leaves a partial container
//! at the destination. The empty-dataset check happens before any file
//! is created.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::buffer::TuSampleBuffer;
use crate::errors::{Result, TuError};
use crate::image::{TuDims, TuImage};
use crate::keypoint::{TuKeypoint, KEYPOINT_WIRE_SIZE};
use crate::keys;

/// Statistics about one container flush.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuWriteStats {
    /// Number of samples serialized.
    pub samples_written: usize,
    /// Total number of bytes written.
    pub bytes_written: usize,
    /// Number of keypoint entries emitted.
    pub keypoint_entries: usize,
}

/// Serializes a [`TuSampleBuffer`] to its current output path.
#[derive(Debug, Default)]
pub struct TuDatasetWriter;

impl TuDatasetWriter {
    pub fn new() -> Self {
        TuDatasetWriter
    }

    /// Writes the buffer's current contents as one container file.
    ///
    /// Fails with [`TuError::EmptyDataset`] before creating any file when
    /// the buffer holds zero samples. Does not clear the buffer; callers
    /// start a new split by calling [`TuSampleBuffer::reset`] afterwards.
    pub fn write(&self, buffer: &TuSampleBuffer) -> Result<TuWriteStats> {
        if buffer.is_empty() {
            return Err(TuError::EmptyDataset);
        }
        let dims = buffer
            .dims()
            .ok_or_else(|| TuError::internal("non-empty buffer without recorded dims"))?;

        let bytes = encode_container(dims, buffer.samples(), buffer.keypoint_lists())?;
        let path = buffer.current_output_path();
        self.write_atomic(path, &bytes)?;

        let keypoint_entries = buffer
            .keypoint_lists()
            .iter()
            .filter(|list| !list.is_empty())
            .count();
        log::info!(
            "flushed {} samples ({} bytes, {} keypoint entries) to {}",
            buffer.size(),
            bytes.len(),
            keypoint_entries,
            path.display()
        );
        Ok(TuWriteStats {
            samples_written: buffer.size(),
            bytes_written: bytes.len(),
            keypoint_entries,
        })
    }

    /// Writes `bytes` to a hidden temp file and renames it over `path`.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| TuError::write(path.display().to_string(), e.to_string()))?;
        let temp_path = temp_path(path);

        let result = (|| -> std::io::Result<()> {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
            Ok(())
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(TuError::write(path.display().to_string(), e.to_string()));
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(TuError::write(path.display().to_string(), e.to_string()));
        }
        Ok(())
    }
}

/// Generates the hidden temp path used for atomic writes.
fn temp_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{}.tmp", stem))
}

/// Assembles the full container byte image for one flush.
fn encode_container(
    dims: TuDims,
    samples: &[TuImage],
    keypoint_lists: &[Vec<TuKeypoint>],
) -> Result<Vec<u8>> {
    let num_data = samples.len() as u64;

    let expected = samples.len() * dims.element_count();
    let mut data = Vec::with_capacity(expected);
    for sample in samples {
        data.extend_from_slice(sample.data());
    }
    // Unreachable given the buffer invariant, but checked, not assumed.
    if data.len() != expected {
        return Err(TuError::Reshape {
            expected,
            actual: data.len(),
        });
    }

    let mut out = Vec::with_capacity(expected + 256);
    out.extend_from_slice(keys::CONTAINER_MAGIC);
    out.extend_from_slice(&keys::CONTAINER_VERSION.to_le_bytes());

    let mut dims_payload = Vec::with_capacity(12);
    dims_payload.extend_from_slice(&dims.channels.to_le_bytes());
    dims_payload.extend_from_slice(&dims.rows.to_le_bytes());
    dims_payload.extend_from_slice(&dims.cols.to_le_bytes());
    push_entry(&mut out, keys::DIMS, &dims_payload);
    push_entry(&mut out, keys::NUM_DATA, &num_data.to_le_bytes());
    push_entry(&mut out, keys::DATA, &data);

    for (index, list) in keypoint_lists.iter().enumerate() {
        if list.is_empty() {
            continue;
        }
        let mut payload = Vec::with_capacity(8 + list.len() * KEYPOINT_WIRE_SIZE);
        payload.extend_from_slice(&(list.len() as u64).to_le_bytes());
        for keypoint in list {
            keypoint.encode(&mut payload);
        }
        let name = format!("{}{}", keys::KEYPOINTS_PREFIX, index);
        push_entry(&mut out, &name, &payload);
    }

    let checksum = xxh3_64(&out);
    push_entry(&mut out, keys::CHECKSUM, &checksum.to_le_bytes());
    Ok(out)
}

fn push_entry(out: &mut Vec<u8>, name: &str, payload: &[u8]) {
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
}

/// Parsed contents of one container file.
///
/// Reconstructs everything a flush serialized: the shape header, the
/// sample count, per-sample pixel slices, and the sparse keypoint map.
#[derive(Debug, Clone, PartialEq)]
pub struct TuContainer {
    dims: TuDims,
    num_data: u64,
    data: Vec<u8>,
    keypoints: BTreeMap<u64, Vec<TuKeypoint>>,
}

impl TuContainer {
    pub fn dims(&self) -> TuDims {
        self.dims
    }

    pub fn num_data(&self) -> u64 {
        self.num_data
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel block of the sample at `index`.
    pub fn sample(&self, index: usize) -> Option<&[u8]> {
        if index as u64 >= self.num_data {
            return None;
        }
        let len = self.dims.element_count();
        Some(&self.data[index * len..(index + 1) * len])
    }

    /// Keypoints recorded for the sample at `index`, if any.
    pub fn keypoints_for(&self, index: u64) -> Option<&[TuKeypoint]> {
        self.keypoints.get(&index).map(|v| v.as_slice())
    }

    /// Sample indices that carry keypoint entries, ascending.
    pub fn keypoint_indices(&self) -> Vec<u64> {
        self.keypoints.keys().copied().collect()
    }
}

/// Reads container files back into memory, verifying integrity.
#[derive(Debug, Default)]
pub struct TuContainerReader;

impl TuContainerReader {
    pub fn new() -> Self {
        TuContainerReader
    }

    /// Reads and verifies the container at `path`.
    ///
    /// Rejects bad magic, unsupported versions, truncated entries, and
    /// checksum mismatches.
    pub fn read(&self, path: &Path) -> Result<TuContainer> {
        let bytes = fs::read(path)?;
        self.parse(&bytes)
    }

    fn parse(&self, bytes: &[u8]) -> Result<TuContainer> {
        if bytes.len() < 6 || &bytes[0..4] != keys::CONTAINER_MAGIC {
            return Err(TuError::Serde("container: bad magic".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != keys::CONTAINER_VERSION {
            return Err(TuError::Serde(format!(
                "container: unsupported version {}",
                version
            )));
        }

        let mut entries: Vec<(String, &[u8])> = Vec::new();
        let mut cursor = 6usize;
        let mut checksum_ok = false;
        while cursor < bytes.len() {
            let entry_start = cursor;
            let (name, payload, next) = read_entry(bytes, cursor)?;
            cursor = next;
            if name == keys::CHECKSUM {
                if payload.len() != 8 {
                    return Err(TuError::Serde("container: malformed checksum entry".into()));
                }
                let mut buf = [0u8; 8];
                buf.copy_from_slice(payload);
                let stored = u64::from_le_bytes(buf);
                if xxh3_64(&bytes[..entry_start]) != stored {
                    return Err(TuError::Serde("container: checksum mismatch".into()));
                }
                if cursor != bytes.len() {
                    return Err(TuError::Serde(
                        "container: trailing bytes after checksum".into(),
                    ));
                }
                checksum_ok = true;
            } else {
                entries.push((name, payload));
            }
        }
        if !checksum_ok {
            return Err(TuError::Serde("container: missing checksum entry".into()));
        }

        let dims_payload = find_entry(&entries, keys::DIMS)?;
        if dims_payload.len() != 12 {
            return Err(TuError::Serde("container: malformed dims entry".into()));
        }
        let dims = TuDims::new(
            read_u32(&dims_payload[0..4]),
            read_u32(&dims_payload[4..8]),
            read_u32(&dims_payload[8..12]),
        );

        let num_payload = find_entry(&entries, keys::NUM_DATA)?;
        if num_payload.len() != 8 {
            return Err(TuError::Serde("container: malformed num_data entry".into()));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(num_payload);
        let num_data = u64::from_le_bytes(buf);

        let data = find_entry(&entries, keys::DATA)?;
        let expected = num_data as usize * dims.element_count();
        if data.len() != expected {
            return Err(TuError::Reshape {
                expected,
                actual: data.len(),
            });
        }

        let mut keypoints = BTreeMap::new();
        for (name, payload) in &entries {
            let Some(index) = name.strip_prefix(keys::KEYPOINTS_PREFIX) else {
                continue;
            };
            let index: u64 = index
                .parse()
                .map_err(|_| TuError::Serde(format!("container: bad keypoint entry '{}'", name)))?;
            keypoints.insert(index, decode_keypoints(payload)?);
        }

        Ok(TuContainer {
            dims,
            num_data,
            data: data.to_vec(),
            keypoints,
        })
    }
}

fn read_entry(bytes: &[u8], mut cursor: usize) -> Result<(String, &[u8], usize)> {
    let truncated = || TuError::Serde("container: truncated entry".into());
    if cursor + 2 > bytes.len() {
        return Err(truncated());
    }
    let name_len = u16::from_le_bytes([bytes[cursor], bytes[cursor + 1]]) as usize;
    cursor += 2;
    if cursor + name_len > bytes.len() {
        return Err(truncated());
    }
    let name = std::str::from_utf8(&bytes[cursor..cursor + name_len])
        .map_err(|_| TuError::Serde("container: entry name is not UTF-8".into()))?
        .to_string();
    cursor += name_len;
    if cursor + 8 > bytes.len() {
        return Err(truncated());
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[cursor..cursor + 8]);
    let payload_len = u64::from_le_bytes(buf) as usize;
    cursor += 8;
    let end = cursor
        .checked_add(payload_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(truncated)?;
    let payload = &bytes[cursor..end];
    Ok((name, payload, end))
}

fn find_entry<'a>(entries: &[(String, &'a [u8])], name: &str) -> Result<&'a [u8]> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, payload)| *payload)
        .ok_or_else(|| TuError::Serde(format!("container: missing entry '{}'", name)))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn decode_keypoints(payload: &[u8]) -> Result<Vec<TuKeypoint>> {
    if payload.len() < 8 {
        return Err(TuError::Serde("container: malformed keypoint entry".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&payload[0..8]);
    let count = u64::from_le_bytes(buf) as usize;
    let records = &payload[8..];
    if records.len() != count * KEYPOINT_WIRE_SIZE {
        return Err(TuError::Serde(
            "container: keypoint entry length mismatch".into(),
        ));
    }
    records
        .chunks_exact(KEYPOINT_WIRE_SIZE)
        .map(TuKeypoint::decode)
        .collect()
}
