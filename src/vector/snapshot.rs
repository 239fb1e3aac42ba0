//! On-disk snapshot format for the vector index.
//!
//! The whole index is written on every mutation and read back in one piece at
//! startup; there is no append log.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic `DVEC`, version, dimension, slot count
//! - Slots: for each slot in order, a u32 state word (`1` live, `0` removed)
//!   followed by `dimension` little-endian f32 values. Removed slots keep
//!   their position and store zeros.
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a crash mid-write leaves the previous snapshot intact.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::MmapOptions;

use crate::vector::types::{VectorDimension, VectorError};

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// Size of the snapshot header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify index snapshot files.
const MAGIC_BYTES: &[u8; 4] = b"DVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Number of bytes of the per-slot state word.
const BYTES_PER_STATE: usize = 4;

const STATE_REMOVED: u32 = 0;
const STATE_LIVE: u32 = 1;

/// Decoded snapshot contents: the dimension and one entry per slot.
///
/// `None` marks a removed slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub dimension: VectorDimension,
    pub slots: Vec<Option<Vec<f32>>>,
}

/// Writes a snapshot atomically to `path`.
///
/// `slots` yields one entry per slot position in order; `None` is written as
/// a removed slot.
pub fn write_snapshot<'a, I>(
    path: &Path,
    dimension: VectorDimension,
    slot_count: usize,
    slots: I,
) -> Result<(), VectorError>
where
    I: IntoIterator<Item = Option<&'a [f32]>>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let count = u32::try_from(slot_count)
        .map_err(|_| VectorError::InvalidFormat(format!("too many slots: {slot_count}")))?;

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file());

        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        writer.write_all(&(dimension.get() as u32).to_le_bytes())?;
        writer.write_all(&count.to_le_bytes())?;

        let zeros = vec![0.0f32; dimension.get()];
        let mut written = 0usize;
        for slot in slots {
            let (state, values) = match slot {
                Some(values) => {
                    dimension.validate_vector(values)?;
                    (STATE_LIVE, values)
                }
                None => (STATE_REMOVED, zeros.as_slice()),
            };

            writer.write_all(&state.to_le_bytes())?;
            for &value in values {
                writer.write_all(&value.to_le_bytes())?;
            }
            written += 1;
        }

        if written != slot_count {
            return Err(VectorError::InvalidFormat(format!(
                "slot count mismatch while writing: header says {slot_count}, wrote {written}"
            )));
        }

        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| VectorError::Storage(e.error))?;

    Ok(())
}

/// Reads a snapshot from `path`.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, VectorError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(VectorError::InvalidFormat(
            "File too small to contain header".to_string(),
        ));
    }

    let mmap = unsafe { MmapOptions::new().map(&file)? };
    decode(&mmap)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn decode(bytes: &[u8]) -> Result<Snapshot, VectorError> {
    if bytes.len() < HEADER_SIZE {
        return Err(VectorError::InvalidFormat(
            "File too small to contain header".to_string(),
        ));
    }

    if &bytes[0..4] != MAGIC_BYTES {
        return Err(VectorError::InvalidFormat(
            "Invalid magic bytes".to_string(),
        ));
    }

    let version = read_u32(bytes, 4);
    if version != SNAPSHOT_VERSION {
        return Err(VectorError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            actual: version,
        });
    }

    let dimension = VectorDimension::new(read_u32(bytes, 8) as usize)?;
    let slot_count = read_u32(bytes, 12) as usize;

    let record_size = BYTES_PER_STATE + dimension.get() * BYTES_PER_F32;
    let expected_len = HEADER_SIZE + slot_count * record_size;
    if bytes.len() != expected_len {
        return Err(VectorError::InvalidFormat(format!(
            "expected {expected_len} bytes for {slot_count} slots, found {}",
            bytes.len()
        )));
    }

    let mut slots = Vec::with_capacity(slot_count);
    let mut offset = HEADER_SIZE;
    for _ in 0..slot_count {
        let state = read_u32(bytes, offset);
        let data_offset = offset + BYTES_PER_STATE;

        match state {
            STATE_LIVE => {
                let mut vector = Vec::with_capacity(dimension.get());
                for i in 0..dimension.get() {
                    let value_offset = data_offset + i * BYTES_PER_F32;
                    vector.push(f32::from_le_bytes([
                        bytes[value_offset],
                        bytes[value_offset + 1],
                        bytes[value_offset + 2],
                        bytes[value_offset + 3],
                    ]));
                }
                slots.push(Some(vector));
            }
            STATE_REMOVED => slots.push(None),
            other => {
                return Err(VectorError::InvalidFormat(format!(
                    "unknown slot state {other} at offset {offset}"
                )));
            }
        }

        offset += record_size;
    }

    Ok(Snapshot { dimension, slots })
}
