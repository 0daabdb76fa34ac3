//! File name metadata decoding.
//!
//! Archive tables carry their metadata in the `_`-delimited segments of the
//! file stem, e.g. `StatRR_KOSTRA-DWD-2020_D060_KOG.csv`:
//!
//! | segment | meaning |
//! |---|---|
//! | 2 | duration token: one marker letter + minutes (`D060`) |
//! | 3 | optional variant marker (`KOG` for the urban variant) |
//!
//! Segment positions and the marker are taken from [`ArchiveSchema`].

use std::path::{Path, PathBuf};

use crate::config::ArchiveSchema;
use crate::error::{KostraError, Result};

/// Duration level of one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DurationLevel {
    /// Raw token as it appears in the file name (e.g. `D015`).
    pub label: String,
    /// Accumulation window in minutes.
    pub minutes: u32,
}

impl DurationLevel {
    /// Decode a duration token.
    pub fn parse(label: &str) -> Result<Self> {
        Ok(Self {
            label: label.to_string(),
            minutes: parse_duration_label(label)?,
        })
    }
}

/// Metadata decoded from one table's file name.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub duration: DurationLevel,
    /// True for the urban (KOG) variant of the statistics.
    pub is_urban_variant: bool,
}

/// Decode a duration token such as `D015` into minutes.
///
/// The token must be exactly one non-digit marker character followed by
/// one or more ASCII digits.
pub fn parse_duration_label(label: &str) -> Result<u32> {
    let mut chars = label.chars();
    let marker = chars
        .next()
        .ok_or_else(|| KostraError::invalid_file_name(label, "empty duration token"))?;

    if marker.is_ascii_digit() {
        return Err(KostraError::invalid_file_name(
            label,
            "duration token must start with a marker letter",
        ));
    }

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KostraError::invalid_file_name(
            label,
            "duration token must end in minutes",
        ));
    }

    digits
        .parse::<u32>()
        .map_err(|e| KostraError::invalid_file_name(label, e.to_string()))
}

/// Decode duration and variant from a table's file name.
pub fn parse_file_metadata(path: &Path, schema: &ArchiveSchema) -> Result<FileMetadata> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| KostraError::invalid_file_name(path.display().to_string(), "no file stem"))?;

    let segments: Vec<&str> = stem.split('_').collect();

    let token = segments.get(schema.duration_segment).ok_or_else(|| {
        KostraError::invalid_file_name(
            stem,
            format!(
                "expected a duration token in segment {}, found {} segments",
                schema.duration_segment,
                segments.len()
            ),
        )
    })?;

    let duration = DurationLevel::parse(token)
        .map_err(|e| KostraError::invalid_file_name(stem, e.to_string()))?;

    // A missing variant segment is the regular naming of plain tables.
    let is_urban_variant = segments
        .get(schema.variant_segment)
        .map_or(false, |s| *s == schema.urban_marker);

    Ok(FileMetadata {
        path: path.to_path_buf(),
        duration,
        is_urban_variant,
    })
}
