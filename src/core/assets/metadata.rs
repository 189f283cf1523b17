//! Capture Metadata Extraction
//!
//! Best-effort extraction of capture timestamps and GPS coordinates from
//! input assets. Image assets are probed for EXIF tags first; everything else
//! (and every failure) falls back to filesystem timestamps. Extraction never
//! fails the caller: ordering must tolerate missing data for every asset, so
//! errors are reported as "no value available".

use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Tag, Value};
use tracing::debug;

use super::MediaAsset;

/// EXIF datetime tags carry local time with no zone; the reference behavior
/// treats them as UTC for ordering purposes.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Best-effort capture metadata reader
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Resolves the capture timestamp for an asset.
    ///
    /// Image assets: EXIF `DateTimeOriginal`, then `DateTime`. Anything else,
    /// or any EXIF failure: filesystem creation time, then modification time.
    /// Returns `None` when every source fails.
    pub async fn extract_date(asset: &MediaAsset) -> Option<DateTime<Utc>> {
        if asset.is_image() {
            if let Some(taken) = Self::exif_datetime(&asset.path).await {
                return Some(taken);
            }
        }
        Self::filesystem_datetime(&asset.path).await
    }

    /// Resolves coarse GPS coordinates for an asset, formatted as
    /// `"{lat}, {lon}"` with 4 decimal places. No reverse geocoding.
    pub async fn extract_location(asset: &MediaAsset) -> Option<String> {
        if !asset.is_image() {
            return None;
        }

        let path = asset.path.clone();
        let coords = tokio::task::spawn_blocking(move || {
            let exif = read_exif(&path)?;
            let lat = gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
            let lon = gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
            Some((lat, lon))
        })
        .await
        .ok()
        .flatten()?;

        Some(format_coordinates(coords.0, coords.1))
    }

    /// Reads EXIF datetime tags off the async runtime.
    async fn exif_datetime(path: &Path) -> Option<DateTime<Utc>> {
        let path: PathBuf = path.to_owned();
        tokio::task::spawn_blocking(move || {
            let exif = read_exif(&path)?;
            for tag in [Tag::DateTimeOriginal, Tag::DateTime] {
                if let Some(raw) = ascii_field(&exif, tag) {
                    if let Some(taken) = parse_exif_datetime(&raw) {
                        return Some(taken);
                    }
                    debug!(tag = ?tag, value = %raw, "unparseable EXIF datetime");
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }

    /// Filesystem fallback: creation time where the platform reports one,
    /// else modification time.
    async fn filesystem_datetime(path: &Path) -> Option<DateTime<Utc>> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "stat failed during date extraction");
                return None;
            }
        };

        meta.created()
            .or_else(|_| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }
}

/// Opens a file and parses its EXIF container. All failures collapse to None.
fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot open asset for EXIF read");
            return None;
        }
    };

    match exif::Reader::new().read_from_container(&mut BufReader::new(&file)) {
        Ok(exif) => Some(exif),
        Err(e) => {
            // Plenty of images simply carry no EXIF segment; not an error.
            debug!(path = %path.display(), error = %e, "no EXIF metadata");
            None
        }
    }
}

/// Returns the first ASCII string stored under a tag.
fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Ascii(ref lines) => lines
            .first()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

/// Parses the `YYYY:MM:DD HH:MM:SS` EXIF datetime format.
fn parse_exif_datetime(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Converts a degrees/minutes/seconds rational triple plus its hemisphere
/// reference into signed decimal degrees.
fn gps_coordinate(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.len() != 3 {
        return None;
    }

    let degrees = dms_to_decimal(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64());

    let reference = ascii_field(exif, ref_tag)?;
    Some(match reference.as_str() {
        "S" | "W" => -degrees,
        _ => degrees,
    })
}

/// DMS → decimal degrees.
fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Rounds both coordinates to 4 decimal places, matching the reference
/// output precision.
fn format_coordinates(lat: f64, lon: f64) -> String {
    format!("{lat:.4}, {lon:.4}")
}
