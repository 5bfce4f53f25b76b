//! Unpacking of generation responses into the output directory.
//!
//! The endpoint answers with a zip holding a single PNG. The raw archive is
//! kept as `output_image.zip` and the image is written under the next free
//! `image_<n>.png` name so earlier generations are never overwritten.

use crate::error::{Result, StudioError};
use std::fs::OpenOptions;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ARCHIVE_FILE_NAME: &str = "output_image.zip";
const IMAGE_PREFIX: &str = "image_";
const IMAGE_SUFFIX: &str = ".png";

/// Writes the archive artifact, extracts its image and returns the image path.
pub fn save_generation_archive(archive_bytes: &[u8], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .map_err(|error| StudioError::persistence(output_dir, error))?;

    let archive_path = output_dir.join(ARCHIVE_FILE_NAME);
    std::fs::write(&archive_path, archive_bytes)
        .map_err(|error| StudioError::persistence(&archive_path, error))?;
    log::debug!("Saved image zip as {}", archive_path.display());

    let image_bytes = extract_single_image(archive_bytes)?;
    let image_path = write_numbered_image(&image_bytes, output_dir)?;
    log::info!("Extracted image saved as {}", image_path.display());
    Ok(image_path)
}

/// Returns the bytes of the only file in the archive, which must be a PNG.
pub fn extract_single_image(archive_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|error| StudioError::ArchiveDecodeFailure(error.to_string()))?;

    let mut file_indices = Vec::new();
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|error| StudioError::ArchiveDecodeFailure(error.to_string()))?;
        if entry.is_file() {
            file_indices.push(index);
        }
    }

    let index = match file_indices.as_slice() {
        [index] => *index,
        [] => {
            return Err(StudioError::ArchiveDecodeFailure(
                "archive contains no files".to_string(),
            ))
        }
        many => {
            return Err(StudioError::ArchiveDecodeFailure(format!(
                "expected one image in archive, found {} files",
                many.len()
            )))
        }
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|error| StudioError::ArchiveDecodeFailure(error.to_string()))?;
    let name = entry.name().to_string();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).map_err(|error| {
        StudioError::ArchiveDecodeFailure(format!("failed reading {}: {}", name, error))
    })?;

    match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Png) => Ok(bytes),
        Ok(other) => Err(StudioError::ArchiveDecodeFailure(format!(
            "archive entry {} is {:?}, expected PNG",
            name, other
        ))),
        Err(_) => Err(StudioError::ArchiveDecodeFailure(format!(
            "archive entry {} is not an image",
            name
        ))),
    }
}

/// Index the next generated image should use: one past the highest existing
/// `image_<n>.png`, or 0 when there is none.
pub fn next_image_index(output_dir: &Path) -> u64 {
    WalkDir::new(output_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| parse_image_index(&entry.file_name().to_string_lossy()))
        .max()
        .map_or(0, |highest| highest + 1)
}

fn parse_image_index(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(IMAGE_PREFIX)?
        .strip_suffix(IMAGE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn image_path_for(output_dir: &Path, index: u64) -> PathBuf {
    output_dir.join(format!("{}{}{}", IMAGE_PREFIX, index, IMAGE_SUFFIX))
}

fn write_numbered_image(bytes: &[u8], output_dir: &Path) -> Result<PathBuf> {
    let mut index = next_image_index(output_dir);
    loop {
        let candidate = image_path_for(output_dir, index);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(bytes)
                    .map_err(|error| StudioError::persistence(&candidate, error))?;
                return Ok(candidate);
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                index += 1;
            }
            Err(error) => return Err(StudioError::persistence(&candidate, error)),
        }
    }
}
