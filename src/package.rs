//! Writing converted crates to disk
//!
//! A crate is written either as a directory or as a zip archive, in both
//! cases holding `ro-crate-metadata.json` next to the uploaded files the
//! metadata refers to.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::convert::ConvertResult;
use crate::error::ConvertError;
use crate::source::is_plain_name;
use crate::vocab::METADATA_DESCRIPTOR_ID;

/// Write the crate into `out_dir`, creating it if needed
///
/// Uploaded files are copied from `files_dir` when one is given.
///
/// # Errors
/// Returns `MissingFile` when an uploaded file the metadata refers to is not
/// in `files_dir`, and `UnsafeFileName` when its name is not a single path
/// component.
pub fn write_directory(
    result: &ConvertResult,
    out_dir: &Path,
    files_dir: Option<&Path>,
    pretty: bool,
) -> Result<PathBuf, ConvertError> {
    let uploads = resolve_uploads(result, files_dir)?;

    fs::create_dir_all(out_dir)?;
    let metadata_path = out_dir.join(METADATA_DESCRIPTOR_ID);
    fs::write(&metadata_path, result.to_json_string(pretty)?)?;

    for (name, path) in uploads {
        fs::copy(&path, out_dir.join(name))?;
    }
    Ok(metadata_path)
}

/// Write the crate as a zip archive at `zip_path`
///
/// # Errors
/// Same as [`write_directory`]. Nothing is written when an upload fails to
/// resolve.
pub fn write_zip(
    result: &ConvertResult,
    zip_path: &Path,
    files_dir: Option<&Path>,
    pretty: bool,
) -> Result<(), ConvertError> {
    let uploads = resolve_uploads(result, files_dir)?;

    if let Some(parent) = zip_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut zip = ZipWriter::new(File::create(zip_path)?);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(METADATA_DESCRIPTOR_ID, options)?;
    zip.write_all(result.to_json_string(pretty)?.as_bytes())?;

    for (name, path) in uploads {
        zip.start_file(name, options)?;
        let mut file = File::open(&path)?;
        io::copy(&mut file, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

/// Source path of every upload, checked before anything is written
fn resolve_uploads<'r>(
    result: &'r ConvertResult,
    files_dir: Option<&Path>,
) -> Result<Vec<(&'r str, PathBuf)>, ConvertError> {
    let Some(files_dir) = files_dir else {
        return Ok(Vec::new());
    };
    result
        .uploaded_files
        .iter()
        .map(|name| Ok((name.as_str(), upload_path(files_dir, name)?)))
        .collect()
}

fn upload_path(files_dir: &Path, name: &str) -> Result<PathBuf, ConvertError> {
    if !is_plain_name(name) {
        return Err(ConvertError::UnsafeFileName(name.to_string()));
    }
    let path = files_dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConvertError::MissingFile(path))
    }
}
