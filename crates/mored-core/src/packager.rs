//! Archive creation and extraction.
//!
//! Archives are gzip-compressed tar streams. Entry paths are
//! `<source dir name>/<relative path>` so extracting recreates the package
//! folder. Output is deterministic for identical input trees: entries are
//! visited in file-name order and headers carry no timestamps or owners.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use mored_schema::Sha256Digest;
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Errors raised while building an archive.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Filesystem failure while reading sources or writing the archive.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The source tree could not be walked.
    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// The source path is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// An exclude pattern is not a valid regular expression.
    #[error("invalid exclude pattern '{pattern}': {source}")]
    Exclude {
        /// The offending pattern.
        pattern: String,
        /// Why it failed to compile.
        source: regex::Error,
    },
}

/// Errors raised while extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem or decompression failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An entry resolved outside the destination directory.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// A finished archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    /// Where the archive was written.
    pub path: PathBuf,
    /// Archive size in bytes.
    pub size: u64,
    /// SHA-256 of the archive bytes.
    pub digest: Sha256Digest,
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Compile exclude patterns. Each is matched against file base names.
///
/// # Errors
///
/// Returns [`BuildError::Exclude`] for the first pattern that fails to
/// compile.
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>, BuildError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| BuildError::Exclude {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Archive `src_dir` into `dest_archive` and digest the result.
///
/// Only regular files are stored; directories appear as path prefixes and
/// symlinks are skipped. Files whose base name matches any of `excludes`
/// are left out, as is `dest_archive` itself when it lies inside the tree.
///
/// # Errors
///
/// Returns [`BuildError`] if the source cannot be read or the archive
/// cannot be written.
pub fn build(
    src_dir: &Path,
    dest_archive: &Path,
    excludes: &[Regex],
) -> Result<ArchiveResult, BuildError> {
    if !src_dir.is_dir() {
        return Err(BuildError::NotADirectory(src_dir.to_path_buf()));
    }
    let src_dir = src_dir.canonicalize()?;
    let base = src_dir
        .file_name()
        .map_or_else(|| PathBuf::from("package"), PathBuf::from);

    if let Some(parent) = dest_archive.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(dest_archive)?;
    let dest_canonical = dest_archive.canonicalize()?;

    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut tar_builder = tar::Builder::new(encoder);

    for entry in WalkDir::new(&src_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.path() == dest_canonical {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if excludes.iter().any(|re| re.is_match(&file_name)) {
            debug!(path = %entry.path().display(), "excluded");
            continue;
        }

        let relative = entry.path().strip_prefix(&src_dir).unwrap_or(entry.path());
        let name = base.join(relative);
        let metadata = entry.metadata()?;

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(file_mode(&metadata));
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);

        debug!(entry = %name.display(), size = metadata.len(), "compressing");
        let source = BufReader::new(File::open(entry.path())?);
        tar_builder.append_data(&mut header, &name, source)?;
    }

    tar_builder.finish()?;
    let mut writer = tar_builder.into_inner()?.finish()?;
    writer.flush()?;
    drop(writer);

    let size = fs::metadata(dest_archive)?.len();
    let digest = Sha256Digest::compute_file(dest_archive)?;
    Ok(ArchiveResult {
        path: dest_archive.to_path_buf(),
        size,
        digest,
    })
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_: &fs::Metadata) -> u32 {
    0o644
}

/// Extract a tar.gz archive into `dest_dir`, creating directories as needed.
///
/// The lexical prefix check below does not resolve `..` components, so it
/// is no protection against hostile archives. Only extract archives you
/// produced or trust.
///
/// # Errors
///
/// Returns [`ExtractError`] if the archive cannot be read or a file cannot
/// be written.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let gz_decoder = GzDecoder::new(BufReader::new(file));
    extract_tar(gz_decoder, dest_dir)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let relative_path: PathBuf = entry.path()?.components().collect();
        let absolute_path = dest_dir.join(&relative_path);

        if !absolute_path.starts_with(dest_dir) {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                relative_path.display()
            )));
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&absolute_path)?;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    Ok(extracted_files)
}
